//! JAX-RX server binary.
//!
//! ```text
//! jaxrx-server --port 8984 \
//!     -D org.jaxrx.systemName=dom \
//!     -D org.jaxrx.systemPath=jaxrx.dom.DomBackend \
//!     -D org.jaxrx.parameter.wrap=yes
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jaxrx_server::network::{NetworkConfig, NetworkModule, TlsConfig, DEFAULT_PORT};
use jaxrx_server::service::config::parse_property;
use jaxrx_server::{builtin_factories, JaxRxService, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "jaxrx_server=info,tower_http=info";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "jaxrx-server", version, about = "JAX-RX HTTP server")]
struct Args {
    /// Bind address.
    #[arg(long, env = "JAXRX_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port; 0 picks a free one.
    #[arg(long, env = "JAXRX_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Configuration property as `key=value`; repeatable.
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// PEM certificate; enables HTTPS together with `--tls-key`.
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// PEM private key.
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {e}"))?;
        info!(%addr, "Prometheus exporter listening");
    }

    let config = ServerConfig::from_properties(args.properties)?;
    for (name, implementation) in config.systems.entries() {
        info!(system = %name, %implementation, "System configured");
    }
    if !config.default_parameters.is_empty() {
        info!(defaults = ?config.default_parameters, "Default parameters configured");
    }
    let service = Arc::new(JaxRxService::new(config, builtin_factories()));

    let tls = match (args.tls_cert, args.tls_key) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        _ => None,
    };
    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        tls,
        ..NetworkConfig::default()
    };

    let mut module = NetworkModule::new(network, service);
    let port = module.start().await?;
    info!(port, "JAX-RX server starting");

    module
        .serve(async {
            // A failed signal handler install leaves the server running until killed.
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            } else {
                std::future::pending::<()>().await;
            }
        })
        .await
}
