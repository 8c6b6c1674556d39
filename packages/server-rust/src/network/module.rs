//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener and
//! `serve()` accepts connections until shutdown. Binding before serving lets
//! the binary report the actual port (port 0 picks an ephemeral one).

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    delete_handler, get_handler, get_root_handler, health_handler, liveness_handler,
    post_handler, post_root_handler, put_handler, readiness_handler, root_handler,
    system_handler, AppState,
};
use super::middleware::{build_http_layers, track_requests};
use super::shutdown::ShutdownController;
use crate::service::JaxRxService;

/// Owns the HTTP listener lifecycle.
///
/// 1. `new()` -- allocates the shutdown controller
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    service: Arc<JaxRxService>,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, service: Arc<JaxRxService>) -> Self {
        Self {
            config,
            service,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared handle on the lifecycle state.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /` -- configured systems
    /// - `GET /{system}[/]` -- the `jax-rx` step of one system
    /// - `GET|POST /{system}/jax-rx[/]` -- reads on the system root
    /// - `GET|POST|PUT|DELETE /{system}/jax-rx/{*resource}` -- reads and mutations
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes
    pub fn build_router(&self) -> Router {
        let state = AppState {
            service: Arc::clone(&self.service),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };
        router(state)
    }

    /// Binds the TCP listener and returns the actual bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves or the controller's
    /// `trigger_shutdown()` is called, then drains in-flight requests for up
    /// to `drain_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let shutdown_ctrl = Arc::clone(&self.shutdown);

        shutdown_ctrl.set_ready();

        let ctrl = Arc::clone(&shutdown_ctrl);
        let forward = tokio::spawn(async move {
            shutdown.await;
            ctrl.trigger_shutdown();
        });
        let stop = shutdown_requested(shutdown_ctrl.shutdown_receiver());

        let served = if let Some(ref tls_config) = self.config.tls {
            serve_tls(listener, router, tls_config, stop).await
        } else {
            serve_plain(listener, router, stop).await
        };
        forward.abort();
        served?;

        drain(&shutdown_ctrl, &self.config).await;
        Ok(())
    }
}

/// Resolves once the controller signals shutdown.
async fn shutdown_requested(mut receiver: watch::Receiver<bool>) {
    // A closed channel means the controller is gone, which also ends serving.
    let _ = receiver.wait_for(|stop| *stop).await;
}

/// Builds the complete router around `state`.
pub fn router(state: AppState) -> Router {
    let layers = build_http_layers(&state.config);

    let jaxrx = Router::new()
        .route("/{system}/jax-rx", get(get_root_handler).post(post_root_handler))
        .route("/{system}/jax-rx/", get(get_root_handler).post(post_root_handler))
        .route(
            "/{system}/jax-rx/{*resource}",
            get(get_handler)
                .post(post_handler)
                .put(put_handler)
                .delete(delete_handler),
        )
        .route("/{system}", get(system_handler))
        .route("/{system}/", get(system_handler))
        .route("/", get(root_handler))
        .route_layer(from_fn_with_state(state.clone(), track_requests));

    Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .merge(jaxrx)
        .layer(layers)
        .with_state(state)
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    stop: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving plain HTTP connections");

    axum::serve(listener, router).with_graceful_shutdown(stop).await?;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls, reusing the
/// pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    stop: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        stop.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain(shutdown_ctrl: &ShutdownController, config: &NetworkConfig) {
    shutdown_ctrl.trigger_shutdown();
    let in_flight = shutdown_ctrl.in_flight_count();
    if in_flight > 0 {
        info!("Waiting for {} in-flight requests", in_flight);
    }

    if shutdown_ctrl.wait_for_drain(config.drain_timeout).await {
        info!("All requests drained");
    } else {
        warn!("Drain timeout expired with in-flight requests remaining");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;

    use tower::ServiceExt;

    use super::*;
    use crate::backends::builtin_factories;
    use crate::network::handlers::test_state;
    use crate::service::ServerConfig;

    fn module() -> NetworkModule {
        let service = JaxRxService::new(ServerConfig::default(), builtin_factories());
        NetworkModule::new(NetworkConfig::default(), Arc::new(service))
    }

    fn ready_router() -> (Router, AppState) {
        let state = test_state();
        state.shutdown.set_ready();
        (router(state.clone()), state)
    }

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, req: Request<Body>) -> Response {
        router.clone().oneshot(req).await.unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[CONTENT_TYPE].to_str().unwrap()
    }

    #[test]
    fn shutdown_controller_returns_shared_arc() {
        let module = module();
        assert!(Arc::ptr_eq(&module.shutdown_controller(), &module.shutdown_controller()));
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_requires_start() {
        let err = module().serve(std::future::ready(())).await.unwrap_err();
        assert!(err.to_string().contains("start() must be called"));
    }

    #[tokio::test]
    async fn serve_stops_when_shutdown_resolves() {
        let mut module = module();
        module.start().await.unwrap();
        let ctrl = module.shutdown_controller();
        module.serve(std::future::ready(())).await.unwrap();
        assert_eq!(ctrl.health_state(), crate::network::HealthState::Stopped);
    }

    #[tokio::test]
    async fn controller_shutdown_stops_serving() {
        let mut module = module();
        module.start().await.unwrap();
        let ctrl = module.shutdown_controller();

        let server = tokio::spawn(module.serve(std::future::pending()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctrl.health_state(), crate::network::HealthState::Ready);

        ctrl.trigger_shutdown();
        let result = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("serve should return after trigger_shutdown");
        result.unwrap().unwrap();
        assert_eq!(ctrl.health_state(), crate::network::HealthState::Stopped);
    }

    #[tokio::test]
    async fn root_lists_systems() {
        let (router, _) = ready_router();
        let response = send(&router, request(Method::GET, "/", None, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/xml");
        assert!(text(response).await.contains("<jax-rx:resource name=\"dom\"/>"));
    }

    #[tokio::test]
    async fn system_lists_jaxrx_step_or_404() {
        let (router, _) = ready_router();
        let response = send(&router, request(Method::GET, "/dom", None, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("name=\"jax-rx\""));

        let response = send(&router, request(Method::GET, "/nope", None, "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Unknown implementation: nope");
    }

    #[tokio::test]
    async fn trailing_slash_addresses_the_same_resource() {
        let (router, _) = ready_router();
        for uri in ["/dom/", "/dom/jax-rx/", "/dom/jax-rx/?wrap=no"] {
            let response = send(&router, request(Method::GET, uri, None, "")).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }

        let response = send(&router, request(Method::GET, "/nope/jax-rx/", None, "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Unknown implementation: nope");
    }

    #[tokio::test]
    async fn document_lifecycle_over_http() {
        let (router, _) = ready_router();

        let created = send(
            &router,
            request(Method::POST, "/dom/jax-rx/books", Some("text/xml"), "<books><b/></books>"),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(text(created).await, "Resource 'books' added.");

        let fetched = send(&router, request(Method::GET, "/dom/jax-rx/books", None, "")).await;
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(content_type(&fetched), "text/xml");
        assert_eq!(text(fetched).await, "<books><b/></books>");

        let replaced = send(
            &router,
            request(Method::PUT, "/dom/jax-rx/books", Some("application/xml"), "<books/>"),
        )
        .await;
        assert_eq!(replaced.status(), StatusCode::CREATED);
        assert_eq!(text(replaced).await, "Resource 'books' updated.");

        let listed = send(&router, request(Method::GET, "/dom/jax-rx?wrap=no", None, "")).await;
        assert_eq!(content_type(&listed), "text/plain");
        assert_eq!(text(listed).await, "books\n");

        let deleted = send(&router, request(Method::DELETE, "/dom/jax-rx/books", None, "")).await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let missing = send(&router, request(Method::GET, "/dom/jax-rx/books", None, "")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_parameter_is_400() {
        let (router, _) = ready_router();
        let response = send(&router, request(Method::GET, "/dom/jax-rx?query=1", None, "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(
            text(response).await,
            "Parameter 'query' is not supported by the implementation."
        );
    }

    #[tokio::test]
    async fn query_document_is_schema_checked() {
        let (router, _) = ready_router();
        let response = send(
            &router,
            request(
                Method::POST,
                "/dom/jax-rx",
                Some("application/query+xml"),
                "<query><parameter name=\"wrap\" value=\"no\"/></query>",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_media_types_are_415() {
        let (router, _) = ready_router();
        let post = send(
            &router,
            request(Method::POST, "/dom/jax-rx/a", Some("application/json"), "{}"),
        )
        .await;
        assert_eq!(post.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let put = send(&router, request(Method::PUT, "/dom/jax-rx/a", None, "<a/>")).await;
        assert_eq!(put.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn draining_refuses_requests_but_answers_probes() {
        let (router, state) = ready_router();
        state.shutdown.trigger_shutdown();

        let refused = send(&router, request(Method::GET, "/dom/jax-rx", None, "")).await;
        assert_eq!(refused.status(), StatusCode::SERVICE_UNAVAILABLE);

        let live = send(&router, request(Method::GET, "/health/live", None, "")).await;
        assert_eq!(live.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn streamed_result_stays_in_flight_until_body_is_read() {
        let (router, state) = ready_router();
        let created = send(
            &router,
            request(Method::POST, "/dom/jax-rx/a", Some("text/xml"), "<a/>"),
        )
        .await;
        drop(created);
        assert_eq!(state.shutdown.in_flight_count(), 0);

        let response = send(&router, request(Method::GET, "/dom/jax-rx/a", None, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.shutdown.in_flight_count(), 1);

        state.shutdown.trigger_shutdown();
        assert!(!state.shutdown.wait_for_drain(Duration::from_millis(30)).await);

        assert_eq!(text(response).await, "<a/>");
        assert_eq!(state.shutdown.in_flight_count(), 0);
        assert!(state.shutdown.wait_for_drain(Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn dropped_response_releases_in_flight_guard() {
        let (router, state) = ready_router();
        let response = send(&router, request(Method::GET, "/dom/jax-rx", None, "")).await;
        assert_eq!(state.shutdown.in_flight_count(), 1);
        drop(response);
        assert_eq!(state.shutdown.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (router, _) = ready_router();
        let response = send(&router, request(Method::GET, "/health/live", None, "")).await;
        assert!(response.headers().contains_key("x-request-id"));
    }
}
