//! Request-level facade over the registry, schema gate, extraction and
//! dispatch. Transport handlers call into [`JaxRxService`] only.

use std::sync::Arc;

use bytes::Bytes;
use jaxrx_core::{JaxRxError, JaxRxResult, ResourcePath};

use super::config::ServerConfig;
use super::extract::ParameterExtractor;
use super::operation::{self, OperationResponse};
use super::registry::{BackendFactories, SystemRegistry};
use super::schema::{SchemaChecker, POST_SCHEMA};

/// Shared entry point for all JAX-RX operations.
#[derive(Clone)]
pub struct JaxRxService {
    registry: Arc<SystemRegistry>,
    extractor: ParameterExtractor,
    checker: SchemaChecker,
}

impl JaxRxService {
    /// Builds the service from validated configuration and the factory table.
    #[must_use]
    pub fn new(config: ServerConfig, factories: BackendFactories) -> Self {
        Self {
            registry: Arc::new(SystemRegistry::new(config.systems, factories)),
            extractor: ParameterExtractor::new(config.default_parameters),
            checker: SchemaChecker::new(POST_SCHEMA),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    /// Configured system names in sorted order.
    #[must_use]
    pub fn system_names(&self) -> Vec<String> {
        self.registry.systems().keys().cloned().collect()
    }

    /// Checks that `system` resolves to a backend.
    ///
    /// # Errors
    ///
    /// Same as [`SystemRegistry::resolve`].
    pub fn check_system(&self, system: &str) -> JaxRxResult<()> {
        self.registry.resolve(system).map(|_| ())
    }

    /// Runs a read operation with parameters taken from the query string.
    ///
    /// # Errors
    ///
    /// - `JaxRxError::NotFound` for an unknown system
    /// - `JaxRxError::BadRequest` for unknown or unsupported parameters
    /// - whatever the backend reports
    pub async fn query_string<K, V>(
        &self,
        system: &str,
        resource: &str,
        pairs: &[(K, V)],
    ) -> JaxRxResult<OperationResponse>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let backend = self.registry.resolve(system)?;
        let params = self.extractor.from_query(pairs, backend.parameters())?;
        let path = ResourcePath::with_parameters(resource, params);
        operation::dispatch(&backend, &path).await
    }

    /// Runs a read operation described by an XML request document.
    ///
    /// The document is validated and fully extracted before the backend is
    /// called.
    ///
    /// # Errors
    ///
    /// - `JaxRxError::NotFound` for an unknown system
    /// - `JaxRxError::BadRequest` if the body is not UTF-8, not valid, or
    ///   names unknown or unsupported parameters
    /// - whatever the backend reports
    pub async fn query_document(
        &self,
        system: &str,
        resource: &str,
        body: &[u8],
    ) -> JaxRxResult<OperationResponse> {
        let backend = self.registry.resolve(system)?;
        let input = std::str::from_utf8(body)
            .map_err(|e| JaxRxError::bad_request(format!("Request body is not valid UTF-8: {e}")))?;
        let root = self.checker.check(input)?;
        let params = self.extractor.from_document(&root, backend.parameters())?;
        let path = ResourcePath::with_parameters(resource, params);
        operation::dispatch(&backend, &path).await
    }

    /// Adds `input` at `resource`.
    ///
    /// # Errors
    ///
    /// `JaxRxError::NotFound` for an unknown system, otherwise the backend's error.
    pub async fn add(&self, system: &str, resource: &str, input: Bytes) -> JaxRxResult<String> {
        let backend = self.registry.resolve(system)?;
        operation::add(&backend, resource, input).await
    }

    /// Creates or replaces `resource` with `input`.
    ///
    /// # Errors
    ///
    /// `JaxRxError::NotFound` for an unknown system, otherwise the backend's error.
    pub async fn update(&self, system: &str, resource: &str, input: Bytes) -> JaxRxResult<String> {
        let backend = self.registry.resolve(system)?;
        operation::update(&backend, resource, input).await
    }

    /// Deletes `resource`.
    ///
    /// # Errors
    ///
    /// `JaxRxError::NotFound` for an unknown system, otherwise the backend's error.
    pub async fn delete(&self, system: &str, resource: &str) -> JaxRxResult<String> {
        let backend = self.registry.resolve(system)?;
        operation::delete(&backend, resource).await
    }
}

impl std::fmt::Debug for JaxRxService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JaxRxService")
            .field("systems", self.registry.systems())
            .field("defaults", self.extractor.defaults())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use jaxrx_core::QueryParameter;

    use super::*;
    use crate::backends::builtin_factories;

    fn service() -> JaxRxService {
        JaxRxService::new(ServerConfig::default(), builtin_factories())
    }

    fn service_with(properties: &[(&str, &str)]) -> JaxRxService {
        let config = ServerConfig::from_properties(properties.iter().copied()).unwrap();
        JaxRxService::new(config, builtin_factories())
    }

    async fn body(response: OperationResponse) -> String {
        String::from_utf8(response.output.collect().await.unwrap()).unwrap()
    }

    const NO_PARAMS: &[(&str, &str)] = &[];

    #[test]
    fn default_system_is_listed() {
        assert_eq!(service().system_names(), vec!["dom"]);
        assert!(service().check_system("dom").is_ok());
        assert_eq!(service().check_system("xyz").unwrap_err().status(), 404);
    }

    #[tokio::test]
    async fn add_then_read_via_query_string() {
        let svc = service();
        svc.add("dom", "books", Bytes::from_static(b"<books/>")).await.unwrap();

        let response = svc.query_string("dom", "books", NO_PARAMS).await.unwrap();
        assert_eq!(response.content_type, "text/xml");
        assert_eq!(body(response).await, "<books/>");

        let plain = svc
            .query_string("dom", "", &[("wrap", "no")])
            .await
            .unwrap();
        assert_eq!(plain.content_type, "text/plain");
        assert_eq!(body(plain).await, "books\n");
    }

    #[tokio::test]
    async fn unsupported_query_parameter_is_rejected() {
        let err = service()
            .query_string("dom", "", &[("query", "//a")])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter 'query' is not supported by the implementation."
        );

        let err = service()
            .query_string("dom", "", &[("bogus", "1")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Parameter 'bogus' is unknown.");
    }

    #[tokio::test]
    async fn unknown_system_is_not_found() {
        let err = service()
            .query_string("nope", "", NO_PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, JaxRxError::NotFound(ref m) if m == "Unknown implementation: nope"));
    }

    #[tokio::test]
    async fn document_request_goes_through_schema_and_capabilities() {
        let svc = service();
        let invalid = svc.query_document("dom", "", b"<query><oops/></query>").await;
        assert!(matches!(invalid, Err(JaxRxError::BadRequest(_))));

        let not_utf8 = svc.query_document("dom", "", &[0xff, 0xfe]).await;
        assert!(matches!(not_utf8, Err(JaxRxError::BadRequest(_))));

        // Valid document, but the DOM backend does not understand `query`.
        let unsupported = svc
            .query_document("dom", "", b"<query><text>1</text></query>")
            .await
            .unwrap_err();
        assert_eq!(
            unsupported.to_string(),
            "Parameter 'query' is not supported by the implementation."
        );
    }

    #[tokio::test]
    async fn configured_default_blocks_request_value() {
        let svc = service_with(&[("org.jaxrx.parameter.WRAP", "no")]);
        assert_eq!(svc.extractor.defaults().get(&QueryParameter::Wrap).unwrap(), "no");

        let response = svc
            .query_string("dom", "", &[("wrap", "yes")])
            .await
            .unwrap();
        assert_eq!(response.content_type, "text/plain");
    }

    #[tokio::test]
    async fn update_and_delete_roundtrip() {
        let svc = service();
        assert_eq!(
            svc.update("dom", "a", Bytes::from_static(b"<a/>")).await.unwrap(),
            "Resource 'a' created."
        );
        assert_eq!(svc.delete("dom", "a").await.unwrap(), "Resource 'a' deleted.");
        assert_eq!(svc.delete("dom", "a").await.unwrap_err().status(), 404);
    }

    #[tokio::test]
    async fn aliases_share_one_store() {
        let svc = service_with(&[
            ("org.jaxrx.systemName", "left;right"),
            ("org.jaxrx.systemPath", "jaxrx.dom.DomBackend;jaxrx.dom.DomBackend"),
        ]);
        svc.add("left", "doc", Bytes::from_static(b"<d/>")).await.unwrap();
        let response = svc.query_string("right", "doc", NO_PARAMS).await.unwrap();
        assert_eq!(body(response).await, "<d/>");
        assert_eq!(svc.registry().instance_count(), 1);
    }
}
