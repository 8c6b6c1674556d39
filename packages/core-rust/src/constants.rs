//! URL layout, media types and configuration keys shared by the JAX-RX crates.

/// Namespace URI of JAX-RX request documents and result listings.
pub const JAXRX_NAMESPACE: &str = "http://jax-rx.sourceforge.net";

/// Fixed path step between the system name and the resource path.
pub const JAXRX: &str = "jax-rx";

/// Content type of XML request documents.
pub const APPLICATION_QUERY_XML: &str = "application/query+xml";

/// Content type of wrapped results.
pub const TEXT_XML: &str = "text/xml";

/// Content type of unwrapped results.
pub const TEXT_PLAIN: &str = "text/plain";

/// Content type of resource listings.
pub const APPLICATION_XML: &str = "application/xml";

/// Value of the `wrap` parameter that selects XML-wrapped output.
pub const WRAP_YES: &str = "yes";

/// Output parameter naming the serialization method.
pub const OUTPUT_METHOD: &str = "method";

/// Supported serialization methods and their media types.
pub const OUTPUT_METHODS: [(&str, &str); 4] = [
    ("xml", APPLICATION_XML),
    ("xhtml", "application/xhtml+xml"),
    ("html", "text/html"),
    ("text", TEXT_PLAIN),
];

/// Property holding the `;`-separated list of system names.
pub const SYSTEM_NAME_PROPERTY: &str = "org.jaxrx.systemName";

/// Property holding the `;`-separated list of implementation identifiers.
pub const SYSTEM_PATH_PROPERTY: &str = "org.jaxrx.systemPath";

/// Prefix of properties that seed default query parameters.
pub const PARAMETER_PROPERTY_PREFIX: &str = "org.jaxrx.parameter.";

/// Separator inside multi-valued system properties.
pub const VALUE_DELIMITER: char = ';';

/// System name bound when no systems are configured.
pub const DEFAULT_SYSTEM_NAME: &str = "dom";

/// Implementation bound to [`DEFAULT_SYSTEM_NAME`].
pub const DEFAULT_IMPLEMENTATION: &str = "jaxrx.dom.DomBackend";

/// Returns the media type for a serialization method, matched case-insensitively.
#[must_use]
pub fn output_media_type(method: &str) -> Option<&'static str> {
    OUTPUT_METHODS
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(method))
        .map(|(_, media)| *media)
}
