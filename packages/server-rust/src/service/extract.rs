//! Extraction of the canonical parameter mapping from a request.
//!
//! Both the query-string path and the XML-document path start from the
//! configured defaults and fold every supplied `(key, value)` pair through
//! [`add_parameter`].

use std::collections::HashSet;

use jaxrx_core::parameter::encode_variable;
use jaxrx_core::{JaxRxError, JaxRxResult, ParameterMap, QueryParameter};

use crate::xml::Element;

/// Folds one `(key, value)` pair into `target`.
///
/// `key` is matched case-insensitively. A repeated `output` is appended
/// with a comma; any other repeated key keeps its first value.
///
/// # Errors
///
/// Returns `JaxRxError::BadRequest` if `key` is not a parameter name or is
/// not in `capabilities`.
pub fn add_parameter(
    key: &str,
    value: &str,
    target: &mut ParameterMap,
    capabilities: &HashSet<QueryParameter>,
) -> JaxRxResult<()> {
    let param = key
        .parse::<QueryParameter>()
        .map_err(|_| JaxRxError::bad_request(format!("Parameter '{key}' is unknown.")))?;
    if !capabilities.contains(&param) {
        return Err(JaxRxError::bad_request(format!(
            "Parameter '{key}' is not supported by the implementation."
        )));
    }

    match target.get_mut(&param) {
        Some(existing) if param == QueryParameter::Output => {
            existing.push(',');
            existing.push_str(value);
        }
        Some(_) => {}
        None => {
            target.insert(param, value.to_string());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ParameterExtractor
// ---------------------------------------------------------------------------

/// Builds canonical parameter mappings, seeded with process-wide defaults.
#[derive(Debug, Clone, Default)]
pub struct ParameterExtractor {
    defaults: ParameterMap,
}

impl ParameterExtractor {
    #[must_use]
    pub fn new(defaults: ParameterMap) -> Self {
        Self { defaults }
    }

    /// The defaults every mapping starts from.
    #[must_use]
    pub fn defaults(&self) -> &ParameterMap {
        &self.defaults
    }

    /// Extracts parameters from decoded query-string pairs, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `JaxRxError::BadRequest` on the first unknown or unsupported key.
    pub fn from_query<K, V>(
        &self,
        pairs: &[(K, V)],
        capabilities: &HashSet<QueryParameter>,
    ) -> JaxRxResult<ParameterMap>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = self.defaults.clone();
        for (key, value) in pairs {
            add_parameter(key.as_ref(), value.as_ref(), &mut params, capabilities)?;
        }
        Ok(params)
    }

    /// Extracts parameters from a request document that already passed the
    /// schema gate.
    ///
    /// The root element name is the first key and the content of its `text`
    /// child the value. `parameter`, `variable` and `output` elements follow.
    /// Variables are folded under `var` as one opaque value, outputs under
    /// `output` as `name=value`.
    ///
    /// # Errors
    ///
    /// Returns `JaxRxError::BadRequest` on the first unknown or unsupported key.
    pub fn from_document(
        &self,
        root: &Element,
        capabilities: &HashSet<QueryParameter>,
    ) -> JaxRxResult<ParameterMap> {
        let mut params = self.defaults.clone();

        let text = elements(root, "text").next().map(Element::text).unwrap_or_default();
        add_parameter(&root.name, &text, &mut params, capabilities)?;

        for element in elements(root, "parameter") {
            add_parameter(
                attr(element, "name"),
                attr(element, "value"),
                &mut params,
                capabilities,
            )?;
        }

        for element in elements(root, "variable") {
            let value = encode_variable(
                attr(element, "name"),
                attr(element, "value"),
                element.attribute("type"),
            );
            add_parameter(QueryParameter::Var.as_str(), &value, &mut params, capabilities)?;
        }

        for element in elements(root, "output") {
            let value = format!("{}={}", attr(element, "name"), attr(element, "value"));
            add_parameter(QueryParameter::Output.as_str(), &value, &mut params, capabilities)?;
        }

        Ok(params)
    }
}

fn elements<'a>(root: &'a Element, name: &'static str) -> impl Iterator<Item = &'a Element> {
    root.elements().filter(move |e| e.name == name)
}

fn attr<'a>(element: &'a Element, name: &str) -> &'a str {
    element.attribute(name).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::schema::{SchemaChecker, POST_SCHEMA};

    fn caps(params: &[QueryParameter]) -> HashSet<QueryParameter> {
        params.iter().copied().collect()
    }

    fn all() -> HashSet<QueryParameter> {
        caps(&QueryParameter::ALL)
    }

    // ----- add_parameter -----

    #[test]
    fn unknown_key_is_bad_request() {
        let mut target = ParameterMap::new();
        let err = add_parameter("limit", "1", &mut target, &all()).unwrap_err();
        assert!(matches!(err, JaxRxError::BadRequest(ref m) if m == "Parameter 'limit' is unknown."));
        assert!(target.is_empty());
    }

    #[test]
    fn unsupported_key_is_bad_request_regardless_of_value() {
        let capabilities = caps(&[QueryParameter::Query]);
        for value in ["", "yes", "no", "//x"] {
            let mut target = ParameterMap::new();
            let err = add_parameter("wrap", value, &mut target, &capabilities).unwrap_err();
            assert!(matches!(
                err,
                JaxRxError::BadRequest(ref m)
                    if m == "Parameter 'wrap' is not supported by the implementation."
            ));
        }
    }

    #[test]
    fn key_matching_is_case_insensitive() {
        let mut target = ParameterMap::new();
        add_parameter("QuErY", "//x", &mut target, &all()).unwrap();
        assert_eq!(target[&QueryParameter::Query], "//x");
    }

    #[test]
    fn first_value_wins_for_repeated_keys() {
        let mut target = ParameterMap::new();
        add_parameter("count", "1", &mut target, &all()).unwrap();
        add_parameter("COUNT", "2", &mut target, &all()).unwrap();
        assert_eq!(target[&QueryParameter::Count], "1");
    }

    #[test]
    fn repeated_output_is_comma_joined_in_order() {
        let mut target = ParameterMap::new();
        add_parameter("output", "method=xml", &mut target, &all()).unwrap();
        add_parameter("output", "indent=yes", &mut target, &all()).unwrap();
        add_parameter("output", "encoding=UTF-8", &mut target, &all()).unwrap();
        assert_eq!(
            target[&QueryParameter::Output],
            "method=xml,indent=yes,encoding=UTF-8"
        );
    }

    // ----- from_query -----

    #[test]
    fn query_pairs_are_merged() {
        let extractor = ParameterExtractor::default();
        let params = extractor
            .from_query(
                &[("query", "//a"), ("wrap", "no"), ("output", "a=1"), ("output", "b=2")],
                &all(),
            )
            .unwrap();
        assert_eq!(params[&QueryParameter::Query], "//a");
        assert_eq!(params[&QueryParameter::Wrap], "no");
        assert_eq!(params[&QueryParameter::Output], "a=1,b=2");
    }

    #[test]
    fn query_stops_at_first_invalid_pair() {
        let extractor = ParameterExtractor::default();
        let result = extractor.from_query(&[("query", "//a"), ("nope", "x")], &all());
        assert!(matches!(result, Err(JaxRxError::BadRequest(_))));
    }

    #[test]
    fn defaults_seed_every_mapping() {
        let mut defaults = ParameterMap::new();
        defaults.insert(QueryParameter::Count, "10".to_string());
        let extractor = ParameterExtractor::new(defaults);
        let params = extractor.from_query::<&str, &str>(&[], &all()).unwrap();
        assert_eq!(params[&QueryParameter::Count], "10");
    }

    #[test]
    fn defaults_are_not_checked_against_capabilities() {
        let mut defaults = ParameterMap::new();
        defaults.insert(QueryParameter::Revision, "3".to_string());
        let extractor = ParameterExtractor::new(defaults);
        let params = extractor
            .from_query(&[("query", "//a")], &caps(&[QueryParameter::Query]))
            .unwrap();
        assert_eq!(params[&QueryParameter::Revision], "3");
    }

    /// A configured default for a non-output key is kept even when the
    /// request supplies its own value.
    #[test]
    fn default_blocks_request_override_for_plain_keys() {
        let mut defaults = ParameterMap::new();
        defaults.insert(QueryParameter::Wrap, "no".to_string());
        let extractor = ParameterExtractor::new(defaults);
        let params = extractor.from_query(&[("wrap", "yes")], &all()).unwrap();
        assert_eq!(params[&QueryParameter::Wrap], "no");
    }

    /// A configured default output is extended by the request's outputs.
    #[test]
    fn default_output_is_extended_by_request() {
        let mut defaults = ParameterMap::new();
        defaults.insert(QueryParameter::Output, "indent=no".to_string());
        let extractor = ParameterExtractor::new(defaults);
        let params = extractor
            .from_query(&[("output", "method=text")], &all())
            .unwrap();
        assert_eq!(params[&QueryParameter::Output], "indent=no,method=text");
    }

    // ----- from_document -----

    fn extract(xml: &str, capabilities: &HashSet<QueryParameter>) -> JaxRxResult<ParameterMap> {
        let root = SchemaChecker::new(POST_SCHEMA).check(xml).unwrap();
        ParameterExtractor::default().from_document(&root, capabilities)
    }

    #[test]
    fn document_root_and_text_become_first_parameter() {
        let params = extract(
            r#"<query xmlns="http://jax-rx.sourceforge.net"><text>//item</text></query>"#,
            &all(),
        )
        .unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[&QueryParameter::Query], "//item");
    }

    #[test]
    fn document_parameters_variables_and_outputs() {
        let params = extract(
            r#"<command>
                 <text>info</text>
                 <parameter name="WRAP" value="no"/>
                 <parameter name="wrap" value="yes"/>
                 <variable name="x" value="1"/>
                 <variable name="y" value="2" type="xs:integer"/>
                 <output name="method" value="text"/>
                 <output name="indent" value="no"/>
               </command>"#,
            &all(),
        )
        .unwrap();
        assert_eq!(params[&QueryParameter::Command], "info");
        assert_eq!(params[&QueryParameter::Wrap], "no");
        // Only the first variable is kept; var is not an accumulating key.
        assert_eq!(params[&QueryParameter::Var], "x\u{2}1");
        assert_eq!(params[&QueryParameter::Output], "method=text,indent=no");
    }

    #[test]
    fn document_text_with_cdata_is_preserved() {
        let params = extract(
            "<query><text><![CDATA[for $i in 1 to 3 where $i < 2 return $i]]></text></query>",
            &all(),
        )
        .unwrap();
        assert_eq!(
            params[&QueryParameter::Query],
            "for $i in 1 to 3 where $i < 2 return $i"
        );
    }

    #[test]
    fn document_root_is_checked_against_capabilities() {
        let err = extract("<run><text>a.xq</text></run>", &caps(&[QueryParameter::Query])).unwrap_err();
        assert!(matches!(err, JaxRxError::BadRequest(ref m) if m.contains("'run'")));
    }

    #[test]
    fn document_unknown_parameter_is_bad_request() {
        let err = extract(
            r#"<query><text>x</text><parameter name="limit" value="1"/></query>"#,
            &all(),
        )
        .unwrap_err();
        assert!(matches!(err, JaxRxError::BadRequest(ref m) if m == "Parameter 'limit' is unknown."));
    }

    #[test]
    fn document_variable_requires_var_capability() {
        let err = extract(
            r#"<query><text>x</text><variable name="a" value="b"/></query>"#,
            &caps(&[QueryParameter::Query]),
        )
        .unwrap_err();
        assert!(matches!(err, JaxRxError::BadRequest(_)));
    }
}
