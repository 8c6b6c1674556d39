//! Validation of XML request documents before parameter extraction.
//!
//! Schemas are declared as static rule tables and selected by name. The
//! `post` schema describes the body of `application/query+xml` requests:
//!
//! ```xml
//! <query xmlns="http://jax-rx.sourceforge.net">
//!   <text>//item</text>
//!   <parameter name="wrap" value="no"/>
//!   <variable name="x" value="1" type="xs:integer"/>
//!   <output name="method" value="xml"/>
//! </query>
//! ```

use jaxrx_core::constants::JAXRX_NAMESPACE;
use jaxrx_core::{JaxRxError, JaxRxResult};

use crate::xml::{self, Element};

/// Name of the request document schema.
pub const POST_SCHEMA: &str = "post";

/// Element that may follow the mandatory `text` child, with its attributes.
#[derive(Debug)]
struct ElementRule {
    name: &'static str,
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

/// Declarative description of a request document.
#[derive(Debug)]
struct RequestSchema {
    name: &'static str,
    roots: &'static [&'static str],
    text: &'static str,
    children: &'static [ElementRule],
}

const SCHEMAS: &[RequestSchema] = &[RequestSchema {
    name: POST_SCHEMA,
    roots: &["query", "command", "run"],
    text: "text",
    children: &[
        ElementRule {
            name: "parameter",
            required: &["name", "value"],
            optional: &[],
        },
        ElementRule {
            name: "variable",
            required: &["name", "value"],
            optional: &["type"],
        },
        ElementRule {
            name: "output",
            required: &["name", "value"],
            optional: &[],
        },
    ],
}];

// ---------------------------------------------------------------------------
// SchemaChecker
// ---------------------------------------------------------------------------

/// Parses a request document and validates it against a named schema.
#[derive(Debug, Clone)]
pub struct SchemaChecker {
    schema: String,
}

impl SchemaChecker {
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Parses and validates `input`, returning the root element.
    ///
    /// # Errors
    ///
    /// - `JaxRxError::Internal` if the schema is not available
    /// - `JaxRxError::BadRequest` if the document is not well-formed or not valid
    pub fn check(&self, input: &str) -> JaxRxResult<Element> {
        let schema = SCHEMAS
            .iter()
            .find(|s| s.name == self.schema)
            .ok_or_else(|| JaxRxError::internal(format!("Schema not available: {}", self.schema)))?;

        let root = xml::parse(input).map_err(|e| JaxRxError::bad_request(e.to_string()))?;
        validate(schema, &root).map_err(JaxRxError::BadRequest)?;
        Ok(root)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(schema: &RequestSchema, root: &Element) -> Result<(), String> {
    let namespace = root.namespace.as_deref();
    if !matches!(namespace, None | Some(JAXRX_NAMESPACE)) {
        return Err(format!(
            "Element '{}' is in unexpected namespace '{}'",
            root.name,
            namespace.unwrap_or_default()
        ));
    }
    if !schema.roots.contains(&root.name.as_str()) {
        return Err(format!(
            "Root element '{}' is not one of: {}",
            root.name,
            schema.roots.join(", ")
        ));
    }
    check_attributes(root, &[], &[])?;
    check_no_text(root)?;

    let mut elements = root.elements();
    match elements.next() {
        Some(text) if is_named(text, schema.text, namespace) => {
            check_attributes(text, &[], &[])?;
            if let Some(child) = text.elements().next() {
                return Err(format!(
                    "Element '{}' must contain text only, found '{}'",
                    schema.text, child.name
                ));
            }
        }
        _ => {
            return Err(format!(
                "Element '{}' must start with a '{}' element",
                root.name, schema.text
            ))
        }
    }

    for element in elements {
        let rule = schema
            .children
            .iter()
            .find(|r| is_named(element, r.name, namespace))
            .ok_or_else(|| {
                format!(
                    "Element '{}' is not allowed in '{}'",
                    element.name, root.name
                )
            })?;
        check_attributes(element, rule.required, rule.optional)?;
        check_no_text(element)?;
        if let Some(child) = element.elements().next() {
            return Err(format!(
                "Element '{}' must be empty, found '{}'",
                rule.name, child.name
            ));
        }
    }
    Ok(())
}

fn is_named(element: &Element, name: &str, namespace: Option<&str>) -> bool {
    element.name == name && element.namespace.as_deref() == namespace
}

fn check_attributes(element: &Element, required: &[&str], optional: &[&str]) -> Result<(), String> {
    if let Some(attr) = element.attributes.iter().find(|a| {
        a.qualified || !(required.contains(&a.name.as_str()) || optional.contains(&a.name.as_str()))
    }) {
        return Err(format!(
            "Attribute '{}' is not allowed on '{}'",
            attr.name, element.name
        ));
    }
    if let Some(missing) = required.iter().find(|name| element.attribute(name).is_none()) {
        return Err(format!(
            "Attribute '{missing}' is required on '{}'",
            element.name
        ));
    }
    Ok(())
}

fn check_no_text(element: &Element) -> Result<(), String> {
    if element.texts().any(|t| !t.trim().is_empty()) {
        Err(format!("Element '{}' must not contain text", element.name))
    } else {
        Ok(())
    }
}
