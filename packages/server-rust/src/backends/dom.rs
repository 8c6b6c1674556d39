//! In-memory XML document store, the default `dom` system.
//!
//! Documents are addressed by a single path segment. The root lists all
//! stored document names. Documents are checked for well-formedness on the
//! way in and served back verbatim.

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jaxrx_core::constants::{output_media_type, OUTPUT_METHOD, WRAP_YES};
use jaxrx_core::listing::resource_listing;
use jaxrx_core::{Backend, JaxRxError, JaxRxResult, QueryParameter, ResourcePath, StreamingOutput};
use tracing::debug;

use crate::xml;

/// Serialization methods the DOM backend can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    /// The stored markup.
    Markup,
    /// The concatenated text content.
    Text,
}

/// [`Backend`] holding whole XML documents in a [`DashMap`].
pub struct DomBackend {
    documents: DashMap<String, String>,
    parameters: HashSet<QueryParameter>,
}

impl DomBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            parameters: [
                QueryParameter::Wrap,
                QueryParameter::Start,
                QueryParameter::Count,
                QueryParameter::Output,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no document is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn list(&self, path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        let mut names: Vec<String> = self.documents.iter().map(|e| e.key().clone()).collect();
        names.sort();

        let start = number(path, QueryParameter::Start)?.unwrap_or(1);
        if start == 0 {
            return Err(JaxRxError::bad_request("Parameter 'start' must be at least 1."));
        }
        let count = number(path, QueryParameter::Count)?.unwrap_or(usize::MAX);
        let page: Vec<String> = names.into_iter().skip(start - 1).take(count).collect();

        let wrapped = matches!(path.value(QueryParameter::Wrap), None | Some(WRAP_YES));
        if wrapped {
            Ok(resource_listing(page))
        } else {
            Ok(StreamingOutput::from_chunks(
                page.into_iter().map(|name| format!("{name}\n")),
            ))
        }
    }

    fn document(&self, name: &str, path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        let method = output_method(path)?;
        let document = self
            .documents
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| not_found(name))?;

        match method {
            Method::Markup => Ok(StreamingOutput::from_bytes(document)),
            Method::Text => {
                let root = xml::parse(&document).map_err(JaxRxError::internal)?;
                Ok(StreamingOutput::from_bytes(root.descendant_text()))
            }
        }
    }
}

impl Default for DomBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for DomBackend {
    fn parameters(&self) -> &HashSet<QueryParameter> {
        &self.parameters
    }

    async fn command(&self, _command: &str, _path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        Err(unsupported("command"))
    }

    async fn run(&self, _file: &str, _path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        Err(unsupported("run"))
    }

    async fn query(&self, _query: &str, _path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        Err(unsupported("query"))
    }

    async fn get(&self, path: &ResourcePath) -> JaxRxResult<StreamingOutput> {
        match path.segment_count() {
            0 => self.list(path),
            1 => self.document(path.segment(0)?, path),
            _ => Err(not_found(&path.to_path())),
        }
    }

    async fn add(&self, input: Bytes, path: &ResourcePath) -> JaxRxResult<String> {
        let name = document_name(path)?;
        let document = parse_input(&input)?;
        match self.documents.entry(name.to_string()) {
            Entry::Occupied(_) => Err(JaxRxError::bad_request(format!(
                "Resource '{name}' already exists."
            ))),
            Entry::Vacant(entry) => {
                entry.insert(document);
                debug!(resource = name, "Document added");
                Ok(format!("Resource '{name}' added."))
            }
        }
    }

    async fn update(&self, input: Bytes, path: &ResourcePath) -> JaxRxResult<String> {
        let name = document_name(path)?;
        let document = parse_input(&input)?;
        let replaced = self.documents.insert(name.to_string(), document).is_some();
        debug!(resource = name, replaced, "Document stored");
        Ok(if replaced {
            format!("Resource '{name}' updated.")
        } else {
            format!("Resource '{name}' created.")
        })
    }

    async fn delete(&self, path: &ResourcePath) -> JaxRxResult<String> {
        if path.segment_count() != 1 {
            return Err(not_found(&path.to_path()));
        }
        let name = path.segment(0)?;
        self.documents
            .remove(name)
            .map(|_| format!("Resource '{name}' deleted."))
            .ok_or_else(|| not_found(name))
    }
}

fn unsupported(operation: &str) -> JaxRxError {
    JaxRxError::bad_request(format!(
        "Operation '{operation}' is not supported by the DOM implementation."
    ))
}

fn not_found(name: &str) -> JaxRxError {
    JaxRxError::not_found(format!("Resource '{name}' not found."))
}

fn document_name(path: &ResourcePath) -> JaxRxResult<&str> {
    if path.segment_count() == 1 {
        path.segment(0)
    } else {
        Err(JaxRxError::bad_request(format!(
            "Expected a single resource name, got '{path}'."
        )))
    }
}

fn parse_input(input: &[u8]) -> JaxRxResult<String> {
    let text = std::str::from_utf8(input)
        .map_err(|e| JaxRxError::bad_request(format!("Input is not valid UTF-8: {e}")))?;
    xml::parse(text)
        .map_err(|e| JaxRxError::bad_request(format!("Input is not well-formed XML: {e}")))?;
    Ok(text.to_string())
}

fn number(path: &ResourcePath, key: QueryParameter) -> JaxRxResult<Option<usize>> {
    path.value(key)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|_| {
                JaxRxError::bad_request(format!("Parameter '{key}' must be a number: {raw}"))
            })
        })
        .transpose()
}

/// Reads the serialization method from comma-separated `name=value` output
/// directives. Only `method` is understood.
fn output_method(path: &ResourcePath) -> JaxRxResult<Method> {
    let mut method = Method::Markup;
    let Some(output) = path.value(QueryParameter::Output) else {
        return Ok(method);
    };
    for directive in output.split(',').filter(|d| !d.is_empty()) {
        let (name, value) = directive.split_once('=').ok_or_else(|| {
            JaxRxError::bad_request(format!("Malformed output parameter: {directive}"))
        })?;
        if name != OUTPUT_METHOD {
            return Err(JaxRxError::bad_request(format!(
                "Unknown output parameter: {name}"
            )));
        }
        if output_media_type(value).is_none() {
            return Err(JaxRxError::bad_request(format!(
                "Unknown serialization method: {value}"
            )));
        }
        method = if value.eq_ignore_ascii_case("text") {
            Method::Text
        } else {
            Method::Markup
        };
    }
    Ok(method)
}
