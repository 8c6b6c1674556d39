//! Resource path and query parameters of a single JAX-RX request.

use std::fmt;

use crate::error::{JaxRxError, JaxRxResult};
use crate::parameter::{ParameterMap, QueryParameter};

/// A normalized, slash-delimited resource address plus the parameters that
/// apply to it.
///
/// Empty steps are dropped on construction, so `"a//b/"` and `"/a/b"` both
/// yield the segments `["a", "b"]`. A path made only of slashes (or the empty
/// string) has no segments at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<String>,
    parameters: Option<ParameterMap>,
}

impl ResourcePath {
    /// Builds a path without parameters.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self {
            segments: split(raw),
            parameters: None,
        }
    }

    /// Builds a path carrying an already merged parameter mapping.
    #[must_use]
    pub fn with_parameters(raw: &str, parameters: ParameterMap) -> Self {
        Self {
            segments: split(raw),
            parameters: Some(parameters),
        }
    }

    /// Returns the segment at the given level.
    ///
    /// # Errors
    ///
    /// Returns [`JaxRxError::OutOfRange`] if `level >= segment_count()`.
    pub fn segment(&self, level: usize) -> JaxRxResult<&str> {
        self.segments
            .get(level)
            .map(String::as_str)
            .ok_or(JaxRxError::OutOfRange {
                level,
                depth: self.segments.len(),
            })
    }

    /// Number of segments (the depth of the path).
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// All segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Value of a query parameter, or `None` when no mapping is attached or
    /// the key is unset.
    #[must_use]
    pub fn value(&self, key: QueryParameter) -> Option<&str> {
        self.parameters
            .as_ref()
            .and_then(|p| p.get(&key))
            .map(String::as_str)
    }

    /// The attached parameter mapping, if any.
    #[must_use]
    pub fn parameters(&self) -> Option<&ParameterMap> {
        self.parameters.as_ref()
    }

    /// Canonical slash-joined form, without leading or trailing slash.
    #[must_use]
    pub fn to_path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

fn split(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
