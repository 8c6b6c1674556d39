//! The closed vocabulary of JAX-RX query parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical parameter mapping attached to a [`ResourcePath`](crate::ResourcePath).
pub type ParameterMap = BTreeMap<QueryParameter, String>;

/// Delimiter between the name, value and optional type of an external
/// variable passed under [`QueryParameter::Var`].
pub const VARIABLE_DELIMITER: char = '\u{2}';

/// All recognized query parameters.
///
/// The first three variants select the operation to run; the order in which
/// they are checked is fixed (see [`QueryParameter::SELECTORS`]). The rest
/// are modifiers interpreted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryParameter {
    /// Query to process.
    Query,
    /// Database command to process.
    Command,
    /// Server-side query file to run.
    Run,
    /// Revision to work on.
    Revision,
    /// Serialization parameters.
    Output,
    /// XSL style sheet to apply to the result.
    Xsl,
    /// Flag for wrapping results in XML elements.
    Wrap,
    /// First result to print.
    Start,
    /// Number of results to print.
    Count,
    /// External variable.
    Var,
}

impl QueryParameter {
    /// Every parameter, in declaration order.
    pub const ALL: [QueryParameter; 10] = [
        Self::Query,
        Self::Command,
        Self::Run,
        Self::Revision,
        Self::Output,
        Self::Xsl,
        Self::Wrap,
        Self::Start,
        Self::Count,
        Self::Var,
    ];

    /// Operation selectors in priority order.
    pub const SELECTORS: [QueryParameter; 3] = [Self::Command, Self::Run, Self::Query];

    /// Lowercase wire name of the parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Command => "command",
            Self::Run => "run",
            Self::Revision => "revision",
            Self::Output => "output",
            Self::Xsl => "xsl",
            Self::Wrap => "wrap",
            Self::Start => "start",
            Self::Count => "count",
            Self::Var => "var",
        }
    }
}

impl fmt::Display for QueryParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not part of the parameter vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown query parameter: {0}")]
pub struct UnknownParameter(pub String);

impl FromStr for QueryParameter {
    type Err = UnknownParameter;

    /// Case-insensitive lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

/// Joins a variable's name, value and optional type into one opaque value.
#[must_use]
pub fn encode_variable(name: &str, value: &str, data_type: Option<&str>) -> String {
    let mut encoded = format!("{name}{VARIABLE_DELIMITER}{value}");
    if let Some(t) = data_type {
        encoded.push(VARIABLE_DELIMITER);
        encoded.push_str(t);
    }
    encoded
}
