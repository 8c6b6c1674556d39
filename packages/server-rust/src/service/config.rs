use std::collections::BTreeMap;

use jaxrx_core::constants::{
    DEFAULT_IMPLEMENTATION, DEFAULT_SYSTEM_NAME, PARAMETER_PROPERTY_PREFIX, SYSTEM_NAME_PROPERTY,
    SYSTEM_PATH_PROPERTY, VALUE_DELIMITER,
};
use jaxrx_core::{ParameterMap, QueryParameter};

/// Fatal configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("'{present}' is set but '{missing}' is not; both lists must be configured together")]
    PartialSystems {
        present: &'static str,
        missing: &'static str,
    },
    #[error("{names} system names but {implementations} implementations configured")]
    LengthMismatch { names: usize, implementations: usize },
    #[error("empty entry in '{property}'")]
    EmptyEntry { property: &'static str },
    #[error("malformed property '{0}', expected key=value")]
    MalformedProperty(String),
}

// ---------------------------------------------------------------------------
// SystemsConfig
// ---------------------------------------------------------------------------

/// The system name -> implementation identifier table.
///
/// Built once from two parallel `;`-separated lists and immutable afterwards.
/// Several names may share an implementation identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemsConfig {
    entries: BTreeMap<String, String>,
}

impl SystemsConfig {
    /// Builds the table from the raw property values.
    ///
    /// With neither list set the default `dom` binding is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one list is set, if the lists differ in
    /// length, or if either contains an empty entry.
    pub fn from_lists(
        names: Option<&str>,
        implementations: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match (names, implementations) {
            (None, None) => Ok(Self::default()),
            (Some(_), None) => Err(ConfigError::PartialSystems {
                present: SYSTEM_NAME_PROPERTY,
                missing: SYSTEM_PATH_PROPERTY,
            }),
            (None, Some(_)) => Err(ConfigError::PartialSystems {
                present: SYSTEM_PATH_PROPERTY,
                missing: SYSTEM_NAME_PROPERTY,
            }),
            (Some(names), Some(implementations)) => {
                let names = split_list(names, SYSTEM_NAME_PROPERTY)?;
                let implementations = split_list(implementations, SYSTEM_PATH_PROPERTY)?;
                if names.len() != implementations.len() {
                    return Err(ConfigError::LengthMismatch {
                        names: names.len(),
                        implementations: implementations.len(),
                    });
                }
                let entries = names
                    .into_iter()
                    .zip(implementations)
                    .map(|(n, i)| (n.to_string(), i.to_string()))
                    .collect();
                Ok(Self { entries })
            }
        }
    }

    /// Builds the table from explicit pairs. Later duplicates of a name win.
    pub fn from_pairs<I, N, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, M)>,
        N: Into<String>,
        M: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(n, i)| (n.into(), i.into()))
                .collect(),
        }
    }

    /// All configured systems, keyed by name.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl Default for SystemsConfig {
    fn default() -> Self {
        Self::from_pairs([(DEFAULT_SYSTEM_NAME, DEFAULT_IMPLEMENTATION)])
    }
}

fn split_list<'a>(raw: &'a str, property: &'static str) -> Result<Vec<&'a str>, ConfigError> {
    let items: Vec<&str> = raw.split(VALUE_DELIMITER).map(str::trim).collect();
    if items.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::EmptyEntry { property });
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Process-wide JAX-RX configuration: the system table and the default
/// query parameters every request starts from.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub systems: SystemsConfig,
    pub default_parameters: ParameterMap,
}

impl ServerConfig {
    /// Reads the configuration from `key=value` properties.
    ///
    /// Recognized keys are `org.jaxrx.systemName`, `org.jaxrx.systemPath` and
    /// any `org.jaxrx.parameter.<KEY>`. Everything else is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system lists are inconsistent.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let properties: Vec<(K, V)> = properties.into_iter().collect();
        let systems = SystemsConfig::from_lists(
            last_value(&properties, SYSTEM_NAME_PROPERTY),
            last_value(&properties, SYSTEM_PATH_PROPERTY),
        )?;
        let default_parameters = default_parameters(
            properties.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
        );

        Ok(Self {
            systems,
            default_parameters,
        })
    }
}

fn last_value<'a, K, V>(properties: &'a [(K, V)], key: &str) -> Option<&'a str>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    properties
        .iter()
        .rev()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
}

/// Collects default parameters from `org.jaxrx.parameter.<KEY>` properties.
///
/// `<KEY>` is matched case-insensitively against the parameter vocabulary;
/// properties whose suffix is not a parameter name are skipped silently.
pub fn default_parameters<'a, I>(properties: I) -> ParameterMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    properties
        .into_iter()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(PARAMETER_PROPERTY_PREFIX)?;
            let param = suffix.parse::<QueryParameter>().ok()?;
            Some((param, value.to_string()))
        })
        .collect()
}

/// Splits a `key=value` property as given on the command line.
///
/// # Errors
///
/// Returns `ConfigError::MalformedProperty` if there is no `=` or the key is empty.
pub fn parse_property(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::MalformedProperty(raw.to_string())),
    }
}
