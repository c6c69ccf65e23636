//! Schema of the configuration document pushed by the cluster controller.
//!
//! ```json
//! {
//!   "service": [
//!     {
//!       "name": "kubelet",
//!       "arguments_remove": ["--myoldarg"],
//!       "arguments_update": [{"--myarg": "myvalue"}, {"--other": null}],
//!       "restart": false
//!     },
//!     { "name": "kube-proxy", "restart": true }
//!   ],
//!   "addon": [
//!     { "name": "gpu", "enable": true },
//!     { "name": "dns", "disable": true }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::args::{check_key, check_service_name, check_value};
use crate::{Error, Result};

/// A batch of service and addon changes, applied in document order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigurationDocument {
    #[serde(default)]
    pub service: Vec<ServiceEntry>,
    #[serde(default)]
    pub addon: Vec<AddonEntry>,
}

/// Changes to one service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub arguments_update: Vec<ArgumentUpdate>,
    #[serde(default)]
    pub arguments_remove: Vec<String>,
    #[serde(default)]
    pub restart: bool,
}

/// Enable and/or disable one addon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddonEntry {
    pub name: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub disable: bool,
}

/// One object of `arguments_update`.
///
/// Each key maps to the value to write, or to `None` when the document sent
/// `null`, which removes the key. Strings are written as-is; numbers and
/// booleans in their JSON form. Keys within one object keep the order the
/// document lists them in, which matters when one key prefixes another.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ArgumentUpdate(Vec<(String, Option<String>)>);

impl ArgumentUpdate {
    pub fn pairs(&self) -> &[(String, Option<String>)] {
        &self.0
    }
}

impl TryFrom<Map<String, Value>> for ArgumentUpdate {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        map.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(format!("argument {} must have a scalar value", key));
                    }
                };
                Ok((key, value))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(ArgumentUpdate)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for ArgumentUpdate {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

/// A document as received, not yet decoded against the schema.
///
/// Decoding is deferred so the callback token is checked first and an
/// unauthenticated caller never learns anything about the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    /// The top-level fields of a JSON request body.
    Fields(Map<String, Value>),
    /// JSON text from the form-encoded `configuration` field.
    Text(String),
}

impl RawDocument {
    pub fn decode(self) -> Result<ConfigurationDocument> {
        match self {
            RawDocument::Fields(fields) => serde_json::from_value(Value::Object(fields))
                .map_err(|e| Error::InvalidDocument(e.to_string())),
            RawDocument::Text(text) => ConfigurationDocument::from_json(&text),
        }
    }
}

impl ConfigurationDocument {
    /// Parse a document from JSON text (the form-encoded `configuration` field).
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    /// Check every name, key and value before anything is applied.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.service {
            check_service_name(&entry.name).map_err(Error::InvalidDocument)?;
            let invalid = |reason: String| {
                Error::InvalidDocument(format!("service {}: {}", entry.name, reason))
            };
            for update in &entry.arguments_update {
                for (key, value) in update.pairs() {
                    check_key(key).map_err(invalid)?;
                    if let Some(value) = value {
                        check_value(value).map_err(invalid)?;
                    }
                }
            }
            for key in &entry.arguments_remove {
                check_key(key).map_err(invalid)?;
            }
        }

        for entry in &self.addon {
            check_addon_name(&entry.name).map_err(Error::InvalidDocument)?;
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.service.is_empty() && self.addon.is_empty()
    }
}

/// Addon names are passed as a script argument; keep them to a plain word.
fn check_addon_name(name: &str) -> std::result::Result<(), String> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'));
    if valid {
        Ok(())
    } else {
        Err(format!("Invalid addon name: {:?}", name))
    }
}
