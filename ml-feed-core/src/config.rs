//! Section-based configuration store
//!
//! Datasets are parameterized by a read-only, section-based key-value
//! store. Lookups are fail-loud: a missing key or a wrong-typed value is
//! an error naming the section and key, never a silent default.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Name of the section consulted by the `*_default` lookup shorthands
pub const DEFAULT_SECTION: &str = "default";

/// A scalar configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A string value
    Str(String),
    /// An integer value
    Int(i64),
    /// A floating-point value
    Float(f64),
    /// A boolean value
    Bool(bool),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

/// A section-based key-value configuration store
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Section name to key-value mapping
    sections: HashMap<String, HashMap<String, ConfigValue>>,
}

impl Config {
    /// Create an empty configuration store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document
    ///
    /// The top level must be an object of sections; each section is an
    /// object of scalar values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_str(json)?;
        let sections = root.as_object().ok_or_else(|| {
            Error::InvalidArgument("Configuration root must be a JSON object of sections".into())
        })?;

        let mut config = Config::new();
        for (section, body) in sections {
            let entries = body.as_object().ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Configuration section '{}' must be a JSON object",
                    section
                ))
            })?;

            for (key, value) in entries {
                let value = Self::scalar_from_json(section, key, value)?;
                config.set(section, key, value);
            }
        }

        Ok(config)
    }

    /// Parse a configuration from a JSON file on disk
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    fn scalar_from_json(section: &str, key: &str, value: &serde_json::Value) -> Result<ConfigValue> {
        match value {
            serde_json::Value::Bool(b) => Ok(ConfigValue::Bool(*b)),
            serde_json::Value::String(s) => Ok(ConfigValue::Str(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ConfigValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(ConfigValue::Float(f))
                } else {
                    Err(Error::InvalidArgument(format!(
                        "Configuration value '{}/{}' is not a representable number",
                        section, key
                    )))
                }
            }
            _ => Err(Error::InvalidArgument(format!(
                "Configuration value '{}/{}' must be a scalar",
                section, key
            ))),
        }
    }

    /// Set a value in the given section
    pub fn set<V: Into<ConfigValue>>(&mut self, section: &str, key: &str, value: V) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Builder-style insertion into the given section
    pub fn with<V: Into<ConfigValue>>(mut self, section: &str, key: &str, value: V) -> Self {
        self.set(section, key, value);
        self
    }

    /// Look up a raw value
    pub fn get(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.sections.get(section)?.get(key)
    }

    fn require(&self, section: &str, key: &str) -> Result<&ConfigValue> {
        self.get(section, key).ok_or_else(|| Error::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Look up an integer value
    pub fn get_int(&self, section: &str, key: &str) -> Result<i64> {
        match self.require(section, key)? {
            ConfigValue::Int(i) => Ok(*i),
            _ => Err(Error::TypeMismatch {
                section: section.to_string(),
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Look up a boolean value
    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool> {
        match self.require(section, key)? {
            ConfigValue::Bool(b) => Ok(*b),
            _ => Err(Error::TypeMismatch {
                section: section.to_string(),
                key: key.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Look up a floating-point value; integers widen
    pub fn get_float(&self, section: &str, key: &str) -> Result<f64> {
        match self.require(section, key)? {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Int(i) => Ok(*i as f64),
            _ => Err(Error::TypeMismatch {
                section: section.to_string(),
                key: key.to_string(),
                expected: "float",
            }),
        }
    }

    /// Look up a string value
    pub fn get_str(&self, section: &str, key: &str) -> Result<&str> {
        match self.require(section, key)? {
            ConfigValue::Str(s) => Ok(s.as_str()),
            _ => Err(Error::TypeMismatch {
                section: section.to_string(),
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Look up an integer in the default section
    pub fn get_int_default(&self, key: &str) -> Result<i64> {
        self.get_int(DEFAULT_SECTION, key)
    }

    /// Look up a boolean in the default section
    pub fn get_bool_default(&self, key: &str) -> Result<bool> {
        self.get_bool(DEFAULT_SECTION, key)
    }

    /// Look up a float in the default section
    pub fn get_float_default(&self, key: &str) -> Result<f64> {
        self.get_float(DEFAULT_SECTION, key)
    }

    /// Look up a string in the default section
    pub fn get_str_default(&self, key: &str) -> Result<&str> {
        self.get_str(DEFAULT_SECTION, key)
    }

    /// Whether the store contains the given key
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }
}
