//! core::config::format
//!
//! Supported configuration file formats.
//!
//! Every format is parsed into one `serde_json::Value` tree so the rest of
//! the resolution code deals with a single representation. Java properties
//! files are flat; their dotted keys are expanded into nested objects.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};

/// A configuration file format, detected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
    Properties,
    Hcl,
}

/// Extensions tried during discovery, in order.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "json",
    "toml",
    "yaml",
    "yml",
    "properties",
    "props",
    "prop",
    "hcl",
];

impl ConfigFormat {
    /// Map a file extension (without the dot, any case) to a format.
    ///
    /// ```
    /// use cliwork::core::config::format::ConfigFormat;
    ///
    /// assert_eq!(ConfigFormat::from_extension("YML"), Some(ConfigFormat::Yaml));
    /// assert_eq!(ConfigFormat::from_extension("ini"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "properties" | "props" | "prop" => Some(ConfigFormat::Properties),
            "hcl" => Some(ConfigFormat::Hcl),
            _ => None,
        }
    }

    /// Detect the format of `path` from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "JSON",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Properties => "Java properties",
            ConfigFormat::Hcl => "HCL",
        }
    }

    /// Parse `contents` into a value tree.
    ///
    /// An empty (or whitespace-only) document parses to an empty object.
    ///
    /// # Errors
    ///
    /// Returns the parser's message if the document is malformed or its top
    /// level is not a mapping.
    pub fn parse(&self, contents: &str) -> Result<Value, String> {
        if contents.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let value = match self {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string())?,
            ConfigFormat::Toml => {
                let table: toml::Value = toml::from_str(contents).map_err(|e| e.to_string())?;
                toml_to_json(table)
            }
            ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string())?,
            ConfigFormat::Properties => {
                let props: HashMap<String, String> =
                    java_properties::read(contents.as_bytes()).map_err(|e| e.to_string())?;
                properties_to_json(props)
            }
            ConfigFormat::Hcl => hcl::from_str::<Value>(contents).map_err(|e| e.to_string())?,
        };

        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            other => Err(format!(
                "top level must be a mapping, found {}",
                json_type_name(&other)
            )),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Convert a TOML value to JSON. Datetimes become strings.
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Expand flat dotted property keys into nested objects.
///
/// Keys are inserted in sorted order so a key that is both a leaf and a
/// prefix (`a=1`, `a.b=2`) resolves deterministically: the nested key wins.
fn properties_to_json(props: HashMap<String, String>) -> Value {
    let mut keys: Vec<_> = props.into_iter().collect();
    keys.sort();

    let mut root = Map::new();
    for (key, value) in keys {
        let parts: Vec<&str> = key.split('.').collect();
        insert_path(&mut root, &parts, Value::String(value));
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
