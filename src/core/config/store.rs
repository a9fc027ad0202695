//! core::config::store
//!
//! Layered key-value store keyed by dotted paths.
//!
//! # Precedence
//!
//! Each value lives in exactly one layer. Lookups return the value from the
//! highest layer that holds the key:
//!
//! 1. [`Origin::Flag`] - flags given on the command line (highest)
//! 2. [`Origin::File`] - the configuration file
//! 3. [`Origin::Env`] - environment variables
//! 4. [`Origin::FlagDefault`] - declared defaults of flags not given
//! 5. [`Origin::Default`] - compiled-in defaults of the options object (lowest)
//!
//! # Keys
//!
//! Keys are stored lower-cased with `_` folded to `-`, so `mysql.max_idle`
//! and `MySQL.Max-Idle` name the same entry. When the store is laid over an
//! options tree ([`ConfigStore::populate`]), each path segment matches an
//! existing field under the same folding.
//!
//! # Example
//!
//! ```
//! use cliwork::core::config::store::{ConfigStore, Origin};
//! use serde_json::json;
//!
//! let mut store = ConfigStore::new();
//! store.set(Origin::Env, "redis.host", json!("10.0.0.9"));
//! store.set(Origin::File, "Redis.Host", json!("10.0.0.7"));
//!
//! assert_eq!(store.get("redis.host"), Some(&json!("10.0.0.7")));
//! assert_eq!(store.origin("redis.host"), Some(Origin::File));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Number, Value};

use crate::core::flags::{parse_bool, split_list};

/// The layer a value came from, ordered from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    Default,
    FlagDefault,
    Env,
    File,
    Flag,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::Default => "default",
            Origin::FlagDefault => "flag default",
            Origin::Env => "env",
            Origin::File => "file",
            Origin::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// Layered store of configuration values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    layers: BTreeMap<Origin, BTreeMap<String, Value>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` in the `origin` layer, replacing any previous value there.
    pub fn set(&mut self, origin: Origin, key: &str, value: Value) {
        self.layers
            .entry(origin)
            .or_default()
            .insert(canonical_key(key), value);
    }

    /// Set every `(key, value)` pair in the `origin` layer.
    pub fn extend<I>(&mut self, origin: Origin, values: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in values {
            self.set(origin, &key, value);
        }
    }

    /// The winning value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.lookup(key).map(|(_, value)| value)
    }

    /// The layer the winning value for `key` came from.
    pub fn origin(&self, key: &str) -> Option<Origin> {
        self.lookup(key).map(|(origin, _)| origin)
    }

    fn lookup(&self, key: &str) -> Option<(Origin, &Value)> {
        let key = canonical_key(key);
        self.layers
            .iter()
            .rev()
            .find_map(|(origin, values)| values.get(&key).map(|v| (*origin, v)))
    }

    /// Keys held by one layer, sorted.
    pub fn layer_keys(&self, origin: Origin) -> Vec<String> {
        self.layers
            .get(&origin)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every known key across all layers, sorted.
    pub fn keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self.layers.values().flat_map(|v| v.keys()).collect();
        keys.into_iter().cloned().collect()
    }

    /// Winning origin of every key, sorted by key.
    pub fn origins(&self) -> BTreeMap<String, Origin> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.origin(&key).map(|origin| (key, origin)))
            .collect()
    }

    /// Lay the winning values over `base` and return the result.
    ///
    /// String values landing on a non-string field of `base` are coerced to
    /// that field's shape (see [`coerce`]). Fields of `base` with no matching
    /// key keep their value.
    pub fn populate(&self, base: Value) -> Value {
        let mut root = match base {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for key in self.keys() {
            if let Some(value) = self.get(&key) {
                let parts: Vec<&str> = key.split('.').collect();
                assign(&mut root, &parts, value.clone());
            }
        }
        Value::Object(root)
    }
}

/// Store form of `key`.
///
/// ```
/// use cliwork::core::config::store::canonical_key;
///
/// assert_eq!(canonical_key("MySQL.Max_Idle"), "mysql.max-idle");
/// ```
pub fn canonical_key(key: &str) -> String {
    key.chars().map(fold).collect()
}

fn key_matches(field: &str, segment: &str) -> bool {
    field.len() == segment.len()
        && field
            .chars()
            .zip(segment.chars())
            .all(|(a, b)| fold(a) == fold(b))
}

fn fold(c: char) -> char {
    if c == '_' {
        '-'
    } else {
        c.to_ascii_lowercase()
    }
}

fn assign(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let field = map
        .keys()
        .find(|k| key_matches(k, head))
        .cloned()
        .unwrap_or_else(|| head.to_string());

    if rest.is_empty() {
        let value = match (map.get(&field), value) {
            (Some(like), Value::String(raw)) if !like.is_string() => coerce(&raw, like),
            (_, value) => value,
        };
        map.insert(field, value);
        return;
    }

    let entry = map
        .entry(field)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        assign(child, rest, value);
    }
}

/// Coerce a raw string to the JSON shape of `like`.
///
/// Falls back to a plain string when `raw` does not fit the shape, so the
/// type error surfaces when the options object is populated.
///
/// ```
/// use cliwork::core::config::store::coerce;
/// use serde_json::json;
///
/// assert_eq!(coerce("6380", &json!(6379)), json!(6380));
/// assert_eq!(coerce("false", &json!(true)), json!(false));
/// assert_eq!(coerce("a,b", &json!([])), json!(["a", "b"]));
/// assert_eq!(coerce("high", &json!(1)), json!("high"));
/// ```
pub fn coerce(raw: &str, like: &Value) -> Value {
    let fallback = || Value::String(raw.to_string());
    match like {
        Value::Bool(_) => parse_bool(raw).map(Value::Bool).unwrap_or_else(fallback),
        Value::Number(n) if n.is_f64() => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        Value::Number(_) => {
            let raw = raw.trim();
            if let Ok(i) = raw.parse::<i64>() {
                Value::from(i)
            } else if let Ok(u) = raw.parse::<u64>() {
                Value::from(u)
            } else {
                fallback()
            }
        }
        Value::Array(items) => {
            let element = items.first();
            Value::Array(
                split_list(raw)
                    .into_iter()
                    .map(|item| match element {
                        Some(like) if !like.is_string() => coerce(&item, like),
                        _ => Value::String(item),
                    })
                    .collect(),
            )
        }
        _ => fallback(),
    }
}

/// Flatten a value tree into dotted leaf keys.
///
/// Arrays are leaves. Empty objects produce no keys.
///
/// ```
/// use cliwork::core::config::store::flatten;
/// use serde_json::json;
///
/// let flat = flatten(&json!({"redis": {"host": "h", "addrs": ["a"]}}));
/// let keys: Vec<_> = flat.keys().cloned().collect();
/// assert_eq!(keys, ["redis.addrs", "redis.host"]);
/// ```
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, path: String, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_into(child, child_path, out);
            }
        }
        leaf => {
            if !path.is_empty() {
                out.insert(path, leaf.clone());
            }
        }
    }
}
