//! core::flags
//!
//! Flag definitions and the flag group registry.
//!
//! # Overview
//!
//! Options objects declare their flags in named groups ([`FlagSet`]) held by a
//! [`NamedFlagSets`] registry. Groups are kept in insertion order, and so are
//! the flags inside each group, which makes help output deterministic.
//!
//! Before arguments are parsed, the groups of one command are merged into a
//! single [`MergedFlagSet`]. That merged set is what the argument parser fills
//! in and what the resolution engine binds into the configuration store.
//!
//! # Invariants
//!
//! - A flag name is unique across all groups of one registry. This is only
//!   checked when the groups are merged ([`NamedFlagSets::merged`])
//! - A shorthand is unique within the merged flag set
//! - Flag names never contain `_`; it is rewritten to `-` on registration
//!
//! # Example
//!
//! ```
//! use cliwork::core::flags::NamedFlagSets;
//!
//! let mut fss = NamedFlagSets::new();
//! fss.flag_set("redis").string("redis.host", "127.0.0.1", "Redis host");
//! fss.flag_set("redis").int("redis.port", 6379, "Redis port");
//!
//! let names: Vec<_> = fss.flag_set("redis").flags().iter().map(|f| f.name()).collect();
//! assert_eq!(names, ["redis.host", "redis.port"]);
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Errors from flag registration and parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlagError {
    #[error("flag redefined: {name}")]
    Duplicate { name: String },

    #[error("unable to redefine '{shorthand}' shorthand for flag '{name}': already used for '{existing}'")]
    DuplicateShorthand {
        shorthand: char,
        name: String,
        existing: String,
    },

    #[error("invalid argument \"{value}\" for \"--{name}\" flag: expected {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("unknown flag: --{0}")]
    Unknown(String),
}

/// The value type of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Bool,
    String,
    Int,
    Float,
    StringList,
}

impl FlagKind {
    /// Type name shown in help output and parse errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagKind::Bool => "bool",
            FlagKind::String => "string",
            FlagKind::Int => "int",
            FlagKind::Float => "float",
            FlagKind::StringList => "strings",
        }
    }
}

/// A typed flag value.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Int(i64),
    Float(f64),
    StringList(Vec<String>),
}

impl FlagValue {
    /// The kind of this value.
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::Float(_) => FlagKind::Float,
            FlagValue::StringList(_) => FlagKind::StringList,
        }
    }

    /// Parse a raw command-line or environment string as a value of `kind`.
    ///
    /// Booleans accept `1`, `t`, `true`, `0`, `f` and `false` (lower, upper
    /// or title case). String lists are
    /// comma-separated with surrounding whitespace trimmed.
    ///
    /// # Example
    ///
    /// ```
    /// use cliwork::core::flags::{FlagKind, FlagValue};
    ///
    /// assert_eq!(FlagValue::parse(FlagKind::Int, "42"), Some(FlagValue::Int(42)));
    /// assert_eq!(FlagValue::parse(FlagKind::Bool, "T"), Some(FlagValue::Bool(true)));
    /// assert_eq!(FlagValue::parse(FlagKind::Int, "forty"), None);
    /// ```
    pub fn parse(kind: FlagKind, raw: &str) -> Option<Self> {
        match kind {
            FlagKind::Bool => parse_bool(raw).map(FlagValue::Bool),
            FlagKind::String => Some(FlagValue::String(raw.to_string())),
            FlagKind::Int => raw.trim().parse().ok().map(FlagValue::Int),
            FlagKind::Float => raw.trim().parse().ok().map(FlagValue::Float),
            FlagKind::StringList => Some(FlagValue::StringList(split_list(raw))),
        }
    }

    /// Convert to a JSON value for the configuration store.
    pub fn to_json(&self) -> Value {
        match self {
            FlagValue::Bool(b) => Value::Bool(*b),
            FlagValue::String(s) => Value::String(s.clone()),
            FlagValue::Int(i) => Value::from(*i),
            FlagValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FlagValue::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::String(s) => write!(f, "{}", s),
            FlagValue::Int(i) => write!(f, "{}", i),
            FlagValue::Float(v) => write!(f, "{}", v),
            FlagValue::StringList(items) => write!(f, "[{}]", items.join(",")),
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// Rewrite `_` word separators in a flag name to `-`.
///
/// ```
/// use cliwork::core::flags::normalize_name;
///
/// assert_eq!(normalize_name("mysql.max_idle"), "mysql.max-idle");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.replace('_', "-")
}

/// A single command-line flag.
///
/// The flag's name doubles as its binding: `redis.host` binds to the
/// `host` field nested under `redis` in the options object.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDefinition {
    name: String,
    shorthand: Option<char>,
    usage: String,
    default: FlagValue,
    value: Option<FlagValue>,
    changed: bool,
    bound: bool,
}

impl FlagDefinition {
    /// Create a flag bound to the key path equal to its (normalized) name.
    pub fn new(name: &str, default: FlagValue, usage: &str) -> Self {
        Self {
            name: normalize_name(name),
            shorthand: None,
            usage: usage.to_string(),
            default,
            value: None,
            changed: false,
            bound: true,
        }
    }

    /// Attach a single-character shorthand (`-c`).
    pub fn with_shorthand(mut self, shorthand: char) -> Self {
        self.shorthand = Some(shorthand);
        self
    }

    /// Mark this flag as not bound to any options field.
    ///
    /// Built-in flags such as `--config` are unbound: they steer the
    /// framework and never reach the configuration store.
    pub fn unbound(mut self) -> Self {
        self.bound = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shorthand(&self) -> Option<char> {
        self.shorthand
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    /// The current value, falling back to the default.
    pub fn value(&self) -> &FlagValue {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// Whether a source other than the default supplied a value.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Whether the flag counts as explicitly supplied for diagnostics:
    /// it was changed, or its current value differs from its default.
    pub fn is_explicit(&self) -> bool {
        self.changed || self.value() != &self.default
    }

    /// Set the value and mark the flag as changed.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::InvalidValue` if the value's kind does not match
    /// the flag's kind.
    pub fn set(&mut self, value: FlagValue) -> Result<(), FlagError> {
        if value.kind() != self.kind() {
            return Err(FlagError::InvalidValue {
                name: self.name.clone(),
                value: value.to_string(),
                expected: self.kind().type_name(),
            });
        }
        self.value = Some(value);
        self.changed = true;
        Ok(())
    }

    /// Parse `raw` according to the flag's kind and set it.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::InvalidValue` if `raw` does not parse.
    pub fn set_raw(&mut self, raw: &str) -> Result<(), FlagError> {
        let value = FlagValue::parse(self.kind(), raw).ok_or_else(|| FlagError::InvalidValue {
            name: self.name.clone(),
            value: raw.to_string(),
            expected: self.kind().type_name(),
        })?;
        self.set(value)
    }
}

/// A named group of flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlagSet {
    name: String,
    flags: Vec<FlagDefinition>,
}

impl FlagSet {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flags in registration order.
    pub fn flags(&self) -> &[FlagDefinition] {
        &self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Look up a flag by (normalized) name.
    pub fn lookup(&self, name: &str) -> Option<&FlagDefinition> {
        let name = normalize_name(name);
        self.flags.iter().find(|f| f.name == name)
    }

    /// Append a flag definition.
    pub fn add(&mut self, flag: FlagDefinition) -> &mut Self {
        self.flags.push(flag);
        self
    }

    pub fn bool(&mut self, name: &str, default: bool, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(name, FlagValue::Bool(default), usage))
    }

    pub fn bool_p(&mut self, name: &str, shorthand: char, default: bool, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(name, FlagValue::Bool(default), usage).with_shorthand(shorthand))
    }

    pub fn string(&mut self, name: &str, default: &str, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(
            name,
            FlagValue::String(default.to_string()),
            usage,
        ))
    }

    pub fn string_p(&mut self, name: &str, shorthand: char, default: &str, usage: &str) -> &mut Self {
        self.add(
            FlagDefinition::new(name, FlagValue::String(default.to_string()), usage)
                .with_shorthand(shorthand),
        )
    }

    pub fn int(&mut self, name: &str, default: i64, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(name, FlagValue::Int(default), usage))
    }

    pub fn int_p(&mut self, name: &str, shorthand: char, default: i64, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(name, FlagValue::Int(default), usage).with_shorthand(shorthand))
    }

    pub fn float(&mut self, name: &str, default: f64, usage: &str) -> &mut Self {
        self.add(FlagDefinition::new(name, FlagValue::Float(default), usage))
    }

    pub fn string_list(&mut self, name: &str, default: &[&str], usage: &str) -> &mut Self {
        let default = default.iter().map(|s| s.to_string()).collect();
        self.add(FlagDefinition::new(
            name,
            FlagValue::StringList(default),
            usage,
        ))
    }
}

/// Insertion-ordered registry of flag groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedFlagSets {
    sets: Vec<FlagSet>,
}

impl NamedFlagSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the group called `name`, creating an empty one at the end of
    /// the registry if it does not exist yet.
    pub fn flag_set(&mut self, name: &str) -> &mut FlagSet {
        let index = match self.sets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sets.push(FlagSet::new(name));
                self.sets.len() - 1
            }
        };
        &mut self.sets[index]
    }

    /// Look up a group without creating it.
    pub fn get(&self, name: &str) -> Option<&FlagSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// All groups in registration order.
    pub fn all(&self) -> &[FlagSet] {
        &self.sets
    }

    /// True if no group holds any flag.
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(FlagSet::is_empty)
    }

    /// Append every group of `other`, merging into groups of the same name.
    pub fn extend(&mut self, other: NamedFlagSets) {
        for set in other.sets {
            let target = self.flag_set(&set.name);
            target.flags.extend(set.flags);
        }
    }

    /// Merge all groups into one flat flag set.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::Duplicate` naming the first flag that appears twice
    /// (in any groups), or `FlagError::DuplicateShorthand` for a reused shorthand.
    pub fn merged(&self) -> Result<MergedFlagSet, FlagError> {
        let mut merged = MergedFlagSet::default();
        for set in &self.sets {
            for flag in &set.flags {
                if merged.lookup(&flag.name).is_some() {
                    return Err(FlagError::Duplicate {
                        name: flag.name.clone(),
                    });
                }
                if let Some(short) = flag.shorthand {
                    if let Some(existing) = merged.flags().find(|f| f.shorthand == Some(short)) {
                        return Err(FlagError::DuplicateShorthand {
                            shorthand: short,
                            name: flag.name.clone(),
                            existing: existing.name.clone(),
                        });
                    }
                }
                merged.entries.push((set.name.clone(), flag.clone()));
            }
        }
        Ok(merged)
    }
}

/// The flags of one command, flattened across groups.
///
/// Each entry remembers the group it came from so help output can keep
/// its sections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedFlagSet {
    entries: Vec<(String, FlagDefinition)>,
}

impl MergedFlagSet {
    /// `(group, flag)` pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FlagDefinition)> {
        self.entries.iter().map(|(group, flag)| (group.as_str(), flag))
    }

    pub fn flags(&self) -> impl Iterator<Item = &FlagDefinition> {
        self.entries.iter().map(|(_, flag)| flag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn lookup(&self, name: &str) -> Option<&FlagDefinition> {
        let name = normalize_name(name);
        self.flags().find(|f| f.name == name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut FlagDefinition> {
        let name = normalize_name(name);
        self.entries
            .iter_mut()
            .map(|(_, flag)| flag)
            .find(|f| f.name == name)
    }

    /// Parse and set the flag called `name`.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::Unknown` for an undeclared flag, or
    /// `FlagError::InvalidValue` if the value does not parse.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> Result<(), FlagError> {
        self.lookup_mut(name)
            .ok_or_else(|| FlagError::Unknown(normalize_name(name)))?
            .set_raw(raw)
    }

    /// Flags that count as explicitly supplied, in registration order.
    pub fn explicit(&self) -> Vec<&FlagDefinition> {
        self.flags().filter(|f| f.is_explicit()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_accessor_is_idempotent() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis").string("host", "127.0.0.1", "");
        fss.flag_set("mysql").string("mysql.host", "127.0.0.1", "");
        fss.flag_set("redis").int("port", 6379, "");

        let groups: Vec<_> = fss.all().iter().map(|s| s.name()).collect();
        assert_eq!(groups, ["redis", "mysql"]);

        let redis: Vec<_> = fss.get("redis").unwrap().flags().iter().map(|f| f.name()).collect();
        assert_eq!(redis, ["host", "port"]);
    }

    #[test]
    fn underscores_are_normalized() {
        let mut set = FlagSet::new("mysql");
        set.int("mysql.max_idle_connections", 100, "");
        assert_eq!(set.flags()[0].name(), "mysql.max-idle-connections");
        assert!(set.lookup("mysql.max_idle_connections").is_some());
    }

    #[test]
    fn duplicate_across_groups_detected_on_merge() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("a").string("host", "", "");
        fss.flag_set("b").string("host", "", "");

        let err = fss.merged().unwrap_err();
        assert_eq!(
            err,
            FlagError::Duplicate {
                name: "host".to_string()
            }
        );
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn duplicate_shorthand_detected_on_merge() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("a").string_p("config", 'c', "", "");
        fss.flag_set("b").int_p("count", 'c', 0, "");

        match fss.merged().unwrap_err() {
            FlagError::DuplicateShorthand {
                shorthand, existing, ..
            } => {
                assert_eq!(shorthand, 'c');
                assert_eq!(existing, "config");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merged_keeps_group_and_flag_order() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("global").bool("debug", false, "");
        fss.flag_set("redis").string("redis.host", "", "");
        fss.flag_set("global").string("log", "", "");

        let merged = fss.merged().unwrap();
        let entries: Vec<_> = merged.entries().map(|(g, f)| (g, f.name())).collect();
        assert_eq!(
            entries,
            [("global", "debug"), ("global", "log"), ("redis", "redis.host")]
        );
    }

    #[test]
    fn set_raw_marks_changed_and_parses_kind() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis")
            .int("redis.port", 6379, "")
            .string_list("redis.addrs", &[], "");
        let mut merged = fss.merged().unwrap();

        merged.set_raw("redis.port", "6380").unwrap();
        merged.set_raw("redis.addrs", "a, b").unwrap();

        let port = merged.lookup("redis.port").unwrap();
        assert!(port.is_changed());
        assert_eq!(port.value(), &FlagValue::Int(6380));
        assert_eq!(
            merged.lookup("redis.addrs").unwrap().value(),
            &FlagValue::StringList(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn set_raw_rejects_bad_input() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis").int("redis.port", 6379, "");
        let mut merged = fss.merged().unwrap();

        let err = merged.set_raw("redis.port", "high").unwrap_err();
        assert!(matches!(err, FlagError::InvalidValue { expected: "int", .. }));
        assert!(matches!(
            merged.set_raw("nope", "1").unwrap_err(),
            FlagError::Unknown(_)
        ));
    }

    #[test]
    fn explicit_includes_changed_flags_even_at_default_value() {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis")
            .string("redis.host", "127.0.0.1", "")
            .int("redis.port", 6379, "");
        let mut merged = fss.merged().unwrap();
        merged.set_raw("redis.port", "6379").unwrap();

        let explicit: Vec<_> = merged.explicit().iter().map(|f| f.name()).collect();
        assert_eq!(explicit, ["redis.port"]);
    }

    #[test]
    fn flag_value_display_matches_help_format() {
        assert_eq!(FlagValue::Bool(true).to_string(), "true");
        assert_eq!(
            FlagValue::StringList(vec!["a".into(), "b".into()]).to_string(),
            "[a,b]"
        );
        assert_eq!(FlagValue::StringList(vec![]).to_json(), serde_json::json!([]));
    }
}
