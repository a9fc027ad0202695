//! cli::build
//!
//! Translation between the command tree and `clap`.
//!
//! # Rules
//!
//! - Every flag group becomes a help heading (`redis` -> "Redis flags"),
//!   in registration order. The built-in `global` group comes first
//! - Values are read back as strings and parsed by
//!   [`FlagValue::parse`](crate::core::flags::FlagValue::parse); clap never
//!   sees a default, so "given on the command line" is exactly
//!   `ValueSource::CommandLine`
//! - Boolean flags take an optional `=value` (`--tls`, `--tls=false`)
//! - List flags may repeat and split on `,`
//! - Repeating any other flag keeps the last value
//! - Every name clap owns is either a built-in flag in the `global` group
//!   (`--help`/`-h`, `--config`/`-c`, `--version`) or unreachable from a
//!   flag name (the positional id contains `_`, which names never keep), so
//!   a clash surfaces as a [`FlagError`] before clap sees the command

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};

use super::version;
use crate::core::flags::{
    FlagDefinition, FlagError, FlagKind, FlagValue, MergedFlagSet, NamedFlagSets,
};
use crate::engine::runner::Action;

/// Name of the built-in flag group.
pub const GLOBAL_GROUP: &str = "global";

/// Name of the reserved configuration-file flag.
pub const CONFIG_FLAG: &str = "config";

/// Name of the built-in help flag.
pub const HELP_FLAG: &str = "help";
const ARGS_ID: &str = "_args";

/// The built-in group: `--help`/`-h`, then `--config`/`-c` and `--version`
/// unless disabled.
pub fn global_flags(basename: &str, config: bool, version: bool) -> NamedFlagSets {
    let mut fss = NamedFlagSets::new();
    let global = fss.flag_set(GLOBAL_GROUP);
    global.add(
        FlagDefinition::new(HELP_FLAG, FlagValue::Bool(false), "Print help.")
            .with_shorthand('h')
            .unbound(),
    );
    if config {
        global.add(
            FlagDefinition::new(
                CONFIG_FLAG,
                FlagValue::String(String::new()),
                &format!(
                    "Read configuration from specified `FILE`, support JSON, TOML, YAML, HCL, or Java properties formats. Defaults to {}.<ext> in the working directory.",
                    basename
                ),
            )
            .with_shorthand('c')
            .unbound(),
        );
    }
    if version {
        global.add(
            FlagDefinition::new(
                version::FLAG_NAME,
                FlagValue::String("false".into()),
                "Print version information and quit (--version=raw for a plain listing).",
            )
            .unbound(),
        );
    }
    fss
}

/// Global flags followed by the action's own, merged.
///
/// # Errors
///
/// Returns `FlagError::Duplicate`/`DuplicateShorthand` when two flags clash,
/// including a user flag reusing a reserved name or shorthand.
pub fn node_flags(
    global: &NamedFlagSets,
    action: Option<&dyn Action>,
) -> Result<MergedFlagSet, FlagError> {
    let mut fss = global.clone();
    if let Some(action) = action {
        fss.extend(action.flag_sets());
    }
    fss.merged()
}

/// Help heading for a flag group.
///
/// ```
/// use cliwork::cli::build::heading;
///
/// assert_eq!(heading("redis"), "Redis flags");
/// assert_eq!(heading(""), " flags");
/// ```
pub fn heading(group: &str) -> String {
    let mut chars = group.chars();
    match chars.next() {
        Some(first) => format!("{}{} flags", first.to_uppercase(), chars.as_str()),
        None => " flags".to_string(),
    }
}

/// Shape of one clap command.
pub struct NodeSpec<'a> {
    pub name: &'a str,
    pub about: &'a str,
    pub long_about: Option<&'a str>,
    pub flags: &'a MergedFlagSet,
    /// Register the global group here (root only; clap propagates it).
    pub root: bool,
    /// Accept positional arguments (leaf nodes only).
    pub positional: bool,
    pub show_positional: bool,
}

/// Build the clap command for one node, without children.
pub fn clap_command(spec: NodeSpec<'_>) -> clap::Command {
    let mut cmd = clap::Command::new(spec.name.to_string())
        .about(spec.about.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true);
    if let Some(long) = spec.long_about {
        cmd = cmd.long_about(long.to_string());
    }

    if spec.root {
        cmd = cmd.arg(
            Arg::new(HELP_FLAG)
                .short('h')
                .long(HELP_FLAG)
                .action(ArgAction::Help)
                .global(true)
                .help(format!("help for {}", spec.name))
                .help_heading(heading(GLOBAL_GROUP)),
        );
    }

    for (group, flag) in spec.flags.entries() {
        let is_global = group == GLOBAL_GROUP;
        if is_global && (!spec.root || flag.name() == HELP_FLAG) {
            continue;
        }
        cmd = cmd.arg(clap_arg(group, flag).global(is_global));
    }

    if spec.positional {
        cmd = cmd.arg(
            Arg::new(ARGS_ID)
                .value_name("ARGS")
                .num_args(0..)
                .action(ArgAction::Append)
                .hide(!spec.show_positional),
        );
    }
    cmd
}

fn clap_arg(group: &str, flag: &FlagDefinition) -> Arg {
    let mut arg = Arg::new(flag.name().to_string())
        .long(flag.name().to_string())
        .help(help_text(flag))
        .help_heading(heading(group));
    if let Some(short) = flag.shorthand() {
        arg = arg.short(short);
    }

    if flag.name() == version::FLAG_NAME && group == GLOBAL_GROUP {
        return optional_value(arg, "true");
    }
    match flag.kind() {
        FlagKind::Bool => optional_value(arg, "true"),
        FlagKind::StringList => arg
            .value_name("strings")
            .action(ArgAction::Append)
            .value_delimiter(','),
        kind => arg.value_name(kind.type_name()).action(ArgAction::Set),
    }
}

fn optional_value(arg: Arg, missing: &'static str) -> Arg {
    arg.num_args(0..=1)
        .require_equals(true)
        .default_missing_value(missing)
        .action(ArgAction::Set)
}

fn help_text(flag: &FlagDefinition) -> String {
    let shown = match flag.default_value() {
        FlagValue::Bool(false) => None,
        FlagValue::String(s) if s.is_empty() => None,
        FlagValue::String(s) => Some(format!("{:?}", s)),
        FlagValue::StringList(items) if items.is_empty() => None,
        FlagValue::Int(0) => None,
        other => Some(other.to_string()),
    };
    match shown {
        Some(default) => format!("{} (default {})", flag.usage(), default),
        None => flag.usage().to_string(),
    }
}

/// Copy command-line values from `matches` into `flags`, setting their
/// changed bits.
///
/// # Errors
///
/// Returns `FlagError::InvalidValue` for a value that does not parse.
pub fn extract(matches: &ArgMatches, flags: &mut MergedFlagSet) -> Result<(), FlagError> {
    let given: Vec<(String, String)> = flags
        .flags()
        .filter(|f| matches.value_source(f.name()) == Some(ValueSource::CommandLine))
        .filter_map(|f| {
            let values: Vec<String> = matches
                .try_get_many::<String>(f.name())
                .ok()
                .flatten()?
                .cloned()
                .collect();
            Some((f.name().to_string(), values.join(",")))
        })
        .collect();

    for (name, raw) in given {
        flags.set_raw(&name, &raw)?;
    }
    Ok(())
}

/// Positional arguments of a leaf node.
pub fn positional(matches: &ArgMatches) -> Vec<String> {
    matches
        .try_get_many::<String>(ARGS_ID)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_flags() -> NamedFlagSets {
        let mut fss = global_flags("demo", true, true);
        fss.flag_set("redis")
            .string("redis.host", "127.0.0.1", "Redis host")
            .bool("redis.tls", false, "Use TLS")
            .string_list("redis.addrs", &[], "Cluster addresses");
        fss
    }

    fn parse(args: &[&str]) -> MergedFlagSet {
        let mut flags = user_flags().merged().unwrap();
        let cmd = clap_command(NodeSpec {
            name: "demo",
            about: "",
            long_about: None,
            flags: &flags,
            root: true,
            positional: true,
            show_positional: false,
        });
        let matches = cmd
            .try_get_matches_from(std::iter::once("demo").chain(args.iter().copied()))
            .unwrap();
        extract(&matches, &mut flags).unwrap();
        flags
    }

    #[test]
    fn absent_flags_stay_unchanged() {
        let flags = parse(&[]);
        assert!(flags.flags().all(|f| !f.is_changed()));
    }

    #[test]
    fn given_values_are_parsed_and_marked() {
        let flags = parse(&["--redis.host=10.0.0.5", "--redis.tls", "-c", "app.yaml"]);
        let host = flags.lookup("redis.host").unwrap();
        assert!(host.is_changed());
        assert_eq!(host.value(), &FlagValue::String("10.0.0.5".into()));
        assert_eq!(flags.lookup("redis.tls").unwrap().value(), &FlagValue::Bool(true));
        assert_eq!(
            flags.lookup("config").unwrap().value(),
            &FlagValue::String("app.yaml".into())
        );
    }

    #[test]
    fn bool_accepts_explicit_false() {
        let flags = parse(&["--redis.tls=false"]);
        let tls = flags.lookup("redis.tls").unwrap();
        assert!(tls.is_changed());
        assert_eq!(tls.value(), &FlagValue::Bool(false));
    }

    #[test]
    fn lists_split_and_repeat() {
        let flags = parse(&["--redis.addrs=a,b", "--redis.addrs", "c"]);
        assert_eq!(
            flags.lookup("redis.addrs").unwrap().value(),
            &FlagValue::StringList(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn last_value_wins_on_repeat() {
        let flags = parse(&["--redis.host=a", "--redis.host=b"]);
        assert_eq!(
            flags.lookup("redis.host").unwrap().value(),
            &FlagValue::String("b".into())
        );
    }

    #[test]
    fn version_takes_optional_value() {
        let flags = parse(&["--version"]);
        assert_eq!(
            flags.lookup("version").unwrap().value(),
            &FlagValue::String("true".into())
        );
        let flags = parse(&["--version=raw"]);
        assert_eq!(
            flags.lookup("version").unwrap().value(),
            &FlagValue::String("raw".into())
        );
    }

    #[test]
    fn reserved_names_clash_with_user_flags() {
        let mut fss = global_flags("demo", true, false);
        fss.flag_set("generic").string("config", "", "");
        assert!(matches!(fss.merged(), Err(FlagError::Duplicate { .. })));
    }

    #[test]
    fn disabled_builtins_are_absent() {
        let flags = global_flags("demo", false, false).merged().unwrap();
        let names: Vec<_> = flags.flags().map(|f| f.name()).collect();
        assert_eq!(names, [HELP_FLAG]);
    }

    #[test]
    fn help_name_and_shorthand_are_reserved() {
        let mut fss = global_flags("demo", false, false);
        fss.flag_set("generic").string("help", "", "");
        assert!(matches!(fss.merged(), Err(FlagError::Duplicate { .. })));

        let mut fss = global_flags("demo", false, false);
        fss.flag_set("generic").string_p("host", 'h', "", "");
        assert!(matches!(
            fss.merged(),
            Err(FlagError::DuplicateShorthand { shorthand: 'h', .. })
        ));
    }

    #[test]
    fn flag_named_args_is_not_the_positional() {
        let mut fss = global_flags("demo", true, true);
        fss.flag_set("generic").string_list("args", &[], "Extra arguments");
        let mut flags = fss.merged().unwrap();
        let cmd = clap_command(NodeSpec {
            name: "demo",
            about: "",
            long_about: None,
            flags: &flags,
            root: true,
            positional: true,
            show_positional: true,
        });
        let matches = cmd
            .try_get_matches_from(["demo", "--args=a,b", "rest"])
            .unwrap();
        extract(&matches, &mut flags).unwrap();

        assert_eq!(
            flags.lookup("args").unwrap().value(),
            &FlagValue::StringList(vec!["a".into(), "b".into()])
        );
        assert_eq!(positional(&matches), ["rest"]);
    }

    #[test]
    fn help_text_shows_defaults() {
        let flags = user_flags().merged().unwrap();
        assert_eq!(
            help_text(flags.lookup("redis.host").unwrap()),
            "Redis host (default \"127.0.0.1\")"
        );
        assert_eq!(help_text(flags.lookup("redis.tls").unwrap()), "Use TLS");
    }
}
