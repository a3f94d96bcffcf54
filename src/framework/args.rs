//! Command-line parsing.
//!
//! The command line has two halves separated by a literal `--`:
//!
//! ```text
//! PROG [COMMAND_NAME] COMMAND_OPTIONS... [-- [FRAMEWORK_OPTIONS...]]
//! ```
//!
//! Command tokens are split into positional and `--key=value` keyword
//! arguments. Framework tokens are parsed by clap against a fixed flag set.

use crate::error::{DushError, Result};
use crate::framework::registry::{CommandRegistry, MAIN_COMMAND_NAME, RegistryMode};
use clap::Parser;
use std::collections::BTreeMap;

const DIVIDER: &str = "--";
const ESCAPED_DASHES: &str = "\\--";

/// Options intended for the framework rather than the command.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "framework options",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct FrameworkFlags {
    /// Use the given project directory instead of discovering it
    #[arg(short = 'p', long = "project-dir-force", value_name = "PROJECT_DIR_FORCE")]
    pub project_dir_force: Option<String>,

    /// Print full error details
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print the execution summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Show help for the selected command
    #[arg(short, long)]
    pub help: bool,
}

impl FrameworkFlags {
    /// Parse the tokens that followed the divider.
    pub fn parse_tokens(tokens: &[String]) -> Result<Self> {
        let flags = Self::try_parse_from(tokens).map_err(|e| {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            DushError::Parse(format!(
                "invalid framework options: {}",
                first.trim_start_matches("error: ")
            ))
        })?;

        if flags.verbose && flags.quiet {
            return Err(DushError::Parse(
                "cannot enable both quiet and verbose mode".to_string(),
            ));
        }
        Ok(flags)
    }
}

/// Everything extracted from one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArguments {
    pub process_name: String,
    pub command_name: String,
    pub positional: Vec<String>,
    pub keyword: BTreeMap<String, String>,
    pub flags: FrameworkFlags,
}

/// Parse `argv` (including the program name) against `registry`.
///
/// # Errors
///
/// * `MissingCommand` - multiple mode and no command name, or a name that looks like a flag
/// * `Parse` - malformed keyword token or framework options
/// * `IncorrectRegistryState` - nothing is registered
pub fn parse(argv: &[String], registry: &CommandRegistry) -> Result<ParsedArguments> {
    let Some((process_name, mut rest)) = argv.split_first() else {
        return Err(DushError::Parse("empty command line".to_string()));
    };

    let command_name = match registry.mode() {
        RegistryMode::Single => MAIN_COMMAND_NAME.to_string(),
        RegistryMode::Multiple => match rest.split_first() {
            Some((name, tail)) if !name.starts_with('-') => {
                rest = tail;
                name.clone()
            }
            _ => return Err(DushError::MissingCommand),
        },
        RegistryMode::Uninitialized => {
            return Err(DushError::IncorrectRegistryState(
                "no commands are registered".to_string(),
            ));
        }
    };

    let (command_tokens, framework_tokens) = match rest.iter().position(|t| t == DIVIDER) {
        Some(index) => (&rest[..index], &rest[index + 1..]),
        None => (rest, &[][..]),
    };

    // Unknown commands parse as keyword-capable; lookup reports them later.
    let keywords_supported = registry
        .get(&command_name)
        .is_none_or(|c| c.schema().accepts_keywords());

    let (positional, keyword) = split_command_tokens(command_tokens, keywords_supported)?;
    let flags = FrameworkFlags::parse_tokens(framework_tokens)?;

    tracing::debug!(
        command = %command_name,
        positional = positional.len(),
        keyword = keyword.len(),
        "parsed command line"
    );

    Ok(ParsedArguments {
        process_name: process_name.clone(),
        command_name,
        positional,
        keyword,
        flags,
    })
}

fn split_command_tokens(
    tokens: &[String],
    keywords_supported: bool,
) -> Result<(Vec<String>, BTreeMap<String, String>)> {
    let mut positional = Vec::new();
    let mut keyword = BTreeMap::new();

    for token in tokens {
        if !keywords_supported {
            positional.push(token.clone());
        } else if let Some(body) = token.strip_prefix("--") {
            let Some((key, value)) = body.split_once('=').filter(|(_, v)| !v.contains('=')) else {
                return Err(DushError::Parse(format!(
                    "Argument \"{}\" is incorrect - keyword arguments should be specified as --key=value",
                    token
                )));
            };
            keyword.insert(key.to_string(), value.to_string());
        } else if token.starts_with(ESCAPED_DASHES) {
            positional.push(token[1..].to_string());
        } else {
            positional.push(token.clone());
        }
    }
    Ok((positional, keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::registry::{ArgSchema, CommandSpec};

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn multi() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register_named(
                CommandSpec::new("build", |_| Ok(()))
                    .args(ArgSchema::new().optional("target", "debug")),
            )
            .unwrap();
        registry
            .register_named(CommandSpec::new("exec", |_| Ok(())).args(ArgSchema::new().variadic("command")))
            .unwrap();
        registry
    }

    #[test]
    fn parses_command_keyword_and_framework_flag() {
        let parsed = parse(&argv(&["tool", "build", "--target=release", "--", "-v"]), &multi()).unwrap();

        assert_eq!(parsed.process_name, "tool");
        assert_eq!(parsed.command_name, "build");
        assert!(parsed.positional.is_empty());
        assert_eq!(parsed.keyword["target"], "release");
        assert!(parsed.flags.verbose);
        assert!(!parsed.flags.quiet);
    }

    #[test]
    fn missing_command_name() {
        let err = parse(&argv(&["tool"]), &multi()).unwrap_err();
        assert!(matches!(err, DushError::MissingCommand));

        let err = parse(&argv(&["tool", "-v"]), &multi()).unwrap_err();
        assert!(matches!(err, DushError::MissingCommand));
    }

    #[test]
    fn single_mode_uses_main_name() {
        let mut registry = CommandRegistry::new();
        registry.register_single(CommandSpec::new("x", |_| Ok(()))).unwrap();

        let parsed = parse(&argv(&["tool", "value"]), &registry).unwrap();
        assert_eq!(parsed.command_name, MAIN_COMMAND_NAME);
        assert_eq!(parsed.positional, vec!["value"]);
    }

    #[test]
    fn uninitialized_registry_cannot_parse() {
        let err = parse(&argv(&["tool", "x"]), &CommandRegistry::new()).unwrap_err();
        assert!(matches!(err, DushError::IncorrectRegistryState(_)));
    }

    #[test]
    fn escaped_dashes_become_positional() {
        let parsed = parse(&argv(&["tool", "build", "\\--literal"]), &multi()).unwrap();
        assert_eq!(parsed.positional, vec!["--literal"]);
        assert!(parsed.keyword.is_empty());
    }

    #[test]
    fn keyword_token_needs_exactly_one_equals() {
        let err = parse(&argv(&["tool", "build", "--target"]), &multi()).unwrap_err();
        assert!(matches!(err, DushError::Parse(_)));
        assert!(err.to_string().contains("--key=value"));

        let err = parse(&argv(&["tool", "build", "--a=b=c"]), &multi()).unwrap_err();
        assert!(matches!(err, DushError::Parse(_)));
    }

    #[test]
    fn empty_keyword_value_is_allowed() {
        let parsed = parse(&argv(&["tool", "build", "--target="]), &multi()).unwrap();
        assert_eq!(parsed.keyword["target"], "");
    }

    #[test]
    fn variadic_command_takes_tokens_verbatim() {
        let parsed = parse(
            &argv(&["tool", "exec", "ls", "--all", "\\--x", "--", "-q"]),
            &multi(),
        )
        .unwrap();
        assert_eq!(parsed.positional, vec!["ls", "--all", "\\--x"]);
        assert!(parsed.keyword.is_empty());
        assert!(parsed.flags.quiet);
    }

    #[test]
    fn unknown_command_parses_keywords() {
        let parsed = parse(&argv(&["tool", "deploy", "--env=prod"]), &multi()).unwrap();
        assert_eq!(parsed.command_name, "deploy");
        assert_eq!(parsed.keyword["env"], "prod");
    }

    #[test]
    fn framework_value_after_divider() {
        let parsed = parse(&argv(&["tool", "build", "a", "--", "-p", "proj"]), &multi()).unwrap();
        assert_eq!(parsed.positional, vec!["a"]);
        assert_eq!(parsed.flags.project_dir_force.as_deref(), Some("proj"));
    }

    #[test]
    fn long_framework_options() {
        let parsed = parse(
            &argv(&["tool", "build", "--", "--project-dir-force", "proj", "--help"]),
            &multi(),
        )
        .unwrap();
        assert_eq!(parsed.flags.project_dir_force.as_deref(), Some("proj"));
        assert!(parsed.flags.help);
    }

    #[test]
    fn unknown_framework_option_is_rejected() {
        let err = parse(&argv(&["tool", "build", "--", "--bogus"]), &multi()).unwrap_err();
        assert!(matches!(err, DushError::Parse(_)));
        assert!(err.to_string().starts_with("invalid framework options"));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let err = parse(&argv(&["tool", "build", "--", "-v", "-q"]), &multi()).unwrap_err();
        assert!(err.to_string().contains("quiet and verbose"));
    }

    #[test]
    fn no_divider_means_default_flags() {
        let parsed = parse(&argv(&["tool", "build", "x"]), &multi()).unwrap();
        assert_eq!(parsed.flags, FrameworkFlags::default());
    }
}
