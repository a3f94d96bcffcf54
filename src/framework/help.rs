//! Usage and help text.

use crate::framework::args::FrameworkFlags;
use crate::framework::registry::{CommandRegistry, CommandSpec, RegistryMode};
use clap::CommandFactory;
use std::path::Path;

/// Full help: usage line, available commands, arguments of `command` when
/// given, and the framework options.
pub fn render(process_name: &str, registry: &CommandRegistry, command: Option<&CommandSpec>) -> String {
    let mut out = String::new();
    out.push_str(&usage(process_name, registry.mode()));
    out.push_str("\n\n");

    if registry.mode() == RegistryMode::Multiple {
        out.push_str(&available_commands(registry));
        out.push('\n');
    }

    if let Some(command) = command {
        out.push_str(&command_help(command));
        out.push('\n');
    }

    out.push_str(&framework_options());
    out
}

pub fn usage(process_name: &str, mode: RegistryMode) -> String {
    let program = Path::new(process_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| process_name.to_string());

    let mut tokens = vec!["usage:".to_string(), program];
    if mode == RegistryMode::Multiple {
        tokens.push("COMMAND_NAME".to_string());
    }
    tokens.push("COMMAND_OPTIONS...".to_string());
    tokens.push("[-- [FRAMEWORK_OPTIONS...]]".to_string());
    tokens.join(" ")
}

pub fn available_commands(registry: &CommandRegistry) -> String {
    let mut out = String::from("Available commands:\n");
    for name in registry.list() {
        out.push_str(&format!("    {}\n", name));
    }
    out
}

/// Arguments of one command, in the style its arguments are passed.
pub fn command_help(command: &CommandSpec) -> String {
    let schema = command.schema();
    let name = command.name();

    if schema.is_empty() {
        return format!("The {} command does not take any arguments.\n", name);
    }

    let mut out = String::new();
    match schema.variadic_name() {
        None => {
            out.push_str(&format!(
                "The {} command supports both positional or keyword (key=value) styles of passing arguments. Arguments are:\n",
                name
            ));
            for param in schema.params() {
                match &param.default {
                    Some(default) => out.push_str(&format!("  --{}=\"{}\"\n", param.name, default)),
                    None => out.push_str(&format!("  --{}=  (required)\n", param.name)),
                }
            }
        }
        Some(tail) => {
            out.push_str(&format!(
                "The {} command supports only positional style of passing arguments. Arguments are:\n",
                name
            ));
            let mut items: Vec<String> = schema
                .params()
                .iter()
                .map(|p| match &p.default {
                    Some(default) => format!("{}(default: \"{}\")", p.name, default),
                    None => p.name.clone(),
                })
                .collect();
            items.push(format!("*{}", tail));
            out.push_str(&format!("  {}\n", items.join(", ")));
        }
    }
    out
}

/// Framework options, rendered from the clap definition.
pub fn framework_options() -> String {
    let command = FrameworkFlags::command();
    let mut out = String::from("Framework options parsed after '--' divider:\n");

    for arg in command.get_arguments() {
        let mut spec = Vec::new();
        if let Some(short) = arg.get_short() {
            spec.push(format!("-{}", short));
        }
        if let Some(long) = arg.get_long() {
            spec.push(format!("--{}", long));
        }
        let mut line = format!("  {}", spec.join(", "));
        if arg.get_action().takes_values()
            && let Some(value) = arg.get_value_names().and_then(|names| names.first())
        {
            line.push_str(&format!(" {}", value));
        }
        if let Some(help) = arg.get_help() {
            line = format!("{:<44}{}", line, help);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
