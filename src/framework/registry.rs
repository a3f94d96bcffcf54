//! Command registry.
//!
//! A registry holds either one implicit command (single mode) or any number
//! of named commands (multiple mode). The mode is chosen by the first
//! registration and never changes afterwards.

use crate::error::{DushError, Result};
use crate::framework::Invocation;
use std::fmt;

/// Name under which the single implicit command is stored.
pub const MAIN_COMMAND_NAME: &str = "main";

/// Signature of a command body.
pub type Handler = Box<dyn Fn(&Invocation) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    Uninitialized,
    Single,
    Multiple,
}

/// One declared parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` for required parameters.
    pub default: Option<String>,
}

impl Param {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declared arguments of a command: ordered parameters and an optional
/// variadic tail.
///
/// ```
/// use dush::framework::ArgSchema;
///
/// let schema = ArgSchema::new()
///     .required("target")
///     .optional("jobs", "0");
/// assert!(schema.accepts_keywords());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSchema {
    params: Vec<Param>,
    variadic: Option<String>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Collect every remaining positional token under `name`.
    pub fn variadic(mut self, name: impl Into<String>) -> Self {
        self.variadic = Some(name.into());
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn variadic_name(&self) -> Option<&str> {
        self.variadic.as_deref()
    }

    /// `--key=value` tokens are keywords unless a variadic tail is declared,
    /// in which case every token is positional.
    pub fn accepts_keywords(&self) -> bool {
        self.variadic.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.variadic.is_none()
    }
}

/// A command: name, declared arguments and body.
pub struct CommandSpec {
    name: String,
    schema: ArgSchema,
    handler: Handler,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Invocation) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            schema: ArgSchema::new(),
            handler: Box::new(handler),
        }
    }

    pub fn args(mut self, schema: ArgSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ArgSchema {
        &self.schema
    }

    pub fn invoke(&self, invocation: &Invocation) -> Result<()> {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct CommandRegistry {
    mode: RegistryMode,
    commands: Vec<CommandSpec>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            mode: RegistryMode::Uninitialized,
            commands: Vec::new(),
        }
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    /// Register the one implicit command. Its name is replaced by
    /// [`MAIN_COMMAND_NAME`].
    pub fn register_single(&mut self, mut spec: CommandSpec) -> Result<()> {
        match self.mode {
            RegistryMode::Uninitialized => {}
            RegistryMode::Single => {
                return Err(DushError::IncorrectRegistryState(
                    "cannot register the single command twice".to_string(),
                ));
            }
            RegistryMode::Multiple => {
                return Err(DushError::IncorrectRegistryState(
                    "cannot register a single command after named commands".to_string(),
                ));
            }
        }

        spec.name = MAIN_COMMAND_NAME.to_string();
        self.commands.push(spec);
        self.mode = RegistryMode::Single;
        tracing::trace!("registry switched to single-command mode");
        Ok(())
    }

    /// Register a named command. Registering a name again replaces the
    /// earlier command in place.
    pub fn register_named(&mut self, spec: CommandSpec) -> Result<()> {
        match self.mode {
            RegistryMode::Single => {
                return Err(DushError::IncorrectRegistryState(
                    "cannot register a named command after the single command".to_string(),
                ));
            }
            RegistryMode::Uninitialized => {
                self.mode = RegistryMode::Multiple;
                tracing::trace!("registry switched to multiple-command mode");
            }
            RegistryMode::Multiple => {}
        }

        match self.commands.iter_mut().find(|c| c.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.commands.push(spec),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Registered names in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> CommandSpec {
        CommandSpec::new(name, |_| Ok(()))
    }

    #[test]
    fn new_registry_is_uninitialized() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.mode(), RegistryMode::Uninitialized);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn single_command_is_stored_as_main() {
        let mut registry = CommandRegistry::new();
        registry.register_single(noop("build")).unwrap();

        assert_eq!(registry.mode(), RegistryMode::Single);
        assert_eq!(registry.list(), vec![MAIN_COMMAND_NAME]);
        assert!(registry.get("build").is_none());
        assert!(registry.get(MAIN_COMMAND_NAME).is_some());
    }

    #[test]
    fn single_twice_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register_single(noop("a")).unwrap();
        let err = registry.register_single(noop("b")).unwrap_err();
        assert!(matches!(err, DushError::IncorrectRegistryState(_)));
    }

    #[test]
    fn named_after_single_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register_single(noop("a")).unwrap();
        let err = registry.register_named(noop("b")).unwrap_err();
        assert!(matches!(err, DushError::IncorrectRegistryState(_)));
        assert_eq!(registry.mode(), RegistryMode::Single);
    }

    #[test]
    fn single_after_named_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register_named(noop("a")).unwrap();
        let err = registry.register_single(noop("b")).unwrap_err();
        assert!(matches!(err, DushError::IncorrectRegistryState(_)));
    }

    #[test]
    fn named_commands_keep_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register_named(noop("configure")).unwrap();
        registry.register_named(noop("build")).unwrap();
        registry.register_named(noop("test")).unwrap();

        assert_eq!(registry.mode(), RegistryMode::Multiple);
        assert_eq!(registry.list(), vec!["configure", "build", "test"]);
    }

    #[test]
    fn registering_same_name_replaces_in_place() {
        let mut registry = CommandRegistry::new();
        registry.register_named(noop("a")).unwrap();
        registry.register_named(noop("b")).unwrap();
        registry
            .register_named(noop("a").args(ArgSchema::new().required("x")))
            .unwrap();

        assert_eq!(registry.list(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().schema().params().len(), 1);
    }

    #[test]
    fn schema_with_variadic_rejects_keywords() {
        let schema = ArgSchema::new().required("first").variadic("rest");
        assert!(!schema.accepts_keywords());
        assert_eq!(schema.variadic_name(), Some("rest"));
        assert!(ArgSchema::new().accepts_keywords());
        assert!(ArgSchema::new().is_empty());
    }
}
