//! Binding parsed tokens to a command's declared arguments.

use crate::error::{DushError, Result};
use crate::framework::registry::ArgSchema;
use std::collections::BTreeMap;

/// Argument values ready for a command body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    values: BTreeMap<String, String>,
    rest: Vec<String>,
}

impl BoundArgs {
    /// Value of a declared parameter; empty for names the schema does not
    /// declare.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Interpret a parameter as a 0/1 switch.
    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(DushError::Parse(format!("Argument {} must be a 0 or 1", name))),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.get(name)
            .trim()
            .parse()
            .map_err(|_| DushError::Parse(format!("Argument {} must be an integer", name)))
    }

    /// Tokens collected by the variadic tail.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }
}

impl ArgSchema {
    /// Fill the declared parameters from parsed tokens.
    ///
    /// Positional values fill parameters in order; the remainder goes to the
    /// variadic tail. Keywords fill parameters by name. Defaults cover what
    /// is left.
    pub fn bind(&self, positional: &[String], keyword: &BTreeMap<String, String>) -> Result<BoundArgs> {
        let params = self.params();
        if positional.len() > params.len() && self.variadic_name().is_none() {
            return Err(DushError::Parse(format!(
                "takes {} positional argument(s) but {} were given",
                params.len(),
                positional.len()
            )));
        }

        let mut values = BTreeMap::new();
        for (param, value) in params.iter().zip(positional) {
            values.insert(param.name.clone(), value.clone());
        }
        let rest = positional.iter().skip(params.len()).cloned().collect();

        for (name, value) in keyword {
            if !params.iter().any(|p| &p.name == name) {
                return Err(DushError::Parse(format!("unexpected keyword argument '{}'", name)));
            }
            if values.insert(name.clone(), value.clone()).is_some() {
                return Err(DushError::Parse(format!("multiple values for argument '{}'", name)));
            }
        }

        for param in params {
            if values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    values.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(DushError::Parse(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
            }
        }

        Ok(BoundArgs { values, rest })
    }
}
