//! `{placeholder}` expansion for recipe arguments and paths.

use crate::error::{InstallError, InstallResult};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").unwrap())
}

/// Named values substituted into recipe strings
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous one
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Set a path value
    pub fn set_path(&mut self, name: &str, path: &Path) -> &mut Self {
        self.set(name, path.to_string_lossy())
    }

    /// Copy with extra values layered on top
    pub fn with(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.set(name, value);
        next
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Expand every `{name}` in the input; unknown names are an error
    pub fn expand(&self, input: &str) -> InstallResult<String> {
        let mut missing = None;
        let expanded = placeholder_pattern().replace_all(input, |caps: &Captures| {
            match self.values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(name) => Err(InstallError::Template(name)),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Expand every element of an argument list
    pub fn expand_all(&self, inputs: &[String]) -> InstallResult<Vec<String>> {
        inputs.iter().map(|s| self.expand(s)).collect()
    }
}
