//! Task names
//!
//! A task name is what the operator types on the command line, so it must never
//! look like an option. Format:
//! - first character: ASCII alphanumeric or `_`
//! - remaining characters: ASCII alphanumeric or one of `-`, `_`, `.`, `:`
//!
//! Examples: `test`, `bump-version`, `docs:api`, `_internal`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NameError {
    #[error("Task name cannot be empty")]
    Empty,

    #[error("Invalid task name '{0}': must start with a letter, digit or '_'")]
    InvalidStart(String),

    #[error("Invalid task name '{name}': unexpected character '{ch}'")]
    InvalidChar { name: String, ch: char },
}

/// Validated name of a task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    /// Validates and wraps a task name
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        let mut chars = name.chars();

        let first = chars.next().ok_or(NameError::Empty)?;
        if !(first.is_ascii_alphanumeric() || first == '_') {
            return Err(NameError::InvalidStart(name));
        }

        if let Some(ch) = chars.find(|c| !is_name_char(*c)) {
            return Err(NameError::InvalidChar { name, ch });
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TaskName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskName> for String {
    fn from(name: TaskName) -> Self {
        name.0
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets `HashMap<TaskName, _>` be queried with a plain `&str`.
impl Borrow<str> for TaskName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        for name in ["test", "bump-version", "docs:api", "_internal", "v1.2", "A_b-c"] {
            let parsed: TaskName = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(TaskName::new(""), Err(NameError::Empty));
    }

    #[test]
    fn rejects_option_lookalikes() {
        assert!(matches!(
            TaskName::new("--list"),
            Err(NameError::InvalidStart(_))
        ));
        assert!(matches!(
            TaskName::new("-v"),
            Err(NameError::InvalidStart(_))
        ));
    }

    #[test]
    fn rejects_whitespace_and_symbols() {
        assert_eq!(
            TaskName::new("run tests"),
            Err(NameError::InvalidChar {
                name: "run tests".to_string(),
                ch: ' ',
            })
        );
        assert!(TaskName::new("deploy!").is_err());
    }

    #[test]
    fn serde_uses_plain_string() {
        let name = TaskName::new("lint").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"lint\"");

        let back: TaskName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);

        let bad: Result<TaskName, _> = serde_json::from_str("\"-x\"");
        assert!(bad.is_err());
    }
}
