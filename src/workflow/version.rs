//! Version string handling for release tasks
//!
//! The version lives in a manifest as a `version = "x.y.z"` assignment. Only
//! the first such assignment is read or rewritten, which for `Cargo.toml` is
//! the one in `[package]`.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VersionError {
    #[error("No version assignment found in {0}")]
    NotFound(String),

    #[error("Cannot bump version '{0}': last component is not a number")]
    NotNumeric(String),
}

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(\s*version\s*=\s*")([0-9A-Za-z.\-_+]+)(")"#)
        .expect("ASSIGNMENT regex is valid")
});

/// Extracts the version from manifest text
pub fn find(text: &str) -> Option<&str> {
    ASSIGNMENT
        .captures(text)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// Increments the last dot-separated component: `1.4.9` becomes `1.4.10`
pub fn bump(version: &str) -> Result<String, VersionError> {
    let (head, last) = match version.rfind('.') {
        Some(pos) => (&version[..pos], &version[pos + 1..]),
        None => ("", version),
    };

    let next = last
        .parse::<u64>()
        .map_err(|_| VersionError::NotNumeric(version.to_string()))?
        + 1;

    Ok(if head.is_empty() {
        next.to_string()
    } else {
        format!("{}.{}", head, next)
    })
}

/// Replaces the first version assignment in `text` with `version`
pub fn replace(text: &str, version: &str) -> Option<String> {
    if !ASSIGNMENT.is_match(text) {
        return None;
    }

    let replaced = ASSIGNMENT.replacen(text, 1, |caps: &regex::Captures<'_>| {
        format!("{}{}{}", &caps[1], version, &caps[3])
    });
    Some(replaced.into_owned())
}

/// Reads the version from the manifest at `path`
pub fn read(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    find(&text)
        .map(str::to_string)
        .ok_or_else(|| VersionError::NotFound(path.display().to_string()).into())
}

/// Rewrites the version in the manifest at `path`
pub fn write(path: &Path, version: &str) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let updated = replace(&text, version)
        .ok_or_else(|| VersionError::NotFound(path.display().to_string()))?;

    fs::write(path, updated)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"[package]
name = "demo"
version = "0.4.2"
edition = "2021"

[dependencies]
serde = { version = "1", features = ["derive"] }
"#;

    #[test]
    fn find_first_assignment() {
        assert_eq!(find(MANIFEST), Some("0.4.2"));
        assert_eq!(find("name = \"x\"\n"), None);
    }

    #[test]
    fn bump_last_component() {
        assert_eq!(bump("0.4.2").unwrap(), "0.4.3");
        assert_eq!(bump("1.4.9").unwrap(), "1.4.10");
        assert_eq!(bump("7").unwrap(), "8");
    }

    #[test]
    fn bump_rejects_non_numeric() {
        assert_eq!(
            bump("1.0.0-beta"),
            Err(VersionError::NotNumeric("1.0.0-beta".to_string()))
        );
    }

    #[test]
    fn replace_only_first() {
        let updated = replace(MANIFEST, "0.4.3").unwrap();
        assert!(updated.contains("version = \"0.4.3\"\n"));
        // inline dependency tables are not assignments at line start
        assert!(updated.contains("serde = { version = \"1\""));
        assert_eq!(updated.len(), MANIFEST.len());
    }

    #[test]
    fn replace_keeps_spacing() {
        let updated = replace("  version=\"1.0\"\n", "1.1").unwrap();
        assert_eq!(updated, "  version=\"1.1\"\n");
    }

    #[test]
    fn replace_without_assignment() {
        assert_eq!(replace("[package]\n", "1.0.0"), None);
    }

    #[test]
    fn read_and_write_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, MANIFEST).unwrap();

        assert_eq!(read(&path).unwrap(), "0.4.2");
        write(&path, "0.5.0").unwrap();
        assert_eq!(read(&path).unwrap(), "0.5.0");
    }

    #[test]
    fn read_missing_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, "[package]\nname = \"x\"\n").unwrap();

        let err = read(&path).unwrap_err();
        assert!(err.to_string().starts_with("No version assignment found"));
    }
}
