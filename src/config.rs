//! Configuration handling for anvil
//!
//! Configuration is read from `anvil.toml` (project, found by walking up from
//! the current directory) and `~/.config/anvil/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::OutputFormat;

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "anvil.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Programs invoked by the built-in workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub cargo: String,
    pub git: String,
    pub pandoc: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            git: "git".to_string(),
            pandoc: "pandoc".to_string(),
        }
    }
}

/// Settings for version bumping, tagging and pushing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// File holding the `version = "..."` line, relative to the project root
    pub manifest: PathBuf,

    /// Remote to push commits and tags to
    pub remote: String,

    /// Prefix prepended to the version when tagging
    pub tag_prefix: String,

    /// Markdown files converted to `.rst` before tagging; missing ones are skipped
    pub markdown: Vec<PathBuf>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("Cargo.toml"),
            remote: "origin".to_string(),
            tag_prefix: "v".to_string(),
            markdown: vec![PathBuf::from("README.md"), PathBuf::from("CHANGES.md")],
        }
    }
}

/// Settings deciding between a real and a dry-run publish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
    /// Environment variable holding the tag being built, if any
    pub tag_env: String,

    /// Environment variable set to `true` on pull-request builds
    pub pull_request_env: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            tag_env: "CI_TAG".to_string(),
            pull_request_env: "CI_PULL_REQUEST".to_string(),
        }
    }
}

impl PublishConfig {
    /// True when the tag variable is set and this is not a pull-request build
    pub fn is_release_build(&self) -> bool {
        let pull_request = std::env::var(&self.pull_request_env)
            .map(|v| v == "true")
            .unwrap_or(false);
        let tagged = std::env::var(&self.tag_env)
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        tagged && !pull_request
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Task to run when none is named, replacing the built-in default
    pub default_task: Option<String>,

    pub tools: ToolsConfig,

    pub release: ReleaseConfig,

    pub publish: PublishConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,

    /// Directory tasks run in: where `anvil.toml` lives, or the current directory
    pub project_root: PathBuf,

    /// The project file that was loaded, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Loads configuration, from `explicit` if given, otherwise by searching
    /// upwards from the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let global = Self::load_global()?;

        let source = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()).into());
                }
                Some(path.to_path_buf())
            }
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                Self::find_project_file(&cwd)
            }
        };

        match source {
            Some(path) => {
                let project = Self::load_project_file(&path)?;
                let project_root = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));

                Ok(Self {
                    project,
                    global,
                    project_root,
                    source: Some(path),
                })
            }
            None => Ok(Self {
                project: ProjectConfig::default(),
                global,
                project_root: std::env::current_dir()
                    .context("Failed to read current directory")?,
                source: None,
            }),
        }
    }

    /// Built-in defaults rooted at `project_root`, ignoring any files
    pub fn defaults(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: project_root.into(),
            source: None,
        }
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "anvil", "anvil").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific file
    pub fn load_project_file(path: &Path) -> Result<ProjectConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse project config: {}", path.display()))
    }

    /// Finds `anvil.toml` in `start` or one of its parents
    pub fn find_project_file(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Absolute path of the release manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(&self.project.release.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::defaults("/work");

        assert_eq!(config.project.tools.cargo, "cargo");
        assert_eq!(config.project.tools.git, "git");
        assert_eq!(config.project.tools.pandoc, "pandoc");
        assert_eq!(config.project.release.markdown.len(), 2);
        assert_eq!(config.project.release.tag_prefix, "v");
        assert_eq!(config.project.default_task, None);
        assert_eq!(config.global.default_format, OutputFormat::Text);
        assert_eq!(config.manifest_path(), PathBuf::from("/work/Cargo.toml"));
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
default_task = "doc"

[tools]
git = "/usr/local/bin/git"

[release]
manifest = "crates/core/Cargo.toml"
remote = "upstream"
markdown = ["docs/guide.md"]
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_task.as_deref(), Some("doc"));
        assert_eq!(config.tools.git, "/usr/local/bin/git");
        assert_eq!(config.tools.cargo, "cargo");
        assert_eq!(config.release.manifest, PathBuf::from("crates/core/Cargo.toml"));
        assert_eq!(config.release.remote, "upstream");
        assert_eq!(config.release.tag_prefix, "v");
        assert_eq!(config.release.markdown, vec![PathBuf::from("docs/guide.md")]);
        assert_eq!(config.publish, PublishConfig::default());
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn reject_unknown_format() {
        let result: Result<GlobalConfig, _> = toml::from_str("default_format = \"xml\"");
        assert!(result.is_err());
    }

    #[test]
    fn find_project_file_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "").unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let found = Config::find_project_file(&sub_dir);
        assert_eq!(found, Some(dir.path().join(PROJECT_FILE)));
    }

    #[test]
    fn find_project_file_none() {
        let dir = TempDir::new().unwrap();
        // A directory named like the file must not match
        fs::create_dir_all(dir.path().join("nested").join(PROJECT_FILE)).unwrap();

        assert_eq!(Config::find_project_file(&dir.path().join("nested")), None);
    }

    #[test]
    fn load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[tools]\ncargo = \"echo\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.project.tools.cargo, "echo");
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "default_task = [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse project config"));
    }

    #[test]
    fn publish_release_build_detection() {
        let config = PublishConfig {
            tag_env: "ANVIL_TEST_TAG_5F1C".to_string(),
            pull_request_env: "ANVIL_TEST_PR_5F1C".to_string(),
        };
        assert!(!config.is_release_build());

        std::env::set_var("ANVIL_TEST_TAG_5F1C", "v1.0.0");
        assert!(config.is_release_build());

        std::env::set_var("ANVIL_TEST_PR_5F1C", "true");
        assert!(!config.is_release_build());

        std::env::remove_var("ANVIL_TEST_TAG_5F1C");
        std::env::remove_var("ANVIL_TEST_PR_5F1C");
    }
}
