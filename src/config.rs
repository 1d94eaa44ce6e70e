//! Configuration management for chipseq-installer.
//!
//! Supports layered configuration: defaults → project → user → extra file → env

use crate::domain::{Recipe, SettingEntry, PROJECT_MARKER};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// Static entries of the generated settings file
    #[serde(default)]
    pub settings: Vec<SettingEntry>,
    /// Recipe table, installed in order
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

impl InstallerConfig {
    /// Load configuration with hierarchy: defaults → project → user → extra → env
    pub fn load(project_root: Option<&Path>, extra: Option<&Path>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder();

        // 1. Start with defaults
        builder = builder.add_source(
            config::File::from_str(
                include_str!("../default_config.toml"),
                config::FileFormat::Toml,
            )
            .required(false),
        );

        // 2. Project config (.chipseq-installer.toml in project root)
        if let Some(root) = project_root {
            let project_config = root.join(PROJECT_MARKER);
            if project_config.exists() {
                builder = builder.add_source(
                    File::from(project_config).format(config::FileFormat::Toml),
                );
            }
        }

        // 3. User config (~/.config/chipseq-installer/config.toml)
        if let Some(config_dir) =
            directories::ProjectDirs::from("uk.ac.cam", "cruk", "chipseq-installer")
        {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        // 4. Recipe table or overrides named on the command line
        if let Some(path) = extra {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        // 5. Environment variables (CHIPSEQ_INSTALLER__*)
        builder = builder.add_source(
            Environment::with_prefix("CHIPSEQ_INSTALLER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../default_config.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject recipe tables the orchestrator cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for recipe in &self.recipes {
            if recipe.name.trim().is_empty() {
                return Err(ConfigError::Invalid("recipe with empty name".into()));
            }
            if recipe.name.contains('/') || recipe.name.contains('\\') {
                return Err(ConfigError::Invalid(format!(
                    "recipe name may not contain path separators: {}",
                    recipe.name
                )));
            }
            if !seen.insert(recipe.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate recipe name: {}",
                    recipe.name
                )));
            }
        }
        Ok(())
    }
}

/// Directory layout, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    #[serde(default = "default_lib_dir")]
    pub lib_dir: PathBuf,
    #[serde(default = "default_r_lib_dir")]
    pub r_lib_dir: PathBuf,
    /// Generated settings file
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            bin_dir: default_bin_dir(),
            lib_dir: default_lib_dir(),
            r_lib_dir: default_r_lib_dir(),
            settings_file: default_settings_file(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

fn default_lib_dir() -> PathBuf {
    PathBuf::from("lib")
}

fn default_r_lib_dir() -> PathBuf {
    PathBuf::from("lib/R/library")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("config.ini")
}

/// Download mechanism configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Downloader executable (wget-compatible flags)
    #[serde(default = "default_download_program")]
    pub program: String,
    /// Verify TLS certificates; some legacy mirrors need this off
    #[serde(default)]
    pub check_certificate: bool,
    /// Resume partial downloads
    #[serde(default = "default_resume")]
    pub resume: bool,
    /// Download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            program: default_download_program(),
            check_certificate: false,
            resume: default_resume(),
            timeout_seconds: default_download_timeout(),
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_download_program() -> String {
    "wget".to_string()
}

fn default_resume() -> bool {
    true
}

fn default_download_timeout() -> u64 {
    1800
}

/// What to do when a recipe fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failure (dependency chains)
    #[default]
    Abort,
    /// Record the failure and carry on (independent recipes)
    Continue,
}

/// Provisioning run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Per-step build timeout in seconds; unlimited when absent
    #[serde(default)]
    pub build_timeout_seconds: Option<u64>,
    /// Python interpreter used by `python_import` probes
    #[serde(default = "default_python")]
    pub python: String,
    /// Write per-artifact process logs into the workspace
    #[serde(default = "default_process_logs")]
    pub process_logs: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::default(),
            build_timeout_seconds: None,
            python: default_python(),
            process_logs: default_process_logs(),
        }
    }
}

impl RunConfig {
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_seconds.map(Duration::from_secs)
    }
}

fn default_python() -> String {
    "python".to_string()
}

fn default_process_logs() -> bool {
    true
}
