//! Layout of the provisioned project on disk.

use super::Placeholders;
use crate::config::InstallerConfig;
use std::path::{Path, PathBuf};

/// Marker file identifying a project root
pub const PROJECT_MARKER: &str = ".chipseq-installer.toml";

/// Directories the installer reads from and writes to
#[derive(Debug, Clone)]
pub struct Layout {
    /// Project root, also the install prefix
    pub root_path: PathBuf,
    /// Staging area for downloads and builds
    pub workspace: Workspace,
    /// Executables directory
    pub bin_dir: PathBuf,
    /// Libraries directory
    pub lib_dir: PathBuf,
    /// R library directory
    pub r_lib_dir: PathBuf,
    /// Destination of the generated settings file
    pub settings_file: PathBuf,
}

impl Layout {
    /// Create a Layout from a root path and configuration
    pub fn new(root_path: PathBuf, config: &InstallerConfig) -> Self {
        let paths = &config.layout;
        Self {
            workspace: Workspace::new(root_path.join(&paths.workspace)),
            bin_dir: root_path.join(&paths.bin_dir),
            lib_dir: root_path.join(&paths.lib_dir),
            r_lib_dir: root_path.join(&paths.r_lib_dir),
            settings_file: root_path.join(&paths.settings_file),
            root_path,
        }
    }

    /// Discover the project root by walking up from a start directory
    pub fn discover(start_path: Option<PathBuf>) -> Option<PathBuf> {
        let start = start_path
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let mut current = start.as_path();
        loop {
            if current.join(PROJECT_MARKER).is_file() {
                return Some(current.to_path_buf());
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Create the workspace, bin and lib directories if absent
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        self.workspace.ensure()?;
        for dir in [&self.bin_dir, &self.lib_dir, &self.r_lib_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Placeholder values every recipe can use
    pub fn placeholders(&self) -> Placeholders {
        let mut vars = Placeholders::new();
        vars.set_path("prefix", &self.root_path)
            .set_path("workspace", self.workspace.path())
            .set_path("bin_dir", &self.bin_dir)
            .set_path("lib_dir", &self.lib_dir)
            .set_path("r_lib_dir", &self.r_lib_dir);
        vars
    }
}

/// Staging directory for downloads and builds. Never deleted by the installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub fn ensure(&self) -> std::io::Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Marker recording that `archive_name` was fully unpacked
    pub fn unpack_stamp(&self, archive_name: &str) -> PathBuf {
        self.root
            .join(".stamps")
            .join(format!("{}.unpacked", archive_name))
    }

    /// Directory holding per-artifact process logs; dot-prefixed so
    /// directory resolution never matches it
    pub fn log_dir(&self) -> PathBuf {
        self.root.join(".logs")
    }

    /// Location of the JSON install report
    pub fn report_path(&self) -> PathBuf {
        self.root.join("install-report.json")
    }
}
