//! Provisioning run: install every recipe, then write the settings file
//! and the install report.

use crate::config::InstallerConfig;
use crate::domain::{InstallStatus, Layout, ProvisionReport};
use crate::error::{AppError, Result};
use crate::services::{Downloader, Orchestrator, SettingsFile};
use std::path::PathBuf;

/// Main application state
pub struct App {
    /// Loaded configuration
    pub config: InstallerConfig,
    /// Project layout
    pub layout: Layout,
    orchestrator: Orchestrator,
}

impl App {
    /// Create a new App for the project at `root`
    pub fn new(root: PathBuf, config: InstallerConfig) -> Self {
        let layout = Layout::new(root, &config);
        let orchestrator = Orchestrator::new(layout.clone(), &config);
        Self {
            config,
            layout,
            orchestrator,
        }
    }

    /// Create an App with a custom download mechanism
    pub fn with_downloader(
        root: PathBuf,
        config: InstallerConfig,
        downloader: Box<dyn Downloader>,
    ) -> Self {
        let layout = Layout::new(root, &config);
        let orchestrator = Orchestrator::with_downloader(layout.clone(), &config, downloader);
        Self {
            config,
            layout,
            orchestrator,
        }
    }

    /// Run every recipe under the configured error policy.
    ///
    /// The report is always written. The settings file is written unless
    /// the run aborted. Any failed recipe makes the run fail.
    pub fn run(&self) -> Result<ProvisionReport> {
        tracing::info!(
            "Provisioning {} recipes into {}",
            self.config.recipes.len(),
            self.layout.root_path.display()
        );

        let report = self
            .orchestrator
            .provision(&self.config.recipes, self.config.run.on_error)?;

        self.write_report(&report)?;
        if report.aborted {
            tracing::warn!("Run aborted, settings file not written");
        } else {
            self.write_settings(&report)?;
        }

        let failed = report.failed();
        if failed > 0 {
            return Err(AppError::RunFailed {
                failed,
                total: report.total(),
            });
        }

        tracing::info!("All {} recipes installed", report.total());
        Ok(report)
    }

    /// Settings from the static table plus exports of successful recipes
    pub fn settings(&self, report: &ProvisionReport) -> Result<SettingsFile> {
        let base = self.layout.placeholders();
        let mut settings = SettingsFile::new();
        settings.extend(&self.config.settings, &base)?;

        for recipe in &self.config.recipes {
            let succeeded = report.outcome(&recipe.name).is_some_and(|o| {
                matches!(
                    o.status,
                    InstallStatus::Installed | InstallStatus::AlreadyInstalled
                )
            });
            if succeeded {
                settings.extend(&recipe.exports, &recipe.placeholders(&base))?;
            }
        }
        Ok(settings)
    }

    fn write_settings(&self, report: &ProvisionReport) -> Result<()> {
        let settings = self.settings(report)?;
        if settings.is_empty() {
            return Ok(());
        }
        settings.write(&self.layout.settings_file)?;
        tracing::info!("Wrote {}", self.layout.settings_file.display());
        Ok(())
    }

    fn write_report(&self, report: &ProvisionReport) -> Result<()> {
        self.layout.workspace.ensure()?;
        let path = self.layout.workspace.report_path();
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetch::testing::LocalMirror;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const RECIPES: &str = r#"
[run]
on_error = "continue"

[[settings]]
section = "genomes"
key = "hg19"
value = "{prefix}/genomes/hg19.fa"

[[recipes]]
name = "liftOver"
source = { kind = "file", url = "http://example.org/liftOver", dest = "{bin_dir}", executable = true }
exports = [{ section = "executables", key = "liftOver", value = "{bin_dir}/{name}" }]

[[recipes]]
name = "missing"
source = { kind = "file", url = "http://example.org/missing" }
exports = [{ section = "executables", key = "missing", value = "{bin_dir}/missing" }]
"#;

    fn app(temp: &TempDir, toml: &str) -> App {
        let mirror_dir = temp.path().join("mirror");
        fs::create_dir_all(&mirror_dir).unwrap();
        fs::write(mirror_dir.join("liftOver"), "#!/bin/sh\n").unwrap();

        let config = InstallerConfig::from_toml(toml).unwrap();
        let mirror = Arc::new(LocalMirror::new(mirror_dir));
        App::with_downloader(temp.path().join("project"), config, Box::new(mirror))
    }

    #[test]
    fn test_run_writes_settings_and_report() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp, RECIPES);

        let err = app.run().unwrap_err();
        assert!(matches!(err, AppError::RunFailed { failed: 1, total: 2 }));

        let prefix = app.layout.root_path.display().to_string();
        let ini = fs::read_to_string(&app.layout.settings_file)
            .unwrap()
            .replace(&prefix, "<prefix>");
        insta::assert_snapshot!(ini.trim_end(), @r"
        [Executables]
        liftOver = <prefix>/bin/liftOver

        [Genomes]
        hg19 = <prefix>/genomes/hg19.fa
        ");

        let report: ProvisionReport = serde_json::from_str(
            &fs::read_to_string(app.layout.workspace.report_path()).unwrap(),
        )
        .unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            report.outcome("missing").unwrap().error_kind.as_deref(),
            Some("network")
        );
    }

    #[test]
    fn test_aborted_run_skips_settings() {
        let temp = TempDir::new().unwrap();
        let toml = RECIPES
            .replace("on_error = \"continue\"", "on_error = \"abort\"")
            .replace("http://example.org/liftOver", "http://example.org/gone");
        let app = app(&temp, &toml);

        let err = app.run().unwrap_err();
        assert!(matches!(err, AppError::RunFailed { failed: 1, total: 2 }));
        assert!(!app.layout.settings_file.exists());
        assert!(app.layout.workspace.report_path().exists());
    }

    #[test]
    fn test_successful_run() {
        let temp = TempDir::new().unwrap();
        let toml = r#"
[[recipes]]
name = "liftOver"
source = { kind = "file", url = "http://example.org/liftOver", dest = "{bin_dir}" }
"#;
        let app = app(&temp, toml);

        let report = app.run().unwrap();
        assert_eq!(report.failed(), 0);
        assert!(app.layout.bin_dir.join("liftOver").is_file());
        assert!(!app.layout.settings_file.exists());
    }
}
