//! Fetch-unpack-build orchestrator.
//!
//! Makes one artifact locally available at a time without redoing finished
//! work: downloads are skipped when the archive is already in the workspace,
//! unpacking is skipped when an earlier unpack of that archive completed and
//! its directory still resolves, builds always run. Every failure is fatal to
//! the current artifact and leaves the workspace as it is, so the next run
//! resumes from there.

use super::resolve::resolve_extracted_dir;
use super::{Downloader, ProbeService, ProcessService, VcsService, WgetDownloader};
use crate::config::{ErrorPolicy, InstallerConfig};
use crate::domain::{
    file_name_from_url, Artifact, ArtifactState, BuildStep, FetchOutcome, InstallOutcome,
    InstallStatus, Layout, Placeholders, ProvisionReport, Recipe, Source,
};
use crate::error::{InstallError, InstallResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Drives fetch, unpack and build for recipes against one layout
pub struct Orchestrator {
    layout: Layout,
    downloader: Box<dyn Downloader>,
    process: ProcessService,
    probes: ProbeService,
    vcs: VcsService,
    build_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Create an orchestrator downloading with `wget`
    pub fn new(layout: Layout, config: &InstallerConfig) -> Self {
        let process = Self::process_service(&layout, config);
        let downloader = WgetDownloader::new(config.download.clone(), process.clone());
        Self::with_downloader(layout, config, Box::new(downloader))
    }

    /// Create an orchestrator with a custom download mechanism
    pub fn with_downloader(
        layout: Layout,
        config: &InstallerConfig,
        downloader: Box<dyn Downloader>,
    ) -> Self {
        let process = Self::process_service(&layout, config);
        Self {
            probes: ProbeService::new(process.clone(), config.run.python.clone()),
            vcs: VcsService::new(process.clone()),
            build_timeout: config.run.build_timeout(),
            downloader,
            process,
            layout,
        }
    }

    fn process_service(layout: &Layout, config: &InstallerConfig) -> ProcessService {
        let log_dir = config
            .run
            .process_logs
            .then(|| layout.workspace.log_dir());
        ProcessService::new(log_dir)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Ensure the archive at `url` is downloaded and unpacked in the
    /// workspace, returning the directory it unpacked into.
    pub fn fetch_and_unpack(&self, url: &str, require_dir: bool) -> InstallResult<FetchOutcome> {
        let label = file_name_from_url(url).to_string();
        self.fetch_and_unpack_as(url, require_dir, &label)
    }

    fn fetch_and_unpack_as(
        &self,
        url: &str,
        require_dir: bool,
        label: &str,
    ) -> InstallResult<FetchOutcome> {
        // Rejects unknown formats before any network access
        let artifact = Artifact::from_url(url)?;
        let workspace = self.layout.workspace.path();
        self.layout.workspace.ensure()?;

        let stamp = self.layout.workspace.unpack_stamp(&artifact.archive_name);
        let mut downloaded = false;
        if artifact.is_downloaded(workspace) {
            tracing::info!("{} already present, skipping download", artifact.archive_name);
            if stamp.is_file() {
                if let Some(dir) =
                    resolve_extracted_dir(workspace, &artifact.base_dir_name, false)?
                {
                    tracing::info!(
                        "{} already unpacked at {}",
                        artifact.archive_name,
                        dir.display()
                    );
                    return Ok(FetchOutcome {
                        resolved_dir: Some(dir),
                        downloaded: false,
                        unpacked: false,
                    });
                }
            }
        } else {
            self.download_to(url, workspace, &artifact.archive_name, label)?;
            downloaded = true;
        }

        // A stamp only survives a completed unpack of the current archive
        if stamp.exists() {
            fs::remove_file(&stamp)?;
        }
        self.unpack(&artifact, label)?;
        if let Some(parent) = stamp.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&stamp, "")?;

        let resolved_dir =
            resolve_extracted_dir(workspace, &artifact.base_dir_name, require_dir)?;

        Ok(FetchOutcome {
            resolved_dir,
            downloaded,
            unpacked: true,
        })
    }

    /// Download into `<dir>/<name>.part`, then move it into place
    fn download_to(&self, url: &str, dir: &Path, name: &str, label: &str) -> InstallResult<PathBuf> {
        let target = dir.join(name);
        let partial = dir.join(format!("{}.part", name));

        tracing::info!("Downloading {}", url);
        self.downloader.download(url, &partial, label)?;
        fs::rename(&partial, &target)?;
        Ok(target)
    }

    fn unpack(&self, artifact: &Artifact, label: &str) -> InstallResult<()> {
        let cmd = artifact
            .unpack_command()
            .current_dir(self.layout.workspace.path());
        let unpack_error = |reason: String| InstallError::Unpack {
            archive: artifact.archive_name.clone(),
            reason,
        };

        tracing::info!("Unpacking {}", artifact.archive_name);
        let outcome = self
            .process
            .run(&cmd, label, None)
            .map_err(|e| unpack_error(e.to_string()))?;
        if !outcome.success() {
            return Err(unpack_error(outcome.failure_reason()));
        }
        Ok(())
    }

    /// Ensure a single file from `url` exists in `dest_dir`.
    ///
    /// Returns whether a download happened.
    pub fn fetch_file(
        &self,
        url: &str,
        dest_dir: &Path,
        executable: bool,
        label: &str,
    ) -> InstallResult<bool> {
        let name = file_name_from_url(url);
        if name.is_empty() {
            return Err(InstallError::Network {
                url: url.to_string(),
                reason: "URL has no file name".to_string(),
            });
        }

        fs::create_dir_all(dest_dir)?;
        if dest_dir.join(name).is_file() {
            tracing::info!("{} already present, skipping download", name);
            return Ok(false);
        }

        let target = self.download_to(url, dest_dir, name, label)?;
        if executable {
            make_executable(&target)?;
        }
        Ok(true)
    }

    /// Run build steps inside `resolved_dir` with the layout placeholders
    pub fn run_build(&self, resolved_dir: &Path, steps: &[BuildStep]) -> InstallResult<()> {
        let vars = self
            .layout
            .placeholders()
            .with("source_dir", resolved_dir.to_string_lossy());
        self.run_build_as(resolved_dir, steps, &vars, "build")
    }

    fn run_build_as(
        &self,
        resolved_dir: &Path,
        steps: &[BuildStep],
        vars: &Placeholders,
        label: &str,
    ) -> InstallResult<()> {
        let base_env = self.build_env();

        for step in steps {
            let Some(mut cmd) = step.to_command(resolved_dir, vars)? else {
                continue;
            };
            cmd.env.splice(0..0, base_env.iter().cloned());

            let build_error = |reason: String| InstallError::Build {
                step: step.to_string(),
                dir: resolved_dir.to_path_buf(),
                reason,
            };
            let outcome = self
                .process
                .run(&cmd, label, self.build_timeout)
                .map_err(|e| build_error(e.to_string()))?;
            if !outcome.success() {
                return Err(build_error(outcome.failure_reason()));
            }
        }
        Ok(())
    }

    /// Install-prefix environment shared by every build step
    fn build_env(&self) -> Vec<(String, String)> {
        let mut env = vec![(
            "PREFIX".to_string(),
            self.layout.root_path.to_string_lossy().to_string(),
        )];

        let mut paths = vec![self.layout.bin_dir.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        if let Ok(joined) = std::env::join_paths(paths) {
            env.push(("PATH".to_string(), joined.to_string_lossy().to_string()));
        }
        env
    }

    /// Install one recipe, surfacing the first error
    pub fn install(&self, recipe: &Recipe) -> InstallResult<InstallOutcome> {
        let mut outcome = InstallOutcome::new(&recipe.name);
        let start = Instant::now();
        self.install_into(recipe, &mut outcome)?;
        outcome.duration = start.elapsed();
        Ok(outcome)
    }

    fn install_into(&self, recipe: &Recipe, outcome: &mut InstallOutcome) -> InstallResult<()> {
        let vars = recipe.placeholders(&self.layout.placeholders());
        let label = recipe.name.as_str();

        if let Some(probe) = &recipe.skip_if {
            if self.probes.is_satisfied(probe, &vars)? {
                tracing::info!("{} already installed, skipping", recipe.name);
                outcome.status = InstallStatus::AlreadyInstalled;
                return Ok(());
            }
        }

        let workspace = self.layout.workspace.path();
        let source_dir = match &recipe.source {
            Source::Archive { url } => {
                let url = vars.expand(url)?;
                let fetched = self.fetch_and_unpack_as(&url, recipe.require_dir, label)?;
                outcome.downloaded = fetched.downloaded;
                outcome.enter(ArtifactState::Downloaded);
                outcome.enter(ArtifactState::Unpacked);

                let fixed = match &recipe.dir {
                    Some(dir) => Some(workspace.join(vars.expand(dir)?)),
                    None => None,
                };
                let dir = match (fixed, fetched.resolved_dir) {
                    (Some(fixed), _) if fixed.is_dir() => fixed,
                    (_, Some(resolved)) => resolved,
                    (_, None) => {
                        tracing::warn!(
                            "No extraction directory for {}, building in the workspace",
                            recipe.name
                        );
                        workspace.to_path_buf()
                    }
                };
                outcome.resolved_dir = Some(dir.clone());
                dir
            }
            Source::File {
                url,
                dest,
                executable,
            } => {
                let url = vars.expand(url)?;
                let dest_dir = match dest {
                    Some(dest) => self.layout.root_path.join(vars.expand(dest)?),
                    None => workspace.to_path_buf(),
                };
                outcome.downloaded = self.fetch_file(&url, &dest_dir, *executable, label)?;
                outcome.enter(ArtifactState::Downloaded);
                dest_dir
            }
            Source::Checkout { vcs, url, dest } => {
                let url = vars.expand(url)?;
                let dest = self.layout.root_path.join(vars.expand(dest)?);
                let action = self.vcs.checkout_or_update(*vcs, &url, &dest, label)?;
                outcome.downloaded = action == super::vcs::CheckoutAction::Cloned;
                outcome.enter(ArtifactState::Downloaded);
                outcome.enter(ArtifactState::Unpacked);
                outcome.resolved_dir = Some(dest.clone());
                dest
            }
            Source::None => {
                self.layout.workspace.ensure()?;
                workspace.to_path_buf()
            }
        };

        if !recipe.build.is_empty() {
            tracing::info!("Building {} in {}", recipe.name, source_dir.display());
            let vars = vars.with("source_dir", source_dir.to_string_lossy());
            self.run_build_as(&source_dir, &recipe.build, &vars, label)?;
        }
        outcome.enter(ArtifactState::Built);
        Ok(())
    }

    /// Install recipes in order under an error policy
    pub fn provision(
        &self,
        recipes: &[Recipe],
        policy: ErrorPolicy,
    ) -> InstallResult<ProvisionReport> {
        self.layout.ensure_directories()?;
        let mut report = ProvisionReport::default();

        for (index, recipe) in recipes.iter().enumerate() {
            tracing::info!("==> {} ({}/{})", recipe.name, index + 1, recipes.len());
            let mut outcome = InstallOutcome::new(&recipe.name);
            let start = Instant::now();
            let result = self.install_into(recipe, &mut outcome);
            outcome.duration = start.elapsed();

            match result {
                Ok(()) => {
                    tracing::info!(
                        "{}: {:?} in {:.1}s",
                        recipe.name,
                        outcome.status,
                        outcome.duration.as_secs_f64()
                    );
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    tracing::error!("{} failed: {}", recipe.name, err);
                    outcome.fail(&err);
                    report.outcomes.push(outcome);

                    if policy == ErrorPolicy::Abort {
                        report.aborted = true;
                        report.not_attempted = recipes[index + 1..]
                            .iter()
                            .map(|r| r.name.clone())
                            .collect();
                        break;
                    }
                    tracing::warn!("Continuing with remaining recipes");
                }
            }
        }

        Ok(report)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    /// Build `<mirror>/<archive>` (gzip tar) holding `dir_name` with `files`
    pub fn make_archive(mirror: &Path, archive: &str, dir_name: &str, files: &[(&str, &str)]) {
        let staging = TempDir::new().unwrap();
        let root = staging.path().join(dir_name);
        fs::create_dir_all(&root).unwrap();
        for (name, contents) in files {
            fs::write(root.join(name), contents).unwrap();
        }

        let status = Command::new("tar")
            .arg("-czf")
            .arg(mirror.join(archive))
            .arg("-C")
            .arg(staging.path())
            .arg(dir_name)
            .status()
            .unwrap();
        assert!(status.success());
    }

    /// Makefile building a marker and installing it under $(PREFIX)
    pub const TOOL_MAKEFILE: &str = "all:\n\techo built > built.txt\n\ninstall:\n\tmkdir -p $(PREFIX)/share\n\tcp built.txt $(PREFIX)/share/tool-9.installed\n";

    pub fn make_available() -> bool {
        Command::new("make")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
