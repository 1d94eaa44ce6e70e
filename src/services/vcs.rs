//! Version-control checkouts (git and svn) via their command-line clients.

use super::ProcessService;
use crate::domain::{CommandSpec, Vcs};
use crate::error::{InstallError, InstallResult};
use std::path::Path;

/// Whether a checkout was created or updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    Cloned,
    Updated,
}

/// Checkout service for source trees tracked in version control
pub struct VcsService {
    process: ProcessService,
}

impl VcsService {
    pub fn new(process: ProcessService) -> Self {
        Self { process }
    }

    /// Command creating a fresh checkout of `url` at `dest`
    pub fn checkout_command(vcs: Vcs, url: &str, dest: &Path) -> CommandSpec {
        let dest = dest.to_string_lossy().to_string();
        match vcs {
            Vcs::Git => CommandSpec::new("git").args(["clone".to_string(), url.to_string(), dest]),
            Vcs::Svn => {
                CommandSpec::new("svn").args(["checkout".to_string(), url.to_string(), dest])
            }
        }
    }

    /// Command bringing an existing checkout up to date
    pub fn update_command(vcs: Vcs, dest: &Path) -> CommandSpec {
        let cmd = match vcs {
            Vcs::Git => CommandSpec::new("git").args(["pull", "--ff-only"]),
            Vcs::Svn => CommandSpec::new("svn").arg("update"),
        };
        cmd.current_dir(dest)
    }

    /// Check out `url` into `dest`, or update it when it already exists
    pub fn checkout_or_update(
        &self,
        vcs: Vcs,
        url: &str,
        dest: &Path,
        label: &str,
    ) -> InstallResult<CheckoutAction> {
        let (cmd, action) = if dest.exists() {
            (Self::update_command(vcs, dest), CheckoutAction::Updated)
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut cmd = Self::checkout_command(vcs, url, dest);
            if let Some(parent) = dest.parent() {
                cmd = cmd.current_dir(parent);
            }
            (cmd, CheckoutAction::Cloned)
        };

        let checkout_error = |reason: String| InstallError::Checkout {
            url: url.to_string(),
            reason,
        };
        let outcome = self
            .process
            .run(&cmd, label, None)
            .map_err(|e| checkout_error(e.to_string()))?;

        if !outcome.success() {
            return Err(checkout_error(outcome.failure_reason()));
        }

        tracing::info!("{:?} {} at {}", action, url, dest.display());
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn git(args: &[&str], dir: &Path) {
        std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
    }

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upstream");
        std::fs::create_dir_all(&path).unwrap();

        git(&["init"], &path);
        git(&["config", "user.email", "test@test.com"], &path);
        git(&["config", "user.name", "Test"], &path);
        std::fs::write(path.join("README.md"), "# Pipeline").unwrap();
        git(&["add", "."], &path);
        git(&["commit", "-m", "Initial commit"], &path);

        (temp, path)
    }

    fn git_available() -> bool {
        ProcessService::new(None)
            .probe(&CommandSpec::new("git").arg("--version"))
            == Some(0)
    }

    #[test]
    fn test_commands() {
        let clone = VcsService::checkout_command(Vcs::Svn, "svn://host/trunk", Path::new("/ws/wf"));
        assert_eq!(clone.program, "svn");
        assert_eq!(clone.args, vec!["checkout", "svn://host/trunk", "/ws/wf"]);

        let update = VcsService::update_command(Vcs::Git, Path::new("/ws/wf"));
        assert_eq!(update.args, vec!["pull", "--ff-only"]);
        assert_eq!(update.cwd.as_deref(), Some(Path::new("/ws/wf")));
    }

    #[test]
    fn test_clone_then_update() {
        if !git_available() {
            eprintln!("git is not installed. Skipping checkout test.");
            return;
        }
        let (temp, upstream) = create_test_repo();
        let dest = temp.path().join("checkouts/pipeline");
        let vcs = VcsService::new(ProcessService::new(None));
        let url = upstream.to_string_lossy().to_string();

        let first = vcs.checkout_or_update(Vcs::Git, &url, &dest, "pipeline").unwrap();
        assert_eq!(first, CheckoutAction::Cloned);
        assert!(dest.join("README.md").exists());

        let second = vcs.checkout_or_update(Vcs::Git, &url, &dest, "pipeline").unwrap();
        assert_eq!(second, CheckoutAction::Updated);
    }

    #[test]
    fn test_bad_url_is_checkout_error() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let vcs = VcsService::new(ProcessService::new(None));
        let err = vcs
            .checkout_or_update(
                Vcs::Git,
                &temp.path().join("missing").to_string_lossy(),
                &temp.path().join("dest"),
                "x",
            )
            .unwrap_err();
        assert!(matches!(err, InstallError::Checkout { .. }));
    }
}
