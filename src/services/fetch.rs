//! Download mechanism.

use super::ProcessService;
use crate::config::DownloadConfig;
use crate::domain::CommandSpec;
use crate::error::{InstallError, InstallResult, ProcessError};
use std::path::Path;

/// Retrieves a URL into a local file
pub trait Downloader: Send {
    /// Download `url` to `dest`, overwriting or resuming an existing file
    fn download(&self, url: &str, dest: &Path, label: &str) -> InstallResult<()>;
}

/// Downloader backed by `wget`
pub struct WgetDownloader {
    config: DownloadConfig,
    process: ProcessService,
}

impl WgetDownloader {
    pub fn new(config: DownloadConfig, process: ProcessService) -> Self {
        Self { config, process }
    }

    /// Command line for one download
    pub fn command(&self, url: &str, dest: &Path) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.config.program.clone());
        if self.config.resume {
            cmd = cmd.arg("-c");
        }
        if !self.config.check_certificate {
            cmd = cmd.arg("--no-check-certificate");
        }
        cmd.args([
            "-nv".to_string(),
            "-O".to_string(),
            dest.to_string_lossy().to_string(),
            url.to_string(),
        ])
    }
}

impl Downloader for WgetDownloader {
    fn download(&self, url: &str, dest: &Path, label: &str) -> InstallResult<()> {
        let cmd = self.command(url, dest);
        let network_error = |reason: String| InstallError::Network {
            url: url.to_string(),
            reason,
        };

        let outcome = self
            .process
            .run(&cmd, label, Some(self.config.timeout()))
            .map_err(|e| match e {
                ProcessError::Io(io) => InstallError::Io(io),
                other => network_error(other.to_string()),
            })?;

        if !outcome.success() {
            return Err(network_error(outcome.failure_reason()));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn downloader(config: DownloadConfig) -> WgetDownloader {
        WgetDownloader::new(config, ProcessService::new(None))
    }

    #[test]
    fn test_wget_command_defaults() {
        let cmd = downloader(DownloadConfig::default())
            .command("https://x.org/bwa.tar.bz2", Path::new("/ws/bwa.tar.bz2.part"));
        assert_eq!(cmd.program, "wget");
        assert_eq!(
            cmd.args,
            vec![
                "-c",
                "--no-check-certificate",
                "-nv",
                "-O",
                "/ws/bwa.tar.bz2.part",
                "https://x.org/bwa.tar.bz2"
            ]
        );
    }

    #[test]
    fn test_wget_command_strict() {
        let config = DownloadConfig {
            check_certificate: true,
            resume: false,
            ..DownloadConfig::default()
        };
        let cmd = downloader(config).command("https://x.org/a.zip", Path::new("a.zip"));
        assert!(!cmd.args.contains(&"-c".to_string()));
        assert!(!cmd.args.contains(&"--no-check-certificate".to_string()));
    }

    #[test]
    fn test_failed_download_is_network_error() {
        let temp = TempDir::new().unwrap();
        let config = DownloadConfig {
            program: "false".to_string(),
            ..DownloadConfig::default()
        };
        let err = downloader(config)
            .download("http://x.org/a.tar.gz", &temp.path().join("a"), "a")
            .unwrap_err();
        assert!(matches!(err, InstallError::Network { .. }));
    }

    #[test]
    fn test_missing_program_is_network_error() {
        let temp = TempDir::new().unwrap();
        let config = DownloadConfig {
            program: "definitely-not-wget".to_string(),
            ..DownloadConfig::default()
        };
        let err = downloader(config)
            .download("http://x.org/a.tar.gz", &temp.path().join("a"), "a")
            .unwrap_err();
        assert!(matches!(err, InstallError::Network { .. }));
    }
}
