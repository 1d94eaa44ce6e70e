//! Artifact entity: an archive identified by its source URL.

use super::CommandSpec;
use crate::error::{InstallError, InstallResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pax header keywords dropped on extraction so archives built on other
/// filesystems unpack cleanly.
const PAX_DELETE: &str = "--pax-option=delete=SCHILY.*,delete=LIBARCHIVE.*";

/// Archive formats the orchestrator knows how to unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Suffix table, checked in order
    const SUFFIXES: [(&'static str, ArchiveFormat); 5] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar.bz2", ArchiveFormat::TarBz2),
        (".tar.xz", ArchiveFormat::TarXz),
        (".zip", ArchiveFormat::Zip),
    ];

    /// Detect the format from a file name, returning the matched suffix too
    pub fn detect(file_name: &str) -> Option<(ArchiveFormat, &'static str)> {
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix))
            .map(|(suffix, format)| (*format, *suffix))
    }

    /// Unpack command for an archive, to be run inside the workspace
    pub fn unpack_command(&self, archive: &str) -> CommandSpec {
        match self {
            Self::TarGz => Self::tar("-xzpf", archive),
            Self::TarBz2 => Self::tar("-xjpf", archive),
            Self::TarXz => Self::tar("-xJpf", archive),
            Self::Zip => CommandSpec::new("unzip").args(["-o", "-q", archive]),
        }
    }

    fn tar(mode: &str, archive: &str) -> CommandSpec {
        CommandSpec::new("tar").args([PAX_DELETE, "--no-same-owner", mode, archive])
    }
}

/// A named build target identified by a source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Source URL
    pub url: String,
    /// Archive file name (final URL path segment)
    pub archive_name: String,
    /// Expected extraction directory (archive name minus suffix)
    pub base_dir_name: String,
    /// Archive format
    pub format: ArchiveFormat,
}

impl Artifact {
    /// Parse an artifact from a URL, rejecting unknown archive formats
    pub fn from_url(url: &str) -> InstallResult<Self> {
        let archive_name = file_name_from_url(url);
        let (format, suffix) = ArchiveFormat::detect(archive_name)
            .ok_or_else(|| InstallError::UnsupportedFormat(url.to_string()))?;
        let base_dir_name = &archive_name[..archive_name.len() - suffix.len()];
        if base_dir_name.is_empty() {
            return Err(InstallError::UnsupportedFormat(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            archive_name: archive_name.to_string(),
            base_dir_name: base_dir_name.to_string(),
            format,
        })
    }

    /// Unpack command for this artifact
    pub fn unpack_command(&self) -> CommandSpec {
        self.format.unpack_command(&self.archive_name)
    }

    /// Check if the archive is present in a directory
    pub fn is_downloaded(&self, dir: &Path) -> bool {
        dir.join(&self.archive_name).is_file()
    }
}

/// Map a URL to `(archive_name, base_dir_name, unpack_cmd)`
pub fn resolve_unpack_command(url: &str) -> InstallResult<(String, String, CommandSpec)> {
    let artifact = Artifact::from_url(url)?;
    let cmd = artifact.unpack_command();
    Ok((artifact.archive_name, artifact.base_dir_name, cmd))
}

/// Final path segment of a URL, ignoring any query string or fragment
pub fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_suffixes() {
        let cases = [
            ("http://x.org/a/samtools-0.1.18.tar.bz2", "samtools-0.1.18", "-xjpf"),
            ("http://x.org/R-2.15.0.tar.gz", "R-2.15.0", "-xzpf"),
            ("http://x.org/SICER_V1.1.tgz", "SICER_V1.1", "-xzpf"),
            ("http://x.org/tool-3.tar.xz", "tool-3", "-xJpf"),
        ];
        for (url, base, mode) in cases {
            let (archive, dir, cmd) = resolve_unpack_command(url).unwrap();
            assert_eq!(archive, file_name_from_url(url));
            assert_eq!(dir, base);
            assert_eq!(cmd.program, "tar");
            assert!(cmd.args.contains(&mode.to_string()));
            assert_eq!(cmd.args.last().unwrap(), &archive);
        }
    }

    #[test]
    fn test_zip_uses_unzip() {
        let (archive, dir, cmd) =
            resolve_unpack_command("http://x.org/picard-tools-1.96.zip").unwrap();
        assert_eq!(archive, "picard-tools-1.96.zip");
        assert_eq!(dir, "picard-tools-1.96");
        assert_eq!(cmd.program, "unzip");
        assert_eq!(cmd.args, vec!["-o", "-q", "picard-tools-1.96.zip"]);
    }

    #[test]
    fn test_unsupported_suffix() {
        for url in [
            "http://x.org/tool.rar",
            "http://x.org/genome.fa.gz",
            "http://x.org/tool.tar",
            "http://x.org/.tar.gz",
        ] {
            let err = resolve_unpack_command(url).unwrap_err();
            assert!(matches!(err, InstallError::UnsupportedFormat(_)), "{url}");
        }
    }

    #[test]
    fn test_file_name_ignores_query() {
        assert_eq!(
            file_name_from_url("https://x.org/dl/bwa-0.7.5a.tar.bz2?use_mirror=auto#top"),
            "bwa-0.7.5a.tar.bz2"
        );
        assert_eq!(file_name_from_url("plain.zip"), "plain.zip");
    }

    #[test]
    fn test_tar_strips_ownership_metadata() {
        let cmd = ArchiveFormat::TarGz.unpack_command("a.tar.gz");
        assert!(cmd.args.iter().any(|a| a.starts_with("--pax-option=")));
        assert!(cmd.args.contains(&"--no-same-owner".to_string()));
    }
}
