//! Extraction directory resolution.
//!
//! Archives rarely unpack into exactly `<archive name minus suffix>`; names
//! drift (`-src`, `_core`, different version strings, different case). The
//! resolver tries the exact name, then suffix variants, then directories in
//! the workspace containing a fragment of the name.

use crate::error::{InstallError, InstallResult};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

/// Suffixes commonly added to or missing from extracted directory names
const KNOWN_SUFFIXES: [&str; 2] = ["-src", "_core"];

/// Candidate names built from the expected name by stripping or appending
/// known suffixes
pub fn suffix_variants(dir_name: &str) -> Vec<String> {
    let mut variants = Vec::new();
    for suffix in KNOWN_SUFFIXES {
        let stripped = dir_name.replace(suffix, "");
        if stripped != dir_name && !stripped.is_empty() {
            variants.push(stripped);
        }
    }
    for suffix in KNOWN_SUFFIXES {
        variants.push(format!("{}{}", dir_name, suffix));
    }
    variants.dedup();
    variants
}

/// Name fragments used for globbing, in order: prefix before the first
/// `-`/`_`, suffix after the last `-`/`_`, prefix before the first `.`
pub fn name_fragments(dir_name: &str) -> Vec<String> {
    let head = dir_name
        .split('-')
        .next()
        .unwrap_or(dir_name)
        .split('_')
        .next()
        .unwrap_or(dir_name);
    let tail = dir_name
        .rsplit('-')
        .next()
        .unwrap_or(dir_name)
        .rsplit('_')
        .next()
        .unwrap_or(dir_name);
    let stem = dir_name.split('.').next().unwrap_or(dir_name);

    let mut fragments: Vec<String> = Vec::new();
    for fragment in [head, tail, stem] {
        if !fragment.is_empty() && !fragments.iter().any(|f| f == fragment) {
            fragments.push(fragment.to_string());
        }
    }
    fragments
}

/// Workspace directories whose name contains `fragment`, ignoring case
pub fn directories_matching(workspace: &Path, fragment: &str) -> InstallResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}*",
        Pattern::escape(&workspace.to_string_lossy()),
        Pattern::escape(fragment)
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let paths = glob::glob_with(&pattern, options).map_err(|e| {
        InstallError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            e.to_string(),
        ))
    })?;

    let mut dirs: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Resolve the directory an archive was extracted into.
///
/// Returns `Ok(None)` when nothing unique was found and `require_dir` is false.
pub fn resolve_extracted_dir(
    workspace: &Path,
    dir_name: &str,
    require_dir: bool,
) -> InstallResult<Option<PathBuf>> {
    let exact = workspace.join(dir_name);
    if exact.is_dir() {
        return Ok(Some(exact));
    }

    for variant in suffix_variants(dir_name) {
        let candidate = workspace.join(&variant);
        if candidate.is_dir() {
            tracing::debug!("Resolved {} via suffix variant {}", dir_name, variant);
            return Ok(Some(candidate));
        }
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    for fragment in name_fragments(dir_name) {
        let dirs = directories_matching(workspace, &fragment)?;
        if dirs.len() == 1 {
            tracing::debug!(
                "Resolved {} via fragment {:?}: {}",
                dir_name,
                fragment,
                dirs[0].display()
            );
            return Ok(dirs.into_iter().next());
        }
        for dir in dirs {
            if !candidates.contains(&dir) {
                candidates.push(dir);
            }
        }
    }

    if require_dir {
        Err(InstallError::AmbiguousDirectory {
            name: dir_name.to_string(),
            candidates,
        })
    } else {
        tracing::debug!(
            "No unique directory for {} ({} candidates)",
            dir_name,
            candidates.len()
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace_with(dirs: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        temp
    }

    #[test]
    fn test_exact_match() {
        let ws = workspace_with(&["tool-9"]);
        let dir = resolve_extracted_dir(ws.path(), "tool-9", true).unwrap();
        assert_eq!(dir, Some(ws.path().join("tool-9")));
    }

    #[test]
    fn test_suffix_variant_match() {
        let ws = workspace_with(&["foo-1.2.3-src", "other"]);
        let dir = resolve_extracted_dir(ws.path(), "foo-1.2.3", true).unwrap();
        assert_eq!(dir, Some(ws.path().join("foo-1.2.3-src")));
    }

    #[test]
    fn test_stripped_suffix_match() {
        let ws = workspace_with(&["mytool"]);
        let dir = resolve_extracted_dir(ws.path(), "mytool_core", true).unwrap();
        assert_eq!(dir, Some(ws.path().join("mytool")));
    }

    #[test]
    fn test_fragment_glob_ignores_case() {
        let ws = workspace_with(&["Foo_Bar"]);
        fs::write(ws.path().join("foo-1.2.3.tar.gz"), "archive").unwrap();
        let dir = resolve_extracted_dir(ws.path(), "foo-1.2.3", true).unwrap();
        assert_eq!(dir, Some(ws.path().join("Foo_Bar")));
    }

    #[test]
    fn test_fragment_glob_version_drift() {
        let ws = workspace_with(&["apache-maven-3.1.0", "logs"]);
        let dir = resolve_extracted_dir(ws.path(), "apache-maven-3.1.0-bin", true).unwrap();
        assert_eq!(dir, Some(ws.path().join("apache-maven-3.1.0")));
    }

    #[test]
    fn test_ambiguous_required() {
        let ws = workspace_with(&["foo-a", "foo-b"]);
        let err = resolve_extracted_dir(ws.path(), "foo-1", true).unwrap_err();
        match err {
            InstallError::AmbiguousDirectory { name, candidates } => {
                assert_eq!(name, "foo-1");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ambiguous_not_required() {
        let ws = workspace_with(&["foo-a", "foo-b"]);
        let dir = resolve_extracted_dir(ws.path(), "foo-1", false).unwrap();
        assert!(dir.is_none());
    }

    #[test]
    fn test_nothing_found() {
        let ws = workspace_with(&[]);
        assert!(matches!(
            resolve_extracted_dir(ws.path(), "bar-2", true),
            Err(InstallError::AmbiguousDirectory { .. })
        ));
        assert_eq!(resolve_extracted_dir(ws.path(), "bar-2", false).unwrap(), None);
    }

    #[test]
    fn test_name_fragments() {
        assert_eq!(name_fragments("foo-1.2.3"), vec!["foo", "1.2.3", "foo-1"]);
        assert_eq!(name_fragments("meme_4.9.0_4"), vec!["meme", "4", "meme_4"]);
        assert_eq!(name_fragments("SICER_V1.1"), vec!["SICER", "V1.1", "SICER_V1"]);
    }

    #[test]
    fn test_suffix_variants() {
        assert_eq!(
            suffix_variants("foo-1.2.3"),
            vec!["foo-1.2.3-src", "foo-1.2.3_core"]
        );
        assert_eq!(
            suffix_variants("bar-src"),
            vec!["bar", "bar-src-src", "bar-src_core"]
        );
    }
}
