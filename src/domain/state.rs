//! Per-artifact install state and results.

use crate::error::InstallError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Progress of one artifact. Transitions only move forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    #[default]
    NotFetched,
    Downloaded,
    Unpacked,
    Built,
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFetched => "not fetched",
            Self::Downloaded => "downloaded",
            Self::Unpacked => "unpacked",
            Self::Built => "built",
        };
        write!(f, "{}", name)
    }
}

/// Result of `fetch_and_unpack`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Resolved extraction directory, if one was found
    pub resolved_dir: Option<PathBuf>,
    /// A network download happened during this call
    pub downloaded: bool,
    /// The archive was unpacked during this call
    pub unpacked: bool,
}

/// Final status of one recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    /// Fetch, unpack and build completed
    Installed,
    /// A precondition probe found the software already present
    AlreadyInstalled,
    /// A step failed
    Failed,
}

/// Record of one recipe's run, as written to the install report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub name: String,
    pub status: InstallStatus,
    /// States entered during this run, in order
    pub transitions: Vec<ArtifactState>,
    pub resolved_dir: Option<PathBuf>,
    pub downloaded: bool,
    pub duration: Duration,
    /// Error kind name when failed
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl InstallOutcome {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: InstallStatus::Installed,
            transitions: Vec::new(),
            resolved_dir: None,
            downloaded: false,
            duration: Duration::ZERO,
            error_kind: None,
            error: None,
        }
    }

    /// Record entering a state
    pub fn enter(&mut self, state: ArtifactState) {
        if self.state() < state {
            self.transitions.push(state);
        }
    }

    /// Latest state reached
    pub fn state(&self) -> ArtifactState {
        self.transitions.last().copied().unwrap_or_default()
    }

    /// Mark the recipe failed with an error
    pub fn fail(&mut self, error: &InstallError) {
        self.status = InstallStatus::Failed;
        self.error_kind = Some(error.kind().to_string());
        self.error = Some(error.to_string());
    }

    pub fn is_success(&self) -> bool {
        self.status != InstallStatus::Failed
    }
}

/// Outcome of a whole provisioning run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// One entry per attempted recipe, in run order
    pub outcomes: Vec<InstallOutcome>,
    /// Recipes not attempted because the run aborted
    pub not_attempted: Vec<String>,
    /// The run stopped at a failure
    pub aborted: bool,
}

impl ProvisionReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len() + self.not_attempted.len()
    }

    pub fn outcome(&self, name: &str) -> Option<&InstallOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        let mut outcome = InstallOutcome::new("bwa");
        assert_eq!(outcome.state(), ArtifactState::NotFetched);

        outcome.enter(ArtifactState::Downloaded);
        outcome.enter(ArtifactState::Unpacked);
        outcome.enter(ArtifactState::Downloaded);
        outcome.enter(ArtifactState::Built);

        assert_eq!(
            outcome.transitions,
            vec![
                ArtifactState::Downloaded,
                ArtifactState::Unpacked,
                ArtifactState::Built
            ]
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_failed_outcome_counts() {
        let mut failed = InstallOutcome::new("meme");
        failed.fail(&InstallError::UnsupportedFormat("meme.rar".into()));
        let report = ProvisionReport {
            outcomes: vec![InstallOutcome::new("bwa"), failed],
            not_attempted: vec!["sicer".into()],
            aborted: true,
        };

        assert_eq!(report.failed(), 1);
        assert_eq!(report.total(), 3);
        let meme = report.outcome("meme").unwrap();
        assert_eq!(meme.status, InstallStatus::Failed);
        assert_eq!(meme.error_kind.as_deref(), Some("unsupported_format"));
    }

    #[test]
    fn test_default_state() {
        assert_eq!(ArtifactState::default(), ArtifactState::NotFetched);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ArtifactState::NotFetched.to_string(), "not fetched");
        assert_eq!(ArtifactState::Built.to_string(), "built");
    }
}
