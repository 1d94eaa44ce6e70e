//! Domain entities for chipseq-installer.
//!
//! This module contains the core entities:
//! - Artifact: an archive identified by its URL
//! - Recipe: how one tool is fetched, built and exported
//! - Layout / Workspace: where things live on disk
//! - State: per-artifact progress and install results

mod artifact;
mod command;
mod layout;
mod recipe;
mod state;
mod template;

pub use artifact::{file_name_from_url, resolve_unpack_command, ArchiveFormat, Artifact};
pub use command::CommandSpec;
pub use layout::{Layout, Workspace, PROJECT_MARKER};
pub use recipe::{BuildStep, EnvVar, Probe, Recipe, Section, SettingEntry, Source, Vcs};
pub use state::{ArtifactState, FetchOutcome, InstallOutcome, InstallStatus, ProvisionReport};
pub use template::Placeholders;
