//! Infrastructure services for chipseq-installer.
//!
//! This module contains:
//! - ProcessService: external command execution with per-artifact logs
//! - Downloader: archive and file retrieval
//! - VcsService: git and svn checkouts
//! - ProbeService: "already installed" checks
//! - SettingsFile: the generated config.ini
//! - Orchestrator: the fetch-unpack-build cycle

pub mod fetch;
mod orchestrator;
mod probe;
pub mod process;
pub mod resolve;
mod settings;
pub mod vcs;

pub use fetch::{Downloader, WgetDownloader};
pub use orchestrator::Orchestrator;
pub use probe::ProbeService;
pub use process::{ProcessOutcome, ProcessOutput, ProcessService};
pub use resolve::resolve_extracted_dir;
pub use settings::SettingsFile;
pub use vcs::{CheckoutAction, VcsService};
