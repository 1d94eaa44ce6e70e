//! chipseq-installer: idempotent fetch-unpack-build orchestrator
//!
//! This crate provisions the third-party tools, libraries and reference
//! data a ChIP-seq pipeline depends on, resuming safely after interrupted
//! or failed runs.

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;

pub use app::App;
pub use config::InstallerConfig;
pub use error::{AppError, Result};
