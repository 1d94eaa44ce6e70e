//! chipseq-installer: provision ChIP-seq pipeline dependencies
//!
//! Usage: `chipseq-installer [CONFIG]`. The optional argument names an extra
//! configuration file layered over the project and user configuration.

use anyhow::{Context, Result};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chipseq_installer::domain::Layout;
use chipseq_installer::{App, InstallerConfig};

/// Exit code after an interrupt
const INTERRUPTED: i32 = 130;

/// Initialize logging with RUST_LOG environment variable support
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let extra_config = std::env::args_os().nth(1).map(PathBuf::from);

    // Find project root
    let project_root = Layout::discover(None)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    tracing::info!("Starting chipseq-installer in {:?}", project_root);

    let config = InstallerConfig::load(Some(&project_root), extra_config.as_deref())
        .context("Failed to load configuration")?;
    let app = App::new(project_root, config);

    // Processes block; keep the runtime free for the Ctrl+C handler
    let run = tokio::task::spawn_blocking(move || app.run());

    tokio::select! {
        res = run => {
            let report = res.context("Provisioning task panicked")??;
            tracing::info!("Done: {} recipes", report.total());
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; workspace left as-is, rerun to resume");
            std::process::exit(INTERRUPTED);
        }
    }
}
