//! Precondition probes: is a tool or library already present?

use super::ProcessService;
use crate::domain::{CommandSpec, Placeholders, Probe};
use crate::error::{InstallError, InstallResult};
use std::path::Path;

/// Shell convention for "command not found"
const COMMAND_NOT_FOUND: i32 = 127;

/// Evaluates recipe probes
pub struct ProbeService {
    process: ProcessService,
    python: String,
}

impl ProbeService {
    pub fn new(process: ProcessService, python: String) -> Self {
        Self { process, python }
    }

    /// Check whether the probe reports the software as present
    pub fn is_satisfied(&self, probe: &Probe, vars: &Placeholders) -> InstallResult<bool> {
        let present = match probe {
            Probe::Command { argv } => {
                let argv = vars.expand_all(argv)?;
                match CommandSpec::from_argv(&argv) {
                    Some(cmd) => matches!(
                        self.process.probe(&cmd),
                        Some(code) if code != COMMAND_NOT_FOUND
                    ),
                    None => false,
                }
            }
            Probe::PythonImport { module } => {
                if !is_module_path(module) {
                    return Err(InstallError::InvalidModule(module.clone()));
                }
                let cmd = CommandSpec::new(vars.expand(&self.python)?)
                    .args(["-c".to_string(), format!("import {}", module)]);
                self.process.probe(&cmd) == Some(0)
            }
            Probe::Path { path } => Path::new(&vars.expand(path)?).exists(),
        };

        tracing::debug!("Probe {:?} -> {}", probe, present);
        Ok(present)
    }
}

/// Dotted Python identifier such as `rpy` or `os.path`
fn is_module_path(module: &str) -> bool {
    !module.is_empty()
        && module.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
