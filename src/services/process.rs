//! Process execution service for fetch, unpack and build commands.
//!
//! Handles spawning processes, streaming output, timeouts and log persistence.

use crate::domain::CommandSpec;
use crate::error::{ProcessError, ProcessResult};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Number of stderr lines kept for error messages
const STDERR_TAIL: usize = 20;

/// Poll interval while waiting on a child
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output event from a running process
#[derive(Debug, Clone)]
pub enum ProcessOutput {
    /// Line from stdout
    Stdout(String),
    /// Line from stderr
    Stderr(String),
    /// Error reading a stream
    Error(String),
}

/// Outcome of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Wall time
    pub duration: Duration,
    /// Last lines written to stderr
    pub stderr_tail: Vec<String>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short human-readable failure description
    pub fn failure_reason(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match self.stderr_tail.last() {
            Some(line) => format!("{}: {}", status, line),
            None => status,
        }
    }
}

/// Process execution service
#[derive(Debug, Clone, Default)]
pub struct ProcessService {
    /// Log directory; no log files are written when unset
    log_dir: Option<PathBuf>,
}

impl ProcessService {
    /// Create a new process service
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self { log_dir }
    }

    /// Ensure log directory exists
    fn ensure_log_dir(&self) -> ProcessResult<()> {
        if let Some(dir) = &self.log_dir {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Log file path for a label
    pub fn log_file_path(&self, label: &str) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.log", label)))
    }

    /// Open the label's log file for appending and write a command header
    fn open_log(&self, label: &str, cmd: &CommandSpec) -> ProcessResult<Option<File>> {
        let Some(path) = self.log_file_path(label) else {
            return Ok(None);
        };
        self.ensure_log_dir()?;

        let mut log_file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(log_file, "# Command: {}", cmd)?;
        writeln!(log_file, "# Started: {}", unix_timestamp())?;
        if let Some(dir) = &cmd.cwd {
            writeln!(log_file, "# Directory: {}", dir.display())?;
        }
        writeln!(log_file, "---")?;
        Ok(Some(log_file))
    }

    /// Run a command to completion, streaming its output
    pub fn run(
        &self,
        cmd: &CommandSpec,
        label: &str,
        timeout: Option<Duration>,
    ) -> ProcessResult<ProcessOutcome> {
        let mut log_file = self.open_log(label, cmd)?;
        tracing::info!(target: "process", "[{}] $ {}", label, cmd);

        let start_time = Instant::now();
        let mut child = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();

        // Spawn thread to read stdout
        if let Some(stdout) = child.stdout.take() {
            let tx = output_tx.clone();
            readers.push(std::thread::spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    match line {
                        Ok(text) => {
                            let _ = tx.send(ProcessOutput::Stdout(text));
                        }
                        Err(e) => {
                            let _ = tx.send(ProcessOutput::Error(e.to_string()));
                            break;
                        }
                    }
                }
            }));
        }

        // Spawn thread to read stderr
        if let Some(stderr) = child.stderr.take() {
            let tx = output_tx.clone();
            readers.push(std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines() {
                    match line {
                        Ok(text) => {
                            let _ = tx.send(ProcessOutput::Stderr(text));
                        }
                        Err(e) => {
                            let _ = tx.send(ProcessOutput::Error(e.to_string()));
                            break;
                        }
                    }
                }
            }));
        }
        drop(output_tx);

        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL);
        let status = loop {
            while let Ok(output) = output_rx.try_recv() {
                record_output(label, output, log_file.as_mut(), &mut stderr_tail);
            }

            if let Some(status) = child.try_wait()? {
                break status;
            }

            if let Some(limit) = timeout {
                if start_time.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    if let Some(f) = log_file.as_mut() {
                        let _ = writeln!(f, "# Timed out after {}s", limit.as_secs());
                    }
                    return Err(ProcessError::Timeout {
                        program: cmd.program.clone(),
                        after: limit,
                    });
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        };

        for reader in readers {
            let _ = reader.join();
        }
        while let Ok(output) = output_rx.try_recv() {
            record_output(label, output, log_file.as_mut(), &mut stderr_tail);
        }

        let outcome = ProcessOutcome {
            exit_code: status.code(),
            duration: start_time.elapsed(),
            stderr_tail: stderr_tail.into_iter().collect(),
        };
        if let Some(f) = log_file.as_mut() {
            writeln!(f, "# Exit: {:?}", outcome.exit_code)?;
        }
        tracing::debug!(
            target: "process",
            "[{}] {} finished with {:?} in {:?}",
            label,
            cmd.program,
            outcome.exit_code,
            outcome.duration
        );

        Ok(outcome)
    }

    /// Run a command and report only whether it could start and its exit code
    pub fn probe(&self, cmd: &CommandSpec) -> Option<i32> {
        cmd.to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .ok()
            .and_then(|status| status.code())
    }
}

fn record_output(
    label: &str,
    output: ProcessOutput,
    log_file: Option<&mut File>,
    stderr_tail: &mut VecDeque<String>,
) {
    let line = match output {
        ProcessOutput::Stdout(text) => {
            tracing::debug!(target: "process", "[{}] {}", label, text);
            format!("[OUT] {}", text)
        }
        ProcessOutput::Stderr(text) => {
            tracing::debug!(target: "process", "[{}] ! {}", label, text);
            if stderr_tail.len() == STDERR_TAIL {
                stderr_tail.pop_front();
            }
            stderr_tail.push_back(text.clone());
            format!("[ERR] {}", text)
        }
        ProcessOutput::Error(e) => {
            tracing::warn!(target: "process", "[{}] output stream error: {}", label, e);
            format!("[ERR] <stream error: {}>", e)
        }
    };

    if let Some(f) = log_file {
        let _ = writeln!(f, "{}", line);
    }
}

/// Seconds since the Unix epoch
fn unix_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
