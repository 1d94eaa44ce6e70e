//! Typed command descriptors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A program invocation described as an argument list, never a shell string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (looked up on PATH)
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Working directory
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Build a command from an argv list; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Convert into a `std::process::Command`
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_argv() {
        let argv = vec!["make".to_string(), "install".to_string()];
        let cmd = CommandSpec::from_argv(&argv).unwrap();
        assert_eq!(cmd.program, "make");
        assert_eq!(cmd.args, vec!["install"]);

        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[test]
    fn test_to_command_keeps_arguments_separate() {
        let cmd = CommandSpec::new("tar")
            .args(["-xzpf", "a file.tar.gz"])
            .current_dir("/tmp");
        let built = cmd.to_command();
        let args: Vec<String> = built
            .get_args()
            .map(|s| s.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["-xzpf", "a file.tar.gz"]);
        assert_eq!(built.get_current_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = CommandSpec::new("sh").args(["-c", "echo hi"]);
        assert_eq!(cmd.to_string(), "sh -c \"echo hi\"");
    }
}
