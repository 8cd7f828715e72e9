//! Command runner trait and output type.
//!
//! A [`CommandRunner`] executes an ordered list of shell lines as one script
//! in a single subprocess, so later lines see the working directory and
//! exported variables of earlier ones.

use pipeliner_types::error::CommandError;
use tokio_util::sync::CancellationToken;

/// Captured output of a successful script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Stdout as text with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Trait for running shell scripts.
///
/// Implementors include:
/// - `ShellCommandRunner` (bash subprocess with concurrency bound and timeout)
pub trait CommandRunner: Send + Sync {
    /// Run `commands` as a single script.
    ///
    /// A nonzero exit status is reported as [`CommandError::Failed`] carrying
    /// the captured stderr. Cancelling `cancel` abandons the run and kills
    /// the subprocess.
    fn run(
        &self,
        commands: &[String],
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<CommandOutput, CommandError>> + Send;
}

/// Join command lines into one newline-separated script.
pub fn script_from_lines(commands: &[String]) -> String {
    commands.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_from_lines_joins_with_newlines() {
        let lines = vec!["cd /tmp".to_string(), "pwd".to_string()];
        assert_eq!(script_from_lines(&lines), "cd /tmp\npwd");
    }

    #[test]
    fn test_script_from_lines_trims() {
        let lines = vec!["".to_string(), "  echo hi  ".to_string(), "".to_string()];
        assert_eq!(script_from_lines(&lines), "echo hi");
    }

    #[test]
    fn test_script_from_lines_empty() {
        assert_eq!(script_from_lines(&[]), "");
    }

    #[test]
    fn test_stdout_trimmed() {
        let output = CommandOutput {
            stdout: b"/nix/store/abc-pipeline\n".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(output.stdout_trimmed(), "/nix/store/abc-pipeline");
    }
}
