use std::time::Duration;

use thiserror::Error;

/// Errors detected while validating the server configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("listen address must not be empty")]
    MissingHost,

    #[error("a public key file is required unless signature verification is skipped")]
    MissingPublicKeyFile,

    #[error("expected key id must not be empty")]
    EmptyKeyId,

    #[error("invalid override filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("build command must not be empty")]
    EmptyBuildCommand,

    #[error("max concurrent builds must be at least 1")]
    ZeroConcurrency,
}

/// Errors from running a shell script through a command runner.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn shell: {0}")]
    Spawn(String),

    #[error(
        "command exited with status {}: {}",
        .code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
        String::from_utf8_lossy(.stderr).trim()
    )]
    Failed { code: Option<i32>, stderr: Vec<u8> },

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("command cancelled")]
    Cancelled,
}

impl CommandError {
    /// Captured stderr, empty unless the command ran and exited nonzero.
    pub fn stderr(&self) -> &[u8] {
        match self {
            CommandError::Failed { stderr, .. } => stderr,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_code_and_stderr() {
        let err = CommandError::Failed {
            code: Some(2),
            stderr: b"error: flake not found\n".to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "command exited with status 2: error: flake not found"
        );
        assert_eq!(err.stderr(), b"error: flake not found\n");
    }

    #[test]
    fn test_command_failed_by_signal_display() {
        let err = CommandError::Failed {
            code: None,
            stderr: Vec::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_command_error_without_stderr() {
        assert!(CommandError::Cancelled.stderr().is_empty());
        assert!(CommandError::TimedOut(Duration::from_secs(1)).stderr().is_empty());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidFilter {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert_eq!(err.to_string(), "invalid override filter '(': unclosed group");
    }
}
