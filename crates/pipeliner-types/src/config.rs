//! Server configuration for Pipeliner.
//!
//! `ServerConfig` is built once at startup (from CLI flags, environment and an
//! optional `.env` file) and then shared read-only with every component.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Key id the CI server asserts when signing configuration requests.
pub const DEFAULT_KEY_ID: &str = "woodpecker-ci-plugins";

/// Build tool invocation; the build reference is appended as the last argument.
pub const DEFAULT_BUILD_COMMAND: &str = "nix build --no-link --print-out-paths";

/// Upper bound on simultaneously running pre-command/build scripts.
pub const DEFAULT_MAX_CONCURRENT_BUILDS: usize = 4;

/// Per-script timeout (15 minutes).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 900;

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8000`.
    pub listen_addr: String,
    /// PEM file holding the CI server's Ed25519 public key.
    pub public_key_file: Option<PathBuf>,
    /// Key id a signature must assert to be accepted.
    pub expected_key_id: String,
    /// Regex a repository name must match to get an override.
    pub override_filter: String,
    /// Flake output attribute that evaluates to the pipeline file.
    pub flake_output: String,
    /// Shell lines run before every build.
    pub pre_commands: Vec<String>,
    /// Build tool command line, without the build reference.
    pub build_command: String,
    /// Accept unsigned requests.
    pub skip_signature_verify: bool,
    /// Verbose request/build logging.
    pub debug: bool,
    pub max_concurrent_builds: usize,
    /// `None` disables the timeout.
    pub command_timeout: Option<Duration>,
    /// Answer resolver failures with 500 instead of 204.
    pub report_build_failures: bool,
}

impl ServerConfig {
    /// Check the invariants that cannot be expressed by the CLI parser.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if !self.skip_signature_verify && self.public_key_file.is_none() {
            return Err(ConfigError::MissingPublicKeyFile);
        }
        if !self.skip_signature_verify && self.expected_key_id.is_empty() {
            return Err(ConfigError::EmptyKeyId);
        }
        if self.build_command.trim().is_empty() {
            return Err(ConfigError::EmptyBuildCommand);
        }
        if self.max_concurrent_builds == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Split a newline-separated command list, dropping blank lines.
///
/// Handles `\r\n` line endings from `.env` files edited on Windows.
pub fn parse_pre_commands(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a timeout in seconds to a duration, `0` meaning no timeout.
pub fn command_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
