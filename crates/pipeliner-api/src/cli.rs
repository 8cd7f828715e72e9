//! Command-line and environment configuration for the `pipeliner` binary.
//!
//! Every flag can also be set through a `PIPELINER_*` environment variable
//! (and therefore through a `.env` file, which is loaded before parsing).

use std::path::PathBuf;

use clap::Parser;
use pipeliner_types::config::{
    command_timeout_from_secs, parse_pre_commands, ServerConfig, DEFAULT_BUILD_COMMAND,
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_KEY_ID, DEFAULT_MAX_CONCURRENT_BUILDS,
};

/// Serve pipeline overrides to a Woodpecker CI server from Nix flakes.
#[derive(Debug, Parser)]
#[command(name = "pipeliner", version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on, e.g. `0.0.0.0:8000`.
    #[arg(long, env = "PIPELINER_HOST")]
    pub host: String,

    /// PEM file with the CI server's public key
    /// (from `<ci-server>/api/signature/public-key`).
    #[arg(long, env = "PIPELINER_PUBLIC_KEY_FILE")]
    pub public_key_file: Option<PathBuf>,

    /// Key id the CI server signs with.
    #[arg(long, env = "PIPELINER_KEY_ID", default_value = DEFAULT_KEY_ID)]
    pub key_id: String,

    /// Regex selecting the repositories that get an override.
    #[arg(long, env = "PIPELINER_OVERRIDE_FILTER")]
    pub override_filter: String,

    /// Flake output attribute that builds the pipeline file.
    #[arg(long, env = "PIPELINER_FLAKE_OUTPUT")]
    pub flake_output: String,

    /// Newline-separated shell commands run before each build.
    #[arg(long, env = "PIPELINER_PRECMDS", default_value = "")]
    pub pre_commands: String,

    /// Build tool invocation; the flake reference is appended.
    #[arg(long, env = "PIPELINER_BUILD_COMMAND", default_value = DEFAULT_BUILD_COMMAND)]
    pub build_command: String,

    /// Accept requests without a valid signature.
    #[arg(long, env = "PIPELINER_SKIP_VERIFY")]
    pub skip_verify: bool,

    /// Log request bodies, build steps and generated pipelines.
    #[arg(long, env = "PIPELINER_DEBUG")]
    pub debug: bool,

    /// Maximum number of pre-command/build scripts running at once.
    #[arg(long, env = "PIPELINER_MAX_CONCURRENT_BUILDS", default_value_t = DEFAULT_MAX_CONCURRENT_BUILDS)]
    pub max_concurrent_builds: usize,

    /// Kill scripts running longer than this many seconds (0 disables).
    #[arg(long, env = "PIPELINER_COMMAND_TIMEOUT_SECS", default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub command_timeout_secs: u64,

    /// Answer failed builds with 500 instead of 204.
    #[arg(long, env = "PIPELINER_REPORT_BUILD_FAILURES")]
    pub report_build_failures: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, env = "PIPELINER_OTEL")]
    pub otel: bool,
}

impl Cli {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.host,
            public_key_file: self.public_key_file,
            expected_key_id: self.key_id,
            override_filter: self.override_filter,
            flake_output: self.flake_output,
            pre_commands: parse_pre_commands(&self.pre_commands),
            build_command: self.build_command,
            skip_signature_verify: self.skip_verify,
            debug: self.debug,
            max_concurrent_builds: self.max_concurrent_builds,
            command_timeout: command_timeout_from_secs(self.command_timeout_secs),
            report_build_failures: self.report_build_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const REQUIRED: &[&str] = &[
        "pipeliner",
        "--host",
        "127.0.0.1:8000",
        "--override-filter",
        "^infra$",
        "--flake-output",
        "woodpecker-pipeline",
    ];

    #[test]
    fn test_defaults_apply() {
        let config = Cli::try_parse_from(REQUIRED).unwrap().into_config();
        assert_eq!(config.listen_addr, "127.0.0.1:8000");
        assert_eq!(config.expected_key_id, DEFAULT_KEY_ID);
        assert_eq!(config.build_command, DEFAULT_BUILD_COMMAND);
        assert_eq!(config.max_concurrent_builds, DEFAULT_MAX_CONCURRENT_BUILDS);
        assert_eq!(
            config.command_timeout,
            Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS))
        );
        assert!(config.pre_commands.is_empty());
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--public-key-file",
            "/etc/pipeliner/key.pem",
            "--pre-commands",
            "cd /srv\ngit pull",
            "--skip-verify",
            "--debug",
            "--command-timeout-secs",
            "0",
            "--max-concurrent-builds",
            "2",
            "--report-build-failures",
        ]);

        let config = Cli::try_parse_from(args).unwrap().into_config();
        assert_eq!(
            config.public_key_file,
            Some(PathBuf::from("/etc/pipeliner/key.pem"))
        );
        assert_eq!(config.pre_commands, vec!["cd /srv", "git pull"]);
        assert!(config.skip_signature_verify);
        assert!(config.debug);
        assert!(config.report_build_failures);
        assert_eq!(config.command_timeout, None);
        assert_eq!(config.max_concurrent_builds, 2);
    }

    #[test]
    fn test_missing_required_flag_is_error() {
        assert!(Cli::try_parse_from(["pipeliner", "--host", "127.0.0.1:8000"]).is_err());
    }
}
