//! Pipeline resolver: decides whether a request gets an override and, if so,
//! builds it.
//!
//! # Resolution flow
//!
//! 1. Match the repository name against the override filter. No match means
//!    "use the repository's own configuration" and nothing is spawned.
//! 2. Run the configured pre-commands (if any) as one script.
//! 3. Construct the flake build reference for the requested revision.
//! 4. Run the build tool, which prints the store path of the artifact.
//! 5. Read the artifact and hand its bytes back untouched.

use std::path::PathBuf;

use pipeliner_types::config::ServerConfig;
use pipeliner_types::error::{CommandError, ConfigError};
use pipeliner_types::request::IncomingRequest;
use tokio_util::sync::CancellationToken;

use crate::command::CommandRunner;
use crate::filter::OverrideFilter;
use crate::reference::build_reference;

/// Errors from the pre-command, build and artifact steps.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("pre-commands failed: {0}")]
    PreCommands(#[source] CommandError),

    #[error("build failed: {0}")]
    Build(#[source] CommandError),

    #[error("build printed no artifact path")]
    EmptyArtifactPath,

    #[error("failed to read artifact {}: {source}", .path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Generated pipeline document, returned verbatim.
    Pipeline(Vec<u8>),
    /// Repository is not eligible; the CI server keeps its own configuration.
    NoOverride,
}

/// Resolves configuration requests into pipeline documents.
///
/// Generic over `R: CommandRunner` so tests can script the subprocess layer.
pub struct PipelineResolver<R: CommandRunner> {
    filter: OverrideFilter,
    pre_commands: Vec<String>,
    build_command: String,
    flake_output: String,
    runner: R,
}

impl<R: CommandRunner> PipelineResolver<R> {
    pub fn new(
        filter: OverrideFilter,
        pre_commands: Vec<String>,
        build_command: impl Into<String>,
        flake_output: impl Into<String>,
        runner: R,
    ) -> Self {
        Self {
            filter,
            pre_commands,
            build_command: build_command.into(),
            flake_output: flake_output.into(),
            runner,
        }
    }

    /// Build a resolver from the server configuration, compiling the filter.
    pub fn from_config(config: &ServerConfig, runner: R) -> Result<Self, ConfigError> {
        let filter = OverrideFilter::new(&config.override_filter)?;
        Ok(Self::new(
            filter,
            config.pre_commands.clone(),
            config.build_command.clone(),
            config.flake_output.clone(),
            runner,
        ))
    }

    pub fn filter(&self) -> &OverrideFilter {
        &self.filter
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolve a request into a pipeline document or [`Resolution::NoOverride`].
    pub async fn resolve(
        &self,
        request: &IncomingRequest,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        let repo = &request.repo.name;

        if !self.filter.matches(repo) {
            tracing::info!(
                repo = %repo,
                filter = %self.filter.as_str(),
                "repository does not match override filter, skipping"
            );
            return Ok(Resolution::NoOverride);
        }

        self.run_pre_commands(cancel).await?;

        let reference = build_reference(
            &request.repo.link,
            &request.pipeline.git_ref,
            &request.pipeline.commit,
            &self.flake_output,
        );
        tracing::debug!(repo = %repo, reference = %reference, "constructed build reference");

        let build = vec![format!("{} {}", self.build_command, reference)];
        let output = self
            .runner
            .run(&build, cancel)
            .await
            .map_err(ResolveError::Build)?;

        let artifact_path = output.stdout_trimmed();
        if artifact_path.is_empty() {
            return Err(ResolveError::EmptyArtifactPath);
        }
        tracing::debug!(path = %artifact_path, "build produced artifact");

        let path = PathBuf::from(artifact_path);
        let pipeline = tokio::fs::read(&path)
            .await
            .map_err(|source| ResolveError::ArtifactRead { path, source })?;

        tracing::info!(repo = %repo, bytes = pipeline.len(), "pipeline generated");
        Ok(Resolution::Pipeline(pipeline))
    }

    async fn run_pre_commands(&self, cancel: &CancellationToken) -> Result<(), ResolveError> {
        if self.pre_commands.is_empty() {
            return Ok(());
        }

        tracing::info!(count = self.pre_commands.len(), "running pre-commands");
        let output = self
            .runner
            .run(&self.pre_commands, cancel)
            .await
            .map_err(ResolveError::PreCommands)?;
        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "pre-commands finished"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
