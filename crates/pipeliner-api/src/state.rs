//! Application state wiring all components together.
//!
//! AppState holds the immutable configuration and the concrete component
//! instances used by the HTTP handlers. It is built once at startup; every
//! configuration problem (invalid filter, unreadable key) surfaces here,
//! before the listener is bound.

use std::sync::Arc;

use anyhow::Context;
use pipeliner_core::resolver::PipelineResolver;
use pipeliner_infra::keys::PublicKeyStore;
use pipeliner_infra::shell::ShellCommandRunner;
use pipeliner_infra::signature::AuthContext;
use pipeliner_types::config::ServerConfig;
use pipeliner_types::error::ConfigError;
use tokio_util::sync::CancellationToken;

/// Resolver pinned to the bash command runner.
pub type ConcreteResolver = PipelineResolver<ShellCommandRunner>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub resolver: Arc<ConcreteResolver>,
    /// `None` when signature verification is disabled.
    pub auth: Option<AuthContext>,
    /// Cancelled on shutdown; every request derives a child token from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Validate the configuration and build all components.
    pub async fn init(config: ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let runner = ShellCommandRunner::from_config(&config);
        let resolver = PipelineResolver::from_config(&config, runner)?;

        let auth = if config.skip_signature_verify {
            tracing::warn!("signature verification is disabled, accepting unsigned requests");
            None
        } else {
            let path = config
                .public_key_file
                .clone()
                .ok_or(ConfigError::MissingPublicKeyFile)?;
            let keys = PublicKeyStore::load(&path)
                .await
                .context("cannot verify request signatures without a valid public key")?;
            Some(AuthContext::new(
                Arc::new(keys),
                config.expected_key_id.clone(),
            ))
        };

        tracing::info!(
            filter = %resolver.filter().as_str(),
            flake_output = %config.flake_output,
            pre_commands = config.pre_commands.len(),
            max_concurrent_builds = config.max_concurrent_builds,
            "pipeline resolver ready"
        );

        Ok(Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            auth,
            shutdown: CancellationToken::new(),
        })
    }
}
