//! Serve CLI command (WebSocket session server).

use crate::Result;
use crate::config::ClaimcheckConfig;

/// Serve command handler.
#[derive(Debug, Clone, Default)]
pub struct ServeCommand {
    bind: Option<String>,
}

impl ServeCommand {
    /// Creates a serve command using the configured bind address.
    #[must_use]
    pub const fn new() -> Self {
        Self { bind: None }
    }

    /// Overrides the bind address.
    #[must_use]
    pub fn with_bind(mut self, bind: Option<String>) -> Self {
        self.bind = bind;
        self
    }

    /// Applies command-line overrides to the loaded configuration.
    #[must_use]
    pub fn configure(&self, mut config: ClaimcheckConfig) -> ClaimcheckConfig {
        if let Some(bind) = &self.bind {
            config.server.bind.clone_from(bind);
        }
        config
    }

    /// Builds the session server and runs it on `runtime` until Ctrl-C.
    ///
    /// The server is assembled before entering the runtime because the
    /// collaborator clients own blocking HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be built, bound, or fails.
    #[cfg(feature = "http")]
    pub fn run(&self, config: ClaimcheckConfig, runtime: &tokio::runtime::Runtime) -> Result<()> {
        let server = crate::server::SessionServer::from_config(self.configure(config))?;
        runtime.block_on(server.run())
    }

    /// Runs the session server (feature not enabled).
    ///
    /// # Errors
    ///
    /// Always returns [`crate::Error::FeatureNotEnabled`].
    #[cfg(not(feature = "http"))]
    pub fn run(&self, _config: ClaimcheckConfig, _runtime: &tokio::runtime::Runtime) -> Result<()> {
        Err(crate::Error::FeatureNotEnabled("http".to_string()))
    }
}
