//! Run configuration.
//!
//! One explicit value carries everything a run needs; discovery, selection
//! and dispatch receive it (or the parts they need) as parameters.

use std::time::Duration;

use crate::client::ValkeyClientConfig;

/// Default per-connection timeout, applied to dial, read and write.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default number of nodes contacted at once during fan-out.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Configuration for one discovery and dispatch run.
#[derive(Clone, Debug)]
pub struct FleetConfig {
    /// Seed node address `host:port`.
    pub seed: String,
    /// Shared password, if the nodes require one.
    pub password: Option<String>,
    /// Per-connection timeout.
    pub timeout: Duration,
    /// Upper bound on concurrently contacted nodes.
    pub concurrency: usize,
}

impl FleetConfig {
    /// Create a configuration for a seed node with defaults.
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            password: None,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set password. An empty password means no authentication.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Set per-connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set fan-out concurrency, at least 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Client configuration derived from this run configuration.
    pub fn client_config(&self) -> ValkeyClientConfig {
        let config = ValkeyClientConfig::default().with_timeout(self.timeout);
        match self.password {
            Some(ref password) => config.with_password(password.clone()),
            None => config,
        }
    }
}
