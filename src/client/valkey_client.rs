//! Valkey client wrapper using the fred crate.
//!
//! Opens one centralized (non-cluster-aware) client per node, so that every
//! command lands on exactly the node it was addressed to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fred::prelude::*;
use fred::types::{ClusterHash, CustomCommand, InfoKind, Value};
use tracing::{debug, instrument, warn};

use crate::config::DEFAULT_TIMEOUT;

use super::connection::{ClientError, Connector, InfoSection, NodeConnection};
use super::parsing::split_host_port;
use super::reply::Reply;

/// Reply prefix sent while a node is still loading its dataset.
const LOADING_PREFIX: &str = "LOADING";

/// Configuration for connecting to individual nodes.
#[derive(Clone, Debug)]
pub struct ValkeyClientConfig {
    /// Password for the default user.
    pub password: Option<String>,
    /// Applied to dial, command and internal command timeouts.
    pub timeout: Duration,
}

impl Default for ValkeyClientConfig {
    fn default() -> Self {
        Self {
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ValkeyClientConfig {
    /// Set password.
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(password);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<InfoSection> for InfoKind {
    fn from(section: InfoSection) -> Self {
        match section {
            InfoSection::All => InfoKind::All,
            InfoSection::Replication => InfoKind::Replication,
        }
    }
}

/// Opens fred clients to single nodes.
#[derive(Clone, Debug, Default)]
pub struct ValkeyConnector {
    config: ValkeyClientConfig,
}

impl ValkeyConnector {
    pub fn new(config: ValkeyClientConfig) -> Self {
        Self { config }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ValkeyClientConfig {
        &self.config
    }
}

impl Connector for ValkeyConnector {
    type Connection = ValkeyConnection;

    #[instrument(skip(self))]
    async fn connect(&self, address: &str) -> Result<ValkeyConnection, ClientError> {
        let (host, port) = split_host_port(address)
            .map_err(|_| ClientError::InvalidAddress(address.to_string()))?;

        let mut redis_config = Config {
            server: ServerConfig::Centralized {
                server: Server::new(host, port),
            },
            ..Default::default()
        };
        if let Some(ref password) = self.config.password {
            redis_config.password = Some(password.clone());
        }

        let timeout = self.config.timeout;
        let connect_error = |source| ClientError::Connect {
            address: address.to_string(),
            source,
        };

        // No reconnect policy: one connection attempt per node.
        let client = Builder::from_config(redis_config)
            .with_performance_config(|perf| {
                perf.default_command_timeout = timeout;
            })
            .with_connection_config(|conn| {
                conn.connection_timeout = timeout;
                conn.internal_command_timeout = timeout;
                conn.max_command_attempts = 1;
            })
            .build()
            .map_err(connect_error)?;

        client.init().await.map_err(connect_error)?;

        if let Err(e) = classify_ping(address, client.ping::<String>(None).await) {
            let _ = client.quit().await;
            return Err(e);
        }

        debug!(address, "Connected");
        Ok(ValkeyConnection {
            address: address.to_string(),
            client,
            released: AtomicBool::new(false),
        })
    }
}

/// Decide whether a PING result means the node is usable.
///
/// A node still loading its dataset answers with a `LOADING` error but is
/// otherwise alive, so it is accepted.
fn classify_ping(
    address: &str,
    result: Result<String, fred::error::Error>,
) -> Result<(), ClientError> {
    match result {
        Ok(reply) if reply == "PONG" => Ok(()),
        Ok(reply) => Err(ClientError::UnexpectedPing {
            address: address.to_string(),
            reply,
        }),
        Err(e) if e.details().starts_with(LOADING_PREFIX) => {
            warn!(address, "Node is still loading its dataset");
            Ok(())
        }
        Err(source) => Err(ClientError::Connect {
            address: address.to_string(),
            source,
        }),
    }
}

/// A live fred client bound to one node.
#[derive(Debug)]
pub struct ValkeyConnection {
    address: String,
    client: Client,
    released: AtomicBool,
}

impl ValkeyConnection {
    fn command_error(&self, source: fred::error::Error) -> ClientError {
        ClientError::Command {
            address: self.address.clone(),
            source,
        }
    }
}

impl NodeConnection for ValkeyConnection {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(skip(self), fields(address = %self.address))]
    async fn info(&self, section: InfoSection) -> Result<String, ClientError> {
        self.client
            .info::<String>(Some(section.into()))
            .await
            .map_err(|e| self.command_error(e))
    }

    #[instrument(skip(self), fields(address = %self.address))]
    async fn cluster_nodes(&self) -> Result<String, ClientError> {
        self.client
            .cluster_nodes::<String>()
            .await
            .map_err(|e| self.command_error(e))
    }

    #[instrument(skip(self), fields(address = %self.address))]
    async fn command(&self, args: &[String]) -> Result<Reply, ClientError> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Reply::Nil);
        };
        let cmd = CustomCommand::new(name.clone(), ClusterHash::FirstKey, false);
        let value: Value = self
            .client
            .custom(cmd, rest.to_vec())
            .await
            .map_err(|e| self.command_error(e))?;
        Ok(Reply::from(value))
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.client.quit().await {
            debug!(address = %self.address, error = %e, "Error closing connection");
        }
    }
}
