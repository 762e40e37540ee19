//! Connection seam between the cluster logic and the wire client.
//!
//! Discovery, selection and dispatch only talk to nodes through these two
//! traits, so they can run against the `fred`-backed client or an in-memory
//! stand-in.

use std::future::Future;

use thiserror::Error;

use super::reply::Reply;

/// Errors that can occur while talking to a single node.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: fred::error::Error,
    },

    #[error("Unexpected PING reply from {address}: {reply}")]
    UnexpectedPing { address: String, reply: String },

    #[error("Command failed on {address}: {source}")]
    Command {
        address: String,
        #[source]
        source: fred::error::Error,
    },
}

impl ClientError {
    /// Address of the node the error came from, when known.
    pub fn address(&self) -> &str {
        match self {
            ClientError::InvalidAddress(address) => address,
            ClientError::Connect { address, .. }
            | ClientError::UnexpectedPing { address, .. }
            | ClientError::Command { address, .. } => address,
        }
    }
}

/// INFO sections the cluster logic needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSection {
    All,
    Replication,
}

/// An open connection to one node.
///
/// `release` must be idempotent: calling it more than once closes the
/// connection only the first time.
pub trait NodeConnection: Send + Sync {
    /// Address this connection was opened for.
    fn address(&self) -> &str;

    /// Raw `INFO <section>` output.
    fn info(&self, section: InfoSection)
    -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Raw `CLUSTER NODES` output.
    fn cluster_nodes(&self) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Run one command; `args[0]` is the command name.
    fn command(&self, args: &[String]) -> impl Future<Output = Result<Reply, ClientError>> + Send;

    /// Close the connection.
    fn release(&self) -> impl Future<Output = ()> + Send;
}

/// Opens connections to nodes by address.
pub trait Connector: Send + Sync {
    type Connection: NodeConnection;

    /// Open a connection and verify it with a PING.
    fn connect(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Connection, ClientError>> + Send;
}
