//! Node client module.
//!
//! This module provides the connection seam used by discovery and dispatch,
//! a `fred`-backed implementation of it, and the parsers for the diagnostic
//! text the nodes return.
//!
//! ## Architecture
//!
//! - `connection`: `Connector` / `NodeConnection` traits and `ClientError`
//! - `valkey_client`: fred implementation with per-node timeouts and auth
//! - `parsing`: INFO, CLUSTER NODES, replica and CLIENT LIST parsers
//! - `types`: parsed member table rows, replica entries, client sessions
//! - `reply`: owned command replies
//!
//! ## Example
//!
//! ```rust,ignore
//! use valkey_fleet::client::{Connector, NodeConnection, ValkeyClientConfig, ValkeyConnector};
//!
//! let connector = ValkeyConnector::new(ValkeyClientConfig::default());
//! let conn = connector.connect("127.0.0.1:6379").await?;
//! let nodes = conn.cluster_nodes().await?;
//! conn.release().await;
//! ```

pub mod connection;
pub mod parsing;
pub mod reply;
pub mod types;
pub mod valkey_client;

pub use connection::{ClientError, Connector, InfoSection, NodeConnection};
pub use reply::Reply;
pub use types::{ClientSession, MemberRow, MemberTable, ReplicaEntry, ReplicaListing};
pub use valkey_client::{ValkeyClientConfig, ValkeyConnection, ValkeyConnector};
