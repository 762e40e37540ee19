//! Error types shared across the crate.
//!
//! Each component owns its own error enum; [`Error`] folds them together for
//! callers that drive a whole run (the CLI).

use thiserror::Error;

use crate::client::ClientError;
use crate::dispatch::DispatchError;
use crate::instance::InstanceInitError;
use crate::selector::SelectionError;
use crate::topology::DiscoveryError;

/// Errors that can occur when parsing diagnostic text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid slot range: {0}")]
    InvalidSlotRange(String),

    #[error("Invalid cluster nodes format: {0}")]
    InvalidClusterNodes(String),

    #[error("Invalid replica entry: {0}")]
    InvalidReplicaEntry(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Top-level error for a complete run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Instance(#[from] InstanceInitError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias for whole-run operations.
pub type Result<T> = std::result::Result<T, Error>;
