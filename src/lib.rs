//! valkey-fleet library crate
//!
//! Discovers the members of a Valkey/Redis deployment from one seed node,
//! selects a subset of them and runs one command on each concurrently.
//!
//! - [`topology`]: discovery in cluster and primary/replica mode
//! - [`selector`]: target resolution by address, node ID, role or seed
//! - [`dispatch`]: denylist check and concurrent command fan-out
//! - [`client`]: node connection seam, its `fred` implementation and parsers
//!
//! ```rust,ignore
//! use valkey_fleet::client::ValkeyConnector;
//! use valkey_fleet::config::FleetConfig;
//! use valkey_fleet::selector::{Target, select};
//! use valkey_fleet::topology::Discovery;
//!
//! let config = FleetConfig::new("127.0.0.1:7000");
//! let connector = ValkeyConnector::new(config.client_config());
//! let topology = Discovery::new(&connector, &config).discover(&config.seed).await?;
//! let selection = select(&topology.members, &Target::from_list("127.0.0.1:7001")?, &config.seed)?;
//! let results = valkey_fleet::dispatch::dispatch(&selection, "INFO server", config.concurrency).await?;
//! topology.release_all().await;
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod selector;
pub mod slots;
pub mod topology;

pub use config::FleetConfig;
pub use error::{Error, Result};
pub use instance::Instance;
pub use topology::{Discovery, Topology};
