//! vfleet - inspect a Valkey/Redis deployment and run commands across it.
//!
//! Logs go to stderr so that reports on stdout can be piped.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use valkey_fleet::cli::{self, Cli};

/// Log level applied to this crate when neither `RUST_LOG` nor
/// `--log-level` says otherwise.
const DEFAULT_LOG_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // --log-level wins over RUST_LOG, which wins over the default
    let filter = match (&args.log_level, std::env::var_os(EnvFilter::DEFAULT_ENV)) {
        (Some(level), _) => {
            EnvFilter::from_default_env().add_directive(format!("valkey_fleet={}", level).parse()?)
        }
        (None, Some(_)) => EnvFilter::from_default_env(),
        (None, None) => EnvFilter::new(format!("valkey_fleet={}", DEFAULT_LOG_LEVEL)),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!(seed = %args.command.connection().seed, "Starting vfleet");

    cli::run(&args.command).await?;
    Ok(())
}
