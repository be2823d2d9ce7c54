//! # Wirelist
//!
//! The command line binary for wirelist interconnect documentation.
//!
//! ## Usage
//!
//! ```bash
//! # Link two pins, creating pins and nets as needed
//! wirelist -D harness.redb ac PSU J1 1 CTRL P3 2
//!
//! # Pin report for two units, only conductors between them
//! wirelist -D harness.redb -u PSU,CTRL -l show
//!
//! # One public report per unit: out/psu.il, out/ctrl.il, ...
//! wirelist -D harness.redb massemit out/
//! ```
//!
//! Logs go to stderr; `WIRELIST_LOG_FORMAT=json` switches them to JSON
//! lines and `RUST_LOG` overrides the level filter.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wirelist::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose {
        "wirelist=debug,wirelist_core=debug"
    } else if cli.quiet {
        "wirelist=error,wirelist_core=error"
    } else {
        "wirelist=info,wirelist_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let log_format = std::env::var("WIRELIST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
