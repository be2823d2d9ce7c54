//! # Wirelist CLI Module
//!
//! One subcommand per interconnect operation, each run as one transaction
//! against a redb database.
//!
//! ## Available Commands
//!
//! - `ac` - Add a conductor between two pins
//! - `ap` - Add a pin to an existing net
//! - `rmcdr` / `rmnet` / `rmpin` - Delete a conductor, net or pin
//! - `descp` / `chpin` - Describe or rename a pin
//! - `setsub` / `setkind` - Adjust a conductor
//! - `renumbernets` / `reorientcdrs` - Bulk maintenance
//! - `show` / `cdrcheck` - Pin and conductor reports
//! - `emit` / `massemit` - Public pin reports to files
//! - `units` - List units
//! - `export` / `import` - JSON dump and restore

mod commands;

use crate::config::{Config, DATABASE_ENV};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wirelist_core::{PinRef, WirelistError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Wirelist - interconnect documentation
///
/// Keeps nets, pins and the conductors linking them, and prints
/// fixed-width interconnect reports.
#[derive(Parser, Debug)]
#[command(name = "wirelist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the interconnect database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML config file (default: ./wirelist.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show these units (comma-separated)
    #[arg(short, long, global = true, value_delimiter = ',')]
    pub units: Option<Vec<String>>,

    /// Only show conductors whose both ends are in the shown units
    #[arg(short, long, global = true)]
    pub link: bool,

    /// Output rows as JSON (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a conductor from one pin to another, creating pins as needed
    Ac {
        a_unit: String,
        a_conn: String,
        a_desig: String,
        b_unit: String,
        b_conn: String,
        b_desig: String,
        /// Existing cable to add the conductor to
        cable: Option<u64>,
    },

    /// Add a pin to an existing net
    Ap {
        unit: String,
        conn: String,
        desig: String,
        net_num: i64,
    },

    /// Delete a conductor and close the gap in its cable
    Rmcdr { cable: u64, subcdr: u64 },

    /// Set the signal description of the pin shown at <PIN_CID>
    Descp {
        pin_cid: usize,
        /// Description words; none clears it
        #[arg(trailing_var_arg = true)]
        sig_desc: Vec<String>,
    },

    /// Delete a net with every conductor and pin linked to it
    Rmnet { unit: String, net_num: i64 },

    /// Delete the pin shown at <PIN_CID> (its net stays)
    Rmpin { pin_cid: usize },

    /// Change the connector and designator of the pin shown at <PIN_CID>
    Chpin {
        pin_cid: usize,
        conn: String,
        desig: String,
    },

    /// Renumber the nets of a unit in pin order
    Renumbernets { unit: String },

    /// Put low fan-out units on the a side of their conductors
    Reorientcdrs,

    /// Change a conductor's subconductor id (0 hides it)
    Setsub {
        cable: u64,
        subcdr: u64,
        #[arg(default_value_t = 0)]
        newsubcdr: u64,
    },

    /// Change a conductor's kind ("C" is an ordinary conductor)
    Setkind {
        cable: u64,
        subcdr: u64,
        kind: String,
    },

    /// Print the pin report
    Show,

    /// Print the conductor report
    Cdrcheck,

    /// Write the public pin report to a file
    Emit { file: PathBuf },

    /// Write one public pin report per unit to <PREFIX><unit>.il
    Massemit { prefix: String },

    /// List units
    Units,

    /// Export every row as JSON
    Export { file: PathBuf },

    /// Replace every row with a JSON export
    Import { file: PathBuf },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), WirelistError> {
    let config = Config::load(cli.config.as_deref())?;
    let env_db = std::env::var(DATABASE_ENV).ok();
    let db_path = config.database_path(cli.database.as_deref(), env_db.as_deref());
    let filter = config.view_filter(cli.units.as_deref(), cli.link);
    let ctx = Context {
        db_path,
        filter,
        widths: config.report,
        json_mode: cli.json_mode,
    };
    tracing::debug!("database {}", ctx.db_path.display());

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Ac {
            a_unit,
            a_conn,
            a_desig,
            b_unit,
            b_conn,
            b_desig,
            cable,
        } => cmd_ac(
            &ctx,
            &PinRef::new(a_unit, a_conn, a_desig),
            &PinRef::new(b_unit, b_conn, b_desig),
            cable,
        ),
        Commands::Ap {
            unit,
            conn,
            desig,
            net_num,
        } => cmd_ap(&ctx, &PinRef::new(unit, conn, desig), net_num),
        Commands::Rmcdr { cable, subcdr } => cmd_rmcdr(&ctx, cable, subcdr),
        Commands::Descp { pin_cid, sig_desc } => cmd_descp(&ctx, pin_cid, &sig_desc),
        Commands::Rmnet { unit, net_num } => cmd_rmnet(&ctx, &unit, net_num),
        Commands::Rmpin { pin_cid } => cmd_rmpin(&ctx, pin_cid),
        Commands::Chpin {
            pin_cid,
            conn,
            desig,
        } => cmd_chpin(&ctx, pin_cid, &conn, &desig),
        Commands::Renumbernets { unit } => cmd_renumbernets(&ctx, &unit),
        Commands::Reorientcdrs => cmd_reorientcdrs(&ctx),
        Commands::Setsub {
            cable,
            subcdr,
            newsubcdr,
        } => cmd_setsub(&ctx, cable, subcdr, newsubcdr),
        Commands::Setkind {
            cable,
            subcdr,
            kind,
        } => cmd_setkind(&ctx, cable, subcdr, &kind),
        Commands::Show => cmd_show(&ctx),
        Commands::Cdrcheck => cmd_cdrcheck(&ctx),
        Commands::Emit { file } => cmd_emit(&ctx, &file),
        Commands::Massemit { prefix } => cmd_massemit(&ctx, &prefix),
        Commands::Units => cmd_units(&ctx),
        Commands::Export { file } => cmd_export(&ctx, &file),
        Commands::Import { file } => cmd_import(&ctx, &file),
    }
}
