//! # wirelist
//!
//! Command line front end for the wirelist interconnect store: clap
//! subcommands over `wirelist-core` plus TOML configuration.

pub mod cli;
pub mod config;
