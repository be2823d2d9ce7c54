//! # Storage Module
//!
//! Persistent backend for the interconnect relations.
//!
//! `RedbStore` implements one ACID write transaction per store operation
//! on top of the redb embedded database.

mod redb_store;

pub use redb_store::RedbStore;
