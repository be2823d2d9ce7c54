//! # wirelist-core
//!
//! The interconnect entity store for wirelist.
//!
//! This crate keeps wiring documentation as three relations: nets (signal
//! groups scoped to a unit), the pins they own, and the conductors (cable
//! cores) linking pairs of nets. On top of any transactional backend it
//! provides:
//! - Identity assignment (net numbers, cables, subconductors)
//! - Referential integrity and cascading deletes
//! - Bulk renumbering and conductor reorientation
//! - Fixed-width pin and conductor reports
//!
//! ## Architectural Constraints
//!
//! - Every structural mutation is one all-or-nothing transaction
//! - All ordering is deterministic (`BTreeMap`, no floats)
//! - No async, no network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod dataset;
pub mod natural;
pub mod primitives;
pub mod query;
pub mod renumber;
pub mod reorient;
pub mod report;
pub mod session;
pub mod storage;
pub mod store;
pub mod tabulate;
pub mod types;
pub mod validate;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CdrId, Conductor, ErrorKind, Net, NetId, Pin, PinCid, PinKey, PinRef, WirelistError,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use dataset::{Dataset, SerializableDataset, Tables};
pub use natural::NameKey;
pub use query::{ConductorRow, PinRow, QueryEngine, ViewFilter};
pub use renumber::{RenumberEngine, Renumbering};
pub use reorient::{ReorientEngine, ReorientSummary, UnitFanOut};
pub use report::{ReportBuilder, ReportWidths};
pub use session::{Interconnect, StorageBackend};
pub use storage::RedbStore;
pub use store::{EntityStore, NetRemoval};
pub use tabulate::Tabulator;
pub use validate::Validator;
