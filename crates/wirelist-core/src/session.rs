//! # Interconnect Session
//!
//! The one-transaction-per-operation facade over the engines.
//!
//! ## Storage Backends
//!
//! An `Interconnect` owns one of two backends:
//! - `InMemory`: a `Dataset`; a mutation runs against a copy that replaces
//!   the live dataset only on success
//! - `Persistent`: a `RedbStore`; a mutation runs inside one redb write
//!   transaction that is committed on success and aborted on failure
//!
//! Either way a failed operation leaves every row as it was.

use crate::dataset::{Dataset, SerializableDataset, Tables};
use crate::query::{ConductorRow, PinRow, QueryEngine, ViewFilter};
use crate::renumber::{RenumberEngine, Renumbering};
use crate::reorient::{ReorientEngine, ReorientSummary, UnitFanOut};
use crate::report::{ReportBuilder, ReportWidths};
use crate::storage::RedbStore;
use crate::store::{EntityStore, NetRemoval};
use crate::{CdrId, Conductor, Net, NetId, Pin, PinCid, PinKey, PinRef, WirelistError};
use std::path::Path;

/// Storage backend of an `Interconnect`.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory dataset (fast, volatile).
    InMemory(Dataset),
    /// Disk-backed relations using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Dataset::new())
    }
}

/// An interconnect database: nets, pins and conductors.
#[derive(Debug, Default)]
pub struct Interconnect {
    backend: StorageBackend,
}

impl Interconnect {
    /// Create an empty in-memory interconnect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory interconnect over an existing dataset.
    #[must_use]
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            backend: StorageBackend::InMemory(dataset),
        }
    }

    /// Open or create a persistent interconnect at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, WirelistError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(store),
        })
    }

    /// Whether this interconnect is backed by a database file.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Compact the database file. No-op for in-memory storage.
    pub fn compact(&mut self) -> Result<(), WirelistError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(()),
            StorageBackend::Persistent(store) => store.compact(),
        }
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    fn write<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Tables) -> Result<R, WirelistError>,
    ) -> Result<R, WirelistError> {
        match &mut self.backend {
            StorageBackend::InMemory(dataset) => {
                let mut draft = dataset.clone();
                let value = f(&mut draft).map_err(|e| e.rolled_back(operation))?;
                *dataset = draft;
                Ok(value)
            }
            StorageBackend::Persistent(store) => store.write(operation, f),
        }
    }

    fn read<R>(
        &self,
        f: impl FnOnce(&Dataset) -> Result<R, WirelistError>,
    ) -> Result<R, WirelistError> {
        match &self.backend {
            StorageBackend::InMemory(dataset) => f(dataset),
            StorageBackend::Persistent(store) => f(&store.snapshot()?),
        }
    }

    /// A consistent copy of every row.
    pub fn snapshot(&self) -> Result<Dataset, WirelistError> {
        self.read(|dataset| Ok(dataset.clone()))
    }

    // =========================================================================
    // NETS AND PINS
    // =========================================================================

    /// Reserve the next net number of a unit.
    pub fn assign_net_number(&mut self, unit: &str) -> Result<i64, WirelistError> {
        self.write("assign_net_number", |t| {
            EntityStore::assign_net_number(t, unit)
        })
    }

    /// Net owning the pin at `pin`, created along with the pin if absent.
    pub fn find_or_create_pin_net(&mut self, pin: &PinRef) -> Result<Net, WirelistError> {
        self.write("find_or_create_pin_net", |t| {
            EntityStore::find_or_create_pin_net(t, pin)
        })
    }

    /// Add a pin to the existing net `(pin.unit, net_num)`.
    pub fn add_pin_to_net(&mut self, pin: &PinRef, net_num: i64) -> Result<Pin, WirelistError> {
        self.write("add_pin_to_net", |t| {
            EntityStore::add_pin_to_net(t, pin, net_num)
        })
    }

    /// Delete a net with its conductors and pins.
    pub fn delete_net(&mut self, id: &NetId) -> Result<NetRemoval, WirelistError> {
        self.write("delete_net", |t| EntityStore::delete_net(t, id))
    }

    /// Set or clear a net's signal description.
    pub fn describe_net(
        &mut self,
        id: &NetId,
        sig_desc: Option<&str>,
    ) -> Result<Net, WirelistError> {
        self.write("describe_net", |t| {
            EntityStore::describe_net(t, id, sig_desc)
        })
    }

    /// Delete the pin shown at display id `id` under `filter`.
    pub fn delete_pin(&mut self, filter: &ViewFilter, id: PinCid) -> Result<Pin, WirelistError> {
        self.write("delete_pin", |t| {
            let key = QueryEngine::pin_at(t, filter, id)?;
            EntityStore::delete_pin(t, &key)
        })
    }

    /// Delete a pin by key.
    pub fn delete_pin_by_key(&mut self, key: &PinKey) -> Result<Pin, WirelistError> {
        self.write("delete_pin", |t| EntityStore::delete_pin(t, key))
    }

    /// Rename the pin shown at display id `id` under `filter`.
    pub fn rename_pin(
        &mut self,
        filter: &ViewFilter,
        id: PinCid,
        conn: &str,
        desig: &str,
    ) -> Result<Pin, WirelistError> {
        self.write("rename_pin", |t| {
            let key = QueryEngine::pin_at(t, filter, id)?;
            EntityStore::rename_pin(t, &key, conn, desig)
        })
    }

    /// Rename a pin by key.
    pub fn rename_pin_by_key(
        &mut self,
        key: &PinKey,
        conn: &str,
        desig: &str,
    ) -> Result<Pin, WirelistError> {
        self.write("rename_pin", |t| {
            EntityStore::rename_pin(t, key, conn, desig)
        })
    }

    /// Describe the pin shown at display id `id` under `filter`.
    pub fn set_pin_description(
        &mut self,
        filter: &ViewFilter,
        id: PinCid,
        sig_desc: Option<&str>,
    ) -> Result<Pin, WirelistError> {
        self.write("set_pin_description", |t| {
            let key = QueryEngine::pin_at(t, filter, id)?;
            EntityStore::describe_pin(t, &key, sig_desc)
        })
    }

    /// Describe a pin by key.
    pub fn describe_pin_by_key(
        &mut self,
        key: &PinKey,
        sig_desc: Option<&str>,
    ) -> Result<Pin, WirelistError> {
        self.write("set_pin_description", |t| {
            EntityStore::describe_pin(t, key, sig_desc)
        })
    }

    // =========================================================================
    // CONDUCTORS
    // =========================================================================

    /// Link two existing nets.
    pub fn add_conductor(
        &mut self,
        a_net: &NetId,
        b_net: &NetId,
        kind: &str,
        cable: Option<u64>,
    ) -> Result<Conductor, WirelistError> {
        self.write("add_conductor", |t| {
            EntityStore::add_conductor(t, a_net, b_net, kind, cable)
        })
    }

    /// Link two pin addresses, creating pins and nets as needed.
    pub fn add_link(
        &mut self,
        a: &PinRef,
        b: &PinRef,
        cable: Option<u64>,
    ) -> Result<Conductor, WirelistError> {
        self.write("add_link", |t| EntityStore::add_link(t, a, b, cable))
    }

    /// Delete a conductor, closing the gap in its cable.
    pub fn delete_conductor(&mut self, id: CdrId) -> Result<Conductor, WirelistError> {
        self.write("delete_conductor", |t| {
            EntityStore::delete_conductor(t, id)
        })
    }

    /// Change a conductor's kind.
    pub fn set_conductor_kind(&mut self, id: CdrId, kind: &str) -> Result<Conductor, WirelistError> {
        self.write("set_conductor_kind", |t| {
            EntityStore::set_conductor_kind(t, id, kind)
        })
    }

    /// Move a conductor to another subconductor id without touching its
    /// neighbours.
    pub fn set_conductor_subid(
        &mut self,
        id: CdrId,
        new_subcdr: u64,
    ) -> Result<Conductor, WirelistError> {
        self.write("set_conductor_subid", |t| {
            EntityStore::set_conductor_subid(t, id, new_subcdr)
        })
    }

    // =========================================================================
    // BULK ENGINES
    // =========================================================================

    /// Compact the net numbers of a unit.
    pub fn renumber_nets(&mut self, unit: &str) -> Result<Vec<Renumbering>, WirelistError> {
        self.write("renumber_nets", |t| RenumberEngine::renumber_nets(t, unit))
    }

    /// Put every conductor's lowest fan-out unit on its `a` side.
    pub fn reorient_conductors(&mut self) -> Result<ReorientSummary, WirelistError> {
        self.write("reorient_conductors", |t| {
            ReorientEngine::reorient_conductors(t)
        })
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Get a net by identity.
    pub fn net(&self, id: &NetId) -> Result<Option<Net>, WirelistError> {
        self.read(|d| d.net(id))
    }

    /// Nets of a unit, ordered by number.
    pub fn nets(&self, unit: &str) -> Result<Vec<Net>, WirelistError> {
        self.read(|d| d.nets_of_unit(unit))
    }

    /// Distinct unit names.
    pub fn units(&self) -> Result<Vec<String>, WirelistError> {
        self.read(QueryEngine::units)
    }

    /// Distinct connector names of a unit.
    pub fn connectors(&self, unit: &str) -> Result<Vec<String>, WirelistError> {
        self.read(|d| QueryEngine::connectors(d, unit))
    }

    /// Conductors attached to a net.
    pub fn linked_conductors(&self, net: &NetId) -> Result<Vec<Conductor>, WirelistError> {
        self.read(|d| QueryEngine::linked_conductors(d, net))
    }

    /// Pin projection under `filter`.
    pub fn pin_rows(&self, filter: &ViewFilter) -> Result<Vec<PinRow>, WirelistError> {
        self.read(|d| QueryEngine::pin_rows(d, filter))
    }

    /// Conductor projection under `filter`.
    pub fn conductor_rows(&self, filter: &ViewFilter) -> Result<Vec<ConductorRow>, WirelistError> {
        self.read(|d| QueryEngine::conductor_rows(d, filter))
    }

    /// Units ranked by conductor fan-out.
    pub fn fan_out(&self) -> Result<Vec<UnitFanOut>, WirelistError> {
        self.read(ReorientEngine::fan_out)
    }

    // =========================================================================
    // REPORTS
    // =========================================================================

    /// Render the pin report.
    pub fn pin_report(
        &self,
        filter: &ViewFilter,
        widths: &ReportWidths,
        show_pcids: bool,
    ) -> Result<String, WirelistError> {
        self.read(|d| ReportBuilder::pin_report(d, filter, widths, show_pcids))
    }

    /// Render the conductor report.
    pub fn conductor_report(
        &self,
        filter: &ViewFilter,
        widths: &ReportWidths,
    ) -> Result<String, WirelistError> {
        self.read(|d| ReportBuilder::conductor_report(d, filter, widths))
    }

    // =========================================================================
    // EXPORT / IMPORT
    // =========================================================================

    /// Dump every row as pretty-printed JSON.
    pub fn export_json(&self) -> Result<Vec<u8>, WirelistError> {
        self.read(|d| {
            serde_json::to_vec_pretty(&SerializableDataset::from(d))
                .map_err(|e| WirelistError::SerializationError(e.to_string()))
        })
    }

    /// Replace every row with the contents of a JSON dump.
    pub fn import_json(&mut self, bytes: &[u8]) -> Result<Dataset, WirelistError> {
        let flat: SerializableDataset = serde_json::from_slice(bytes)
            .map_err(|e| WirelistError::SerializationError(e.to_string()))?;
        let dataset = Dataset::try_from(flat)?;
        self.write("import", |t| dataset.store_into(t))?;
        tracing::info!(
            "imported {} nets, {} pins, {} conductors",
            dataset.net_count(),
            dataset.pin_count(),
            dataset.conductor_count()
        );
        Ok(dataset)
    }
}

// =============================================================================
// TESTS
// =============================================================================
