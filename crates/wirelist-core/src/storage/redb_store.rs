//! # redb-backed Interconnect Storage
//!
//! A disk-backed store for the interconnect relations using the redb
//! embedded database, providing:
//! - ACID transactions (one write transaction per store operation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (report snapshots never block on a writer)
//!
//! ## Layout
//!
//! One redb table per relation. The primary key columns form the redb
//! key tuple; the remaining columns are postcard-encoded records.

use crate::dataset::{Dataset, Tables};
use crate::{CdrId, Conductor, Net, NetId, Pin, PinKey, WirelistError};
use redb::{
    Database, Range, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for nets: (unit, num) -> serialized `NetRecord`
const NETS: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("nets");

/// Table for pins: (net_unit, net_num, conn, desig) -> serialized `PinRecord`
const PINS: TableDefinition<(&str, i64, &str, &str), &[u8]> = TableDefinition::new("pins");

/// Table for conductors: (cable, subcdr) -> serialized `ConductorRecord`
const CONDUCTORS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("conductors");

/// Table for net counters: unit -> highest net number ever assigned
const NET_COUNTERS: TableDefinition<&str, i64> = TableDefinition::new("net_counters");

type NetKey = (&'static str, i64);
type PinTableKey = (&'static str, i64, &'static str, &'static str);
type CdrKey = (u64, u64);

// =============================================================================
// RECORDS (non-key columns)
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct NetRecord {
    sig_desc: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PinRecord {
    sig_desc: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConductorRecord {
    a_net_unit: String,
    a_net_num: i64,
    b_net_unit: String,
    b_net_num: i64,
    kind: String,
}

fn storage(e: impl std::fmt::Display) -> WirelistError {
    WirelistError::StorageError(e.to_string())
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, WirelistError> {
    postcard::to_allocvec(record).map_err(|e| WirelistError::SerializationError(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, WirelistError> {
    postcard::from_bytes(bytes).map_err(|e| WirelistError::SerializationError(e.to_string()))
}

fn conductor_from(id: CdrId, record: ConductorRecord) -> Conductor {
    Conductor {
        id,
        a_net: NetId::new(record.a_net_unit, record.a_net_num),
        b_net: NetId::new(record.b_net_unit, record.b_net_num),
        kind: record.kind,
    }
}

// =============================================================================
// RANGE DECODING (shared by read and write transactions)
// =============================================================================

fn collect_nets(range: Range<'_, NetKey, &'static [u8]>) -> Result<Vec<Net>, WirelistError> {
    let mut nets = Vec::new();
    for entry in range {
        let (key, value) = entry.map_err(storage)?;
        let (unit, num) = key.value();
        let record: NetRecord = decode(value.value())?;
        nets.push(Net {
            id: NetId::new(unit, num),
            sig_desc: record.sig_desc,
        });
    }
    Ok(nets)
}

/// Decode pins in key order; with `only` set, stop at the first pin of another net.
fn collect_pins(
    range: Range<'_, PinTableKey, &'static [u8]>,
    only: Option<&NetId>,
) -> Result<Vec<Pin>, WirelistError> {
    let mut pins = Vec::new();
    for entry in range {
        let (key, value) = entry.map_err(storage)?;
        let (unit, num, conn, desig) = key.value();
        if let Some(net) = only {
            if net.unit != unit || net.num != num {
                break;
            }
        }
        let record: PinRecord = decode(value.value())?;
        pins.push(Pin {
            key: PinKey::new(NetId::new(unit, num), conn, desig),
            sig_desc: record.sig_desc,
        });
    }
    Ok(pins)
}

fn collect_conductors(
    range: Range<'_, CdrKey, &'static [u8]>,
) -> Result<Vec<Conductor>, WirelistError> {
    let mut conductors = Vec::new();
    for entry in range {
        let (key, value) = entry.map_err(storage)?;
        let (cable, subcdr) = key.value();
        let record: ConductorRecord = decode(value.value())?;
        conductors.push(conductor_from(CdrId::new(cable, subcdr), record));
    }
    Ok(conductors)
}

fn collect_counters(
    range: Range<'_, &'static str, i64>,
) -> Result<Vec<(String, i64)>, WirelistError> {
    let mut counters = Vec::new();
    for entry in range {
        let (key, value) = entry.map_err(storage)?;
        counters.push((key.value().to_string(), value.value()));
    }
    Ok(counters)
}

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed interconnect store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create an interconnect database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WirelistError> {
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage)?;
            let _ = write_txn.open_table(NETS).map_err(storage)?;
            let _ = write_txn.open_table(PINS).map_err(storage)?;
            let _ = write_txn.open_table(CONDUCTORS).map_err(storage)?;
            let _ = write_txn.open_table(NET_COUNTERS).map_err(storage)?;
            write_txn.commit().map_err(storage)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), WirelistError> {
        self.db.compact().map_err(storage)?;
        Ok(())
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`; in both
    /// cases no partial state is ever visible to later operations.
    pub fn write<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Tables) -> Result<R, WirelistError>,
    ) -> Result<R, WirelistError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let outcome = {
            let mut tables = RedbTables::open(&txn)?;
            f(&mut tables)
        };

        match outcome {
            Ok(value) => {
                txn.commit()
                    .map_err(|e| storage(e).rolled_back(operation))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(abort) = txn.abort() {
                    tracing::warn!("abort of '{}' failed: {}", operation, abort);
                }
                Err(error.rolled_back(operation))
            }
        }
    }

    /// Load every committed row into an in-memory dataset, within one
    /// read transaction.
    pub fn snapshot(&self) -> Result<Dataset, WirelistError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let nets = read_txn.open_table(NETS).map_err(storage)?;
        let pins = read_txn.open_table(PINS).map_err(storage)?;
        let conductors = read_txn.open_table(CONDUCTORS).map_err(storage)?;
        let counters = read_txn.open_table(NET_COUNTERS).map_err(storage)?;

        let mut dataset = Dataset::new();
        for net in collect_nets(nets.iter().map_err(storage)?)? {
            dataset.insert_net(&net)?;
        }
        for pin in collect_pins(pins.iter().map_err(storage)?, None)? {
            dataset.insert_pin(&pin)?;
        }
        for conductor in collect_conductors(conductors.iter().map_err(storage)?)? {
            dataset.insert_conductor(&conductor)?;
        }
        for (unit, value) in collect_counters(counters.iter().map_err(storage)?)? {
            dataset.set_net_counter(&unit, value)?;
        }
        Ok(dataset)
    }
}

// =============================================================================
// TABLES OVER A WRITE TRANSACTION
// =============================================================================

/// The four relations opened inside one redb write transaction.
struct RedbTables<'txn> {
    nets: Table<'txn, NetKey, &'static [u8]>,
    pins: Table<'txn, PinTableKey, &'static [u8]>,
    conductors: Table<'txn, CdrKey, &'static [u8]>,
    net_counters: Table<'txn, &'static str, i64>,
}

impl<'txn> RedbTables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> Result<Self, WirelistError> {
        Ok(Self {
            nets: txn.open_table(NETS).map_err(storage)?,
            pins: txn.open_table(PINS).map_err(storage)?,
            conductors: txn.open_table(CONDUCTORS).map_err(storage)?,
            net_counters: txn.open_table(NET_COUNTERS).map_err(storage)?,
        })
    }
}

impl Tables for RedbTables<'_> {
    fn net(&self, id: &NetId) -> Result<Option<Net>, WirelistError> {
        match self
            .nets
            .get((id.unit.as_str(), id.num))
            .map_err(storage)?
        {
            Some(data) => {
                let record: NetRecord = decode(data.value())?;
                Ok(Some(Net {
                    id: id.clone(),
                    sig_desc: record.sig_desc,
                }))
            }
            None => Ok(None),
        }
    }

    fn insert_net(&mut self, net: &Net) -> Result<(), WirelistError> {
        let bytes = encode(&NetRecord {
            sig_desc: net.sig_desc.clone(),
        })?;
        self.nets
            .insert((net.id.unit.as_str(), net.id.num), bytes.as_slice())
            .map_err(storage)?;
        Ok(())
    }

    fn remove_net(&mut self, id: &NetId) -> Result<bool, WirelistError> {
        Ok(self
            .nets
            .remove((id.unit.as_str(), id.num))
            .map_err(storage)?
            .is_some())
    }

    fn nets(&self) -> Result<Vec<Net>, WirelistError> {
        collect_nets(self.nets.iter().map_err(storage)?)
    }

    fn nets_of_unit(&self, unit: &str) -> Result<Vec<Net>, WirelistError> {
        collect_nets(
            self.nets
                .range((unit, i64::MIN)..=(unit, i64::MAX))
                .map_err(storage)?,
        )
    }

    fn pin(&self, key: &PinKey) -> Result<Option<Pin>, WirelistError> {
        match self
            .pins
            .get((
                key.net.unit.as_str(),
                key.net.num,
                key.conn.as_str(),
                key.desig.as_str(),
            ))
            .map_err(storage)?
        {
            Some(data) => {
                let record: PinRecord = decode(data.value())?;
                Ok(Some(Pin {
                    key: key.clone(),
                    sig_desc: record.sig_desc,
                }))
            }
            None => Ok(None),
        }
    }

    fn insert_pin(&mut self, pin: &Pin) -> Result<(), WirelistError> {
        let bytes = encode(&PinRecord {
            sig_desc: pin.sig_desc.clone(),
        })?;
        let key = &pin.key;
        self.pins
            .insert(
                (
                    key.net.unit.as_str(),
                    key.net.num,
                    key.conn.as_str(),
                    key.desig.as_str(),
                ),
                bytes.as_slice(),
            )
            .map_err(storage)?;
        Ok(())
    }

    fn remove_pin(&mut self, key: &PinKey) -> Result<bool, WirelistError> {
        Ok(self
            .pins
            .remove((
                key.net.unit.as_str(),
                key.net.num,
                key.conn.as_str(),
                key.desig.as_str(),
            ))
            .map_err(storage)?
            .is_some())
    }

    fn pins(&self) -> Result<Vec<Pin>, WirelistError> {
        collect_pins(self.pins.iter().map_err(storage)?, None)
    }

    fn pins_of_net(&self, net: &NetId) -> Result<Vec<Pin>, WirelistError> {
        collect_pins(
            self.pins
                .range((net.unit.as_str(), net.num, "", "")..)
                .map_err(storage)?,
            Some(net),
        )
    }

    fn conductor(&self, id: CdrId) -> Result<Option<Conductor>, WirelistError> {
        match self
            .conductors
            .get((id.cable, id.subcdr))
            .map_err(storage)?
        {
            Some(data) => {
                let record: ConductorRecord = decode(data.value())?;
                Ok(Some(conductor_from(id, record)))
            }
            None => Ok(None),
        }
    }

    fn insert_conductor(&mut self, conductor: &Conductor) -> Result<(), WirelistError> {
        let bytes = encode(&ConductorRecord {
            a_net_unit: conductor.a_net.unit.clone(),
            a_net_num: conductor.a_net.num,
            b_net_unit: conductor.b_net.unit.clone(),
            b_net_num: conductor.b_net.num,
            kind: conductor.kind.clone(),
        })?;
        self.conductors
            .insert((conductor.id.cable, conductor.id.subcdr), bytes.as_slice())
            .map_err(storage)?;
        Ok(())
    }

    fn remove_conductor(&mut self, id: CdrId) -> Result<bool, WirelistError> {
        Ok(self
            .conductors
            .remove((id.cable, id.subcdr))
            .map_err(storage)?
            .is_some())
    }

    fn conductors(&self) -> Result<Vec<Conductor>, WirelistError> {
        collect_conductors(self.conductors.iter().map_err(storage)?)
    }

    fn conductors_of_cable(&self, cable: u64) -> Result<Vec<Conductor>, WirelistError> {
        collect_conductors(
            self.conductors
                .range((cable, 0u64)..=(cable, u64::MAX))
                .map_err(storage)?,
        )
    }

    fn net_counter(&self, unit: &str) -> Result<i64, WirelistError> {
        Ok(self
            .net_counters
            .get(unit)
            .map_err(storage)?
            .map(|v| v.value())
            .unwrap_or(0))
    }

    fn set_net_counter(&mut self, unit: &str, value: i64) -> Result<(), WirelistError> {
        self.net_counters.insert(unit, value).map_err(storage)?;
        Ok(())
    }

    fn remove_net_counter(&mut self, unit: &str) -> Result<(), WirelistError> {
        self.net_counters.remove(unit).map_err(storage)?;
        Ok(())
    }

    fn net_counters(&self) -> Result<Vec<(String, i64)>, WirelistError> {
        collect_counters(self.net_counters.iter().map_err(storage)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn net(unit: &str, num: i64) -> Net {
        Net::new(NetId::new(unit, num))
    }

    #[test]
    fn rows_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let store = RedbStore::open(&db_path).expect("open db");
            store
                .write("seed", |t| {
                    t.insert_net(&net("U1", 1))?;
                    t.insert_pin(&Pin::new(PinKey::new(NetId::new("U1", 1), "J1", "3")))?;
                    t.set_net_counter("U1", 1)
                })
                .expect("write");
        }

        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            let snap = store.snapshot().expect("snapshot");
            assert_eq!(snap.net_count(), 1);
            assert_eq!(snap.pin_count(), 1);
            assert_eq!(snap.net_counter("U1").expect("counter"), 1);
        }
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let result: Result<(), WirelistError> = store.write("doomed", |t| {
            t.insert_net(&net("U1", 1))?;
            Err(WirelistError::Validation("stop".into()))
        });
        assert!(matches!(result, Err(WirelistError::Validation(_))));
        assert_eq!(store.snapshot().expect("snapshot").net_count(), 0);
    }

    #[test]
    fn pins_of_net_stops_at_next_net() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let pins = store
            .write("scan", |t| {
                for num in 1..=3 {
                    t.insert_net(&net("U1", num))?;
                    for desig in ["1", "2"] {
                        t.insert_pin(&Pin::new(PinKey::new(NetId::new("U1", num), "J1", desig)))?;
                    }
                }
                t.pins_of_net(&NetId::new("U1", 2))
            })
            .expect("write");

        assert_eq!(pins.len(), 2);
        assert!(pins.iter().all(|p| p.key.net.num == 2));
    }

    #[test]
    fn negative_numbers_sort_before_positive() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let nums = store
            .write("negatives", |t| {
                t.insert_net(&net("U1", 2))?;
                t.insert_net(&net("U1", -1))?;
                t.insert_net(&net("U2", 1))?;
                Ok(t
                    .nets_of_unit("U1")?
                    .into_iter()
                    .map(|n| n.id.num)
                    .collect::<Vec<_>>())
            })
            .expect("write");

        assert_eq!(nums, vec![-1, 2]);
    }

    #[test]
    fn conductor_round_trip_through_table() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let cdr = Conductor {
            id: CdrId::new(4, 2),
            a_net: NetId::new("U1", 1),
            b_net: NetId::new("U2", 7),
            kind: "SH".into(),
        };

        store
            .write("cdr", |t| t.insert_conductor(&cdr))
            .expect("write");
        let snap = store.snapshot().expect("snapshot");
        assert_eq!(snap.conductor(CdrId::new(4, 2)).expect("get"), Some(cdr));
        assert!(snap.conductors_of_cable(3).expect("scan").is_empty());
    }
}
