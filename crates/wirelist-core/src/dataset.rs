//! # Tables and the In-Memory Dataset
//!
//! The `Tables` trait is the row-level interface to the three persisted
//! relations (nets, pins, conductors) plus the per-unit net counters.
//! Every integrity rule of the store is written against it, so the same
//! logic runs over the in-memory `Dataset` and over a redb transaction.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::{CdrId, Conductor, Net, NetId, Pin, PinKey, WirelistError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// TABLES TRAIT
// =============================================================================

/// Row-level access to the interconnect relations.
///
/// Scans return rows in primary key order. `insert_*` overwrites an
/// existing row with the same key; `remove_*` reports whether a row was
/// present. Referential checks are the caller's job.
pub trait Tables {
    /// Get a net by identity.
    fn net(&self, id: &NetId) -> Result<Option<Net>, WirelistError>;

    /// Insert or overwrite a net row.
    fn insert_net(&mut self, net: &Net) -> Result<(), WirelistError>;

    /// Remove a net row.
    fn remove_net(&mut self, id: &NetId) -> Result<bool, WirelistError>;

    /// All nets, ordered by (unit, num).
    fn nets(&self) -> Result<Vec<Net>, WirelistError>;

    /// Nets of one unit, ordered by num.
    fn nets_of_unit(&self, unit: &str) -> Result<Vec<Net>, WirelistError>;

    /// Get a pin by key.
    fn pin(&self, key: &PinKey) -> Result<Option<Pin>, WirelistError>;

    /// Insert or overwrite a pin row.
    fn insert_pin(&mut self, pin: &Pin) -> Result<(), WirelistError>;

    /// Remove a pin row.
    fn remove_pin(&mut self, key: &PinKey) -> Result<bool, WirelistError>;

    /// All pins, ordered by (unit, num, conn, desig).
    fn pins(&self) -> Result<Vec<Pin>, WirelistError>;

    /// Pins owned by one net, ordered by (conn, desig).
    fn pins_of_net(&self, net: &NetId) -> Result<Vec<Pin>, WirelistError>;

    /// Get a conductor by identity.
    fn conductor(&self, id: CdrId) -> Result<Option<Conductor>, WirelistError>;

    /// Insert or overwrite a conductor row.
    fn insert_conductor(&mut self, conductor: &Conductor) -> Result<(), WirelistError>;

    /// Remove a conductor row.
    fn remove_conductor(&mut self, id: CdrId) -> Result<bool, WirelistError>;

    /// All conductors, ordered by (cable, subcdr).
    fn conductors(&self) -> Result<Vec<Conductor>, WirelistError>;

    /// Conductors of one cable, ordered by subcdr.
    fn conductors_of_cable(&self, cable: u64) -> Result<Vec<Conductor>, WirelistError>;

    /// Highest net number ever assigned in a unit (0 if none).
    fn net_counter(&self, unit: &str) -> Result<i64, WirelistError>;

    /// Record the highest net number assigned in a unit.
    fn set_net_counter(&mut self, unit: &str, value: i64) -> Result<(), WirelistError>;

    /// Remove the counter of a unit.
    fn remove_net_counter(&mut self, unit: &str) -> Result<(), WirelistError>;

    /// All unit counters, ordered by unit.
    fn net_counters(&self) -> Result<Vec<(String, i64)>, WirelistError>;

    /// Conductors with either endpoint on `net`, ordered by (cable, subcdr).
    fn conductors_of_net(&self, net: &NetId) -> Result<Vec<Conductor>, WirelistError> {
        Ok(self
            .conductors()?
            .into_iter()
            .filter(|c| c.touches(net))
            .collect())
    }

    /// Highest cable number in use (0 if none).
    fn max_cable(&self) -> Result<u64, WirelistError> {
        Ok(self
            .conductors()?
            .iter()
            .map(|c| c.id.cable)
            .max()
            .unwrap_or(0))
    }

    /// Remove every row of every relation.
    fn clear(&mut self) -> Result<(), WirelistError> {
        for conductor in self.conductors()? {
            self.remove_conductor(conductor.id)?;
        }
        for pin in self.pins()? {
            self.remove_pin(&pin.key)?;
        }
        for net in self.nets()? {
            self.remove_net(&net.id)?;
        }
        for (unit, _) in self.net_counters()? {
            self.remove_net_counter(&unit)?;
        }
        Ok(())
    }
}

// =============================================================================
// DATASET IMPLEMENTATION
// =============================================================================

/// In-memory copy of the whole interconnect.
///
/// Used as the volatile backend, as the read snapshot for queries and
/// reports, and as the export/import document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    nets: BTreeMap<NetId, Net>,
    pins: BTreeMap<PinKey, Pin>,
    conductors: BTreeMap<CdrId, Conductor>,
    net_counters: BTreeMap<String, i64>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nets.
    #[must_use]
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Number of pins.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Number of conductors.
    #[must_use]
    pub fn conductor_count(&self) -> usize {
        self.conductors.len()
    }

    /// Copy every row of another table set into a fresh dataset.
    pub fn load_from<T: Tables + ?Sized>(tables: &T) -> Result<Self, WirelistError> {
        let mut dataset = Self::new();
        for net in tables.nets()? {
            dataset.nets.insert(net.id.clone(), net);
        }
        for pin in tables.pins()? {
            dataset.pins.insert(pin.key.clone(), pin);
        }
        for conductor in tables.conductors()? {
            dataset.conductors.insert(conductor.id, conductor);
        }
        for (unit, value) in tables.net_counters()? {
            dataset.net_counters.insert(unit, value);
        }
        Ok(dataset)
    }

    /// Write every row of this dataset into `tables`, replacing what was there.
    pub fn store_into<T: Tables + ?Sized>(&self, tables: &mut T) -> Result<(), WirelistError> {
        tables.clear()?;
        for net in self.nets.values() {
            tables.insert_net(net)?;
        }
        for pin in self.pins.values() {
            tables.insert_pin(pin)?;
        }
        for conductor in self.conductors.values() {
            tables.insert_conductor(conductor)?;
        }
        for (unit, value) in &self.net_counters {
            tables.set_net_counter(unit, *value)?;
        }
        Ok(())
    }
}

impl Tables for Dataset {
    fn net(&self, id: &NetId) -> Result<Option<Net>, WirelistError> {
        Ok(self.nets.get(id).cloned())
    }

    fn insert_net(&mut self, net: &Net) -> Result<(), WirelistError> {
        self.nets.insert(net.id.clone(), net.clone());
        Ok(())
    }

    fn remove_net(&mut self, id: &NetId) -> Result<bool, WirelistError> {
        Ok(self.nets.remove(id).is_some())
    }

    fn nets(&self) -> Result<Vec<Net>, WirelistError> {
        Ok(self.nets.values().cloned().collect())
    }

    fn nets_of_unit(&self, unit: &str) -> Result<Vec<Net>, WirelistError> {
        Ok(self
            .nets
            .values()
            .filter(|n| n.id.unit == unit)
            .cloned()
            .collect())
    }

    fn pin(&self, key: &PinKey) -> Result<Option<Pin>, WirelistError> {
        Ok(self.pins.get(key).cloned())
    }

    fn insert_pin(&mut self, pin: &Pin) -> Result<(), WirelistError> {
        self.pins.insert(pin.key.clone(), pin.clone());
        Ok(())
    }

    fn remove_pin(&mut self, key: &PinKey) -> Result<bool, WirelistError> {
        Ok(self.pins.remove(key).is_some())
    }

    fn pins(&self) -> Result<Vec<Pin>, WirelistError> {
        Ok(self.pins.values().cloned().collect())
    }

    fn pins_of_net(&self, net: &NetId) -> Result<Vec<Pin>, WirelistError> {
        Ok(self
            .pins
            .values()
            .filter(|p| p.key.net == *net)
            .cloned()
            .collect())
    }

    fn conductor(&self, id: CdrId) -> Result<Option<Conductor>, WirelistError> {
        Ok(self.conductors.get(&id).cloned())
    }

    fn insert_conductor(&mut self, conductor: &Conductor) -> Result<(), WirelistError> {
        self.conductors.insert(conductor.id, conductor.clone());
        Ok(())
    }

    fn remove_conductor(&mut self, id: CdrId) -> Result<bool, WirelistError> {
        Ok(self.conductors.remove(&id).is_some())
    }

    fn conductors(&self) -> Result<Vec<Conductor>, WirelistError> {
        Ok(self.conductors.values().cloned().collect())
    }

    fn conductors_of_cable(&self, cable: u64) -> Result<Vec<Conductor>, WirelistError> {
        Ok(self
            .conductors
            .range(CdrId::new(cable, 0)..=CdrId::new(cable, u64::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn net_counter(&self, unit: &str) -> Result<i64, WirelistError> {
        Ok(self.net_counters.get(unit).copied().unwrap_or(0))
    }

    fn set_net_counter(&mut self, unit: &str, value: i64) -> Result<(), WirelistError> {
        self.net_counters.insert(unit.to_string(), value);
        Ok(())
    }

    fn remove_net_counter(&mut self, unit: &str) -> Result<(), WirelistError> {
        self.net_counters.remove(unit);
        Ok(())
    }

    fn net_counters(&self) -> Result<Vec<(String, i64)>, WirelistError> {
        Ok(self
            .net_counters
            .iter()
            .map(|(unit, value)| (unit.clone(), *value))
            .collect())
    }
}

// =============================================================================
// SERIALIZABLE DATASET
// =============================================================================

/// Flat, serde-friendly form of a `Dataset` (row lists instead of maps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableDataset {
    pub nets: Vec<Net>,
    pub pins: Vec<Pin>,
    pub conductors: Vec<Conductor>,
    #[serde(default)]
    pub net_counters: Vec<(String, i64)>,
}

impl From<&Dataset> for SerializableDataset {
    fn from(dataset: &Dataset) -> Self {
        Self {
            nets: dataset.nets.values().cloned().collect(),
            pins: dataset.pins.values().cloned().collect(),
            conductors: dataset.conductors.values().cloned().collect(),
            net_counters: dataset
                .net_counters
                .iter()
                .map(|(unit, value)| (unit.clone(), *value))
                .collect(),
        }
    }
}

impl TryFrom<SerializableDataset> for Dataset {
    type Error = WirelistError;

    /// Rebuild a dataset, rejecting rows that break key uniqueness or
    /// reference a missing net.
    fn try_from(flat: SerializableDataset) -> Result<Self, Self::Error> {
        let mut dataset = Self::new();

        for net in flat.nets {
            if net.id.num < 1 {
                return Err(WirelistError::Validation(format!(
                    "net {} has a non-positive number",
                    net.id
                )));
            }
            if dataset.nets.insert(net.id.clone(), net).is_some() {
                return Err(WirelistError::Validation(
                    "duplicate net in import".to_string(),
                ));
            }
        }

        for pin in flat.pins {
            if !dataset.nets.contains_key(pin.net()) {
                return Err(WirelistError::NetNotFound(pin.key.net));
            }
            if dataset.pins.contains_key(&pin.key) {
                return Err(WirelistError::DuplicatePin(pin.key));
            }
            dataset.pins.insert(pin.key.clone(), pin);
        }

        for conductor in flat.conductors {
            for end in [&conductor.a_net, &conductor.b_net] {
                if !dataset.nets.contains_key(end) {
                    return Err(WirelistError::NetNotFound(end.clone()));
                }
            }
            if dataset.conductors.contains_key(&conductor.id) {
                return Err(WirelistError::DuplicateConductor(conductor.id));
            }
            dataset.conductors.insert(conductor.id, conductor);
        }

        for (unit, value) in flat.net_counters {
            dataset.net_counters.insert(unit, value);
        }
        // A counter never lags behind the numbers actually in use.
        for id in dataset.nets.keys() {
            let counter = dataset.net_counters.entry(id.unit.clone()).or_insert(0);
            *counter = (*counter).max(id.num);
        }

        Ok(dataset)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        let n1 = NetId::new("U1", 1);
        let n2 = NetId::new("U2", 1);
        ds.insert_net(&Net::new(n1.clone())).expect("net");
        ds.insert_net(&Net::new(n2.clone())).expect("net");
        ds.insert_pin(&Pin::new(PinKey::new(n1.clone(), "J1", "1")))
            .expect("pin");
        ds.insert_pin(&Pin::new(PinKey::new(n2.clone(), "J1", "1")))
            .expect("pin");
        ds.insert_conductor(&Conductor {
            id: CdrId::new(1, 1),
            a_net: n1,
            b_net: n2,
            kind: "C".into(),
        })
        .expect("cdr");
        ds.set_net_counter("U1", 1).expect("counter");
        ds.set_net_counter("U2", 1).expect("counter");
        ds
    }

    #[test]
    fn conductors_of_cable_uses_range() {
        let mut ds = sample();
        let mut extra = ds.conductor(CdrId::new(1, 1)).expect("get").expect("some");
        extra.id = CdrId::new(2, 1);
        ds.insert_conductor(&extra).expect("insert");

        let cable1 = ds.conductors_of_cable(1).expect("scan");
        assert_eq!(cable1.len(), 1);
        assert_eq!(ds.max_cable().expect("max"), 2);
    }

    #[test]
    fn conductors_of_net_matches_either_end() {
        let ds = sample();
        assert_eq!(
            ds.conductors_of_net(&NetId::new("U2", 1))
                .expect("scan")
                .len(),
            1
        );
        assert!(
            ds.conductors_of_net(&NetId::new("U3", 1))
                .expect("scan")
                .is_empty()
        );
    }

    #[test]
    fn clear_removes_everything() {
        let mut ds = sample();
        ds.clear().expect("clear");
        assert_eq!(ds, Dataset::new());
    }

    #[test]
    fn serializable_round_trip_preserves_rows() {
        let ds = sample();
        let flat = SerializableDataset::from(&ds);
        let back = Dataset::try_from(flat).expect("rebuild");
        assert_eq!(back, ds);
    }

    #[test]
    fn import_rejects_dangling_pin() {
        let mut flat = SerializableDataset::from(&sample());
        flat.pins
            .push(Pin::new(PinKey::new(NetId::new("U9", 4), "J1", "1")));
        assert!(matches!(
            Dataset::try_from(flat),
            Err(WirelistError::NetNotFound(_))
        ));
    }

    #[test]
    fn import_raises_lagging_counters() {
        let mut flat = SerializableDataset::from(&sample());
        flat.net_counters.clear();
        let ds = Dataset::try_from(flat).expect("rebuild");
        assert_eq!(ds.net_counter("U1").expect("counter"), 1);
    }
}
