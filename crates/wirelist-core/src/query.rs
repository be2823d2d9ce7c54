//! # Query Engine
//!
//! Read-only projections of the interconnect used by the reports and by
//! display-id addressing.
//!
//! The view filter is an explicit value passed to every query; nothing
//! here keeps state between calls.

use crate::dataset::Tables;
use crate::natural::NameKey;
use crate::{Conductor, Net, NetId, Pin, PinCid, PinKey, WirelistError};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// VIEW FILTER
// =============================================================================

/// Which part of the interconnect the reports show.
///
/// `units: None` shows every unit. With `link` on, only conductors whose
/// two endpoints both lie in admitted units are considered, and the pin
/// report keeps only nets carrying such a conductor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    pub units: Option<BTreeSet<String>>,
    pub link: bool,
}

impl ViewFilter {
    /// A filter showing everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter restricted to the given units.
    #[must_use]
    pub fn with_units<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::new();
        filter.set_units(units);
        filter
    }

    /// Replace the unit filter.
    pub fn set_units<I, S>(&mut self, units: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units = normalize(units.into_iter().map(Into::into).collect());
    }

    /// Admit additional units.
    pub fn add_units<I, S>(&mut self, units: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut current = self.units.take().unwrap_or_default();
        current.extend(units.into_iter().map(Into::into));
        self.units = normalize(current);
    }

    /// Stop admitting some units. Without a unit filter, starts from
    /// `known` (every unit in the store).
    pub fn remove_units<I, S>(&mut self, units: I, known: Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut current = self
            .units
            .take()
            .unwrap_or_else(|| known.into_iter().collect());
        for unit in units {
            current.remove(&unit.into());
        }
        self.units = normalize(current);
    }

    /// Show every unit again.
    pub fn clear_units(&mut self) {
        self.units = None;
    }

    /// Flip the link filter and return its new state.
    pub fn toggle_link(&mut self) -> bool {
        self.link = !self.link;
        self.link
    }

    /// Whether `unit` passes the unit filter.
    #[must_use]
    pub fn admits(&self, unit: &str) -> bool {
        self.units.as_ref().is_none_or(|units| units.contains(unit))
    }

    /// Whether a conductor between these units passes the filter: both
    /// ends with the link filter on, either end otherwise.
    #[must_use]
    pub fn admits_link(&self, a_unit: &str, b_unit: &str) -> bool {
        if self.link {
            self.admits(a_unit) && self.admits(b_unit)
        } else {
            self.admits(a_unit) || self.admits(b_unit)
        }
    }
}

// An empty unit set filters nothing.
fn normalize(units: BTreeSet<String>) -> Option<BTreeSet<String>> {
    if units.is_empty() { None } else { Some(units) }
}

// =============================================================================
// ROWS
// =============================================================================

/// One row of the pin projection: a pin joined to its net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinRow {
    pub pin: Pin,
    pub net: Net,
}

/// One row of the conductor projection: a conductor joined to one
/// representative pin of each endpoint net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConductorRow {
    pub conductor: Conductor,
    pub a_pin: Pin,
    pub b_pin: Pin,
}

fn pin_order(a: &Pin, b: &Pin) -> std::cmp::Ordering {
    (NameKey::of(&a.key.conn), NameKey::of(&a.key.desig))
        .cmp(&(NameKey::of(&b.key.conn), NameKey::of(&b.key.desig)))
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// Read-only projections over any `Tables` implementation.
pub struct QueryEngine;

impl QueryEngine {
    /// Every pin joined to its net, ordered by (unit, num, conn, desig).
    pub fn pin_rows<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
    ) -> Result<Vec<PinRow>, WirelistError> {
        let nets: BTreeMap<NetId, Net> = tables
            .nets()?
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();

        let linked: Option<BTreeSet<NetId>> = if filter.link {
            let mut linked = BTreeSet::new();
            for c in tables.conductors()? {
                if filter.admits_link(&c.a_net.unit, &c.b_net.unit) {
                    linked.insert(c.a_net);
                    linked.insert(c.b_net);
                }
            }
            Some(linked)
        } else {
            None
        };

        let mut rows = Vec::new();
        for pin in tables.pins()? {
            let shown = match &linked {
                Some(linked) => linked.contains(pin.net()),
                None => filter.admits(&pin.key.net.unit),
            };
            if !shown {
                continue;
            }
            let net = nets
                .get(pin.net())
                .cloned()
                .ok_or_else(|| WirelistError::NetNotFound(pin.key.net.clone()))?;
            rows.push(PinRow { pin, net });
        }
        Ok(rows)
    }

    /// Every conductor joined to the least pin (by natural conn, desig)
    /// of each endpoint net.
    ///
    /// Conductors with an endpoint net that has no pins are omitted.
    /// Ordered by a-side (unit, conn, desig), then b-side, then id.
    pub fn conductor_rows<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
    ) -> Result<Vec<ConductorRow>, WirelistError> {
        let mut representative: BTreeMap<NetId, Pin> = BTreeMap::new();
        for pin in tables.pins()? {
            match representative.entry(pin.key.net.clone()) {
                Entry::Vacant(v) => {
                    v.insert(pin);
                }
                Entry::Occupied(mut o) => {
                    if pin_order(&pin, o.get()).is_lt() {
                        o.insert(pin);
                    }
                }
            }
        }

        let mut rows = Vec::new();
        for conductor in tables.conductors()? {
            if !filter.admits_link(&conductor.a_net.unit, &conductor.b_net.unit) {
                continue;
            }
            let (Some(a_pin), Some(b_pin)) = (
                representative.get(&conductor.a_net),
                representative.get(&conductor.b_net),
            ) else {
                tracing::debug!("{} has an endpoint without pins", conductor);
                continue;
            };
            rows.push(ConductorRow {
                a_pin: a_pin.clone(),
                b_pin: b_pin.clone(),
                conductor,
            });
        }

        rows.sort_by(|x, y| {
            x.a_pin
                .key
                .net
                .unit
                .cmp(&y.a_pin.key.net.unit)
                .then_with(|| pin_order(&x.a_pin, &y.a_pin))
                .then_with(|| x.b_pin.key.net.unit.cmp(&y.b_pin.key.net.unit))
                .then_with(|| pin_order(&x.b_pin, &y.b_pin))
                .then_with(|| x.conductor.id.cmp(&y.conductor.id))
        });
        Ok(rows)
    }

    /// Resolve a display id to the key of the pin it shows under `filter`.
    pub fn pin_at<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
        id: PinCid,
    ) -> Result<PinKey, WirelistError> {
        let rows = Self::pin_rows(tables, filter)?;
        let count = rows.len();
        rows.into_iter()
            .nth(id.0)
            .map(|row| row.pin.key)
            .ok_or(WirelistError::DisplayIdOutOfRange {
                id: id.0,
                rows: count,
            })
    }

    /// Distinct unit names, ordered.
    pub fn units<T: Tables + ?Sized>(tables: &T) -> Result<Vec<String>, WirelistError> {
        let units: BTreeSet<String> = tables.nets()?.into_iter().map(|n| n.id.unit).collect();
        Ok(units.into_iter().collect())
    }

    /// Distinct connector names used by the pins of a unit, ordered.
    pub fn connectors<T: Tables + ?Sized>(
        tables: &T,
        unit: &str,
    ) -> Result<Vec<String>, WirelistError> {
        let mut connectors = BTreeSet::new();
        for net in tables.nets_of_unit(unit)? {
            for pin in tables.pins_of_net(&net.id)? {
                connectors.insert(pin.key.conn);
            }
        }
        Ok(connectors.into_iter().collect())
    }

    /// Conductors attached to a net, ordered by (cable, subcdr).
    pub fn linked_conductors<T: Tables + ?Sized>(
        tables: &T,
        net: &NetId,
    ) -> Result<Vec<Conductor>, WirelistError> {
        if tables.net(net)?.is_none() {
            return Err(WirelistError::NetNotFound(net.clone()));
        }
        tables.conductors_of_net(net)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, EntityStore, PinRef};

    fn link(ds: &mut Dataset, a: (&str, &str, &str), b: (&str, &str, &str)) {
        EntityStore::add_link(
            ds,
            &PinRef::new(a.0, a.1, a.2),
            &PinRef::new(b.0, b.1, b.2),
            None,
        )
        .expect("link");
    }

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        link(&mut ds, ("A", "J1", "2"), ("B", "P1", "1"));
        link(&mut ds, ("A", "J1", "10"), ("C", "P1", "1"));
        link(&mut ds, ("B", "P2", "1"), ("C", "P2", "1"));
        ds
    }

    #[test]
    fn pin_rows_follow_key_order() {
        let ds = sample();
        let rows = QueryEngine::pin_rows(&ds, &ViewFilter::new()).expect("rows");
        let units: Vec<&str> = rows.iter().map(|r| r.net.id.unit.as_str()).collect();
        assert_eq!(units, ["A", "A", "B", "B", "C", "C"]);
    }

    #[test]
    fn unit_filter_restricts_pin_rows() {
        let ds = sample();
        let rows = QueryEngine::pin_rows(&ds, &ViewFilter::with_units(["B"])).expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.net.id.unit == "B"));
    }

    #[test]
    fn link_filter_needs_both_ends_admitted() {
        let ds = sample();
        let mut filter = ViewFilter::with_units(["A", "B"]);
        filter.toggle_link();

        let pins = QueryEngine::pin_rows(&ds, &filter).expect("rows");
        let shown: Vec<String> = pins.iter().map(|r| r.pin.key.pin_ref().to_string()).collect();
        assert_eq!(shown, ["A/J1/2", "B/P1/1"]);

        let cdrs = QueryEngine::conductor_rows(&ds, &filter).expect("rows");
        assert_eq!(cdrs.len(), 1);
    }

    #[test]
    fn conductor_rows_or_semantics_without_link() {
        let ds = sample();
        let rows = QueryEngine::conductor_rows(&ds, &ViewFilter::with_units(["C"])).expect("rows");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn conductor_rows_sort_numeric_desig_first() {
        let ds = sample();
        let rows = QueryEngine::conductor_rows(&ds, &ViewFilter::new()).expect("rows");
        let a_desigs: Vec<&str> = rows.iter().map(|r| r.a_pin.key.desig.as_str()).collect();
        // "2" before "10" on unit A, then unit B.
        assert_eq!(a_desigs, ["2", "10", "1"]);
    }

    #[test]
    fn representative_pin_is_least() {
        let mut ds = sample();
        EntityStore::add_pin_to_net(&mut ds, &PinRef::new("A", "J0", "5"), 1).expect("pin");
        let rows = QueryEngine::conductor_rows(&ds, &ViewFilter::new()).expect("rows");
        assert_eq!(rows[0].a_pin.key.conn, "J0");
    }

    #[test]
    fn pin_at_out_of_range() {
        let ds = sample();
        let key = QueryEngine::pin_at(&ds, &ViewFilter::new(), PinCid(2)).expect("pin");
        assert_eq!(key.net.unit, "B");
        assert!(matches!(
            QueryEngine::pin_at(&ds, &ViewFilter::new(), PinCid(6)),
            Err(WirelistError::DisplayIdOutOfRange { id: 6, rows: 6 })
        ));
    }

    #[test]
    fn filter_editing() {
        let mut filter = ViewFilter::new();
        filter.add_units(["A"]);
        filter.add_units(["B"]);
        assert!(filter.admits("B") && !filter.admits("C"));

        filter.clear_units();
        filter.remove_units(["A"], vec!["A".into(), "B".into(), "C".into()]);
        assert!(!filter.admits("A") && filter.admits("C"));

        filter.remove_units(["B", "C"], Vec::new());
        assert_eq!(filter.units, None);
    }

    #[test]
    fn units_and_connectors() {
        let ds = sample();
        assert_eq!(QueryEngine::units(&ds).expect("units"), ["A", "B", "C"]);
        assert_eq!(QueryEngine::connectors(&ds, "B").expect("conns"), ["P1", "P2"]);
    }
}
