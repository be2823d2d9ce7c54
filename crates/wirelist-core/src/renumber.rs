//! # Renumber Engine
//!
//! Compacts the net numbers of one unit to 1..N, in natural order of the
//! pins each net carries.
//!
//! Numbers are primary key columns of nets, pins and conductors, so a
//! straight per-row update in sorted order would collide with nets not
//! yet moved. Instead every net first moves to the negative of its new
//! number (a key space no committed net uses), then every negative net
//! of the unit flips back to its absolute value.

use crate::dataset::Tables;
use crate::natural::{none_last, numeric_value};
use crate::{Net, NetId, Pin, PinKey, WirelistError};
use serde::Serialize;
use std::cmp::Ordering;

/// One entry of a renumbering: a net's number before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Renumbering {
    pub old: i64,
    pub new: i64,
}

/// Sort key of a net, taken from the minima over its pins.
#[derive(Debug)]
struct NetOrder {
    numeric_conn: Option<i64>,
    lexical_conn: Option<String>,
    numeric_desig: Option<i64>,
    lexical_desig: Option<String>,
    num: i64,
}

impl NetOrder {
    fn of(num: i64, pins: &[Pin]) -> Self {
        Self {
            numeric_conn: pins.iter().filter_map(|p| numeric_value(&p.key.conn)).min(),
            lexical_conn: pins.iter().map(|p| p.key.conn.clone()).min(),
            numeric_desig: pins.iter().filter_map(|p| numeric_value(&p.key.desig)).min(),
            lexical_desig: pins.iter().map(|p| p.key.desig.clone()).min(),
            num,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        none_last(&self.numeric_conn, &other.numeric_conn)
            .then_with(|| none_last(&self.lexical_conn, &other.lexical_conn))
            .then_with(|| none_last(&self.numeric_desig, &other.numeric_desig))
            .then_with(|| none_last(&self.lexical_desig, &other.lexical_desig))
            .then_with(|| self.num.cmp(&other.num))
    }
}

/// Bulk renumbering of the nets of a unit.
pub struct RenumberEngine;

impl RenumberEngine {
    /// Renumber the nets of `unit` to 1..N and return the mapping in new
    /// number order.
    ///
    /// The unit's net counter is reset to N, so the next new net gets N+1.
    pub fn renumber_nets<T: Tables + ?Sized>(
        tables: &mut T,
        unit: &str,
    ) -> Result<Vec<Renumbering>, WirelistError> {
        let mut order = Vec::new();
        for net in tables.nets_of_unit(unit)? {
            let pins = tables.pins_of_net(&net.id)?;
            order.push(NetOrder::of(net.id.num, &pins));
        }
        order.sort_by(NetOrder::compare);

        let mut mapping = Vec::with_capacity(order.len());
        for (index, entry) in order.iter().enumerate() {
            let new = i64::try_from(index)
                .map_err(|e| WirelistError::Validation(e.to_string()))?
                .saturating_add(1);
            mapping.push(Renumbering {
                old: entry.num,
                new,
            });
        }

        // Pass 1: every net to the negative of its new number.
        for step in &mapping {
            Self::move_net(tables, &NetId::new(unit, step.old), -step.new)?;
        }

        // Pass 2: back to positive.
        for net in tables.nets_of_unit(unit)? {
            if net.id.num < 0 {
                Self::move_net(tables, &net.id, net.id.num.saturating_neg())?;
            }
        }

        let count = i64::try_from(mapping.len())
            .map_err(|e| WirelistError::Validation(e.to_string()))?;
        tables.set_net_counter(unit, count)?;

        for step in mapping.iter().filter(|s| s.old != s.new) {
            tracing::debug!("N-{}.{} -> N-{}.{}", unit, step.old, unit, step.new);
        }
        tracing::info!("renumbered {} nets of unit {}", mapping.len(), unit);
        Ok(mapping)
    }

    /// Re-key a net and every pin and conductor endpoint referencing it.
    fn move_net<T: Tables + ?Sized>(
        tables: &mut T,
        from: &NetId,
        num: i64,
    ) -> Result<(), WirelistError> {
        let net = tables
            .net(from)?
            .ok_or_else(|| WirelistError::NetNotFound(from.clone()))?;
        let to = from.with_num(num);

        tables.remove_net(from)?;
        tables.insert_net(&Net {
            id: to.clone(),
            sig_desc: net.sig_desc,
        })?;

        for pin in tables.pins_of_net(from)? {
            tables.remove_pin(&pin.key)?;
            tables.insert_pin(&Pin {
                key: PinKey::new(to.clone(), pin.key.conn, pin.key.desig),
                sig_desc: pin.sig_desc,
            })?;
        }

        for mut conductor in tables.conductors_of_net(from)? {
            if conductor.a_net == *from {
                conductor.a_net = to.clone();
            }
            if conductor.b_net == *from {
                conductor.b_net = to.clone();
            }
            tables.insert_conductor(&conductor)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CdrId, Dataset, EntityStore, PinRef};

    fn net_of(ds: &mut Dataset, conn: &str, desig: &str) -> NetId {
        EntityStore::find_or_create_pin_net(ds, &PinRef::new("U1", conn, desig))
            .expect("net")
            .id
    }

    #[test]
    fn orders_by_natural_pin_names() {
        let mut ds = Dataset::new();
        net_of(&mut ds, "J2", "1"); // 1
        net_of(&mut ds, "10", "1"); // 2
        net_of(&mut ds, "2", "1"); // 3
        net_of(&mut ds, "J1", "5"); // 4

        let mapping = RenumberEngine::renumber_nets(&mut ds, "U1").expect("renumber");
        let olds: Vec<i64> = mapping.iter().map(|m| m.old).collect();
        assert_eq!(olds, vec![3, 2, 4, 1]);

        let conns: Vec<String> = ds
            .nets_of_unit("U1")
            .expect("nets")
            .iter()
            .map(|n| ds.pins_of_net(&n.id).expect("pins")[0].key.conn.clone())
            .collect();
        assert_eq!(conns, ["2", "10", "J1", "J2"]);
    }

    #[test]
    fn second_run_is_identity() {
        let mut ds = Dataset::new();
        for conn in ["B", "A", "3", "1"] {
            net_of(&mut ds, conn, "1");
        }
        RenumberEngine::renumber_nets(&mut ds, "U1").expect("first");
        let again = RenumberEngine::renumber_nets(&mut ds, "U1").expect("second");
        assert!(again.iter().all(|m| m.old == m.new));
    }

    #[test]
    fn conductor_endpoints_follow_their_nets() {
        let mut ds = Dataset::new();
        EntityStore::add_link(
            &mut ds,
            &PinRef::new("U1", "J9", "1"),
            &PinRef::new("U1", "J1", "1"),
            None,
        )
        .expect("link");

        RenumberEngine::renumber_nets(&mut ds, "U1").expect("renumber");
        let cdr = ds.conductor(CdrId::new(1, 1)).expect("get").expect("some");
        assert_eq!(cdr.a_net, NetId::new("U1", 2));
        assert_eq!(cdr.b_net, NetId::new("U1", 1));
        assert!(ds.nets().expect("nets").iter().all(|n| n.id.num > 0));
    }

    #[test]
    fn counter_resets_after_compaction() {
        let mut ds = Dataset::new();
        let first = net_of(&mut ds, "J1", "1");
        let second = net_of(&mut ds, "J1", "2");
        EntityStore::delete_net(&mut ds, &first).expect("delete");
        assert_eq!(second.num, 2);

        RenumberEngine::renumber_nets(&mut ds, "U1").expect("renumber");
        assert_eq!(net_of(&mut ds, "J1", "3").num, 2);
    }

    #[test]
    fn pinless_nets_sort_last() {
        let mut ds = Dataset::new();
        let empty = EntityStore::create_net(&mut ds, "U1").expect("net");
        net_of(&mut ds, "J1", "1");
        let mapping = RenumberEngine::renumber_nets(&mut ds, "U1").expect("renumber");
        assert_eq!(mapping.last().map(|m| m.old), Some(empty.id.num));
    }
}
