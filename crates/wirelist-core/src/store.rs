//! # Entity Store
//!
//! Identity assignment and referential integrity of the interconnect.
//!
//! Every function here runs against one open `Tables` transaction and
//! leaves it consistent when it returns `Ok`:
//! - Net numbers are unique per unit and never handed out twice
//! - Subconductor ids of a cable stay contiguous (1..N) across deletes
//! - No pin or conductor ever references a missing net
//!
//! Callers commit or roll back the surrounding transaction; see
//! `Interconnect` for the one-transaction-per-operation wrapper.

use crate::dataset::Tables;
use crate::primitives::ORDINARY_KIND;
use crate::validate::Validator;
use crate::{CdrId, Conductor, Net, NetId, Pin, PinKey, PinRef, WirelistError};
use serde::Serialize;

/// Row counts removed by a net deletion cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NetRemoval {
    pub conductors: usize,
    pub pins: usize,
}

/// Integrity-preserving mutations of the interconnect relations.
pub struct EntityStore;

impl EntityStore {
    // =========================================================================
    // NETS
    // =========================================================================

    /// Reserve the next net number of `unit`.
    ///
    /// The number is one above both the highest number in use and the
    /// highest number ever handed out, so deleted numbers are not reused.
    pub fn assign_net_number<T: Tables + ?Sized>(
        tables: &mut T,
        unit: &str,
    ) -> Result<i64, WirelistError> {
        let in_use = tables
            .nets_of_unit(unit)?
            .iter()
            .map(|n| n.id.num)
            .max()
            .unwrap_or(0);
        let next = in_use.max(tables.net_counter(unit)?).saturating_add(1);
        tables.set_net_counter(unit, next)?;
        tracing::debug!("assigned net number {} in unit {}", next, unit);
        Ok(next)
    }

    /// Create an empty net with a freshly assigned number.
    pub fn create_net<T: Tables + ?Sized>(
        tables: &mut T,
        unit: &str,
    ) -> Result<Net, WirelistError> {
        Validator::name("unit", unit)?;
        let num = Self::assign_net_number(tables, unit)?;
        let net = Net::new(NetId::new(unit, num));
        tables.insert_net(&net)?;
        Ok(net)
    }

    /// Delete a net together with every conductor that references it and
    /// every pin it owns, in that order.
    pub fn delete_net<T: Tables + ?Sized>(
        tables: &mut T,
        id: &NetId,
    ) -> Result<NetRemoval, WirelistError> {
        if tables.net(id)?.is_none() {
            return Err(WirelistError::NetNotFound(id.clone()));
        }

        let mut removal = NetRemoval::default();

        // Each delete shifts the subconductors of its cable, so re-read.
        while let Some(conductor) = tables.conductors_of_net(id)?.into_iter().next() {
            Self::delete_conductor(tables, conductor.id)?;
            removal.conductors += 1;
        }

        for pin in tables.pins_of_net(id)? {
            tables.remove_pin(&pin.key)?;
            removal.pins += 1;
        }

        tables.remove_net(id)?;
        tracing::debug!(
            "deleted {} with {} conductors and {} pins",
            id,
            removal.conductors,
            removal.pins
        );
        Ok(removal)
    }

    /// Set or clear the signal description of a net.
    pub fn describe_net<T: Tables + ?Sized>(
        tables: &mut T,
        id: &NetId,
        sig_desc: Option<&str>,
    ) -> Result<Net, WirelistError> {
        if let Some(text) = sig_desc {
            Validator::sig_desc(text)?;
        }
        let mut net = tables
            .net(id)?
            .ok_or_else(|| WirelistError::NetNotFound(id.clone()))?;
        net.sig_desc = sig_desc.map(str::to_string);
        tables.insert_net(&net)?;
        Ok(net)
    }

    // =========================================================================
    // PINS
    // =========================================================================

    /// Find the pin at a physical address, whichever net owns it.
    ///
    /// When several nets of the unit carry the same (conn, desig), the
    /// lowest-numbered net wins.
    pub fn find_pin<T: Tables + ?Sized>(
        tables: &T,
        pin: &PinRef,
    ) -> Result<Option<Pin>, WirelistError> {
        for net in tables.nets_of_unit(&pin.unit)? {
            let key = PinKey::new(net.id, &pin.conn, &pin.desig);
            if let Some(found) = tables.pin(&key)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Return the net owning the pin at `pin`, creating both the net and
    /// the pin when no pin exists there.
    pub fn find_or_create_pin_net<T: Tables + ?Sized>(
        tables: &mut T,
        pin: &PinRef,
    ) -> Result<Net, WirelistError> {
        Validator::pin_ref(pin)?;

        if let Some(existing) = Self::find_pin(tables, pin)? {
            let id = existing.key.net;
            tracing::debug!("pin {} exists on net {}", pin, id);
            return tables.net(&id)?.ok_or(WirelistError::NetNotFound(id));
        }

        let net = Self::create_net(tables, &pin.unit)?;
        tables.insert_pin(&Pin::new(PinKey::new(
            net.id.clone(),
            &pin.conn,
            &pin.desig,
        )))?;
        tracing::debug!("created pin {} on net {}", pin, net.id);
        Ok(net)
    }

    /// Add a pin at `pin` to the existing net `(pin.unit, net_num)`.
    pub fn add_pin_to_net<T: Tables + ?Sized>(
        tables: &mut T,
        pin: &PinRef,
        net_num: i64,
    ) -> Result<Pin, WirelistError> {
        Validator::pin_ref(pin)?;
        let net = NetId::new(&pin.unit, net_num);
        if tables.net(&net)?.is_none() {
            return Err(WirelistError::NetNotFound(net));
        }

        let key = PinKey::new(net, &pin.conn, &pin.desig);
        if tables.pin(&key)?.is_some() {
            return Err(WirelistError::DuplicatePin(key));
        }

        let new_pin = Pin::new(key);
        tables.insert_pin(&new_pin)?;
        Ok(new_pin)
    }

    /// Delete one pin. The owning net stays, even when it is left empty.
    pub fn delete_pin<T: Tables + ?Sized>(
        tables: &mut T,
        key: &PinKey,
    ) -> Result<Pin, WirelistError> {
        let pin = tables
            .pin(key)?
            .ok_or_else(|| WirelistError::PinNotFound(key.clone()))?;
        tables.remove_pin(key)?;
        Ok(pin)
    }

    /// Move a pin to a new (conn, desig) on the same net.
    pub fn rename_pin<T: Tables + ?Sized>(
        tables: &mut T,
        key: &PinKey,
        conn: &str,
        desig: &str,
    ) -> Result<Pin, WirelistError> {
        Validator::name("connector", conn)?;
        Validator::name("designator", desig)?;

        let pin = tables
            .pin(key)?
            .ok_or_else(|| WirelistError::PinNotFound(key.clone()))?;

        let new_key = PinKey::new(key.net.clone(), conn, desig);
        if new_key == *key {
            return Ok(pin);
        }
        if tables.pin(&new_key)?.is_some() {
            return Err(WirelistError::DuplicatePin(new_key));
        }

        let renamed = Pin {
            key: new_key,
            sig_desc: pin.sig_desc,
        };
        tables.remove_pin(key)?;
        tables.insert_pin(&renamed)?;
        Ok(renamed)
    }

    /// Set or clear the signal description of a pin.
    pub fn describe_pin<T: Tables + ?Sized>(
        tables: &mut T,
        key: &PinKey,
        sig_desc: Option<&str>,
    ) -> Result<Pin, WirelistError> {
        if let Some(text) = sig_desc {
            Validator::sig_desc(text)?;
        }
        let mut pin = tables
            .pin(key)?
            .ok_or_else(|| WirelistError::PinNotFound(key.clone()))?;
        pin.sig_desc = sig_desc.map(str::to_string);
        tables.insert_pin(&pin)?;
        Ok(pin)
    }

    // =========================================================================
    // CONDUCTORS
    // =========================================================================

    /// Link two existing nets with a new conductor.
    ///
    /// Without `cable` a new cable is opened one above the highest in
    /// use. The subconductor is always one above the highest in the cable.
    pub fn add_conductor<T: Tables + ?Sized>(
        tables: &mut T,
        a_net: &NetId,
        b_net: &NetId,
        kind: &str,
        cable: Option<u64>,
    ) -> Result<Conductor, WirelistError> {
        Validator::name("kind", kind)?;
        for end in [a_net, b_net] {
            if tables.net(end)?.is_none() {
                return Err(WirelistError::NetNotFound(end.clone()));
            }
        }
        if a_net == b_net {
            return Err(WirelistError::Validation(format!(
                "conductor would link {a_net} to itself"
            )));
        }

        let cable = match cable {
            Some(cable) => {
                Validator::cable(cable)?;
                cable
            }
            None => tables.max_cable()?.saturating_add(1),
        };
        let subcdr = tables
            .conductors_of_cable(cable)?
            .iter()
            .map(|c| c.id.subcdr)
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        let conductor = Conductor {
            id: CdrId::new(cable, subcdr),
            a_net: a_net.clone(),
            b_net: b_net.clone(),
            kind: kind.to_string(),
        };
        tables.insert_conductor(&conductor)?;
        tracing::debug!("added {} between {} and {}", conductor, a_net, b_net);
        Ok(conductor)
    }

    /// Link the nets of two pin addresses, creating pins and nets as needed.
    pub fn add_link<T: Tables + ?Sized>(
        tables: &mut T,
        a: &PinRef,
        b: &PinRef,
        cable: Option<u64>,
    ) -> Result<Conductor, WirelistError> {
        let a_net = Self::find_or_create_pin_net(tables, a)?;
        let b_net = Self::find_or_create_pin_net(tables, b)?;
        Self::add_conductor(tables, &a_net.id, &b_net.id, ORDINARY_KIND, cable)
    }

    /// Delete a conductor and close the gap it leaves in its cable.
    pub fn delete_conductor<T: Tables + ?Sized>(
        tables: &mut T,
        id: CdrId,
    ) -> Result<Conductor, WirelistError> {
        let removed = tables
            .conductor(id)?
            .ok_or(WirelistError::ConductorNotFound(id))?;
        tables.remove_conductor(id)?;

        // Ascending order: each slot below has just been vacated.
        for mut conductor in tables.conductors_of_cable(id.cable)? {
            if conductor.id.subcdr <= id.subcdr {
                continue;
            }
            tables.remove_conductor(conductor.id)?;
            conductor.id.subcdr -= 1;
            tables.insert_conductor(&conductor)?;
        }

        tracing::debug!("deleted {}", removed);
        Ok(removed)
    }

    /// Change the kind tag of a conductor.
    pub fn set_conductor_kind<T: Tables + ?Sized>(
        tables: &mut T,
        id: CdrId,
        kind: &str,
    ) -> Result<Conductor, WirelistError> {
        Validator::name("kind", kind)?;
        let mut conductor = tables
            .conductor(id)?
            .ok_or(WirelistError::ConductorNotFound(id))?;
        conductor.kind = kind.to_string();
        tables.insert_conductor(&conductor)?;
        Ok(conductor)
    }

    /// Move a conductor to another subconductor id of its cable.
    ///
    /// Neighbours are not renumbered, so the cable may be left with a
    /// gap; subconductor 0 is allowed for shields and drains.
    pub fn set_conductor_subid<T: Tables + ?Sized>(
        tables: &mut T,
        id: CdrId,
        new_subcdr: u64,
    ) -> Result<Conductor, WirelistError> {
        let mut conductor = tables
            .conductor(id)?
            .ok_or(WirelistError::ConductorNotFound(id))?;
        if new_subcdr == id.subcdr {
            return Ok(conductor);
        }

        let target = CdrId::new(id.cable, new_subcdr);
        if tables.conductor(target)?.is_some() {
            return Err(WirelistError::DuplicateConductor(target));
        }

        tables.remove_conductor(id)?;
        conductor.id = target;
        tables.insert_conductor(&conductor)?;
        Ok(conductor)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dataset;

    fn pin(unit: &str, conn: &str, desig: &str) -> PinRef {
        PinRef::new(unit, conn, desig)
    }

    fn subcdrs(ds: &Dataset, cable: u64) -> Vec<u64> {
        ds.conductors_of_cable(cable)
            .expect("scan")
            .iter()
            .map(|c| c.id.subcdr)
            .collect()
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let mut ds = Dataset::new();
        let first = EntityStore::find_or_create_pin_net(&mut ds, &pin("U1", "J1", "1"))
            .expect("create");
        let again = EntityStore::find_or_create_pin_net(&mut ds, &pin("U1", "J1", "1"))
            .expect("find");
        assert_eq!(first.id, NetId::new("U1", 1));
        assert_eq!(again, first);
        assert_eq!(ds.net_count(), 1);
        assert_eq!(ds.pin_count(), 1);
    }

    #[test]
    fn net_numbers_are_not_reused() {
        let mut ds = Dataset::new();
        let n1 = EntityStore::create_net(&mut ds, "U1").expect("net");
        let n2 = EntityStore::create_net(&mut ds, "U1").expect("net");
        EntityStore::delete_net(&mut ds, &n2.id).expect("delete");
        let n3 = EntityStore::create_net(&mut ds, "U1").expect("net");
        assert_eq!((n1.id.num, n2.id.num, n3.id.num), (1, 2, 3));
    }

    #[test]
    fn cable_and_subcdr_assignment() {
        let mut ds = Dataset::new();
        let c1 = EntityStore::add_link(&mut ds, &pin("U1", "J1", "1"), &pin("U2", "J1", "1"), None)
            .expect("c1");
        let c2 = EntityStore::add_link(&mut ds, &pin("U1", "J1", "2"), &pin("U2", "J1", "2"), None)
            .expect("c2");
        let c3 =
            EntityStore::add_link(&mut ds, &pin("U1", "J1", "3"), &pin("U2", "J1", "3"), Some(1))
                .expect("c3");
        assert_eq!(c1.id, CdrId::new(1, 1));
        assert_eq!(c2.id, CdrId::new(2, 1));
        assert_eq!(c3.id, CdrId::new(1, 2));
    }

    #[test]
    fn delete_conductor_closes_gap() {
        let mut ds = Dataset::new();
        for desig in ["1", "2", "3", "4"] {
            EntityStore::add_link(
                &mut ds,
                &pin("U1", "J1", desig),
                &pin("U2", "J1", desig),
                Some(5),
            )
            .expect("link");
        }
        EntityStore::delete_conductor(&mut ds, CdrId::new(5, 2)).expect("delete");
        assert_eq!(subcdrs(&ds, 5), vec![1, 2, 3]);

        // The old subcdr 3 (pins U1/J1/3) now sits at 2.
        let moved = ds.conductor(CdrId::new(5, 2)).expect("get").expect("some");
        assert_eq!(moved.a_net, NetId::new("U1", 3));
    }

    #[test]
    fn delete_missing_conductor_is_not_found() {
        let mut ds = Dataset::new();
        assert!(matches!(
            EntityStore::delete_conductor(&mut ds, CdrId::new(1, 1)),
            Err(WirelistError::ConductorNotFound(_))
        ));
    }

    #[test]
    fn add_pin_to_net_checks_net_and_duplicates() {
        let mut ds = Dataset::new();
        EntityStore::find_or_create_pin_net(&mut ds, &pin("U1", "J1", "1")).expect("net");

        assert!(matches!(
            EntityStore::add_pin_to_net(&mut ds, &pin("U1", "J1", "2"), 7),
            Err(WirelistError::NetNotFound(_))
        ));
        EntityStore::add_pin_to_net(&mut ds, &pin("U1", "J1", "2"), 1).expect("add");
        assert!(matches!(
            EntityStore::add_pin_to_net(&mut ds, &pin("U1", "J1", "2"), 1),
            Err(WirelistError::DuplicatePin(_))
        ));
        assert_eq!(ds.pins_of_net(&NetId::new("U1", 1)).expect("scan").len(), 2);
    }

    #[test]
    fn delete_net_cascades() {
        let mut ds = Dataset::new();
        EntityStore::add_link(&mut ds, &pin("U1", "J1", "1"), &pin("U2", "J1", "1"), Some(1))
            .expect("link");
        EntityStore::add_link(&mut ds, &pin("U1", "J1", "1"), &pin("U3", "J1", "1"), Some(1))
            .expect("link");
        EntityStore::add_link(&mut ds, &pin("U2", "J1", "1"), &pin("U3", "J1", "1"), Some(1))
            .expect("link");
        EntityStore::add_pin_to_net(&mut ds, &pin("U1", "J2", "9"), 1).expect("pin");

        let u1 = NetId::new("U1", 1);
        let removal = EntityStore::delete_net(&mut ds, &u1).expect("delete");
        assert_eq!(removal, NetRemoval { conductors: 2, pins: 2 });
        assert!(ds.conductors_of_net(&u1).expect("scan").is_empty());
        assert!(ds.pins_of_net(&u1).expect("scan").is_empty());
        // The surviving conductor slid down to subcdr 1.
        assert_eq!(subcdrs(&ds, 1), vec![1]);
    }

    #[test]
    fn deleting_last_pin_keeps_net() {
        let mut ds = Dataset::new();
        let net = EntityStore::find_or_create_pin_net(&mut ds, &pin("U1", "J1", "1")).expect("net");
        EntityStore::delete_pin(&mut ds, &PinKey::new(net.id.clone(), "J1", "1")).expect("delete");
        assert!(ds.net(&net.id).expect("get").is_some());
    }

    #[test]
    fn rename_pin_rejects_collision() {
        let mut ds = Dataset::new();
        EntityStore::find_or_create_pin_net(&mut ds, &pin("U1", "J1", "1")).expect("net");
        EntityStore::add_pin_to_net(&mut ds, &pin("U1", "J1", "2"), 1).expect("pin");
        let key = PinKey::new(NetId::new("U1", 1), "J1", "1");

        assert!(matches!(
            EntityStore::rename_pin(&mut ds, &key, "J1", "2"),
            Err(WirelistError::DuplicatePin(_))
        ));
        let renamed = EntityStore::rename_pin(&mut ds, &key, "J3", "1").expect("rename");
        assert_eq!(renamed.key.conn, "J3");
        assert!(ds.pin(&key).expect("get").is_none());
    }

    #[test]
    fn self_loop_rejected() {
        let mut ds = Dataset::new();
        let result = EntityStore::add_link(&mut ds, &pin("U1", "J1", "1"), &pin("U1", "J1", "1"), None);
        assert!(matches!(result, Err(WirelistError::Validation(_))));
    }

    #[test]
    fn set_subid_refuses_occupied_slot() {
        let mut ds = Dataset::new();
        for desig in ["1", "2"] {
            EntityStore::add_link(&mut ds, &pin("U1", "J1", desig), &pin("U2", "J1", desig), Some(1))
                .expect("link");
        }
        assert!(matches!(
            EntityStore::set_conductor_subid(&mut ds, CdrId::new(1, 2), 1),
            Err(WirelistError::DuplicateConductor(_))
        ));
        EntityStore::set_conductor_subid(&mut ds, CdrId::new(1, 2), 0).expect("move");
        assert_eq!(subcdrs(&ds, 1), vec![0, 1]);
    }

    #[test]
    fn set_kind_changes_label() {
        let mut ds = Dataset::new();
        let c = EntityStore::add_link(&mut ds, &pin("U1", "J1", "1"), &pin("U2", "J1", "1"), None)
            .expect("link");
        let shield = EntityStore::set_conductor_kind(&mut ds, c.id, "SH").expect("kind");
        assert_eq!(shield.to_string(), "C-1.1 (SH)");
    }
}
