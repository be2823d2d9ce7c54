//! # Core Type Definitions
//!
//! This module contains the row types of the interconnect store:
//! - Net identity and rows (`NetId`, `Net`)
//! - Pin identity and rows (`PinKey`, `Pin`, `PinRef`, `PinCid`)
//! - Conductor identity and rows (`CdrId`, `Conductor`)
//! - Error types (`WirelistError`, `ErrorKind`)
//!
//! ## Ordering Guarantees
//!
//! Every identity type implements `Ord` with the field order of its
//! primary key, so `BTreeMap`/`BTreeSet` iteration matches the order of
//! the persisted relations.

use crate::primitives::ORDINARY_KIND;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NETS
// =============================================================================

/// Identity of a net: the owning unit plus a unit-local number.
///
/// Numbers are assigned by the store. They are only ever non-positive
/// inside a renumbering transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId {
    pub unit: String,
    pub num: i64,
}

impl NetId {
    /// Create a net identity.
    #[must_use]
    pub fn new(unit: impl Into<String>, num: i64) -> Self {
        Self {
            unit: unit.into(),
            num,
        }
    }

    /// The same unit with a different number.
    #[must_use]
    pub fn with_num(&self, num: i64) -> Self {
        Self {
            unit: self.unit.clone(),
            num,
        }
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N-{}.{}", self.unit, self.num)
    }
}

/// A net row: a signal group scoped to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub id: NetId,
    pub sig_desc: Option<String>,
}

impl Net {
    /// Create a net without a signal description.
    #[must_use]
    pub fn new(id: NetId) -> Self {
        Self { id, sig_desc: None }
    }
}

// =============================================================================
// PINS
// =============================================================================

/// Primary key of a pin: owning net, connector and position designator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinKey {
    pub net: NetId,
    pub conn: String,
    pub desig: String,
}

impl PinKey {
    /// Create a pin key.
    #[must_use]
    pub fn new(net: NetId, conn: impl Into<String>, desig: impl Into<String>) -> Self {
        Self {
            net,
            conn: conn.into(),
            desig: desig.into(),
        }
    }

    /// The physical address of this pin, without its net number.
    #[must_use]
    pub fn pin_ref(&self) -> PinRef {
        PinRef::new(&self.net.unit, &self.conn, &self.desig)
    }
}

impl fmt::Display for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P-{}.{}.{} on {}",
            self.net.unit, self.conn, self.desig, self.net
        )
    }
}

/// A pin row, exclusively owned by its net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub key: PinKey,
    pub sig_desc: Option<String>,
}

impl Pin {
    /// Create a pin without a signal description.
    #[must_use]
    pub fn new(key: PinKey) -> Self {
        Self {
            key,
            sig_desc: None,
        }
    }

    /// The owning net.
    #[must_use]
    pub fn net(&self) -> &NetId {
        &self.key.net
    }
}

/// Physical pin address as a user names it: unit, connector, designator.
///
/// Unlike `PinKey` it carries no net number; the store resolves it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub unit: String,
    pub conn: String,
    pub desig: String,
}

impl PinRef {
    /// Create a pin address.
    #[must_use]
    pub fn new(unit: impl Into<String>, conn: impl Into<String>, desig: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            conn: conn.into(),
            desig: desig.into(),
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.unit, self.conn, self.desig)
    }
}

/// Positional display id of a pin: its index in the pin report under the
/// current view filter. Invalidated by any structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinCid(pub usize);

// =============================================================================
// CONDUCTORS
// =============================================================================

/// Identity of a conductor: cable number and subconductor within it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CdrId {
    pub cable: u64,
    pub subcdr: u64,
}

impl CdrId {
    /// Create a conductor identity.
    #[must_use]
    pub const fn new(cable: u64, subcdr: u64) -> Self {
        Self { cable, subcdr }
    }
}

impl fmt::Display for CdrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cable, self.subcdr)
    }
}

/// A conductor row: one cable core linking two nets.
///
/// The link is symmetric; `a_net`/`b_net` only fix the display orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conductor {
    pub id: CdrId,
    pub a_net: NetId,
    pub b_net: NetId,
    pub kind: String,
}

impl Conductor {
    /// Whether either endpoint is the given net.
    #[must_use]
    pub fn touches(&self, net: &NetId) -> bool {
        self.a_net == *net || self.b_net == *net
    }

    /// The endpoint opposite to `net`.
    #[must_use]
    pub fn other_end(&self, net: &NetId) -> &NetId {
        if self.a_net == *net {
            &self.b_net
        } else {
            &self.a_net
        }
    }

    /// Exchange the two endpoints.
    pub fn swap_orientation(&mut self) {
        std::mem::swap(&mut self.a_net, &mut self.b_net);
    }
}

impl fmt::Display for Conductor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Subconductor 0 marks shields and loose wires that carry no core number.
        if self.id.subcdr != 0 {
            write!(f, "C-{}.{}", self.id.cable, self.id.subcdr)?;
        } else {
            write!(f, "C-{}", self.id.cable)?;
        }
        if self.kind != ORDINARY_KIND {
            write!(f, " ({})", self.kind)?;
        }
        Ok(())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of a `WirelistError`, for callers that branch on
/// the failure category rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Validation,
    Transaction,
    Storage,
}

/// Errors that can occur in the wirelist store.
///
/// - No silent failures
/// - Every failed mutation has been rolled back when the error is returned
#[derive(Debug, Error)]
pub enum WirelistError {
    /// No net with this identity exists.
    #[error("Net not found: {0}")]
    NetNotFound(NetId),

    /// No pin with this key exists.
    #[error("Pin not found: {0}")]
    PinNotFound(PinKey),

    /// No conductor with this identity exists.
    #[error("Conductor not found: C-{0}")]
    ConductorNotFound(CdrId),

    /// A display id does not address a row of the current pin report.
    #[error("Pin display id {id} out of range ({rows} rows shown)")]
    DisplayIdOutOfRange { id: usize, rows: usize },

    /// The net already has a pin with this connector and designator.
    #[error("Pin already exists: {0}")]
    DuplicatePin(PinKey),

    /// The cable already has a conductor with this subconductor id.
    #[error("Cable {} already has a conductor with ID {}", .0.cable, .0.subcdr)]
    DuplicateConductor(CdrId),

    /// Malformed argument.
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// A structural mutation failed part-way and was rolled back.
    #[error("Transaction '{operation}' rolled back: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: Box<WirelistError>,
    },

    /// The backing database reported an error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A stored row could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl WirelistError {
    /// The failure category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetNotFound(_)
            | Self::PinNotFound(_)
            | Self::ConductorNotFound(_)
            | Self::DisplayIdOutOfRange { .. } => ErrorKind::NotFound,
            Self::DuplicatePin(_) | Self::DuplicateConductor(_) => ErrorKind::Duplicate,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transaction { .. } => ErrorKind::Transaction,
            Self::StorageError(_) | Self::SerializationError(_) | Self::IoError(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Attribute a failure to the transaction it aborted.
    ///
    /// Caller-facing failures (not found, duplicate, validation) pass
    /// through unchanged; storage failures are wrapped so the caller
    /// learns which operation was rolled back.
    #[must_use]
    pub fn rolled_back(self, operation: &'static str) -> Self {
        match self.kind() {
            ErrorKind::Storage => Self::Transaction {
                operation,
                source: Box::new(self),
            },
            _ => self,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cdr(cable: u64, subcdr: u64, kind: &str) -> Conductor {
        Conductor {
            id: CdrId::new(cable, subcdr),
            a_net: NetId::new("U1", 1),
            b_net: NetId::new("U2", 1),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn conductor_labels() {
        assert_eq!(cdr(3, 2, "C").to_string(), "C-3.2");
        assert_eq!(cdr(3, 2, "S").to_string(), "C-3.2 (S)");
        assert_eq!(cdr(3, 0, "C").to_string(), "C-3");
        assert_eq!(cdr(3, 0, "SH").to_string(), "C-3 (SH)");
    }

    #[test]
    fn net_label() {
        assert_eq!(NetId::new("PSU", 12).to_string(), "N-PSU.12");
    }

    #[test]
    fn pin_keys_order_by_unit_num_conn_desig() {
        let mut keys = vec![
            PinKey::new(NetId::new("U2", 1), "J1", "1"),
            PinKey::new(NetId::new("U1", 2), "J1", "1"),
            PinKey::new(NetId::new("U1", 1), "J2", "1"),
            PinKey::new(NetId::new("U1", 1), "J1", "2"),
        ];
        keys.sort();
        let flat: Vec<String> = keys
            .iter()
            .map(|k| format!("{}.{}.{}.{}", k.net.unit, k.net.num, k.conn, k.desig))
            .collect();
        assert_eq!(flat, ["U1.1.J1.2", "U1.1.J2.1", "U1.2.J1.1", "U2.1.J1.1"]);
    }

    #[test]
    fn other_end_and_swap() {
        let mut c = cdr(1, 1, "C");
        let u1 = NetId::new("U1", 1);
        assert_eq!(c.other_end(&u1), &NetId::new("U2", 1));
        c.swap_orientation();
        assert_eq!(c.a_net, NetId::new("U2", 1));
        assert!(c.touches(&u1));
    }

    #[test]
    fn storage_errors_become_transaction_errors() {
        let wrapped = WirelistError::StorageError("disk full".into()).rolled_back("renumber");
        assert_eq!(wrapped.kind(), ErrorKind::Transaction);

        let kept = WirelistError::NetNotFound(NetId::new("U1", 9)).rolled_back("delete_net");
        assert_eq!(kept.kind(), ErrorKind::NotFound);
    }
}
