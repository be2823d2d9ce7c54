//! # Argument Validation
//!
//! Checks applied to caller-supplied names before any row is written.
//!
//! - Names (unit, connector, designator, kind) are non-empty, contain no
//!   whitespace and fit the persisted column size
//! - Signal descriptions fit their column size
//! - Cable numbers are positive

use crate::primitives::{MAX_NAME_LENGTH, MAX_SIG_DESC_LENGTH};
use crate::{PinRef, WirelistError};

/// Validation of store arguments.
pub struct Validator;

impl Validator {
    /// Validate a unit, connector, designator or kind name.
    ///
    /// `field` names the argument in the error message.
    pub fn name(field: &str, value: &str) -> Result<(), WirelistError> {
        if value.is_empty() {
            return Err(WirelistError::Validation(format!("{field} must not be empty")));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(WirelistError::Validation(format!(
                "{field} '{value}' must not contain whitespace"
            )));
        }
        if value.chars().count() > MAX_NAME_LENGTH {
            return Err(WirelistError::Validation(format!(
                "{field} '{value}' exceeds {MAX_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Validate every component of a pin address.
    pub fn pin_ref(pin: &PinRef) -> Result<(), WirelistError> {
        Self::name("unit", &pin.unit)?;
        Self::name("connector", &pin.conn)?;
        Self::name("designator", &pin.desig)
    }

    /// Validate a signal description.
    pub fn sig_desc(text: &str) -> Result<(), WirelistError> {
        if text.chars().count() > MAX_SIG_DESC_LENGTH {
            return Err(WirelistError::Validation(format!(
                "signal description exceeds {MAX_SIG_DESC_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Validate an explicitly requested cable number.
    pub fn cable(cable: u64) -> Result<(), WirelistError> {
        if cable == 0 {
            return Err(WirelistError::Validation(
                "cable numbers start at 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
