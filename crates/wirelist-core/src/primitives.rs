//! # Store Primitives
//!
//! Hardcoded constants of the wirelist store.
//!
//! Name limits follow the column sizes of the persisted relations; report
//! widths are the defaults used when no configuration overrides them.

/// Kind tag of an ordinary cable core. Any other tag (shield, drain, ...)
/// is shown next to the conductor label in reports.
pub const ORDINARY_KIND: &str = "C";

/// Maximum length of a unit, connector, designator or conductor kind.
pub const MAX_NAME_LENGTH: usize = 20;

/// Maximum length of a signal description.
pub const MAX_SIG_DESC_LENGTH: usize = 50;

// =============================================================================
// REPORT LAYOUT
// =============================================================================

/// Default column widths of the pin report:
/// unit, net, conn, pin, sig desc, conductor, ref net, display id.
pub const PIN_REPORT_WIDTHS: [usize; 8] = [10, 5, 6, 4, 20, 12, 16, 4];

/// Default column widths of the conductor report:
/// unit, conn, pin, spacer, conductor, spacer, pin, conn, unit.
pub const CONDUCTOR_REPORT_WIDTHS: [usize; 9] = [12, 6, 4, 5, 6, 5, 4, 6, 12];

/// Banner printed ahead of a report while the link filter is active.
pub const LINK_FILTER_BANNER: &str = "*** Link Filter is ON ***";

/// File extension of per-unit interconnect lists written by bulk emission.
pub const EMIT_EXTENSION: &str = "il";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_kind_is_c() {
        assert_eq!(ORDINARY_KIND, "C");
    }

    #[test]
    fn report_widths_cover_every_column() {
        assert_eq!(PIN_REPORT_WIDTHS.len(), 8);
        assert_eq!(CONDUCTOR_REPORT_WIDTHS.len(), 9);
    }
}
