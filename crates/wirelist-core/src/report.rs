//! # Reports
//!
//! Builds the two fixed-width interconnect reports from the Query Engine
//! projections:
//! - The pin report: pins grouped by unit and net, with the conductors of
//!   each net listed against its last pin
//! - The conductor report: one line per conductor, endpoint pins on both
//!   sides
//!
//! Repeated leading values are blanked so each report reads as an
//! indented outline. The link filter banner is not part of the report
//! text; front ends print it ahead of the report.

use crate::dataset::Tables;
use crate::primitives::{CONDUCTOR_REPORT_WIDTHS, PIN_REPORT_WIDTHS};
use crate::query::{QueryEngine, ViewFilter};
use crate::tabulate::Tabulator;
use crate::{Conductor, NetId, WirelistError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PIN_HEADER: [&str; 8] = [
    "Unit", "Net", "Conn", "Pin", "Sig Desc", "Cdrs", "Ref Net", "PCID",
];
const CONDUCTOR_HEADER: [&str; 9] = [
    "Unit", "Conn", "Pin", "[/]", "Cdr", "[/]", "Pin", "Conn", "Unit",
];
const SPACER: &str = "[ ]";

/// Column widths of both reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportWidths {
    pub pins: [usize; 8],
    pub conductors: [usize; 9],
}

impl Default for ReportWidths {
    fn default() -> Self {
        Self {
            pins: PIN_REPORT_WIDTHS,
            conductors: CONDUCTOR_REPORT_WIDTHS,
        }
    }
}

fn blank(cells: usize) -> Vec<String> {
    vec![String::new(); cells]
}

/// Report construction and rendering.
pub struct ReportBuilder;

impl ReportBuilder {
    /// Cells of the pin report, header included.
    ///
    /// Rows carry the unit, `.num`, conn, desig, sig desc, conductor,
    /// referenced net and display id. Unit, conn, desig and sig desc are
    /// blanked when equal to the row above, stopping at the first change;
    /// a changed net number is shown but does not stop the run. Each new
    /// unit section is preceded by a blank row.
    pub fn pin_table<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
    ) -> Result<Vec<Vec<String>>, WirelistError> {
        let rows = QueryEngine::pin_rows(tables, filter)?;

        let mut linked: BTreeMap<NetId, Vec<Conductor>> = BTreeMap::new();
        for conductor in tables.conductors()? {
            linked
                .entry(conductor.a_net.clone())
                .or_default()
                .push(conductor.clone());
            if conductor.b_net != conductor.a_net {
                linked
                    .entry(conductor.b_net.clone())
                    .or_default()
                    .push(conductor);
            }
        }

        let mut lines: Vec<Vec<String>> =
            vec![PIN_HEADER.iter().map(|s| (*s).to_string()).collect()];
        let mut previous: Option<Vec<String>> = None;

        for (pcid, row) in rows.iter().enumerate() {
            let unblanked = vec![
                row.net.id.unit.clone(),
                format!(".{}", row.net.id.num),
                row.pin.key.conn.clone(),
                row.pin.key.desig.clone(),
                row.pin.sig_desc.clone().unwrap_or_default(),
                String::new(),
                String::new(),
                pcid.to_string(),
            ];
            let mut line = unblanked.clone();
            if let Some(previous) = &previous {
                for (field, (cell, above)) in line.iter_mut().zip(previous).take(5).enumerate() {
                    if *cell == *above {
                        cell.clear();
                    } else if field != 1 {
                        break;
                    }
                }
            }
            previous = Some(unblanked);

            if !line[0].is_empty() {
                lines.push(blank(7));
            }
            lines.push(line);

            let last_of_net = rows
                .get(pcid + 1)
                .is_none_or(|next| next.net.id != row.net.id);
            if !last_of_net {
                continue;
            }

            // Conductors fill the net's last pin row, then rows of their own.
            let conductors = linked.get(&row.net.id).map_or(&[][..], Vec::as_slice);
            for conductor in conductors {
                if let Some(current) = lines.last_mut() {
                    current[5] = conductor.to_string();
                    current[6] = conductor.other_end(&row.net.id).to_string();
                }
                lines.push(blank(7));
            }
            if !conductors.is_empty() {
                lines.pop();
            }
        }

        Ok(lines)
    }

    /// Cells of the conductor report, header and blank row included.
    ///
    /// Three runs are blanked independently: the conductor label, the
    /// a-side (unit, conn, desig, spacer) left to right, and the b-side
    /// right to left.
    pub fn conductor_table<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
    ) -> Result<Vec<Vec<String>>, WirelistError> {
        const GROUPS: [&[usize]; 3] = [&[4], &[0, 1, 2, 3], &[8, 7, 6, 5]];

        let rows = QueryEngine::conductor_rows(tables, filter)?;
        let mut lines: Vec<Vec<String>> = vec![
            CONDUCTOR_HEADER.iter().map(|s| (*s).to_string()).collect(),
            blank(9),
        ];
        let mut previous: Option<Vec<String>> = None;

        for row in &rows {
            let unblanked = vec![
                row.a_pin.key.net.unit.clone(),
                row.a_pin.key.conn.clone(),
                row.a_pin.key.desig.clone(),
                SPACER.to_string(),
                row.conductor.to_string(),
                SPACER.to_string(),
                row.b_pin.key.desig.clone(),
                row.b_pin.key.conn.clone(),
                row.b_pin.key.net.unit.clone(),
            ];
            let mut line = unblanked.clone();
            if let Some(previous) = &previous {
                for group in GROUPS {
                    for &field in group {
                        if line[field] == previous[field] {
                            line[field].clear();
                        } else {
                            break;
                        }
                    }
                }
            }
            previous = Some(unblanked);
            lines.push(line);
        }

        Ok(lines)
    }

    /// Render the pin report. Without display ids the PCID column has
    /// zero width.
    pub fn pin_report<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
        widths: &ReportWidths,
        show_pcids: bool,
    ) -> Result<String, WirelistError> {
        let mut columns = widths.pins;
        if !show_pcids {
            columns[7] = 0;
        }
        let lines = Self::pin_table(tables, filter)?;
        Ok(Tabulator::new(&columns).render_all(&lines))
    }

    /// Render the conductor report.
    pub fn conductor_report<T: Tables + ?Sized>(
        tables: &T,
        filter: &ViewFilter,
        widths: &ReportWidths,
    ) -> Result<String, WirelistError> {
        let lines = Self::conductor_table(tables, filter)?;
        Ok(Tabulator::new(&widths.conductors).render_all(&lines))
    }
}

// =============================================================================
// TESTS
// =============================================================================
