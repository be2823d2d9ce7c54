//! # Reorient Engine
//!
//! Canonical display orientation of conductors.
//!
//! Conductors are symmetric; `a_net`/`b_net` only decide which side a
//! report prints them on. Units are ranked by fan-out (conductor
//! endpoints on their nets), lowest first, and every conductor ends up
//! with its lowest-ranked unit on the `a` side.

use crate::dataset::Tables;
use crate::query::QueryEngine;
use crate::{CdrId, WirelistError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Fan-out of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFanOut {
    pub unit: String,
    pub endpoints: usize,
}

/// Outcome of a reorientation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReorientSummary {
    pub units: usize,
    pub swapped: usize,
}

/// Bulk conductor reorientation.
pub struct ReorientEngine;

impl ReorientEngine {
    /// Every unit with its conductor endpoint count, ascending by count
    /// then unit name. Units without conductors count zero.
    pub fn fan_out<T: Tables + ?Sized>(tables: &T) -> Result<Vec<UnitFanOut>, WirelistError> {
        let mut counts: BTreeMap<String, usize> = QueryEngine::units(tables)?
            .into_iter()
            .map(|unit| (unit, 0))
            .collect();
        for conductor in tables.conductors()? {
            for end in [conductor.a_net.unit, conductor.b_net.unit] {
                *counts.entry(end).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<UnitFanOut> = counts
            .into_iter()
            .map(|(unit, endpoints)| UnitFanOut { unit, endpoints })
            .collect();
        ranked.sort_by(|a, b| a.endpoints.cmp(&b.endpoints).then_with(|| a.unit.cmp(&b.unit)));
        Ok(ranked)
    }

    /// Walk the units in fan-out order; each conductor is settled by the
    /// first unit it touches, swapped if that unit is only on its `b` side.
    pub fn reorient_conductors<T: Tables + ?Sized>(
        tables: &mut T,
    ) -> Result<ReorientSummary, WirelistError> {
        let ranked = Self::fan_out(tables)?;
        let mut conductors = tables.conductors()?;
        let mut settled: BTreeSet<CdrId> = BTreeSet::new();
        let mut summary = ReorientSummary {
            units: ranked.len(),
            swapped: 0,
        };

        for UnitFanOut { unit, .. } in &ranked {
            for conductor in conductors.iter_mut() {
                if settled.contains(&conductor.id) {
                    continue;
                }
                let on_a = conductor.a_net.unit == *unit;
                let on_b = conductor.b_net.unit == *unit;
                if !(on_a || on_b) {
                    continue;
                }
                settled.insert(conductor.id);
                if on_b && !on_a {
                    conductor.swap_orientation();
                    tables.insert_conductor(conductor)?;
                    summary.swapped += 1;
                    tracing::debug!("{} now starts at {}", conductor, conductor.a_net);
                }
            }
        }

        tracing::info!(
            "reoriented conductors over {} units, {} swapped",
            summary.units,
            summary.swapped
        );
        Ok(summary)
    }
}

// =============================================================================
// TESTS
// =============================================================================
