//! Incremental merit/demerit bookkeeping.
//!
//! The fast path for normal writes: each new entry moves the cadet's running
//! totals by its points, each deleted entry moves them back. Drift from this
//! path is repaired by [`super::sync`].

use tracing::debug;

use crate::error::{Result, RgmsError};
use crate::models::{Cadet, MeritDemeritLog, MeritTotals};

fn ensure_owner(cadet: &Cadet, entry: &MeritDemeritLog) -> Result<()> {
    if entry.cadet_id != cadet.id {
        return Err(RgmsError::CadetMismatch {
            log_id: entry.id,
            log_cadet_id: entry.cadet_id,
            cadet_id: cadet.id,
        });
    }
    Ok(())
}

/// Add a new entry's points to the cadet's running totals and refresh their grade.
pub fn apply_merit_demerit(cadet: &mut Cadet, entry: &MeritDemeritLog) -> Result<MeritTotals> {
    ensure_owner(cadet, entry)?;

    let mut totals = cadet.merit_totals();
    if entry.is_merit() {
        totals.merit_points = totals.merit_points.saturating_add(entry.points);
    } else {
        totals.demerit_points = totals.demerit_points.saturating_add(entry.points);
    }
    cadet.set_merit_totals(totals);

    debug!(
        cadet_id = cadet.id,
        log_id = entry.id,
        merit_type = %entry.merit_type,
        points = entry.points,
        "Applied merit/demerit entry"
    );
    Ok(totals)
}

/// Take a deleted entry's points back out of the running totals.
/// Totals never go below zero; a drifted total is left for the sync to repair.
pub fn reverse_merit_demerit(cadet: &mut Cadet, entry: &MeritDemeritLog) -> Result<MeritTotals> {
    ensure_owner(cadet, entry)?;

    let mut totals = cadet.merit_totals();
    if entry.is_merit() {
        totals.merit_points = totals.merit_points.saturating_sub(entry.points).max(0);
    } else {
        totals.demerit_points = totals.demerit_points.saturating_sub(entry.points).max(0);
    }
    cadet.set_merit_totals(totals);

    debug!(
        cadet_id = cadet.id,
        log_id = entry.id,
        merit_type = %entry.merit_type,
        points = entry.points,
        "Reversed merit/demerit entry"
    );
    Ok(totals)
}
