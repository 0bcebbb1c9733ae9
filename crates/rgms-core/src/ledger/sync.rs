//! Lifetime merit reconciliation.
//!
//! Recomputes each cadet's running totals from the full merit/demerit log
//! and writes back only the cadets whose stored totals had drifted. Cadets
//! are reconciled in batches of [`SYNC_BATCH_SIZE`], each one store
//! transaction, so a failed write never leaves a batch half-written and an
//! entry recorded mid-sweep is picked up by the next run at the latest.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RgmsError};
use crate::models::{Cadet, MeritDemeritLog, MeritTotals};
use crate::store::Store;

/// Cadets reconciled per store transaction
pub const SYNC_BATCH_SIZE: usize = 500;

/// Which cadets a sync pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    AllCadets,
    Cadet(i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SyncReport {
    /// Cadets whose stored totals were corrected
    pub synced_count: usize,
    /// Cadets scanned
    pub total_cadets: usize,
}

/// What reconciling one cadet changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Unchanged,
    TotalsCorrected {
        previous: MeritTotals,
        corrected: MeritTotals,
    },
    /// Totals were right but the cached grade had gone stale
    GradeRefreshed,
}

/// Bring one cadet's totals (and therefore grade) in line with their log.
/// `logs` must be exactly this cadet's entries.
pub fn reconcile_cadet(cadet: &mut Cadet, logs: &[MeritDemeritLog]) -> Reconciliation {
    let previous = cadet.merit_totals();
    let corrected = MeritTotals::from_logs(logs);

    if previous != corrected {
        cadet.set_merit_totals(corrected);
        return Reconciliation::TotalsCorrected {
            previous,
            corrected,
        };
    }

    if !cadet.grade_is_consistent() {
        cadet.recompute_grade();
        return Reconciliation::GradeRefreshed;
    }

    Reconciliation::Unchanged
}

/// Run a reconciliation pass over the given scope.
///
/// A cadet removed while the sweep is running is skipped. Entries pointing at
/// cadets that no longer exist are reported in the log and otherwise ignored.
pub fn sync_lifetime_merits(store: &Store, scope: SyncScope) -> Result<SyncReport> {
    let cadet_ids = match scope {
        SyncScope::AllCadets => store.cadet_ids(),
        SyncScope::Cadet(id) => vec![id],
    };

    let mut report = SyncReport::default();

    for batch in cadet_ids.chunks(SYNC_BATCH_SIZE) {
        let outcomes = store.with_cadet_ledgers(batch, reconcile_cadet)?;

        for (&cadet_id, outcome) in batch.iter().zip(outcomes) {
            let outcome = match outcome {
                Some(outcome) => outcome,
                None if scope == SyncScope::Cadet(cadet_id) => {
                    return Err(RgmsError::CadetNotFound(cadet_id));
                }
                None => {
                    debug!(cadet_id, "Cadet removed during merit sync, skipping");
                    continue;
                }
            };

            report.total_cadets += 1;

            match outcome {
                Reconciliation::TotalsCorrected {
                    previous,
                    corrected,
                } => {
                    report.synced_count += 1;
                    info!(
                        cadet_id,
                        previous_merits = previous.merit_points,
                        previous_demerits = previous.demerit_points,
                        merits = corrected.merit_points,
                        demerits = corrected.demerit_points,
                        "Corrected drifted merit totals"
                    );
                }
                Reconciliation::GradeRefreshed => {
                    debug!(cadet_id, "Refreshed stale grade snapshot");
                }
                Reconciliation::Unchanged => {}
            }
        }
    }

    if scope == SyncScope::AllCadets {
        let orphaned = store.orphaned_log_count();
        if orphaned > 0 {
            warn!(orphaned, "Merit logs reference missing cadets and were skipped");
        }
    }

    info!(
        synced = report.synced_count,
        total = report.total_cadets,
        "Merit ledger sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MeritType, NewCadet};
    use chrono::Utc;

    fn cadet(merit_points: i64, demerit_points: i64) -> Cadet {
        let mut c = Cadet::new(
            1,
            NewCadet {
                student_id: "2024-0100".to_string(),
                first_name: "Norhan".to_string(),
                last_name: "Ali".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        c.set_merit_totals(MeritTotals {
            merit_points,
            demerit_points,
        });
        c
    }

    fn entry(id: i64, merit_type: MeritType, points: i64) -> MeritDemeritLog {
        MeritDemeritLog {
            id,
            cadet_id: 1,
            merit_type,
            points,
            reason: String::new(),
            issued_by: "admin".to_string(),
            date_recorded: Utc::now(),
        }
    }

    #[test]
    fn test_reconcile_corrects_stale_totals() {
        let mut c = cadet(0, 0);
        let logs = vec![entry(1, MeritType::Merit, 5), entry(2, MeritType::Demerit, 3)];

        let outcome = reconcile_cadet(&mut c, &logs);

        assert_eq!(
            outcome,
            Reconciliation::TotalsCorrected {
                previous: MeritTotals::default(),
                corrected: MeritTotals {
                    merit_points: 5,
                    demerit_points: 3
                },
            }
        );
        assert_eq!(c.merit_points, 5);
        assert_eq!(c.demerit_points, 3);
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_reconcile_without_logs_zeroes_totals() {
        let mut c = cadet(12, 4);
        let outcome = reconcile_cadet(&mut c, &[]);
        assert!(matches!(outcome, Reconciliation::TotalsCorrected { .. }));
        assert_eq!(c.merit_totals(), MeritTotals::default());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut c = cadet(0, 9);
        let logs = vec![entry(1, MeritType::Demerit, 4), entry(2, MeritType::Demerit, 5)];

        assert_eq!(reconcile_cadet(&mut c, &logs), Reconciliation::Unchanged);
        assert_eq!(reconcile_cadet(&mut c, &logs), Reconciliation::Unchanged);
    }

    #[test]
    fn test_reconcile_refreshes_stale_grade() {
        let mut c = cadet(0, 0);
        c.final_grade = 99.0;

        assert_eq!(reconcile_cadet(&mut c, &[]), Reconciliation::GradeRefreshed);
        assert_eq!(c.final_grade, 30.0);
    }
}
