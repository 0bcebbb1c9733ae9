//! Merit/demerit ledger.
//!
//! Two tiers keep a cadet's running totals honest:
//!
//! - `apply`: the fast path, moving totals as entries are recorded or deleted
//! - `sync`: the repair path, recomputing totals from the full log

pub mod apply;
pub mod sync;

pub use apply::{apply_merit_demerit, reverse_merit_demerit};
pub use sync::{
    reconcile_cadet, sync_lifetime_merits, Reconciliation, SyncReport, SyncScope, SYNC_BATCH_SIZE,
};
