//! Grade computation engine.
//!
//! - `calculator`: raw cadet inputs to weighted sub-scores and a final percentage
//! - `transmutation`: final percentage to the institutional grade code
//!
//! Both are pure and hold no shared state, so they are safe to call from any
//! number of concurrent requests.

pub mod calculator;
pub mod transmutation;

pub use calculator::{
    calculate, forces_failure, GradeInputs, GradeOutcome, GradeRemarks, FORCED_FAILURE_STATUSES,
};
pub use transmutation::{lookup, TransmutedGrade, TRANSMUTATION_TABLE};
