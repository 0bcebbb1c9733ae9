//! Data models for RGMS records.
//!
//! - `Cadet`: a cadet and the cached snapshot of their computed grade
//! - `MeritDemeritLog`: append-only merit/demerit entries and their totals
//! - Request bodies: `NewCadet`, `GradeUpdate`, `NewMeritLog`

pub mod cadet;
mod lenient;
pub mod merit;

pub use cadet::{Cadet, GradeUpdate, NewCadet, DEFAULT_ATTENDANCE_TOTAL};
pub use merit::{MeritDemeritLog, MeritTotals, MeritType, NewMeritLog};
