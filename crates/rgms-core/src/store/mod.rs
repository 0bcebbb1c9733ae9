//! Persistent record store.
//!
//! Cadets and merit/demerit logs are kept as JSON files under the data
//! directory (`cadets.json`, `merit_logs.json`), each stamped with the time
//! it was saved. The whole data set is loaded at startup and held in memory.

pub mod manager;

pub use manager::{Store, StoreStats, StoredData};
