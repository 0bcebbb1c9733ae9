//! RGMS core - grading engine and merit ledger for the MSU-SND ROTC
//! grading and management system.
//!
//! - `grading`: final grade computation and transmutation
//! - `ledger`: merit/demerit bookkeeping and lifetime reconciliation
//! - `models`: cadets, merit/demerit logs and request bodies
//! - `store`: JSON-file backed record store
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod grading;
pub mod ledger;
pub mod models;
pub mod store;

pub use config::Config;
pub use error::{Result, RgmsError};
pub use store::Store;
