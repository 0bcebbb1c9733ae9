//! RGMS server - HTTP API over the grading core.

pub mod api;
