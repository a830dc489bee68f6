//! Data layer for the claims dashboard.
//!
//! Discovers and reads claim record files, filters them, computes the
//! dashboard views and runs the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod filters;
pub mod reader;

pub use claims_core as core;
