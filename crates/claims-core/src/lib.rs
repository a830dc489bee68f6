//! Core types for the claims revenue-cycle dashboard.
//!
//! Holds the claim record model and its field-access defaults, date-field
//! detection and parsing, the aggregate view types, formatting helpers,
//! settings and the shared error type.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ClaimsError, Result};
pub use models::{ClaimRecord, DashboardReport};
