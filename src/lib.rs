//! Candidate tracking for a recruitment pipeline.
//!
//! Four record kinds live in an embedded SQLite store: accredited schools,
//! candidates, and the work experiences and references each candidate owns.
//! Candidates can additionally be linked to work experiences and references
//! they do not own.

pub mod config;
pub mod db;
pub mod decimal;
pub mod error;
pub mod logging;
pub mod models;
pub mod tui;
pub mod validation;

pub use db::Database;
pub use error::{Result, SchemaError};
