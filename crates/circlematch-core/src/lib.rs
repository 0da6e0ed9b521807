// Public fallible APIs in this crate share one concrete error contract (`MatchError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod assembler;
pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub(crate) mod jsonl;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod partition;
pub mod state;
pub mod store;

pub use client::CircleMatch;
pub use error::{MatchError, Result};
