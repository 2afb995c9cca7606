//! lc-reconcile
//!
//! Gold/silver layer reconciliation.
//!
//! - [`compare`]: pure comparison rules turning observed scalars into a
//!   [`Verdict`].
//! - [`engine`]: drives the query executor and notifier through one run.
//! - [`invoke`]: entry point returning `{"status": "PASS" | "FAIL", ...}`.
//!
//! A data mismatch is a verdict, never an error. Only infrastructure faults
//! (rejected submissions, FAILED/CANCELLED queries, timeouts, unreadable
//! results) surface as `Err`.

pub mod compare;
pub mod engine;
pub mod invoke;
mod types;

pub use compare::{evaluate, round_to, Observation};
pub use engine::{EngineSettings, ReconciliationEngine};
pub use invoke::{handle, InvocationContext};
pub use types::*;
