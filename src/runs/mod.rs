//! Correlated run envelopes, the recent-run store and trigger helpers.

pub mod store;
pub mod trigger;
pub mod types;

pub use store::RunStore;
pub use trigger::{poll_for_run, select_triggered_run, PollSchedule};
pub use types::{CorrelatedRun, Environment};
