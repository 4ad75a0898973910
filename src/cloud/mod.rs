//! Cypress Cloud client and payload types.

pub mod client;
pub mod types;

pub use client::CloudClient;
pub use types::{CloudCommit, CloudRun, CloudRunList};
