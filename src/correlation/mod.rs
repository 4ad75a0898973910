//! Workflow run ↔ cloud run correlation.
//!
//! A run is matched in tiers, first hit wins:
//!
//! 1. Cypress Cloud listing, by commit hash.
//! 2. The run's GitHub log archive, scanned for a cloud run URL.
//! 3. Nothing: the URL is absent. Failures never escape the resolver.

pub mod archive;
pub mod pattern;
pub mod resolver;

pub use archive::scan_log_archive;
pub use pattern::CloudUrlPattern;
pub use resolver::{match_by_commit, Correlation, CorrelationSource, Resolver};
