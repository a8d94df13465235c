//! Status Page Collector Library
//!
//! This library probes configured HTTP endpoints, reduces them into group
//! statuses, and maintains a bounded per-site and per-group status history
//! as CSV files for a status page renderer.

pub mod config;
pub mod collector;
pub mod log_format;
pub mod log_store;
pub mod aggregator;
pub mod probe;
pub mod status;
pub mod errors;

pub use config::{Config, Settings};
pub use collector::{StatusCollector, RunReport, GroupReport, SiteReport};
pub use log_store::{LogStore, RecordOutcome};
pub use probe::{Prober, HttpProber};
pub use status::{Status, StatusEntry};
pub use errors::{CollectorError, Result};
