//! Backside Core: bar model, grouped ingestion, feature stages, pattern detection.
//!
//! The scan runs in three stages:
//! - Stage 1: one cross-sectional provider request per trading day, merged
//!   into a deduplicated bar store
//! - Stage 2: simple features and the smart filter, which narrows output-range
//!   dates while keeping every historical row of surviving tickers
//! - Stage 3: full indicators and the per-ticker backside detection engine
//!
//! Stages 1 and 3 run on dedicated bounded worker pools.

pub mod data;
pub mod detect;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod observe;
pub mod params;
pub mod pipeline;
pub mod pool;

pub use params::{OutputRange, ScanParameters, TriggerMode};
pub use pipeline::{ScanError, ScanOutcome, ScanStats, Scanner};
