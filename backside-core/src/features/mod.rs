//! Feature stages.
//!
//! - `simple` + `smart_filter`: Stage 2, computed over the full ingested
//!   series before any date filtering.
//! - `full`: Stage 3a, computed per surviving ticker over its retained series.

pub mod full;
pub mod simple;
pub mod smart_filter;

pub use full::{compute_full_features, FullFeatureRow};
pub use simple::{compute_simple_features, FeatureRow};
pub use smart_filter::{apply_smart_filter, filter_rows, qualifies_as_d0, FilteredUniverse, SmartFilterReport};
