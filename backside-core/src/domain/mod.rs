//! Domain types for the backside scanner

pub mod bar;
pub mod signal;

pub use bar::{Bar, BarStore, TickerSeries};
pub use signal::{sort_signals, Signal, SignalMetrics, TriggerTag};
