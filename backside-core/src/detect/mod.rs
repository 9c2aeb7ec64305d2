//! Backside pattern detection engine.
//!
//! Per ticker: absolute position gate → trigger mold on D-1 (or D-2) → D-1
//! quality gates → D-1/D-2 ordering → D0 gates. Every gate is a pure
//! predicate; any undefined input rejects the candidate row, never the ticker.

pub mod engine;
pub mod gates;
pub mod mold;
pub mod position;

pub use engine::{
    detect_isolated, detect_ticker, evaluate_at, scan_rows, DetectError, MIN_SERIES_ROWS,
};
pub use gates::{first_rejection, passes_in_order, Candidate, Gate};
pub use mold::{find_trigger, satisfies_mold};
pub use position::{absolute_position, position_in_window, window_bounds};
