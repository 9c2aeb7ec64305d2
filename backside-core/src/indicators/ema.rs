//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA[0] = x[0] (no SMA warmup), so the series is defined from the
//! first observation onwards.

/// Compute an EMA over a pre-extracted series.
///
/// A NaN input taints its own slot and every later slot.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n == 0 || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[0];
    if prev.is_nan() {
        return result;
    }
    result[0] = prev;

    for i in 1..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

/// Percentage change of a series against itself `lag` slots earlier.
///
/// slope[t] = (x[t] − x[t−lag]) / x[t−lag] × 100. Undefined for t < lag and
/// when the lagged value is zero.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in lag..n {
        let base = values[i - lag];
        if base != 0.0 {
            result[i] = (values[i] - base) / base * 100.0;
        }
    }
    result
}
