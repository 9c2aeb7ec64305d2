//! Trailing-window accumulators.
//!
//! `RollingMean` keeps a fixed-capacity ring buffer plus a running sum, so
//! each push is O(1). NaN observations are counted rather than summed: a
//! window holding any NaN reports no mean, and the sum is rebuilt once the
//! NaN leaves the window so the accumulator never carries NaN forward.

/// Fixed-size trailing mean over the last `period` observations.
#[derive(Debug, Clone)]
pub struct RollingMean {
    buf: Vec<f64>,
    head: usize,
    filled: usize,
    sum: f64,
    nan_count: usize,
}

impl RollingMean {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling period must be >= 1");
        Self {
            buf: vec![0.0; period],
            head: 0,
            filled: 0,
            sum: 0.0,
            nan_count: 0,
        }
    }

    /// Push one observation; returns the mean once the window is full and
    /// NaN-free.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let period = self.buf.len();
        if self.filled == period {
            let leaving = self.buf[self.head];
            if leaving.is_nan() {
                self.nan_count -= 1;
            } else {
                self.sum -= leaving;
            }
        } else {
            self.filled += 1;
        }

        self.buf[self.head] = value;
        if value.is_nan() {
            self.nan_count += 1;
        } else {
            self.sum += value;
        }
        self.head = (self.head + 1) % period;

        // Re-anchor the running sum whenever the window is NaN-free and about
        // to wrap, bounding floating-point drift to one window.
        if self.head == 0 && self.nan_count == 0 && self.filled == period {
            self.sum = self.buf.iter().sum();
        }

        self.mean()
    }

    /// Current mean, if the window is full and NaN-free.
    pub fn mean(&self) -> Option<f64> {
        if self.filled == self.buf.len() && self.nan_count == 0 {
            Some(self.sum / self.buf.len() as f64)
        } else {
            None
        }
    }
}

/// Trailing mean over `period` observations, inclusive of the current slot.
/// Undefined (NaN) until `period` observations have been seen.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut acc = RollingMean::new(period);
    values
        .iter()
        .map(|&v| acc.push(v).unwrap_or(f64::NAN))
        .collect()
}

/// Shift a series forward by `lag` slots: out[t] = x[t − lag].
///
/// Used to attribute a trailing statistic to the *next* day so that the value
/// seen on day D never includes day D itself.
pub fn lag(values: &[f64], lag: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if lag < n {
        out[lag..].copy_from_slice(&values[..n - lag]);
    }
    out
}

/// Trailing mean, lag-shifted by one slot.
pub fn prior_mean(values: &[f64], period: usize) -> Vec<f64> {
    lag(&rolling_mean(values, period), 1)
}
