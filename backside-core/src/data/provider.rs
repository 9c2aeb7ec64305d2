//! Market-data provider trait and structured error types.
//!
//! A provider answers one question: every bar that traded on a given day.
//! Implementations (grouped-daily HTTP, synthetic, test mocks) are swappable
//! behind `MarketDataProvider`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} for {date}")]
    HttpStatus { status: u16, date: NaiveDate },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no data for {date}")]
    NoData { date: NaiveDate },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Source of cross-sectional daily bars.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Every bar that traded on `date`, one per ticker.
    ///
    /// An empty day is reported as `DataError::NoData`, never as `Ok(vec![])`.
    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Bar>, DataError>;

    /// False once the provider has stopped accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}
