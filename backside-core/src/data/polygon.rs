//! Grouped-daily HTTP provider.
//!
//! One request returns the whole US stock cross-section for a day:
//! `GET {base}/v2/aggs/grouped/locale/us/market/stocks/{date}?adjusted=true`.
//! Handles retries with exponential backoff, response parsing, and the
//! shared circuit breaker.

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, MarketDataProvider};
use crate::domain::Bar;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

#[derive(Debug, Deserialize)]
struct GroupedResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Option<Vec<GroupedBar>>,
}

#[derive(Debug, Deserialize)]
struct GroupedBar {
    #[serde(rename = "T")]
    ticker: String,
    #[serde(rename = "o")]
    open: Option<f64>,
    #[serde(rename = "h")]
    high: Option<f64>,
    #[serde(rename = "l")]
    low: Option<f64>,
    #[serde(rename = "c")]
    close: Option<f64>,
    #[serde(rename = "v")]
    volume: Option<f64>,
}

/// Connection settings for the grouped-daily endpoint.
#[derive(Debug, Clone)]
pub struct PolygonSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl PolygonSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub struct PolygonGroupedProvider {
    client: reqwest::blocking::Client,
    settings: PolygonSettings,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl PolygonGroupedProvider {
    pub fn new(
        settings: PolygonSettings,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;
        Ok(Self {
            client,
            settings,
            circuit_breaker,
        })
    }

    fn grouped_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/v2/aggs/grouped/locale/us/market/stocks/{}?adjusted=true&apiKey={}",
            self.settings.base_url.trim_end_matches('/'),
            date.format("%Y-%m-%d"),
            self.settings.api_key
        )
    }

    /// Turn a grouped response into bars for `date`. Rows missing any OHLCV
    /// field are skipped.
    fn parse_response(date: NaiveDate, resp: GroupedResponse) -> Result<Vec<Bar>, DataError> {
        if let Some(status) = resp.status.as_deref() {
            if status == "ERROR" || status == "NOT_AUTHORIZED" {
                return Err(DataError::ResponseFormatChanged(format!(
                    "provider status {status} for {date}"
                )));
            }
        }

        let bars: Vec<Bar> = resp
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let volume = r.volume?;
                if !volume.is_finite() || volume < 0.0 {
                    return None;
                }
                Some(Bar {
                    ticker: r.ticker,
                    date,
                    open: r.open?,
                    high: r.high?,
                    low: r.low?,
                    close: r.close?,
                    volume: volume.round() as u64,
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(DataError::NoData { date });
        }
        Ok(bars)
    }

    fn fetch_with_retry(&self, date: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let url = self.grouped_url(date);
        let mut last_error = None;
        let mut retry_after = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = retry_delay(self.settings.base_delay, attempt, retry_after.take());
                debug!(%date, attempt, delay_ms = delay.as_millis() as u64, "retrying grouped request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "grouped endpoint rejected the API key".into(),
                ));
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let header_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                retry_after = header_secs.map(Duration::from_secs);
                let retry_after_secs = header_secs.unwrap_or(60);
                last_error = Some(DataError::RateLimited { retry_after_secs });
                continue;
            }
            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::HttpStatus {
                    status: status.as_u16(),
                    date,
                });
                continue;
            }
            if !status.is_success() {
                // 404 and friends: no data for this day, not worth retrying.
                return Err(DataError::HttpStatus {
                    status: status.as_u16(),
                    date,
                });
            }

            let body: GroupedResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {date}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Self::parse_response(date, body);
        }

        Err(last_error.unwrap_or(DataError::NoData { date }))
    }
}

/// Longest exponential backoff between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped at
/// `MAX_BACKOFF`, but never shorter than a server-provided `retry_after`.
fn retry_delay(base: Duration, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    let backoff = base.saturating_mul(factor).min(MAX_BACKOFF);
    retry_after.map_or(backoff, |wait| backoff.max(wait))
}

impl MarketDataProvider for PolygonGroupedProvider {
    fn name(&self) -> &str {
        "polygon_grouped_daily"
    }

    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Bar>, DataError> {
        self.fetch_with_retry(date)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
