//! Market data: provider seam, concrete providers, calendar, and Stage 1 ingestion.

pub mod calendar;
pub mod circuit_breaker;
pub mod ingest;
pub mod polygon;
pub mod provider;
pub mod synthetic;

pub use calendar::{CalendarError, TradingCalendar, UsEquityCalendar};
pub use circuit_breaker::CircuitBreaker;
pub use ingest::{ingest_history, IngestOutcome, IngestReport};
pub use polygon::{PolygonGroupedProvider, PolygonSettings};
pub use provider::{DataError, MarketDataProvider};
pub use synthetic::{SyntheticProvider, SyntheticUniverse};
