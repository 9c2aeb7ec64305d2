//! Backside Runner: scan configuration, provider wiring, reports and export.
//!
//! This crate builds on `backside-core` to provide:
//! - TOML scan configs with content-addressed run ids
//! - Provider construction (grouped-daily HTTP or synthetic)
//! - End-to-end scan runs producing versioned `ScanReport`s
//! - CSV and JSON export

pub mod config;
pub mod export;
pub mod runner;

pub use config::{
    CalendarConfig, ConcurrencyConfig, ConfigError, ExportFormat, OutputConfig, ProviderConfig,
    RunId, ScanConfig, ScanWindow,
};
pub use export::{
    export_filename, report_from_json, report_to_json, signals_to_csv, write_report, ExportError,
};
pub use runner::{build_provider, run_and_export, run_scan, RunError, ScanReport, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
        assert_send::<ProviderConfig>();
        assert_sync::<ProviderConfig>();
    }

    #[test]
    fn scan_report_is_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
