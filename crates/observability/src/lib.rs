//! Process-wide tracing/logging setup shared by callgrid processes and test harnesses.

/// Initialize process-wide observability (tracing/logging).
///
/// The output format comes from `CALLGRID_LOG_FORMAT` (`json` or `pretty`,
/// default `json`). Safe to call multiple times; later calls are no-ops.
pub fn init() {
    self::tracing::init();
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LogFormat, UnknownLogFormat, init_with};
