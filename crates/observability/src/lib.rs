//! Tracing and logging setup shared by binaries and integration tests.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide tracing with the format from `INVOICEFORGE_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init_with(LogFormat::from_env());
}

/// Initialize process-wide tracing with an explicit output format.
pub fn init_with(format: LogFormat) {
    subscriber::init_with(format);
}
