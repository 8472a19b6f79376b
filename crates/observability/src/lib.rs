//! Shared observability setup for binaries and test harnesses.

pub mod tracing;

/// Initialize process-wide logging. Idempotent.
pub fn init() {
    tracing::init();
}
