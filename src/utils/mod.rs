//! Utilities module for logging and error handling
//!
//! This module provides:
//! - Structured logging with tracing
//! - Error handling types

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{InferenceError, Result, ResultExt};
pub use logging::{init_logging, LogConfig, LogLevel};

/// Format a duration in milliseconds in a human-readable way
pub fn format_millis(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(12.34), "12.3 ms");
        assert_eq!(format_millis(1500.0), "1.50 s");
    }
}
