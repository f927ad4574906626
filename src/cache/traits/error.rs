//! Cache error trait with categorization and recovery strategies
//!
//! Every fallible cache operation returns `CacheOperationError`. This trait exposes the
//! classification the orchestrator uses to decide whether an error becomes a tier-local
//! miss, a raw-storage fallback, or a surfaced failure.

use std::fmt::Debug;

use super::types_and_enums::{CacheOperationError, ErrorCategory, RecoveryHint};

/// Cache error trait with rich error information
pub trait CacheError: std::error::Error + Send + Sync + Debug + 'static {
    /// Error category for classification
    fn category(&self) -> ErrorCategory;

    /// Retry possibility for automated recovery
    fn is_retryable(&self) -> bool;

    /// Recovery suggestion
    fn recovery_hint(&self) -> RecoveryHint;

    /// Error severity level (0-10, 10 being most severe)
    fn severity(&self) -> u8 {
        match self.category() {
            ErrorCategory::Resource => 6,
            ErrorCategory::Io => 7,
            ErrorCategory::Serialization => 4,
            ErrorCategory::Configuration => 9,
            ErrorCategory::Timing => 4,
            ErrorCategory::Loader => 3,
        }
    }

    /// Suggested backoff time in milliseconds for retryable errors
    fn backoff_time_ms(&self) -> u64 {
        if !self.is_retryable() {
            return 0;
        }

        match self.recovery_hint() {
            RecoveryHint::RetryBackoff => match self.category() {
                ErrorCategory::Io => 500,
                ErrorCategory::Timing => 250,
                ErrorCategory::Loader => 1000,
                _ => 250,
            },
            RecoveryHint::ClearAndRetry => 100,
            _ => 0,
        }
    }

    /// Static description for logs
    fn context(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Resource => "Resource exhaustion - check tier limits",
            ErrorCategory::Io => "Tier backend failed - check storage availability",
            ErrorCategory::Serialization => "Encoding error - value stored raw",
            ErrorCategory::Configuration => "Configuration error - check cache settings",
            ErrorCategory::Timing => "Tier call exceeded its deadline",
            ErrorCategory::Loader => "Prefetch loader failed for a key",
        }
    }
}

impl CacheError for CacheOperationError {
    #[inline(always)]
    fn category(&self) -> ErrorCategory {
        CacheOperationError::category(self)
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::RetryBackoff | RecoveryHint::ClearAndRetry
        )
    }

    #[inline(always)]
    fn recovery_hint(&self) -> RecoveryHint {
        CacheOperationError::recovery_hint(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_for_retryable_errors() {
        let timeout = CacheOperationError::timed_out("tier 1 set");
        assert!(CacheError::is_retryable(&timeout));
        assert_eq!(timeout.backoff_time_ms(), 250);

        let io = CacheOperationError::io_failed("disk full");
        assert_eq!(io.backoff_time_ms(), 500);
        assert_eq!(io.severity(), 7);

        let fatal = CacheOperationError::UnknownTier(4);
        assert!(!CacheError::is_retryable(&fatal));
        assert_eq!(fatal.backoff_time_ms(), 0);
    }
}
