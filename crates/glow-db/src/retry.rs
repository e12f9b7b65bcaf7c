//! # Transaction Retry
//!
//! Re-runs a whole ledger transaction attempt when SQLite reports a write
//! conflict.
//!
//! ## Attempt Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      with_retry(policy, op, f)                          │
//! │                                                                         │
//! │  attempt 1: BEGIN → reads → writes → COMMIT ── ok ──► return            │
//! │       │                                                                 │
//! │       └── DbError::Busy (another writer committed first)               │
//! │             │  tx dropped → ROLLBACK, nothing persisted                │
//! │             ▼                                                           │
//! │  sleep(backoff) → attempt 2 re-reads fresh state from scratch          │
//! │       │                                                                 │
//! │       └── ... max_attempts reached ──► DbError::TransactionConflict    │
//! │                                                                         │
//! │  Any other error (NotFound, Validation, Overpayment, ...) returns      │
//! │  immediately.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The closure must not perform side effects outside the transaction: it may
//! run several times.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};

/// Retry budget for ledger transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Adds up to 25% jitter so contending writers spread out.
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            ..Default::default()
        }
    }

    /// One attempt, no retries.
    pub fn no_retry() -> Self {
        Self::with_max_attempts(1)
    }

    /// Many short retries, for heavily contended test databases.
    pub fn patient() -> Self {
        RetryPolicy {
            max_attempts: 50,
            initial_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(50),
            backoff_multiplier: 1.5,
            add_jitter: true,
        }
    }

    fn backoff_duration(&self, retry: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(retry as i32);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;

        let mut duration = Duration::from_millis(backoff_ms);

        if self.add_jitter {
            let jitter = (backoff_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            duration += Duration::from_millis(jitter);
        }

        duration
    }
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent.
///
/// ## Example
/// ```rust,ignore
/// let sale_id = with_retry(&policy, "record_sale", || self.try_record_sale(&draft)).await?;
/// ```
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, f: F) -> DbResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "Transaction committed after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() => {
                if attempt >= max_attempts {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %err,
                        "Transaction retry budget exhausted"
                    );
                    return Err(DbError::TransactionConflict {
                        operation: operation.to_string(),
                        attempts: attempt,
                    });
                }

                let backoff = policy.backoff_duration(attempt - 1);
                warn!(
                    operation,
                    attempt,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "Transaction conflicted, retrying"
                );
                sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    #[test]
    fn test_jitter_stays_within_quarter_of_backoff() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(400),
            max_backoff: Duration::from_secs(10),
            ..Default::default()
        };

        for _ in 0..50 {
            let delay = policy.backoff_duration(0);
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast(5), "record_sale", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(DbError::Busy("database is locked".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_becomes_transaction_conflict() {
        let calls = AtomicU32::new(0);

        let result: DbResult<()> = with_retry(&fast(4), "record_payment", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::Busy("snapshot".to_string()))
        })
        .await;

        match result {
            Err(DbError::TransactionConflict {
                operation,
                attempts,
            }) => {
                assert_eq!(operation, "record_payment");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected TransactionConflict, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);

        let result: DbResult<()> = with_retry(&fast(5), "record_sale", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::not_found("Customer", "C1"))
        })
        .await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(0), "assign", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            add_jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.backoff_duration(0), Duration::from_millis(20));
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(40));
        assert_eq!(policy.backoff_duration(20), Duration::from_secs(1));
    }
}
