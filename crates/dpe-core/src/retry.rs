//! Validated retry executor
//!
//! Runs `produce → validate` up to `max_attempts` times:
//!
//! ```text
//! Attempting(n) ──ok + passed──────────▶ Success
//!      │
//!      └─raised / failed validation──▶ Attempting(n + 1)   (n < max)
//!                                  └─▶ Exhausted           (n = max)
//! ```
//!
//! Attempts are independent. The only thing carried forward is the
//! [`Attempt::feedback`] string, which callers may ignore.

use crate::error::RetryExhausted;
use dpe_artifact::Validation;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, error, warn};

/// Default number of attempts per cycle
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Information handed to each attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    /// Why the previous attempt failed, if there was one
    pub feedback: Option<String>,
}

/// Value produced by a successful attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Bounded retry of a produce-and-validate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Policy with `max_attempts` (at least one attempt is always made)
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Attempt bound
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the cycle until an attempt produces a value that validates
    ///
    /// # Errors
    /// Returns [`RetryExhausted`] with the last raised error and last
    /// validation reason when every attempt fails
    pub async fn run<T, E, P, Fut, V>(
        &self,
        mut produce: P,
        mut validate: V,
    ) -> Result<Attempted<T>, RetryExhausted<E>>
    where
        P: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        V: FnMut(&T) -> Validation,
        E: Display,
    {
        let mut last_error = None;
        let mut last_validation = None;
        let mut feedback = None;

        for number in 1..=self.max_attempts {
            match produce(Attempt { number, feedback: feedback.take() }).await {
                Ok(value) => match validate(&value) {
                    Validation::Passed => {
                        debug!(attempt = number, "attempt validated");
                        return Ok(Attempted {
                            value,
                            attempts: number,
                        });
                    }
                    Validation::Failed(reason) => {
                        warn!(attempt = number, reason = %reason, "attempt failed validation");
                        feedback = Some(format!("validation failed: {reason}"));
                        last_validation = Some(reason);
                    }
                },
                Err(e) => {
                    warn!(attempt = number, error = %e, "attempt raised");
                    feedback = Some(format!("error: {e}"));
                    last_error = Some(e);
                }
            }
        }

        error!(attempts = self.max_attempts, "retries exhausted");
        Err(RetryExhausted {
            attempts: self.max_attempts,
            last_error,
            last_validation,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn first_valid_attempt_wins() {
        let calls = Cell::new(0);
        let out = RetryPolicy::new(3)
            .run(
                |_| {
                    calls.set(calls.get() + 1);
                    async { Ok::<_, String>(7) }
                },
                |_| Validation::Passed,
            )
            .await
            .unwrap();
        assert_eq!(out, Attempted { value: 7, attempts: 1 });
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn always_raising_exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let err = RetryPolicy::new(3)
            .run(
                |attempt: Attempt| {
                    calls.set(calls.get() + 1);
                    async move { Err::<(), _>(format!("boom {}", attempt.number)) }
                },
                |_| Validation::Passed,
            )
            .await
            .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error.as_deref(), Some("boom 3"));
        assert_eq!(err.last_validation, None);
    }

    #[tokio::test]
    async fn validation_failure_then_success() {
        let out = RetryPolicy::new(3)
            .run(
                |attempt: Attempt| async move { Ok::<_, String>(attempt) },
                |attempt: &Attempt| {
                    if attempt.number < 3 {
                        Validation::failed("not yet")
                    } else {
                        Validation::Passed
                    }
                },
            )
            .await
            .unwrap();
        assert_eq!(out.attempts, 3);
        assert_eq!(
            out.value.feedback.as_deref(),
            Some("validation failed: not yet")
        );
    }

    #[tokio::test]
    async fn keeps_last_of_each_failure_kind() {
        let err = RetryPolicy::new(2)
            .run(
                |attempt: Attempt| async move {
                    if attempt.number == 1 {
                        Ok(())
                    } else {
                        Err("raised".to_string())
                    }
                },
                |_: &()| Validation::failed("bad document"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.last_error.as_deref(), Some("raised"));
        assert_eq!(err.last_validation.as_deref(), Some("bad document"));
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }
}
