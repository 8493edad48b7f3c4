//! Retries for promotions service calls.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::service::PromotionsServiceError;

/// Per-attempt timeout with exponential backoff between attempts.
///
/// Only `Transient` and `Timeout` errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first
    pub max_attempts: u32,

    /// Time allowed for each attempt
    pub attempt_timeout: Duration,

    /// Delay before the second attempt
    pub initial_backoff: Duration,

    /// Upper bound on the delay between attempts
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from the initial backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));

        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or
    /// runs out of attempts.
    ///
    /// # Errors
    ///
    /// Returns the last error, or `PromotionsServiceError::Timeout` if the
    /// last attempt did not finish in time.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, PromotionsServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PromotionsServiceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = timeout(self.attempt_timeout, operation())
                .await
                .unwrap_or(Err(PromotionsServiceError::Timeout));

            match result {
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);

                    warn!(attempt, max_attempts, ?delay, %error, "retrying promotions call");

                    sleep(delay).await;

                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use testresult::TestResult;

    use crate::service::{MockPromotionsService, PromotionsService, records::TenantUuid};

    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(50),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = fast();

        assert_eq!(policy.backoff(1), Duration::from_millis(1));
        assert_eq!(policy.backoff(2), Duration::from_millis(2));
        assert_eq!(policy.backoff(3), Duration::from_millis(4));
        assert_eq!(policy.backoff(10), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() -> TestResult {
        let mut service = MockPromotionsService::new();
        let mut seq = Sequence::new();

        service
            .expect_list_promotions()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(PromotionsServiceError::Transient("busy".to_string())));

        service
            .expect_list_promotions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));

        let tenant = TenantUuid::new();
        let records = fast().run(|| service.list_promotions(tenant)).await?;

        assert!(records.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let mut service = MockPromotionsService::new();

        service
            .expect_list_promotions()
            .times(1)
            .returning(|_| Err(PromotionsServiceError::NotFound));

        let tenant = TenantUuid::new();
        let result = fast().run(|| service.list_promotions(tenant)).await;

        assert!(
            matches!(result, Err(PromotionsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut service = MockPromotionsService::new();

        service
            .expect_list_promotions()
            .times(3)
            .returning(|_| Err(PromotionsServiceError::Transient("down".to_string())));

        let tenant = TenantUuid::new();
        let result = fast().run(|| service.list_promotions(tenant)).await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Transient(_))),
            "expected Transient, got {result:?}"
        );
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy {
            max_attempts: 2,
            ..fast()
        };

        let mut calls = 0;

        let result: Result<(), _> = policy
            .run(|| {
                calls += 1;

                async {
                    sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Timeout)),
            "expected Timeout, got {result:?}"
        );
        assert_eq!(calls, 2, "expected one retry after the first timeout");
    }
}
