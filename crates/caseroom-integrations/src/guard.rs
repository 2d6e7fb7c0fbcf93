//! Time-bounded collaborator calls with local recovery.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::IntegrationError;

/// Awaits `call` for at most `limit`. On failure or timeout the error is
/// logged and `fallback` supplies the value instead.
pub async fn with_fallback<T, F>(
    collaborator: &'static str,
    limit: Duration,
    call: F,
    fallback: impl FnOnce() -> T,
) -> T
where
    F: Future<Output = Result<T, IntegrationError>>,
{
    let error = match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => return value,
        Ok(Err(err)) => err,
        Err(_) => IntegrationError::Timeout(limit),
    };
    warn!(collaborator, error = %error, "collaborator call failed, using fallback");
    fallback()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_fallback_returns_successful_value() {
        // Act
        let value = with_fallback(
            "analysis",
            Duration::from_secs(1),
            async { Ok::<_, IntegrationError>(7) },
            || 0,
        )
        .await;

        // Assert
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_fallback_recovers_from_error() {
        let value = with_fallback(
            "analysis",
            Duration::from_secs(1),
            async { Err::<i32, _>(IntegrationError::Parse("garbled".into())) },
            || 75,
        )
        .await;

        assert_eq!(value, 75);
    }

    #[tokio::test]
    async fn test_with_fallback_recovers_from_timeout() {
        // Arrange
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, IntegrationError>("live")
        };

        // Act
        let value = with_fallback("incident", Duration::from_millis(20), slow, || "fallback").await;

        // Assert
        assert_eq!(value, "fallback");
    }
}
