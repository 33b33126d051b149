//! Timeout helpers
//!
//! Every connector call in the pipeline runs under [`with_timeout`]; expiry
//! surfaces as `ResearchError::Timeout` and the caller maps it onto its
//! phase error.
//!
//! ```ignore
//! let data = with_timeout(
//!     config.connectors.collection_timeout(),
//!     collector.collect(&plan),
//!     "data collection",
//! )
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{ResearchError, Result};

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ResearchError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, ResearchError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ResearchError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            ResearchError::Timeout { ref operation, .. } if operation == "slow operation"
        ));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_timeout(
            Duration::from_secs(1),
            async { Err(ResearchError::Collection("source down".into())) },
            "collect",
        )
        .await;
        assert!(matches!(result, Err(ResearchError::Collection(_))));
    }
}
