pub mod interface;
pub mod openai;

#[cfg(test)]
pub mod mock;

pub use interface::*;
pub use openai::OpenAIProvider;

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Await an upstream call, giving up once `deadline` has elapsed.
///
/// Dropping the call future on expiry also aborts the underlying HTTP request.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    }
}
