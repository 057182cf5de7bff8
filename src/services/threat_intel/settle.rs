// Per-branch isolation for provider fan-out
// Every branch resolves to a ProviderResult; nothing short-circuits the join

use std::{future::Future, time::Duration};

use crate::services::providers::ProviderError;

/// Outcome of one provider call within a scan
#[derive(Debug)]
pub struct ProviderResult<T> {
    pub provider_name: &'static str,
    pub outcome: Result<T, ProviderError>,
}

impl<T> ProviderResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn as_option(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The payload, or `None` as the placeholder for a failed provider
    pub fn into_option(self) -> Option<T> {
        self.outcome.ok()
    }
}

/// Run one provider call under a deadline and capture its outcome.
///
/// Failures are logged here so callers only deal with the placeholder.
pub async fn settle<T, F>(provider: &'static str, deadline: Duration, call: F) -> ProviderResult<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let outcome = match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout { provider }),
    };

    if let Err(error) = &outcome {
        tracing::warn!(provider, error = %error, "Provider call failed");
    }

    ProviderResult {
        provider_name: provider,
        outcome,
    }
}
