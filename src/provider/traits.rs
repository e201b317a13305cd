use async_trait::async_trait;

use super::request::ProviderRequest;
use crate::models::FragmentStream;
use crate::utils::DeepSearchError;

/// A hosted chat API the proxy route can forward to
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streamed completion.
    ///
    /// Returns once the provider has accepted the request, so that rejection
    /// can still be reported as a structured error.
    async fn stream_chat(
        &self,
        api_key: &str,
        request: ProviderRequest,
    ) -> Result<FragmentStream, DeepSearchError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
