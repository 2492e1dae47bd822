use super::{ChunkStream, GenerateRequest, Provider, ProviderError, ProviderFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Puts a deadline on every call of the wrapped provider.
///
/// One-shot calls get the deadline end to end. Streams get it for opening and
/// again for each wait on the next chunk, so a long but steadily progressing
/// answer is never cut off.
#[derive(Clone)]
pub struct TimedProvider {
    inner: Arc<dyn Provider>,
    deadline: Duration,
}

impl TimedProvider {
    pub fn new(inner: Arc<dyn Provider>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

impl Provider for TimedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<String> {
        let call = self.inner.generate(req);
        let deadline = self.deadline;

        Box::pin(async move {
            tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| ProviderError::Timeout(deadline))?
        })
    }

    fn stream_generate(&self, req: GenerateRequest) -> ProviderFuture<ChunkStream> {
        let open = self.inner.stream_generate(req);
        let deadline = self.deadline;

        Box::pin(async move {
            let stream = tokio::time::timeout(deadline, open)
                .await
                .map_err(|_| ProviderError::Timeout(deadline))??;

            let timed = stream
                .timeout(deadline)
                .map(move |item| item.unwrap_or_else(|_| Err(ProviderError::Timeout(deadline))));
            Ok(Box::pin(timed) as ChunkStream)
        })
    }
}
