use super::{
    ChatChunk, ChunkStream, GenerateRequest, Provider, ProviderError, ProviderFuture,
    ProviderResult,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone)]
enum Script {
    /// Canned lesson echoing the request.
    Echo,
    #[cfg(test)]
    Chunks(Vec<String>),
}

/// Offline provider that drips text with a fixed delay between chunks.
///
/// `--provider stub` serves the echo lesson; tests script exact chunks and
/// failures.
#[derive(Debug, Clone)]
pub struct StubProvider {
    script: Script,
    failure: Option<String>,
    delay: Duration,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            script: Script::Echo,
            failure: None,
            delay: Duration::from_millis(120),
        }
    }

    /// Yield exactly these chunks, without delay.
    #[cfg(test)]
    pub fn scripted<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::Chunks(chunks.into_iter().map(Into::into).collect()),
            failure: None,
            delay: Duration::ZERO,
        }
    }

    /// Fail with `message` once the scripted chunks are spent.
    /// One-shot generation fails straight away.
    #[cfg(test)]
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    #[cfg(test)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn chunks_for(&self, req: &GenerateRequest) -> Vec<String> {
        match &self.script {
            #[cfg(test)]
            Script::Chunks(chunks) => chunks.clone(),
            Script::Echo => {
                let asked = req
                    .contents
                    .first()
                    .map(|c| c.text.as_str())
                    .unwrap_or_default();
                vec![
                    format!("[stub provider]\nmodel: {}\n\n", req.model),
                    "You asked: ".to_string(),
                    asked.to_string(),
                    "\n\n".to_string(),
                    "(Offline lesson; use the google provider for real answers.)".to_string(),
                ]
            }
        }
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<String> {
        let chunks = self.chunks_for(&req);
        let failure = self.failure.clone();
        let delay = self.delay;

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(ProviderError::Upstream(message)),
                None => Ok(chunks.concat()),
            }
        })
    }

    fn stream_generate(&self, req: GenerateRequest) -> ProviderFuture<ChunkStream> {
        let chunks = self.chunks_for(&req);
        let failure = self.failure.clone();
        let delay = self.delay;

        Box::pin(async move {
            let (tx, rx) = mpsc::channel::<ProviderResult<ChatChunk>>(32);

            tokio::spawn(async move {
                for text in chunks {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if tx.send(Ok(ChatChunk { text })).await.is_err() {
                        return;
                    }
                }
                if let Some(message) = failure {
                    let _ = tx.send(Err(ProviderError::Upstream(message))).await;
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChunkStream)
        })
    }
}
