use crate::provider::{GenerateRequest, Provider, ProviderError};
use crate::teach::RelayEvent;
use futures_core::Stream;
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Drive one provider stream and translate it into relay events.
///
/// Non-empty chunks become deltas in arrival order. The stream always ends
/// with exactly one terminal event: `done` after exhaustion, `error` on the
/// first failure (opening included).
pub fn relay_events(
    provider: Arc<dyn Provider>,
    req: GenerateRequest,
) -> impl Stream<Item = RelayEvent> + Send + 'static {
    async_stream::stream! {
        let mut chunks = match provider.stream_generate(req).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!(error = %e, "failed to open provider stream");
                yield failure(&e);
                return;
            }
        };

        let mut deltas = 0usize;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) if chunk.text.is_empty() => {}
                Ok(chunk) => {
                    deltas += 1;
                    yield RelayEvent::delta(chunk.text);
                }
                Err(e) => {
                    tracing::error!(error = %e, deltas, "provider stream failed");
                    yield failure(&e);
                    return;
                }
            }
        }

        tracing::debug!(deltas, "provider stream finished");
        yield RelayEvent::done();
    }
}

fn failure(e: &ProviderError) -> RelayEvent {
    if e.is_timeout() {
        RelayEvent::error(RelayEvent::STREAM_TIMEOUT)
    } else {
        RelayEvent::error(RelayEvent::STREAM_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::StubProvider;
    use crate::provider::{ChunkStream, ProviderFuture, TimedProvider};
    use std::time::Duration;

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "m".to_string(),
            system_instruction: String::new(),
            contents: Vec::new(),
        }
    }

    async fn run(provider: impl Provider + 'static) -> Vec<RelayEvent> {
        relay_events(Arc::new(provider), request()).collect().await
    }

    fn assert_single_terminal_last(events: &[RelayEvent]) {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "{events:?}");
        assert!(events.last().is_some_and(RelayEvent::is_terminal), "{events:?}");
    }

    struct Unreachable;

    impl Provider for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        fn generate(&self, _req: GenerateRequest) -> ProviderFuture<String> {
            Box::pin(async { Err(ProviderError::Upstream("connection refused".into())) })
        }

        fn stream_generate(&self, _req: GenerateRequest) -> ProviderFuture<ChunkStream> {
            Box::pin(async { Err(ProviderError::Upstream("connection refused".into())) })
        }
    }

    #[tokio::test]
    async fn chunks_become_deltas_then_done() {
        let events = run(StubProvider::scripted(["Hel", "lo"])).await;
        assert_eq!(
            events,
            vec![RelayEvent::delta("Hel"), RelayEvent::delta("lo"), RelayEvent::done()]
        );
        assert_single_terminal_last(&events);
    }

    #[tokio::test]
    async fn empty_chunks_are_skipped() {
        let events = run(StubProvider::scripted(["", "a", ""])).await;
        assert_eq!(events, vec![RelayEvent::delta("a"), RelayEvent::done()]);
    }

    #[tokio::test]
    async fn empty_stream_still_terminates() {
        let events = run(StubProvider::scripted(Vec::<String>::new())).await;
        assert_eq!(events, vec![RelayEvent::done()]);
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error_only() {
        let events = run(StubProvider::scripted(["partial"]).failing_with("reset")).await;
        assert_eq!(
            events,
            vec![RelayEvent::delta("partial"), RelayEvent::error("GenAI stream error")]
        );
        assert_single_terminal_last(&events);
    }

    #[tokio::test]
    async fn failure_to_open_ends_with_error_only() {
        let events = run(Unreachable).await;
        assert_eq!(events, vec![RelayEvent::error("GenAI stream error")]);
    }

    #[tokio::test]
    async fn stalled_provider_reports_timeout() {
        let slow = StubProvider::scripted(["never"]).with_delay(Duration::from_secs(5));
        let events = run(TimedProvider::new(Arc::new(slow), Duration::from_millis(20))).await;
        assert_eq!(events, vec![RelayEvent::error("GenAI stream timeout")]);
    }
}
