use super::{relay_events, ApiError, RelayState};
use crate::teach::{shaper, TeachAnswer, TeachRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Version};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_stream::StreamExt;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `POST /api/teach`: one complete answer.
pub async fn teach(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<TeachAnswer>, ApiError> {
    let req = TeachRequest::decode(&body)?;
    tracing::debug!(level = %req.level, style = %req.style, history = req.history.len(), "teach");

    let prompt = shaper::shape(&req).into_request(&state.model);
    let text = state.provider.generate(prompt).await?;
    Ok(Json(TeachAnswer::new(text)))
}

/// `POST /api/teach/stream`: incremental deltas over server-sent events.
pub async fn teach_stream(
    State(state): State<RelayState>,
    version: Version,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req = TeachRequest::decode(&body)?;
    tracing::debug!(level = %req.level, style = %req.style, history = req.history.len(), "teach stream");

    let prompt = shaper::shape(&req).into_request(&state.model);
    let events = relay_events(state.provider.clone(), prompt).map(|ev| Event::default().json_data(ev));

    // `Sse` sets `text/event-stream` and `no-cache`.
    let mut response = Sse::new(events).into_response();
    // Connection-specific headers are forbidden on HTTP/2 and later.
    if matches!(version, Version::HTTP_10 | Version::HTTP_11) {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use crate::provider::stub::StubProvider;
    use crate::provider::{
        ChunkStream, GenerateRequest, Provider, ProviderFuture, Role, TimedProvider,
    };
    use crate::relay::{router, RelayState};
    use crate::sse::SseParser;
    use crate::teach::RelayEvent;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode, Version};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Wraps a stub and keeps every prompt it receives.
    #[derive(Clone)]
    struct Recording {
        inner: StubProvider,
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    impl Recording {
        fn new(inner: StubProvider) -> Self {
            Self {
                inner,
                seen: Arc::default(),
            }
        }

        fn last(&self) -> GenerateRequest {
            self.seen.lock().unwrap().last().cloned().expect("no provider call")
        }
    }

    impl Provider for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn generate(&self, req: GenerateRequest) -> ProviderFuture<String> {
            self.seen.lock().unwrap().push(req.clone());
            self.inner.generate(req)
        }

        fn stream_generate(&self, req: GenerateRequest) -> ProviderFuture<ChunkStream> {
            self.seen.lock().unwrap().push(req.clone());
            self.inner.stream_generate(req)
        }
    }

    fn state(provider: impl Provider + 'static) -> RelayState {
        RelayState::new(Arc::new(provider), "gemini-test")
    }

    async fn post(state: RelayState, uri: &str, body: Value) -> Response {
        post_raw(state, uri, body.to_string()).await
    }

    async fn post_raw(state: RelayState, uri: &str, body: String) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        router(state).oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn stream_events(response: Response) -> (String, Vec<RelayEvent>) {
        let raw = String::from_utf8(body_bytes(response).await).unwrap();
        let mut parser = SseParser::new();
        let events = parser
            .push(raw.as_bytes())
            .into_iter()
            .map(|data| serde_json::from_str::<RelayEvent>(&data.unwrap()).unwrap())
            .collect();
        (raw, events)
    }

    fn history(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { "user" } else { "assistant" };
                json!({ "role": role, "content": format!("turn {i}") })
            })
            .collect()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(state(StubProvider::new())).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn teach_returns_answer() {
        let provider = Recording::new(StubProvider::scripted(["Recursion is ", "self-reference."]));
        let response = post(
            state(provider.clone()),
            "/api/teach",
            json!({ "topic": "", "question": "Explain recursion", "level": "beginner", "style": "simple" }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "answer": "Recursion is self-reference." })
        );

        let sent = provider.last();
        assert_eq!(sent.model, "gemini-test");
        assert!(sent.system_instruction.contains("beginner"));
        assert!(sent.system_instruction.contains("simple"));
        assert_eq!(sent.contents.len(), 1);
        assert_eq!(sent.contents[0].role, Role::User);
        assert_eq!(
            sent.contents[0].text,
            "Topic: Explain recursion. Question: Explain recursion"
        );
    }

    #[tokio::test]
    async fn teach_forwards_only_last_twelve_turns() {
        let provider = Recording::new(StubProvider::scripted(["ok"]));
        let response = post(
            state(provider.clone()),
            "/api/teach",
            json!({ "topic": "Graphs", "question": "BFS?", "history": history(15) }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let sent = provider.last();
        assert_eq!(sent.contents.len(), 13);
        assert_eq!(sent.contents[1].text, "turn 3");
        assert_eq!(sent.contents[1].role, Role::Model);
        assert_eq!(sent.contents[12].text, "turn 14");
        assert_eq!(sent.contents[12].role, Role::User);
    }

    #[tokio::test]
    async fn empty_provider_text_becomes_no_answer() {
        let response = post(
            state(StubProvider::scripted(Vec::<String>::new())),
            "/api/teach",
            json!({ "question": "anything" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "answer": "No answer" }));
    }

    #[tokio::test]
    async fn provider_failure_is_generic_500() {
        let response = post(
            state(StubProvider::scripted(["x"]).failing_with("quota exhausted")),
            "/api/teach",
            json!({ "question": "q" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": "GenAI error" }));
    }

    #[tokio::test]
    async fn provider_timeout_is_504() {
        let slow = StubProvider::scripted(["late"]).with_delay(Duration::from_secs(5));
        let timed = TimedProvider::new(Arc::new(slow), Duration::from_millis(20));
        let response = post(state(timed), "/api/teach", json!({ "question": "q" })).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await, json!({ "error": "GenAI timeout" }));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_provider() {
        let provider = Recording::new(StubProvider::scripted(["x"]));
        for uri in ["/api/teach", "/api/teach/stream"] {
            let response = post(state(provider.clone()), uri, json!({ "level": "expert" })).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert!(body["error"].as_str().unwrap().starts_with("invalid teach request"));
        }
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_relays_deltas_then_done() {
        let response = post(
            state(StubProvider::scripted(["Hel", "lo"])),
            "/api/teach/stream",
            json!({ "topic": "greetings", "question": "say hello" }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");

        let (raw, events) = stream_events(response).await;
        assert_eq!(
            raw,
            "data: {\"delta\":\"Hel\"}\n\ndata: {\"delta\":\"lo\"}\n\ndata: {\"done\":true}\n\n"
        );
        assert_eq!(
            events,
            vec![RelayEvent::delta("Hel"), RelayEvent::delta("lo"), RelayEvent::done()]
        );
    }

    #[tokio::test]
    async fn stream_over_http2_omits_connection_header() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/teach/stream")
            .version(Version::HTTP_2)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "question": "q" }).to_string()))
            .unwrap();
        let response = router(state(StubProvider::scripted(["x"])))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONNECTION).is_none());
        let (_, events) = stream_events(response).await;
        assert_eq!(events, vec![RelayEvent::delta("x"), RelayEvent::done()]);
    }

    #[tokio::test]
    async fn empty_body_uses_defaults() {
        let provider = Recording::new(StubProvider::scripted(["hello"]));
        let response = post_raw(state(provider.clone()), "/api/teach", String::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "answer": "hello" }));

        let sent = provider.last();
        assert_eq!(
            sent.contents[0].text,
            "Topic: general learning. Question: teach this topic simply."
        );
    }

    #[tokio::test]
    async fn stream_uses_the_same_personalized_directive() {
        let provider = Recording::new(StubProvider::scripted(["x"]));
        let response = post(
            state(provider.clone()),
            "/api/teach/stream",
            json!({ "question": "q", "level": "advanced", "style": "with-examples", "history": history(15) }),
        )
        .await;
        stream_events(response).await;

        let sent = provider.last();
        assert!(sent.system_instruction.contains("Target level: advanced. Style: with-examples."));
        assert_eq!(sent.contents.len(), 13);
    }

    #[tokio::test]
    async fn stream_failure_emits_single_error_event() {
        let response = post(
            state(StubProvider::scripted(Vec::<String>::new()).failing_with("boom")),
            "/api/teach/stream",
            json!({ "question": "q" }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let (raw, events) = stream_events(response).await;
        assert_eq!(raw, "data: {\"error\":\"GenAI stream error\"}\n\n");
        assert_eq!(events, vec![RelayEvent::error("GenAI stream error")]);
    }

    #[tokio::test]
    async fn cors_mirrors_the_ui_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/teach")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = router(state(StubProvider::new())).oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
