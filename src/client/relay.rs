use crate::sse::SseParser;
use crate::teach::{RelayEvent, TeachAnswer, TeachRequest};
use futures_core::stream::BoxStream;
use reqwest::Url;
use serde::Deserialize;
use tokio_stream::StreamExt;

pub const DEFAULT_API_BASE: &str = "http://localhost:4000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid relay URL {0:?}: {1}")]
    InvalidUrl(String, String),

    #[error("relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay answered HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed relay stream: {0}")]
    Stream(String),

    #[error("relay stream ended without a terminal event")]
    Truncated,
}

pub type EventStream = BoxStream<'static, Result<RelayEvent, ClientError>>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to a running relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base: Url,
}

impl RelayClient {
    pub fn new(http: reqwest::Client, base: &str) -> Result<Self, ClientError> {
        // A trailing slash keeps `join` from dropping a path prefix.
        let normalized = format!("{}/", base.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| ClientError::InvalidUrl(base.to_string(), e.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(path.to_string(), e.to_string()))
    }

    async fn post(&self, path: &str, req: &TeachRequest) -> Result<reqwest::Response, ClientError> {
        let resp = self.http.post(self.endpoint(path)?).json(req).send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// `POST /api/teach`.
    pub async fn teach(&self, req: &TeachRequest) -> Result<String, ClientError> {
        let answer: TeachAnswer = self.post("api/teach", req).await?.json().await?;
        Ok(answer.answer)
    }

    /// `POST /api/teach/stream`.
    ///
    /// Yields deltas followed by the terminal `done` or `error` event, then
    /// ends. A body that closes before a terminal event yields
    /// [`ClientError::Truncated`].
    pub async fn teach_stream(&self, req: &TeachRequest) -> Result<EventStream, ClientError> {
        let resp = self.post("api/teach/stream", req).await?;

        let events = async_stream::stream! {
            let mut body = resp.bytes_stream();
            let mut parser = SseParser::new();

            while let Some(item) = body.next().await {
                let bytes = match item {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(ClientError::Transport(e));
                        return;
                    }
                };
                for data in parser.push(&bytes) {
                    let event = data
                        .map_err(|e| ClientError::Stream(e.to_string()))
                        .and_then(|d| decode_event(&d));
                    let stop = !matches!(&event, Ok(ev) if !ev.is_terminal());
                    yield event;
                    if stop {
                        return;
                    }
                }
            }

            match parser.finish() {
                Some(data) => {
                    let event = data
                        .map_err(|e| ClientError::Stream(e.to_string()))
                        .and_then(|d| decode_event(&d));
                    let terminal = matches!(&event, Ok(ev) if ev.is_terminal());
                    yield event;
                    if !terminal {
                        yield Err(ClientError::Truncated);
                    }
                }
                None => yield Err(ClientError::Truncated),
            }
        };

        Ok(Box::pin(events))
    }
}

fn decode_event(data: &str) -> Result<RelayEvent, ClientError> {
    serde_json::from_str(data).map_err(|e| ClientError::Stream(format!("{e}: {data}")))
}
