use super::{
    ChatChunk, ChunkStream, Content, GenerateRequest, Provider, ProviderError, ProviderFuture,
    ProviderResult,
};
use crate::sse::{SseError, SseParser};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Google Generative Language API (Gemini), authenticated with an API key.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: Url,
}

impl GoogleProvider {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> anyhow::Result<Self> {
        Ok(Self::with_base(http, api_key, Url::parse(DEFAULT_API_BASE)?))
    }

    pub fn with_base(http: reqwest::Client, api_key: Option<String>, api_base: Url) -> Self {
        Self {
            http,
            api_key,
            api_base,
        }
    }

    fn build_url(&self, model: &str, stream: bool) -> ProviderResult<Url> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey("google"))?;

        // Docs: https://ai.google.dev/api/generate-content
        let method = if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let mut url = self
            .api_base
            .join(&format!("v1beta/models/{model}:{method}"))
            .map_err(|e| ProviderError::Request(format!("bad model URL for {model:?}: {e}")))?;

        url.query_pairs_mut().append_pair("key", key);
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }

    async fn post(&self, req: &GenerateRequest, stream: bool) -> ProviderResult<reqwest::Response> {
        let url = self.build_url(&req.model, stream)?;
        let body = GenerateContentRequest::from(req);

        let resp = self
            .http
            .post(url)
            .headers(Self::headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<String> {
        let this = self.clone();

        Box::pin(async move {
            let resp = this.post(&req, false).await?;
            let bytes = resp.bytes().await?;
            let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
                .map_err(|e| ProviderError::Decode(e.to_string()))?;
            Ok(extract_text(&parsed).unwrap_or_default())
        })
    }

    fn stream_generate(&self, req: GenerateRequest) -> ProviderFuture<ChunkStream> {
        let this = self.clone();

        Box::pin(async move {
            let resp = this.post(&req, true).await?;
            tracing::debug!(model = %req.model, "gemini stream opened");

            let (tx, rx) = mpsc::channel::<ProviderResult<ChatChunk>>(64);

            tokio::spawn(async move {
                let mut body = resp.bytes_stream();
                let mut parser = SseParser::new();

                while let Some(item) = body.next().await {
                    let bytes = match item {
                        Ok(b) => b,
                        Err(e) => {
                            let _ = tx.send(Err(e.into())).await;
                            return;
                        }
                    };

                    for ev in parser.push(&bytes) {
                        if !forward(&tx, ev).await {
                            return;
                        }
                    }
                }

                if let Some(ev) = parser.finish() {
                    forward(&tx, ev).await;
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChunkStream)
        })
    }
}

/// Push one SSE payload downstream; `false` once the stream should stop.
async fn forward(tx: &mpsc::Sender<ProviderResult<ChatChunk>>, ev: Result<String, SseError>) -> bool {
    let chunk = ev
        .map_err(|e| ProviderError::Decode(e.to_string()))
        .and_then(|data| decode_chunk(&data));
    match chunk {
        Ok(Some(chunk)) => tx.send(Ok(chunk)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

/// Decode one SSE payload; `None` for keep-alives and text-less candidates.
fn decode_chunk(data: &str) -> ProviderResult<Option<ChatChunk>> {
    if data.trim().is_empty() {
        return Ok(None);
    }
    let parsed: GenerateContentResponse =
        serde_json::from_str(data).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(extract_text(&parsed).map(|text| ChatChunk { text }))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
}

impl From<&GenerateRequest> for GenerateContentRequest {
    fn from(req: &GenerateRequest) -> Self {
        let system_instruction = (!req.system_instruction.is_empty()).then(|| WireContent {
            role: None,
            parts: vec![Part {
                text: Some(req.system_instruction.clone()),
            }],
        });

        Self {
            system_instruction,
            contents: req.contents.iter().map(WireContent::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl From<&Content> for WireContent {
    fn from(c: &Content) -> Self {
        Self {
            role: Some(c.role.as_str().to_string()),
            parts: vec![Part {
                text: Some(c.text.clone()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn extract_text(r: &GenerateContentResponse) -> Option<String> {
    // Concatenate all text parts of the first candidate.
    let content = r.candidates.first()?.content.as_ref()?;
    let out: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
