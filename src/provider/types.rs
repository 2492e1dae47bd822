use futures_core::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Side of the conversation a provider turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn of the prompt as the provider sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,

    /// System-level instruction conditioning the whole exchange.
    pub system_instruction: String,

    /// Ordered turns, oldest first.
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone)]
pub struct ChatChunk {
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured for the {0} provider")]
    MissingApiKey(&'static str),

    #[error("invalid provider request: {0}")]
    Request(String),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider call exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("provider failed: {0}")]
    Upstream(String),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

pub type ChunkStream = BoxStream<'static, ProviderResult<ChatChunk>>;

pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send>>;

/// Provider interface.
///
/// Both calls take the full prompt by value and return `'static` futures so a
/// shared `Arc<dyn Provider>` can be driven from any request handler.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Generate a complete answer in one shot.
    fn generate(&self, req: GenerateRequest) -> ProviderFuture<String>;

    /// Start streaming an answer as incremental chunks.
    fn stream_generate(&self, req: GenerateRequest) -> ProviderFuture<ChunkStream>;
}
