#[cfg(feature = "google")]
pub mod google;
pub mod stub;
mod timed;
mod types;

pub use timed::TimedProvider;
pub use types::{
    ChatChunk, ChunkStream, Content, GenerateRequest, Provider, ProviderError, ProviderFuture,
    ProviderResult, Role,
};
