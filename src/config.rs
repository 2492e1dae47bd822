use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default model (optional)
    pub model: Option<String>,

    /// Provider identifier ("google" or "stub").
    pub provider: Option<String>,

    /// Relay listening port.
    pub port: Option<u16>,

    /// Relay base URL for the client commands.
    pub api_base: Option<String>,

    /// Deadline per provider call, in seconds.
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("port", &self.port)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("google.api_key", &self.google.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let s = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}
