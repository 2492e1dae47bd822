use crate::cli::{AskArgs, ServeArgs};
use crate::client::{ClientError, RelayClient, Transcript};
use crate::provider::{Provider, TimedProvider};
use crate::relay::{self, RelayState};
use crate::teach::{RelayEvent, TeachRequest};
use crate::{config, provider};
use anyhow::Context;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Relay settings after layering flags, environment, config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub port: u16,
    pub model: String,
    pub provider: String,
    pub timeout: Duration,
}

impl ServeSettings {
    pub fn resolve(args: &ServeArgs, cfg: Option<&config::Config>) -> anyhow::Result<Self> {
        Self::resolve_with(args, cfg, env_var)
    }

    fn resolve_with(
        args: &ServeArgs,
        cfg: Option<&config::Config>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let port = match (args.port, env("PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT {raw:?}"))?,
            (None, None) => cfg.and_then(|c| c.port).unwrap_or(DEFAULT_PORT),
        };

        let model = args
            .model
            .clone()
            .or_else(|| env("MODEL_ID"))
            .or_else(|| cfg.and_then(|c| c.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let provider = args
            .provider
            .clone()
            .or_else(|| env("AI_TEACHER_PROVIDER"))
            .or_else(|| cfg.and_then(|c| c.provider.clone()))
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

        let timeout_secs = match (args.timeout_secs, env("AI_TEACHER_TIMEOUT_SECS")) {
            (Some(secs), _) => secs,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid AI_TEACHER_TIMEOUT_SECS {raw:?}"))?,
            (None, None) => cfg
                .and_then(|c| c.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            anyhow::bail!("provider timeout must be at least one second");
        }

        Ok(Self {
            port,
            model,
            provider,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Relay base URL for the client commands.
pub fn api_base(flag: Option<&str>, cfg: Option<&config::Config>) -> String {
    flag.map(str::to_string)
        .or_else(|| env_var("API_BASE"))
        .or_else(|| cfg.and_then(|c| c.api_base.clone()))
        .unwrap_or_else(|| crate::client::DEFAULT_API_BASE.to_string())
}

pub fn build_provider(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    provider_name: &str,
) -> anyhow::Result<Arc<dyn Provider>> {
    match provider_name {
        "google" => {
            #[cfg(feature = "google")]
            {
                let api_key = env_var("GOOGLE_API_KEY")
                    .or_else(|| env_var("GEMINI_API_KEY"))
                    .or_else(|| cfg.and_then(|c| c.google.api_key.clone()));
                if api_key.is_none() {
                    tracing::warn!(
                        "no Google API key found (set GOOGLE_API_KEY or config.toml google.api_key); \
                         provider calls will fail"
                    );
                }

                let p = provider::google::GoogleProvider::new(http.clone(), api_key)?;
                Ok(Arc::new(p))
            }
            #[cfg(not(feature = "google"))]
            {
                let _ = http;
                let _ = cfg;
                anyhow::bail!("google provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::new())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

pub async fn cmd_serve(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    args: ServeArgs,
) -> anyhow::Result<()> {
    let settings = ServeSettings::resolve(&args, cfg)?;
    tracing::debug!(?settings, "resolved relay settings");

    let inner = build_provider(http, cfg, &settings.provider)?;
    let provider: Arc<dyn Provider> = Arc::new(TimedProvider::new(inner, settings.timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    relay::serve(addr, RelayState::new(provider, settings.model)).await
}

pub async fn cmd_ask(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    args: AskArgs,
) -> anyhow::Result<()> {
    let client = RelayClient::new(http.clone(), &api_base(args.lesson.api_base.as_deref(), cfg))?;
    tracing::debug!(base = %client.base(), "asking relay");

    let mut transcript = Transcript::new(args.lesson.preferences());
    let submission = if args.teach_me {
        transcript.teach_me()
    } else {
        transcript.submit(&args.question.join(" "))
    };
    let Some(submission) = submission else {
        anyhow::bail!("No question provided. Try: ai-teacher ask \"Explain recursion\"");
    };
    let seq = submission.seq;

    if !args.stream {
        let (seq, outcome) = submission
            .send(&client)
            .await
            .context("question was cancelled")?;
        let answer = outcome.context("teach request failed")?;
        transcript.complete::<ClientError>(seq, Ok(answer));
        if let Some(turn) = transcript.turns().last() {
            println!("{}", turn.content);
        }
        return Ok(());
    }

    let answer = print_stream(&client, &submission.request).await?;
    transcript.complete::<ClientError>(seq, Ok(answer));
    tracing::debug!(turns = transcript.turns().len(), "lesson finished");

    Ok(())
}

/// Print deltas as they arrive; returns the whole answer.
async fn print_stream(client: &RelayClient, req: &TeachRequest) -> anyhow::Result<String> {
    let mut events = client
        .teach_stream(req)
        .await
        .context("relay failed to start streaming")?;

    let mut answer = String::new();
    let mut out = std::io::stdout();
    while let Some(event) = events.next().await {
        match event.context("stream event error")? {
            RelayEvent::Delta { delta } => {
                print!("{delta}");
                out.flush().ok();
                answer.push_str(&delta);
            }
            RelayEvent::Done { .. } => break,
            RelayEvent::Error { error } => {
                println!();
                anyhow::bail!("relay reported: {error}");
            }
        }
    }
    println!();

    Ok(answer)
}
