mod app;
mod cli;
mod client;
mod config;
mod paths;
mod provider;
mod relay;
mod sse;
mod teach;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let config_path = args.config.clone().or_else(paths::config_file);
    let cfg = match &config_path {
        Some(path) => config::Config::load_optional(path)?,
        None => None,
    };
    tracing::debug!(?config_path, ?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    match args.cmd {
        None => app::cmd_serve(&http, cfg.as_ref(), cli::ServeArgs::default()).await,
        Some(cli::Command::Serve(serve)) => app::cmd_serve(&http, cfg.as_ref(), serve).await,
        Some(cli::Command::Ask(ask)) => app::cmd_ask(&http, cfg.as_ref(), ask).await,
        #[cfg(feature = "tui")]
        Some(cli::Command::Tui(lesson)) => tui::run_tui(&http, cfg.as_ref(), lesson).await,
    }
}
