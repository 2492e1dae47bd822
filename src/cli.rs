use crate::client::Preferences;
use crate::teach::{Level, Style};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI Teacher: tutoring chat relay for the Gemini API
#[derive(Debug, Parser)]
#[command(name = "ai-teacher")]
#[command(version)]
#[command(about = "Tutoring chat relay for the Gemini API", long_about = None)]
pub struct Args {
    /// Config file (default: $AI_TEACHER_HOME/config/config.toml or the XDG config dir)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the relay server (the default when no subcommand is given)
    Serve(ServeArgs),

    /// Ask a running relay one question and print the answer
    Ask(AskArgs),

    /// Run an interactive terminal lesson against a running relay
    #[cfg(feature = "tui")]
    Tui(LessonArgs),
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServeArgs {
    /// Listening port (default: $PORT, config, or 4000)
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Model name (default: $MODEL_ID, config, or gemini-2.0-flash-001)
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Provider: "google" or "stub" (default: $AI_TEACHER_PROVIDER, config, or google)
    #[arg(long = "provider")]
    pub provider: Option<String>,

    /// Deadline for each provider call, in seconds
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct LessonArgs {
    /// Relay base URL (default: $API_BASE, config, or http://localhost:4000)
    #[arg(long = "api-base", value_name = "URL")]
    pub api_base: Option<String>,

    /// Lesson topic (the question itself when omitted)
    #[arg(short = 't', long = "topic")]
    pub topic: Option<String>,

    /// beginner | intermediate | advanced
    #[arg(short = 'l', long = "level", default_value_t = Level::Beginner)]
    pub level: Level,

    /// simple | exam | with-examples
    #[arg(short = 's', long = "style", default_value_t = Style::Simple)]
    pub style: Style,
}

impl LessonArgs {
    pub fn preferences(&self) -> Preferences {
        Preferences {
            topic: self.topic.clone().unwrap_or_default(),
            level: self.level,
            style: self.style,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub lesson: LessonArgs,

    /// Print the answer incrementally as it streams in
    #[arg(long = "stream")]
    pub stream: bool,

    /// Ask for an introduction to --topic instead of a question
    #[arg(long = "teach-me", conflicts_with = "question")]
    pub teach_me: bool,

    /// Question text
    #[arg(value_name = "QUESTION", required_unless_present = "teach_me")]
    pub question: Vec<String>,
}
