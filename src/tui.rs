#![cfg(feature = "tui")]

use crate::cli::LessonArgs;
use crate::client::{ClientError, RelayClient, Transcript};
use crate::teach::{Level, Style as TeachStyle, Turn, TurnRole};
use crate::{app, config};
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use tokio::sync::mpsc;

const HELP: &str =
    "Commands: /topic <t>, /level <l>, /style <s>, /teach, /clear, /quit. Enter sends.";

type Answer = (u64, Result<String, ClientError>);

/// Input line and the status notice shown under the transcript.
struct Ui {
    input: String,
    notice: String,
}

pub async fn run_tui(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    args: LessonArgs,
) -> anyhow::Result<()> {
    let client = RelayClient::new(http.clone(), &app::api_base(args.api_base.as_deref(), cfg))?;
    let mut transcript = Transcript::new(args.preferences());

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let (answer_tx, mut answer_rx) = mpsc::unbounded_channel::<Answer>();

    let mut ui = Ui {
        input: String::new(),
        notice: HELP.to_string(),
    };

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = draw(&mut terminal, &transcript, &ui) {
                    break Err(e);
                }
            }
            Some(ev) = ev_rx.recv() => {
                if let Event::Key(key) = ev {
                    if handle_key(key, &mut ui, &mut transcript, &client, &answer_tx) {
                        break Ok(());
                    }
                }
            }
            Some((seq, outcome)) = answer_rx.recv() => {
                transcript.complete(seq, outcome);
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Returns `true` when the user asked to quit.
fn handle_key(
    key: KeyEvent,
    ui: &mut Ui,
    transcript: &mut Transcript,
    client: &RelayClient,
    answers: &mpsc::UnboundedSender<Answer>,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(c) => ui.input.push(c),
        KeyCode::Backspace => {
            ui.input.pop();
        }
        KeyCode::Enter => {
            let line = std::mem::take(&mut ui.input);
            let submission = match command(line.trim(), ui, transcript) {
                Command::Quit => return true,
                Command::Handled => None,
                Command::TeachMe => transcript.teach_me(),
                Command::Ask => transcript.submit(&line),
            };

            if let Some(submission) = submission {
                let client = client.clone();
                let answers = answers.clone();
                tokio::spawn(async move {
                    if let Some(answer) = submission.send(&client).await {
                        let _ = answers.send(answer);
                    }
                });
            }
        }
        _ => {}
    }

    false
}

enum Command {
    Quit,
    Handled,
    TeachMe,
    Ask,
}

fn command(line: &str, ui: &mut Ui, transcript: &mut Transcript) -> Command {
    let Some(cmd) = line.strip_prefix('/') else {
        return Command::Ask;
    };
    let (name, arg) = cmd.split_once(' ').unwrap_or((cmd, ""));
    let arg = arg.trim();

    ui.notice = match name {
        "quit" => return Command::Quit,
        "teach" => return Command::TeachMe,
        "clear" => {
            transcript.clear();
            "transcript cleared".to_string()
        }
        "topic" => {
            transcript.preferences_mut().topic = arg.to_string();
            format!("topic set to: {}", display_topic(arg))
        }
        "level" => match arg.parse::<Level>() {
            Ok(level) => {
                transcript.preferences_mut().level = level;
                format!("level set to: {level}")
            }
            Err(e) => e.to_string(),
        },
        "style" => match arg.parse::<TeachStyle>() {
            Ok(style) => {
                transcript.preferences_mut().style = style;
                format!("style set to: {style}")
            }
            Err(e) => e.to_string(),
        },
        _ => format!("unknown command /{name}. {HELP}"),
    };
    Command::Handled
}

fn display_topic(topic: &str) -> &str {
    if topic.is_empty() {
        "—"
    } else {
        topic
    }
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    transcript: &Transcript,
    ui: &Ui,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(3)])
            .split(f.area());

        let mut text = Text::default();
        for turn in transcript.turns() {
            push_turn(&mut text, turn);
        }
        if transcript.is_busy() {
            text.lines.push(Line::styled("Thinking…", Style::default().add_modifier(Modifier::ITALIC)));
        }

        // Keep the newest turn in view; wrapped lines are not counted.
        let visible = chunks[0].height.saturating_sub(2) as usize;
        let scroll = text.lines.len().saturating_sub(visible) as u16;

        let prefs = transcript.preferences();
        let title = format!(
            "Lesson: {} — Mode: {} · {}",
            display_topic(&prefs.topic),
            prefs.level,
            prefs.style
        );
        let chat = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));

        let notice = Paragraph::new(ui.notice.as_str());

        let input_w = Paragraph::new(ui.input.as_str())
            .block(Block::default().borders(Borders::ALL).title("ask a question"));

        f.render_widget(chat, chunks[0]);
        f.render_widget(notice, chunks[1]);
        f.render_widget(input_w, chunks[2]);

        let x = chunks[2].x + 1 + ui.input.chars().count() as u16;
        let y = chunks[2].y + 1;
        f.set_cursor_position((x.min(chunks[2].x + chunks[2].width.saturating_sub(2)), y));
    })?;
    Ok(())
}

fn push_turn(text: &mut Text<'_>, turn: &Turn) {
    let (label, style) = match turn.role {
        TurnRole::User => ("you: ", Style::default().add_modifier(Modifier::BOLD)),
        TurnRole::Assistant => ("teacher: ", Style::default()),
    };
    text.lines.push(Line::styled(label, style));
    text.lines.extend(Text::from(turn.content.clone()).lines);
    text.lines.push(Line::from(""));
}
