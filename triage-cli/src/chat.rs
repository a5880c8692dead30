use anyhow::{Context, Result, bail};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use tracing::debug;
use triage_core::{Clock, Point};
use triage_store::TaskStore;

use crate::commands::{self, Engine, Ranking};

const HELP: &str = "Commands:\n\
- /next\n\
- /list [slack|effort|days|start] [limit]\n\
- /schedule <id> [pace]\n\
- /invest <id> <amount>\n\
- /done <id>\n\
- /workload\n\
- /agenda\n\
- /help\n\
\nShortcuts: Enter=send, Esc=quit, ?=toggle help (empty input)";

#[derive(Clone, Debug)]
struct Msg {
    role: Role,
    content: String,
}

#[derive(Clone, Debug)]
enum Role {
    User,
    Assistant,
    System,
}

/// Daily markdown log: one bullet per message.
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn open(dir: &Path, now: Point) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(format!("{}.md", now.date().format("%Y-%m-%d")));
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_system(&mut self, msg: &str) -> Result<()> {
        self.append("system", msg)
    }

    fn append_user(&mut self, msg: &str) -> Result<()> {
        self.append("user", msg)
    }

    fn append_assistant(&mut self, msg: &str) -> Result<()> {
        self.append("triage", msg)
    }

    fn append(&mut self, role: &str, msg: &str) -> Result<()> {
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(
            f,
            "- {} [{}] {}",
            chrono::Utc::now().to_rfc3339(),
            role,
            msg.replace('\n', " / ")
        )?;
        Ok(())
    }
}

/// Everything a slash command needs. Mutating commands save the store.
pub struct ChatSession {
    pub store: TaskStore,
    pub engine: Engine,
    pub clock: Box<dyn Clock>,
}

impl ChatSession {
    fn now(&self) -> Point {
        Point::now(self.clock.as_ref())
    }

    fn run(&mut self, cmd: &str, args: &[&str]) -> Result<String> {
        let now = self.now();
        let out = match cmd {
            "/help" => HELP.to_string(),
            "/next" => commands::next(&self.store, &self.engine, now),
            "/list" => {
                let ranking: Ranking = args.first().map(|s| s.parse()).transpose()?.unwrap_or_default();
                let limit = args
                    .get(1)
                    .map(|s| s.parse::<usize>())
                    .transpose()
                    .context("limit must be a number")?
                    .unwrap_or(10);
                commands::list(&self.store, &self.engine, now, ranking, limit)
            }
            "/schedule" => {
                let id = args.first().context("usage: /schedule <id> [pace]")?;
                let param = args[1..].join(" ");
                let out = commands::schedule(&mut self.store, &self.engine, now, id, &param)?;
                self.store.save()?;
                out
            }
            "/invest" => {
                let [id, amount] = args else {
                    bail!("usage: /invest <id> <amount>");
                };
                let out = commands::invest(&mut self.store, id, amount)?;
                self.store.save()?;
                out
            }
            "/done" => {
                let id = args.first().context("usage: /done <id>")?;
                let out = commands::done(&mut self.store, id)?;
                self.store.save()?;
                out
            }
            "/workload" => commands::workload(&self.store, &self.engine, now),
            "/agenda" => commands::agenda(&self.store, &self.engine, now),
            other => bail!("unknown command {other}. Try /help"),
        };
        Ok(out)
    }
}

/// Runs a slash command; `None` when `input` is not one.
pub fn handle_slash(session: &mut ChatSession, input: &str) -> Option<String> {
    let s = input.trim();
    if !s.starts_with('/') {
        return None;
    }
    let mut words = s.split_whitespace();
    let cmd = words.next()?;
    let args: Vec<&str> = words.collect();
    debug!(cmd, ?args, "slash command");
    Some(match session.run(cmd, &args) {
        Ok(out) => out.trim_end().to_string(),
        Err(e) => format!("error: {e:#}"),
    })
}

pub fn run_chat(session: ChatSession, log_dir: &Path) -> Result<()> {
    let log = ChatLog::open(log_dir, session.now())?;
    debug!(log = %log.path().display(), "chat log");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = chat_loop(&mut terminal, session, log);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn chat_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut session: ChatSession,
    mut log: ChatLog,
) -> Result<()> {
    let greeting = format!("{} active tasks. Ask with /next, or /help.", session.store.active(session.now()).len());
    let mut messages: Vec<Msg> = vec![Msg {
        role: Role::Assistant,
        content: greeting,
    }];

    let mut input = String::new();
    let mut show_help = true;

    log.append_system("session_start")?;

    loop {
        terminal.draw(|f| {
            let size = f.area();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(4), Constraint::Min(5), Constraint::Length(3)])
                .split(size);

            let splash = Paragraph::new(Text::from(vec![
                Line::from(Span::styled(
                    "triage",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "type /help or ? for shortcuts",
                    Style::default().fg(Color::Gray),
                )),
            ]))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(splash, chunks[0]);

            let mut lines: Vec<Line> = Vec::new();
            if show_help {
                lines.push(Line::from(Span::styled(
                    "Shortcuts: Enter=send, Esc=quit, ?=help",
                    Style::default().fg(Color::Gray),
                )));
                lines.push(Line::raw("Commands: /next /list /schedule /invest /done /workload /agenda /help"));
                lines.push(Line::raw(""));
            }

            for m in &messages {
                let (tag, color) = match m.role {
                    Role::User => ("you", Color::Cyan),
                    Role::Assistant => ("triage", Color::Magenta),
                    Role::System => ("system", Color::Gray),
                };
                let mut body = m.content.lines();
                lines.push(Line::from(vec![
                    Span::styled(format!("{tag}: "), Style::default().fg(color)),
                    Span::raw(body.next().unwrap_or_default().to_string()),
                ]));
                lines.extend(body.map(|l| Line::raw(format!("  {l}"))));
                lines.push(Line::raw(""));
            }

            // keep the newest messages in view
            let visible = chunks[1].height.saturating_sub(2) as usize;
            let skip = lines.len().saturating_sub(visible);
            let history = Paragraph::new(Text::from(lines.split_off(skip)))
                .block(Block::default().borders(Borders::ALL).title("conversation"))
                .wrap(Wrap { trim: false });
            f.render_widget(history, chunks[1]);

            let input_widget = Paragraph::new(input.as_str())
                .block(Block::default().borders(Borders::ALL).title("message"))
                .style(Style::default().fg(Color::White));
            f.render_widget(input_widget, chunks[2]);
        })?;

        if !event::poll(std::time::Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Esc => break,
            KeyCode::Char('?') if input.is_empty() => show_help = !show_help,
            KeyCode::Enter => {
                let trimmed = input.trim().to_string();
                input.clear();
                if trimmed.is_empty() {
                    continue;
                }
                log.append_user(&trimmed)?;
                messages.push(Msg {
                    role: Role::User,
                    content: trimmed.clone(),
                });

                let reply = handle_slash(&mut session, &trimmed)
                    .unwrap_or_else(|| "I only understand slash commands. Try /next or /help.".to_string());
                log.append_assistant(&reply)?;
                messages.push(Msg {
                    role: if reply.starts_with("error:") { Role::System } else { Role::Assistant },
                    content: reply,
                });
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }

    log.append_system("session_end")?;
    Ok(())
}
