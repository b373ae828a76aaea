mod help;
mod state;

use crate::cli::{build_params, Cli};
use crate::model::{Notice, ServerEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{
    UiState, FIELD_DATABASES, FIELD_DBFILENAME, FIELD_HOST, FIELD_PORT, FIELD_TIMEOUT, TAB_CONFIG,
    TAB_COUNT, TAB_HELP, TAB_TERMINAL,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the
    // controller; PTY output arrives in bursts.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio
    // runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&args, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<ServerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&build_params(&args));
    if args.start_on_launch {
        state.tab = TAB_TERMINAL;
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, &cmd_tx, k.modifiers, k.code) {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Handle one key press. Returns true when the app should quit.
fn handle_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> bool {
    match (modifiers, code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            return false;
        }
        _ => {}
    }

    match state.tab {
        TAB_CONFIG => handle_config_key(state, cmd_tx, modifiers, code),
        _ => handle_terminal_key(state, cmd_tx, code),
    }
}

fn handle_config_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> bool {
    match (modifiers, code) {
        (KeyModifiers::CONTROL, KeyCode::Char('s')) => {
            match crate::storage::save_params(&state.form.params()) {
                Ok(path) => state.info = format!("Profile saved: {}", path.display()),
                Err(e) => state.info = format!("Profile save failed: {e:#}"),
            }
        }
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => match crate::storage::load_params() {
            Ok(Some(params)) => {
                state.form.load(&params);
                state.info = "Profile loaded".into();
            }
            Ok(None) => state.info = "No saved profile yet (Ctrl-S to save one)".into(),
            Err(e) => state.info = format!("Profile load failed: {e:#}"),
        },
        (_, KeyCode::Up) => state.form.select_prev(),
        (_, KeyCode::Down) => state.form.select_next(),
        (_, KeyCode::Left) => {
            if state.form.selected == FIELD_DATABASES {
                state.form.spin_databases(-1);
            }
        }
        (_, KeyCode::Right) => {
            if state.form.selected == FIELD_DATABASES {
                state.form.spin_databases(1);
            }
        }
        (_, KeyCode::Enter) => {
            let _ = cmd_tx.send(UiCommand::Start(state.form.params()));
            state.tab = TAB_TERMINAL;
        }
        (_, KeyCode::Backspace) => state.form.pop_char(),
        (_, KeyCode::Char(c)) => match (state.form.selected, c) {
            (FIELD_DATABASES, '+') => state.form.spin_databases(1),
            (FIELD_DATABASES, '-') => state.form.spin_databases(-1),
            (_, c) => state.form.push_char(c),
        },
        _ => {}
    }
    false
}

fn handle_terminal_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    code: KeyCode,
) -> bool {
    match code {
        KeyCode::Char('q') => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        KeyCode::Char('s') => {
            let _ = cmd_tx.send(UiCommand::Start(state.form.params()));
            state.tab = TAB_TERMINAL;
        }
        KeyCode::Char('k') => {
            let _ = cmd_tx.send(UiCommand::Stop);
        }
        KeyCode::Char('?') => {
            state.tab = TAB_HELP;
        }
        KeyCode::Up => {
            state.scroll_offset = state
                .scroll_offset
                .saturating_add(1)
                .min(state.scrollback.len());
        }
        KeyCode::Down => state.scroll_offset = state.scroll_offset.saturating_sub(1),
        KeyCode::PageUp => {
            state.scroll_offset = state
                .scroll_offset
                .saturating_add(20)
                .min(state.scrollback.len());
        }
        KeyCode::PageDown => state.scroll_offset = state.scroll_offset.saturating_sub(20),
        KeyCode::End => state.scroll_offset = 0,
        _ => {}
    }
    false
}

fn apply_event(state: &mut UiState, ev: ServerEvent) {
    match ev {
        ServerEvent::CommandLine(argv) => {
            state.push_colored(argv.join(" "), Color::Green);
            state.info = "Launching server…".into();
        }
        ServerEvent::Started { pid } => {
            state.running_pid = Some(pid);
            state.info = format!("Server running (pid {pid})");
        }
        ServerEvent::Output(bytes) => state.feed_output(&bytes),
        ServerEvent::Notice(notice) => {
            let color = match notice {
                Notice::Killed | Notice::Message(_) => Color::Yellow,
                _ => Color::Red,
            };
            if matches!(notice, Notice::Killed) {
                // The supervisor no longer tracks the child after a stop.
                state.running_pid = None;
            }
            state.push_colored(notice.to_message(), color);
            state.info = notice.to_message();
        }
        ServerEvent::Exited { pid, code } => {
            // Only clear the badge if the exit belongs to the tracked server;
            // a stop request has usually cleared it already.
            if state.running_pid == Some(pid) {
                state.running_pid = None;
            }
            let suffix = match code {
                Some(c) => format!(" with code {c}"),
                None => String::new(),
            };
            state.push_colored(format!("---(server pid {pid} exited{suffix})---"), Color::Yellow);
            state.info = format!("Server exited (pid {pid})");
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Configuration"),
        Line::from("Terminal"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("redis-console"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_CONFIG => draw_config(chunks[1], f, state),
        TAB_TERMINAL => draw_terminal(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn field_hint(selected: usize) -> &'static str {
    match selected {
        FIELD_HOST => "Specifies an interface.",
        FIELD_PORT => "Specifies the port on which to listen for incoming connections.",
        FIELD_TIMEOUT => "Close a client connection if it is idle for this number of seconds (0 to disable).",
        FIELD_DATABASES => "One Redis server can maintain multiple keyspaces. This option indicates how many (1-99).",
        FIELD_DBFILENAME => "Specifies where to save/load the database file.",
        _ => "",
    }
}

fn draw_config(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)].as_ref())
        .split(area);

    let fields: [(&str, String); 5] = [
        ("Host", state.form.host.clone()),
        ("Port", state.form.port.clone()),
        ("Timeout", state.form.timeout.clone()),
        ("Number of databases", state.form.databases.to_string()),
        ("Dumpfile location", state.form.dbfilename.clone()),
    ];

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (i, (label, value)) in fields.into_iter().enumerate() {
        let selected = i == state.form.selected;
        let marker = if selected { "> " } else { "  " };
        let label_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let value = if selected && i != FIELD_DATABASES {
            format!("{value}_")
        } else if i == FIELD_DATABASES {
            format!("‹ {value} ›")
        } else {
            value
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{label}: "), label_style),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        field_hint(state.form.selected),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "enter: start server    Ctrl-S: save profile    Ctrl-L: load profile",
        Style::default().fg(Color::DarkGray),
    )));

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Configuration"),
    );
    f.render_widget(form, chunks[0]);

    draw_status(chunks[1], f, state);
}

fn draw_terminal(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(area);

    let view_height = chunks[0].height.saturating_sub(2) as usize;
    let total = state.scrollback.len();
    let max_offset = total.saturating_sub(view_height);
    let offset = state.scroll_offset.min(max_offset);
    let top = total.saturating_sub(view_height + offset);

    let title = if offset > 0 {
        format!("Terminal (scrolled {offset} lines)")
    } else {
        "Terminal".to_string()
    };

    let pane = Paragraph::new(state.scrollback.clone())
        .scroll((top as u16, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(pane, chunks[0]);

    draw_status(chunks[1], f, state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let badge = match state.running_pid {
        Some(pid) => Span::styled(
            format!("● running (pid {pid})"),
            Style::default().fg(Color::Green),
        ),
        None => Span::styled("○ stopped", Style::default().fg(Color::Red)),
    };
    let line = Line::from(vec![badge, Span::raw("  "), Span::raw(state.info.clone())]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
