//! Courtside CLI: terminal soundboard for live event operators

use std::cell::Cell;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside::audio::{AudioBackend, RodioBackend, ScriptedBackend};
use courtside_app::app::{Board, BoardCommand, CueEditor, View};
use courtside_app::catalog::{display_name, Catalog};
use courtside_app::config::{editor::NUDGE_SECS, files};
use courtside_app::data::{self, CueStore, Settings};
use courtside_app::error::Result as AppResult;

#[derive(Parser)]
#[command(name = "courtside", about = "Terminal soundboard for live events", version)]
struct Cli {
    /// Sound catalog JSON (defaults to the built-in volleyball board)
    #[arg(long, env = "COURTSIDE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Directory that catalog file paths are relative to
    #[arg(long, env = "COURTSIDE_SOUNDS")]
    sounds: Option<PathBuf>,

    /// Directory holding settings.json, cues.json and the log
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Start in developer view
    #[arg(long)]
    dev: bool,

    /// Run without an audio device (starts are confirmed silently)
    #[arg(long)]
    no_audio: bool,
}

type DynBackend = Box<dyn AudioBackend>;

/// Keys assigned to sounds in board order; Shift opens the file panel
const SOUND_KEYS: &str = "1234567890qwertyuiopasdfghjklzxcvbnm";

/// Output level change per `-`/`+` press
const VOLUME_STEP: f32 = 0.05;

/// Upper bound on the wait between redraws (~30fps)
const FRAME: Duration = Duration::from_millis(33);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    End,
}

/// File picker for one sound
struct Panel {
    sound_id: String,
    selected: usize,
}

struct App {
    running: bool,
    panel: Option<Panel>,
    listing: ListState,
    /// Numeric field being typed into, with its text
    field: Option<(Field, String)>,
    /// Timeline area of the last frame, for mouse hits
    timeline: Cell<Option<Rect>>,
    /// Where volume and mute changes are kept
    settings_path: PathBuf,
}

impl App {
    fn new(settings_path: PathBuf) -> Self {
        let mut listing = ListState::default();
        listing.select(Some(0));
        Self {
            running: true,
            panel: None,
            listing,
            field: None,
            timeline: Cell::new(None),
            settings_path,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_dir = data::resolve_config_dir(cli.config_dir.as_deref())?;
    data::ensure_dir(&config_dir)?;
    if let Err(e) = init_logging(&config_dir) {
        eprintln!("Logging disabled: {}", e);
    }

    let mut settings = match Settings::load_from(&config_dir.join(files::SETTINGS)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Using default settings: {}", e);
            Settings::default()
        }
    };

    if let Some(path) = cli.catalog {
        settings.catalog_path = Some(path);
    }
    if let Some(dir) = cli.sounds {
        settings.sound_root = Some(dir);
    }
    if cli.dev {
        settings.start_in_developer_view = true;
    }

    // Load catalog before entering TUI (prints to stderr on failure)
    let catalog = match &settings.catalog_path {
        Some(path) => match Catalog::load_from(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            // Built-in paths are web-style, served from `public/`
            if settings.sound_root.is_none() {
                settings.sound_root = Some(PathBuf::from("public"));
            }
            Catalog::builtin()
        }
    };

    let cues = CueStore::open(config_dir.join(files::CUES));
    info!(
        cues = cues.len(),
        sounds = catalog.sounds().count(),
        no_audio = cli.no_audio,
        "Starting board"
    );

    let no_audio = cli.no_audio;
    let volume = settings.effective_volume();
    let make_backend = move || -> DynBackend {
        if no_audio {
            Box::new(ScriptedBackend::auto_confirming())
        } else {
            Box::new(RodioBackend::new(volume))
        }
    };
    let mut board = Board::new(make_backend(), make_backend, cues, catalog, settings);

    // Suppress stderr during TUI. ALSA/PulseAudio and other libs write
    // diagnostic messages to stderr which corrupt the ratatui display.
    let saved_stderr = unsafe { libc::dup(2) };
    {
        let devnull = std::fs::File::open("/dev/null")?;
        unsafe { libc::dup2(devnull.as_raw_fd(), 2) };
    }

    // Enter TUI
    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    io::stdout().execute(EnableMouseCapture)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config_dir.join(files::SETTINGS));

    while app.running {
        let now = Instant::now();
        board.pump(now);

        terminal.draw(|f| draw_ui(f, &mut app, &board, now))?;

        // Wake in time for the next trim stop
        let timeout = board.poll_timeout(Instant::now()).min(FRAME);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, &mut board, key, Instant::now());
                }
                Event::Mouse(mouse) => handle_mouse(&app, &mut board, mouse),
                _ => {}
            }
        }
    }

    // Stop and drop the board while still in alternate screen
    // (audio backends may print to stderr on drop)
    board.close_editor();
    board.stop_all();
    drop(board);

    // Restore terminal
    io::stdout().execute(DisableMouseCapture)?;
    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    // Restore stderr
    if saved_stderr >= 0 {
        unsafe {
            libc::dup2(saved_stderr, 2);
            libc::close(saved_stderr);
        }
    }

    Ok(())
}

/// Log to a file in the config directory; the terminal belongs to the TUI
fn init_logging(dir: &Path) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(files::LOG))?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtside=info,courtside_app=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

// =============================================================================
// Input
// =============================================================================

fn handle_key(app: &mut App, board: &mut Board<DynBackend>, key: KeyEvent, now: Instant) {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        app.running = false;
        return;
    }

    // Space is text while a numeric field has focus, not the panic stop
    if app.field.is_some() {
        handle_field_key(app, board, key);
        return;
    }

    if key.code == KeyCode::Char(' ') {
        board.stop_all();
        return;
    }

    if let Some(command) = level_command(key.code) {
        let saved = board
            .handle(command, now)
            .and_then(|_| board.settings().save_levels_to(&app.settings_path));
        if let Err(e) = saved {
            board.report(&e);
        }
        return;
    }

    let result = if board.editor().is_some() {
        handle_editor_key(app, board, key, now)
    } else if app.panel.is_some() {
        handle_panel_key(app, board, key, now)
    } else {
        match board.view() {
            View::Board => handle_board_key(app, board, key, now),
            View::Developer => handle_developer_key(app, board, key, now),
        }
    };

    if let Err(e) = result {
        board.report(&e);
    }
}

/// Output level keys, live in every view
fn level_command(code: KeyCode) -> Option<BoardCommand> {
    match code {
        KeyCode::Char('-') => Some(BoardCommand::AdjustVolume {
            delta: -VOLUME_STEP,
        }),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(BoardCommand::AdjustVolume {
            delta: VOLUME_STEP,
        }),
        KeyCode::Char('*') => Some(BoardCommand::ToggleMute),
        _ => None,
    }
}

fn sound_at(board: &Board<DynBackend>, index: usize) -> Option<String> {
    board.catalog().sounds().nth(index).map(|s| s.id.clone())
}

fn handle_board_key(
    app: &mut App,
    board: &mut Board<DynBackend>,
    key: KeyEvent,
    now: Instant,
) -> AppResult<()> {
    match key.code {
        KeyCode::Tab => board.handle(BoardCommand::ToggleView, now),
        KeyCode::Char(c) => {
            let lower = c.to_ascii_lowercase();
            let Some(index) = SOUND_KEYS.find(lower) else {
                return Ok(());
            };
            let Some(sound_id) = sound_at(board, index) else {
                return Ok(());
            };
            if c.is_ascii_uppercase() || key.modifiers.contains(KeyModifiers::SHIFT) {
                app.panel = Some(Panel {
                    sound_id,
                    selected: 0,
                });
                Ok(())
            } else {
                board.handle(BoardCommand::Trigger { sound_id }, now)
            }
        }
        _ => Ok(()),
    }
}

fn handle_panel_key(
    app: &mut App,
    board: &mut Board<DynBackend>,
    key: KeyEvent,
    now: Instant,
) -> AppResult<()> {
    let Some(panel) = &mut app.panel else {
        return Ok(());
    };
    let files: Vec<String> = board
        .catalog()
        .find(&panel.sound_id)
        .map(|s| s.files().to_vec())
        .unwrap_or_default();

    let command = match key.code {
        KeyCode::Esc => None,
        KeyCode::Up => {
            panel.selected = panel.selected.saturating_sub(1);
            return Ok(());
        }
        KeyCode::Down => {
            panel.selected = (panel.selected + 1).min(files.len().saturating_sub(1));
            return Ok(());
        }
        KeyCode::Enter => files.get(panel.selected).map(|file| BoardCommand::PlayFile {
            sound_id: panel.sound_id.clone(),
            file: file.clone(),
        }),
        KeyCode::Char('r') => Some(BoardCommand::Trigger {
            sound_id: panel.sound_id.clone(),
        }),
        KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
            let index = c as usize - '1' as usize;
            match files.get(index) {
                Some(file) => Some(BoardCommand::PlayFile {
                    sound_id: panel.sound_id.clone(),
                    file: file.clone(),
                }),
                None => return Ok(()),
            }
        }
        _ => return Ok(()),
    };

    app.panel = None;
    match command {
        Some(command) => board.handle(command, now),
        None => Ok(()),
    }
}

fn handle_developer_key(
    app: &mut App,
    board: &mut Board<DynBackend>,
    key: KeyEvent,
    now: Instant,
) -> AppResult<()> {
    let listing = board.developer_listing();
    let last = listing.len().saturating_sub(1);
    let selected = app.listing.selected().unwrap_or(0).min(last);

    match key.code {
        KeyCode::Tab => board.handle(BoardCommand::ToggleView, now),
        KeyCode::Up => {
            app.listing.select(Some(selected.saturating_sub(1)));
            Ok(())
        }
        KeyCode::Down => {
            app.listing.select(Some((selected + 1).min(last)));
            Ok(())
        }
        KeyCode::PageUp => {
            app.listing.select(Some(selected.saturating_sub(10)));
            Ok(())
        }
        KeyCode::PageDown => {
            app.listing.select(Some((selected + 10).min(last)));
            Ok(())
        }
        KeyCode::Enter => match listing.get(selected) {
            Some(row) => board.handle(
                BoardCommand::OpenEditor {
                    sound_id: row.sound_id.clone(),
                    file: row.file.clone(),
                },
                now,
            ),
            None => Ok(()),
        },
        KeyCode::Char('c') => match listing.get(selected) {
            Some(row) => board.handle(
                BoardCommand::ClearCue {
                    sound_id: row.sound_id.clone(),
                    file: row.file.clone(),
                },
                now,
            ),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn handle_editor_key(
    app: &mut App,
    board: &mut Board<DynBackend>,
    key: KeyEvent,
    now: Instant,
) -> AppResult<()> {
    match key.code {
        KeyCode::Esc => return board.handle(BoardCommand::CloseEditor, now),
        KeyCode::Enter => return board.handle(BoardCommand::SaveEditor, now),
        _ => {}
    }

    let Some(editor) = board.editor_mut() else {
        return Ok(());
    };
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
        NUDGE_SECS * 10.0
    } else {
        NUDGE_SECS
    };

    match key.code {
        KeyCode::Left => editor.move_cursor(-step),
        KeyCode::Right => editor.move_cursor(step),
        KeyCode::Char('[') => editor.mark_at_cursor(false),
        KeyCode::Char(']') => editor.mark_at_cursor(true),
        KeyCode::Char('p') => editor.toggle_preview(now),
        KeyCode::Char('r') => editor.reset(),
        KeyCode::Char('s') if editor.is_ready() => {
            app.field = Some((Field::Start, format!("{:.1}", editor.start_time())));
        }
        KeyCode::Char('e') if editor.is_ready() => {
            app.field = Some((Field::End, format!("{:.1}", editor.end_time())));
        }
        _ => {}
    }
    Ok(())
}

fn handle_field_key(app: &mut App, board: &mut Board<DynBackend>, key: KeyEvent) {
    let Some((field, text)) = &mut app.field else {
        return;
    };
    match key.code {
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => text.push(c),
        KeyCode::Backspace => {
            text.pop();
        }
        KeyCode::Enter => {
            if let Some(editor) = board.editor_mut() {
                match field {
                    Field::Start => editor.set_start_text(text),
                    Field::End => editor.set_end_text(text),
                }
            }
            app.field = None;
        }
        KeyCode::Esc => app.field = None,
        _ => {}
    }
}

/// Click sets the start, Shift+click or right click sets the end
fn handle_mouse(app: &App, board: &mut Board<DynBackend>, mouse: MouseEvent) {
    let extend = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => mouse.modifiers.contains(KeyModifiers::SHIFT),
        MouseEventKind::Down(MouseButton::Right) => true,
        _ => return,
    };
    let Some(area) = app.timeline.get() else {
        return;
    };
    let hit = mouse.column >= area.x
        && mouse.column < area.x + area.width
        && mouse.row >= area.y
        && mouse.row < area.y + area.height;
    if !hit || area.width == 0 {
        return;
    }
    if let Some(editor) = board.editor_mut() {
        let fraction = (mouse.column - area.x) as f64 / area.width as f64;
        editor.click_timeline(fraction, extend);
    }
}

// =============================================================================
// Drawing
// =============================================================================

fn draw_ui(f: &mut Frame, app: &mut App, board: &Board<DynBackend>, now: Instant) {
    let area = f.area();
    let view_label = match board.view() {
        View::Board => "Board",
        View::Developer => "Developer",
    };

    let outer = Block::default()
        .title(format!(
            " Courtside v{} · {} ",
            env!("CARGO_PKG_VERSION"),
            view_label
        ))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::vertical([
        Constraint::Min(5),    // board or listing
        Constraint::Length(1), // status
        Constraint::Length(1), // help bar
    ])
    .split(inner);

    match board.view() {
        View::Board => draw_board(f, board, chunks[0]),
        View::Developer => draw_listing(f, app, board, chunks[0]),
    }
    draw_status(f, board, chunks[1]);
    draw_help(f, app, board, chunks[2]);

    app.timeline.set(None);
    if let Some(panel) = &app.panel {
        draw_panel(f, panel, board, area);
    }
    if let Some(editor) = board.editor() {
        draw_editor(f, app, editor, area, now);
    }
}

fn group_color(color: &str) -> Color {
    color.parse::<Color>().unwrap_or(Color::White)
}

fn draw_board(f: &mut Frame, board: &Board<DynBackend>, area: Rect) {
    let groups = board.catalog().groups();
    if groups.is_empty() {
        return;
    }
    let columns = Layout::horizontal(
        groups
            .iter()
            .map(|_| Constraint::Ratio(1, groups.len() as u32)),
    )
    .split(area);

    let playing = board.currently_playing();
    let pending = board.pending();
    let mut keys = SOUND_KEYS.chars();

    for (group, column) in groups.iter().zip(columns.iter()) {
        let color = group_color(&group.color);
        let lines: Vec<Line> = group
            .sounds
            .iter()
            .map(|sound| {
                let key = keys.next().map(String::from).unwrap_or_else(|| " ".into());
                let style = if playing == Some(sound.id.as_str()) {
                    Style::default().fg(Color::Black).bg(color).bold()
                } else if pending == Some(sound.id.as_str()) {
                    Style::default().fg(color).italic()
                } else {
                    Style::default().fg(color)
                };
                let multi = if sound.is_multi() { " ≡" } else { "" };
                Line::from(vec![
                    Span::styled(format!(" {key} "), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{} {}{}", sound.icon, sound.name, multi), style),
                ])
            })
            .collect();

        let block = Block::default()
            .title(format!(" {} {} ", group.icon, group.name))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color));
        f.render_widget(Paragraph::new(lines).block(block), *column);
    }
}

fn draw_listing(f: &mut Frame, app: &mut App, board: &Board<DynBackend>, area: Rect) {
    let items: Vec<ListItem> = board
        .developer_listing()
        .into_iter()
        .map(|row| {
            let cue = row
                .cue_label()
                .map(|label| Span::styled(format!("  ⏱ {label}"), Style::default().fg(Color::Cyan)))
                .unwrap_or_else(|| Span::raw(""));
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", row.group_id),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{} {:<14}", row.icon, row.sound_name),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{}. ", row.number), Style::default().fg(Color::DarkGray)),
                Span::raw(row.display_name),
                cue,
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Cue points ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, area, &mut app.listing);
}

fn draw_status(f: &mut Frame, board: &Board<DynBackend>, area: Rect) {
    let snapshot = board.snapshot();
    let color = if snapshot.is_error {
        Color::Red
    } else if snapshot.playing.is_some() {
        Color::Green
    } else {
        Color::Gray
    };
    let line = Line::from(Span::styled(
        format!("  {}", snapshot.status_text),
        Style::default().fg(color),
    ));
    f.render_widget(Paragraph::new(line), area);
}

fn draw_help(f: &mut Frame, app: &App, board: &Board<DynBackend>, area: Rect) {
    let pairs: &[(&str, &str)] = if app.field.is_some() {
        &[("0-9 . ", "type"), ("Enter ", "apply"), ("Esc ", "cancel")]
    } else if board.editor().is_some() {
        &[
            ("←/→ ", "scrub"),
            ("[ ", "start"),
            ("] ", "end"),
            ("s/e ", "type"),
            ("p ", "preview"),
            ("r ", "reset"),
            ("Enter ", "save"),
            ("Esc ", "close"),
        ]
    } else if app.panel.is_some() {
        &[("↑/↓ Enter ", "play"), ("r ", "random"), ("Esc ", "close")]
    } else {
        match board.view() {
            View::Board => &[
                ("key ", "play"),
                ("Shift+key ", "files"),
                ("Space ", "stop all"),
                ("-/+ ", "volume"),
                ("* ", "mute"),
                ("Tab ", "developer"),
                ("Ctrl+Q ", "quit"),
            ],
            View::Developer => &[
                ("↑/↓ ", "select"),
                ("Enter ", "edit"),
                ("c ", "clear"),
                ("Tab ", "board"),
                ("Ctrl+Q ", "quit"),
            ],
        }
    };

    let mut spans = vec![Span::raw("  ")];
    for (i, (key, action)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  |  "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(*action));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered rectangle of the given size, clipped to `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_panel(f: &mut Frame, panel: &Panel, board: &Board<DynBackend>, area: Rect) {
    let Some(sound) = board.catalog().find(&panel.sound_id) else {
        return;
    };
    let rect = centered(area, 50, sound.files().len() as u16 + 4);
    f.render_widget(Clear, rect);

    let lines: Vec<Line> = sound
        .files()
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let style = if i == panel.selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!(" {}  {}  ▶", i + 1, display_name(file)),
                style,
            ))
        })
        .collect();

    let block = Block::default()
        .title(format!(" {} {} ", sound.icon, sound.name))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

fn draw_editor(
    f: &mut Frame,
    app: &App,
    editor: &CueEditor<DynBackend>,
    area: Rect,
    now: Instant,
) {
    let rect = centered(area, 72, 12);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .title(format!(" Set Cue Points · {} ", editor.title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let rows = Layout::vertical([
        Constraint::Length(1), // load state
        Constraint::Length(1), // timeline
        Constraint::Length(1), // spacer
        Constraint::Length(1), // times
        Constraint::Length(1), // spacer
        Constraint::Length(1), // numeric fields
        Constraint::Length(1), // spacer
        Constraint::Length(1), // preview state
    ])
    .split(inner);

    let load_state = match editor.load_error() {
        Some(err) => Span::styled(format!("Cannot load clip: {err}"), Style::default().fg(Color::Red)),
        None if editor.is_loading() => Span::styled("Loading…", Style::default().fg(Color::DarkGray)),
        None => Span::styled(
            format!("Length {}", courtside::format_seconds(editor.duration())),
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(Line::from(load_state)), rows[0]);

    let timeline = rows[1];
    app.timeline.set(Some(timeline));
    f.render_widget(Paragraph::new(timeline_line(editor, timeline.width, now)), timeline);

    let times = Line::from(vec![
        Span::styled("Start: ", Style::default().fg(Color::DarkGray)),
        Span::styled(editor.start_label(), Style::default().bold()),
        Span::styled("   Duration: ", Style::default().fg(Color::DarkGray)),
        Span::styled(editor.length_label(), Style::default().bold()),
        Span::styled("   End: ", Style::default().fg(Color::DarkGray)),
        Span::styled(editor.end_label(), Style::default().bold()),
    ]);
    f.render_widget(Paragraph::new(times), rows[3]);

    let field_span = |which: Field, value: f64| match &app.field {
        Some((active, text)) if *active == which => Span::styled(
            format!("[{text}▏]"),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        _ => Span::raw(format!("{value:.1}")),
    };
    let fields = Line::from(vec![
        Span::styled("Start (s): ", Style::default().fg(Color::DarkGray)),
        field_span(Field::Start, editor.start_time()),
        Span::styled("    End (s): ", Style::default().fg(Color::DarkGray)),
        field_span(Field::End, editor.end_time()),
    ]);
    f.render_widget(Paragraph::new(fields), rows[5]);

    let preview = if editor.is_previewing() {
        Span::styled("⏸ Previewing", Style::default().fg(Color::Green))
    } else {
        Span::styled("▶ Preview with p", Style::default().fg(Color::DarkGray))
    };
    f.render_widget(Paragraph::new(Line::from(preview)), rows[7]);
}

/// Timeline as one row of cells: window, markers, cursor and playhead
fn timeline_line(editor: &CueEditor<DynBackend>, width: u16, now: Instant) -> Line<'static> {
    let width = width as usize;
    if width == 0 {
        return Line::default();
    }
    let cell = |seconds: f64| ((editor.fraction_of(seconds) * width as f64) as usize).min(width - 1);

    let start = cell(editor.start_time());
    let end = cell(editor.end_time());
    let cursor = cell(editor.cursor());
    let playhead = editor.playhead(now).map(cell);
    let end_marker = editor.has_end_marker();

    let spans: Vec<Span> = (0..width)
        .map(|i| {
            if !editor.is_ready() {
                return Span::styled("─", Style::default().fg(Color::DarkGray));
            }
            if playhead == Some(i) {
                Span::styled("●", Style::default().fg(Color::Green))
            } else if i == cursor {
                Span::styled("┃", Style::default().fg(Color::White).bold())
            } else if i == start {
                Span::styled("▐", Style::default().fg(Color::Yellow))
            } else if end_marker && i == end {
                Span::styled("▌", Style::default().fg(Color::Yellow))
            } else if i > start && i < end || (!end_marker && i > start) {
                Span::styled("█", Style::default().fg(Color::Cyan))
            } else {
                Span::styled("─", Style::default().fg(Color::DarkGray))
            }
        })
        .collect();
    Line::from(spans)
}
