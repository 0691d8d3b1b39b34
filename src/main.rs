pub mod ui;

use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use splitwatch::{
    analysis::{AnalysisJob, CommandAnalyst},
    config::{Config, ConfigStore, FileConfigStore},
    format::format_time,
    persist::{SessionDb, SessionStore},
    runner::{RunnerId, RunnerStore},
    runtime::{CrosstermEventSource, EventLoop, EventSource, FixedTicker, Ticker, TimerEvent},
    session::{Destructive, Prompt, RaceSession, Review, SessionEvent},
    stats::{split_log, LogEntry, RunnerFilter, SortMode},
    transfer, RaceError,
};

const TOAST_TTL: Duration = Duration::from_secs(3);
const TEMPLATE_FILE_NAME: &str = "template_nama_pelari.csv";

/// manual multi-runner race timer with splits, rankings and lap analysis
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A terminal race timer for coaches: one master clock, many runners, per-runner splits and finishes, live rankings, lap statistics and CSV import/export."
)]
pub struct Cli {
    /// clock refresh interval in milliseconds while the race is running
    #[clap(long)]
    tick_ms: Option<u64>,

    /// session database to use instead of the default location
    #[clap(long = "db", value_name = "PATH")]
    db: Option<PathBuf>,

    /// directory that exports and templates are written to
    #[clap(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// shell command that reads the race summary on stdin and prints an analysis
    #[clap(long, value_name = "CMD")]
    analysis_command: Option<String>,

    /// write diagnostics to this file (filter with RUST_LOG)
    #[clap(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// import runner names from a CSV/TXT file into the saved session, then exit
    #[clap(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// export the saved session's splits as CSV, then exit
    #[clap(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// write a sample name list for --import, then exit
    #[clap(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// clear the saved session's clock and laps, then exit
    #[clap(long)]
    reset: bool,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command-line flags win over the config file.
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(ms) = self.tick_ms {
            config.tick_ms = ms;
        }
        if let Some(db) = &self.db {
            config.db_path = Some(db.clone());
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = Some(dir.clone());
        }
        if let Some(cmd) = &self.analysis_command {
            config.analysis_command = Some(cmd.clone());
        }
        config
    }

    fn is_headless(&self) -> bool {
        self.reset || self.import.is_some() || self.export.is_some() || self.template.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum View {
    #[default]
    Board,
    #[strum(to_string = "Lap Log")]
    LapLog,
    Chart,
    Analysis,
}

impl View {
    pub const ALL: [View; 4] = [View::Board, View::LapLog, View::Chart, View::Analysis];

    pub fn next(self) -> Self {
        match self {
            View::Board => View::LapLog,
            View::LapLog => View::Chart,
            View::Chart => View::Analysis,
            View::Analysis => View::Board,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Rename(RunnerId),
    TargetPace,
    ImportPath,
}

#[derive(Debug, Clone)]
pub struct TextInput {
    pub kind: InputKind,
    pub buffer: String,
}

impl TextInput {
    pub fn title(&self) -> &'static str {
        match self.kind {
            InputKind::Rename(_) => "Rename runner",
            InputKind::TargetPace => "Target pace (MM:SS)",
            InputKind::ImportPath => "Import names from file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingConfirm {
    pub action: Destructive,
    pub prompt: Prompt,
}

#[derive(Debug)]
pub enum AnalysisState {
    Idle,
    Pending(AnalysisJob),
    Ready(String),
    Failed(String),
}

pub struct App {
    pub session: RaceSession,
    pub config: Config,
    store: Box<dyn SessionStore>,
    pub view: View,
    /// board row
    pub selected: usize,
    /// lap log row
    pub log_selected: usize,
    pub filter: RunnerFilter,
    pub sort: SortMode,
    pub confirm: Option<PendingConfirm>,
    pub input: Option<TextInput>,
    pub toasts: Vec<Toast>,
    pub analysis: AnalysisState,
    last_save: Instant,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        session: RaceSession,
        store: Box<dyn SessionStore>,
        config: Config,
        now: Instant,
    ) -> Self {
        Self {
            session,
            config,
            store,
            view: View::Board,
            selected: 0,
            log_selected: 0,
            filter: RunnerFilter::All,
            sort: SortMode::Grouped,
            confirm: None,
            input: None,
            toasts: Vec::new(),
            analysis: AnalysisState::Idle,
            last_save: now,
            should_quit: false,
        }
    }

    pub fn runners(&self) -> &RunnerStore {
        self.session.store()
    }

    pub fn selected_runner(&self) -> Option<RunnerId> {
        self.runners().runners().get(self.selected).map(|r| r.id)
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        split_log(
            self.runners(),
            self.filter,
            self.sort,
            self.session.target_pace().ms,
        )
    }

    pub fn export_dir(&self) -> PathBuf {
        self.config
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn notify(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            expires_at: now + TOAST_TTL,
        });
    }

    fn report(&mut self, err: RaceError, now: Instant) {
        self.notify(ToastKind::Error, err.to_string(), now);
    }

    pub fn save(&mut self, now: Instant) {
        match self.store.save(&self.session.snapshot()) {
            Ok(()) => self.last_save = now,
            Err(e) => {
                warn!("failed to save session: {e}");
                self.notify(ToastKind::Error, format!("Save failed: {e}"), now);
            }
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.session.tick(now);
        self.drain_session_events(now);
        self.poll_analysis(now);
        self.toasts.retain(|t| t.expires_at > now);

        let autosave = Duration::from_secs(self.config.autosave_secs);
        if self.session.is_running() && now.duration_since(self.last_save) >= autosave {
            self.save(now);
        }
    }

    fn drain_session_events(&mut self, now: Instant) {
        for event in self.session.take_events() {
            match event {
                SessionEvent::AllFinished => {
                    self.notify(ToastKind::Success, "All runners finished, clock stopped", now);
                    self.save(now);
                }
            }
        }
    }

    fn poll_analysis(&mut self, now: Instant) {
        let AnalysisState::Pending(job) = &self.analysis else {
            return;
        };
        let Some(result) = job.poll() else {
            return;
        };
        let next = match result {
            Ok(text) => {
                self.notify(ToastKind::Success, "Analysis ready", now);
                AnalysisState::Ready(text)
            }
            Err(e) => {
                self.notify(ToastKind::Error, e.to_string(), now);
                AnalysisState::Failed(e.to_string())
            }
        };
        self.analysis = next;
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.confirm.is_some() {
            self.handle_confirm_key(key, now);
            return;
        }
        if self.input.is_some() {
            self.handle_input_key(key, now);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.toggle_clock(now),
            KeyCode::Char('r') => self.request(Destructive::ResetAll, now),
            KeyCode::Char('a') => self.add_runner(now),
            KeyCode::Char('x') => self.remove_selected(now),
            KeyCode::Char('D') => self.request(Destructive::DeleteAllRunners, now),
            KeyCode::Up => self.move_selection(false),
            KeyCode::Down => self.move_selection(true),
            KeyCode::Enter | KeyCode::Char('s') => {
                if let Some(id) = self.selected_runner() {
                    self.split(id, now);
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let position = c as usize - '1' as usize;
                if let Some(id) = self.runners().runners().get(position).map(|r| r.id) {
                    self.split(id, now);
                }
            }
            KeyCode::Char('f') => {
                if let Some(id) = self.selected_runner() {
                    self.finish(id, now);
                }
            }
            KeyCode::Char('n') => self.open_rename(now),
            KeyCode::Char('t') => {
                let buffer = self.session.target_pace().raw.clone();
                self.input = Some(TextInput {
                    kind: InputKind::TargetPace,
                    buffer,
                });
            }
            KeyCode::Char('i') => {
                self.input = Some(TextInput {
                    kind: InputKind::ImportPath,
                    buffer: String::new(),
                });
            }
            KeyCode::Char('e') => self.export(now),
            KeyCode::Char('T') => self.write_template(now),
            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::Char('o') => {
                self.sort = self.sort.toggled();
                self.log_selected = 0;
            }
            KeyCode::Left => self.cycle_filter(false),
            KeyCode::Right => self.cycle_filter(true),
            KeyCode::Char('g') => self.start_analysis(now),
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(pending) = self.confirm.take() {
                    self.apply(pending.action, now);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.confirm = None,
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => self.input = None,
            KeyCode::Enter => {
                if let Some(input) = self.input.take() {
                    self.submit_input(input, now);
                }
            }
            KeyCode::Backspace => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_input(&mut self, input: TextInput, now: Instant) {
        match input.kind {
            InputKind::Rename(id) => match self.session.rename_runner(id, &input.buffer) {
                Ok(()) => self.save(now),
                Err(e) => self.report(e, now),
            },
            InputKind::TargetPace => {
                self.session.set_target_pace(input.buffer.trim());
                let message = match self.session.target_pace().ms {
                    0 => "Target pace cleared".to_string(),
                    ms => format!("Target pace {}", format_time(ms)),
                };
                self.notify(ToastKind::Info, message, now);
                self.save(now);
            }
            InputKind::ImportPath => self.import_from(Path::new(input.buffer.trim()), now),
        }
    }

    fn toggle_clock(&mut self, now: Instant) {
        if self.session.toggle_clock(now) {
            self.notify(ToastKind::Info, "Clock started", now);
        } else {
            let message = format!("Clock paused at {}", format_time(self.session.elapsed()));
            self.notify(ToastKind::Info, message, now);
            self.save(now);
        }
    }

    fn add_runner(&mut self, now: Instant) {
        self.session.add_runner();
        self.selected = self.runners().len().saturating_sub(1);
        self.save(now);
    }

    fn split(&mut self, id: RunnerId, now: Instant) {
        match self.session.record_split(id, now) {
            Ok(_) => self.save(now),
            Err(e) => self.report(e, now),
        }
    }

    fn finish(&mut self, id: RunnerId, now: Instant) {
        match self.session.finish_runner(id, now) {
            Ok(_) => {
                let message = self.runners().get(id).ok().map(|r| {
                    format!(
                        "{} finished in {}",
                        r.name,
                        format_time(r.final_time().unwrap_or_default())
                    )
                });
                if let Some(message) = message {
                    self.notify(ToastKind::Success, message, now);
                }
                self.drain_session_events(now);
                self.save(now);
            }
            Err(e) => self.report(e, now),
        }
    }

    fn open_rename(&mut self, now: Instant) {
        let Some(id) = self.selected_runner() else {
            return;
        };
        if self.session.elapsed() > 0 {
            self.report(RaceError::NamesLocked, now);
            return;
        }
        let buffer = self
            .runners()
            .get(id)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        self.input = Some(TextInput {
            kind: InputKind::Rename(id),
            buffer,
        });
    }

    fn remove_selected(&mut self, now: Instant) {
        if self.view == View::LapLog {
            let target = self
                .log_entries()
                .get(self.log_selected)
                .map(|e| (e.runner_id, e.split.id));
            if let Some((runner, split)) = target {
                self.request(Destructive::DeleteSplit { runner, split }, now);
            }
        } else if self.view == View::Board {
            if let Some(id) = self.selected_runner() {
                self.request(Destructive::RemoveRunner(id), now);
            }
        }
    }

    /// Applies straight away or parks the action behind a confirmation.
    fn request(&mut self, action: Destructive, now: Instant) {
        match self.session.review(&action) {
            Ok(Review::Immediate) => self.apply(action, now),
            Ok(Review::Confirm(prompt)) => self.confirm = Some(PendingConfirm { action, prompt }),
            Err(e) => self.report(e, now),
        }
    }

    fn apply(&mut self, action: Destructive, now: Instant) {
        if let Err(e) = self.session.apply(action, now) {
            self.report(e, now);
            return;
        }
        match action {
            Destructive::ResetAll => {
                self.analysis = AnalysisState::Idle;
                self.notify(ToastKind::Info, "Race reset", now);
            }
            Destructive::RemoveRunner(_) | Destructive::DeleteAllRunners => {
                if let RunnerFilter::Only(id) = self.filter {
                    if self.runners().get(id).is_err() {
                        self.filter = RunnerFilter::All;
                    }
                }
            }
            Destructive::DeleteSplit { .. } => {}
        }
        self.clamp_selection();
        self.save(now);
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.runners().len().saturating_sub(1));
        self.log_selected = self
            .log_selected
            .min(self.log_entries().len().saturating_sub(1));
    }

    fn move_selection(&mut self, down: bool) {
        let len = if self.view == View::LapLog {
            self.log_entries().len()
        } else {
            self.runners().len()
        };
        let cursor = if self.view == View::LapLog {
            &mut self.log_selected
        } else {
            &mut self.selected
        };
        if down {
            if *cursor + 1 < len {
                *cursor += 1;
            }
        } else {
            *cursor = cursor.saturating_sub(1);
        }
    }

    /// Steps through "all runners" and then each runner in board order.
    fn cycle_filter(&mut self, forward: bool) {
        let mut options = vec![RunnerFilter::All];
        options.extend(self.runners().runners().iter().map(|r| RunnerFilter::Only(r.id)));
        let pos = options.iter().position(|f| *f == self.filter).unwrap_or(0);
        let next = if forward {
            (pos + 1) % options.len()
        } else {
            (pos + options.len() - 1) % options.len()
        };
        self.filter = options[next];
        self.log_selected = 0;
    }

    fn import_from(&mut self, path: &Path, now: Instant) {
        let result = fs::read_to_string(path)
            .map_err(RaceError::from)
            .and_then(|text| self.session.import_names(&text));
        match result {
            Ok(ids) => {
                self.notify(
                    ToastKind::Success,
                    format!("Imported {} runners", ids.len()),
                    now,
                );
                self.save(now);
            }
            Err(e) => self.report(e, now),
        }
    }

    fn export(&mut self, now: Instant) {
        let path = self
            .export_dir()
            .join(transfer::export_file_name(Local::now().date_naive()));
        match export_to(self.runners(), &path) {
            Ok(rows) => self.notify(
                ToastKind::Success,
                format!("Exported {rows} rows to {}", path.display()),
                now,
            ),
            Err(e) => self.report(e, now),
        }
    }

    fn write_template(&mut self, now: Instant) {
        let path = self.export_dir().join(TEMPLATE_FILE_NAME);
        let result = File::create(&path)
            .map_err(RaceError::from)
            .and_then(transfer::write_template);
        match result {
            Ok(()) => self.notify(
                ToastKind::Success,
                format!("Template written to {}", path.display()),
                now,
            ),
            Err(e) => self.report(e, now),
        }
    }

    fn start_analysis(&mut self, now: Instant) {
        if matches!(self.analysis, AnalysisState::Pending(_)) {
            self.notify(ToastKind::Info, "Analysis already running", now);
            return;
        }
        let Some(command) = self.config.analysis_command.clone() else {
            self.report(
                RaceError::Analysis("no analysis command configured".into()),
                now,
            );
            return;
        };
        match AnalysisJob::spawn(CommandAnalyst::new(command), self.runners()) {
            Ok(job) => {
                self.analysis = AnalysisState::Pending(job);
                self.view = View::Analysis;
            }
            Err(e) => self.report(e, now),
        }
    }
}

/// Refuses before touching the file system when there is nothing to write.
fn export_to(store: &RunnerStore, path: &Path) -> splitwatch::Result<usize> {
    if !store.has_splits() {
        return Err(RaceError::NothingToExport);
    }
    transfer::write_csv(store, File::create(path)?)
}

/// The TUI owns the terminal, so diagnostics only go to a file when asked.
fn init_tracing(log_file: Option<&Path>) -> io::Result<()> {
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }
    Ok(())
}

fn run_headless<S: SessionStore>(
    cli: &Cli,
    mut session: RaceSession,
    mut store: S,
) -> Result<(), Box<dyn Error>> {
    let now = Instant::now();
    if cli.reset {
        session.apply(Destructive::ResetAll, now)?;
        println!("Session reset");
    }
    if let Some(path) = &cli.import {
        let text = fs::read_to_string(path)?;
        let ids = session.import_names(&text)?;
        println!("Imported {} runners", ids.len());
    }
    if let Some(path) = &cli.export {
        let rows = export_to(session.store(), path)?;
        println!("Exported {rows} rows to {}", path.display());
    }
    if let Some(path) = &cli.template {
        transfer::write_template(File::create(path)?)?;
        println!("Template written to {}", path.display());
    }
    store.save(&session.snapshot())?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config_store = FileConfigStore::new();
    let config = cli.apply_to(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
        info!(path = %config_store.path().display(), "config saved");
    }

    let db = match &config.db_path {
        Some(path) => SessionDb::open(path)?,
        None => SessionDb::open_default()?,
    };
    let session =
        RaceSession::restore(db.load()).with_finish_threshold(config.finish_threshold_ms);

    if cli.is_headless() {
        return run_headless(&cli, session, db);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_loop = EventLoop::new(
        CrosstermEventSource::new(),
        FixedTicker::from_millis(config.tick_ms),
    );
    let mut app = App::new(session, Box::new(db), config, Instant::now());
    let result = start_tui(&mut terminal, &mut app, &event_loop);
    app.save(Instant::now());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_loop: &EventLoop<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    while !app.should_quit {
        match event_loop.step(app.session.is_running()) {
            TimerEvent::Key(key) => app.handle_key(key, Instant::now()),
            TimerEvent::Resize | TimerEvent::Tick => {}
        }
        app.on_tick(Instant::now());
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}

#[cfg(test)]
impl App {
    pub(crate) fn for_tests(session: RaceSession) -> Self {
        let store = SessionDb::open_in_memory().expect("in-memory db");
        Self::new(session, Box::new(store), Config::default(), Instant::now())
    }
}
