mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, BufWriter},
    path::PathBuf,
    time::Instant,
};
use tracing::{info, warn};
use tunecast::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    error::{ConfigError, TransitionError},
    events::{EventBus, EventLog, GameEvent},
    history::{HistoryDb, HistorySummary},
    logging::{self, LogTarget},
    presets,
    runtime::{CrosstermInputSource, FixedTicker, InputEvent, Runner, Ticker},
    session::{GameSession, SessionConfig, SessionReport},
    tune::{GameMode, TuneBook, TuneKey, MAX_TUNE_KEY},
};

/// hold-and-release tune timing game: charm the snakes and get out of the cave
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Hold a tune key while the slider fills and let go inside the zone. A good cast heals you, a late one lets the snake strike. Health drains while you play; reach the exit before it runs out."
)]
pub struct Cli {
    /// game mode; advanced widens zones, unlocks extra tunes and drains faster
    #[clap(short = 'm', long, value_enum)]
    mode: Option<GameMode>,

    /// built-in tune preset to play with
    #[clap(short = 'p', long)]
    preset: Option<String>,

    /// JSON file with tune definitions, used instead of the preset
    #[clap(short = 't', long, value_name = "FILE")]
    tunes: Option<PathBuf>,

    /// milliseconds of game time per tick
    #[clap(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// turn off health drain
    #[clap(long)]
    no_drain: bool,

    /// print the tunes for the selected mode and exit
    #[clap(long)]
    list_tunes: bool,

    /// print recent sessions and all-time totals and exit
    #[clap(long)]
    history: bool,

    /// write the session history as CSV and exit
    #[clap(long, value_name = "FILE")]
    export_csv: Option<PathBuf>,

    /// delete all saved sessions and exit
    #[clap(long)]
    clear_history: bool,

    /// save the other options given here as the new defaults and exit
    #[clap(long)]
    save_config: bool,

    /// where to write logs while the game is running
    #[clap(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command line flags win over the saved config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(preset) = &self.preset {
            config.preset = preset.clone();
            config.tunes_file = None;
        }
        if let Some(path) = &self.tunes {
            config.tunes_file = Some(path.clone());
        }
        if let Some(ms) = self.tick_ms {
            config.tick_rate_ms = ms;
        }
        if self.no_drain {
            config.health.drain_enabled = false;
        }
        config
    }

    fn is_batch(&self) -> bool {
        self.list_tunes
            || self.history
            || self.export_csv.is_some()
            || self.clear_history
            || self.save_config
    }

    fn log_target(&self) -> LogTarget {
        if self.is_batch() {
            return LogTarget::Stderr;
        }
        let path = self
            .log_file
            .clone()
            .or_else(AppDirs::log_path)
            .unwrap_or_else(|| PathBuf::from("tunecast.log"));
        LogTarget::File(path)
    }
}

fn load_book(config: &Config) -> Result<TuneBook, ConfigError> {
    match &config.tunes_file {
        Some(path) => presets::load_file(path),
        None => presets::load_preset(&config.preset),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Playing,
    Results,
}

#[derive(Debug)]
pub struct App {
    pub session: GameSession,
    pub state: AppState,
    /// Last thing worth telling the player.
    pub message: Option<String>,
    pub history: Option<HistoryDb>,
    pub history_summary: Option<HistorySummary>,
    /// The terminal reports key releases, so tunes can really be held.
    pub release_events: bool,
    feed: EventLog,
}

impl App {
    pub fn new(
        config: &Config,
        book: TuneBook,
        history: Option<HistoryDb>,
        release_events: bool,
    ) -> Self {
        let feed = EventLog::new();
        let mut bus = EventBus::new();
        bus.subscribe(feed.clone());

        let mut session = GameSession::new(SessionConfig::from(config), book, bus);
        session.start(config.mode);
        let history_summary = history.as_ref().and_then(|db| db.summary().ok());

        Self {
            session,
            state: AppState::Playing,
            message: None,
            history,
            history_summary,
            release_events,
            feed,
        }
    }

    pub fn on_tick(&mut self, delta: f64) {
        self.session.tick(delta);
        self.drain_events();
    }

    /// Returns true when the player asked to quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        match key.kind {
            KeyEventKind::Repeat => return false,
            KeyEventKind::Release => {
                if let KeyCode::Char(c) = key.code {
                    if let Some(tune) = tune_key(c) {
                        let _ = self.session.release_key(tune);
                        self.drain_events();
                    }
                }
                return false;
            }
            KeyEventKind::Press => {}
        }

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            _ => {}
        }

        match self.state {
            AppState::Playing => match key.code {
                KeyCode::Char(' ') => {
                    let _ = self.session.release();
                }
                KeyCode::Char('c') => {
                    let _ = self.session.cancel();
                }
                KeyCode::Char('e') => {
                    if let Ok(attempt) = self.session.approach_exit() {
                        self.message = ui::exit_message(attempt);
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(tune) = tune_key(c) {
                        self.on_tune_key(tune);
                    }
                }
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.restart(self.session.mode()),
                KeyCode::Char('m') => self.restart(self.session.mode().toggled()),
                _ => {}
            },
        }
        self.drain_events();
        false
    }

    fn on_tune_key(&mut self, tune: TuneKey) {
        let held = self.session.caster().current().map(|a| a.tune());
        if held == Some(tune) && !self.release_events {
            let _ = self.session.release();
            return;
        }
        match self.session.press(tune) {
            Ok(()) => self.message = None,
            Err(e @ (TransitionError::TuneLocked(_) | TransitionError::UnknownTune(_))) => {
                self.message = Some(e.to_string());
            }
            Err(_) => {}
        }
    }

    fn restart(&mut self, mode: GameMode) {
        self.session.restart_in(mode);
        self.feed.take();
        self.message = None;
        self.state = AppState::Playing;
    }

    /// Turns session events into screen state.
    fn drain_events(&mut self) {
        for event in self.feed.take() {
            match event {
                GameEvent::TuneResolved(resolved) => {
                    self.message = Some(ui::resolution_message(
                        self.session.caster().book(),
                        &resolved,
                    ));
                }
                GameEvent::SessionEnded(report) => {
                    self.save_report(&report);
                    self.state = AppState::Results;
                }
                _ => {}
            }
        }
    }

    fn save_report(&mut self, report: &SessionReport) {
        let Some(db) = &self.history else {
            return;
        };
        if let Err(e) = db.record_session(report, Local::now()) {
            warn!(error = %e, "could not save session to history");
        }
        self.history_summary = db.summary().ok();
    }
}

/// Digit keys 1-4 map to tune keys.
fn tune_key(c: char) -> Option<TuneKey> {
    c.to_digit(10)
        .filter(|d| (1..=u32::from(MAX_TUNE_KEY)).contains(d))
        .map(|d| TuneKey(d as u8))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_target()) {
        eprintln!("tunecast: logging disabled: {e}");
    }

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());

    if cli.is_batch() {
        return run_batch(&cli, &config, &store);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let book = load_book(&config)?;
    let history = match HistoryDb::open_default() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %e, "history disabled");
            None
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(mode = %config.mode, release_events, tunes = book.len(), "starting game");
    let mut app = App::new(&config, book, history, release_events);
    let result = start_tui(
        &mut terminal,
        &mut app,
        FixedTicker::from_millis(config.tick_rate_ms),
    );

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    ticker: FixedTicker,
) -> Result<(), Box<dyn Error>> {
    let interval = ticker.interval();
    let runner = Runner::new(CrosstermInputSource::new(), ticker);
    let delta = runner.tick_seconds();
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step();
        if let InputEvent::Key(key) = event {
            if app.on_key(key) {
                break;
            }
        }
        // Key traffic must not starve the game clock.
        if last_tick.elapsed() >= interval {
            app.on_tick(delta);
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn run_batch(
    cli: &Cli,
    config: &Config,
    store: &FileConfigStore,
) -> Result<(), Box<dyn Error>> {
    if cli.save_config {
        store.save(config)?;
        println!("saved config to {}", store.path().display());
    }
    if cli.list_tunes {
        let book = load_book(config)?;
        print_tunes(&book, config.mode);
    }
    if cli.history || cli.export_csv.is_some() || cli.clear_history {
        let db = HistoryDb::open_default()?;
        if cli.history {
            print_history(&db)?;
        }
        if let Some(path) = &cli.export_csv {
            let count = db.export_csv(BufWriter::new(File::create(path)?))?;
            println!("exported {count} sessions to {}", path.display());
        }
        if cli.clear_history {
            db.clear()?;
            println!("history cleared");
        }
    }
    Ok(())
}

fn print_tunes(book: &TuneBook, mode: GameMode) {
    println!("presets: {}", presets::preset_names().join(", "));
    println!("tunes ({} mode):", mode.to_string().to_lowercase());
    for def in book.iter() {
        let zone = def.effective_zone(mode);
        let locked = def.advanced_only() && mode != GameMode::Advanced;
        println!(
            "  {}  {:<8} {:>4.1}s  zone {:.2}-{:.2}  heal {:>2}  damage {:>2}{}",
            def.key(),
            def.name(),
            def.duration(),
            zone.start(),
            zone.end(),
            def.heal(),
            def.damage(),
            if locked { "  (advanced only)" } else { "" }
        );
    }
}

fn print_history(db: &HistoryDb) -> Result<(), Box<dyn Error>> {
    let summary = db.summary()?;
    let rate = summary
        .success_rate()
        .map(|r| format!("{:.0}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} sessions, {} won, {} lost, success rate {}",
        summary.sessions, summary.wins, summary.losses, rate
    );
    for record in db.recent(10)? {
        let t = &record.report.tally;
        println!(
            "  {}  {:<8} {:<4} {:>6.1}s  {} ok / {} failed  HP {} -> {}",
            record.played_at.format("%Y-%m-%d %H:%M"),
            record.report.mode.to_string().to_lowercase(),
            record.report.result.to_string().to_lowercase(),
            record.report.elapsed_secs,
            t.successes,
            t.failures,
            t.starting_health,
            t.ending_health
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tunecast::session::{GameState, SessionResult};
    use tunecast::snake::SnakeState;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn release(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Release)
    }

    fn test_app(release_events: bool) -> App {
        let config = Config {
            health: tunecast::health::HealthConfig {
                drain_enabled: false,
                ..Default::default()
            },
            ..Config::default()
        };
        let book = load_book(&config).unwrap();
        App::new(&config, book, None, release_events)
    }

    /// Casts Move inside its zone so the snake clears the path.
    fn charm_snake(app: &mut App) {
        app.on_key(press('1'));
        tick_for(app, 1.5);
        app.on_key(press('1'));
    }

    fn tick_for(app: &mut App, secs: f64) {
        let steps = (secs / 0.1).round() as usize;
        for _ in 0..steps {
            app.on_tick(0.1);
        }
    }

    #[test]
    fn test_cli_defaults_leave_config_alone() {
        let cli = Cli::parse_from(["tunecast"]);
        assert!(!cli.is_batch());
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "tunecast",
            "--mode",
            "advanced",
            "--preset",
            "practice",
            "--tick-ms",
            "20",
            "--no-drain",
        ]);
        let config = cli.apply(Config::default());
        assert_eq!(config.mode, GameMode::Advanced);
        assert_eq!(config.preset, "practice");
        assert_eq!(config.tick_rate_ms, 20);
        assert!(!config.health.drain_enabled);
    }

    #[test]
    fn test_batch_flags_log_to_stderr() {
        let cli = Cli::parse_from(["tunecast", "--list-tunes"]);
        assert!(cli.is_batch());
        assert_eq!(cli.log_target(), LogTarget::Stderr);

        for flag in ["--clear-history", "--save-config"] {
            assert!(Cli::parse_from(["tunecast", flag]).is_batch());
        }

        let cli = Cli::parse_from(["tunecast", "--log-file", "/tmp/t.log"]);
        assert_eq!(cli.log_target(), LogTarget::File(PathBuf::from("/tmp/t.log")));
    }

    #[test]
    fn test_tune_key_mapping() {
        assert_eq!(tune_key('1'), Some(TuneKey(1)));
        assert_eq!(tune_key('4'), Some(TuneKey(4)));
        assert_eq!(tune_key('5'), None);
        assert_eq!(tune_key('0'), None);
        assert_eq!(tune_key('x'), None);
    }

    #[test]
    fn test_press_again_releases_without_release_events() {
        let mut app = test_app(false);
        app.on_key(press('1'));
        assert!(app.session.caster().is_holding());
        tick_for(&mut app, 1.5);
        app.on_key(press('1'));

        assert!(!app.session.caster().is_holding());
        assert_eq!(app.session.tally().successes, 1);
        assert_eq!(app.message.as_deref(), Some("Move: cast at 50% (+15 HP)"));
    }

    #[test]
    fn test_key_release_event_releases_held_tune() {
        let mut app = test_app(true);
        app.on_key(press('2'));
        tick_for(&mut app, 0.4);
        app.on_key(release('1'));
        assert!(app.session.caster().is_holding());

        app.on_key(release('2'));
        assert!(!app.session.caster().is_holding());
        assert_eq!(app.session.tally().too_early, 1);
    }

    #[test]
    fn test_locked_tune_shows_a_message() {
        let mut app = test_app(false);
        app.on_key(press('4'));
        assert!(!app.session.caster().is_holding());
        assert!(app.message.as_deref().unwrap_or("").contains("locked"));
    }

    #[test]
    fn test_exit_is_blocked_until_the_snake_is_charmed() {
        let mut app = test_app(false);
        app.on_key(press('e'));
        assert_eq!(app.state, AppState::Playing);
        assert!(app.message.as_deref().unwrap_or("").contains("blocks the way"));

        charm_snake(&mut app);
        assert_eq!(app.session.snake().state(), SnakeState::MovedAway);
        app.on_key(press('e'));
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn test_exit_shows_results_and_restart_plays_again() {
        let mut app = test_app(false);
        charm_snake(&mut app);
        app.on_key(press('e'));
        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.session.report().map(|r| r.result), Some(SessionResult::Win));

        app.on_key(press('m'));
        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.session.state(), GameState::Playing);
        assert_eq!(app.session.mode(), GameMode::Advanced);
        assert_eq!(app.session.snake().state(), SnakeState::Idle);
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let mut app = test_app(false);
        assert!(app.on_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!app.on_key(press('c')));
    }

    #[test]
    fn test_session_end_is_saved_to_history() {
        let config = Config::default();
        let book = load_book(&config).unwrap();
        let db = HistoryDb::open_in_memory().unwrap();
        let mut app = App::new(&config, book, Some(db), false);

        charm_snake(&mut app);
        app.on_key(press('e'));
        let summary = app.history_summary.unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.wins, 1);
    }
}
