pub mod screen;
pub mod slider;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
    Frame,
};
use tunecast::{
    attempt::{Magnitude, Resolution, Resolved},
    session::{ExitAttempt, GameSession, SessionReport, SessionResult},
    snake::{Snake, SnakeState},
    tally::TallySnapshot,
    tune::{GameMode, TuneBook},
    zone::{Outcome, TimingState},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

/// One line describing how an attempt ended.
pub fn resolution_message(book: &TuneBook, resolved: &Resolved) -> String {
    let name = book
        .get(resolved.tune)
        .map(|def| def.name().to_string())
        .unwrap_or_else(|| format!("tune {}", resolved.tune));
    let pct = resolved.position * 100.0;
    let effect = match resolved.emission.map(|e| e.magnitude) {
        Some(Magnitude::Heal(n)) => format!(" (+{n} HP)"),
        Some(Magnitude::Damage(n)) => format!(" (-{n} HP)"),
        None => String::new(),
    };
    match resolved.resolution {
        Resolution::Outcome(Outcome::Success) => format!("{name}: cast at {pct:.0}%{effect}"),
        Resolution::Outcome(Outcome::TooEarly) => format!("{name}: too early at {pct:.0}%"),
        Resolution::Outcome(Outcome::TooLate) => {
            format!("{name}: too late, the snake strikes{effect}")
        }
        Resolution::Cancelled => format!("{name}: cancelled"),
    }
}

/// What to tell the player after trying for the exit. Escaping needs no
/// message, the results screen says it all.
pub fn exit_message(attempt: ExitAttempt) -> Option<String> {
    match attempt {
        ExitAttempt::Escaped => None,
        ExitAttempt::Blocked(SnakeState::Frozen) => {
            Some("The frozen snake still blocks the way".to_string())
        }
        ExitAttempt::Blocked(_) => Some("The snake blocks the way. Charm it first".to_string()),
        ExitAttempt::Bitten(n) => Some(format!("The angry snake bites (-{n} HP)")),
    }
}

pub fn snake_line(snake: &Snake) -> String {
    let state = match snake.state() {
        SnakeState::Idle => "blocking the path",
        SnakeState::Aggressive => "aggressive, bites on contact",
        SnakeState::MovedAway => "moved away, the path is clear",
        SnakeState::Sleeping => "asleep, the path is clear",
        SnakeState::AttackingEnemy => "busy attacking something else",
        SnakeState::Frozen => "frozen in place",
    };
    match snake.remaining() {
        Some(secs) => format!("snake: {state} ({secs:.1}s)"),
        None => format!("snake: {state}"),
    }
}

fn snake_color(state: SnakeState) -> Color {
    match state {
        SnakeState::Idle => Color::Green,
        SnakeState::Aggressive => Color::Red,
        SnakeState::Frozen => Color::Cyan,
        SnakeState::MovedAway | SnakeState::Sleeping | SnakeState::AttackingEnemy => {
            Color::DarkGray
        }
    }
}

pub fn tally_line(t: &TallySnapshot) -> String {
    format!(
        "{} ok   {} early   {} late   {} cancelled   +{} / -{} HP",
        t.successes, t.too_early, t.too_late, t.cancelled, t.hp_restored, t.damage_taken
    )
}

fn mode_label(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Simple => "simple",
        GameMode::Advanced => "advanced",
    }
}

pub fn render_play(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let book = session.caster().book();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),                     // title
            Constraint::Length(3),                     // health
            Constraint::Length(4),                     // slider
            Constraint::Length(1),                     // snake
            Constraint::Length(book.len() as u16 + 2), // tune list
            Constraint::Length(1),                     // tally
            Constraint::Length(1),                     // last resolution
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!(
            "tunecast · {} mode · {:.1}s",
            mode_label(session.mode()),
            session.elapsed()
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    render_health(session, chunks[1], buf);
    render_slider(session, chunks[2], buf);

    Paragraph::new(Span::styled(
        snake_line(session.snake()),
        Style::default().fg(snake_color(session.snake().state())),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let tunes: Vec<Line> = book
        .iter()
        .map(|def| {
            let zone = def.effective_zone(session.mode());
            let locked = def.advanced_only() && !session.caster().advanced_unlocked();
            let held = session
                .caster()
                .current()
                .is_some_and(|a| a.tune() == def.key());
            let style = if held {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else if locked {
                dim_style
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!(
                    "({}) {:<8} {:>4.1}s  zone {:>3.0}-{:<3.0}%  {}{}",
                    def.key(),
                    def.name(),
                    def.duration(),
                    zone.start() * 100.0,
                    zone.end() * 100.0,
                    def.description(),
                    if locked { "  [advanced]" } else { "" }
                ),
                style,
            ))
        })
        .collect();
    Paragraph::new(tunes)
        .block(Block::default().borders(Borders::ALL).title(" tunes "))
        .render(chunks[4], buf);

    Paragraph::new(Span::raw(tally_line(&session.tally())))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    if let Some(message) = &app.message {
        Paragraph::new(Span::styled(message.as_str(), italic_style.fg(Color::Cyan)))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }

    let legend = if app.release_events {
        "hold (1-4) and let go in the zone / (c)ancel / (e)xit past the snake / (esc)ape"
    } else {
        "(1-4) start, same key or (space) release / (c)ancel / (e)xit past the snake / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style))
        .wrap(Wrap { trim: true })
        .render(chunks[8], buf);
}

fn render_health(session: &GameSession, area: Rect, buf: &mut Buffer) {
    let health = session.health();
    let ratio = health.percentage().clamp(0.0, 1.0);
    let color = match ratio {
        r if r <= 0.25 => Color::Red,
        r if r <= 0.5 => Color::Yellow,
        _ => Color::Green,
    };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" health "))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(match health.drain_rate() {
            rate if rate > 0.0 => {
                format!("{} / {}  (-{:.1} HP/s)", health.rounded(), health.max(), rate)
            }
            _ => format!("{} / {}", health.rounded(), health.max()),
        })
        .render(area, buf);
}

fn render_slider(session: &GameSession, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    let width = inner.width as usize;

    let (title, lines) = match session.caster().current() {
        Some(attempt) => {
            let name = session
                .caster()
                .book()
                .get(attempt.tune())
                .map(|def| def.name().to_string())
                .unwrap_or_default();
            let state = attempt.timing_state();
            let title = format!(" {name} {:.0}% ", attempt.position() * 100.0);
            (
                title,
                slider::slider_lines(width, &attempt.zone(), Some(attempt.position()), state),
            )
        }
        None => (
            " idle ".to_string(),
            [
                Line::default(),
                Line::from(Span::styled(
                    slider::FAIL_CELL.to_string().repeat(width),
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        ),
    };

    let state = session
        .caster()
        .current()
        .map_or(TimingState::None, |a| a.timing_state());
    let title_style = Style::default().fg(slider::timing_color(state));
    block
        .title(Span::styled(title, title_style))
        .render(area, buf);
    Paragraph::new(lines.to_vec()).render(inner, buf);
}

fn report_lines(report: &SessionReport) -> Vec<Line<'static>> {
    let t = &report.tally;
    let rate = t
        .success_rate()
        .map(|r| format!("{:.0}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string());
    vec![
        Line::from(format!(
            "{} mode · {:.1}s · HP {} → {}",
            mode_label(report.mode),
            report.elapsed_secs,
            t.starting_health,
            t.ending_health
        )),
        Line::from(format!(
            "{} successful / {} failed ({} early, {} late) · {} cancelled · success rate {}",
            t.successes, t.failures, t.too_early, t.too_late, t.cancelled, rate
        )),
        Line::from(format!(
            "{} snake attacks · {} damage taken · {} HP restored",
            t.snake_attacks, t.damage_taken, t.hp_restored
        )),
    ]
}

pub fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // headline
            Constraint::Length(1),
            Constraint::Length(3), // report
            Constraint::Length(1),
            Constraint::Length(1), // history
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(report) = app.session.report() else {
        return;
    };

    let (headline, color) = match report.result {
        SessionResult::Win => ("YOU ESCAPED THE CAVE", Color::Green),
        SessionResult::Lose => ("GAME OVER", Color::Red),
    };
    Paragraph::new(Span::styled(headline, bold_style.fg(color)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(report_lines(report))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(summary) = &app.history_summary {
        let rate = summary
            .success_rate()
            .map(|r| format!("{:.0}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        Paragraph::new(Span::styled(
            format!(
                "all time: {} sessions · {} won · {} lost · success rate {}",
                summary.sessions, summary.wins, summary.losses, rate
            ),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    Paragraph::new(Span::styled(
        format!(
            "(r)estart / (m)ode: switch to {} / (esc)ape",
            mode_label(app.session.mode().toggled())
        ),
        italic_style,
    ))
    .render(chunks[7], buf);
}
