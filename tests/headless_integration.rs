use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tunecast::events::{EventBus, EventLog, GameEvent};
use tunecast::health::HealthConfig;
use tunecast::presets;
use tunecast::runtime::{ChannelInputSource, FixedTicker, InputEvent, Runner};
use tunecast::session::{GameSession, GameState, SessionConfig, SessionResult};
use tunecast::snake::SnakeState;
use tunecast::tune::{GameMode, TuneKey};

fn key(c: char) -> InputEvent {
    InputEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn session(health: HealthConfig) -> (GameSession, EventLog) {
    let log = EventLog::new();
    let mut bus = EventBus::new();
    bus.subscribe(log.clone());
    let book = presets::load_preset("classic").unwrap();
    let mut session = GameSession::new(
        SessionConfig {
            mode: GameMode::Simple,
            health,
            ..SessionConfig::default()
        },
        book,
        bus,
    );
    session.start(GameMode::Simple);
    (session, log)
}

// Minimal game loop: digits start tunes, space releases, `e` heads for the
// exit, ticks advance time.
fn drive(session: &mut GameSession, runner: &Runner<ChannelInputSource, FixedTicker>, steps: u32) {
    for _ in 0..steps {
        match runner.step() {
            InputEvent::Tick => {
                session.tick(runner.tick_seconds());
            }
            InputEvent::Resize => {}
            InputEvent::Key(k) => match k.code {
                KeyCode::Char(' ') => {
                    let _ = session.release();
                }
                KeyCode::Char('e') => {
                    let _ = session.approach_exit();
                }
                KeyCode::Char(c) => {
                    if let Some(d) = c.to_digit(10) {
                        let _ = session.press(TuneKey(d as u8));
                    }
                }
                _ => {}
            },
        }
        if !session.is_playing() {
            break;
        }
    }
}

#[test]
fn headless_cast_heals_the_player() {
    let (mut session, log) = session(HealthConfig {
        drain_enabled: false,
        ..HealthConfig::default()
    });

    let (tx, rx) = mpsc::channel();
    tx.send(key('1')).unwrap();
    for _ in 0..15 {
        tx.send(InputEvent::Tick).unwrap();
    }
    tx.send(key(' ')).unwrap();
    drop(tx);

    let runner = Runner::new(ChannelInputSource::new(rx), FixedTicker::from_millis(100));
    drive(&mut session, &runner, 17);

    assert_eq!(session.tally().successes, 1);
    assert_eq!(session.health().rounded(), 45);
    assert_eq!(log.count(|e| matches!(e, GameEvent::PlayerHealed(15))), 1);
    assert!((session.elapsed() - 1.5).abs() < 1e-9);
}

#[test]
fn headless_drain_ends_the_session() {
    let (mut session, log) = session(HealthConfig::default());

    // A closed channel makes every step an immediate tick.
    let (tx, rx) = mpsc::channel::<InputEvent>();
    drop(tx);
    let runner = Runner::new(ChannelInputSource::new(rx), FixedTicker::from_millis(100));
    drive(&mut session, &runner, 1_000);

    assert_eq!(session.state(), GameState::Lost);
    // 30 HP at 2.5 HP/s
    assert!((session.elapsed() - 12.0).abs() < 0.11);
    let report = session.report().unwrap();
    assert_eq!(report.result, SessionResult::Lose);
    assert_eq!(report.tally.ending_health, 0);
    assert_eq!(log.count(|e| matches!(e, GameEvent::GameOver)), 1);
}

#[test]
fn headless_held_tune_times_out_once() {
    let (mut session, _log) = session(HealthConfig {
        drain_enabled: false,
        ..HealthConfig::default()
    });

    let (tx, rx) = mpsc::channel();
    tx.send(key('3')).unwrap();
    drop(tx);
    let runner = Runner::new(ChannelInputSource::new(rx), FixedTicker::from_millis(50));
    // Attack lasts 5s: 100 ticks, then some extra.
    drive(&mut session, &runner, 150);

    let tally = session.tally();
    assert_eq!(tally.too_late, 1);
    assert_eq!(tally.damage_taken, 20);
    assert_eq!(session.health().rounded(), 10);
    assert_eq!(session.snake().state(), SnakeState::Aggressive);
    assert!(session.is_playing());
}

#[test]
fn headless_charmed_snake_lets_the_player_out() {
    let (mut session, log) = session(HealthConfig {
        drain_enabled: false,
        ..HealthConfig::default()
    });

    let (tx, rx) = mpsc::channel();
    tx.send(key('e')).unwrap();
    tx.send(key('1')).unwrap();
    for _ in 0..15 {
        tx.send(InputEvent::Tick).unwrap();
    }
    tx.send(key(' ')).unwrap();
    tx.send(key('e')).unwrap();
    drop(tx);

    let runner = Runner::new(ChannelInputSource::new(rx), FixedTicker::from_millis(100));
    drive(&mut session, &runner, 30);

    assert_eq!(session.state(), GameState::Won);
    assert_eq!(session.snake().state(), SnakeState::MovedAway);
    assert_eq!(log.count(|e| matches!(e, GameEvent::SnakeChanged(_))), 1);
    assert_eq!(log.count(|e| matches!(e, GameEvent::GameWon)), 1);
}

#[test]
fn headless_angry_snake_bites_at_the_exit() {
    let (mut session, _log) = session(HealthConfig {
        drain_enabled: false,
        ..HealthConfig::default()
    });

    let (tx, rx) = mpsc::channel();
    tx.send(key('3')).unwrap();
    for _ in 0..110 {
        tx.send(InputEvent::Tick).unwrap();
    }
    tx.send(key('e')).unwrap();
    drop(tx);

    let runner = Runner::new(ChannelInputSource::new(rx), FixedTicker::from_millis(50));
    drive(&mut session, &runner, 200);

    // 30 HP - 20 for the late release - 10 for the bite
    assert_eq!(session.state(), GameState::Lost);
    let report = session.report().unwrap();
    assert_eq!(report.tally.damage_taken, 30);
    assert_eq!(report.tally.snake_attacks, 2);
    assert_eq!(report.tally.ending_health, 0);
}
