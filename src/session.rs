use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attempt::{Magnitude, Resolved, TuneCaster};
use crate::error::TransitionError;
use crate::events::{EventBus, GameEvent};
use crate::health::{HealthChange, HealthConfig, HealthPool};
use crate::snake::{Snake, SnakeConfig, SnakeState};
use crate::tally::{SessionTally, TallySnapshot};
use crate::tune::{GameMode, TuneBook, TuneKey};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub health: HealthConfig,
    pub snake: SnakeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Simple,
            health: HealthConfig::default(),
            snake: SnakeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum GameState {
    Ready,
    Playing,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum SessionResult {
    Win,
    Lose,
}

/// What happened when the player headed for the exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAttempt {
    Escaped,
    /// The snake is still in the way.
    Blocked(SnakeState),
    /// Walked into an aggressive snake and took this much damage.
    Bitten(u32),
}

/// What a finished session looked like.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub mode: GameMode,
    pub result: SessionResult,
    pub elapsed_secs: f64,
    pub tally: TallySnapshot,
}

/// One play session: the tune caster, the player's health, the snake, the
/// tally and the event bus, all owned here and handed nothing global.
#[derive(Debug)]
pub struct GameSession {
    mode: GameMode,
    state: GameState,
    caster: TuneCaster,
    health: HealthPool,
    snake: Snake,
    tally: SessionTally,
    bus: EventBus,
    elapsed: f64,
    report: Option<SessionReport>,
}

impl GameSession {
    pub fn new(config: SessionConfig, book: TuneBook, bus: EventBus) -> Self {
        let health = HealthPool::new(config.health);
        let tally = SessionTally::new(health.rounded());
        debug!(subscribers = bus.subscriber_count(), "session created");
        Self {
            mode: config.mode,
            state: GameState::Ready,
            caster: TuneCaster::new(book),
            health,
            snake: Snake::new(config.snake),
            tally,
            bus,
            elapsed: 0.0,
            report: None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn caster(&self) -> &TuneCaster {
        &self.caster
    }

    pub fn health(&self) -> &HealthPool {
        &self.health
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    /// Seconds of play since the session started.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn tally(&self) -> TallySnapshot {
        self.tally.snapshot(self.health.rounded())
    }

    /// The report of the last finished session, if it has ended.
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn set_drain_enabled(&mut self, enabled: bool) {
        self.health.set_drain_enabled(enabled);
    }

    /// Starts (or restarts) play in `mode`. A tune still held from before is
    /// cancelled first.
    pub fn start(&mut self, mode: GameMode) {
        if let Some(resolved) = self.caster.set_input_enabled(false) {
            self.apply_resolution(resolved);
        }
        self.mode = mode;
        self.state = GameState::Playing;
        self.elapsed = 0.0;
        self.report = None;
        self.apply_mode(mode);
        self.tally.reset(self.health.rounded());
        if let Some(change) = self.snake.reset() {
            self.bus.publish(GameEvent::SnakeChanged(change));
        }
        self.caster.set_input_enabled(true);
        self.publish_health();
        info!(%mode, "game started");

        if self.health.is_dead() {
            warn!("session started with no health left");
            self.lose();
        }
    }

    /// Resets health and starts again in the current mode.
    pub fn restart(&mut self) {
        self.restart_in(self.mode);
    }

    /// Resets health and the snake, then starts again in `mode`.
    pub fn restart_in(&mut self, mode: GameMode) {
        self.health.reset();
        self.start(mode);
    }

    fn apply_mode(&mut self, mode: GameMode) {
        self.health.apply_mode(mode);
        match mode {
            GameMode::Simple => self.caster.lock_advanced(),
            GameMode::Advanced => self.caster.unlock_advanced(),
        }
        debug!(%mode, "mode settings applied");
    }

    pub fn press(&mut self, key: TuneKey) -> Result<(), TransitionError> {
        self.ensure_playing()?;
        let (zone, duration) = match self.caster.start(key, self.mode) {
            Ok(attempt) => (attempt.zone(), attempt.duration()),
            Err(e) => {
                debug!(tune = %key, error = %e, "ignoring tune press");
                return Err(e);
            }
        };
        self.bus.publish(GameEvent::TuneStarted {
            tune: key,
            zone,
            duration,
        });
        Ok(())
    }

    pub fn release(&mut self) -> Result<Resolved, TransitionError> {
        self.ensure_playing()?;
        let resolved = self.caster.release().inspect_err(|e| {
            debug!(error = %e, "ignoring tune release");
        })?;
        self.apply_resolution(resolved);
        Ok(resolved)
    }

    /// Releases only if `key` is the tune being held.
    pub fn release_key(&mut self, key: TuneKey) -> Result<Resolved, TransitionError> {
        match self.caster.current() {
            Some(attempt) if attempt.tune() == key => self.release(),
            held => {
                debug!(
                    tune = %key,
                    held = ?held.map(|a| a.tune()),
                    "ignoring release of a tune that is not held"
                );
                Err(TransitionError::NotHolding)
            }
        }
    }

    pub fn cancel(&mut self) -> Result<Resolved, TransitionError> {
        self.ensure_playing()?;
        let resolved = self.caster.cancel().inspect_err(|e| {
            debug!(error = %e, "ignoring tune cancel");
        })?;
        self.apply_resolution(resolved);
        Ok(resolved)
    }

    /// Advances the session clock by `delta` seconds: drains health, runs the
    /// snake's timers and moves the slider. Returns the timeout resolution if
    /// the slider ran out.
    pub fn tick(&mut self, delta: f64) -> Option<Resolved> {
        if !self.is_playing() {
            return None;
        }
        if !(delta.is_finite() && delta >= 0.0) {
            warn!(delta, "ignoring invalid tick delta");
            return None;
        }
        self.elapsed += delta;

        if let Some(change) = self.health.apply_drain(delta) {
            self.after_health_change(change);
            if !self.is_playing() {
                return None;
            }
        }
        if let Some(change) = self.snake.tick(delta) {
            self.bus.publish(GameEvent::SnakeChanged(change));
        }

        let resolved = self.caster.advance(delta)?;
        self.apply_resolution(resolved);
        Some(resolved)
    }

    /// Damage from a source outside the tune system.
    pub fn contact_damage(&mut self, amount: i32) {
        if let Some(applied) = self.take_contact(amount) {
            self.tally.record_damage(applied);
            self.after_contact(applied);
        }
    }

    /// Tries to get past the snake to the exit. Only a snake that has moved
    /// away, fallen asleep or turned on something else lets the player by;
    /// an aggressive one bites.
    pub fn approach_exit(&mut self) -> Result<ExitAttempt, TransitionError> {
        self.ensure_playing()?;
        let snake = self.snake.state();
        if !snake.blocks_path() {
            self.reach_exit();
            return Ok(ExitAttempt::Escaped);
        }
        let Some(damage) = self.snake.contact_damage() else {
            debug!(%snake, "snake blocks the exit");
            return Ok(ExitAttempt::Blocked(snake));
        };
        let applied = self
            .take_contact(clamp_i32(damage))
            .unwrap_or_default();
        self.tally.record_snake_bite(applied);
        info!(damage = applied, "snake bit the player");
        self.after_contact(applied);
        Ok(ExitAttempt::Bitten(applied))
    }

    fn take_contact(&mut self, amount: i32) -> Option<u32> {
        if !self.is_playing() {
            return None;
        }
        match self.health.take_damage(amount) {
            Ok(change) => change.map(|c| c.applied.round() as u32),
            Err(e) => {
                warn!(error = %e, "contact damage rejected");
                None
            }
        }
    }

    fn after_contact(&mut self, applied: u32) {
        self.bus.publish(GameEvent::PlayerDamaged(applied));
        self.publish_health();
        if self.health.is_dead() {
            self.lose();
        }
    }

    /// The player reached the exit.
    pub fn reach_exit(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.state = GameState::Won;
        self.bus.publish(GameEvent::GameWon);
        self.end(SessionResult::Win);
    }

    fn ensure_playing(&self) -> Result<(), TransitionError> {
        if self.is_playing() {
            Ok(())
        } else {
            Err(TransitionError::SessionNotPlaying)
        }
    }

    fn apply_resolution(&mut self, resolved: Resolved) {
        let mut applied = None;
        if let Some(emission) = resolved.emission {
            applied = match emission.magnitude {
                Magnitude::Heal(amount) => self.apply_heal(amount),
                Magnitude::Damage(amount) => self.apply_damage(amount),
            };
        }
        self.tally.record(resolved.resolution, applied);
        self.bus.publish(GameEvent::TuneResolved(resolved));
        if let Some(change) = self.snake.react(&resolved) {
            self.bus.publish(GameEvent::SnakeChanged(change));
        }
        if let Some(Magnitude::Damage(_)) = applied {
            if self.health.is_dead() {
                self.lose();
            }
        }
    }

    fn apply_heal(&mut self, amount: u32) -> Option<Magnitude> {
        let change = self.health.heal(clamp_i32(amount)).ok()??;
        let healed = change.applied.round() as u32;
        self.bus.publish(GameEvent::PlayerHealed(healed));
        self.publish_health();
        Some(Magnitude::Heal(healed))
    }

    fn apply_damage(&mut self, amount: u32) -> Option<Magnitude> {
        let change = self.health.take_damage(clamp_i32(amount)).ok()??;
        let taken = change.applied.round() as u32;
        self.bus.publish(GameEvent::PlayerDamaged(taken));
        self.publish_health();
        Some(Magnitude::Damage(taken))
    }

    fn after_health_change(&mut self, change: HealthChange) {
        self.publish_health();
        if change.died {
            self.lose();
        }
    }

    fn lose(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.state = GameState::Lost;
        self.bus.publish(GameEvent::GameOver);
        self.end(SessionResult::Lose);
    }

    fn end(&mut self, result: SessionResult) {
        if let Some(resolved) = self.caster.set_input_enabled(false) {
            self.tally.record(resolved.resolution, None);
            self.bus.publish(GameEvent::TuneResolved(resolved));
        }
        let report = SessionReport {
            mode: self.mode,
            result,
            elapsed_secs: self.elapsed,
            tally: self.tally.snapshot(self.health.rounded()),
        };
        self.log_summary(&report);
        self.report = Some(report);
        self.bus.publish(GameEvent::SessionEnded(report));
    }

    fn publish_health(&mut self) {
        self.bus.publish(GameEvent::HealthChanged {
            current: self.health.rounded(),
            max: self.health.max(),
        });
    }

    fn log_summary(&self, report: &SessionReport) {
        let t = &report.tally;
        info!(
            mode = %report.mode,
            result = %report.result,
            elapsed_secs = report.elapsed_secs,
            starting_hp = t.starting_health,
            ending_hp = t.ending_health,
            successes = t.successes,
            failures = t.failures,
            too_early = t.too_early,
            too_late = t.too_late,
            snake_attacks = t.snake_attacks,
            damage_taken = t.damage_taken,
            hp_restored = t.hp_restored,
            "session summary"
        );
    }
}

fn clamp_i32(amount: u32) -> i32 {
    i32::try_from(amount).unwrap_or(i32::MAX)
}
