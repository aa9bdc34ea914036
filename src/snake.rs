use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attempt::{Resolution, Resolved};
use crate::error::ConfigError;
use crate::progress::COMPLETION_EPSILON;
use crate::tune::EffectTag;
use crate::zone::Outcome;

/// What the snake in the player's way is doing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum SnakeState {
    /// Blocking the path, not hostile.
    #[default]
    Idle,
    /// Bites on contact until the timer runs out.
    Aggressive,
    MovedAway,
    Sleeping,
    AttackingEnemy,
    /// Still blocks the path, but harmless until the timer runs out.
    Frozen,
}

impl SnakeState {
    /// Move, Sleep and Attack only land on a snake in one of these states.
    pub fn is_targetable(self) -> bool {
        matches!(self, SnakeState::Idle | SnakeState::Aggressive)
    }

    pub fn blocks_path(self) -> bool {
        matches!(
            self,
            SnakeState::Idle | SnakeState::Aggressive | SnakeState::Frozen
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnakeConfig {
    /// HP an aggressive snake takes when the player walks into it.
    pub contact_damage: u32,
    pub aggressive_secs: f64,
    pub freeze_secs: f64,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            contact_damage: 10,
            aggressive_secs: 5.0,
            freeze_secs: 4.0,
        }
    }
}

impl SnakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("aggressive_secs", self.aggressive_secs),
            ("freeze_secs", self.freeze_secs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidSnake { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnakeTransition {
    pub from: SnakeState,
    pub to: SnakeState,
}

/// The snake between the player and the exit. It reacts to resolved tunes
/// and times out of its temporary states.
#[derive(Debug, Clone)]
pub struct Snake {
    config: SnakeConfig,
    state: SnakeState,
    timer: f64,
}

impl Snake {
    pub fn new(config: SnakeConfig) -> Self {
        Self {
            config,
            state: SnakeState::Idle,
            timer: 0.0,
        }
    }

    pub fn state(&self) -> SnakeState {
        self.state
    }

    /// Seconds left in `Aggressive` or `Frozen`.
    pub fn remaining(&self) -> Option<f64> {
        match self.state {
            SnakeState::Aggressive | SnakeState::Frozen => Some(self.timer.max(0.0)),
            _ => None,
        }
    }

    /// Damage the snake deals on contact right now.
    pub fn contact_damage(&self) -> Option<u32> {
        (self.state == SnakeState::Aggressive).then_some(self.config.contact_damage)
    }

    /// Applies a resolved tune. A success charms the snake with the tune's
    /// effect, a late release makes it aggressive, anything else is ignored.
    pub fn react(&mut self, resolved: &Resolved) -> Option<SnakeTransition> {
        match resolved.resolution {
            Resolution::Outcome(Outcome::Success) => {
                let effect = resolved.emission?.effect;
                self.charm(effect)
            }
            Resolution::Outcome(Outcome::TooLate) if self.state.is_targetable() => {
                self.set_state(SnakeState::Aggressive)
            }
            _ => None,
        }
    }

    fn charm(&mut self, effect: EffectTag) -> Option<SnakeTransition> {
        let to = match effect {
            EffectTag::Freeze if self.state == SnakeState::Sleeping => {
                debug!("sleeping snake ignores freeze");
                return None;
            }
            EffectTag::Freeze => SnakeState::Frozen,
            _ if !self.state.is_targetable() => {
                debug!(state = %self.state, %effect, "snake is not targetable");
                return None;
            }
            EffectTag::Move => SnakeState::MovedAway,
            EffectTag::Sleep => SnakeState::Sleeping,
            EffectTag::Attack => SnakeState::AttackingEnemy,
        };
        self.set_state(to)
    }

    /// Runs the aggression and freeze timers down by `delta` seconds.
    pub fn tick(&mut self, delta: f64) -> Option<SnakeTransition> {
        if self.remaining().is_none() || !(delta.is_finite() && delta > 0.0) {
            return None;
        }
        self.timer -= delta;
        if self.timer <= COMPLETION_EPSILON {
            return self.set_state(SnakeState::Idle);
        }
        None
    }

    pub fn reset(&mut self) -> Option<SnakeTransition> {
        self.set_state(SnakeState::Idle)
    }

    /// Entering a timed state restarts its timer, even if already in it.
    fn set_state(&mut self, to: SnakeState) -> Option<SnakeTransition> {
        self.timer = match to {
            SnakeState::Aggressive => self.config.aggressive_secs,
            SnakeState::Frozen => self.config.freeze_secs,
            _ => 0.0,
        };
        let from = std::mem::replace(&mut self.state, to);
        if from == to {
            return None;
        }
        info!(%from, %to, "snake changed");
        Some(SnakeTransition { from, to })
    }
}
