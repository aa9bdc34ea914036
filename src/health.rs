use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, MagnitudeError};
use crate::tune::GameMode;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: u32,
    pub starting_health: u32,
    /// HP lost per second in Simple mode.
    pub simple_drain_rate: f64,
    /// HP lost per second in Advanced mode, 15% faster than Simple.
    pub advanced_drain_rate: f64,
    pub drain_enabled: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            starting_health: 30,
            simple_drain_rate: 2.5,
            advanced_drain_rate: 2.875,
            drain_enabled: true,
        }
    }
}

impl HealthConfig {
    /// Rejects settings that would let health leave `[0, max]` or start a
    /// session already dead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_health == 0 {
            return Err(ConfigError::InvalidHealth {
                field: "max_health",
                value: 0.0,
            });
        }
        if self.starting_health == 0 {
            return Err(ConfigError::InvalidHealth {
                field: "starting_health",
                value: 0.0,
            });
        }
        for (field, value) in [
            ("simple_drain_rate", self.simple_drain_rate),
            ("advanced_drain_rate", self.advanced_drain_rate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidHealth { field, value });
            }
        }
        Ok(())
    }

    pub fn drain_rate(&self, mode: GameMode) -> f64 {
        match mode {
            GameMode::Simple => self.simple_drain_rate,
            GameMode::Advanced => self.advanced_drain_rate,
        }
    }
}

/// Result of a health-changing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChange {
    /// Amount actually applied after clamping.
    pub applied: f64,
    pub current: f64,
    /// True only on the call that took health to zero.
    pub died: bool,
}

/// The player's health: a passive drain, heals and hits, and a one-shot death.
#[derive(Debug, Clone)]
pub struct HealthPool {
    config: HealthConfig,
    current: f64,
    drain_rate: f64,
    dead: bool,
}

impl HealthPool {
    pub fn new(config: HealthConfig) -> Self {
        let current = config.starting_health.min(config.max_health) as f64;
        let drain_rate = config.simple_drain_rate;
        Self {
            config,
            current,
            drain_rate,
            dead: current <= 0.0,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Current health rounded for display and reporting.
    pub fn rounded(&self) -> u32 {
        self.current.round().max(0.0) as u32
    }

    pub fn max(&self) -> u32 {
        self.config.max_health
    }

    pub fn percentage(&self) -> f64 {
        if self.config.max_health == 0 {
            return 0.0;
        }
        self.current / self.config.max_health as f64
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// HP lost per second right now; zero while drain is off.
    pub fn drain_rate(&self) -> f64 {
        if self.config.drain_enabled {
            self.drain_rate
        } else {
            0.0
        }
    }

    pub fn apply_mode(&mut self, mode: GameMode) {
        self.drain_rate = self.config.drain_rate(mode);
        info!(%mode, rate = self.drain_rate, "health drain rate set");
    }

    pub fn set_drain_enabled(&mut self, enabled: bool) {
        self.config.drain_enabled = enabled;
    }

    /// Drains `rate * delta` HP. Does nothing once dead or when drain is off.
    pub fn apply_drain(&mut self, delta: f64) -> Option<HealthChange> {
        if self.dead || !self.config.drain_enabled || !(delta.is_finite() && delta > 0.0) {
            return None;
        }
        if !(self.drain_rate.is_finite() && self.drain_rate > 0.0) {
            return None;
        }
        Some(self.lower(self.drain_rate * delta))
    }

    pub fn take_damage(&mut self, amount: i32) -> Result<Option<HealthChange>, MagnitudeError> {
        let amount = checked("damage", amount)?;
        if self.dead {
            return Ok(None);
        }
        Ok(Some(self.lower(amount as f64)))
    }

    pub fn heal(&mut self, amount: i32) -> Result<Option<HealthChange>, MagnitudeError> {
        let amount = checked("heal", amount)?;
        if self.dead {
            return Ok(None);
        }
        let before = self.current;
        self.current = (self.current + amount as f64).min(self.config.max_health as f64);
        Ok(Some(HealthChange {
            applied: self.current - before,
            current: self.current,
            died: false,
        }))
    }

    pub fn reset(&mut self) {
        self.current = self
            .config
            .starting_health
            .min(self.config.max_health) as f64;
        self.dead = self.current <= 0.0;
    }

    fn lower(&mut self, amount: f64) -> HealthChange {
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        let died = self.current <= 0.0 && !self.dead;
        if died {
            self.dead = true;
            info!("player died");
        }
        HealthChange {
            applied: before - self.current,
            current: self.current,
            died,
        }
    }
}

fn checked(kind: &'static str, value: i32) -> Result<u32, MagnitudeError> {
    u32::try_from(value).map_err(|_| {
        warn!(kind, value, "ignoring negative health change");
        MagnitudeError::Negative { kind, value }
    })
}
