use serde::{Deserialize, Serialize};

use crate::attempt::{Magnitude, Resolution};
use crate::zone::Outcome;

/// Running counts for one play session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTally {
    successes: u32,
    too_early: u32,
    too_late: u32,
    cancelled: u32,
    snake_bites: u32,
    damage_taken: u64,
    hp_restored: u64,
    starting_health: u32,
}

/// Immutable view of a tally, taken when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub successes: u32,
    pub failures: u32,
    pub too_early: u32,
    pub too_late: u32,
    /// Late releases plus bites from walking into an aggressive snake.
    pub snake_attacks: u32,
    pub cancelled: u32,
    pub damage_taken: u64,
    pub hp_restored: u64,
    pub starting_health: u32,
    pub ending_health: u32,
}

impl TallySnapshot {
    /// Attempts that ended in a real outcome (cancellations excluded).
    pub fn resolved(&self) -> u32 {
        self.successes + self.failures
    }

    pub fn success_rate(&self) -> Option<f64> {
        match self.resolved() {
            0 => None,
            n => Some(self.successes as f64 / n as f64),
        }
    }
}

impl SessionTally {
    pub fn new(starting_health: u32) -> Self {
        Self {
            starting_health,
            ..Self::default()
        }
    }

    /// Counts one resolved attempt and whatever it healed or cost.
    pub fn record(&mut self, resolution: Resolution, magnitude: Option<Magnitude>) {
        match resolution {
            Resolution::Outcome(Outcome::Success) => self.successes += 1,
            Resolution::Outcome(Outcome::TooEarly) => self.too_early += 1,
            Resolution::Outcome(Outcome::TooLate) => self.too_late += 1,
            Resolution::Cancelled => self.cancelled += 1,
        }
        match magnitude {
            Some(Magnitude::Heal(amount)) => self.record_heal(amount),
            Some(Magnitude::Damage(amount)) => self.record_damage(amount),
            None => {}
        }
    }

    /// Damage from outside the tune system, e.g. touching an angry snake.
    pub fn record_damage(&mut self, amount: u32) {
        self.damage_taken += amount as u64;
    }

    pub fn record_snake_bite(&mut self, amount: u32) {
        self.snake_bites += 1;
        self.record_damage(amount);
    }

    pub fn record_heal(&mut self, amount: u32) {
        self.hp_restored += amount as u64;
    }

    pub fn reset(&mut self, starting_health: u32) {
        *self = Self::new(starting_health);
    }

    pub fn resolved(&self) -> u32 {
        self.successes + self.failures()
    }

    pub fn failures(&self) -> u32 {
        self.too_early + self.too_late
    }

    pub fn snapshot(&self, ending_health: u32) -> TallySnapshot {
        TallySnapshot {
            successes: self.successes,
            failures: self.failures(),
            too_early: self.too_early,
            too_late: self.too_late,
            snake_attacks: self.too_late + self.snake_bites,
            cancelled: self.cancelled,
            damage_taken: self.damage_taken,
            hp_restored: self.hp_restored,
            starting_health: self.starting_health,
            ending_health,
        }
    }
}
