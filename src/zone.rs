use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result of releasing a tune at some slider position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Outcome {
    /// Released before the zone. Safe miss.
    TooEarly,
    /// Released inside the zone.
    Success,
    /// Released after the zone, or held to the end.
    TooLate,
}

/// The part of the slider, in normalized units, where a release succeeds.
///
/// Both ends are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zone {
    start: f64,
    end: f64,
}

impl Zone {
    pub fn new(start: f64, end: f64) -> Result<Self, ConfigError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(start) || !in_range(end) {
            return Err(ConfigError::ZoneOutOfRange { start, end });
        }
        if end <= start {
            return Err(ConfigError::EmptyZone { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn evaluate(&self, position: f64) -> Outcome {
        if position < self.start {
            Outcome::TooEarly
        } else if position <= self.end {
            Outcome::Success
        } else {
            Outcome::TooLate
        }
    }

    /// Grow the zone by `bonus`, half on each side, clamped to the slider.
    ///
    /// A non-positive or non-finite bonus leaves the zone unchanged.
    pub fn widen(&self, bonus: f64) -> Zone {
        if !(bonus.is_finite() && bonus > 0.0) {
            return *self;
        }
        let half = bonus / 2.0;
        let start = (self.start - half).max(0.0);
        let end = (self.end + half).min(1.0).max(start);
        Zone { start, end }
    }

    /// Live classification of `position`; `None` when nothing is held.
    pub fn timing_state(&self, position: Option<f64>) -> TimingState {
        TimingState::at(self, position)
    }
}

/// What the player would get if they released right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingState {
    None,
    TooEarly,
    InZone,
    TooLate,
}

impl TimingState {
    pub fn at(zone: &Zone, position: Option<f64>) -> Self {
        match position.map(|p| zone.evaluate(p)) {
            None => TimingState::None,
            Some(Outcome::TooEarly) => TimingState::TooEarly,
            Some(Outcome::Success) => TimingState::InZone,
            Some(Outcome::TooLate) => TimingState::TooLate,
        }
    }
}
