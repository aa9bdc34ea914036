use std::fmt;

use tracing::{debug, info, warn};

use crate::error::TransitionError;
use crate::progress;
use crate::tune::{EffectTag, GameMode, TuneBook, TuneDefinition, TuneKey};
use crate::zone::{Outcome, TimingState, Zone};

/// How an attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Outcome(Outcome),
    /// Input was taken away mid-hold. Counts as neither success nor failure.
    Cancelled,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Outcome(o) => write!(f, "{o}"),
            Resolution::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl Resolution {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Resolution::Outcome(o) => Some(*o),
            Resolution::Cancelled => None,
        }
    }
}

/// Whether the effect is applied for or against the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Disposition {
    Friendly,
    Hostile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Magnitude {
    Heal(u32),
    Damage(u32),
}

/// What the rest of the game should do about a resolved attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectEmission {
    pub effect: EffectTag,
    pub disposition: Disposition,
    pub magnitude: Magnitude,
}

/// The single, terminal result of one attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved {
    pub tune: TuneKey,
    pub resolution: Resolution,
    pub position: f64,
    pub zone: Zone,
    pub emission: Option<EffectEmission>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AttemptState {
    Holding,
    Resolved(Resolution),
}

/// One hold of one tune.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    tune: TuneKey,
    effect: EffectTag,
    heal: u32,
    damage: u32,
    duration: f64,
    zone: Zone,
    elapsed: f64,
    position: f64,
    state: AttemptState,
}

impl Attempt {
    pub fn new(def: &TuneDefinition, mode: GameMode) -> Self {
        Self {
            tune: def.key(),
            effect: def.effect(),
            heal: def.heal(),
            damage: def.damage(),
            duration: def.duration(),
            zone: def.effective_zone(mode),
            elapsed: 0.0,
            position: 0.0,
            state: AttemptState::Holding,
        }
    }

    pub fn tune(&self) -> TuneKey {
        self.tune
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_holding(&self) -> bool {
        self.state == AttemptState::Holding
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self.state {
            AttemptState::Holding => None,
            AttemptState::Resolved(r) => Some(r),
        }
    }

    pub fn timing_state(&self) -> TimingState {
        if self.is_holding() {
            TimingState::at(&self.zone, Some(self.position))
        } else {
            TimingState::None
        }
    }

    /// Moves the slider on by `delta` seconds.
    ///
    /// Returns the resolution when this advance runs the slider to the end.
    /// Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, delta: f64) -> Option<Resolved> {
        if !self.is_holding() {
            return None;
        }
        if !(delta.is_finite() && delta >= 0.0) {
            warn!(tune = %self.tune, delta, "ignoring invalid tick delta");
            return None;
        }
        self.elapsed += delta;
        self.position = progress::position(self.elapsed, self.duration);
        if progress::is_complete(self.position) {
            debug!(tune = %self.tune, "slider reached the end");
            return self.resolve(Resolution::Outcome(Outcome::TooLate)).ok();
        }
        None
    }

    /// Releases at the current position.
    pub fn release(&mut self) -> Result<Resolved, TransitionError> {
        let outcome = self.zone.evaluate(self.position);
        self.resolve(Resolution::Outcome(outcome))
    }

    pub fn cancel(&mut self) -> Result<Resolved, TransitionError> {
        self.resolve(Resolution::Cancelled)
    }

    fn resolve(&mut self, resolution: Resolution) -> Result<Resolved, TransitionError> {
        if !self.is_holding() {
            return Err(TransitionError::AlreadyResolved);
        }
        self.state = AttemptState::Resolved(resolution);
        Ok(Resolved {
            tune: self.tune,
            resolution,
            position: self.position,
            zone: self.zone,
            emission: self.emission_for(resolution),
        })
    }

    fn emission_for(&self, resolution: Resolution) -> Option<EffectEmission> {
        match resolution {
            Resolution::Outcome(Outcome::Success) => Some(EffectEmission {
                effect: self.effect,
                disposition: Disposition::Friendly,
                magnitude: Magnitude::Heal(self.heal),
            }),
            Resolution::Outcome(Outcome::TooLate) => Some(EffectEmission {
                effect: self.effect,
                disposition: Disposition::Hostile,
                magnitude: Magnitude::Damage(self.damage),
            }),
            Resolution::Outcome(Outcome::TooEarly) | Resolution::Cancelled => None,
        }
    }
}

/// Per-actor tune state machine: at most one attempt is held at a time.
#[derive(Debug, Clone)]
pub struct TuneCaster {
    book: TuneBook,
    advanced_unlocked: bool,
    input_enabled: bool,
    current: Option<Attempt>,
    last: Option<Resolved>,
}

impl TuneCaster {
    pub fn new(book: TuneBook) -> Self {
        Self {
            book,
            advanced_unlocked: false,
            input_enabled: true,
            current: None,
            last: None,
        }
    }

    pub fn book(&self) -> &TuneBook {
        &self.book
    }

    pub fn current(&self) -> Option<&Attempt> {
        self.current.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.current.is_some()
    }

    /// The most recent resolution, kept for display until the next one.
    pub fn last(&self) -> Option<&Resolved> {
        self.last.as_ref()
    }

    pub fn advanced_unlocked(&self) -> bool {
        self.advanced_unlocked
    }

    pub fn unlock_advanced(&mut self) {
        if !self.advanced_unlocked {
            self.advanced_unlocked = true;
            info!("advanced tunes unlocked");
        }
    }

    pub fn lock_advanced(&mut self) {
        self.advanced_unlocked = false;
    }

    /// Begins holding `key`. The mode decides whether the zone is widened.
    pub fn start(&mut self, key: TuneKey, mode: GameMode) -> Result<&Attempt, TransitionError> {
        if !self.input_enabled {
            return Err(TransitionError::InputDisabled);
        }
        if let Some(active) = &self.current {
            return Err(TransitionError::AlreadyHolding {
                active: active.tune(),
                requested: key,
            });
        }
        let def = self
            .book
            .get(key)
            .ok_or(TransitionError::UnknownTune(key))?;
        if def.advanced_only() && !self.advanced_unlocked {
            return Err(TransitionError::TuneLocked(key));
        }

        let attempt = Attempt::new(def, mode);
        info!(
            tune = %key,
            name = def.name(),
            duration = attempt.duration(),
            zone_start = attempt.zone().start(),
            zone_end = attempt.zone().end(),
            "tune started"
        );
        let attempt: &Attempt = self.current.insert(attempt);
        Ok(attempt)
    }

    pub fn release(&mut self) -> Result<Resolved, TransitionError> {
        let attempt = self.current.as_mut().ok_or(TransitionError::NotHolding)?;
        let resolved = attempt.release()?;
        Ok(self.finish(resolved))
    }

    pub fn cancel(&mut self) -> Result<Resolved, TransitionError> {
        let attempt = self.current.as_mut().ok_or(TransitionError::NotHolding)?;
        let resolved = attempt.cancel()?;
        Ok(self.finish(resolved))
    }

    /// Advances the held attempt, if any. Returns the timeout resolution when
    /// the slider runs out.
    pub fn advance(&mut self, delta: f64) -> Option<Resolved> {
        let resolved = self.current.as_mut()?.advance(delta)?;
        Some(self.finish(resolved))
    }

    /// Turns tune input on or off. Disabling mid-hold cancels the attempt.
    pub fn set_input_enabled(&mut self, enabled: bool) -> Option<Resolved> {
        self.input_enabled = enabled;
        if enabled {
            return None;
        }
        self.cancel().ok()
    }

    fn finish(&mut self, resolved: Resolved) -> Resolved {
        self.current = None;
        match resolved.resolution {
            Resolution::Outcome(Outcome::Success) => info!(
                tune = %resolved.tune,
                position = resolved.position,
                "tune success"
            ),
            Resolution::Outcome(outcome) => info!(
                tune = %resolved.tune,
                %outcome,
                position = resolved.position,
                zone_start = resolved.zone.start(),
                zone_end = resolved.zone.end(),
                "tune failed"
            ),
            Resolution::Cancelled => debug!(tune = %resolved.tune, "tune cancelled"),
        }
        self.last = Some(resolved);
        resolved
    }
}
