use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::zone::Zone;

pub const DEFAULT_HEAL: u32 = 15;
pub const DEFAULT_DAMAGE: u32 = 20;
pub const MAX_TUNE_KEY: u8 = 4;

/// The key a tune is bound to (1-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TuneKey(pub u8);

impl fmt::Display for TuneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a charmed snake does.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum EffectTag {
    Move,
    Sleep,
    Attack,
    Freeze,
}

/// Simple mode widens every zone by the tune's bonus; Advanced unlocks
/// advanced-only tunes and drains health faster.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Simple,
    Advanced,
}

impl GameMode {
    pub fn toggled(self) -> Self {
        match self {
            GameMode::Simple => GameMode::Advanced,
            GameMode::Advanced => GameMode::Simple,
        }
    }
}

/// One tune as it appears in a preset or config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TuneRecord {
    pub name: String,
    pub key: u8,
    #[serde(default)]
    pub description: String,
    pub duration: f64,
    pub zone_start: f64,
    pub zone_end: f64,
    #[serde(default)]
    pub mode_bonus: f64,
    pub effect: EffectTag,
    #[serde(default = "default_heal")]
    pub heal: i32,
    #[serde(default = "default_damage")]
    pub damage: i32,
    #[serde(default)]
    pub advanced_only: bool,
}

fn default_heal() -> i32 {
    DEFAULT_HEAL as i32
}

fn default_damage() -> i32 {
    DEFAULT_DAMAGE as i32
}

/// A validated, immutable tune.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneDefinition {
    key: TuneKey,
    name: String,
    description: String,
    duration: f64,
    zone: Zone,
    mode_bonus: f64,
    effect: EffectTag,
    heal: u32,
    damage: u32,
    advanced_only: bool,
}

impl TryFrom<TuneRecord> for TuneDefinition {
    type Error = ConfigError;

    fn try_from(record: TuneRecord) -> Result<Self, Self::Error> {
        let TuneRecord {
            name,
            key,
            description,
            duration,
            zone_start,
            zone_end,
            mode_bonus,
            effect,
            heal,
            damage,
            advanced_only,
        } = record;

        if !(1..=MAX_TUNE_KEY).contains(&key) {
            return Err(ConfigError::InvalidKey { name, key });
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ConfigError::InvalidDuration { name, duration });
        }
        if !(mode_bonus.is_finite() && mode_bonus >= 0.0) {
            return Err(ConfigError::InvalidBonus {
                name,
                bonus: mode_bonus,
            });
        }
        let heal = non_negative(&name, "heal", heal)?;
        let damage = non_negative(&name, "damage", damage)?;
        let zone = match Zone::new(zone_start, zone_end) {
            Ok(zone) => zone,
            Err(e) => {
                return Err(ConfigError::InvalidZone {
                    name,
                    source: Box::new(e),
                })
            }
        };

        Ok(Self {
            key: TuneKey(key),
            name,
            description,
            duration,
            zone,
            mode_bonus,
            effect,
            heal,
            damage,
            advanced_only,
        })
    }
}

fn non_negative(name: &str, field: &'static str, value: i32) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::NegativeAmount {
        name: name.to_string(),
        field,
        value,
    })
}

impl TuneDefinition {
    pub fn key(&self) -> TuneKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Zone as configured, before any mode bonus.
    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn mode_bonus(&self) -> f64 {
        self.mode_bonus
    }

    pub fn effect(&self) -> EffectTag {
        self.effect
    }

    pub fn heal(&self) -> u32 {
        self.heal
    }

    pub fn damage(&self) -> u32 {
        self.damage
    }

    pub fn advanced_only(&self) -> bool {
        self.advanced_only
    }

    /// Zone the player actually aims for in `mode`.
    pub fn effective_zone(&self, mode: GameMode) -> Zone {
        match mode {
            GameMode::Simple => self.zone.widen(self.mode_bonus),
            GameMode::Advanced => self.zone,
        }
    }
}

/// The set of tunes available in a session, keyed by their key number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuneBook {
    tunes: BTreeMap<TuneKey, TuneDefinition>,
}

impl TuneBook {
    /// Builds a book from raw records, keeping every valid definition.
    ///
    /// Rejected records are logged and returned so callers can surface them;
    /// one bad tune never takes the others down with it.
    pub fn from_records(records: Vec<TuneRecord>) -> (Self, Vec<ConfigError>) {
        let mut book = TuneBook::default();
        let mut rejected = Vec::new();

        for record in records {
            let name = record.name.clone();
            match TuneDefinition::try_from(record) {
                Ok(def) => {
                    if let Err(e) = book.insert(def) {
                        warn!(tune = %name, error = %e, "rejected tune definition");
                        rejected.push(e);
                    }
                }
                Err(e) => {
                    warn!(tune = %name, error = %e, "rejected tune definition");
                    rejected.push(e);
                }
            }
        }

        (book, rejected)
    }

    /// Parses a JSON array of tune records.
    pub fn from_json(bytes: &[u8]) -> Result<(Self, Vec<ConfigError>), ConfigError> {
        let records: Vec<TuneRecord> = serde_json::from_slice(bytes)?;
        let (book, rejected) = Self::from_records(records);
        if book.is_empty() {
            return Err(ConfigError::EmptyBook);
        }
        Ok((book, rejected))
    }

    pub fn insert(&mut self, def: TuneDefinition) -> Result<(), ConfigError> {
        if self.tunes.contains_key(&def.key) {
            return Err(ConfigError::DuplicateKey(def.key));
        }
        self.tunes.insert(def.key, def);
        Ok(())
    }

    pub fn get(&self, key: TuneKey) -> Option<&TuneDefinition> {
        self.tunes.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TuneDefinition> {
        self.tunes.values()
    }

    pub fn len(&self) -> usize {
        self.tunes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(key: u8, start: f64, end: f64) -> TuneRecord {
        TuneRecord {
            name: format!("Tune {key}"),
            key,
            description: String::new(),
            duration: 3.0,
            zone_start: start,
            zone_end: end,
            mode_bonus: 0.1,
            effect: EffectTag::Move,
            heal: DEFAULT_HEAL as i32,
            damage: DEFAULT_DAMAGE as i32,
            advanced_only: false,
        }
    }

    #[test]
    fn test_valid_record_becomes_definition() {
        let def = TuneDefinition::try_from(record(1, 0.4, 0.65)).unwrap();
        assert_eq!(def.key(), TuneKey(1));
        assert_eq!(def.duration(), 3.0);
        assert_eq!(def.zone().start(), 0.4);
        assert_eq!(def.heal(), 15);
        assert_eq!(def.damage(), 20);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let mut r = record(1, 0.4, 0.65);
        r.duration = 0.0;
        assert_matches!(
            TuneDefinition::try_from(r.clone()),
            Err(ConfigError::InvalidDuration { .. })
        );
        r.duration = -1.0;
        assert_matches!(
            TuneDefinition::try_from(r),
            Err(ConfigError::InvalidDuration { .. })
        );
    }

    #[test]
    fn test_rejects_inverted_zone() {
        assert_matches!(
            TuneDefinition::try_from(record(1, 0.65, 0.4)),
            Err(ConfigError::InvalidZone { .. })
        );
    }

    #[test]
    fn test_rejects_negative_bonus_and_amounts() {
        let mut r = record(1, 0.4, 0.65);
        r.mode_bonus = -0.1;
        assert_matches!(
            TuneDefinition::try_from(r),
            Err(ConfigError::InvalidBonus { .. })
        );

        let mut r = record(1, 0.4, 0.65);
        r.damage = -5;
        assert_matches!(
            TuneDefinition::try_from(r),
            Err(ConfigError::NegativeAmount { field: "damage", .. })
        );
    }

    #[test]
    fn test_rejects_bad_key() {
        assert_matches!(
            TuneDefinition::try_from(record(0, 0.4, 0.65)),
            Err(ConfigError::InvalidKey { .. })
        );
        assert_matches!(
            TuneDefinition::try_from(record(5, 0.4, 0.65)),
            Err(ConfigError::InvalidKey { key: 5, .. })
        );
        assert!(TuneDefinition::try_from(record(MAX_TUNE_KEY, 0.4, 0.65)).is_ok());
    }

    #[test]
    fn test_effective_zone_depends_on_mode() {
        let def = TuneDefinition::try_from(record(1, 0.4, 0.65)).unwrap();
        let simple = def.effective_zone(GameMode::Simple);
        assert!((simple.start() - 0.35).abs() < 1e-9);
        assert!((simple.end() - 0.70).abs() < 1e-9);
        assert_eq!(def.effective_zone(GameMode::Advanced), def.zone());
    }

    #[test]
    fn test_book_keeps_valid_records() {
        let (book, rejected) = TuneBook::from_records(vec![
            record(1, 0.4, 0.65),
            record(2, 0.7, 0.3),
            record(3, 0.3, 0.55),
            record(1, 0.1, 0.2),
        ]);
        assert_eq!(book.len(), 2);
        assert!(book.get(TuneKey(1)).is_some());
        assert!(book.get(TuneKey(2)).is_none());
        assert_eq!(rejected.len(), 2);
        assert_matches!(rejected[1], ConfigError::DuplicateKey(TuneKey(1)));
    }

    #[test]
    fn test_book_from_json_applies_defaults() {
        let json = br#"[
            {"name": "Move", "key": 1, "duration": 3.0, "zone_start": 0.4,
             "zone_end": 0.65, "effect": "Move"}
        ]"#;
        let (book, rejected) = TuneBook::from_json(json).unwrap();
        assert!(rejected.is_empty());
        let def = book.get(TuneKey(1)).unwrap();
        assert_eq!(def.mode_bonus(), 0.0);
        assert_eq!(def.heal(), DEFAULT_HEAL);
        assert!(!def.advanced_only());
    }

    #[test]
    fn test_book_from_json_with_no_valid_tunes() {
        let json = br#"[
            {"name": "Broken", "key": 1, "duration": 0.0, "zone_start": 0.4,
             "zone_end": 0.65, "effect": "Move"}
        ]"#;
        assert_matches!(TuneBook::from_json(json), Err(ConfigError::EmptyBook));
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(GameMode::Simple.toggled(), GameMode::Advanced);
        assert_eq!(GameMode::Advanced.toggled(), GameMode::Simple);
    }
}
