use assert_matches::assert_matches;
use tunecast::attempt::{Disposition, Magnitude, Resolution, TuneCaster};
use tunecast::error::{ConfigError, TransitionError};
use tunecast::tally::SessionTally;
use tunecast::tune::{EffectTag, GameMode, TuneBook, TuneKey};
use tunecast::zone::Outcome;

const MOVE_ONLY: &str = r#"[
    {
        "name": "Move",
        "key": 1,
        "duration": 3.0,
        "zone_start": 0.40,
        "zone_end": 0.65,
        "mode_bonus": 0.10,
        "effect": "Move"
    }
]"#;

fn caster() -> TuneCaster {
    let (book, rejected) = TuneBook::from_json(MOVE_ONLY.as_bytes()).unwrap();
    assert!(rejected.is_empty());
    TuneCaster::new(book)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn simple_mode_widens_the_zone() {
    let mut c = caster();
    let zone = c.start(TuneKey(1), GameMode::Simple).unwrap().zone();
    assert!(approx(zone.start(), 0.35));
    assert!(approx(zone.end(), 0.70));

    c.cancel().unwrap();
    let zone = c.start(TuneKey(1), GameMode::Advanced).unwrap().zone();
    assert!(approx(zone.start(), 0.40));
    assert!(approx(zone.end(), 0.65));
}

#[test]
fn release_at_one_point_two_seconds_succeeds_and_heals() {
    let mut c = caster();
    c.start(TuneKey(1), GameMode::Simple).unwrap();
    assert!(c.advance(1.2).is_none());
    let resolved = c.release().unwrap();

    assert_eq!(resolved.resolution, Resolution::Outcome(Outcome::Success));
    assert!(approx(resolved.position, 0.4));
    let emission = resolved.emission.unwrap();
    assert_eq!(emission.effect, EffectTag::Move);
    assert_eq!(emission.disposition, Disposition::Friendly);
    assert_eq!(emission.magnitude, Magnitude::Heal(15));
}

#[test]
fn release_at_point_nine_seconds_is_too_early_without_damage() {
    let mut c = caster();
    c.start(TuneKey(1), GameMode::Simple).unwrap();
    c.advance(0.9);
    let resolved = c.release().unwrap();

    assert_eq!(resolved.resolution, Resolution::Outcome(Outcome::TooEarly));
    assert!(resolved.emission.is_none());
}

#[test]
fn holding_to_the_end_is_too_late_exactly_once() {
    let mut c = caster();
    c.start(TuneKey(1), GameMode::Simple).unwrap();

    let mut resolutions = Vec::new();
    for _ in 0..40 {
        if let Some(r) = c.advance(0.1) {
            resolutions.push(r);
        }
    }

    assert_eq!(resolutions.len(), 1);
    let resolved = resolutions[0];
    assert_eq!(resolved.resolution, Resolution::Outcome(Outcome::TooLate));
    assert_eq!(
        resolved.emission.map(|e| (e.disposition, e.magnitude)),
        Some((Disposition::Hostile, Magnitude::Damage(20)))
    );
    assert_matches!(c.release(), Err(TransitionError::NotHolding));
}

#[test]
fn second_start_while_holding_is_rejected() {
    let mut c = caster();
    c.start(TuneKey(1), GameMode::Simple).unwrap();
    c.advance(0.5);

    assert_matches!(
        c.start(TuneKey(1), GameMode::Simple),
        Err(TransitionError::AlreadyHolding { .. })
    );
    assert!(approx(c.current().unwrap().elapsed(), 0.5));
}

#[test]
fn tally_counts_match_resolved_attempts() {
    let mut c = caster();
    let mut tally = SessionTally::new(30);
    // release times: success, early, cancel, success, timeout
    let plan: [Option<f64>; 5] = [Some(1.5), Some(0.3), None, Some(2.0), Some(10.0)];

    for (i, at) in plan.iter().enumerate() {
        c.start(TuneKey(1), GameMode::Simple).unwrap();
        let resolved = match at {
            Some(t) => match c.advance(*t) {
                Some(timeout) => timeout,
                None => c.release().unwrap(),
            },
            None => c.cancel().unwrap(),
        };
        tally.record(resolved.resolution, resolved.emission.map(|e| e.magnitude));
        assert!(!c.is_holding(), "attempt {i} left the caster holding");
    }

    let snap = tally.snapshot(30);
    assert_eq!(snap.successes, 2);
    assert_eq!(snap.too_early, 1);
    assert_eq!(snap.too_late, 1);
    assert_eq!(snap.cancelled, 1);
    assert_eq!(snap.successes + snap.too_early + snap.too_late, 4);
    assert_eq!(snap.hp_restored, 30);
    assert_eq!(snap.damage_taken, 20);
}

#[test]
fn invalid_definitions_are_rejected_individually() {
    let json = r#"[
        {"name": "Move", "key": 1, "duration": 3.0, "zone_start": 0.4, "zone_end": 0.65, "effect": "Move"},
        {"name": "Broken", "key": 2, "duration": 0.0, "zone_start": 0.4, "zone_end": 0.65, "effect": "Sleep"},
        {"name": "Inverted", "key": 3, "duration": 2.0, "zone_start": 0.7, "zone_end": 0.2, "effect": "Attack"}
    ]"#;
    let (book, rejected) = TuneBook::from_json(json.as_bytes()).unwrap();

    assert_eq!(book.len(), 1);
    assert_eq!(rejected.len(), 2);
    assert_matches!(rejected[0], ConfigError::InvalidDuration { .. });
    assert_matches!(rejected[1], ConfigError::InvalidZone { .. });
}

#[test]
fn book_with_no_valid_tunes_is_an_error() {
    let json = r#"[{"name": "Broken", "key": 1, "duration": -1.0, "zone_start": 0.4, "zone_end": 0.6, "effect": "Move"}]"#;
    assert_matches!(
        TuneBook::from_json(json.as_bytes()),
        Err(ConfigError::EmptyBook)
    );
}
