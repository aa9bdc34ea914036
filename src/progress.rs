/// Positions this close to the end of the slider count as having reached it.
///
/// A run of fixed ticks that adds up to the duration can land a hair short of
/// 1.0 through float accumulation; without this the hold would never time out
/// on the tick it should.
pub const COMPLETION_EPSILON: f64 = 1e-9;

/// Normalized slider position for `elapsed` seconds into a hold of `duration` seconds.
///
/// Always in `[0, 1]`. A non-positive duration is rejected when a tune is
/// defined, so here it is treated as an already finished hold.
pub fn position(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 || duration.is_nan() {
        return 1.0;
    }
    if elapsed.is_nan() {
        return 0.0;
    }
    let p = (elapsed / duration).clamp(0.0, 1.0);
    if p >= 1.0 - COMPLETION_EPSILON {
        1.0
    } else {
        p
    }
}

/// True once the slider has reached the end.
pub fn is_complete(position: f64) -> bool {
    position >= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_position_is_linear_within_duration() {
        for duration in [0.5, 1.0, 3.0, 6.0] {
            for step in 0..=10 {
                let t = duration * step as f64 / 10.0;
                let p = position(t, duration);
                let expected = t / duration;
                if expected < 1.0 - COMPLETION_EPSILON {
                    assert!((p - expected).abs() < TOLERANCE, "t={t} d={duration}");
                } else {
                    assert_eq!(p, 1.0);
                }
            }
        }
    }

    #[test]
    fn test_position_clamps_past_duration() {
        assert_eq!(position(3.5, 3.0), 1.0);
        assert_eq!(position(100.0, 3.0), 1.0);
    }

    #[test]
    fn test_position_clamps_negative_elapsed() {
        assert_eq!(position(-1.0, 3.0), 0.0);
    }

    #[test]
    fn test_position_with_invalid_duration() {
        assert_eq!(position(1.0, 0.0), 1.0);
        assert_eq!(position(1.0, -2.0), 1.0);
    }

    #[test]
    fn test_accumulated_ticks_reach_the_end() {
        let mut elapsed = 0.0;
        for _ in 0..30 {
            elapsed += 0.1;
        }
        assert!(is_complete(position(elapsed, 3.0)));
    }
}
