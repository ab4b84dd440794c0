//! Linear and exponential curves
//!
//! Both normalize the velocity against a reference `max_value`. The
//! reference is normally 127; older single-stream setups used a lower one
//! (70 or 80) so that moderate playing already reaches full velocity.

use super::{check_max_value, to_velocity, MAX_VELOCITY};
use crate::error::Result;

/// `127 * (velocity / max_value) * sensitivity`
pub fn linear(velocity: u8, sensitivity: f64, max_value: f64) -> Result<u8> {
    check_max_value(max_value)?;
    let normalized = velocity as f64 / max_value;
    Ok(to_velocity(MAX_VELOCITY as f64 * normalized * sensitivity))
}

/// `127 * (velocity / max_value) ^ exponent`
///
/// Zero always maps to zero, whatever the exponent.
pub fn exponential(velocity: u8, exponent: f64, max_value: f64) -> Result<u8> {
    check_max_value(max_value)?;
    if velocity == 0 {
        return Ok(0);
    }
    let normalized = velocity as f64 / max_value;
    Ok(to_velocity(MAX_VELOCITY as f64 * normalized.powf(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_linear_identity() {
        for v in 0..=127u8 {
            assert_eq!(linear(v, 1.0, 127.0).unwrap(), v);
        }
    }

    #[test]
    fn test_linear_sensitivity_scales_and_clamps() {
        assert_eq!(linear(64, 0.5, 127.0).unwrap(), 32);
        assert_eq!(linear(100, 2.0, 127.0).unwrap(), 127);
    }

    #[test]
    fn test_linear_monotonic() {
        let mut prev = 0;
        for v in 0..=127u8 {
            let out = linear(v, 1.3, 127.0).unwrap();
            assert!(out >= prev, "Not monotonic at {}: {} < {}", v, out, prev);
            prev = out;
        }
    }

    #[test]
    fn test_exponential_monotonic() {
        for exponent in [0.3, 0.6, 1.0, 2.5] {
            let mut prev = 0;
            for v in 0..=127u8 {
                let out = exponential(v, exponent, 127.0).unwrap();
                assert!(out >= prev, "exponent {} not monotonic at {}", exponent, v);
                prev = out;
            }
        }
    }

    #[test]
    fn test_exponential_shape() {
        // Exponent below 1 lifts soft playing
        assert!(exponential(32, 0.6, 127.0).unwrap() > 32);
        // Exponent above 1 pushes it down
        assert!(exponential(32, 2.0, 127.0).unwrap() < 32);
        assert_eq!(exponential(127, 0.6, 127.0).unwrap(), 127);
    }

    #[test]
    fn test_exponential_zero_with_negative_exponent() {
        assert_eq!(exponential(0, -1.0, 127.0).unwrap(), 0);
        assert_eq!(exponential(1, -1.0, 127.0).unwrap(), 127);
    }

    #[test]
    fn test_legacy_reference_velocity() {
        // With a reference of 80, anything at or above 80 is full velocity
        assert_eq!(exponential(80, 0.6, 80.0).unwrap(), 127);
        assert_eq!(exponential(110, 0.6, 80.0).unwrap(), 127);
        assert!(exponential(40, 0.6, 80.0).unwrap() < 127);
    }

    #[test]
    fn test_non_positive_max_value_rejected() {
        assert!(matches!(linear(64, 1.0, 0.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(
            exponential(64, 0.6, -1.0),
            Err(Error::InvalidParameter(_))
        ));
    }
}
