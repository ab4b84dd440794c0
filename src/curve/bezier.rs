//! Quadratic Bezier velocity curve
//!
//! The curve runs from (0, 0) to (127, 127) with its control point moved
//! along the diagonal by `deviation` percent of the midpoint. The output is
//! the velocity mirrored around that curve:
//!
//!   control_x = 63.5 + (deviation / 100) * 63.5
//!   delta     = round(2 * (1 - t) * t * control_x + t^2 * 127),  t = v / 127
//!   output    = 2 * v - delta
//!
//! A deviation of 0 is the identity. Negative deviations make soft playing
//! louder, positive ones make it softer. Both ends stay fixed.

use super::{to_velocity, MAX_VELOCITY};
use crate::error::{Error, Result};

const MID_VELOCITY: f64 = 63.5;

/// Accepted deviation range.
pub const DEVIATION_RANGE: std::ops::RangeInclusive<f64> = -100.0..=100.0;

pub(super) fn check_deviation(deviation: f64) -> Result<()> {
    if !DEVIATION_RANGE.contains(&deviation) {
        return Err(Error::invalid(format!(
            "bezier exponent must be between -100 and 100, got {}",
            deviation
        )));
    }
    Ok(())
}

/// Apply the Bezier curve to a single velocity.
pub fn bezier(velocity: u8, deviation: f64) -> Result<u8> {
    check_deviation(deviation)?;

    let max = MAX_VELOCITY as f64;
    let v = velocity as f64;
    let control_x = MID_VELOCITY + (deviation / 100.0) * MID_VELOCITY;
    let t = v / max;

    let delta = (2.0 * (1.0 - t) * t * control_x + t * t * max).round();
    Ok(to_velocity(2.0 * v - delta))
}
