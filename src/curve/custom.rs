//! Custom piecewise-linear velocity tables

use serde::{Deserialize, Serialize};

use super::{to_velocity, MAX_VELOCITY};
use crate::error::{Error, Result};

/// One (input, output) breakpoint of a custom curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub input: u8,
    pub output: u8,
}

impl CurvePoint {
    pub fn new(input: u8, output: u8) -> Self {
        Self { input, output }
    }
}

/// A usable table starts at input 0, ends at input 127, and never goes back.
pub fn validate_points(points: &[CurvePoint]) -> Result<()> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => (first, last),
        _ => {
            return Err(Error::invalid(
                "custom curve needs at least two points",
            ))
        }
    };

    if first.input != 0 || last.input != MAX_VELOCITY {
        return Err(Error::invalid(format!(
            "custom curve must span inputs 0..=127, got {}..={}",
            first.input, last.input
        )));
    }
    if let Some(p) = points.iter().find(|p| p.output > MAX_VELOCITY) {
        return Err(Error::invalid(format!(
            "custom curve output out of range: {}",
            p.output
        )));
    }
    if points.windows(2).any(|w| w[1].input < w[0].input) {
        return Err(Error::invalid(
            "custom curve inputs must be in ascending order",
        ));
    }
    Ok(())
}

/// Interpolate `velocity` on the table.
///
/// Returns `None` when no segment brackets the velocity, which only happens
/// for tables that fail [`validate_points`].
pub fn interpolate(points: &[CurvePoint], velocity: u8) -> Option<u8> {
    points.windows(2).find_map(|w| {
        let (a, b) = (w[0], w[1]);
        if b.input <= a.input || velocity < a.input || velocity > b.input {
            return None;
        }
        let (x1, y1) = (a.input as f64, a.output as f64);
        let (x2, y2) = (b.input as f64, b.output as f64);
        let ratio = (velocity as f64 - x1) / (x2 - x1);
        Some(to_velocity(y1 + ratio * (y2 - y1)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<CurvePoint> {
        vec![
            CurvePoint::new(0, 0),
            CurvePoint::new(64, 100),
            CurvePoint::new(127, 127),
        ]
    }

    #[test]
    fn test_interpolate_on_breakpoints() {
        let points = table();
        assert_eq!(interpolate(&points, 0), Some(0));
        assert_eq!(interpolate(&points, 64), Some(100));
        assert_eq!(interpolate(&points, 127), Some(127));
    }

    #[test]
    fn test_interpolate_between_breakpoints() {
        let points = table();
        // 32 is halfway to (64, 100)
        assert_eq!(interpolate(&points, 32), Some(50));
        // 95.5 would be halfway on the upper segment; 96 is just past it
        assert_eq!(interpolate(&points, 96), Some(114));
    }

    #[test]
    fn test_interpolate_skips_zero_width_segments() {
        let points = vec![
            CurvePoint::new(0, 0),
            CurvePoint::new(64, 40),
            CurvePoint::new(64, 90),
            CurvePoint::new(127, 127),
        ];
        assert!(validate_points(&points).is_ok());
        assert_eq!(interpolate(&points, 64), Some(40));
        assert_eq!(interpolate(&points, 65), Some(91));
    }

    #[test]
    fn test_interpolate_outside_table() {
        let points = vec![CurvePoint::new(10, 20), CurvePoint::new(50, 60)];
        assert_eq!(interpolate(&points, 5), None);
        assert_eq!(interpolate(&points, 80), None);
        assert_eq!(interpolate(&[], 80), None);
    }

    #[test]
    fn test_validate_points() {
        assert!(validate_points(&table()).is_ok());
        assert!(validate_points(&[]).is_err());
        assert!(validate_points(&[CurvePoint::new(0, 0)]).is_err());
        assert!(validate_points(&[CurvePoint::new(1, 0), CurvePoint::new(127, 127)]).is_err());
        assert!(validate_points(&[CurvePoint::new(0, 0), CurvePoint::new(100, 127)]).is_err());
        assert!(validate_points(&[
            CurvePoint::new(0, 0),
            CurvePoint::new(90, 60),
            CurvePoint::new(40, 80),
            CurvePoint::new(127, 127),
        ])
        .is_err());
        assert!(validate_points(&[CurvePoint::new(0, 0), CurvePoint::new(127, 200)]).is_err());
    }
}
