//! Velocity curves
//!
//! Reshapes the velocity of note events. Every curve is a pure function
//! from an input velocity (0-127) to an output velocity (0-127); the
//! threshold in [`VelocityCurveConfig`] is a dead zone below which
//! velocities are left alone.

mod bezier;
mod custom;
mod power;

pub use bezier::bezier;
pub use custom::{interpolate, validate_points, CurvePoint};
pub use power::{exponential, linear};

use crate::error::{Error, Result};

/// Highest MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Default reference velocity for the linear and exponential curves.
pub const DEFAULT_MAX_VALUE: f64 = 127.0;

/// Curve shapes. Each variant carries only the parameters it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum VelocityCurve {
    /// Scale velocity by `sensitivity`, relative to `max_value`
    Linear { sensitivity: f64, max_value: f64 },
    /// Raise the normalized velocity to `exponent`
    Exponential { exponent: f64, max_value: f64 },
    /// Quadratic Bezier deviation, `deviation` in [-100, 100]
    Bezier { deviation: f64 },
    /// Piecewise-linear table
    Custom { points: Vec<CurvePoint> },
}

impl VelocityCurve {
    /// Short name used in logs and config summaries.
    pub fn name(&self) -> &'static str {
        match self {
            VelocityCurve::Linear { .. } => "linear",
            VelocityCurve::Exponential { .. } => "exponential",
            VelocityCurve::Bezier { .. } => "bezier",
            VelocityCurve::Custom { .. } => "custom",
        }
    }

    /// Check the curve parameters without running the curve.
    pub fn validate(&self) -> Result<()> {
        match self {
            VelocityCurve::Linear {
                sensitivity,
                max_value,
            } => {
                check_max_value(*max_value)?;
                if !sensitivity.is_finite() || *sensitivity < 0.0 {
                    return Err(Error::invalid(format!(
                        "sensitivity must be a non-negative number, got {}",
                        sensitivity
                    )));
                }
                Ok(())
            }
            VelocityCurve::Exponential {
                exponent,
                max_value,
            } => {
                check_max_value(*max_value)?;
                if !exponent.is_finite() {
                    return Err(Error::invalid(format!(
                        "exponent must be finite, got {}",
                        exponent
                    )));
                }
                Ok(())
            }
            VelocityCurve::Bezier { deviation } => bezier::check_deviation(*deviation),
            VelocityCurve::Custom { points } => validate_points(points),
        }
    }
}

impl Default for VelocityCurve {
    fn default() -> Self {
        VelocityCurve::Bezier { deviation: 0.0 }
    }
}

/// A curve plus its dead-zone threshold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VelocityCurveConfig {
    pub curve: VelocityCurve,
    /// Velocities at or below this value are returned unchanged
    pub threshold: u8,
}

impl VelocityCurveConfig {
    /// Build a validated configuration.
    pub fn new(curve: VelocityCurve, threshold: u8) -> Result<Self> {
        let config = Self { curve, threshold };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold > MAX_VELOCITY {
            return Err(Error::invalid(format!(
                "threshold must be in 0..=127, got {}",
                self.threshold
            )));
        }
        self.curve.validate()
    }

    /// Map an input velocity through the curve.
    ///
    /// Errors for parameters that could not have passed
    /// [`validate`](Self::validate), including a custom table with no
    /// segment covering the velocity.
    pub fn adjust(&self, velocity: u8) -> Result<u8> {
        let velocity = velocity.min(MAX_VELOCITY);
        if velocity <= self.threshold {
            return Ok(velocity);
        }

        match &self.curve {
            VelocityCurve::Linear {
                sensitivity,
                max_value,
            } => linear(velocity, *sensitivity, *max_value),
            VelocityCurve::Exponential {
                exponent,
                max_value,
            } => exponential(velocity, *exponent, *max_value),
            VelocityCurve::Bezier { deviation } => bezier(velocity, *deviation),
            VelocityCurve::Custom { points } => interpolate(points, velocity).ok_or_else(|| {
                Error::invalid(format!(
                    "custom curve has no segment covering velocity {}",
                    velocity
                ))
            }),
        }
    }
}

/// Free-function form of [`VelocityCurveConfig::adjust`].
pub fn adjust(velocity: u8, config: &VelocityCurveConfig) -> Result<u8> {
    config.adjust(velocity)
}

fn check_max_value(max_value: f64) -> Result<()> {
    // Written so that NaN fails too.
    if !(max_value > 0.0) || !max_value.is_finite() {
        return Err(Error::invalid(format!(
            "max_value must be positive, got {}",
            max_value
        )));
    }
    Ok(())
}

/// Round a curve result onto the velocity range. NaN maps to 0.
pub(crate) fn to_velocity(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, MAX_VELOCITY as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<VelocityCurve> {
        vec![
            VelocityCurve::Linear {
                sensitivity: 1.0,
                max_value: DEFAULT_MAX_VALUE,
            },
            VelocityCurve::Exponential {
                exponent: 0.6,
                max_value: DEFAULT_MAX_VALUE,
            },
            VelocityCurve::Bezier { deviation: 0.0 },
            VelocityCurve::Custom {
                points: vec![CurvePoint::new(0, 0), CurvePoint::new(127, 127)],
            },
        ]
    }

    #[test]
    fn test_zero_maps_to_zero_for_every_curve() {
        let mut curves = defaults();
        curves.push(VelocityCurve::Exponential {
            exponent: -2.0,
            max_value: DEFAULT_MAX_VALUE,
        });
        curves.push(VelocityCurve::Bezier { deviation: -100.0 });
        curves.push(VelocityCurve::Custom {
            points: vec![CurvePoint::new(0, 40), CurvePoint::new(127, 127)],
        });

        for curve in curves {
            let config = VelocityCurveConfig::new(curve, 0).unwrap();
            assert_eq!(config.adjust(0).unwrap(), 0, "{:?}", config.curve);
        }
    }

    #[test]
    fn test_full_velocity_stays_audible() {
        for curve in defaults() {
            let config = VelocityCurveConfig::new(curve, 0).unwrap();
            let out = config.adjust(127).unwrap();
            assert!((1..=127).contains(&out), "{:?} gave {}", config.curve, out);
        }
    }

    #[test]
    fn test_threshold_dead_zone() {
        for curve in defaults() {
            let config = VelocityCurveConfig::new(curve, 20).unwrap();
            assert_eq!(config.adjust(15).unwrap(), 15);
            assert_eq!(config.adjust(20).unwrap(), 20);
        }

        let boosted = VelocityCurveConfig::new(VelocityCurve::Bezier { deviation: -60.0 }, 20).unwrap();
        assert_ne!(boosted.adjust(21).unwrap(), 21);
    }

    #[test]
    fn test_results_stay_in_range() {
        let curves = vec![
            VelocityCurve::Linear {
                sensitivity: 3.0,
                max_value: 70.0,
            },
            VelocityCurve::Exponential {
                exponent: -1.5,
                max_value: DEFAULT_MAX_VALUE,
            },
            VelocityCurve::Bezier { deviation: 100.0 },
            VelocityCurve::Bezier { deviation: -100.0 },
        ];
        for curve in curves {
            let config = VelocityCurveConfig::new(curve, 0).unwrap();
            for v in 0..=255u8 {
                assert!(config.adjust(v).unwrap() <= MAX_VELOCITY);
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(VelocityCurve::Bezier { deviation: 101.0 }.validate().is_err());
        assert!(VelocityCurve::Linear {
            sensitivity: 1.0,
            max_value: 0.0
        }
        .validate()
        .is_err());
        assert!(VelocityCurve::Exponential {
            exponent: 0.6,
            max_value: -5.0
        }
        .validate()
        .is_err());
        assert!(VelocityCurve::Exponential {
            exponent: f64::NAN,
            max_value: 127.0
        }
        .validate()
        .is_err());
        assert!(VelocityCurve::Custom { points: vec![] }.validate().is_err());
        assert!(VelocityCurveConfig::new(VelocityCurve::default(), 128).is_err());
    }

    #[test]
    fn test_unvalidated_bezier_errors_at_adjust() {
        let config = VelocityCurveConfig {
            curve: VelocityCurve::Bezier { deviation: 250.0 },
            threshold: 0,
        };
        assert!(matches!(config.adjust(64), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_custom_table_gap_errors_at_adjust() {
        let config = VelocityCurveConfig {
            curve: VelocityCurve::Custom {
                points: vec![CurvePoint::new(10, 20), CurvePoint::new(50, 60)],
            },
            threshold: 0,
        };
        assert_eq!(config.adjust(30).unwrap(), 40);
        assert!(matches!(config.adjust(80), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_to_velocity_clamps_non_finite() {
        assert_eq!(to_velocity(f64::NAN), 0);
        assert_eq!(to_velocity(f64::INFINITY), 127);
        assert_eq!(to_velocity(f64::NEG_INFINITY), 0);
        assert_eq!(to_velocity(63.5), 64);
    }

    #[test]
    fn test_free_function_matches_method() {
        let config = VelocityCurveConfig::new(VelocityCurve::Bezier { deviation: -60.0 }, 0).unwrap();
        assert_eq!(adjust(40, &config).unwrap(), config.adjust(40).unwrap());
    }
}
