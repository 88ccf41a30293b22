//! Fade curves for sound fade-in/fade-out envelopes
//!
//! A curve maps normalized fade progress `t ∈ [0, 1]` to a gain multiplier.
//! Fade-in gains rise from 0.0 to 1.0; fade-out gains fall from 1.0 to 0.0.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// Gain curve applied across a fade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,

    /// v(t) = t², slow start
    Exponential,

    /// v(t) = 0.5 × (1 - cos(π × t)), smooth at both ends
    SCurve,

    /// v(t) = sin(t × π/2), constant perceived loudness
    EqualPower,
}

impl FadeCurve {
    /// Gain at `position` through a fade-in (0.0 = start, 1.0 = done)
    pub fn fade_in_gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Gain at `position` through a fade-out (0.0 = start, 1.0 = silent)
    ///
    /// Fade-outs mirror the fade-in curve in time.
    pub fn fade_out_gain(&self, position: f32) -> f32 {
        self.fade_in_gain(1.0 - position.clamp(0.0, 1.0))
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        };
        f.write_str(name)
    }
}

impl FromStr for FadeCurve {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "exponential" => Ok(FadeCurve::Exponential),
            "s_curve" | "scurve" | "cosine" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Ok(FadeCurve::EqualPower),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown fade curve: {}",
                other
            ))),
        }
    }
}
