//! Easing functions for animations

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::str::FromStr;

/// Easing function type
///
/// Every easing maps `t` in `[0, 1]` to a progress value. Elastic and
/// bounce curves may leave `[0, 1]` in between but always hit `0` and `1`
/// exactly at the endpoints.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    CubicBezier(f32, f32, f32, f32),
    /// A caller-supplied curve
    #[serde(skip)]
    Custom(fn(f32) -> f32),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::ElasticIn => elastic_in(t),
            Easing::ElasticOut => elastic_out(t),
            Easing::ElasticInOut => elastic_in_out(t),
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Custom(f) => f(t),
        }
    }

    /// The equivalent CSS `animation-timing-function`, when one exists
    ///
    /// Elastic, bounce and custom curves have no CSS form; keyframe emission
    /// samples them instead.
    pub fn to_css(&self) -> Option<String> {
        let bezier = |x1: f32, y1: f32, x2: f32, y2: f32| {
            Some(format!("cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2))
        };
        match *self {
            Easing::Linear => Some("linear".to_string()),
            Easing::EaseIn | Easing::EaseInCubic => bezier(0.32, 0.0, 0.67, 0.0),
            Easing::EaseOut | Easing::EaseOutCubic => bezier(0.33, 1.0, 0.68, 1.0),
            Easing::EaseInOut | Easing::EaseInOutCubic => bezier(0.65, 0.0, 0.35, 1.0),
            Easing::EaseInQuad => bezier(0.11, 0.0, 0.5, 0.0),
            Easing::EaseOutQuad => bezier(0.5, 1.0, 0.89, 1.0),
            Easing::EaseInOutQuad => bezier(0.45, 0.0, 0.55, 1.0),
            Easing::EaseInQuart => bezier(0.5, 0.0, 0.75, 0.0),
            Easing::EaseOutQuart => bezier(0.25, 1.0, 0.5, 1.0),
            Easing::EaseInOutQuart => bezier(0.76, 0.0, 0.24, 1.0),
            Easing::CubicBezier(x1, y1, x2, y2) => bezier(x1, y1, x2, y2),
            Easing::ElasticIn
            | Easing::ElasticOut
            | Easing::ElasticInOut
            | Easing::BounceIn
            | Easing::BounceOut
            | Easing::BounceInOut
            | Easing::Custom(_) => None,
        }
    }
}

/// Error returned for an unknown easing name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown easing `{0}`")]
pub struct UnknownEasing(pub String);

impl FromStr for Easing {
    type Err = UnknownEasing;

    /// Accepts `ease_in_out`, `easeInOut`, `ease-in-out` and
    /// `cubic-bezier(x1, y1, x2, y2)`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some(args) = lower
            .strip_prefix("cubic-bezier(")
            .or_else(|| lower.strip_prefix("cubic_bezier("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let values: Vec<f32> = args
                .split(',')
                .map(|v| v.trim().parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|_| UnknownEasing(trimmed.to_string()))?;
            return match values.as_slice() {
                [x1, y1, x2, y2] => Ok(Easing::CubicBezier(*x1, *y1, *x2, *y2)),
                _ => Err(UnknownEasing(trimmed.to_string())),
            };
        }

        let key: String = lower.chars().filter(|c| *c != '_' && *c != '-').collect();
        let easing = match key.as_str() {
            "linear" => Easing::Linear,
            "easein" => Easing::EaseIn,
            "easeout" => Easing::EaseOut,
            "easeinout" => Easing::EaseInOut,
            "easeinquad" => Easing::EaseInQuad,
            "easeoutquad" => Easing::EaseOutQuad,
            "easeinoutquad" => Easing::EaseInOutQuad,
            "easeincubic" => Easing::EaseInCubic,
            "easeoutcubic" => Easing::EaseOutCubic,
            "easeinoutcubic" => Easing::EaseInOutCubic,
            "easeinquart" => Easing::EaseInQuart,
            "easeoutquart" => Easing::EaseOutQuart,
            "easeinoutquart" => Easing::EaseInOutQuart,
            "elasticin" | "easeinelastic" => Easing::ElasticIn,
            "elastic" | "elasticout" | "easeoutelastic" => Easing::ElasticOut,
            "elasticinout" | "easeinoutelastic" => Easing::ElasticInOut,
            "bouncein" | "easeinbounce" => Easing::BounceIn,
            "bounce" | "bounceout" | "easeoutbounce" => Easing::BounceOut,
            "bounceinout" | "easeinoutbounce" => Easing::BounceInOut,
            _ => return Err(UnknownEasing(trimmed.to_string())),
        };
        Ok(easing)
    }
}

fn elastic_in(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c4 = (2.0 * PI) / 3.0;
    -(2.0f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
}

fn elastic_out(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c4 = (2.0 * PI) / 3.0;
    2.0f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
}

fn elastic_in_out(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c5 = (2.0 * PI) / 4.5;
    if t < 0.5 {
        -(2.0f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
    } else {
        (2.0f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Cubic bezier easing calculation (matches the CSS `cubic-bezier()` timing function).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}
