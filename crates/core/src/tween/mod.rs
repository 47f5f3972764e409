use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SmoothPageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EaseDirection {
    In,
    Out,
    InOut,
}

/// Easing curves understood by the tween boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    /// `powerN.in/out/inOut`; power 1 is quadratic, matching the usual naming.
    Power { power: u8, direction: EaseDirection },
    CubicBezier([f64; 4]),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Power {
            power: 1,
            direction: EaseDirection::Out,
        }
    }
}

impl Easing {
    /// The back-to-top curve.
    pub const STANDARD: Easing = Easing::CubicBezier([0.25, 0.1, 0.25, 1.0]);

    /// Maps linear progress `t` in `[0, 1]` onto eased progress.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::Power { power, direction } => {
                let exp = i32::from(power) + 1;
                match direction {
                    EaseDirection::In => t.powi(exp),
                    EaseDirection::Out => 1.0 - (1.0 - t).powi(exp),
                    EaseDirection::InOut => {
                        if t < 0.5 {
                            (2.0 * t).powi(exp) / 2.0
                        } else {
                            1.0 - (2.0 * (1.0 - t)).powi(exp) / 2.0
                        }
                    }
                }
            }
            Easing::CubicBezier([x1, y1, x2, y2]) => cubic_bezier(x1, y1, x2, y2, t),
        }
    }
}

impl FromStr for Easing {
    type Err = SmoothPageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == "none" || raw == "linear" {
            return Ok(Easing::Linear);
        }

        let parse_err = || SmoothPageError::Parse(raw.to_string());
        let rest = raw.strip_prefix("power").ok_or_else(parse_err)?;
        let (power, direction) = match rest.split_once('.') {
            Some((power, dir)) => (power, dir),
            None => (rest, "out"),
        };
        let power: u8 = power.parse().map_err(|_| parse_err())?;
        let direction = match direction {
            "in" => EaseDirection::In,
            "out" => EaseDirection::Out,
            "inOut" => EaseDirection::InOut,
            _ => return Err(parse_err()),
        };
        Ok(Easing::Power { power, direction })
    }
}

fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    let sample = |a1: f64, a2: f64, t: f64| {
        let u = 1.0 - t;
        3.0 * u * u * t * a1 + 3.0 * u * t * t * a2 + t * t * t
    };
    let slope = |a1: f64, a2: f64, t: f64| {
        let u = 1.0 - t;
        3.0 * u * u * a1 + 6.0 * u * t * (a2 - a1) + 3.0 * t * t * (1.0 - a2)
    };

    // Newton first, bisection when the slope flattens out.
    let mut t = x;
    for _ in 0..8 {
        let err = sample(x1, x2, t) - x;
        if err.abs() < 1e-7 {
            return sample(y1, y2, t);
        }
        let d = slope(x1, x2, t);
        if d.abs() < 1e-6 {
            break;
        }
        t -= err / d;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    t = x;
    for _ in 0..40 {
        let value = sample(x1, x2, t);
        if (value - x).abs() < 1e-7 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    sample(y1, y2, t)
}

/// Time-based interpolation between two scalar values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, start_ms: f64, duration_ms: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms: duration_ms.max(0.0),
            easing,
        }
    }

    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now_ms: f64) -> f64 {
        let eased = self.easing.apply(self.progress(now_ms));
        self.from + (self.to - self.from) * eased
    }

    pub fn is_done(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easings_hit_their_endpoints() {
        let curves = [
            Easing::Linear,
            Easing::STANDARD,
            "power2.out".parse().unwrap(),
            "power1.inOut".parse().unwrap(),
            "power4.in".parse().unwrap(),
        ];
        for curve in curves {
            assert!(curve.apply(0.0).abs() < 1e-9, "{curve:?}");
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-9, "{curve:?}");
        }
    }

    #[test]
    fn standard_bezier_is_monotonic() {
        let mut last = 0.0;
        for step in 1..=20 {
            let value = Easing::STANDARD.apply(step as f64 / 20.0);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn power_out_front_loads_progress() {
        let ease: Easing = "power2.out".parse().unwrap();
        assert!(ease.apply(0.5) > 0.5);
        assert!(Easing::Linear.apply(0.5) == 0.5);
    }

    #[test]
    fn rejects_unknown_easing_names() {
        assert!("back.out(1.7)".parse::<Easing>().is_err());
        assert!("power2.sideways".parse::<Easing>().is_err());
    }

    #[test]
    fn zero_duration_tween_is_immediately_done() {
        let tween = Tween::new(100.0, 0.0, 50.0, 0.0, Easing::Linear);
        assert!(tween.is_done(50.0));
        assert_eq!(tween.sample(50.0), 0.0);
    }

    #[test]
    fn tween_samples_midpoint() {
        let tween = Tween::new(0.0, 200.0, 0.0, 1000.0, Easing::Linear);
        assert_eq!(tween.sample(500.0), 100.0);
        assert!(!tween.is_done(999.0));
        assert_eq!(tween.sample(2_000.0), 200.0);
    }
}
