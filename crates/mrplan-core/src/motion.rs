//! Frame-driven motion primitives.
//!
//! The UI thread calls [`Motion::tick`] once per frame; nothing here
//! owns a clock.

use std::time::Duration;

use crate::config::SpringParams;

/// Longest integration step; larger frames are split.
const MAX_STEP: f32 = 1.0 / 240.0;
const REST_DISPLACEMENT: f32 = 0.01;
const REST_SPEED: f32 = 2.0;
/// Frames at least this long land a spring on its target outright.
const SETTLE_BOUND: Duration = Duration::from_secs(10);

pub trait Motion {
    /// Retargets the motion from wherever it currently is.
    fn set(&mut self, target: f32);

    /// Advances by `dt` and returns the new value.
    fn tick(&mut self, dt: Duration) -> f32;

    fn is_settled(&self) -> bool;

    fn value(&self) -> f32;

    fn target(&self) -> f32;

    /// Stops at `value` with no residual velocity.
    fn snap(&mut self, value: f32);
}

/// Damped spring: `m·x'' = -k·(x - target) - c·x'`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    params: SpringParams,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(value: f32, params: SpringParams) -> Self {
        Self {
            params,
            value,
            velocity: 0.0,
            target: value,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    fn step(&mut self, h: f32) {
        let SpringParams {
            damping,
            stiffness,
            mass,
        } = self.params;
        let displacement = self.value - self.target;
        let accel = (-stiffness * displacement - damping * self.velocity) / mass;
        // semi-implicit Euler
        self.velocity += accel * h;
        self.value += self.velocity * h;
    }
}

impl Motion for Spring {
    fn set(&mut self, target: f32) {
        self.target = target;
    }

    fn tick(&mut self, dt: Duration) -> f32 {
        if self.is_settled() {
            return self.value;
        }
        if dt >= SETTLE_BOUND {
            self.snap(self.target);
            return self.value;
        }
        let secs = dt.as_secs_f32();
        let steps = (secs / MAX_STEP).ceil() as u32;
        if steps > 0 {
            let h = secs / steps as f32;
            for _ in 0..steps {
                self.step(h);
            }
        }
        if (self.value - self.target).abs() < REST_DISPLACEMENT && self.velocity.abs() < REST_SPEED {
            self.value = self.target;
            self.velocity = 0.0;
        }
        self.value
    }

    fn is_settled(&self) -> bool {
        self.value == self.target && self.velocity == 0.0
    }

    fn value(&self) -> f32 {
        self.value
    }

    fn target(&self) -> f32 {
        self.target
    }

    fn snap(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
    }
}

/// Fixed-duration eased transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    duration: Duration,
    easing: Easing,
    from: f32,
    target: f32,
    value: f32,
    elapsed: Duration,
}

impl Timing {
    pub fn new(value: f32, duration: Duration, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            from: value,
            target: value,
            value,
            elapsed: duration,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

impl Motion for Timing {
    /// Setting the target already in flight keeps the running motion.
    fn set(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.from = self.value;
        self.target = target;
        self.elapsed = Duration::ZERO;
        if self.duration.is_zero() {
            self.value = target;
        }
    }

    fn tick(&mut self, dt: Duration) -> f32 {
        if self.is_settled() {
            return self.value;
        }
        self.elapsed = (self.elapsed + dt).min(self.duration);
        let t = self.progress();
        self.value = if t >= 1.0 {
            self.target
        } else {
            self.from + (self.target - self.from) * self.easing.apply(t)
        };
        self.value
    }

    fn is_settled(&self) -> bool {
        self.value == self.target
    }

    fn value(&self) -> f32 {
        self.value
    }

    fn target(&self) -> f32 {
        self.target
    }

    fn snap(&mut self, value: f32) {
        self.from = value;
        self.target = value;
        self.value = value;
        self.elapsed = self.duration;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,
    /// Mirror of [`Easing::EaseIn`]: fast start, soft landing.
    EaseOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => EASE.at(t),
            Easing::EaseOut => 1.0 - EASE.at(1.0 - t),
        }
    }
}

const EASE: CubicBezier = CubicBezier {
    x1: 0.42,
    y1: 0.0,
    x2: 1.0,
    y2: 1.0,
};

#[derive(Debug, Clone, Copy)]
struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl CubicBezier {
    fn sample(a1: f32, a2: f32, s: f32) -> f32 {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
    }

    fn slope(a1: f32, a2: f32, s: f32) -> f32 {
        let inv = 1.0 - s;
        3.0 * inv * inv * a1 + 6.0 * inv * s * (a2 - a1) + 3.0 * s * s * (1.0 - a2)
    }

    /// `y` for the curve point whose `x` is `x`.
    fn at(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut s = x;
        for _ in 0..8 {
            let err = Self::sample(self.x1, self.x2, s) - x;
            if err.abs() < 1e-5 {
                return Self::sample(self.y1, self.y2, s);
            }
            let d = Self::slope(self.x1, self.x2, s);
            if d.abs() < 1e-6 {
                break;
            }
            s -= err / d;
        }

        // Newton stalled; bisect.
        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        s = x;
        for _ in 0..32 {
            let sx = Self::sample(self.x1, self.x2, s);
            if (sx - x).abs() < 1e-5 {
                break;
            }
            if sx < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) / 2.0;
        }
        Self::sample(self.y1, self.y2, s)
    }
}

/// Maps `value` from `input` onto `output`, clamped to `output`.
pub fn interpolate_clamped(value: f32, input: (f32, f32), output: (f32, f32)) -> f32 {
    let (in0, in1) = input;
    let (out0, out1) = output;
    if in0 == in1 {
        return out0;
    }
    let t = ((value - in0) / (in1 - in0)).clamp(0.0, 1.0);
    out0 + (out1 - out0) * t
}
