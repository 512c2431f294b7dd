/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// Linear interpolation from v<sub>i</sub> to v<sub>f</sub> over `duration` steps
///
/// For `t >= duration` the value is exactly v<sub>f</sub>. The result is always clamped
/// to the interval spanned by v<sub>i</sub> and v<sub>f</sub>, whichever order they are
/// given in, so a misconfigured schedule can never produce an out-of-range value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Linear {
    vi: f32,
    vf: f32,
    duration: f32,
}

impl Linear {
    pub fn new(vi: f32, vf: f32, duration: f32) -> Self {
        Self { vi, vf, duration }
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { vi, vf, duration } = self;
        if duration <= 0.0 || t >= duration {
            return vf;
        }
        let v = vi + (vf - vi) * (t / duration);
        v.clamp(vi.min(vf), vi.max(vf))
    }
}
