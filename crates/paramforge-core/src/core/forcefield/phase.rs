use std::f64::consts::{PI, TAU};

/// Reduces a phase into `[0, 2π)`.
#[inline]
pub fn reduce(phase: f64) -> f64 {
    let reduced = phase.rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative inputs.
    if reduced >= TAU { 0.0 } else { reduced }
}

#[inline]
pub fn is_near(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Whether two phases describe the same angle, modulo 2π.
pub fn phases_agree(a: f64, b: f64, tolerance: f64) -> bool {
    let diff = reduce(a - b);
    diff <= tolerance || TAU - diff <= tolerance
}

/// Whether the phase is a multiple of π, i.e. the term can be expressed as a
/// signed coefficient with zero phase.
pub fn is_multiple_of_pi(phase: f64, tolerance: f64) -> bool {
    let reduced = reduce(phase);
    [0.0, PI, TAU]
        .iter()
        .any(|&target| is_near(reduced, target, tolerance))
}

/// Absorbs the sign of a Fourier coefficient into its phase.
///
/// `(-k, φ)` and `(k, φ + π)` describe the same energy term; the returned
/// coefficient is non-negative and the phase lies in `[0, 2π)`.
pub fn normalize_sign(k: f64, phase: f64) -> (f64, f64) {
    if k < 0.0 {
        (-k, reduce(phase + PI))
    } else {
        (k, reduce(phase))
    }
}

/// A Fourier term re-expressed as a single signed coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignedCoefficient {
    Value(f64),
    /// The phase is not within tolerance of 0, π or 2π.
    Unrepresentable,
    Missing,
}

impl SignedCoefficient {
    /// Phase near 0 or 2π keeps the sign of `k`; phase near π flips it.
    pub fn from_term(k: Option<f64>, phase: Option<f64>, tolerance: f64) -> Self {
        let (Some(k), Some(phase)) = (k, phase) else {
            return Self::Missing;
        };
        if k == 0.0 {
            return Self::Value(0.0);
        }
        let reduced = reduce(phase);
        if is_near(reduced, 0.0, tolerance) || is_near(reduced, TAU, tolerance) {
            Self::Value(k)
        } else if is_near(reduced, PI, tolerance) {
            Self::Value(-k)
        } else {
            Self::Unrepresentable
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unrepresentable | Self::Missing => None,
        }
    }
}
