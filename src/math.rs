use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

/// Scale perturbations are applied as powers of this base.
pub const SCALE_BASE: f32 = 1.05;

/// Exponential with rate `lambda` and a random sign.
pub fn sample_exp_two_sided<R: Rng + ?Sized>(rng: &mut R, lambda: f32) -> f32 {
    let magnitude: f32 = rng.sample::<f32, _>(Exp1) / lambda;

    if rng.gen::<bool>() {
        magnitude
    } else {
        -magnitude
    }
}

/// Zero-mean gaussian with the given standard deviation.
#[inline]
pub fn sample_gauss<R: Rng + ?Sized>(rng: &mut R, sd: f32) -> f32 {
    rng.sample::<f32, _>(StandardNormal) * sd
}

/// Uniform in `[-range, range]`.
#[inline]
pub fn sample_symmetric<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    (rng.gen::<f32>() * 2.0 - 1.0) * range
}

/// Uniform in `[lo, hi]`, collapsing to the midpoint when the interval is empty.
#[inline]
pub fn sample_between<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return (lo + hi) / 2.0;
    }

    lo + rng.gen::<f32>() * (hi - lo)
}

#[inline]
pub fn scale_multiplier(exponent: f32) -> f32 {
    SCALE_BASE.powf(exponent)
}
