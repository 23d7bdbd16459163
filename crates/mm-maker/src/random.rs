//! Quantized randomness.
//!
//! Every random price, amount and volume target is drawn on a step grid
//! anchored at the lower bound, so results stay exact decimals.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::{MakerError, MakerResult};

/// Uniform draw of `min + k * step` with `k` in `[0, floor((max - min) / step)]`.
///
/// Returns `min` when `max < min` or `step <= 0`.
pub fn random_decimal<R: Rng + ?Sized>(
    rng: &mut R,
    min: Decimal,
    max: Decimal,
    step: Decimal,
) -> Decimal {
    if max < min || step <= Decimal::ZERO {
        return min;
    }
    let steps = ((max - min) / step).floor().to_u64().unwrap_or(u64::MAX);
    let k = rng.gen_range(0..=steps);
    min + Decimal::from(k) * step
}

/// Draw from a normal distribution with the given mean and standard
/// deviation. Floating point is used for sampling only.
///
/// A negative deviation is an error.
pub fn sample_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: Decimal,
    std_dev: Decimal,
) -> MakerResult<Decimal> {
    if std_dev < Decimal::ZERO {
        return Err(MakerError::Sampling(format!("std dev {std_dev} is negative")));
    }
    let mean_f = mean
        .to_f64()
        .ok_or_else(|| MakerError::Sampling(format!("mean {mean} out of range")))?;
    let std_f = std_dev
        .to_f64()
        .ok_or_else(|| MakerError::Sampling(format!("std dev {std_dev} out of range")))?;

    let normal = Normal::new(mean_f, std_f).map_err(|e| MakerError::Sampling(e.to_string()))?;
    let sample = normal.sample(rng);
    Decimal::from_f64(sample)
        .ok_or_else(|| MakerError::Sampling(format!("sample {sample} not representable")))
}
