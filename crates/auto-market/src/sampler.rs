//! Log-uniform sampling for trade sizes and wait intervals
//!
//! Values are drawn so that `ln(value)` is uniform on `[ln(min), ln(max)]`,
//! so small values are far more frequent than large ones.

use rand::distributions::Distribution;
use rand::Rng;

use crate::error::{AutoMarketError, AutoMarketResult};

/// Log-uniform distribution over an inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogUniform {
    min: u64,
    max: u64,
    log_min: f64,
    log_max: f64,
}

impl LogUniform {
    /// Create a sampler over `[min, max]`. Requires `0 < min <= max`.
    pub fn new(min: u64, max: u64) -> AutoMarketResult<Self> {
        if min == 0 || max < min {
            return Err(AutoMarketError::InvalidRange { min, max });
        }

        Ok(Self {
            min,
            max,
            log_min: (min as f64).ln(),
            log_max: (max as f64).ln(),
        })
    }
}

impl Distribution<u64> for LogUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min == self.max {
            return self.min;
        }

        // ln(min) == ln(max) for large adjacent bounds, so no half-open range
        let u: f64 = rng.gen();
        let picked = self.log_min + u * (self.log_max - self.log_min);
        // exp(ln(x)) can land a hair below x
        (picked.exp().floor() as u64).clamp(self.min, self.max)
    }
}

/// One-shot log-uniform draw over `[min, max]`
pub fn sample_log_uniform<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> AutoMarketResult<u64> {
    Ok(LogUniform::new(min, max)?.sample(rng))
}
