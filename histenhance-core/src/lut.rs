//! 256-entry intensity remapping tables.

use ndarray::{Array2, ArrayView2};

use crate::error::{EnhanceError, Result};
use crate::histogram::{Histogram, BINS};

/// Position-independent remapping: index = input intensity, value = output intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lut {
    table: [u8; BINS],
}

impl Lut {
    pub fn identity() -> Self {
        let mut table = [0u8; BINS];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self { table }
    }

    pub fn from_table(table: [u8; BINS]) -> Self {
        Self { table }
    }

    /// Evaluate `f` on every intensity, rounding half away from zero and
    /// clamping into `[0, 255]`.
    pub fn from_fn(f: impl Fn(f64) -> f64) -> Self {
        let mut table = [0u8; BINS];
        for (i, v) in table.iter_mut().enumerate() {
            *v = round_to_u8(f(i as f64));
        }
        Self { table }
    }

    /// Global equalization: `round(255 * cdf[i])`.
    ///
    /// An empty histogram carries no distribution and yields the identity.
    pub fn equalization(hist: &Histogram) -> Self {
        let cdf = hist.cdf();
        if cdf.is_empty() {
            return Self::identity();
        }
        let mut table = [0u8; BINS];
        for (v, &c) in table.iter_mut().zip(cdf.values().iter()) {
            *v = round_to_u8(c * 255.0);
        }
        Self { table }
    }

    /// `round(255 * (i/255)^(1/gamma))`; `gamma` must be finite and positive.
    pub fn gamma(gamma: f64) -> Result<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(EnhanceError::invalid(
                "gamma",
                format!("must be a finite value > 0, got {}", gamma),
            ));
        }
        let inv_gamma = 1.0 / gamma;
        Ok(Self::from_fn(|i| 255.0 * (i / 255.0).powf(inv_gamma)))
    }

    /// `round(alpha * i + beta)`, clamped. `alpha` and `beta` are unrestricted.
    pub fn linear(alpha: f64, beta: f64) -> Self {
        Self::from_fn(|i| alpha * i + beta)
    }

    #[inline]
    pub fn get(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    pub fn table(&self) -> &[u8; BINS] {
        &self.table
    }

    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(i, &v)| i == v as usize)
    }

    pub fn apply(&self, plane: ArrayView2<'_, u8>) -> Array2<u8> {
        plane.mapv(|v| self.get(v))
    }
}

/// NaN maps to 0, infinities saturate.
#[inline]
pub(crate) fn round_to_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}
