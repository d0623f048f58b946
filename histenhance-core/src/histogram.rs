//! 256-bin intensity histograms and their normalized cumulative distributions.

use ndarray::ArrayView2;

/// Number of intensity levels in an 8-bit channel.
pub const BINS: usize = 256;

/// Pixel counts per intensity; index is the intensity value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; BINS],
}

impl Histogram {
    /// Count every sample of `plane` into exactly one bin.
    pub fn from_plane(plane: ArrayView2<'_, u8>) -> Self {
        let mut counts = [0u32; BINS];
        for &v in plane.iter() {
            counts[v as usize] += 1;
        }
        Self { counts }
    }

    pub fn from_counts(counts: [u32; BINS]) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[u32; BINS] {
        &self.counts
    }

    pub(crate) fn counts_mut(&mut self) -> &mut [u32; BINS] {
        &mut self.counts
    }

    /// Sum of all bins, equal to the source plane's pixel count.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Lowest intensity with a non-zero count.
    pub fn min(&self) -> Option<u8> {
        self.counts.iter().position(|&c| c > 0).map(|i| i as u8)
    }

    /// Highest intensity with a non-zero count.
    pub fn max(&self) -> Option<u8> {
        self.counts.iter().rposition(|&c| c > 0).map(|i| i as u8)
    }

    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: u64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| i as u64 * c as u64)
            .sum();
        Some(weighted as f64 / total as f64)
    }

    /// Running sum normalized by the total count.
    pub fn cdf(&self) -> Cdf {
        let mut values = [0.0f64; BINS];
        let total = self.total();
        if total == 0 {
            return Cdf { values };
        }
        let mut running = 0u64;
        for (value, &count) in values.iter_mut().zip(self.counts.iter()) {
            running += count as u64;
            *value = running as f64 / total as f64;
        }
        Cdf { values }
    }
}

/// Non-decreasing values in `[0, 1]`; the last entry is exactly `1.0`, or
/// every entry is `0.0` when built from an empty histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Cdf {
    values: [f64; BINS],
}

impl Cdf {
    pub fn values(&self) -> &[f64; BINS] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values[BINS - 1] == 0.0
    }

    /// Smallest intensity whose cumulative value is `>= p`.
    ///
    /// Falls back to 255 when no entry reaches `p`.
    pub fn lower_bound(&self, p: f64) -> u8 {
        let j = self.values.partition_point(|&c| c < p);
        j.min(BINS - 1) as u8
    }
}
