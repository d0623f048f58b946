//! Histogram matching by nearest cumulative distribution.
//!
//! For each source intensity `i` the output is the smallest reference
//! intensity `j` with `ref_cdf[j] >= src_cdf[i]`. Ties go to the lowest `j`.
//! This is a one-directional lower-bound lookup, not an interpolated inverse,
//! and outputs depend on that exact convention.

use ndarray::{Array2, ArrayView2};

use crate::histogram::{Histogram, BINS};
use crate::lut::Lut;

/// Build the source-to-reference remapping from two histograms.
pub fn match_lut(source: &Histogram, reference: &Histogram) -> Lut {
    let src_cdf = source.cdf();
    let ref_cdf = reference.cdf();
    let mut table = [0u8; BINS];
    for (v, &p) in table.iter_mut().zip(src_cdf.values().iter()) {
        *v = ref_cdf.lower_bound(p);
    }
    Lut::from_table(table)
}

/// Remap `source` so its distribution follows `reference`.
///
/// The planes may have different spatial dimensions.
pub fn match_plane(source: ArrayView2<'_, u8>, reference: ArrayView2<'_, u8>) -> Array2<u8> {
    let lut = match_lut(
        &Histogram::from_plane(source),
        &Histogram::from_plane(reference),
    );
    lut.apply(source)
}
