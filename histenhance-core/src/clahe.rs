/// CLAHE (Contrast Limited Adaptive Histogram Equalization)
///
/// - Divide the plane into a rows x cols grid; edge tiles absorb the remainder
/// - Per-tile histogram, clipped at `clip_limit` times the average bin height,
///   excess spread evenly with the remainder going to the lowest bins
/// - Per-tile equalization LUT from the clipped histogram
/// - Bilinear interpolation between the LUTs of the surrounding tile centers

use ndarray::{s, Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::{EnhanceError, Result};
use crate::histogram::{Histogram, BINS};
use crate::lut::{round_to_u8, Lut};

pub const DEFAULT_CLIP_LIMIT: f64 = 2.0;

/// Tile grid shape in tiles (not pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileGrid {
    pub rows: usize,
    pub cols: usize,
}

impl TileGrid {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn tile_count(&self) -> usize {
        self.rows * self.cols
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.rows < 1 || self.cols < 1 {
            return Err(EnhanceError::invalid(
                "tile_grid",
                format!("both dimensions must be >= 1, got {}x{}", self.rows, self.cols),
            ));
        }
        Ok(())
    }

    /// Fails when some tile of a `height x width` plane would be empty.
    pub(crate) fn check_fits(&self, height: usize, width: usize) -> Result<()> {
        if height < self.rows || width < self.cols {
            return Err(EnhanceError::EmptyInput(
                "tile grid is larger than the image; some tiles would have no pixels",
            ));
        }
        Ok(())
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

pub(crate) fn validate_clip_limit(clip_limit: f64) -> Result<()> {
    if !clip_limit.is_finite() || clip_limit <= 0.0 {
        return Err(EnhanceError::invalid(
            "clip_limit",
            format!("must be a finite value > 0, got {}", clip_limit),
        ));
    }
    Ok(())
}

/// Enhance one channel plane. The output has the dimensions of `plane`.
pub fn clahe(plane: ArrayView2<'_, u8>, clip_limit: f64, grid: TileGrid) -> Result<Array2<u8>> {
    validate_clip_limit(clip_limit)?;
    grid.validate()?;
    let (h, w) = plane.dim();
    if h == 0 || w == 0 {
        return Err(EnhanceError::EmptyInput("plane has zero area"));
    }
    grid.check_fits(h, w)?;

    let row_spans = tile_spans(h, grid.rows);
    let col_spans = tile_spans(w, grid.cols);

    // Per-tile LUTs, row-major over the grid
    let luts: Vec<Lut> = (0..grid.tile_count())
        .into_par_iter()
        .map(|i| {
            let (y0, y1) = row_spans[i / grid.cols];
            let (x0, x1) = col_spans[i % grid.cols];
            tile_lut(plane.slice(s![y0..y1, x0..x1]), clip_limit)
        })
        .collect();

    let row_weights = axis_weights(&row_spans, h);
    let col_weights = axis_weights(&col_spans, w);

    let mut output = vec![0u8; w * h];
    output
        .par_chunks_mut(w)
        .zip(row_weights.par_iter())
        .enumerate()
        .for_each(|(y, (out_row, &(ty0, ty1, ay)))| {
            let src_row = plane.row(y);
            let top = &luts[ty0 * grid.cols..(ty0 + 1) * grid.cols];
            let bottom = &luts[ty1 * grid.cols..(ty1 + 1) * grid.cols];
            for ((out, &val), &(tx0, tx1, ax)) in
                out_row.iter_mut().zip(src_row.iter()).zip(col_weights.iter())
            {
                let tl = top[tx0].get(val) as f64;
                let tr = top[tx1].get(val) as f64;
                let bl = bottom[tx0].get(val) as f64;
                let br = bottom[tx1].get(val) as f64;

                let upper = tl * (1.0 - ax) + tr * ax;
                let lower = bl * (1.0 - ax) + br * ax;
                *out = round_to_u8(upper * (1.0 - ay) + lower * ay);
            }
        });

    Array2::from_shape_vec((h, w), output).map_err(|e| EnhanceError::InvalidShape(e.to_string()))
}

/// Split `len` pixels into `count` half-open spans. All spans get `len / count`
/// pixels except the last, which also takes the remainder.
fn tile_spans(len: usize, count: usize) -> Vec<(usize, usize)> {
    let size = len / count;
    (0..count)
        .map(|t| {
            let start = t * size;
            let end = if t + 1 == count { len } else { start + size };
            (start, end)
        })
        .collect()
}

/// For each pixel along one axis: the two tiles whose centers bracket it and
/// the weight of the second. Pixels before the first center or past the last
/// one collapse onto that single tile.
fn axis_weights(spans: &[(usize, usize)], len: usize) -> Vec<(usize, usize, f64)> {
    let centers: Vec<f64> = spans
        .iter()
        .map(|&(start, end)| (start + end) as f64 / 2.0)
        .collect();
    let last = centers.len() - 1;

    let mut t = 0usize;
    (0..len)
        .map(|p| {
            let pos = p as f64 + 0.5;
            if pos <= centers[0] {
                return (0, 0, 0.0);
            }
            if pos >= centers[last] {
                return (last, last, 0.0);
            }
            while centers[t + 1] <= pos {
                t += 1;
            }
            let a = (pos - centers[t]) / (centers[t + 1] - centers[t]);
            (t, t + 1, a)
        })
        .collect()
}

/// Clipped-histogram equalization LUT for one tile.
fn tile_lut(tile: ArrayView2<'_, u8>, clip_limit: f64) -> Lut {
    let mut hist = Histogram::from_plane(tile);
    let limit = clip_ceiling(clip_limit, hist.total());
    clip_histogram(&mut hist, limit);
    Lut::equalization(&hist)
}

/// Integer bin ceiling for a tile of `pixels` pixels; never below 1.
pub fn clip_ceiling(clip_limit: f64, pixels: u64) -> u32 {
    ((clip_limit * pixels as f64) / BINS as f64).floor().max(1.0) as u32
}

/// Truncate bins above `limit` and spread the removed counts over all bins:
/// `excess / 256` to each, plus one more to each of the first `excess % 256`.
/// The total count is preserved exactly. Returns the excess that was moved.
pub fn clip_histogram(hist: &mut Histogram, limit: u32) -> u64 {
    let counts = hist.counts_mut();
    let mut excess = 0u64;
    for h in counts.iter_mut() {
        if *h > limit {
            excess += (*h - limit) as u64;
            *h = limit;
        }
    }

    if excess == 0 {
        return 0;
    }

    let avg_inc = (excess / BINS as u64) as u32;
    let remainder = (excess % BINS as u64) as usize;
    for (i, h) in counts.iter_mut().enumerate() {
        *h += avg_inc + u32::from(i < remainder);
    }
    excess
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::block_plane;
    use ndarray::{s, Array2};
    use proptest::prelude::*;

    #[test]
    fn test_uniform_image() {
        // A uniform plane should stay uniform: every tile sees the same histogram
        let gray = Array2::from_elem((64, 64), 128u8);
        let result = clahe(gray.view(), 4.0, TileGrid::new(8, 8)).unwrap();
        let first = result[[0, 0]];
        assert!(result.iter().all(|&v| v == first));
    }

    #[test]
    fn test_clip_histogram_basic() {
        let mut counts = [0u32; BINS];
        counts[0] = 1000;
        counts[1] = 500;
        let mut hist = Histogram::from_counts(counts);
        let excess = clip_histogram(&mut hist, 100);
        // 900 + 400 removed; 5 per bin plus 20 left for bins 0..20
        assert_eq!(excess, 1300);
        assert_eq!(hist.counts()[0], 106);
        assert_eq!(hist.counts()[19], 6);
        assert_eq!(hist.counts()[20], 5);
        assert_eq!(hist.total(), 1500);
    }

    #[test]
    fn test_clip_under_limit_is_noop() {
        let mut counts = [0u32; BINS];
        counts[10] = 3;
        let mut hist = Histogram::from_counts(counts);
        assert_eq!(clip_histogram(&mut hist, 3), 0);
        assert_eq!(hist.counts()[10], 3);
    }

    #[test]
    fn test_clip_ceiling() {
        // 144-pixel tile at 2.0: 1.125 -> 1
        assert_eq!(clip_ceiling(2.0, 144), 1);
        assert_eq!(clip_ceiling(2.0, 1024), 8);
        assert_eq!(clip_ceiling(0.001, 64), 1);
    }

    #[test]
    fn test_tile_spans_last_absorbs_remainder() {
        assert_eq!(
            tile_spans(100, 8),
            vec![(0, 12), (12, 24), (24, 36), (36, 48), (48, 60), (60, 72), (72, 84), (84, 100)]
        );
        assert_eq!(tile_spans(5, 1), vec![(0, 5)]);
    }

    #[test]
    fn test_axis_weights_edges_collapse() {
        let spans = tile_spans(8, 2); // centers at 2.0 and 6.0
        let weights = axis_weights(&spans, 8);
        assert_eq!(weights[0], (0, 0, 0.0));
        assert_eq!(weights[1], (0, 0, 0.0));
        assert_eq!(weights[2], (0, 1, 0.125));
        assert_eq!(weights[5], (0, 1, 0.875));
        assert_eq!(weights[6], (1, 1, 0.0));
        assert_eq!(weights[7], (1, 1, 0.0));
    }

    #[test]
    fn test_single_tile_equals_global_equalization() {
        let plane = block_plane();
        // clip ceiling equal to the pixel count disables clipping
        let result = clahe(plane.view(), BINS as f64, TileGrid::new(1, 1)).unwrap();
        let expected = Lut::equalization(&Histogram::from_plane(plane.view())).apply(plane.view());
        assert_eq!(result, expected);
    }

    #[test]
    fn test_single_tile_is_clipped_global_equalization() {
        let plane = block_plane();
        let result = clahe(plane.view(), 2.0, TileGrid::new(1, 1)).unwrap();
        let mut hist = Histogram::from_plane(plane.view());
        clip_histogram(&mut hist, clip_ceiling(2.0, 10_000));
        assert_eq!(result, Lut::equalization(&hist).apply(plane.view()));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let plane = Array2::from_elem((16, 16), 1u8);
        assert!(matches!(
            clahe(plane.view(), 0.0, TileGrid::new(2, 2)),
            Err(EnhanceError::InvalidParameter { name: "clip_limit", .. })
        ));
        assert!(matches!(
            clahe(plane.view(), 2.0, TileGrid::new(0, 2)),
            Err(EnhanceError::InvalidParameter { name: "tile_grid", .. })
        ));
        assert!(matches!(
            clahe(plane.view(), 2.0, TileGrid::new(17, 2)),
            Err(EnhanceError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_uneven_grid_keeps_dimensions() {
        let plane = Array2::from_shape_fn((37, 53), |(y, x)| ((y * 7 + x * 3) % 256) as u8);
        let result = clahe(plane.view(), 3.0, TileGrid::new(5, 7)).unwrap();
        assert_eq!(result.dim(), (37, 53));
    }

    /// 8x8 plane split into two 4-row tiles. Column 5 holds 50 in both halves;
    /// the top half is a ramp around it, the bottom half is mostly 200.
    fn two_tile_plane() -> Array2<u8> {
        Array2::from_shape_fn((8, 8), |(y, x)| match (y < 4, x == 5) {
            (true, _) => (x * 10) as u8,
            (false, true) => 50,
            (false, false) => 200,
        })
    }

    #[test]
    fn test_interpolated_value_blends_neighbouring_tiles() {
        let plane = two_tile_plane();
        let result = clahe(plane.view(), 256.0, TileGrid::new(2, 1)).unwrap();

        let top = tile_lut(plane.slice(s![0..4, ..]), 256.0);
        let bottom = tile_lut(plane.slice(s![4..8, ..]), 256.0);
        // cdf(50): 24/32 in the top tile, 4/32 in the bottom one
        assert_eq!((top.get(50), bottom.get(50)), (191, 32));

        // row 3 sits at 3.5, between centers 2.0 and 6.0: weight 0.375 on the bottom tile
        let expected = round_to_u8(top.get(50) as f64 * 0.625 + bottom.get(50) as f64 * 0.375);
        assert_eq!(result[[3, 5]], expected);
        assert_eq!(result[[3, 5]], 131);

        // rows before the first center use the top LUT alone
        assert_eq!(result[[1, 5]], 191);
        assert_eq!(result[[7, 5]], 32);
    }

    #[test]
    fn test_no_step_at_tile_boundary() {
        let plane = two_tile_plane();
        let result = clahe(plane.view(), 256.0, TileGrid::new(2, 1)).unwrap();
        let top = tile_lut(plane.slice(s![0..4, ..]), 256.0);
        let bottom = tile_lut(plane.slice(s![4..8, ..]), 256.0);

        // per-tile application would jump straight from the top LUT to the bottom one
        let naive_jump = (top.get(50) as i32 - bottom.get(50) as i32).abs();
        let column: Vec<i32> = (0..8).map(|y| result[[y, 5]] as i32).collect();
        let boundary_jump = (column[3] - column[4]).abs();
        assert!(boundary_jump < naive_jump);

        // between the centers the output is an even ramp, boundary included
        for y in 2..5 {
            let step = (column[y] - column[y + 1]).abs();
            assert!((step - boundary_jump).abs() <= 1, "column {:?}", column);
        }
        assert!(column.windows(2).all(|w| w[0] >= w[1]));
    }

    proptest! {
        #[test]
        fn prop_clip_conserves_total(
            counts in prop::collection::vec(0u32..5_000, BINS),
            limit in 1u32..400,
        ) {
            let mut table = [0u32; BINS];
            table.copy_from_slice(&counts);
            let mut hist = Histogram::from_counts(table);
            let before = hist.total();
            clip_histogram(&mut hist, limit);
            prop_assert_eq!(hist.total(), before);
        }
    }
}
