//! Shared test images.

use ndarray::{s, Array2};

use crate::image::Image;

/// 100x100 plane, zero everywhere except a centered 50x50 block of 128.
pub(crate) fn block_plane() -> Array2<u8> {
    let mut plane = Array2::<u8>::zeros((100, 100));
    plane.slice_mut(s![25..75, 25..75]).fill(128);
    plane
}

/// Three-channel version of [`block_plane`].
pub(crate) fn block_image() -> Image {
    let plane = block_plane();
    Image::from_planes(vec![plane.clone(), plane.clone(), plane]).unwrap()
}

/// Single-channel horizontal ramp, `width` wide.
pub(crate) fn ramp_gray(width: usize, height: usize) -> Image {
    let plane = Array2::from_shape_fn((height, width), |(_, x)| (x * 255 / (width - 1)) as u8);
    Image::from_gray(plane).unwrap()
}
