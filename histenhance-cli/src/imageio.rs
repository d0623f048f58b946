//! Decoding files into [`Image`] and encoding results back.
//!
//! Loading honors the EXIF orientation tag. Values 2-8 describe how the
//! sensor rows map onto the displayed image: 2-4 are mirrors or a half turn,
//! 6 and 8 are quarter turns, 5 and 7 swap the axes across a diagonal.

use anyhow::{Context, Result};
use exif::{In, Tag};
use histenhance_core::Image;
use image::{DynamicImage, GrayImage, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Orientation tag of the primary image, only when it calls for a transform (2-8).
/// Files without EXIF data, or with an unreadable tag, are taken as upright.
fn exif_orientation(path: &Path) -> Option<u32> {
    let mut reader = BufReader::new(File::open(path).ok()?);
    let meta = exif::Reader::new().read_from_container(&mut reader).ok()?;
    meta.get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
        .filter(|o| (2..=8).contains(o))
}

/// Undo the camera transform recorded as `orientation` so rows run top to bottom.
fn upright(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate270().flipv(),
        6 => img.rotate90(),
        7 => img.rotate90().flipv(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Gray sources stay single-channel; everything else becomes RGB, alpha dropped.
pub fn to_core_image(img: &DynamicImage) -> Result<Image> {
    let core = match img {
        DynamicImage::ImageLuma8(gray) => {
            Image::from_raw(gray.width(), gray.height(), 1, gray.as_raw().clone())?
        }
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => {
            let gray = img.to_luma8();
            Image::from_raw(gray.width(), gray.height(), 1, gray.into_raw())?
        }
        _ => {
            let rgb = img.to_rgb8();
            Image::from_raw(rgb.width(), rgb.height(), 3, rgb.into_raw())?
        }
    };
    Ok(core)
}

pub fn from_core_image(img: &Image) -> Result<DynamicImage> {
    let (width, height) = (img.width() as u32, img.height() as u32);
    let raw = img.to_raw();
    let out = match img.channels() {
        1 => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
    };
    out.context("Failed to create output image")
}

/// Decode `path`, correct its EXIF orientation and convert it.
pub fn load_image(path: &Path) -> Result<Image> {
    let img = image::open(path).with_context(|| {
        format!(
            "Could not read image (unsupported format or corrupt file): {}",
            path.display()
        )
    })?;
    let img = match exif_orientation(path) {
        Some(orientation) => {
            log::debug!("{}: EXIF orientation {}, rotating upright", path.display(), orientation);
            upright(img, orientation)
        }
        None => img,
    };
    to_core_image(&img).with_context(|| format!("{}: unusable pixel data", path.display()))
}

/// Encode `img` to `path`, creating parent directories. Format follows the extension.
pub fn save_image(img: &Image, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    from_core_image(img)?
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
