/// Enhancement dispatch:
/// validate params -> build shared LUT (gamma / contrast) -> per-channel operator -> reassemble

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::clahe::{clahe, TileGrid};
use crate::error::{EnhanceError, Result};
use crate::histogram::Histogram;
use crate::image::Image;
use crate::lut::Lut;
use crate::matching::match_plane;
use crate::params::{EnhancementParams, Method};

/// Per-channel operator resolved from [`EnhancementParams`].
enum ChannelOp<'a> {
    Equalize,
    Clahe { clip_limit: f64, grid: TileGrid },
    /// Data-independent remapping shared by all channels (gamma, contrast).
    Table(Lut),
    Match(&'a Image),
}

impl<'a> ChannelOp<'a> {
    /// Expects `params` to have passed validation.
    fn resolve(params: &'a EnhancementParams) -> Result<Self> {
        Ok(match params.method {
            Method::Equalize => ChannelOp::Equalize,
            Method::Clahe => ChannelOp::Clahe {
                clip_limit: params.clip_limit,
                grid: params.tile_grid,
            },
            Method::Gamma => ChannelOp::Table(Lut::gamma(params.gamma)?),
            Method::Contrast => ChannelOp::Table(Lut::linear(params.alpha, params.beta)),
            Method::Match => match params.reference.as_ref() {
                Some(reference) => ChannelOp::Match(reference),
                None => return Err(EnhanceError::MissingReference),
            },
        })
    }

    fn apply(&self, plane: ArrayView2<'_, u8>, channel: usize) -> Result<Array2<u8>> {
        match self {
            ChannelOp::Equalize => {
                Ok(Lut::equalization(&Histogram::from_plane(plane)).apply(plane))
            }
            ChannelOp::Clahe { clip_limit, grid } => clahe(plane, *clip_limit, *grid),
            ChannelOp::Table(lut) => Ok(lut.apply(plane)),
            ChannelOp::Match(reference) => Ok(match_plane(plane, reference.channel(channel))),
        }
    }
}

/// Apply the selected operator to every (selected) channel of `image`.
///
/// Channels are processed independently and in parallel; unselected channels
/// are copied through. All validation happens before any output is produced.
pub fn enhance(image: &Image, params: &EnhancementParams) -> Result<Image> {
    params.validate(image)?;
    let op = ChannelOp::resolve(params)?;
    let mask = params.channel_mask(image.channels());

    if params.channels.is_some() && !params.method.supports_channel_subset() {
        debug!("{}: channel selection ignored, all channels are processed", params.method);
    }
    info!(
        "{} on {}x{}x{}: {}",
        params.method,
        image.width(),
        image.height(),
        image.channels(),
        describe(params)
    );

    let planes = (0..image.channels())
        .into_par_iter()
        .map(|c| {
            let plane = image.channel(c);
            if !mask[c] {
                debug!("channel {}: passed through", c);
                return Ok(plane.to_owned());
            }
            debug!("channel {}: {}", c, params.method);
            op.apply(plane, c)
        })
        .collect::<Result<Vec<_>>>()?;

    Image::from_planes(planes)
}

/// Settings relevant to the selected method, for log lines.
fn describe(params: &EnhancementParams) -> String {
    let channels = match &params.channels {
        Some(c) => format!("{:?}", c),
        None => "all".to_string(),
    };
    match params.method {
        Method::Equalize => format!("channels={}", channels),
        Method::Clahe => format!(
            "clip_limit={}, tile_grid={}x{}, channels={}",
            params.clip_limit, params.tile_grid.rows, params.tile_grid.cols, channels
        ),
        Method::Gamma => format!("gamma={}, channels={}", params.gamma, channels),
        Method::Contrast => format!("alpha={}, beta={}", params.alpha, params.beta),
        Method::Match => "reference supplied".to_string(),
    }
}
