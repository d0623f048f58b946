use std::fmt;
use std::str::FromStr;

use crate::clahe::{validate_clip_limit, TileGrid, DEFAULT_CLIP_LIMIT};
use crate::error::{EnhanceError, Result};
use crate::image::Image;

/// Enhancement operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Global histogram equalization.
    Equalize,
    /// Tile-adaptive contrast-limited equalization.
    Clahe,
    /// Power-law remapping.
    Gamma,
    /// `alpha * v + beta`.
    Contrast,
    /// Match each channel's distribution to a reference image.
    Match,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "equalize" => Some(Self::Equalize),
            "clahe" => Some(Self::Clahe),
            "gamma" => Some(Self::Gamma),
            "contrast" => Some(Self::Contrast),
            "match" => Some(Self::Match),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Equalize => "equalize",
            Self::Clahe => "clahe",
            Self::Gamma => "gamma",
            Self::Contrast => "contrast",
            Self::Match => "match",
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["equalize", "clahe", "gamma", "contrast", "match"]
    }

    /// Whether the operator honors a channel subset. Contrast and match
    /// always transform every channel.
    pub fn supports_channel_subset(&self) -> bool {
        matches!(self, Self::Equalize | Self::Clahe | Self::Gamma)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| {
            EnhanceError::invalid(
                "method",
                format!("unknown method '{}'. Available: {}", s, Self::all_names().join(", ")),
            )
        })
    }
}

/// Selected operator plus its settings. Settings for other operators are
/// carried but ignored.
#[derive(Debug, Clone)]
pub struct EnhancementParams {
    pub method: Method,
    /// CLAHE only: bin ceiling as a multiple of the average bin height in a tile.
    pub clip_limit: f64,
    /// CLAHE only.
    pub tile_grid: TileGrid,
    /// Gamma only.
    pub gamma: f64,
    /// Contrast only.
    pub alpha: f64,
    /// Contrast only.
    pub beta: f64,
    /// Match only.
    pub reference: Option<Image>,
    /// Channels to transform for equalize, clahe and gamma; `None` means all.
    pub channels: Option<Vec<usize>>,
}

impl Default for EnhancementParams {
    fn default() -> Self {
        Self {
            method: Method::Equalize,
            clip_limit: DEFAULT_CLIP_LIMIT,
            tile_grid: TileGrid::default(),
            gamma: 1.0,
            alpha: 1.0,
            beta: 0.0,
            reference: None,
            channels: None,
        }
    }
}

impl EnhancementParams {
    pub fn equalize() -> Self {
        Self::default()
    }

    pub fn clahe(clip_limit: f64, tile_grid: TileGrid) -> Self {
        Self {
            method: Method::Clahe,
            clip_limit,
            tile_grid,
            ..Self::default()
        }
    }

    pub fn gamma(gamma: f64) -> Self {
        Self {
            method: Method::Gamma,
            gamma,
            ..Self::default()
        }
    }

    pub fn contrast(alpha: f64, beta: f64) -> Self {
        Self {
            method: Method::Contrast,
            alpha,
            beta,
            ..Self::default()
        }
    }

    pub fn matching(reference: Image) -> Self {
        Self {
            method: Method::Match,
            reference: Some(reference),
            ..Self::default()
        }
    }

    /// Return a copy targeting only the given channels.
    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Return a copy with a reference image attached.
    pub fn with_reference(mut self, reference: Image) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Check every constraint that applies to `image` under the selected method.
    pub fn validate(&self, image: &Image) -> Result<()> {
        match self.method {
            Method::Equalize | Method::Contrast => {}
            Method::Clahe => {
                validate_clip_limit(self.clip_limit)?;
                self.tile_grid.validate()?;
                self.tile_grid.check_fits(image.height(), image.width())?;
            }
            Method::Gamma => {
                if !self.gamma.is_finite() || self.gamma <= 0.0 {
                    return Err(EnhanceError::invalid(
                        "gamma",
                        format!("must be a finite value > 0, got {}", self.gamma),
                    ));
                }
            }
            Method::Match => {
                let reference = self.reference.as_ref().ok_or(EnhanceError::MissingReference)?;
                if reference.channels() != image.channels() {
                    return Err(EnhanceError::ChannelMismatch {
                        image: image.channels(),
                        reference: reference.channels(),
                    });
                }
            }
        }

        if let (Some(channels), true) = (&self.channels, self.method.supports_channel_subset()) {
            let mut seen = [false; 3];
            for &c in channels {
                if c >= image.channels() {
                    return Err(EnhanceError::invalid(
                        "channels",
                        format!("index {} out of range for {} channel(s)", c, image.channels()),
                    ));
                }
                if seen[c] {
                    return Err(EnhanceError::invalid("channels", format!("index {} repeated", c)));
                }
                seen[c] = true;
            }
        }
        Ok(())
    }

    /// Per-channel flag: transform (`true`) or pass through.
    pub(crate) fn channel_mask(&self, channels: usize) -> Vec<bool> {
        match (&self.channels, self.method.supports_channel_subset()) {
            (Some(selected), true) => (0..channels).map(|c| selected.contains(&c)).collect(),
            _ => vec![true; channels],
        }
    }
}
