//! Pixel rectangles and quantity crop selection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::config::RegionConfig;

/// Axis-aligned rectangle in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// True when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Intersect with a `width` x `height` page anchored at the origin.
    ///
    /// A rectangle that starts past an edge collapses to zero size at that edge.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

/// How a crop region was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// Offset below a recognized "BOX QTY" token.
    Anchor,
    /// Fixed fraction of the page.
    Fallback,
}

impl RegionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionSource::Anchor => "anchor",
            RegionSource::Fallback => "fallback",
        }
    }
}

/// The rectangle that is cropped and read as the quantity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub rect: Rect,
    pub source: RegionSource,
}

/// Compute the quantity crop for a page of `page_width` x `page_height`.
///
/// With an anchor the crop is a band `band_height` tall starting
/// `anchor_gap` pixels under the anchor and `anchor_extra_width` wider than
/// it. Without one, the configured fractional window is used. The result is
/// always clamped to the page.
pub fn select_region(
    anchor: Option<&Rect>,
    page_width: u32,
    page_height: u32,
    config: &RegionConfig,
) -> CropRegion {
    let (rect, source) = match anchor {
        Some(anchor) => {
            let rect = Rect::new(
                anchor.x,
                anchor.bottom().saturating_add(config.anchor_gap),
                anchor.width.saturating_add(config.anchor_extra_width),
                config.band_height,
            );
            (rect, RegionSource::Anchor)
        }
        None => {
            let left = fraction_of(config.fallback_left, page_width);
            let right = fraction_of(config.fallback_right, page_width);
            let top = fraction_of(config.fallback_top, page_height);
            let bottom = fraction_of(config.fallback_bottom, page_height);
            let rect = Rect::new(
                left,
                top,
                right.saturating_sub(left),
                bottom.saturating_sub(top),
            );
            (rect, RegionSource::Fallback)
        }
    };

    let rect = rect.clamp_to(page_width, page_height);
    debug!(
        "Quantity region ({}): x={} y={} w={} h={}",
        source.as_str(),
        rect.x,
        rect.y,
        rect.width,
        rect.height
    );

    CropRegion { rect, source }
}

fn fraction_of(fraction: f32, extent: u32) -> u32 {
    let value = (f64::from(fraction) * f64::from(extent)).floor();
    value.clamp(0.0, f64::from(extent)) as u32
}
