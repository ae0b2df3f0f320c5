//! Rectangular pixel-space regions whose sources are ignored (bad columns, bright
//! star halos, amplifier glow...).
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{constants::Pixel, skymotion_errors::SkymotionError};

/// Quoted range inside a zone definition: `"x_min:x_max"`.
static QUOTED_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\s*([^"]*?)\s*""#).expect("valid range regex"));

/// Axis-aligned rectangle in detector pixels, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExclusionZone {
    pub x_min: Pixel,
    pub x_max: Pixel,
    pub y_min: Pixel,
    pub y_max: Pixel,
}

impl ExclusionZone {
    pub fn new(x_min: Pixel, x_max: Pixel, y_min: Pixel, y_max: Pixel) -> Self {
        ExclusionZone {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Whether `(x, y)` falls inside the rectangle, edges included.
    #[inline]
    pub fn contains(&self, x: Pixel, y: Pixel) -> bool {
        !(x < self.x_min || x > self.x_max || y < self.y_min || y > self.y_max)
    }

    /// Parse a list of zones.
    ///
    /// Syntax: zones separated by `;`, each zone made of two quoted `min:max` ranges,
    /// x first then y:
    ///
    /// ```text
    /// "0:50","0:2048";"1000:1010","0:2048"
    /// ```
    ///
    /// An empty (or whitespace-only) string, or the literal `False`, means no zone.
    ///
    /// Return
    /// ----------
    /// * The parsed zones, or [`SkymotionError::InvalidExclusionZone`] naming the
    ///   offending zone text.
    pub fn parse_list(text: &str) -> Result<Vec<ExclusionZone>, SkymotionError> {
        let text = text.trim();
        if text.is_empty() || text == "False" {
            return Ok(Vec::new());
        }

        text.split(';')
            .filter(|zone| !zone.trim().is_empty())
            .map(Self::parse_one)
            .collect()
    }

    fn parse_one(zone: &str) -> Result<ExclusionZone, SkymotionError> {
        let invalid = || SkymotionError::InvalidExclusionZone(zone.trim().to_string());

        let ranges: Vec<(Pixel, Pixel)> = QUOTED_RANGE
            .captures_iter(zone)
            .map(|caps| parse_range(&caps[1]).ok_or_else(invalid))
            .collect::<Result<_, _>>()?;

        match ranges.as_slice() {
            [(x_min, x_max), (y_min, y_max)] if x_min <= x_max && y_min <= y_max => {
                Ok(ExclusionZone::new(*x_min, *x_max, *y_min, *y_max))
            }
            _ => Err(invalid()),
        }
    }
}

/// `"lo:hi"` → `(lo, hi)`.
fn parse_range(range: &str) -> Option<(Pixel, Pixel)> {
    let (lo, hi) = range.split_once(':')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}
