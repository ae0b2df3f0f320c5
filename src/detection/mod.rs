//! # Moving-object detection parameters
//!
//! This module defines the [`DetectionParams`] configuration struct and its builder,
//! which control every stage of the moving-object search, and hosts the stage modules.
//!
//! ## Pipeline overview
//!
//! 1. **Candidate filtering** ([`crate::candidates`])
//!    Quality cuts (`min_fwhm`, `fwhm_coefficient`, `max_flux`, `max_flag_sum`,
//!    `max_elongation`, `min_snr`), `exclusion_zones`, and a transience test of radius
//!    `min_travel × pixel_scale` against the master catalog.
//!
//! 2. **Segment detection** ([`segments`])
//!    All 3-image combinations are searched for point triplets moving along a straight
//!    line at a constant rate, bounded by `max_angular_velocity`, with `tolerance`
//!    on the extrapolated third position, `max_height` on collinearity and
//!    `2 × min_travel` on the segment length.
//!
//! 3. **Segment merging** ([`merge`])
//!    Segments sharing points are merged into tracks following `merge_strategy` and
//!    `point_identity`.
//!
//! 4. **Classification** ([`classify`])
//!    Tracks faster than `min_speed` are *moving*, the others *uncertain*.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skymotion::detection::DetectionParams;
//!
//! let params = DetectionParams::builder()
//!     .pixel_scale(0.62)
//!     .min_travel(1.5)
//!     .max_height(1.0)
//!     .max_angular_velocity(0.05)
//!     .tolerance(2.0)
//!     .min_speed(0.5)
//!     .workers(4)
//!     .build()
//!     .unwrap();
//! println!("{params:#}");
//! ```
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::Deserialize;

use crate::{
    candidates::exclusion::ExclusionZone,
    constants::{ArcSec, Pixel, Radian, RADSEC},
    detection::merge::{MergeStrategy, PointIdentity},
    skymotion_errors::SkymotionError,
};

pub mod classify;
pub mod merge;
pub mod segment_batch;
pub mod segments;

/// Configuration of the moving-object search.
///
/// Fields
/// -----------------
/// **Candidate filtering**
/// * `min_fwhm` – minimum FWHM (pixels) of a usable source.
/// * `fwhm_coefficient` – the maximum FWHM is `mean(master FWHM) × fwhm_coefficient`.
/// * `max_flux` – maximum flux (saturation guard).
/// * `max_flag_sum` – maximum value of the extractor flag sum.
/// * `max_elongation` – maximum elongation (a/b).
/// * `min_snr` – minimum `flux / flux_err` (strict).
/// * `exclusion_zones` – pixel rectangles whose sources are dropped.
///
/// **Motion search**
/// * `min_travel` – minimum travel (pixels) between two images. Also the radius of the
///   transience test, and half the minimum segment length.
/// * `max_height` – maximum distance (pixels) of the third point to the line through
///   the two others.
/// * `pixel_scale` – plate scale, arcseconds per pixel.
/// * `max_angular_velocity` – fastest motion searched for, arcseconds per second.
/// * `tolerance` – tolerance (pixels) on the extrapolated third position.
///
/// **Merging / classification**
/// * `min_speed` – minimum speed (arcseconds per minute) of a confident mover.
/// * `merge_strategy` – how overlapping segments are merged (default: greedy).
/// * `point_identity` – when two detections are the same point (default: exact coordinates).
///
/// **Execution**
/// * `workers` – size of the worker pool; `None` uses the available parallelism.
///
/// Defaults
/// -----------------
/// * `min_fwhm`: 1.0 px, `fwhm_coefficient`: 2.0, `max_flux`: 1.0e6
/// * `max_flag_sum`: 4, `max_elongation`: 1.8, `min_snr`: 5.0
/// * `min_travel`: 1.5 px, `max_height`: 1.0 px, `pixel_scale`: 1.0 "/px
/// * `max_angular_velocity`: 0.1 "/s, `tolerance`: 2.0 px, `min_speed`: 1.0 "/min
/// * no exclusion zone, greedy merge, exact identity, `workers`: `None`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    // --- Candidate filtering ---
    pub min_fwhm: Pixel,
    pub fwhm_coefficient: f64,
    pub max_flux: f64,
    pub max_flag_sum: i64,
    pub max_elongation: f64,
    pub min_snr: f64,
    pub exclusion_zones: Vec<ExclusionZone>,

    // --- Motion search ---
    pub min_travel: Pixel,
    pub max_height: Pixel,
    /// Arcseconds per pixel.
    pub pixel_scale: ArcSec,
    /// Arcseconds per second.
    pub max_angular_velocity: ArcSec,
    pub tolerance: Pixel,

    // --- Merging / classification ---
    /// Arcseconds per minute.
    pub min_speed: ArcSec,
    pub merge_strategy: MergeStrategy,
    pub point_identity: PointIdentity,

    // --- Execution ---
    pub workers: Option<usize>,
}

impl DetectionParams {
    /// Equivalent to [`DetectionParams::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`DetectionParamsBuilder`] initialized with the defaults.
    pub fn builder() -> DetectionParamsBuilder {
        DetectionParamsBuilder::new()
    }

    /// Load parameters from JSON; missing keys keep their default. The result is
    /// validated like [`DetectionParamsBuilder::build`].
    pub fn from_json_str(json: &str) -> Result<Self, SkymotionError> {
        let params: DetectionParams = serde_json::from_str(json)?;
        DetectionParamsBuilder { params }.build()
    }

    /// Radius of the transience test, `min_travel × pixel_scale`, in radians.
    pub fn travel_radius(&self) -> Radian {
        self.min_travel * self.pixel_scale * RADSEC
    }

    /// Minimum length of an accepted segment, twice [`Self::travel_radius`].
    pub fn min_segment_length(&self) -> Radian {
        2.0 * self.travel_radius()
    }

    /// Collinearity bound, `max_height × pixel_scale`, in radians.
    pub fn max_height_rad(&self) -> Radian {
        self.max_height * self.pixel_scale * RADSEC
    }

    /// Third-point tolerance, `tolerance × pixel_scale`, in radians.
    pub fn tolerance_rad(&self) -> Radian {
        self.tolerance * self.pixel_scale * RADSEC
    }

    /// Maximum angular velocity in radians per second.
    pub fn max_angular_velocity_rad(&self) -> Radian {
        self.max_angular_velocity * RADSEC
    }

    /// Classification threshold in radians per minute.
    pub fn min_speed_rad_per_min(&self) -> Radian {
        self.min_speed * RADSEC
    }

    /// Effective worker count: `workers`, or the available parallelism (at least 1).
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl Default for DetectionParams {
    fn default() -> Self {
        DetectionParams {
            min_fwhm: 1.0,
            fwhm_coefficient: 2.0,
            max_flux: 1.0e6,
            max_flag_sum: 4,
            max_elongation: 1.8,
            min_snr: 5.0,
            exclusion_zones: Vec::new(),

            min_travel: 1.5,
            max_height: 1.0,
            pixel_scale: 1.0,
            max_angular_velocity: 0.1,
            tolerance: 2.0,

            min_speed: 1.0,
            merge_strategy: MergeStrategy::default(),
            point_identity: PointIdentity::default(),

            workers: None,
        }
    }
}

/// Builder for [`DetectionParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct DetectionParamsBuilder {
    params: DetectionParams,
}

impl DetectionParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: DetectionParams::default(),
        }
    }

    // --- Candidate filtering ---
    pub fn min_fwhm(mut self, v: Pixel) -> Self {
        self.params.min_fwhm = v;
        self
    }
    pub fn fwhm_coefficient(mut self, v: f64) -> Self {
        self.params.fwhm_coefficient = v;
        self
    }
    pub fn max_flux(mut self, v: f64) -> Self {
        self.params.max_flux = v;
        self
    }
    pub fn max_flag_sum(mut self, v: i64) -> Self {
        self.params.max_flag_sum = v;
        self
    }
    pub fn max_elongation(mut self, v: f64) -> Self {
        self.params.max_elongation = v;
        self
    }
    pub fn min_snr(mut self, v: f64) -> Self {
        self.params.min_snr = v;
        self
    }
    pub fn exclusion_zones(mut self, v: Vec<ExclusionZone>) -> Self {
        self.params.exclusion_zones = v;
        self
    }

    // --- Motion search ---
    pub fn min_travel(mut self, v: Pixel) -> Self {
        self.params.min_travel = v;
        self
    }
    pub fn max_height(mut self, v: Pixel) -> Self {
        self.params.max_height = v;
        self
    }
    pub fn pixel_scale(mut self, v: ArcSec) -> Self {
        self.params.pixel_scale = v;
        self
    }
    pub fn max_angular_velocity(mut self, v: ArcSec) -> Self {
        self.params.max_angular_velocity = v;
        self
    }
    pub fn tolerance(mut self, v: Pixel) -> Self {
        self.params.tolerance = v;
        self
    }

    // --- Merging / classification ---
    pub fn min_speed(mut self, v: ArcSec) -> Self {
        self.params.min_speed = v;
        self
    }
    pub fn merge_strategy(mut self, v: MergeStrategy) -> Self {
        self.params.merge_strategy = v;
        self
    }
    pub fn point_identity(mut self, v: PointIdentity) -> Self {
        self.params.point_identity = v;
        self
    }

    // --- Execution ---
    pub fn workers(mut self, v: usize) -> Self {
        self.params.workers = Some(v);
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder and produce a [`DetectionParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * `pixel_scale > 0`, `fwhm_coefficient > 0`, `max_angular_velocity > 0`.
    /// * `min_fwhm`, `max_flux`, `max_elongation`, `min_snr`, `min_travel`, `max_height`,
    ///   `tolerance`, `min_speed` are non-negative (and not NaN).
    /// * `max_flag_sum >= 0`.
    /// * every exclusion zone has `x_min <= x_max` and `y_min <= y_max`.
    /// * a tolerance-based point identity has a non-negative radius.
    /// * `workers`, when set, is at least 1.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(DetectionParams)` when every rule holds.
    /// * `Err(SkymotionError::InvalidParameter)` naming the first violated rule.
    pub fn build(self) -> Result<DetectionParams, SkymotionError> {
        let p = &self.params;
        let invalid = |msg: &str| Err(SkymotionError::InvalidParameter(msg.into()));

        // --- Strictly positive checks (> 0) ---
        if !Self::gt0(p.pixel_scale) {
            return invalid("pixel_scale must be > 0");
        }
        if !Self::gt0(p.fwhm_coefficient) {
            return invalid("fwhm_coefficient must be > 0");
        }
        if !Self::gt0(p.max_angular_velocity) {
            return invalid("max_angular_velocity must be > 0");
        }

        // --- Non-negativity checks (accept zero) ---
        if !Self::ge0(p.min_fwhm) || !Self::ge0(p.max_flux) {
            return invalid("min_fwhm and max_flux must be non-negative");
        }
        if !Self::ge0(p.max_elongation) || !Self::ge0(p.min_snr) {
            return invalid("max_elongation and min_snr must be non-negative");
        }
        if !Self::ge0(p.min_travel) || !Self::ge0(p.max_height) || !Self::ge0(p.tolerance) {
            return invalid("min_travel, max_height and tolerance must be non-negative");
        }
        if !Self::ge0(p.min_speed) {
            return invalid("min_speed must be non-negative");
        }
        if p.max_flag_sum < 0 {
            return invalid("max_flag_sum must be >= 0");
        }

        if p
            .exclusion_zones
            .iter()
            .any(|z| !(z.x_min <= z.x_max && z.y_min <= z.y_max))
        {
            return invalid("exclusion zones require x_min <= x_max and y_min <= y_max");
        }
        if let PointIdentity::Tolerance(radius) = p.point_identity {
            if !Self::ge0(radius) {
                return invalid("point identity tolerance must be non-negative");
            }
        }
        if p.workers == Some(0) {
            return invalid("workers must be >= 1");
        }

        Ok(self.params)
    }
}

impl fmt::Display for DetectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Moving Object Detection Parameters")?;
            writeln!(f, "----------------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Candidate filtering]")?;
            line!("min_fwhm             = {:.2} px", self.min_fwhm, "Minimum FWHM")?;
            line!(
                "fwhm_coefficient     = {:.2}",
                self.fwhm_coefficient,
                "Max FWHM = mean(master) x coefficient"
            )?;
            line!("max_flux             = {:.1}", self.max_flux, "Saturation guard")?;
            line!("max_flag_sum         = {}", self.max_flag_sum, "Extractor flags")?;
            line!("max_elongation       = {:.2}", self.max_elongation, "a/b")?;
            line!("min_snr              = {:.1}", self.min_snr, "flux / flux_err")?;
            line!(
                "exclusion_zones      = {}",
                self.exclusion_zones.len(),
                "Rejected pixel rectangles"
            )?;

            writeln!(f, "\n[Motion search]")?;
            line!(
                "min_travel           = {:.2} px",
                self.min_travel,
                "Transience radius, half segment length"
            )?;
            line!("max_height           = {:.2} px", self.max_height, "Collinearity")?;
            line!("pixel_scale          = {:.3} \"/px", self.pixel_scale, "Plate scale")?;
            line!(
                "max_angular_velocity = {:.4} \"/s",
                self.max_angular_velocity,
                "Fastest searched motion"
            )?;
            line!("tolerance            = {:.2} px", self.tolerance, "Third-point tolerance")?;

            writeln!(f, "\n[Merging / classification]")?;
            line!("min_speed            = {:.2} \"/min", self.min_speed, "Moving threshold")?;
            line!("merge_strategy       = {:?}", self.merge_strategy, "Segment merging")?;
            line!("point_identity       = {:?}", self.point_identity, "Same-point test")?;

            writeln!(f, "\n[Execution]")?;
            line!("workers              = {}", self.worker_count(), "Worker pool size")?;

            Ok(())
        } else {
            write!(
                f,
                "DetectionParams(pixel_scale={:.3}\"/px, min_travel={:.2}px, max_height={:.2}px, v_max={:.4}\"/s, tolerance={:.2}px, min_speed={:.2}\"/min, zones={}, merge={:?})",
                self.pixel_scale,
                self.min_travel,
                self.max_height,
                self.max_angular_velocity,
                self.tolerance,
                self.min_speed,
                self.exclusion_zones.len(),
                self.merge_strategy,
            )
        }
    }
}
