//! # Segment detection
//!
//! Search image triplets for three candidates aligned along a straight line and
//! consistent with a constant angular rate.
//!
//! ## Algorithm
//! -----------------
//! For a triplet of images `(i, j, k)` with `i < j < k`:
//!
//! 1. `dt_ij` is the elapsed time between the exposure midpoints of `i` and `j`, and
//!    the search radius is `dt_ij × max_angular_velocity / binning_i`.
//! 2. Every pair `(p, q)` of candidates of `i` and `j` closer than the search radius is
//!    extrapolated: `r` in `k` is accepted when its distance to `q` matches
//!    `dt_jk × d_ij / dt_ij` within `tolerance`.
//! 3. The three points are reordered longest edge first. The triplet is kept as a
//!    [`Segment`] when that edge is longer than `2 × min_travel` and the third point
//!    is closer than `max_height` to it.
//!
//! A triplet whose `dt_ij` is not strictly positive yields no segment.
//!
//! Every length and tolerance is converted to radians with the plate scale, see
//! [`DetectionParams`].
use std::collections::BTreeMap;

use itertools::{iproduct, Itertools};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    constants::ImageIndex,
    detection::DetectionParams,
    geometry::{angular_distance, is_within, longest_edge_order, point_line_distance},
    skymotion_errors::SkymotionError,
    sources::{Detection, ImageCandidates},
};

/// Three image indices `(i, j, k)` with `i < j < k`.
pub type ImageTriplet = (ImageIndex, ImageIndex, ImageIndex);

/// Three detections, one per image of a triplet, stored in `(i, j, k)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub points: [Detection; 3],
}

impl Segment {
    pub fn new(p: Detection, q: Detection, r: Detection) -> Self {
        Segment { points: [p, q, r] }
    }

    pub fn points(&self) -> &[Detection; 3] {
        &self.points
    }

    pub fn image_indices(&self) -> ImageTriplet {
        (
            self.points[0].image_index,
            self.points[1].image_index,
            self.points[2].image_index,
        )
    }
}

/// Every ordered 3-combination of the images holding candidates.
///
/// The keys of the map are already sorted, so each triplet satisfies `i < j < k` and the
/// list is in lexicographic order.
pub fn image_triplets(candidates: &BTreeMap<ImageIndex, ImageCandidates>) -> Vec<ImageTriplet> {
    candidates
        .keys()
        .copied()
        .tuple_combinations::<(_, _, _)>()
        .collect()
}

/// Segments found in a single image triplet.
///
/// Arguments
/// -----------------
/// * `ci`, `cj`, `ck` – candidates of images `i`, `j`, `k`, in time order.
/// * `params` – search bounds.
///
/// Return
/// ----------
/// * The accepted segments, points in `(i, j, k)` order. Empty when `dt_ij` is zero,
///   negative or not finite.
pub fn segments_in_triplet(
    ci: &ImageCandidates,
    cj: &ImageCandidates,
    ck: &ImageCandidates,
    params: &DetectionParams,
) -> Vec<Segment> {
    let dt_ij = ci.epoch.elapsed_to(&cj.epoch);
    if !(dt_ij.is_finite() && dt_ij > 0.0) {
        debug!(
            "skipping triplet ({}, {}, {}): dt_ij = {dt_ij}",
            ci.image_index, cj.image_index, ck.image_index
        );
        return Vec::new();
    }
    let dt_jk = cj.epoch.elapsed_to(&ck.epoch);

    let max_dist = dt_ij * params.max_angular_velocity_rad() / ci.epoch.binning;
    let tolerance = params.tolerance_rad();
    let min_length = params.min_segment_length();
    let max_height = params.max_height_rad();

    let mut segments = Vec::new();
    for (p, q) in iproduct!(&ci.candidates, &cj.candidates) {
        let (sp, sq) = (p.sky(), q.sky());
        if !is_within(&sp, &sq, max_dist) {
            continue;
        }
        let d_ij = angular_distance(&sp, &sq);
        let expected_jk = dt_jk * d_ij / dt_ij;

        for r in &ck.candidates {
            let sr = r.sky();
            let d_jk = angular_distance(&sq, &sr);
            if (d_jk - expected_jk).abs() > tolerance {
                continue;
            }

            let (a, b, c) = longest_edge_order(&sp, &sq, &sr);
            let length = angular_distance(a, b);
            let height = point_line_distance(a, b, c);
            if length > min_length && height < max_height {
                segments.push(Segment::new(*p, *q, *r));
            }
        }
    }
    segments
}

/// Segments found over a list of image triplets, in triplet order.
///
/// Return
/// ----------
/// * [`SkymotionError::UnknownImage`] if a triplet references an image absent from
///   `candidates`.
pub fn detect_segments(
    triplets: &[ImageTriplet],
    candidates: &BTreeMap<ImageIndex, ImageCandidates>,
    params: &DetectionParams,
) -> Result<Vec<Segment>, SkymotionError> {
    detect_segments_with(triplets, candidates, params, || {})
}

/// Same as [`detect_segments`], calling `on_triplet` after each processed triplet.
pub fn detect_segments_with<F>(
    triplets: &[ImageTriplet],
    candidates: &BTreeMap<ImageIndex, ImageCandidates>,
    params: &DetectionParams,
    on_triplet: F,
) -> Result<Vec<Segment>, SkymotionError>
where
    F: Fn(),
{
    let lookup = |idx: ImageIndex| {
        candidates
            .get(&idx)
            .ok_or(SkymotionError::UnknownImage(idx))
    };

    let mut segments = Vec::new();
    for &(i, j, k) in triplets {
        let (ci, cj, ck) = (lookup(i)?, lookup(j)?, lookup(k)?);
        segments.extend(segments_in_triplet(ci, cj, ck, params));
        on_triplet();
    }
    Ok(segments)
}
