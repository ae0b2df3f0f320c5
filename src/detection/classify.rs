//! # Track classification
//!
//! Measure the apparent speed of each merged track and split the tracks into
//! confident movers and uncertain ones.
//!
//! ## Speed
//! -----------------
//! Only the first and last points of a track (by image index) are used:
//!
//! ```text
//! length  = angular_distance(first, last)                    [rad]
//! elapsed = (t_last + exp_last / 2) - (t_first + exp_first / 2)   [s]
//! speed   = 60 × length / elapsed                            [rad/min]
//! ```
//!
//! The speed is `0` when `elapsed` is zero or not finite, or when an epoch is missing.
//!
//! ## Output
//! -----------------
//! [`Classification`] holds both lists. Object identifiers are the 1-based positions in
//! the merged track list, so they stay stable across the two lists. For the reporting
//! collaborator, [`write_report`] flattens every classified track into one CSV row per
//! point.
use std::{collections::BTreeMap, fs::File, io::Write};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{ArcSec, ImageIndex, Radian, RADSEC, SECONDS_PER_MINUTE},
    detection::merge::Track,
    geometry::angular_distance,
    skymotion_errors::SkymotionError,
    time::ImageEpoch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackClass {
    /// Speed at or above the configured minimum.
    Moving,
    Uncertain,
}

/// A track with its measured speed and class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTrack {
    /// 1-based position of the track in the merged list.
    pub object_id: usize,
    pub track: Track,
    /// Radians per minute.
    pub angular_speed: Radian,
    pub class: TrackClass,
}

impl ClassifiedTrack {
    /// Speed in arcseconds per minute.
    pub fn speed_arcsec_per_min(&self) -> ArcSec {
        self.angular_speed / RADSEC
    }

    /// One row per point of the track, in image order.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let speed = self.speed_arcsec_per_min();
        self.track
            .points()
            .iter()
            .map(|p| {
                let s = &p.source;
                ReportRow {
                    object_id: self.object_id,
                    image_index: p.image_index,
                    class: self.class,
                    flag: s.flag,
                    x: s.x,
                    y: s.y,
                    ra: s.ra,
                    dec: s.dec,
                    flux: s.flux,
                    flux_err: s.flux_err,
                    background: s.background,
                    mag: s.mag,
                    mag_err: s.mag_err,
                    fwhm: s.fwhm,
                    elongation: s.elongation,
                    speed_arcsec_per_min: speed,
                }
            })
            .collect()
    }
}

/// Flat per-point row of the detection report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub object_id: usize,
    pub image_index: ImageIndex,
    pub class: TrackClass,
    pub flag: i64,
    pub x: f64,
    pub y: f64,
    pub ra: f64,
    pub dec: f64,
    pub flux: f64,
    pub flux_err: f64,
    pub background: f64,
    pub mag: f64,
    pub mag_err: f64,
    pub fwhm: f64,
    pub elongation: f64,
    pub speed_arcsec_per_min: f64,
}

/// Tracks split by class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub moving: Vec<ClassifiedTrack>,
    pub uncertain: Vec<ClassifiedTrack>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.moving.len() + self.uncertain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moving.is_empty() && self.uncertain.is_empty()
    }

    /// Every classified track, by increasing object id.
    pub fn tracks(&self) -> Vec<&ClassifiedTrack> {
        let mut all: Vec<&ClassifiedTrack> =
            self.moving.iter().chain(&self.uncertain).collect();
        all.sort_by_key(|t| t.object_id);
        all
    }

    /// Report rows of every track, by object id then image index.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        self.tracks()
            .into_iter()
            .flat_map(ClassifiedTrack::report_rows)
            .collect()
    }
}

/// Angular speed of `track`, radians per minute, between its lowest and highest
/// image index.
///
/// Return
/// ----------
/// * `60 × length / elapsed`, or `0` when the track has fewer than two points, an
///   epoch is missing, or the elapsed time is zero or not finite.
pub fn track_speed(track: &Track, epochs: &BTreeMap<ImageIndex, ImageEpoch>) -> Radian {
    let points = track.points();
    let (Some(first), Some(last)) = (
        points.iter().min_by_key(|p| p.image_index),
        points.iter().max_by_key(|p| p.image_index),
    ) else {
        return 0.0;
    };
    let (Some(e_first), Some(e_last)) = (
        epochs.get(&first.image_index),
        epochs.get(&last.image_index),
    ) else {
        return 0.0;
    };

    let elapsed = e_first.elapsed_to(e_last);
    if elapsed == 0.0 || !elapsed.is_finite() {
        return 0.0;
    }
    SECONDS_PER_MINUTE * angular_distance(&first.sky(), &last.sky()) / elapsed
}

/// Classify merged tracks.
///
/// Arguments
/// -----------------
/// * `tracks` – merged tracks; a track's object id is its 1-based position here.
/// * `epochs` – timing metadata of every image, keyed by image index.
/// * `min_speed` – threshold in arcseconds per minute.
///
/// Return
/// ----------
/// * A [`Classification`]: tracks with `speed >= min_speed` are [`TrackClass::Moving`],
///   the rest [`TrackClass::Uncertain`]. Both lists keep the track order.
pub fn classify_tracks(
    tracks: Vec<Track>,
    epochs: &BTreeMap<ImageIndex, ImageEpoch>,
    min_speed: ArcSec,
) -> Classification {
    let threshold = min_speed * RADSEC;
    let mut out = Classification::default();

    for (i, track) in tracks.into_iter().enumerate() {
        let angular_speed = track_speed(&track, epochs);
        let class = if angular_speed >= threshold {
            TrackClass::Moving
        } else {
            TrackClass::Uncertain
        };
        let classified = ClassifiedTrack {
            object_id: i + 1,
            track,
            angular_speed,
            class,
        };
        match class {
            TrackClass::Moving => out.moving.push(classified),
            TrackClass::Uncertain => out.uncertain.push(classified),
        }
    }
    out
}

/// Write the report rows of `classification` as CSV with a header row.
pub fn write_report<W: Write>(
    writer: W,
    classification: &Classification,
) -> Result<(), SkymotionError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in classification.report_rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_csv(
    path: &Utf8Path,
    classification: &Classification,
) -> Result<(), SkymotionError> {
    write_report(File::create(path)?, classification)
}
