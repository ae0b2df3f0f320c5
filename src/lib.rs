//! # skymotion
//!
//! Detection of moving point sources (candidate minor planets) in a time-ordered
//! sequence of source catalogs extracted from images of the same field.
//!
//! ## Overview
//! -----------------
//! The pipeline runs in four phases:
//!
//! 1. [`candidates`]: each image catalog is reduced to its transient sources by
//!    comparing it with the stacked master catalog, after quality cuts and exclusion
//!    zones.
//! 2. [`detection::segments`]: every ordered triplet of images is searched for three
//!    nearly collinear detections moving at a constant rate. Triplets are split among
//!    a fixed number of workers.
//! 3. [`detection::merge`]: segments sharing detections are joined into tracks, with
//!    at most one point per image.
//! 4. [`detection::classify`]: each track gets an angular speed and is reported as
//!    moving or uncertain.
//!
//! [`detect_moving_objects`] runs the whole chain from catalogs, and
//! [`detect_from_candidates`] starts from already filtered candidate lists. Both take
//! a [`DetectionParams`] and return a [`DetectionOutcome`].
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use skymotion::{detect_moving_objects, sources::MasterCatalog, DetectionParams};
//! # fn catalogs() -> Vec<skymotion::sources::Catalog> { Vec::new() }
//!
//! let catalogs = catalogs();
//! let master = MasterCatalog::from_catalogs(&catalogs);
//! let params = DetectionParams::builder().workers(4).build()?;
//!
//! let outcome = detect_moving_objects(&catalogs, &master, &params)?;
//! for track in &outcome.classification.moving {
//!     println!("object {}: {:.2}\"/min", track.object_id, track.speed_arcsec_per_min());
//! }
//! # Ok::<(), skymotion::SkymotionError>(())
//! ```
pub mod candidates;
pub mod constants;
pub mod detection;
pub mod geometry;
pub mod partition;
pub mod pipeline;
pub mod skymotion_errors;
pub mod sources;
pub mod time;

pub use detection::{
    classify::{Classification, ClassifiedTrack, TrackClass},
    merge::{MergeStrategy, PointIdentity, Track},
    segments::Segment,
    DetectionParams,
};
pub use pipeline::{detect_from_candidates, detect_moving_objects, DetectionOutcome};
pub use skymotion_errors::SkymotionError;
