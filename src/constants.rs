//! # Constants and type definitions for skymotion
//!
//! This module centralizes the **unit conversion factors** and the **type aliases**
//! shared by the detection pipeline.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ radians)
//! - Angle and time aliases used in public signatures
//! - Inline container used for the points of a track
//!
//! Sky coordinates of source records are stored in **degrees** (as produced by the
//! source extractor); every derived angle (distances, heights, speeds) is in **radians**.

use smallvec::SmallVec;

use crate::sources::Detection;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Seconds in one minute
pub const SECONDS_PER_MINUTE: f64 = 60.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Length in detector pixels
pub type Pixel = f64;
/// Duration in seconds
pub type Seconds = f64;

/// Semantic index of an input image (carried on every record, never an array position).
pub type ImageIndex = usize;

/// A small, inline-optimized container for the points of a single track.
pub type TrackPoints = SmallVec<[Detection; 6]>;
