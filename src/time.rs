//! # Image epochs
//!
//! Capture time, exposure and binning of one input image, as delivered by the
//! calibration collaborator (FITS-like `DATE-OBS` / `TIME-OBS` / `EXPTIME` / `XBINNING`
//! header values).
//!
//! Elapsed times between images are measured between **exposure midpoints**:
//!
//! ```text
//! Δt(a → b) = (t_b − t_a) + (exp_b − exp_a) / 2      [seconds]
//! ```
use hifitime::Epoch;

use crate::{
    constants::{ImageIndex, Seconds},
    skymotion_errors::SkymotionError,
};

/// Primary timestamp layout.
const TIMESTAMP_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S.%f";

/// Fallback timestamp layout without fractional seconds.
const TIMESTAMP_WHOLE: &str = "%Y-%m-%dT%H:%M:%S";

/// Timing metadata of a single image.
///
/// Fields
/// -----------------
/// * `image_index` – semantic index of the image in the sequence.
/// * `timestamp` – start of the exposure (UTC).
/// * `exposure_s` – exposure duration in seconds.
/// * `binning` – detector binning factor along x (1 when the header has none).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEpoch {
    pub image_index: ImageIndex,
    pub timestamp: Epoch,
    pub exposure_s: Seconds,
    pub binning: f64,
}

impl ImageEpoch {
    pub fn new(
        image_index: ImageIndex,
        timestamp: Epoch,
        exposure_s: Seconds,
        binning: Option<f64>,
    ) -> Self {
        ImageEpoch {
            image_index,
            timestamp,
            exposure_s,
            binning: binning.unwrap_or(1.0),
        }
    }

    /// Build an epoch from raw header values.
    ///
    /// Arguments
    /// -----------------
    /// * `image_index` – semantic index of the image.
    /// * `date_obs` – either a full `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp or a bare date.
    /// * `time_obs` – time of day, joined to `date_obs` when the latter has no `T`.
    /// * `exposure_s` – exposure duration (seconds).
    /// * `binning` – optional binning factor, defaults to 1.
    ///
    /// Return
    /// ----------
    /// * `Ok(ImageEpoch)` on success.
    /// * `Err(SkymotionError::MissingTimeField)` when a bare date comes without `time_obs`.
    /// * `Err(SkymotionError::InvalidTimestamp)` when neither layout matches.
    pub fn from_header(
        image_index: ImageIndex,
        date_obs: &str,
        time_obs: Option<&str>,
        exposure_s: Seconds,
        binning: Option<f64>,
    ) -> Result<Self, SkymotionError> {
        let date_obs = date_obs.trim();
        let joined = if date_obs.contains('T') {
            date_obs.to_string()
        } else {
            let time_obs =
                time_obs.ok_or_else(|| SkymotionError::MissingTimeField(date_obs.to_string()))?;
            format!("{}T{}", date_obs, time_obs.trim())
        };

        let timestamp = parse_timestamp(&joined)?;
        Ok(ImageEpoch::new(image_index, timestamp, exposure_s, binning))
    }

    /// Exposure midpoint expressed as an offset (seconds) from the start of `self`.
    #[inline]
    fn half_exposure(&self) -> Seconds {
        self.exposure_s / 2.0
    }

    /// Elapsed time between the exposure midpoints of `self` and `later`.
    ///
    /// Return
    /// ----------
    /// * `(t_later − t_self) + (exp_later − exp_self) / 2`, in seconds. Negative when
    ///   `later` was actually captured first.
    pub fn elapsed_to(&self, later: &ImageEpoch) -> Seconds {
        (later.timestamp - self.timestamp).to_seconds() + later.half_exposure()
            - self.half_exposure()
    }
}

/// Parse a `YYYY-MM-DDTHH:MM:SS.fff` timestamp, falling back to `YYYY-MM-DDTHH:MM:SS`.
///
/// Return
/// ----------
/// * The UTC [`Epoch`], or [`SkymotionError::InvalidTimestamp`] if both layouts fail
///   (including out-of-range calendar fields).
pub fn parse_timestamp(value: &str) -> Result<Epoch, SkymotionError> {
    Epoch::from_format_str(value, TIMESTAMP_FRACTIONAL)
        .or_else(|_| Epoch::from_format_str(value, TIMESTAMP_WHOLE))
        .map_err(|_| SkymotionError::InvalidTimestamp(value.to_string()))
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_fractional_and_whole() {
        let a = parse_timestamp("2021-01-01T00:00:00").unwrap();
        let b = parse_timestamp("2021-01-01T00:00:01.5").unwrap();
        assert_relative_eq!((b - a).to_seconds(), 1.5, epsilon = 1e-9);
        assert_relative_eq!(a.to_mjd_utc_days(), 59215.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_keeps_subsecond_digits() {
        let whole = parse_timestamp("2021-01-01T00:00:00").unwrap();
        let micro = parse_timestamp("2021-01-01T00:00:00.123456").unwrap();
        assert_relative_eq!((micro - whole).to_seconds(), 0.123456, epsilon = 1e-12);

        assert_eq!(
            parse_timestamp("2021-01-01T00:00:01.500").unwrap(),
            parse_timestamp("2021-01-01T00:00:01.5").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            parse_timestamp("2021/01/01 00:00:00"),
            Err(SkymotionError::InvalidTimestamp(
                "2021/01/01 00:00:00".to_string()
            ))
        );
        assert!(parse_timestamp("2021-13-01T00:00:00").is_err());
        assert!(parse_timestamp("2021-01-01T25:00:00").is_err());
    }

    #[test]
    fn test_from_header_split_fields() {
        let joined =
            ImageEpoch::from_header(3, "2022-06-15", Some(" 21:30:00.25 "), 60.0, None).unwrap();
        let full =
            ImageEpoch::from_header(3, "2022-06-15T21:30:00.25", None, 60.0, None).unwrap();
        assert_eq!(joined, full);
        assert_eq!(joined.binning, 1.0);
        assert_eq!(joined.image_index, 3);
    }

    #[test]
    fn test_from_header_missing_time() {
        assert_eq!(
            ImageEpoch::from_header(0, "2022-06-15", None, 60.0, Some(2.0)),
            Err(SkymotionError::MissingTimeField("2022-06-15".to_string()))
        );
    }

    #[test]
    fn test_elapsed_midpoint_corrected() {
        let first = ImageEpoch::from_header(0, "2022-06-15T21:30:00", None, 60.0, None).unwrap();
        let second =
            ImageEpoch::from_header(1, "2022-06-15T21:32:00", None, 120.0, None).unwrap();

        // 120 s between starts + (120 − 60) / 2
        assert_relative_eq!(first.elapsed_to(&second), 150.0, epsilon = 1e-9);
        assert_relative_eq!(second.elapsed_to(&first), -150.0, epsilon = 1e-9);
        assert_eq!(first.elapsed_to(&first), 0.0);
    }
}
