//! # Source records and catalogs
//!
//! Data model of the point sources handed over by the extraction collaborator.
//!
//! ## Overview
//! -----------------
//! * [`SourceRecord`] – one detected point source (12 numeric columns), immutable.
//! * [`Catalog`] – all records of one image, with that image's [`ImageEpoch`].
//! * [`MasterCatalog`] – stacked reference catalog used by the transience test.
//! * [`Detection`] – a record tagged with the index of the image it was found in.
//! * [`ImageCandidates`] – filtered detections of one image, ready for the motion search.
//!
//! ## Units & Conventions
//! -----------------
//! * `ra`/`dec` are **degrees** (J2000), `x`/`y` and `fwhm` are **pixels**.
//! * `image_index` is carried explicitly from ingestion onward and is never recomputed
//!   from an array position.
pub mod catalog_reader;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Degree, ImageIndex, Pixel},
    geometry::SkyPoint,
    time::ImageEpoch,
};

/// Number of numeric columns of a raw source row.
pub const SOURCE_COLUMNS: usize = 12;

/// A point source as measured by the extraction collaborator.
///
/// Column order: `flag, x, y, ra, dec, flux, flux_err, background, mag, mag_err,
/// fwhm, elongation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub flag: i64,
    pub x: Pixel,
    pub y: Pixel,
    pub ra: Degree,
    pub dec: Degree,
    pub flux: f64,
    pub flux_err: f64,
    pub background: f64,
    pub mag: f64,
    pub mag_err: f64,
    pub fwhm: Pixel,
    pub elongation: f64,
}

impl SourceRecord {
    /// Build a record from one row of [`SOURCE_COLUMNS`] values, in column order.
    ///
    /// The flag column is rounded to the nearest integer (extractors write it as a float
    /// in some ASCII dumps).
    pub fn from_columns(columns: &[f64; SOURCE_COLUMNS]) -> Self {
        SourceRecord {
            flag: columns[0].round() as i64,
            x: columns[1],
            y: columns[2],
            ra: columns[3],
            dec: columns[4],
            flux: columns[5],
            flux_err: columns[6],
            background: columns[7],
            mag: columns[8],
            mag_err: columns[9],
            fwhm: columns[10],
            elongation: columns[11],
        }
    }

    /// Sky position of the record.
    #[inline]
    pub fn sky(&self) -> SkyPoint {
        SkyPoint::new(self.ra, self.dec)
    }

    /// Signal-to-noise ratio `flux / flux_err`.
    #[inline]
    pub fn snr(&self) -> f64 {
        self.flux / self.flux_err
    }
}

/// All sources extracted from one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub image_index: ImageIndex,
    pub epoch: ImageEpoch,
    pub records: Vec<SourceRecord>,
}

impl Catalog {
    /// Create a catalog; the image index is taken from `epoch`.
    pub fn new(epoch: ImageEpoch, records: Vec<SourceRecord>) -> Self {
        Catalog {
            image_index: epoch.image_index,
            epoch,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Stacked reference catalog. A static star shows up once per image in it, whereas a
/// moving object contributes isolated entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterCatalog {
    records: Vec<SourceRecord>,
}

impl MasterCatalog {
    pub fn from_records(records: Vec<SourceRecord>) -> Self {
        MasterCatalog { records }
    }

    /// Stack the records of every per-image catalog, in the given catalog order.
    pub fn from_catalogs(catalogs: &[Catalog]) -> Self {
        MasterCatalog {
            records: catalogs
                .iter()
                .flat_map(|c| c.records.iter().copied())
                .collect(),
        }
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A source record tagged with the image it belongs to.
///
/// Segments and tracks are made of detections; a detection's identity for merging is
/// its sky position (see [`crate::detection::merge::PointIdentity`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub image_index: ImageIndex,
    pub source: SourceRecord,
}

impl Detection {
    pub fn new(image_index: ImageIndex, source: SourceRecord) -> Self {
        Detection {
            image_index,
            source,
        }
    }

    #[inline]
    pub fn sky(&self) -> SkyPoint {
        self.source.sky()
    }
}

/// A detection that survived the candidate filter.
pub type Candidate = Detection;

/// Candidates of a single image together with its timing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidates {
    pub image_index: ImageIndex,
    pub epoch: ImageEpoch,
    pub candidates: Vec<Candidate>,
}

impl ImageCandidates {
    /// Wrap already-filtered records of the image described by `epoch`.
    pub fn new(epoch: ImageEpoch, records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let image_index = epoch.image_index;
        ImageCandidates {
            image_index,
            epoch,
            candidates: records
                .into_iter()
                .map(|r| Detection::new(image_index, r))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Plain records of the candidates, without the image tag.
    pub fn records(&self) -> impl Iterator<Item = &SourceRecord> + '_ {
        self.candidates.iter().map(|c| &c.source)
    }
}
