//! # Candidate filtering
//!
//! Reduce each image's source catalog to the detections that may belong to a moving
//! object.
//!
//! ## Overview
//! -----------------
//! A source survives when it
//! 1. passes the [`QualityThresholds`] (flags, FWHM, saturation, SNR, elongation),
//! 2. lies outside every configured [`ExclusionZone`],
//! 3. is *transient*: fewer than two master records lie within
//!    `min_travel × pixel_scale` of it. The master is reduced by the same quality
//!    cuts and exclusion zones before the comparison.
//!
//! A static star is found once per image in the master catalog and fails step 3. A
//! moving object only matches its own entry.
//!
//! The upper FWHM bound is relative: `mean(master FWHM) × fwhm_coefficient`, the mean
//! being taken over the unfiltered master.
//!
//! Images are processed independently, one rayon task each. The caller decides the pool
//! (see [`crate::pipeline`]); otherwise rayon's global pool is used.
pub mod exclusion;

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    constants::{ImageIndex, Pixel, Radian},
    detection::DetectionParams,
    geometry::{is_within, SkyPoint},
    skymotion_errors::SkymotionError,
    sources::{Catalog, ImageCandidates, MasterCatalog, SourceRecord},
};

use self::exclusion::ExclusionZone;

/// Per-record quality cuts, with the FWHM upper bound already resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub min_fwhm: Pixel,
    pub max_fwhm: Pixel,
    pub max_flux: f64,
    pub max_flag_sum: i64,
    pub max_elongation: f64,
    pub min_snr: f64,
}

impl QualityThresholds {
    /// Resolve the thresholds of `params` against `master`.
    ///
    /// `max_fwhm` is the mean FWHM of the unfiltered master times
    /// `params.fwhm_coefficient` (NaN for an empty master, which rejects everything).
    pub fn from_params(params: &DetectionParams, master: &MasterCatalog) -> Self {
        let mean_fwhm = master.records().iter().map(|r| r.fwhm).sum::<f64>()
            / master.len() as f64;

        QualityThresholds {
            min_fwhm: params.min_fwhm,
            max_fwhm: mean_fwhm * params.fwhm_coefficient,
            max_flux: params.max_flux,
            max_flag_sum: params.max_flag_sum,
            max_elongation: params.max_elongation,
            min_snr: params.min_snr,
        }
    }

    /// Whether `record` is usable for the motion search.
    #[inline]
    pub fn passes(&self, record: &SourceRecord) -> bool {
        record.flag <= self.max_flag_sum
            && record.fwhm >= self.min_fwhm
            && record.fwhm <= self.max_fwhm
            && record.flux <= self.max_flux
            && record.flux > record.background
            && record.snr() > self.min_snr
            && record.elongation <= self.max_elongation
    }
}

/// Candidate filter bound to one master catalog.
#[derive(Debug, Clone)]
pub struct CandidateFilter<'a> {
    thresholds: QualityThresholds,
    zones: &'a [ExclusionZone],
    /// Sky positions of the quality-filtered master.
    reference: Vec<SkyPoint>,
    /// Transience radius in radians.
    radius: Radian,
}

impl<'a> CandidateFilter<'a> {
    /// Prepare the filter: resolve the thresholds, then drop the master records that
    /// fail the quality cuts or lie in an exclusion zone.
    pub fn new(master: &MasterCatalog, params: &'a DetectionParams) -> Self {
        let thresholds = QualityThresholds::from_params(params, master);
        let zones = &params.exclusion_zones;
        let reference = master
            .records()
            .iter()
            .filter(|r| thresholds.passes(r))
            .filter(|r| !zones.iter().any(|z| z.contains(r.x, r.y)))
            .map(SourceRecord::sky)
            .collect();

        CandidateFilter {
            thresholds,
            zones,
            reference,
            radius: params.travel_radius(),
        }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Number of master records left after the quality cuts and exclusion zones.
    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    /// Whether `(x, y)` falls inside one of the exclusion zones.
    #[inline]
    pub fn is_excluded(&self, record: &SourceRecord) -> bool {
        self.zones.iter().any(|z| z.contains(record.x, record.y))
    }

    /// Whether fewer than two filtered master records lie within the transience radius.
    pub fn is_transient(&self, record: &SourceRecord) -> bool {
        let sky = record.sky();
        self.reference
            .iter()
            .filter(|m| is_within(&sky, m, self.radius))
            .take(2)
            .count()
            < 2
    }

    /// Whether `record` passes the quality cuts, the exclusion zones and the
    /// transience test.
    pub fn accepts(&self, record: &SourceRecord) -> bool {
        self.thresholds.passes(record) && !self.is_excluded(record) && self.is_transient(record)
    }

    /// Filtered copy of `records`, in input order.
    pub fn filter_records<'r>(
        &'r self,
        records: &'r [SourceRecord],
    ) -> impl Iterator<Item = SourceRecord> + 'r {
        records.iter().filter(|r| self.accepts(r)).copied()
    }

    /// Candidates of one image.
    pub fn filter_catalog(&self, catalog: &Catalog) -> ImageCandidates {
        ImageCandidates::new(catalog.epoch, self.filter_records(&catalog.records))
    }
}

/// Filter every image catalog against `master`.
///
/// Arguments
/// -----------------
/// * `catalogs` – one catalog per image; image indices must be unique.
/// * `master` – the stacked reference catalog.
/// * `params` – detection parameters (quality cuts, zones, `min_travel`, `pixel_scale`).
///
/// Return
/// ----------
/// * One [`ImageCandidates`] per input image, keyed by image index. An empty master
///   yields an empty candidate list for every image.
/// * [`SkymotionError::DuplicateImageIndex`] if two catalogs share an index.
///
/// See also
/// ------------
/// * [`CandidateFilter`] – the per-record rules.
pub fn filter_candidates(
    catalogs: &[Catalog],
    master: &MasterCatalog,
    params: &DetectionParams,
) -> Result<BTreeMap<ImageIndex, ImageCandidates>, SkymotionError> {
    if let Some(dup) = catalogs.iter().map(|c| c.image_index).duplicates().next() {
        return Err(SkymotionError::DuplicateImageIndex(dup));
    }

    if master.is_empty() {
        warn!("master catalog is empty, every candidate list will be empty");
        return Ok(catalogs
            .iter()
            .map(|c| (c.image_index, ImageCandidates::new(c.epoch, [])))
            .collect());
    }

    let filter = CandidateFilter::new(master, params);
    debug!(
        "candidate filter: {} of {} master records pass the quality cuts (max_fwhm = {:.3})",
        filter.reference_len(),
        master.len(),
        filter.thresholds().max_fwhm
    );

    Ok(catalogs
        .par_iter()
        .map(|catalog| (catalog.image_index, filter.filter_catalog(catalog)))
        .collect())
}

#[cfg(test)]
mod candidates_test {
    use super::*;
    use crate::{sources::sources_test::star, time::ImageEpoch};
    use hifitime::Epoch;

    fn epoch(i: ImageIndex) -> ImageEpoch {
        ImageEpoch::new(
            i,
            Epoch::from_mjd_utc(59000.0) + hifitime::Unit::Minute * (i as f64),
            30.0,
            None,
        )
    }

    /// Three images sharing two static stars, plus one mover with a new position in
    /// each image.
    fn field() -> Vec<Catalog> {
        (0..3)
            .map(|i| {
                Catalog::new(
                    epoch(i),
                    vec![
                        star(150.0, 2.0),
                        star(150.1, 2.1),
                        star(150.05 + 0.002 * i as f64, 2.05),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn test_static_stars_removed() {
        let catalogs = field();
        let master = MasterCatalog::from_catalogs(&catalogs);
        let params = DetectionParams::default();

        let out = filter_candidates(&catalogs, &master, &params).unwrap();
        assert_eq!(out.len(), 3);
        for (i, cands) in &out {
            assert_eq!(cands.image_index, *i);
            assert_eq!(cands.len(), 1);
            assert_eq!(cands.candidates[0].source.ra, 150.05 + 0.002 * *i as f64);
        }
    }

    #[test]
    fn test_quality_thresholds() {
        let master = MasterCatalog::from_records(vec![star(1.0, 1.0), star(2.0, 2.0)]);
        let th = QualityThresholds::from_params(&DetectionParams::default(), &master);
        assert_eq!(th.max_fwhm, 6.0);

        let good = star(1.0, 1.0);
        assert!(th.passes(&good));
        assert!(!th.passes(&SourceRecord { flag: 5, ..good }));
        assert!(!th.passes(&SourceRecord { fwhm: 0.5, ..good }));
        assert!(!th.passes(&SourceRecord { fwhm: 6.5, ..good }));
        assert!(!th.passes(&SourceRecord { flux: 2.0e6, ..good }));
        assert!(!th.passes(&SourceRecord { background: 6000.0, ..good }));
        assert!(!th.passes(&SourceRecord { flux_err: 1000.0, ..good }));
        assert!(!th.passes(&SourceRecord { elongation: 3.0, ..good }));
    }

    #[test]
    fn test_exclusion_zone() {
        let catalogs = field();
        let master = MasterCatalog::from_catalogs(&catalogs);
        let params = DetectionParams::builder()
            .exclusion_zones(vec![ExclusionZone::new(90.0, 110.0, 90.0, 110.0)])
            .build()
            .unwrap();

        let out = filter_candidates(&catalogs, &master, &params).unwrap();
        assert!(out.values().all(ImageCandidates::is_empty));
    }

    #[test]
    fn test_idempotent() {
        let catalogs = field();
        let master = MasterCatalog::from_catalogs(&catalogs);
        let params = DetectionParams::default();

        let first = filter_candidates(&catalogs, &master, &params).unwrap();
        let refiltered: Vec<Catalog> = first
            .values()
            .map(|c| Catalog::new(c.epoch, c.records().copied().collect()))
            .collect();
        let second = filter_candidates(&refiltered, &master, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_master() {
        let catalogs = field();
        let out =
            filter_candidates(&catalogs, &MasterCatalog::default(), &DetectionParams::default())
                .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.values().all(ImageCandidates::is_empty));
    }

    #[test]
    fn test_duplicate_image_index() {
        let mut catalogs = field();
        catalogs[2] = Catalog::new(epoch(1), vec![]);
        let master = MasterCatalog::from_catalogs(&catalogs);
        assert_eq!(
            filter_candidates(&catalogs, &master, &DetectionParams::default()),
            Err(SkymotionError::DuplicateImageIndex(1))
        );
    }

    #[test]
    fn test_master_records_in_zone_are_ignored() {
        // Same sky position seen twice in the master, once on each side of x = 100.
        let master = MasterCatalog::from_records(vec![
            SourceRecord { x: 99.0, ..star(150.0, 2.0) },
            SourceRecord { x: 101.0, ..star(150.0, 2.0) },
        ]);
        let catalogs = vec![Catalog::new(
            epoch(0),
            vec![SourceRecord { x: 101.0, ..star(150.0, 2.0) }],
        )];
        let params = DetectionParams::builder()
            .exclusion_zones(vec![ExclusionZone::new(0.0, 100.0, 0.0, 1000.0)])
            .build()
            .unwrap();

        assert_eq!(CandidateFilter::new(&master, &params).reference_len(), 1);
        let out = filter_candidates(&catalogs, &master, &params).unwrap();
        assert_eq!(out[&0].len(), 1);
    }

    #[test]
    fn test_transience_counts_master_matches() {
        let params = DetectionParams::default();
        let one_arcsec = 1.0 / 3600.0;
        let record = star(150.0, 2.0);

        let single = MasterCatalog::from_records(vec![star(150.0, 2.0)]);
        assert!(CandidateFilter::new(&single, &params).is_transient(&record));

        let twins = MasterCatalog::from_records(vec![
            star(150.0, 2.0),
            star(150.0, 2.0 + one_arcsec),
            star(150.0, 2.0 + 10.0 * one_arcsec),
        ]);
        assert!(!CandidateFilter::new(&twins, &params).is_transient(&record));

        // Only one of the three lies within 1.5".
        let apart = MasterCatalog::from_records(vec![
            star(150.0, 2.0),
            star(150.0, 2.0 + 2.0 * one_arcsec),
            star(150.0, 2.0 + 10.0 * one_arcsec),
        ]);
        assert!(CandidateFilter::new(&apart, &params).is_transient(&record));
    }
}
