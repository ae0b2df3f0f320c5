#![allow(dead_code)]

use hifitime::{Epoch, Unit};
use skymotion::{
    sources::{Catalog, SourceRecord},
    time::ImageEpoch,
};

/// Reference date of the first image.
pub const REFERENCE_MJD: f64 = 59000.0;

/// Exposure time of the synthetic images, seconds.
pub const EXPOSURE: f64 = 30.0;

pub fn epoch(image_index: usize, minutes: f64) -> ImageEpoch {
    ImageEpoch::new(
        image_index,
        Epoch::from_mjd_utc(REFERENCE_MJD) + Unit::Minute * minutes,
        EXPOSURE,
        None,
    )
}

/// A clean point source at `(ra, dec)` degrees, passing the default quality cuts.
pub fn source(ra: f64, dec: f64) -> SourceRecord {
    SourceRecord {
        flag: 0,
        x: 512.0,
        y: 512.0,
        ra,
        dec,
        flux: 8000.0,
        flux_err: 80.0,
        background: 150.0,
        mag: 14.5,
        mag_err: 0.01,
        fwhm: 2.5,
        elongation: 1.1,
    }
}

/// Object moving at a constant rate from `start`.
#[derive(Debug, Clone, Copy)]
pub struct Mover {
    /// `(ra, dec)` at the first image, degrees.
    pub start: (f64, f64),
    /// `(d_ra, d_dec)` per minute, arcseconds.
    pub rate: (f64, f64),
}

impl Mover {
    pub fn position(&self, minutes: f64) -> (f64, f64) {
        (
            self.start.0 + self.rate.0 * minutes / 3600.0,
            self.start.1 + self.rate.1 * minutes / 3600.0,
        )
    }
}

/// One catalog per entry of `times` (minutes after the first image): every static star
/// plus the current position of every mover.
pub fn synthetic_catalogs(stars: &[(f64, f64)], movers: &[Mover], times: &[f64]) -> Vec<Catalog> {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let records = stars
                .iter()
                .copied()
                .chain(movers.iter().map(|m| m.position(t)))
                .map(|(ra, dec)| source(ra, dec))
                .collect();
            Catalog::new(epoch(i, t), records)
        })
        .collect()
}

/// A handful of static stars around `(150°, 2°)`.
pub fn star_field() -> Vec<(f64, f64)> {
    vec![
        (150.000, 2.000),
        (150.010, 2.004),
        (150.020, 1.996),
        (149.990, 2.012),
        (150.005, 1.985),
    ]
}

/// Write `catalog` in the whitespace-separated ASCII layout of the extractor.
pub fn catalog_to_ascii(catalog: &Catalog) -> String {
    let mut text = String::from("#   1 FLAGS\n#   2 X_IMAGE\n");
    for r in &catalog.records {
        text.push_str(&format!(
            "{} {} {} {} {} {} {} {} {} {} {} {}\n",
            r.flag,
            r.x,
            r.y,
            r.ra,
            r.dec,
            r.flux,
            r.flux_err,
            r.background,
            r.mag,
            r.mag_err,
            r.fwhm,
            r.elongation
        ));
    }
    text
}
