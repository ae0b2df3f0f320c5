//! # Detection pipeline
//!
//! End-to-end moving-object search over a set of images.
//!
//! ## Phases
//! -----------------
//! 1. **Filter** – [`filter_candidates`], one task per image.
//! 2. **Triplets** – every 3-combination of image indices ([`image_triplets`]).
//! 3. **Partition** – the triplet list is split into `workers` contiguous chunks
//!    ([`partition`]).
//! 4. **Search** – one task per chunk, each returning its own [`SegmentBatch`]. The
//!    batches are collected into a `Result<Vec<_>, _>`: merging starts only once every
//!    worker is done, and the first worker error aborts the run.
//! 5. **Merge** – [`merge_segments`] over the batches in worker order.
//! 6. **Classify** – [`classify_tracks`].
//!
//! All tasks run inside a dedicated rayon pool of [`DetectionParams::worker_count`]
//! threads. Workers only share read-only inputs.
//!
//! ### Progress UI (feature: `progress`)
//! With the `progress` feature, an `indicatif` bar reports processed triplets during
//! the search phase.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skymotion::{
//!     detection::DetectionParams,
//!     pipeline::detect_moving_objects,
//!     sources::{Catalog, MasterCatalog},
//! };
//!
//! # fn catalogs() -> Vec<Catalog> { unimplemented!() }
//! let catalogs = catalogs();
//! let master = MasterCatalog::from_catalogs(&catalogs);
//! let params = DetectionParams::builder().pixel_scale(0.62).build()?;
//!
//! let outcome = detect_moving_objects(&catalogs, &master, &params)?;
//! for track in &outcome.classification.moving {
//!     println!("object {}: {:.2}\"/min", track.object_id, track.speed_arcsec_per_min());
//! }
//! # Ok::<(), skymotion::skymotion_errors::SkymotionError>(())
//! ```
use std::collections::BTreeMap;

#[cfg(feature = "progress")]
use std::time::Duration;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
    candidates::filter_candidates,
    constants::ImageIndex,
    detection::{
        classify::{classify_tracks, Classification},
        merge::merge_segments,
        segment_batch::SegmentBatch,
        segments::{detect_segments_with, image_triplets, ImageTriplet, Segment},
        DetectionParams,
    },
    partition::partition,
    skymotion_errors::SkymotionError,
    sources::{Catalog, ImageCandidates, MasterCatalog},
    time::ImageEpoch,
};

/// Everything produced by a detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    /// Filtered candidates, keyed by image index.
    pub candidates: BTreeMap<ImageIndex, ImageCandidates>,
    /// Number of image triplets searched.
    pub triplet_count: usize,
    /// Segments of every worker, in worker order.
    pub segments: Vec<Segment>,
    pub classification: Classification,
}

/// Build the worker pool of `params`.
pub fn build_worker_pool(params: &DetectionParams) -> Result<ThreadPool, SkymotionError> {
    let workers = params.worker_count();
    Ok(ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("skymotion-worker-{i}"))
        .build()?)
}

/// Run the whole pipeline on raw per-image catalogs.
///
/// Arguments
/// -----------------
/// * `catalogs` – one catalog per image, unique image indices.
/// * `master` – stacked reference catalog for the transience test.
/// * `params` – detection parameters.
///
/// Return
/// ----------
/// * A [`DetectionOutcome`]. Fewer than three images, an empty master or no candidate
///   at all give an empty classification, not an error.
/// * An error if two catalogs share an image index, if the pool cannot be built, or
///   if any worker fails.
///
/// See also
/// ------------
/// * [`detect_from_candidates`] – start from already filtered candidate lists.
pub fn detect_moving_objects(
    catalogs: &[Catalog],
    master: &MasterCatalog,
    params: &DetectionParams,
) -> Result<DetectionOutcome, SkymotionError> {
    let pool = build_worker_pool(params)?;
    info!(
        "detecting moving objects in {} images ({} master records, {} workers)",
        catalogs.len(),
        master.len(),
        pool.current_num_threads()
    );
    debug!("{params}");

    let candidates = pool.install(|| filter_candidates(catalogs, master, params))?;
    info!(
        "candidate filter kept {} of {} sources",
        candidates.values().map(ImageCandidates::len).sum::<usize>(),
        catalogs.iter().map(Catalog::len).sum::<usize>()
    );

    run_search(&pool, candidates, params)
}

/// Run the search, merge and classification phases on filtered candidates.
///
/// The epochs used by the classifier are those carried by the candidate lists.
pub fn detect_from_candidates(
    candidates: BTreeMap<ImageIndex, ImageCandidates>,
    params: &DetectionParams,
) -> Result<DetectionOutcome, SkymotionError> {
    let pool = build_worker_pool(params)?;
    run_search(&pool, candidates, params)
}

fn run_search(
    pool: &ThreadPool,
    candidates: BTreeMap<ImageIndex, ImageCandidates>,
    params: &DetectionParams,
) -> Result<DetectionOutcome, SkymotionError> {
    let triplets = image_triplets(&candidates);
    let triplet_count = triplets.len();
    info!("{triplet_count} image triplets to search");

    let batches = search_segments(pool, triplets, &candidates, params)?;
    let segments: Vec<Segment> = batches.into_iter().flat_map(|b| b.segments).collect();
    info!("{} segments found", segments.len());

    let tracks = merge_segments(&segments, params.merge_strategy, params.point_identity);
    info!(
        "{} tracks after merging ({:?})",
        tracks.len(),
        params.merge_strategy
    );

    let epochs: BTreeMap<ImageIndex, ImageEpoch> = candidates
        .iter()
        .map(|(&idx, c)| (idx, c.epoch))
        .collect();
    let classification = classify_tracks(tracks, &epochs, params.min_speed);
    if classification.is_empty() {
        info!("no moving objects found");
    } else {
        info!(
            "{} moving objects, {} uncertain tracks",
            classification.moving.len(),
            classification.uncertain.len()
        );
    }

    Ok(DetectionOutcome {
        candidates,
        triplet_count,
        segments,
        classification,
    })
}

/// Split `triplets` among the pool's workers and collect one batch per worker.
///
/// Return
/// ----------
/// * The batches in worker order, or the first worker error.
pub fn search_segments(
    pool: &ThreadPool,
    triplets: Vec<ImageTriplet>,
    candidates: &BTreeMap<ImageIndex, ImageCandidates>,
    params: &DetectionParams,
) -> Result<Vec<SegmentBatch>, SkymotionError> {
    #[cfg(feature = "progress")]
    let progress = triplet_progress(triplets.len() as u64);
    #[cfg(feature = "progress")]
    let tick = || progress.inc(1);
    #[cfg(not(feature = "progress"))]
    let tick = || {};

    let chunks = partition(triplets, pool.current_num_threads());
    debug!(
        "triplet partition sizes: {:?}",
        chunks.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let batches = pool.install(|| {
        chunks
            .par_iter()
            .enumerate()
            .map(|(worker, chunk)| {
                let segments = detect_segments_with(chunk, candidates, params, &tick)?;
                debug!(
                    "worker {worker}: {} segments from {} triplets",
                    segments.len(),
                    chunk.len()
                );
                Ok(SegmentBatch::new(worker, segments))
            })
            .collect::<Result<Vec<_>, SkymotionError>>()
    });

    #[cfg(feature = "progress")]
    progress.finish_and_clear();

    batches
}

#[cfg(feature = "progress")]
fn triplet_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total.max(1));
    pb.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} triplets ({percent:>3}%) | {per_sec} | ETA {eta_precise}",
        )
        .expect("indicatif template"),
    );
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}

#[cfg(test)]
mod pipeline_test {
    use super::*;
    use crate::detection::segments::segments_test::{cands, params};

    #[test]
    fn test_worker_pool_size() {
        let params = DetectionParams::builder().workers(3).build().unwrap();
        let pool = build_worker_pool(&params).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn test_batches_in_worker_order() {
        let candidates: BTreeMap<_, _> = (0..6)
            .map(|i| (i, cands(i, 2.0 * i as f64, &[(10.0, 0.0)])))
            .collect();
        let triplets = image_triplets(&candidates);
        assert_eq!(triplets.len(), 20);

        let params = DetectionParams::builder().workers(4).build().unwrap();
        let pool = build_worker_pool(&params).unwrap();
        let batches = search_segments(&pool, triplets, &candidates, &params).unwrap();

        assert_eq!(batches.len(), 4);
        assert!(batches.iter().enumerate().all(|(i, b)| b.worker == i));
        // A static source never makes a segment.
        assert!(batches.iter().all(SegmentBatch::is_empty));
    }

    #[test]
    fn test_worker_error_aborts() {
        let candidates: BTreeMap<_, _> = (0..3).map(|i| (i, cands(i, i as f64, &[]))).collect();
        let pool = build_worker_pool(&params()).unwrap();
        let result = search_segments(&pool, vec![(0, 1, 2), (0, 1, 9)], &candidates, &params());
        assert_eq!(result, Err(SkymotionError::UnknownImage(9)));
    }

    #[test]
    fn test_fewer_than_three_images() {
        let candidates: BTreeMap<_, _> = (0..2)
            .map(|i| (i, cands(i, i as f64, &[(10.0, 0.0)])))
            .collect();
        let outcome = detect_from_candidates(candidates, &params()).unwrap();
        assert_eq!(outcome.triplet_count, 0);
        assert!(outcome.classification.is_empty());
    }
}
