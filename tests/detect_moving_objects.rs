mod common;

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use camino::Utf8Path;
use common::{epoch, source, star_field, synthetic_catalogs, Mover};
use skymotion::{
    constants::RADSEC,
    detect_from_candidates, detect_moving_objects,
    geometry::{angular_distance, SkyPoint},
    sources::{Catalog, ImageCandidates, MasterCatalog},
    DetectionParams, MergeStrategy, SkymotionError, TrackClass,
};

/// 3"/min eastward, away from every star of [`star_field`].
fn fast_mover() -> Mover {
    Mover {
        start: (150.015, 2.008),
        rate: (3.0, 0.0),
    }
}

fn default_params() -> DetectionParams {
    DetectionParams::builder().workers(2).build().unwrap()
}

fn run(catalogs: &[Catalog], params: &DetectionParams) -> skymotion::DetectionOutcome {
    let master = MasterCatalog::from_catalogs(catalogs);
    detect_moving_objects(catalogs, &master, params).unwrap()
}

#[test]
fn test_single_mover_three_images() {
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0]);
    let outcome = run(&catalogs, &default_params());

    assert!(outcome.candidates.values().all(|c| c.len() == 1));
    assert_eq!(outcome.triplet_count, 1);
    assert_eq!(outcome.segments.len(), 1);

    let classification = &outcome.classification;
    assert_eq!(classification.len(), 1);
    assert_eq!(classification.moving.len(), 1);

    let track = &classification.moving[0];
    assert_eq!(track.object_id, 1);
    assert_eq!(track.class, TrackClass::Moving);
    assert_eq!(track.track.len(), 3);
    assert_relative_eq!(
        track.speed_arcsec_per_min(),
        3.0 * (2.008_f64).to_radians().cos(),
        epsilon = 1e-6
    );
}

#[test]
fn test_single_mover_five_images_one_track() {
    let times = [0.0, 2.0, 4.0, 6.0, 8.0];
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &times);

    for strategy in [MergeStrategy::Greedy, MergeStrategy::ConnectedComponents] {
        let params = DetectionParams::builder()
            .merge_strategy(strategy)
            .workers(3)
            .build()
            .unwrap();
        let outcome = run(&catalogs, &params);

        assert_eq!(outcome.triplet_count, 10);
        assert_eq!(outcome.segments.len(), 10);
        assert_eq!(outcome.classification.len(), 1, "{strategy:?}");

        let track = &outcome.classification.moving[0].track;
        assert_eq!(track.len(), 5);
        assert!(track.image_indices().eq(0..5));
    }
}

#[test]
fn test_perpendicular_offset_gives_nothing() {
    let mut catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0]);
    // Third position 6" north of the second one: expected distance, wrong direction.
    let last = catalogs[2].records.len() - 1;
    let (ra, dec) = fast_mover().position(2.0);
    catalogs[2].records[last] = source(ra, dec + 6.0 / 3600.0);

    let outcome = run(&catalogs, &default_params());
    assert!(outcome.segments.is_empty());
    assert!(outcome.classification.is_empty());
}

#[test]
fn test_simultaneous_images_give_nothing() {
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 0.0, 4.0]);
    let outcome = run(&catalogs, &default_params());
    assert!(outcome.segments.is_empty());
    assert!(outcome.classification.is_empty());
}

#[test]
fn test_slow_mover_is_uncertain() {
    let slow = Mover {
        start: (150.015, 2.008),
        rate: (1.0, 1.0),
    };
    let catalogs = synthetic_catalogs(&star_field(), &[slow], &[0.0, 3.0, 6.0, 9.0]);
    let params = DetectionParams::builder()
        .min_speed(2.0)
        .workers(2)
        .build()
        .unwrap();
    let outcome = run(&catalogs, &params);

    assert!(outcome.classification.moving.is_empty());
    assert_eq!(outcome.classification.uncertain.len(), 1);
    let track = &outcome.classification.uncertain[0];
    assert_eq!(track.class, TrackClass::Uncertain);
    let (first, last) = (slow.position(0.0), slow.position(9.0));
    let expected = angular_distance(
        &SkyPoint::new(first.0, first.1),
        &SkyPoint::new(last.0, last.1),
    ) / 9.0
        / RADSEC;
    assert_relative_eq!(track.speed_arcsec_per_min(), expected, epsilon = 1e-9);
}

#[test]
fn test_two_movers() {
    let other = Mover {
        start: (149.995, 1.990),
        rate: (-2.0, 1.5),
    };
    let catalogs =
        synthetic_catalogs(&star_field(), &[fast_mover(), other], &[0.0, 2.0, 4.0, 6.0]);
    let outcome = run(&catalogs, &default_params());

    assert_eq!(outcome.classification.moving.len(), 2);
    let ids: Vec<usize> = outcome
        .classification
        .tracks()
        .iter()
        .map(|t| t.object_id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(outcome
        .classification
        .moving
        .iter()
        .all(|t| t.track.len() == 4));
}

#[test]
fn test_worker_count_does_not_change_results() {
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0, 6.0, 8.0]);

    let reference = run(
        &catalogs,
        &DetectionParams::builder().workers(1).build().unwrap(),
    );
    for workers in [2, 3, 7, 16] {
        let params = DetectionParams::builder().workers(workers).build().unwrap();
        assert_eq!(run(&catalogs, &params), reference, "workers = {workers}");
    }
}

#[test]
fn test_empty_master() {
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0]);
    let outcome =
        detect_moving_objects(&catalogs, &MasterCatalog::default(), &default_params()).unwrap();
    assert!(outcome.candidates.values().all(ImageCandidates::is_empty));
    assert!(outcome.classification.is_empty());
}

#[test]
fn test_duplicate_image_index() {
    let mut catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0]);
    catalogs[2] = Catalog::new(epoch(0, 4.0), catalogs[2].records.clone());
    let master = MasterCatalog::from_catalogs(&catalogs);

    assert_eq!(
        detect_moving_objects(&catalogs, &master, &default_params()),
        Err(SkymotionError::DuplicateImageIndex(0))
    );
}

#[test]
fn test_from_candidate_files() {
    use skymotion::sources::catalog_reader::{
        read_candidates_csv, read_source_catalog, write_candidates_csv,
    };

    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0, 6.0]);

    // Raw catalogs on disk, read back.
    let read_back: Vec<Catalog> = catalogs
        .iter()
        .map(|c| {
            let path = root.join(format!("image_{:02}.cat", c.image_index));
            std::fs::write(&path, common::catalog_to_ascii(c)).unwrap();
            read_source_catalog(&path, c.epoch).unwrap()
        })
        .collect();
    assert_eq!(read_back, catalogs);

    let in_memory = run(&read_back, &default_params());

    // Candidate lists through CSV files.
    let mut candidates = BTreeMap::new();
    for (idx, cands) in &in_memory.candidates {
        let path = root.join(format!("image_{idx:02}.cnd"));
        write_candidates_csv(&path, cands).unwrap();
        candidates.insert(*idx, read_candidates_csv(&path, cands.epoch).unwrap());
    }
    assert_eq!(candidates, in_memory.candidates);

    let from_files = detect_from_candidates(candidates, &default_params()).unwrap();
    assert_eq!(from_files.classification, in_memory.classification);
    assert_eq!(from_files.classification.moving.len(), 1);
}

#[test]
fn test_params_from_json() {
    let params = DetectionParams::from_json_str(
        r#"{ "pixel_scale": 0.5, "min_travel": 3.0, "max_height": 2.0,
             "tolerance": 4.0, "workers": 2 }"#,
    )
    .unwrap();
    let catalogs = synthetic_catalogs(&star_field(), &[fast_mover()], &[0.0, 2.0, 4.0]);
    let outcome = run(&catalogs, &params);
    assert_eq!(outcome.classification.moving.len(), 1);
}
