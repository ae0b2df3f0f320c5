//! # Segment merging
//!
//! Group segments that share detections into tracks.
//!
//! ## Strategies
//! -----------------
//! * [`MergeStrategy::Greedy`] – a single pass in segment order. Each segment is offered
//!   to the existing tracks in creation order. The first track holding some of its
//!   points absorbs the missing ones. A track already holding all three discards it.
//!   A segment sharing nothing starts a new track. The result depends on segment order
//!   and two tracks may end up sharing points.
//! * [`MergeStrategy::ConnectedComponents`] – union-find over detections. Every set of
//!   segments connected through shared points becomes exactly one track, whatever the
//!   segment order.
//!
//! ## Point identity
//! -----------------
//! Two detections are the same point according to [`PointIdentity`]: exact equality of
//! `(ra, dec)` by default, or a sky distance below a radius.
//!
//! ## Track invariant
//! -----------------
//! A track holds at most one point per image: a point whose image already has a
//! *different* point in the track is not added, the first one stays. Tracks are
//! returned sorted by image index.
use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{ImageIndex, Radian, TrackPoints},
    detection::segments::Segment,
    geometry::is_within,
    sources::Detection,
};

/// How overlapping segments are merged into tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStrategy {
    #[default]
    Greedy,
    ConnectedComponents,
}

/// When two detections are considered the same point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PointIdentity {
    /// Bitwise-equal `(ra, dec)` (with `-0.0 == 0.0`).
    #[default]
    ExactCoordinates,
    /// Sky distance at most the given radius, in radians.
    Tolerance(Radian),
}

impl PointIdentity {
    #[inline]
    pub fn same_point(&self, a: &Detection, b: &Detection) -> bool {
        match *self {
            PointIdentity::ExactCoordinates => {
                a.source.ra == b.source.ra && a.source.dec == b.source.dec
            }
            PointIdentity::Tolerance(radius) => is_within(&a.sky(), &b.sky(), radius),
        }
    }
}

/// A chain of detections attributed to one moving object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    points: TrackPoints,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from detections, enforcing one point per image, sorted by image.
    pub fn from_points(
        points: impl IntoIterator<Item = Detection>,
        identity: PointIdentity,
    ) -> Self {
        let mut track = Track::new();
        for p in points {
            track.add(p, identity);
        }
        track
    }

    pub fn points(&self) -> &[Detection] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Detection> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Detection> {
        self.points.last()
    }

    pub fn image_indices(&self) -> impl Iterator<Item = ImageIndex> + '_ {
        self.points.iter().map(|p| p.image_index)
    }

    pub fn contains(&self, point: &Detection, identity: PointIdentity) -> bool {
        self.points.iter().any(|p| identity.same_point(p, point))
    }

    /// Insert `point` at its image-ordered position, unless it is already present or
    /// its image is already taken.
    ///
    /// Return
    /// ----------
    /// * `true` if the point was inserted.
    pub fn add(&mut self, point: Detection, identity: PointIdentity) -> bool {
        if self
            .points
            .iter()
            .any(|p| p.image_index == point.image_index || identity.same_point(p, &point))
        {
            return false;
        }
        let pos = self
            .points
            .partition_point(|p| p.image_index < point.image_index);
        self.points.insert(pos, point);
        true
    }
}

/// Merge segments into tracks.
///
/// Arguments
/// -----------------
/// * `segments` – segments from every worker, in join order.
/// * `strategy` – see [`MergeStrategy`].
/// * `identity` – see [`PointIdentity`].
///
/// Return
/// ----------
/// * Tracks with points sorted by image index. No segment gives no track.
pub fn merge_segments(
    segments: &[Segment],
    strategy: MergeStrategy,
    identity: PointIdentity,
) -> Vec<Track> {
    match strategy {
        MergeStrategy::Greedy => merge_greedy(segments, identity),
        MergeStrategy::ConnectedComponents => merge_connected(segments, identity),
    }
}

fn merge_greedy(segments: &[Segment], identity: PointIdentity) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    'segments: for segment in segments {
        for track in tracks.iter_mut() {
            let shared = segment
                .points
                .iter()
                .filter(|p| track.contains(p, identity))
                .count();
            match shared {
                0 => continue,
                3 => continue 'segments,
                _ => {
                    for p in &segment.points {
                        track.add(*p, identity);
                    }
                    continue 'segments;
                }
            }
        }
        tracks.push(Track::from_points(segment.points, identity));
    }
    tracks
}

/// Disjoint-set forest with path halving and union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn with_capacity(n: usize) -> Self {
        DisjointSets {
            parent: Vec::with_capacity(n),
            size: Vec::with_capacity(n),
        }
    }

    fn make_set(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.size.push(1);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Distinct detections in first-seen order, each with its node id.
struct PointRegistry {
    identity: PointIdentity,
    points: Vec<Detection>,
    exact: HashMap<(u64, u64), usize, RandomState>,
}

impl PointRegistry {
    fn new(identity: PointIdentity) -> Self {
        PointRegistry {
            identity,
            points: Vec::new(),
            exact: HashMap::default(),
        }
    }

    fn node_of(&mut self, point: &Detection, sets: &mut DisjointSets) -> usize {
        match self.identity {
            PointIdentity::ExactCoordinates => {
                // -0.0 + 0.0 == +0.0, so both zeros share a key.
                let key = (
                    (point.source.ra + 0.0).to_bits(),
                    (point.source.dec + 0.0).to_bits(),
                );
                if let Some(&id) = self.exact.get(&key) {
                    return id;
                }
                let id = self.register(point, sets);
                self.exact.insert(key, id);
                id
            }
            PointIdentity::Tolerance(_) => {
                match self
                    .points
                    .iter()
                    .position(|p| self.identity.same_point(p, point))
                {
                    Some(id) => id,
                    None => self.register(point, sets),
                }
            }
        }
    }

    fn register(&mut self, point: &Detection, sets: &mut DisjointSets) -> usize {
        self.points.push(*point);
        sets.make_set()
    }
}

fn merge_connected(segments: &[Segment], identity: PointIdentity) -> Vec<Track> {
    let mut sets = DisjointSets::with_capacity(3 * segments.len());
    let mut registry = PointRegistry::new(identity);

    for segment in segments {
        let [a, b, c] = segment
            .points
            .each_ref()
            .map(|p| registry.node_of(p, &mut sets));
        sets.union(a, b);
        sets.union(b, c);
    }

    // Group nodes by root; a group is ordered by its first-seen node.
    let mut group_of_root: HashMap<usize, usize, RandomState> = HashMap::default();
    let mut groups: Vec<Vec<Detection>> = Vec::new();
    for (node, point) in registry.points.iter().enumerate() {
        let root = sets.find(node);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(*point);
    }

    groups
        .into_iter()
        .map(|points| Track::from_points(points, identity))
        .collect()
}
