use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{ProbePlacementError, Result},
    types::{Point, Value, Vector},
};

/// How two centroids are decided to be the same probe.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CentroidDedup {
    /// Bit-for-bit coordinate equality.
    #[default]
    Exact,
    /// Centroids closer than or exactly at this distance are the same probe.
    ///
    /// More forgiving of rounding noise than [`Exact`](CentroidDedup::Exact), but it
    /// can drop a cluster key that exact equality would keep, so merges that settle
    /// on near-identical centroids may converge in fewer passes with fewer points.
    Epsilon(Value),
}

impl CentroidDedup {
    #[inline]
    fn same(self, a: &Point, b: &Point) -> bool {
        match self {
            CentroidDedup::Exact => a == b,
            CentroidDedup::Epsilon(eps) => (*a - *b).norm() <= eps,
        }
    }
}

/// Tuning for [`merge_points`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeConfig {
    /// Give up with [`ProbePlacementError::MergeDidNotConverge`] after this many passes.
    /// `None` runs until the points settle. Default: `1024`.
    pub max_passes: Option<usize>,
    pub dedup: CentroidDedup,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_passes: Some(1024),
            dedup: CentroidDedup::Exact,
        }
    }
}

/// Result of [`merge_points`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    /// Surviving probes, ordered by the point that seeded each cluster.
    pub points: Vec<Point>,
    /// `input.len() - points.len()`.
    pub removed: usize,
    /// Clustering passes run before the points settled.
    pub passes: usize,
}

/// Collapses probes closer than `distance` into centroids until every pair is at
/// least `distance` apart.
///
/// Each pass walks the points in order. Every point not already taken as a key
/// seeds a cluster holding all points strictly within `distance` of it (itself
/// included), and the pass output is one centroid per cluster with duplicates
/// removed. Clusters overlap and are seeded by encounter order, so this is a
/// greedy heuristic rather than an optimal clustering: reordering the input can
/// reorder, and on ambiguous inputs change, the result.
///
/// ```text
/// pass 1:  a  b     c              (a,b within distance)
///          └┬─┘     │
/// pass 2:   ab      c              settled
/// ```
///
/// Empty input or a non-positive `distance` returns the input unchanged. A NaN
/// `distance` or a non-finite point is rejected.
pub fn merge_points(
    points: Vec<Point>,
    distance: Value,
    config: &MergeConfig,
) -> Result<MergeOutcome> {
    if distance.is_nan() {
        return Err(ProbePlacementError::NonFiniteInput {
            what: "merge distance",
        });
    }
    if points.iter().any(|p| !p.iter().all(|v| v.is_finite())) {
        return Err(ProbePlacementError::NonFiniteInput {
            what: "probe position",
        });
    }
    if points.is_empty() || distance <= 0. {
        return Ok(MergeOutcome {
            points,
            ..Default::default()
        });
    }

    let original = points.len();
    let mut current = points;
    let mut passes = 0;
    loop {
        if config.max_passes.is_some_and(|max| passes >= max) {
            return Err(ProbePlacementError::MergeDidNotConverge { passes });
        }
        current = merge_pass(&current, distance, config.dedup);
        passes += 1;
        if is_separated(&current, distance) {
            break;
        }
    }

    let removed = original - current.len();
    debug!("merged {original} probes into {} over {passes} passes", current.len());
    Ok(MergeOutcome {
        points: current,
        removed,
        passes,
    })
}

/// [`merge_points`] with the default [`MergeConfig`].
pub fn merge_closest(points: Vec<Point>, distance: Value) -> Result<MergeOutcome> {
    merge_points(points, distance, &MergeConfig::default())
}

/// One clustering pass: seed keys in order, then replace every key's neighborhood by its centroid.
fn merge_pass(points: &[Point], distance: Value, dedup: CentroidDedup) -> Vec<Point> {
    let mut keys: Vec<usize> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if !keys.iter().any(|&k| dedup.same(&points[k], p)) {
            keys.push(i);
        }
    }

    let centroids: Vec<Point> = keys
        .par_iter()
        .map(|&k| {
            let key = points[k];
            let (sum, count) = points
                .iter()
                .filter(|p| (**p - key).norm() < distance)
                .fold((Vector::zeros(), 0_usize), |(sum, n), p| (sum + p.coords, n + 1));
            Point::from(sum / count as Value)
        })
        .collect();

    let mut merged: Vec<Point> = Vec::with_capacity(centroids.len());
    for c in centroids {
        if !merged.iter().any(|m| dedup.same(m, &c)) {
            merged.push(c);
        }
    }
    merged
}

/// Returns `true` if no two distinct points are closer than `distance`.
fn is_separated(points: &[Point], distance: Value) -> bool {
    (0..points.len()).into_par_iter().all(|i| {
        points
            .iter()
            .enumerate()
            .all(|(j, q)| i == j || (*q - points[i]).norm() >= distance)
    })
}
