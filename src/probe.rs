use crate::{
    query::SceneQuery,
    types::{Density, LayerMask, Point, Value, Vector},
};

/// Radius of the overlap sphere used to test whether a sample sits inside geometry.
pub const OVERLAP_RADIUS: Value = 0.01;

/// How far a relocated sample is pulled back from the surface it was projected onto.
pub const SURFACE_OFFSET: Value = 0.1;

/// Escape directions tried, in order, when a sample is inside geometry.
///
/// ```text
/// up (+Y), back (-Z), forward (+Z), left (-X), right (+X)
/// ```
pub const WIGGLE_DIRECTIONS: [[Value; 3]; 5] = [
    [0., 1., 0.],
    [0., 0., -1.],
    [0., 0., 1.],
    [-1., 0., 0.],
    [1., 0., 0.],
];

/// Outcome of probing a single sample against the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The sample was already in free space.
    Free(Point),
    /// The sample was inside geometry and was moved just outside the nearest surface.
    Relocated(Point),
    /// The sample could not be moved out of geometry. Holds the original point.
    Blocked(Point),
}

impl Resolution {
    pub fn point(&self) -> Point {
        match *self {
            Resolution::Free(p) | Resolution::Relocated(p) | Resolution::Blocked(p) => p,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Resolution::Blocked(_))
    }

    /// The point to keep, or `None` if the sample should be dropped.
    pub fn surviving(self) -> Option<Point> {
        match self {
            Resolution::Free(p) | Resolution::Relocated(p) => Some(p),
            Resolution::Blocked(_) => None,
        }
    }
}

/// Tests `point` against the scene and, if it is inside geometry, tries to push it out.
///
/// The first wiggle direction whose displaced point (`0.5 * |density|` away) is free
/// is used to cast a ray back towards `point`. A hit relocates the sample to
/// [`SURFACE_OFFSET`] in front of the surface. A miss, or no free direction at all,
/// blocks the sample.
///
/// Callers are expected to hold a [`QueryScope`](crate::query::QueryScope) so
/// back faces are reported.
pub fn resolve<Q: SceneQuery + ?Sized>(
    query: &Q,
    point: Point,
    density: &Density,
    layers: LayerMask,
) -> Resolution {
    if !query.overlaps(point, OVERLAP_RADIUS, layers) {
        return Resolution::Free(point);
    }

    let reach = density.magnitude();
    let Some(wiggled) = WIGGLE_DIRECTIONS
        .iter()
        .map(|d| point + Vector::from(*d) * reach * 0.5)
        .find(|p| !query.overlaps(*p, OVERLAP_RADIUS, layers))
    else {
        return Resolution::Blocked(point);
    };

    let Some(direction) = (point - wiggled).try_normalize(Value::EPSILON) else {
        return Resolution::Blocked(point);
    };

    match query.raycast(wiggled, direction, reach, layers) {
        Some(hit) => Resolution::Relocated(hit - direction * SURFACE_OFFSET),
        None => Resolution::Blocked(point),
    }
}
