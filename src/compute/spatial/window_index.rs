//! R*-tree over the members of a sliding time window.
//!
//! Members are indexed by their Earth-centred cartesian position (km). A
//! surface radius `d` maps to a straight-line radius `chord_km(d)`, so the
//! cube of half-width `chord_km(d)` around a query point contains every
//! member within `d` along the surface. Candidates from the cube still need
//! an exact haversine check.

use super::distance::chord_km;
use rstar::{AABB, Point as RstarPoint, RTree};

/// Relative slack on the query envelope against rounding at the boundary.
const ENVELOPE_SLACK: f64 = 1e-9;

/// Position of one window member, tagged with its slot in the time-sorted
/// event list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPoint {
    pub xyz: [f64; 3],
    pub slot: usize,
}

impl WindowPoint {
    pub fn new(xyz: [f64; 3], slot: usize) -> Self {
        Self { xyz, slot }
    }
}

impl RstarPoint for WindowPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            xyz: [generator(0), generator(1), generator(2)],
            slot: usize::MAX,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.xyz[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.xyz[index]
    }
}

/// Spatial index of the events currently inside the time window.
#[derive(Debug, Default)]
pub struct WindowIndex {
    tree: RTree<WindowPoint>,
}

impl WindowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: WindowPoint) {
        self.tree.insert(point);
    }

    /// Remove a member that left the window.
    pub fn remove(&mut self, point: &WindowPoint) -> bool {
        self.tree.remove(point).is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Slots of members that may lie within `surface_km` of `center`.
    /// A superset of the exact answer.
    pub fn candidates(&self, center: [f64; 3], surface_km: f64) -> Vec<usize> {
        let reach = chord_km(surface_km) * (1.0 + ENVELOPE_SLACK) + ENVELOPE_SLACK;
        let envelope = AABB::from_corners(
            WindowPoint::new(
                [center[0] - reach, center[1] - reach, center[2] - reach],
                usize::MAX,
            ),
            WindowPoint::new(
                [center[0] + reach, center[1] + reach, center[2] + reach],
                usize::MAX,
            ),
        );

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|p| p.slot)
            .collect()
    }
}
