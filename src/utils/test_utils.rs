use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::io::input::{LandmarkSet, LandmarkStore};
use crate::processing::{MeshResolution, TriangulatedSurface};

/// Single counter-clockwise triangle in the XY plane.
pub fn unit_triangle() -> TriangulatedSurface {
    TriangulatedSurface::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
}

/// Low resolution that keeps mesh-heavy tests fast.
pub fn coarse_resolution() -> MeshResolution {
    MeshResolution {
        tube_sides: 12,
        ellipsoid_u: 12,
        ellipsoid_v: 8,
        cylinder_sides: 12,
    }
}

/// `count` seeded directions, none shorter than 1e-6.
pub fn random_directions(seed: u64, count: usize) -> Vec<Vector3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let d = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if d.norm() >= 1e-6 {
            out.push(d);
        }
    }
    out
}

/// A visible plan with a straight LiTT trajectory `L` -> `L_1` along +Z and an
/// oblique SEEG trajectory `A` -> `A_1`, plus a hidden set shadowing `A`.
pub fn sample_store() -> LandmarkStore {
    let mut hidden = LandmarkSet::new("old plan").with_visibility(false);
    hidden.push("A", Point3::new(-100.0, -100.0, -100.0));

    let mut plan = LandmarkSet::new("plan");
    plan.push("L", Point3::new(0.0, 0.0, 0.0));
    plan.push("L_1", Point3::new(0.0, 0.0, 100.0));
    plan.push("A", Point3::new(60.0, 10.0, 20.0));
    plan.push("A_1", Point3::new(20.0, 10.0, 50.0));

    let mut store = LandmarkStore::new();
    store.add_set(hidden);
    store.add_set(plan);
    store
}
