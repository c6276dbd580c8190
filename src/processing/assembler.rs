use nalgebra::Point3;

use super::frame::Frame;
use super::solids::{
    build_contact_stack, ellipsoid_center, ContactStack, ContactStackParams, GeometrySpec,
    MeshResolution,
};
use super::surface::TriangulatedSurface;
use super::vector_math::EPSILON;

/// Entry → target segment that all models of one trajectory hang off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryLine {
    pub entry: Point3<f64>,
    pub target: Point3<f64>,
}

impl TrajectoryLine {
    pub fn new(entry: Point3<f64>, target: Point3<f64>) -> Self {
        Self { entry, target }
    }

    pub fn frame(&self) -> Frame {
        Frame::build(&(self.target - self.entry))
    }

    pub fn length(&self) -> f64 {
        distance_between(&self.entry, &self.target)
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.entry, &self.target)
    }
}

/// LiTT dimensions in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct NecrosisParams {
    pub fiber_diameter: f64,
    /// Distances from the target to the near face of each ellipsoid.
    pub offsets: Vec<f64>,
    pub necrosis_diameter: f64,
    pub necrosis_length: f64,
}

/// Fiber tube plus one ellipsoid per requested offset.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberModel {
    pub line: TrajectoryLine,
    pub fiber: TriangulatedSurface,
    pub necroses: Vec<TriangulatedSurface>,
    /// Ellipsoid centers, in the same order as `necroses`.
    pub necrosis_centers: Vec<Point3<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectrodeModel {
    pub line: TrajectoryLine,
    pub stack: ContactStack,
}

pub fn distance_between(entry: &Point3<f64>, target: &Point3<f64>) -> f64 {
    nalgebra::distance(entry, target)
}

/// Builds the laser fiber and the necrosis ellipsoids for one trajectory.
///
/// An empty offset list behaves like a single offset of 0 mm.
pub fn build_fiber_and_necrosis(
    entry: &Point3<f64>,
    target: &Point3<f64>,
    params: &NecrosisParams,
    resolution: &MeshResolution,
) -> FiberModel {
    let line = TrajectoryLine::new(*entry, *target);
    let frame = line.frame();
    if line.length() < EPSILON {
        log::warn!("entry and target coincide, orienting models along +Z");
    }

    let fiber = GeometrySpec::Tube {
        start: *entry,
        end: *target,
        radius: params.fiber_diameter * 0.5,
    }
    .build(resolution);

    let offsets: &[f64] = if params.offsets.is_empty() {
        &[0.0]
    } else {
        &params.offsets
    };
    let radius_major = params.necrosis_length * 0.5;

    let necrosis_centers: Vec<Point3<f64>> = offsets
        .iter()
        .map(|&offset| ellipsoid_center(target, &frame.axis, offset, radius_major))
        .collect();
    let necroses = necrosis_centers
        .iter()
        .map(|center| {
            GeometrySpec::Ellipsoid {
                center: *center,
                frame,
                radius_minor: params.necrosis_diameter * 0.5,
                radius_major,
            }
            .build(resolution)
        })
        .collect::<Vec<_>>();

    log::info!(
        "built fiber ({:.1} mm) with {} necrosis ellipsoid(s)",
        line.length(),
        necroses.len()
    );

    FiberModel {
        line,
        fiber,
        necroses,
        necrosis_centers,
    }
}

/// Builds an SEEG electrode (shaft + contacts) from entry to target.
pub fn build_seeg_electrode(
    entry: &Point3<f64>,
    target: &Point3<f64>,
    params: &ContactStackParams,
    resolution: &MeshResolution,
) -> ElectrodeModel {
    let line = TrajectoryLine::new(*entry, *target);
    let stack = build_contact_stack(entry, target, params, resolution);
    log::info!(
        "built electrode with {} contacts over {:.1} mm",
        params.contact_count,
        line.length()
    );
    ElectrodeModel { line, stack }
}

/// Length covered by `n` contacts and the gaps between them.
pub fn contact_coverage(n: usize, contact_length: f64, gap_length: f64) -> f64 {
    n as f64 * contact_length + n.saturating_sub(1) as f64 * gap_length
}

/// Smallest allowed contact count whose coverage reaches `distance`.
///
/// Falls back to the largest allowed count when none covers it, and to 0 when
/// `allowed` is empty.
pub fn suggest_contact_count(
    distance: f64,
    allowed: &[usize],
    contact_length: f64,
    gap_length: f64,
) -> usize {
    let mut sorted = allowed.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|&n| contact_coverage(n, contact_length, gap_length) >= distance - 1e-6)
        .or_else(|| sorted.last().copied())
        .unwrap_or(0)
}

#[cfg(test)]
mod assembler_tests {
    use super::*;
    use crate::utils::test_utils::coarse_resolution;
    use approx::assert_relative_eq;

    const ALLOWED: [usize; 6] = [5, 8, 10, 12, 15, 18];

    fn litt_params(offsets: Vec<f64>) -> NecrosisParams {
        NecrosisParams {
            fiber_diameter: 1.65,
            offsets,
            necrosis_diameter: 12.0,
            necrosis_length: 30.0,
        }
    }

    #[test]
    fn test_necrosis_center_with_offset() {
        let model = build_fiber_and_necrosis(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 100.0),
            &litt_params(vec![10.0]),
            &coarse_resolution(),
        );
        assert_eq!(model.necroses.len(), 1);
        assert_relative_eq!(model.necrosis_centers[0], Point3::new(0.0, 0.0, 75.0), epsilon = 1e-6);
        assert_relative_eq!(
            model.necroses[0].centroid().unwrap(),
            Point3::new(0.0, 0.0, 75.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_negative_offset_clamps_to_zero() {
        let model = build_fiber_and_necrosis(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 100.0),
            &litt_params(vec![-50.0]),
            &coarse_resolution(),
        );
        assert_relative_eq!(model.necrosis_centers[0], Point3::new(0.0, 0.0, 85.0), epsilon = 1e-6);
    }

    #[test]
    fn test_multiple_and_default_offsets() {
        let entry = Point3::new(0.0, 0.0, 0.0);
        let target = Point3::new(0.0, 0.0, 100.0);
        let res = coarse_resolution();
        let many =
            build_fiber_and_necrosis(&entry, &target, &litt_params(vec![0.0, 10.0, 20.0]), &res);
        assert_eq!(many.necroses.len(), 3);
        let zs: Vec<f64> = many.necrosis_centers.iter().map(|c| c.z).collect();
        assert_relative_eq!(zs[0], 85.0, epsilon = 1e-9);
        assert_relative_eq!(zs[1], 75.0, epsilon = 1e-9);
        assert_relative_eq!(zs[2], 65.0, epsilon = 1e-9);

        let default = build_fiber_and_necrosis(&entry, &target, &litt_params(Vec::new()), &res);
        assert_eq!(default.necroses.len(), 1);
        assert_relative_eq!(default.necrosis_centers[0].z, 85.0, epsilon = 1e-9);
        assert!(!default.fiber.is_empty());
    }

    #[test]
    fn test_coincident_points_still_build() {
        let p = Point3::new(5.0, 5.0, 5.0);
        let model = build_fiber_and_necrosis(&p, &p, &litt_params(vec![0.0]), &coarse_resolution());
        assert!(model.fiber.has_valid_faces());
        // fallback axis is +Z, ellipsoid sits below the target
        assert_relative_eq!(
            model.necrosis_centers[0],
            Point3::new(5.0, 5.0, -10.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_seeg_electrode_passes_through() {
        let params = ContactStackParams {
            contact_count: 4,
            contact_length: 2.0,
            gap_length: 1.5,
            contact_radius: 0.4,
            shaft_radius: 0.7,
        };
        let model = build_seeg_electrode(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 100.0),
            &params,
            &coarse_resolution(),
        );
        assert_relative_eq!(model.line.length(), 100.0, epsilon = 1e-9);
        assert_eq!(model.stack.contact_centers.len(), 4);
        assert_relative_eq!(
            model.stack.contact_centers[3].z,
            100.0 - (1.0 + 3.5 * 3.0),
            epsilon = 1e-9
        );
    }

    fn brute_force(distance: f64, allowed: &[usize], cl: f64, gap: f64) -> usize {
        let mut best: Option<usize> = None;
        for &n in allowed {
            let covered = n as f64 * cl + (n.max(1) - 1) as f64 * gap;
            if covered >= distance - 1e-6 && best.map_or(true, |b| n < b) {
                best = Some(n);
            }
        }
        best.unwrap_or_else(|| *allowed.iter().max().unwrap())
    }

    #[test]
    fn test_suggest_contact_count_reference_case() {
        // 18 contacts cover 18*2 + 17*1.5 = 61.5 mm, short of 100 mm
        assert_eq!(suggest_contact_count(100.0, &ALLOWED, 2.0, 1.5), 18);
        // 10 contacts cover exactly 10*2 + 9*1.5 = 33.5 mm
        assert_eq!(suggest_contact_count(33.5, &ALLOWED, 2.0, 1.5), 10);
        assert_eq!(suggest_contact_count(33.6, &ALLOWED, 2.0, 1.5), 12);
    }

    #[test]
    fn test_suggest_contact_count_matches_brute_force() {
        let cases = [
            (10.0, 1.5, 2.0),
            (42.0, 2.0, 1.5),
            (55.0, 2.0, 1.5),
            (61.5, 2.0, 1.5),
            (1.0, 0.5, 0.5),
            (500.0, 2.0, 3.5),
        ];
        for &(distance, cl, gap) in &cases {
            assert_eq!(
                suggest_contact_count(distance, &ALLOWED, cl, gap),
                brute_force(distance, &ALLOWED, cl, gap),
                "distance={} contact_length={} gap={}",
                distance,
                cl,
                gap
            );
        }
        assert_eq!(suggest_contact_count(500.0, &ALLOWED, 2.0, 3.5), 18);
    }

    #[test]
    fn test_suggest_contact_count_unsorted_and_empty() {
        assert_eq!(suggest_contact_count(20.0, &[12, 5, 8], 1.5, 2.0), 8);
        assert_eq!(suggest_contact_count(20.0, &[], 1.5, 2.0), 0);
    }

    #[test]
    fn test_distance_between() {
        let d = distance_between(&Point3::new(1.0, 2.0, 3.0), &Point3::new(4.0, 6.0, 3.0));
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }
}
