use nalgebra::{Unit, Vector3};

use super::vector_math::unit;

/// Above this |axis · Z| the global Z axis is considered too close to the
/// trajectory to serve as cross-product reference, and Y is used instead.
const REFERENCE_SWITCH: f64 = 0.95;

/// Cross-product magnitudes below this count as parallel to Z.
const PARALLEL_EPS: f64 = 1e-12;

/// Right-handed orthonormal frame attached to a trajectory axis.
///
/// `transverse_v == axis × transverse_u` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub axis: Unit<Vector3<f64>>,
    pub transverse_u: Unit<Vector3<f64>>,
    pub transverse_v: Unit<Vector3<f64>>,
}

impl Frame {
    /// Builds the frame for `direction`, which need not be normalized.
    ///
    /// A zero direction resolves to the +Z fallback axis, giving a
    /// reproducible frame instead of an error.
    pub fn build(direction: &Vector3<f64>) -> Self {
        let axis = unit(direction);
        let reference = reference_for(&axis);
        let transverse_u = unit(&axis.cross(&reference));
        let transverse_v = unit(&axis.cross(&*transverse_u));
        Frame {
            axis,
            transverse_u,
            transverse_v,
        }
    }
}

/// Global reference vector used to derive the transverse directions.
pub fn reference_for(axis: &Vector3<f64>) -> Vector3<f64> {
    if axis.dot(&Vector3::z()).abs() > REFERENCE_SWITCH {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

/// Axis-angle rotation (degrees, unit axis) taking +Z onto `direction`.
///
/// When `direction` is parallel to Z the rotation axis is undefined and +X is
/// returned: the angle is then 0° (already aligned) or 180° (anti-parallel),
/// both valid rotations about X.
pub fn rotation_to_align_z_with_axis(direction: &Vector3<f64>) -> (f64, Unit<Vector3<f64>>) {
    let target = unit(direction);
    let z = Vector3::z();
    let cross = z.cross(&*target);
    let sin = cross.norm();
    let cos = z.dot(&*target).clamp(-1.0, 1.0);
    let angle = cos.acos().to_degrees();
    if sin < PARALLEL_EPS {
        (angle, Vector3::x_axis())
    } else {
        (angle, Unit::new_unchecked(cross / sin))
    }
}
