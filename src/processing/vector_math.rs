use nalgebra::{Unit, Vector3};

/// Vectors shorter than this are treated as zero length.
pub const EPSILON: f64 = 1e-9;

/// Normalizes `v`, falling back to +Z when `v` has (near) zero length.
pub fn unit(v: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let norm = v.norm();
    if norm < EPSILON {
        Vector3::z_axis()
    } else {
        Unit::new_unchecked(v / norm)
    }
}

/// Rodrigues' rotation of `v` around `axis` by `angle_rad`.
///
/// `axis` is expected to be unit length already; it is not renormalized here,
/// so chained rotations compose without hidden rescaling.
pub fn rotate_around_axis(v: &Vector3<f64>, axis: &Vector3<f64>, angle_rad: f64) -> Vector3<f64> {
    let (s, c) = angle_rad.sin_cos();
    let dot = axis.dot(v);
    let cross = axis.cross(v);
    v * c + cross * s + axis * (dot * (1.0 - c))
}

/// Angle between `a` and `b` in degrees.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let ua = unit(a);
    let ub = unit(b);
    ua.dot(&*ub).clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod vector_math_tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_unit_normalizes() {
        let u = unit(&Vector3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(u.x, 0.6, epsilon = 1e-12);
        assert_relative_eq!(u.z, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_zero_falls_back_to_z() {
        let u = unit(&Vector3::zeros());
        assert_eq!(u.into_inner(), Vector3::new(0.0, 0.0, 1.0));

        let tiny = unit(&Vector3::new(1e-12, 0.0, 0.0));
        assert_eq!(tiny.into_inner(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_rotate_around_z_quarter_turn() {
        let r = rotate_around_axis(&Vector3::x(), &Vector3::z(), FRAC_PI_2);
        assert_relative_eq!(r, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_keeps_component_along_axis() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let axis = Vector3::new(1.0, 1.0, 0.0).normalize();
        let r = rotate_around_axis(&v, &axis, 1.234);
        assert_relative_eq!(r.dot(&axis), v.dot(&axis), epsilon = 1e-12);
        assert_relative_eq!(r.norm(), v.norm(), epsilon = 1e-12);
    }

    #[test]
    fn test_angle_between_clamps() {
        let a = Vector3::new(1.0, 1e-17, 0.0);
        assert_relative_eq!(angle_between(&a, &a), 0.0, epsilon = 1e-6);
        assert!(!angle_between(&a, &a).is_nan());
        assert_relative_eq!(angle_between(&Vector3::x(), &-Vector3::x()), 180.0, epsilon = 1e-9);
        assert_relative_eq!(angle_between(&Vector3::x(), &Vector3::y()), 90.0, epsilon = 1e-9);
    }
}
