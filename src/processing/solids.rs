use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use std::f64::consts::PI;

use super::frame::{rotation_to_align_z_with_axis, Frame};
use super::surface::TriangulatedSurface;
use super::vector_math::unit;

/// Smallest radius (and contact height) used for mesh construction, in mm.
pub const MIN_RADIUS: f64 = 0.01;

pub fn floor_radius(r: f64) -> f64 {
    r.max(MIN_RADIUS)
}

/// Tessellation density for the generated solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshResolution {
    pub tube_sides: usize,
    pub ellipsoid_u: usize,
    pub ellipsoid_v: usize,
    pub cylinder_sides: usize,
}

impl Default for MeshResolution {
    fn default() -> Self {
        Self {
            tube_sides: 64,
            ellipsoid_u: 64,
            ellipsoid_v: 64,
            cylinder_sides: 64,
        }
    }
}

impl MeshResolution {
    /// Same density for every solid.
    pub fn uniform(sides: usize) -> Self {
        Self {
            tube_sides: sides,
            ellipsoid_u: sides,
            ellipsoid_v: sides,
            cylinder_sides: sides,
        }
    }
}

/// Electrode dimensions, all in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactStackParams {
    pub contact_count: usize,
    pub contact_length: f64,
    pub gap_length: f64,
    pub contact_radius: f64,
    pub shaft_radius: f64,
}

/// Electrode model: the shaft with contacts appended, plus the contacts alone
/// for independent coloring. Both share the exact same contact geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactStack {
    pub shaft_and_contacts: TriangulatedSurface,
    pub contacts: TriangulatedSurface,
    /// Contact centers, index 0 nearest the target.
    pub contact_centers: Vec<Point3<f64>>,
}

/// One solid to build, with its placement.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySpec {
    Tube {
        start: Point3<f64>,
        end: Point3<f64>,
        radius: f64,
    },
    Ellipsoid {
        center: Point3<f64>,
        frame: Frame,
        radius_minor: f64,
        radius_major: f64,
    },
    ContactStack {
        entry: Point3<f64>,
        target: Point3<f64>,
        params: ContactStackParams,
    },
}

impl GeometrySpec {
    /// Builds the solid. For a contact stack this is the shaft plus contacts.
    pub fn build(&self, resolution: &MeshResolution) -> TriangulatedSurface {
        match self {
            GeometrySpec::Tube { start, end, radius } => {
                build_tube(start, end, *radius, resolution.tube_sides)
            }
            GeometrySpec::Ellipsoid {
                center,
                frame,
                radius_minor,
                radius_major,
            } => build_ellipsoid(
                center,
                frame,
                *radius_minor,
                *radius_major,
                resolution.ellipsoid_u,
                resolution.ellipsoid_v,
            ),
            GeometrySpec::ContactStack {
                entry,
                target,
                params,
            } => build_contact_stack(entry, target, params, resolution).shaft_and_contacts,
        }
    }
}

/// Rigid transform placing a Z-aligned primitive at `center`, rotated onto `axis`.
pub fn alignment_isometry(axis: &Vector3<f64>, center: &Point3<f64>) -> Isometry3<f64> {
    let (angle_deg, rot_axis) = rotation_to_align_z_with_axis(axis);
    Isometry3::from_parts(
        Translation3::from(center.coords),
        UnitQuaternion::from_axis_angle(&rot_axis, angle_deg.to_radians()),
    )
}

/// Capped tube from `start` to `end`.
///
/// The radius is floored at [`MIN_RADIUS`]; coincident end points still give
/// a well-formed (zero-length) mesh oriented along the +Z fallback.
pub fn build_tube(
    start: &Point3<f64>,
    end: &Point3<f64>,
    radius: f64,
    sides: usize,
) -> TriangulatedSurface {
    let sides = sides.max(3);
    let radius = floor_radius(radius);
    let frame = Frame::build(&(end - start));

    let ring = |center: &Point3<f64>| -> Vec<Point3<f64>> {
        (0..sides)
            .map(|j| {
                let theta = 2.0 * PI * j as f64 / sides as f64;
                center
                    + (frame.transverse_u.into_inner() * theta.cos()
                        + frame.transverse_v.into_inner() * theta.sin())
                        * radius
            })
            .collect()
    };

    let mut vertices = ring(start);
    vertices.extend(ring(end));
    let start_center = vertices.len();
    vertices.push(*start);
    let end_center = vertices.len();
    vertices.push(*end);

    let mut faces = Vec::with_capacity(4 * sides);
    for j in 0..sides {
        let j_next = (j + 1) % sides;
        let (a0, a1) = (j, j_next);
        let (b0, b1) = (sides + j, sides + j_next);
        faces.push([a0, a1, b0]);
        faces.push([b0, a1, b1]);
        // caps: start faces against the axis, end faces along it
        faces.push([start_center, a1, a0]);
        faces.push([end_center, b0, b1]);
    }

    TriangulatedSurface::new(vertices, faces)
}

/// Z-aligned ellipsoid centered at the origin.
fn canonical_ellipsoid(
    radius_xy: f64,
    radius_z: f64,
    u_resolution: usize,
    v_resolution: usize,
) -> TriangulatedSurface {
    let u_res = u_resolution.max(3);
    let v_res = v_resolution.max(2);

    let mut vertices = Vec::with_capacity(u_res * (v_res - 1) + 2);
    vertices.push(Point3::new(0.0, 0.0, radius_z));
    for k in 1..v_res {
        let phi = PI * k as f64 / v_res as f64;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for j in 0..u_res {
            let theta = 2.0 * PI * j as f64 / u_res as f64;
            vertices.push(Point3::new(
                radius_xy * sin_phi * theta.cos(),
                radius_xy * sin_phi * theta.sin(),
                radius_z * cos_phi,
            ));
        }
    }
    let south = vertices.len();
    vertices.push(Point3::new(0.0, 0.0, -radius_z));

    let ring_start = |k: usize| 1 + (k - 1) * u_res;
    let mut faces = Vec::with_capacity(2 * u_res * (v_res - 1));
    for j in 0..u_res {
        let j_next = (j + 1) % u_res;
        faces.push([0, ring_start(1) + j, ring_start(1) + j_next]);
    }
    for k in 1..(v_res - 1) {
        let upper = ring_start(k);
        let lower = ring_start(k + 1);
        for j in 0..u_res {
            let j_next = (j + 1) % u_res;
            faces.push([upper + j, lower + j, lower + j_next]);
            faces.push([upper + j, lower + j_next, upper + j_next]);
        }
    }
    let last = ring_start(v_res - 1);
    for j in 0..u_res {
        let j_next = (j + 1) % u_res;
        faces.push([south, last + j_next, last + j]);
    }

    TriangulatedSurface::new(vertices, faces)
}

/// Ellipsoid with `radius_minor` across the axis and `radius_major` along it.
pub fn build_ellipsoid(
    center: &Point3<f64>,
    frame: &Frame,
    radius_minor: f64,
    radius_major: f64,
    u_resolution: usize,
    v_resolution: usize,
) -> TriangulatedSurface {
    let radius_minor = floor_radius(radius_minor);
    let radius_major = floor_radius(radius_major);
    canonical_ellipsoid(radius_minor, radius_major, u_resolution, v_resolution)
        .transformed(&alignment_isometry(&frame.axis, center))
}

/// Center of a necrosis ellipsoid whose near face sits `max(offset, 0)` mm
/// from `target`, on the entry side.
pub fn ellipsoid_center(
    target: &Point3<f64>,
    axis: &Vector3<f64>,
    offset: f64,
    radius_major: f64,
) -> Point3<f64> {
    let distance = offset.max(0.0) + floor_radius(radius_major);
    target - axis * distance
}

/// Center of contact `index`, counted from the target toward the entry.
pub fn contact_center(
    target: &Point3<f64>,
    axis: &Vector3<f64>,
    index: usize,
    contact_length: f64,
    gap_length: f64,
) -> Point3<f64> {
    let step = contact_length + gap_length;
    target - axis * (contact_length * 0.5 + step * index as f64)
}

/// Builds the electrode shaft (entry → target) and its contact cylinders.
pub fn build_contact_stack(
    entry: &Point3<f64>,
    target: &Point3<f64>,
    params: &ContactStackParams,
    resolution: &MeshResolution,
) -> ContactStack {
    let axis = unit(&(target - entry)).into_inner();
    let half_height = floor_radius(params.contact_length) * 0.5;
    let cylinder = build_tube(
        &Point3::new(0.0, 0.0, -half_height),
        &Point3::new(0.0, 0.0, half_height),
        params.contact_radius,
        resolution.cylinder_sides,
    );

    let contact_centers: Vec<Point3<f64>> = (0..params.contact_count)
        .map(|i| contact_center(target, &axis, i, params.contact_length, params.gap_length))
        .collect();

    let mut contacts = TriangulatedSurface::default();
    for center in &contact_centers {
        contacts.append(&cylinder.clone().transformed(&alignment_isometry(&axis, center)));
    }

    let mut shaft_and_contacts =
        build_tube(entry, target, params.shaft_radius, resolution.tube_sides);
    shaft_and_contacts.append(&contacts);

    ContactStack {
        shaft_and_contacts,
        contacts,
        contact_centers,
    }
}
