use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::frame::Frame;
use super::vector_math::{rotate_around_axis, unit};

/// The three slice views of the host's MPR layout.
///
/// Red is perpendicular to the trajectory, Green and Yellow contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceView {
    Red,
    Green,
    Yellow,
}

impl SliceView {
    pub const ALL: [SliceView; 3] = [SliceView::Red, SliceView::Green, SliceView::Yellow];

    pub fn as_str(&self) -> &'static str {
        match self {
            SliceView::Red => "Red",
            SliceView::Green => "Green",
            SliceView::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for SliceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SliceView {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(SliceView::Red),
            "green" => Ok(SliceView::Green),
            "yellow" => Ok(SliceView::Yellow),
            other => Err(anyhow::anyhow!("unknown slice view '{}'", other)),
        }
    }
}

/// Slice-to-world pose of one view.
///
/// Columns of the 4x4 matrix: in-plane X, in-plane Y, normal, origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlanePose {
    pub view: SliceView,
    pub matrix: Matrix4<f64>,
}

impl SlicePlanePose {
    pub fn from_columns(
        view: SliceView,
        x: &Vector3<f64>,
        y: &Vector3<f64>,
        normal: &Vector3<f64>,
        origin: &Point3<f64>,
    ) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 1>(0, 0).copy_from(x);
        matrix.fixed_view_mut::<3, 1>(0, 1).copy_from(y);
        matrix.fixed_view_mut::<3, 1>(0, 2).copy_from(normal);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);
        SlicePlanePose { view, matrix }
    }

    fn column(&self, i: usize) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, i).into_owned()
    }

    pub fn x_axis(&self) -> Vector3<f64> {
        self.column(0)
    }

    pub fn y_axis(&self) -> Vector3<f64> {
        self.column(1)
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.column(2)
    }

    pub fn origin(&self) -> Point3<f64> {
        Point3::from(self.column(3))
    }

    /// Determinant of the rotation block; +1 for a right-handed pose.
    pub fn handedness(&self) -> f64 {
        self.matrix.fixed_view::<3, 3>(0, 0).clone_owned().determinant()
    }

    /// Row-major copy, the layout hosts usually expect.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }
}

/// Poses of all three views for one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoses {
    pub red: SlicePlanePose,
    pub green: SlicePlanePose,
    pub yellow: SlicePlanePose,
}

impl TrajectoryPoses {
    pub fn get(&self, view: SliceView) -> &SlicePlanePose {
        match view {
            SliceView::Red => &self.red,
            SliceView::Green => &self.green,
            SliceView::Yellow => &self.yellow,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlicePlanePose> {
        [&self.red, &self.green, &self.yellow].into_iter()
    }
}

/// Builds a pose from a plane normal and in-plane X, negating both for
/// mirrored views so the basis stays right-handed.
fn view_pose(
    view: SliceView,
    normal: &Vector3<f64>,
    transverse: &Vector3<f64>,
    center: &Point3<f64>,
    mirrored: bool,
) -> SlicePlanePose {
    let (mut n, mut t) = (unit(normal).into_inner(), unit(transverse).into_inner());
    if mirrored {
        n = -n;
        t = -t;
    }
    let y = unit(&n.cross(&t)).into_inner();
    SlicePlanePose::from_columns(view, &t, &y, &n, center)
}

/// Trajectory-aligned MPR state for one planning session.
///
/// Baseline poses are captured by [`create_trajectory_poses`] and never
/// modified afterwards; rotations always start from them, so a rotation
/// angle is absolute and repeated calls do not accumulate error.
///
/// [`create_trajectory_poses`]: SlicePoseController::create_trajectory_poses
#[derive(Debug, Clone, Default)]
pub struct SlicePoseController {
    mirrored: BTreeSet<SliceView>,
    frame: Option<Frame>,
    center: Option<Point3<f64>>,
    baseline: BTreeMap<SliceView, SlicePlanePose>,
    current: BTreeMap<SliceView, SlicePlanePose>,
}

impl SlicePoseController {
    /// Controller with the default display convention (Green and Yellow mirrored).
    pub fn new() -> Self {
        Self::with_mirrored_views([SliceView::Green, SliceView::Yellow])
    }

    pub fn with_mirrored_views(views: impl IntoIterator<Item = SliceView>) -> Self {
        Self {
            mirrored: views.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn is_mirrored(&self, view: SliceView) -> bool {
        self.mirrored.contains(&view)
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn center(&self) -> Option<Point3<f64>> {
        self.center
    }

    pub fn pose(&self, view: SliceView) -> Option<&SlicePlanePose> {
        self.current.get(&view)
    }

    pub fn baseline(&self, view: SliceView) -> Option<&SlicePlanePose> {
        self.baseline.get(&view)
    }

    fn poses_for(
        &self,
        axis: &Vector3<f64>,
        v: &Vector3<f64>,
        w: &Vector3<f64>,
        center: &Point3<f64>,
    ) -> TrajectoryPoses {
        let pose = |view: SliceView, x: &Vector3<f64>, y: &Vector3<f64>| {
            view_pose(view, x, y, center, self.is_mirrored(view))
        };
        TrajectoryPoses {
            red: pose(SliceView::Red, axis, v),
            green: pose(SliceView::Green, v, axis),
            yellow: pose(SliceView::Yellow, w, axis),
        }
    }

    /// Computes the three trajectory-aligned poses centered on the
    /// entry/target midpoint and stores them as the rotation baseline.
    pub fn create_trajectory_poses(
        &mut self,
        entry: &Point3<f64>,
        target: &Point3<f64>,
    ) -> TrajectoryPoses {
        let frame = Frame::build(&(target - entry));
        let center = nalgebra::center(entry, target);
        let poses = self.poses_for(&frame.axis, &frame.transverse_u, &frame.transverse_v, &center);

        log::debug!(
            "MPR frame axis={:?} center={:?}",
            frame.axis.into_inner(),
            center.coords
        );

        self.frame = Some(frame);
        self.center = Some(center);
        self.baseline = poses.iter().map(|p| (p.view, *p)).collect();
        self.current = self.baseline.clone();
        poses
    }

    /// Sets the absolute in-plane rotation of `view` to `angle_deg`.
    ///
    /// Normal and origin are copied from the baseline unchanged. Returns
    /// `None` (and changes nothing) before poses have been created.
    pub fn rotate_view_in_plane(
        &mut self,
        view: SliceView,
        angle_deg: f64,
    ) -> Option<SlicePlanePose> {
        let Some(base) = self.baseline.get(&view) else {
            log::warn!("in-plane rotation of {} requested before MPR creation", view);
            return None;
        };

        let (s, c) = angle_deg.to_radians().sin_cos();
        let (x0, y0) = (base.x_axis(), base.y_axis());
        let x = x0 * c + y0 * s;
        let y = x0 * -s + y0 * c;

        let mut rotated = *base;
        rotated.matrix.fixed_view_mut::<3, 1>(0, 0).copy_from(&x);
        rotated.matrix.fixed_view_mut::<3, 1>(0, 1).copy_from(&y);
        self.current.insert(view, rotated);
        Some(rotated)
    }

    /// Rotates all three views about the trajectory axis to the absolute
    /// angle `angle_deg`, relative to the baseline frame.
    pub fn rotate_around_trajectory(&mut self, angle_deg: f64) -> Option<TrajectoryPoses> {
        let (Some(frame), Some(center)) = (self.frame, self.center) else {
            log::warn!("trajectory rotation requested before MPR creation");
            return None;
        };

        let angle = angle_deg.to_radians();
        let axis = frame.axis.into_inner();
        let v = unit(&rotate_around_axis(&frame.transverse_u, &axis, angle)).into_inner();
        let w = unit(&rotate_around_axis(&frame.transverse_v, &axis, angle)).into_inner();

        let poses = self.poses_for(&axis, &v, &w, &center);
        for pose in poses.iter() {
            self.current.insert(pose.view, *pose);
        }
        Some(poses)
    }

    pub fn current_poses(&self) -> Vec<SlicePlanePose> {
        self.current.values().copied().collect()
    }
}
