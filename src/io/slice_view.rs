use anyhow::bail;
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::processing::{SlicePlanePose, SliceView};

/// Ways a host can accept a slice orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// Full slice-to-world 4x4 matrix.
    pub set_matrix: bool,
    /// Normal, transverse (in-plane X) and position triple.
    pub set_normal_transverse_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseEncoding {
    Matrix,
    NormalTransversePosition,
}

/// A pose expressed in the encoding the host accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum PoseCommand {
    Matrix {
        view: SliceView,
        rows: [[f64; 4]; 4],
    },
    NormalTransversePosition {
        view: SliceView,
        normal: [f64; 3],
        transverse: [f64; 3],
        position: [f64; 3],
    },
}

impl PoseCommand {
    pub fn view(&self) -> SliceView {
        match self {
            PoseCommand::Matrix { view, .. } => *view,
            PoseCommand::NormalTransversePosition { view, .. } => *view,
        }
    }

    /// Rebuilds the pose the command encodes. The in-plane Y of a
    /// normal/transverse/position triple is `normal x transverse`.
    pub fn to_pose(&self) -> SlicePlanePose {
        match self {
            PoseCommand::Matrix { view, rows } => {
                let col = |c: usize| Vector3::new(rows[0][c], rows[1][c], rows[2][c]);
                let origin = Point3::from(col(3));
                SlicePlanePose::from_columns(*view, &col(0), &col(1), &col(2), &origin)
            }
            PoseCommand::NormalTransversePosition {
                view,
                normal,
                transverse,
                position,
            } => {
                let n = Vector3::from(*normal);
                let t = Vector3::from(*transverse);
                let y = n.cross(&t);
                SlicePlanePose::from_columns(*view, &t, &y, &n, &Point3::from(*position))
            }
        }
    }
}

/// Translates poses into the one encoding the host was found to support.
///
/// The encoding is fixed at construction; nothing is probed per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceViewAdapter {
    encoding: PoseEncoding,
}

impl SliceViewAdapter {
    /// Prefers the full matrix when both encodings are offered.
    pub fn negotiate(capabilities: &HostCapabilities) -> anyhow::Result<Self> {
        let encoding = if capabilities.set_matrix {
            PoseEncoding::Matrix
        } else if capabilities.set_normal_transverse_position {
            PoseEncoding::NormalTransversePosition
        } else {
            bail!("host offers no way to set a slice orientation");
        };
        log::debug!("slice views use {:?} encoding", encoding);
        Ok(Self { encoding })
    }

    pub fn encoding(&self) -> PoseEncoding {
        self.encoding
    }

    pub fn encode(&self, pose: &SlicePlanePose) -> PoseCommand {
        match self.encoding {
            PoseEncoding::Matrix => PoseCommand::Matrix {
                view: pose.view,
                rows: pose.to_rows(),
            },
            PoseEncoding::NormalTransversePosition => PoseCommand::NormalTransversePosition {
                view: pose.view,
                normal: pose.normal().into(),
                transverse: pose.x_axis().into(),
                position: pose.origin().coords.into(),
            },
        }
    }
}

/// Receiver of slice orientations; a pose replaces the view's current one.
pub trait SliceViewSink {
    fn set_pose(&mut self, pose: &SlicePlanePose) -> anyhow::Result<()>;

    fn set_poses<'a, I>(&mut self, poses: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = &'a SlicePlanePose>,
        Self: Sized,
    {
        for pose in poses {
            self.set_pose(pose)?;
        }
        Ok(())
    }
}

/// Sink that encodes every pose for its host and keeps the commands.
#[derive(Debug, Clone)]
pub struct RecordingSliceViews {
    adapter: SliceViewAdapter,
    history: Vec<PoseCommand>,
    current: BTreeMap<SliceView, PoseCommand>,
}

impl RecordingSliceViews {
    pub fn new(adapter: SliceViewAdapter) -> Self {
        Self {
            adapter,
            history: Vec::new(),
            current: BTreeMap::new(),
        }
    }

    pub fn adapter(&self) -> &SliceViewAdapter {
        &self.adapter
    }

    pub fn history(&self) -> &[PoseCommand] {
        &self.history
    }

    pub fn current(&self, view: SliceView) -> Option<&PoseCommand> {
        self.current.get(&view)
    }
}

impl SliceViewSink for RecordingSliceViews {
    fn set_pose(&mut self, pose: &SlicePlanePose) -> anyhow::Result<()> {
        let command = self.adapter.encode(pose);
        self.current.insert(pose.view, command.clone());
        self.history.push(command);
        Ok(())
    }
}
