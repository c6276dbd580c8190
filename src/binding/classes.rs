use nalgebra::{Point3, Vector3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::processing::{
    ElectrodeModel, FiberModel, Frame, SlicePlanePose, SlicePoseController, SliceView,
    TriangulatedSurface,
};

pub(crate) fn tuple3(v: &Vector3<f64>) -> (f64, f64, f64) {
    (v.x, v.y, v.z)
}

pub(crate) fn point_tuple(p: &Point3<f64>) -> (f64, f64, f64) {
    (p.x, p.y, p.z)
}

pub(crate) fn to_point(p: (f64, f64, f64)) -> Point3<f64> {
    Point3::new(p.0, p.1, p.2)
}

pub(crate) fn parse_view(name: &str) -> PyResult<SliceView> {
    name.parse::<SliceView>()
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Triangle mesh with 0-based vertex indices.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySurface {
    #[pyo3(get, set)]
    pub vertices: Vec<(f64, f64, f64)>,
    #[pyo3(get, set)]
    pub faces: Vec<(usize, usize, usize)>,
}

#[pymethods]
impl PySurface {
    #[new]
    fn new(vertices: Vec<(f64, f64, f64)>, faces: Vec<(usize, usize, usize)>) -> Self {
        Self { vertices, faces }
    }

    fn centroid(&self) -> Option<(f64, f64, f64)> {
        TriangulatedSurface::from(self)
            .centroid()
            .map(|c| point_tuple(&c))
    }

    fn __len__(&self) -> usize {
        self.faces.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Surface(vertices={}, faces={})",
            self.vertices.len(),
            self.faces.len()
        )
    }
}

impl From<&TriangulatedSurface> for PySurface {
    fn from(surface: &TriangulatedSurface) -> Self {
        Self {
            vertices: surface.vertices.iter().map(point_tuple).collect(),
            faces: surface.faces.iter().map(|f| (f[0], f[1], f[2])).collect(),
        }
    }
}

impl From<&PySurface> for TriangulatedSurface {
    fn from(surface: &PySurface) -> Self {
        TriangulatedSurface::new(
            surface.vertices.iter().copied().map(to_point).collect(),
            surface.faces.iter().map(|&(a, b, c)| [a, b, c]).collect(),
        )
    }
}

/// Trajectory axis and the two transverse directions.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyFrame {
    #[pyo3(get)]
    pub axis: (f64, f64, f64),
    #[pyo3(get)]
    pub transverse_u: (f64, f64, f64),
    #[pyo3(get)]
    pub transverse_v: (f64, f64, f64),
}

#[pymethods]
impl PyFrame {
    fn __repr__(&self) -> String {
        format!(
            "Frame(axis=({:.3}, {:.3}, {:.3}), u=({:.3}, {:.3}, {:.3}), v=({:.3}, {:.3}, {:.3}))",
            self.axis.0,
            self.axis.1,
            self.axis.2,
            self.transverse_u.0,
            self.transverse_u.1,
            self.transverse_u.2,
            self.transverse_v.0,
            self.transverse_v.1,
            self.transverse_v.2
        )
    }
}

impl From<&Frame> for PyFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            axis: tuple3(&frame.axis),
            transverse_u: tuple3(&frame.transverse_u),
            transverse_v: tuple3(&frame.transverse_v),
        }
    }
}

/// Slice-to-world pose of one view, row-major.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySlicePose {
    #[pyo3(get)]
    pub view: String,
    #[pyo3(get)]
    pub matrix: [[f64; 4]; 4],
    #[pyo3(get)]
    pub normal: (f64, f64, f64),
    #[pyo3(get)]
    pub origin: (f64, f64, f64),
}

#[pymethods]
impl PySlicePose {
    fn __repr__(&self) -> String {
        format!(
            "SlicePose(view={}, normal=({:.3}, {:.3}, {:.3}), origin=({:.2}, {:.2}, {:.2}))",
            self.view,
            self.normal.0,
            self.normal.1,
            self.normal.2,
            self.origin.0,
            self.origin.1,
            self.origin.2
        )
    }
}

impl From<&SlicePlanePose> for PySlicePose {
    fn from(pose: &SlicePlanePose) -> Self {
        Self {
            view: pose.view.to_string(),
            matrix: pose.to_rows(),
            normal: tuple3(&pose.normal()),
            origin: point_tuple(&pose.origin()),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyFiberModel {
    #[pyo3(get)]
    pub fiber: PySurface,
    #[pyo3(get)]
    pub necroses: Vec<PySurface>,
    #[pyo3(get)]
    pub necrosis_centers: Vec<(f64, f64, f64)>,
    #[pyo3(get)]
    pub length: f64,
}

#[pymethods]
impl PyFiberModel {
    fn __repr__(&self) -> String {
        format!(
            "FiberModel(length={:.2}, necroses={})",
            self.length,
            self.necroses.len()
        )
    }
}

impl From<&FiberModel> for PyFiberModel {
    fn from(model: &FiberModel) -> Self {
        Self {
            fiber: (&model.fiber).into(),
            necroses: model.necroses.iter().map(PySurface::from).collect(),
            necrosis_centers: model.necrosis_centers.iter().map(point_tuple).collect(),
            length: model.line.length(),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyElectrodeModel {
    #[pyo3(get)]
    pub shaft_and_contacts: PySurface,
    #[pyo3(get)]
    pub contacts: PySurface,
    #[pyo3(get)]
    pub contact_centers: Vec<(f64, f64, f64)>,
    #[pyo3(get)]
    pub length: f64,
}

#[pymethods]
impl PyElectrodeModel {
    fn __repr__(&self) -> String {
        format!(
            "ElectrodeModel(length={:.2}, contacts={})",
            self.length,
            self.contact_centers.len()
        )
    }
}

impl From<&ElectrodeModel> for PyElectrodeModel {
    fn from(model: &ElectrodeModel) -> Self {
        Self {
            shaft_and_contacts: (&model.stack.shaft_and_contacts).into(),
            contacts: (&model.stack.contacts).into(),
            contact_centers: model.stack.contact_centers.iter().map(point_tuple).collect(),
            length: model.line.length(),
        }
    }
}

/// Trajectory-aligned MPR for one planning session.
///
/// Example:
///
/// .. code-block:: python
///
///    import platinrs as pl
///    mpr = pl.MprSession()
///    red, green, yellow = mpr.create((0, 0, 0), (0, 0, 100))
///    mpr.rotate_view("green", 30.0)
#[pyclass(name = "MprSession")]
#[derive(Debug, Clone)]
pub struct PyMprSession {
    inner: SlicePoseController,
}

#[pymethods]
impl PyMprSession {
    #[new]
    #[pyo3(signature = (mirrored_views = None))]
    fn new(mirrored_views: Option<Vec<String>>) -> PyResult<Self> {
        let inner = match mirrored_views {
            None => SlicePoseController::new(),
            Some(names) => {
                let views = names
                    .iter()
                    .map(|n| parse_view(n))
                    .collect::<PyResult<Vec<_>>>()?;
                SlicePoseController::with_mirrored_views(views)
            }
        };
        Ok(Self { inner })
    }

    /// Builds Red, Green and Yellow poses for the trajectory and makes them
    /// the rotation baseline.
    fn create(&mut self, entry: (f64, f64, f64), target: (f64, f64, f64)) -> Vec<PySlicePose> {
        self.inner
            .create_trajectory_poses(&to_point(entry), &to_point(target))
            .iter()
            .map(PySlicePose::from)
            .collect()
    }

    /// Absolute in-plane rotation in degrees; ``None`` before ``create``.
    fn rotate_view(&mut self, view: &str, angle_deg: f64) -> PyResult<Option<PySlicePose>> {
        let view = parse_view(view)?;
        Ok(self
            .inner
            .rotate_view_in_plane(view, angle_deg)
            .map(|p| PySlicePose::from(&p)))
    }

    fn rotate_around_trajectory(&mut self, angle_deg: f64) -> Option<Vec<PySlicePose>> {
        self.inner
            .rotate_around_trajectory(angle_deg)
            .map(|poses| poses.iter().map(PySlicePose::from).collect())
    }

    fn pose(&self, view: &str) -> PyResult<Option<PySlicePose>> {
        let view = parse_view(view)?;
        Ok(self.inner.pose(view).map(PySlicePose::from))
    }

    fn frame(&self) -> Option<PyFrame> {
        self.inner.frame().map(PyFrame::from)
    }

    fn __repr__(&self) -> String {
        match self.inner.center() {
            Some(c) => format!("MprSession(center=({:.2}, {:.2}, {:.2}))", c.x, c.y, c.z),
            None => "MprSession(empty)".to_string(),
        }
    }
}
