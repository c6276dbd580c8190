pub mod classes;

use pyo3::exceptions::{PyKeyError, PyRuntimeError};
use pyo3::prelude::*;

use crate::config::PlannerConfig;
use crate::entry::{run_litt, run_seeg};
use crate::error::PlannerError;
use crate::io::input::LandmarkStore;
use crate::io::scene::InMemoryScene;
use crate::processing::{self, ContactStackParams, Frame, MeshResolution, NecrosisParams};
use classes::{
    to_point, PyElectrodeModel, PyFiberModel, PyFrame, PyMprSession, PySlicePose, PySurface,
};

/// Missing landmarks become ``KeyError``, everything else ``RuntimeError``.
fn to_py_err(err: anyhow::Error) -> PyErr {
    match err.downcast_ref::<PlannerError>() {
        Some(PlannerError::NotFound { label }) => PyKeyError::new_err(label.clone()),
        None => PyRuntimeError::new_err(format!("{:#}", err)),
    }
}

fn load_inputs(
    csv_path: &str,
    config_path: Option<&str>,
) -> anyhow::Result<(LandmarkStore, PlannerConfig)> {
    let mut store = LandmarkStore::new();
    store.load_csv(csv_path)?;
    let config = match config_path {
        Some(path) => PlannerConfig::from_toml_file(path)?,
        None => PlannerConfig::default(),
    };
    Ok((store, config))
}

/// Local frame of a direction: (axis, u, v), right-handed.
#[pyfunction]
fn build_frame(direction: (f64, f64, f64)) -> PyFrame {
    let frame = Frame::build(&to_point(direction).coords);
    PyFrame::from(&frame)
}

#[pyfunction]
fn distance_between(entry: (f64, f64, f64), target: (f64, f64, f64)) -> f64 {
    processing::distance_between(&to_point(entry), &to_point(target))
}

/// Parses ``"0, 5; 12.5"`` style offset lists; invalid tokens are dropped.
#[pyfunction]
fn parse_offsets(text: &str) -> Vec<f64> {
    crate::io::input::parse_offsets(text)
}

/// Smallest allowed contact count covering ``distance`` mm.
#[pyfunction]
#[pyo3(signature = (
    distance,
    allowed = vec![5, 8, 10, 12, 15, 18],
    contact_length = 1.5,
    gap_length = 2.0
))]
fn suggest_contact_count(
    distance: f64,
    allowed: Vec<usize>,
    contact_length: f64,
    gap_length: f64,
) -> usize {
    processing::suggest_contact_count(distance, &allowed, contact_length, gap_length)
}

/// Fiber tube and necrosis ellipsoids from entry to target.
///
/// Arguments:
///
/// - ``entry``, ``target`` – points in mm
/// - ``fiber_diameter`` (default: 4.0)
/// - ``offsets`` (default: [0.0]) – distance of each ellipsoid's near face from the target
/// - ``necrosis_diameter`` (default: 10.0)
/// - ``necrosis_length`` (default: 15.0)
/// - ``resolution`` (default: 64) – sides of every tessellation
#[pyfunction]
#[pyo3(signature = (
    entry,
    target,
    fiber_diameter = 4.0,
    offsets = vec![0.0],
    necrosis_diameter = 10.0,
    necrosis_length = 15.0,
    resolution = 64usize
))]
fn build_fiber_and_necrosis(
    entry: (f64, f64, f64),
    target: (f64, f64, f64),
    fiber_diameter: f64,
    offsets: Vec<f64>,
    necrosis_diameter: f64,
    necrosis_length: f64,
    resolution: usize,
) -> PyFiberModel {
    let params = NecrosisParams {
        fiber_diameter,
        offsets,
        necrosis_diameter,
        necrosis_length,
    };
    let model = processing::build_fiber_and_necrosis(
        &to_point(entry),
        &to_point(target),
        &params,
        &MeshResolution::uniform(resolution),
    );
    PyFiberModel::from(&model)
}

/// SEEG shaft with ``contact_count`` contacts stacked back from the target.
#[pyfunction]
#[pyo3(signature = (
    entry,
    target,
    contact_count,
    contact_length = 1.5,
    gap_length = 2.0,
    contact_radius = 0.7,
    shaft_radius = 0.6,
    resolution = 64usize
))]
#[allow(clippy::too_many_arguments)]
fn build_seeg_electrode(
    entry: (f64, f64, f64),
    target: (f64, f64, f64),
    contact_count: usize,
    contact_length: f64,
    gap_length: f64,
    contact_radius: f64,
    shaft_radius: f64,
    resolution: usize,
) -> PyElectrodeModel {
    let params = ContactStackParams {
        contact_count,
        contact_length,
        gap_length,
        contact_radius,
        shaft_radius,
    };
    let model = processing::build_seeg_electrode(
        &to_point(entry),
        &to_point(target),
        &params,
        &MeshResolution::uniform(resolution),
    );
    PyElectrodeModel::from(&model)
}

/// Runs the LiTT plan for two labelled landmarks of a CSV file
/// (``label,x,y,z``) with an optional TOML configuration.
///
/// Raises ``KeyError`` for a missing label.
#[pyfunction]
#[pyo3(signature = (csv_path, entry_label, target_label, config_path = None))]
fn plan_litt_from_csv(
    csv_path: &str,
    entry_label: &str,
    target_label: &str,
    config_path: Option<&str>,
) -> PyResult<PyFiberModel> {
    let (store, config) = load_inputs(csv_path, config_path).map_err(to_py_err)?;
    let mut scene = InMemoryScene::new();
    let outcome =
        run_litt(&store, &mut scene, entry_label, target_label, &config).map_err(to_py_err)?;
    Ok(PyFiberModel::from(&outcome.model))
}

/// SEEG counterpart of ``plan_litt_from_csv``.
#[pyfunction]
#[pyo3(signature = (csv_path, entry_label, target_label, config_path = None))]
fn plan_seeg_from_csv(
    csv_path: &str,
    entry_label: &str,
    target_label: &str,
    config_path: Option<&str>,
) -> PyResult<PyElectrodeModel> {
    let (store, config) = load_inputs(csv_path, config_path).map_err(to_py_err)?;
    let mut scene = InMemoryScene::new();
    let outcome =
        run_seeg(&store, &mut scene, entry_label, target_label, &config).map_err(to_py_err)?;
    Ok(PyElectrodeModel::from(&outcome.model))
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(build_frame, m)?)?;
    m.add_function(wrap_pyfunction!(distance_between, m)?)?;
    m.add_function(wrap_pyfunction!(parse_offsets, m)?)?;
    m.add_function(wrap_pyfunction!(suggest_contact_count, m)?)?;
    m.add_function(wrap_pyfunction!(build_fiber_and_necrosis, m)?)?;
    m.add_function(wrap_pyfunction!(build_seeg_electrode, m)?)?;
    m.add_function(wrap_pyfunction!(plan_litt_from_csv, m)?)?;
    m.add_function(wrap_pyfunction!(plan_seeg_from_csv, m)?)?;

    m.add_class::<PySurface>()?;
    m.add_class::<PyFrame>()?;
    m.add_class::<PySlicePose>()?;
    m.add_class::<PyFiberModel>()?;
    m.add_class::<PyElectrodeModel>()?;
    m.add_class::<PyMprSession>()?;
    Ok(())
}
