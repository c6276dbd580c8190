//! Trajectory geometry and trajectory-aligned MPR for stereotactic planning.
//!
//! Given an entry and a target landmark the crate builds the laser fiber and
//! necrosis models of a LiTT plan or the shaft and contacts of an SEEG
//! electrode, and orients the three slice views along the trajectory.

pub mod config;
pub mod entry;
pub mod error;
pub mod io;
pub mod processing;
mod utils;

#[cfg(feature = "python")]
mod binding;

pub use config::PlannerConfig;
pub use error::PlannerError;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// This is the module importable from Python:
///
/// ```python
/// import platinrs as pl
/// model = pl.build_fiber_and_necrosis((0, 0, 0), (0, 0, 80), offsets=[0.0, 10.0])
/// mpr = pl.MprSession()
/// mpr.create((0, 0, 0), (0, 0, 80))
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn platinrs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    binding::register(m)
}
