use std::path::PathBuf;

use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::core::particle::{DEFAULT_MASS, DIM};
use crate::core::{pressure_series, Chamber, Enclosure, ImpactLog, Particle, Simulation};
use crate::io::read_particles;

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn enclosure(width: f64, height: f64, door: Option<f64>) -> PyResult<Enclosure> {
    let e = Enclosure::new(0.0, 0.0, width, height).map_err(py_err)?;
    match door {
        Some(l) => e.with_door(l).map_err(py_err),
        None => Ok(e),
    }
}

fn to_array(rows: impl ExactSizeIterator<Item = [f64; DIM]>) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((rows.len(), DIM));
    for (i, row) in rows.enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = row[k];
        }
    }
    arr
}

/// Python-facing wrapper around the hard-disk [`Simulation`].
///
/// Wall impacts seen while advancing are kept and exposed through
/// `get_wall_impacts`.
#[pyclass]
pub struct DiskSim {
    sim: Simulation,
    log: ImpactLog,
}

#[pymethods]
impl DiskSim {
    /// Build a simulation from arrays.
    ///
    /// Parameters
    /// - positions, velocities: float64 arrays of shape (N, 2)
    /// - radii: float64 array of shape (N,)
    /// - width, height: left chamber size
    /// - door: door width; None for a plain box
    ///
    /// Errors: raises ValueError on invalid parameters or overlapping disks.
    #[new]
    #[pyo3(signature = (positions, velocities, radii, width=0.09, height=0.09, door=None))]
    fn new<'py>(
        positions: PyReadonlyArray2<'py, f64>,
        velocities: PyReadonlyArray2<'py, f64>,
        radii: PyReadonlyArray1<'py, f64>,
        width: f64,
        height: f64,
        door: Option<f64>,
    ) -> PyResult<Self> {
        let r = positions.as_array();
        let v = velocities.as_array();
        let radii = radii.as_array();
        let n = radii.len();
        for (name, shape) in [("positions", r.shape()), ("velocities", v.shape())] {
            if shape != [n, DIM] {
                return Err(py_err(format!(
                    "{name} must have shape ({n}, {DIM}), got {shape:?}"
                )));
            }
        }
        let particles = (0..n)
            .map(|i| {
                Particle::new(
                    i as u32,
                    [r[[i, 0]], r[[i, 1]]],
                    [v[[i, 0]], v[[i, 1]]],
                    radii[i],
                    DEFAULT_MASS,
                )
            })
            .collect::<crate::Result<Vec<_>>>()
            .map_err(py_err)?;
        let sim = Simulation::new(particles, enclosure(width, height, door)?).map_err(py_err)?;
        Ok(Self {
            sim,
            log: ImpactLog::default(),
        })
    }

    /// Build a simulation from a particle-list file holding exactly `n` particles.
    #[staticmethod]
    #[pyo3(signature = (path, n, width=0.09, height=0.09, door=None))]
    fn from_file(
        path: PathBuf,
        n: usize,
        width: f64,
        height: f64,
        door: Option<f64>,
    ) -> PyResult<Self> {
        let particles = read_particles(&path, n).map_err(py_err)?;
        let sim = Simulation::new(particles, enclosure(width, height, door)?).map_err(py_err)?;
        Ok(Self {
            sim,
            log: ImpactLog::default(),
        })
    }

    /// Advance the simulation to the specified absolute time (releases the GIL during computation).
    fn advance_to(&mut self, py: Python<'_>, target_time: f64) -> PyResult<()> {
        let (sim, log) = (&mut self.sim, &mut self.log);
        py.detach(|| sim.advance_to(target_time, log)).map_err(py_err)
    }

    /// Process one event; returns its time, or None when nothing is left to happen.
    fn step(&mut self) -> PyResult<Option<f64>> {
        let report = self.sim.step().map_err(py_err)?;
        Ok(report.map(|r| {
            if let Some(impact) = r.impact {
                self.log.impacts.push(impact);
            }
            r.time
        }))
    }

    fn time(&self) -> f64 {
        self.sim.time()
    }

    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    /// Return positions as a NumPy array of shape (N, 2), dtype=float64.
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = to_array(self.sim.particles().iter().map(|p| p.r));
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return velocities as a NumPy array of shape (N, 2), dtype=float64.
    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = to_array(self.sim.particles().iter().map(|p| p.v));
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return a (M, 3) NumPy array of [time, wall_id, normal_speed] wall impacts.
    ///
    /// Corner strikes are reported with wall_id 7.
    fn get_wall_impacts<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let impacts = &self.log.impacts;
        let mut arr = Array2::<f64>::zeros((impacts.len(), 3));
        for (i, impact) in impacts.iter().enumerate() {
            arr[[i, 0]] = impact.time;
            arr[[i, 1]] = impact.wall.id() as f64;
            arr[[i, 2]] = impact.normal_speed();
        }
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return a (M, 4) NumPy array of [start, end, left, right] pressures
    /// over consecutive windows of width `bin` since t = 0.
    fn get_pressure_series<'py>(&self, py: Python<'py>, bin: f64) -> PyResult<Py<PyArray2<f64>>> {
        let series = pressure_series(&self.log.impacts, self.sim.enclosure(), bin).map_err(py_err)?;
        let mut arr = Array2::<f64>::zeros((series.len(), 4));
        for (i, b) in series.iter().enumerate() {
            arr[[i, 0]] = b.start;
            arr[[i, 1]] = b.end;
            arr[[i, 2]] = b.get(Chamber::Left);
            arr[[i, 3]] = b.get(Chamber::Right);
        }
        Ok(arr.into_pyarray(py).to_owned().into())
    }
}

/// The diskgas Python module entry point.
#[pymodule]
fn diskgas(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DiskSim>()?;
    Ok(())
}
