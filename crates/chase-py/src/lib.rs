use neural_chase_core::nn::DEFAULT_LEARNING_RATE;
use neural_chase_core::{
    ChaseConfig, NeuralController as CoreController, PursuitAgent as CoreAgent, WorldBounds,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Python wrapper around the 4-16-16-2 pursuer controller.
#[pyclass(name = "NeuralController")]
struct PyNeuralController {
    inner: CoreController,
}

#[pymethods]
impl PyNeuralController {
    #[new]
    #[pyo3(signature = (seed=0, learning_rate=DEFAULT_LEARNING_RATE))]
    fn new(seed: u64, learning_rate: f32) -> PyResult<Self> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(value_error(format!(
                "learning_rate must be positive and finite (got {learning_rate})"
            )));
        }
        Ok(Self {
            inner: CoreController::with_rng(ChaCha12Rng::seed_from_u64(seed), learning_rate),
        })
    }

    fn predict(&mut self, features: Vec<f32>) -> PyResult<Vec<f32>> {
        let out = self.inner.predict_slice(&features).map_err(value_error)?;
        Ok(out.to_vec())
    }

    fn train_step(&mut self, features: Vec<f32>, target: Vec<f32>) -> PyResult<f32> {
        self.inner
            .train_step_slice(&features, &target)
            .map_err(value_error)
    }

    #[pyo3(signature = (seed=None))]
    fn reset(&mut self, seed: Option<u64>) {
        match seed {
            Some(seed) => self.inner.reseed(seed),
            None => self.inner.reset(),
        }
    }

    fn weights(&self) -> Vec<f32> {
        self.inner.to_weight_vec()
    }

    #[getter]
    fn last_output(&self) -> Vec<f32> {
        self.inner.last_output().to_vec()
    }

    #[getter]
    fn last_loss(&self) -> f32 {
        self.inner.last_loss()
    }

    #[getter]
    fn diverged(&self) -> bool {
        self.inner.diverged()
    }
}

/// Python wrapper around a leveling, online-training pursuer.
#[pyclass(name = "PursuitAgent")]
struct PyPursuitAgent {
    inner: CoreAgent,
    bounds: WorldBounds,
}

#[pymethods]
impl PyPursuitAgent {
    #[new]
    #[pyo3(signature = (
        seed=0,
        name="HAL9000",
        train_cadence=100,
        world_width=7.2,
        world_height=12.8,
    ))]
    fn new(
        seed: u64,
        name: &str,
        train_cadence: u64,
        world_width: f32,
        world_height: f32,
    ) -> PyResult<Self> {
        let config = ChaseConfig {
            seed,
            train_cadence,
            world_width,
            world_height,
            player_start: [0.0, 0.0],
            pursuer_start: [0.0, 0.0],
            ..ChaseConfig::default()
        };
        config.validate().map_err(value_error)?;
        Ok(Self {
            inner: CoreAgent::with_seed(seed, &config.agent(), name),
            bounds: config.bounds(),
        })
    }

    /// Returns the movement delta `(dx, dy)`; `player=None` is an idle tick.
    fn tick(
        &mut self,
        dt: f32,
        player: Option<(f32, f32)>,
        position: (f32, f32),
    ) -> PyResult<(f32, f32)> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(value_error(format!("dt must be non-negative and finite (got {dt})")));
        }
        let outcome = self.inner.tick(
            dt,
            player.map(|(x, y)| [x, y]),
            [position.0, position.1],
            self.bounds,
        );
        Ok((outcome.delta[0], outcome.delta[1]))
    }

    fn set_level(&mut self, level: u32, name: &str) -> PyResult<()> {
        if level == 0 {
            return Err(value_error("level must be at least 1"));
        }
        self.inner.set_level(level, name);
        Ok(())
    }

    fn apply_slowdown(&mut self, duration: f32, factor: f32) -> PyResult<()> {
        self.inner
            .apply_slowdown(duration, factor)
            .map_err(value_error)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn level_up_ready(&self) -> bool {
        self.inner.level_up_ready()
    }

    #[getter]
    fn average_loss(&self) -> f32 {
        self.inner.average_loss()
    }

    #[getter]
    fn level(&self) -> u32 {
        self.inner.level()
    }

    #[getter]
    fn knowledge(&self) -> u64 {
        self.inner.knowledge()
    }

    #[getter]
    fn speed(&self) -> f32 {
        self.inner.speed()
    }

    #[getter]
    fn size(&self) -> f32 {
        self.inner.size()
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[getter]
    fn train_steps(&self) -> u64 {
        self.inner.train_steps()
    }
}

#[pyfunction]
fn version() -> &'static str {
    neural_chase_core::VERSION
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_class::<PyNeuralController>()?;
    m.add_class::<PyPursuitAgent>()?;
    Ok(())
}
