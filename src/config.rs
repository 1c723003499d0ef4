//! In-memory run configuration.
//!
//! Every field has a default, so a partial object is enough:
//!
//! ```json
//! {
//!   "dragCoefficient": 0.48,
//!   "initialAngle": -1.0,
//!   "initialAngularVelocity": 2.0,
//!   "duration": 30.0,
//!   "sampleCount": 900,
//!   "portrait": { "count": 64, "arrowStride": 25 }
//! }
//! ```
//!
//! `portrait.thetaLimit` defaults to `8π` and `portrait.omegaLimit` to
//! `count / length`.

use crate::error::{Error, Result};
use crate::kinematics::DEFAULT_ARROW_STRIDE;
use crate::models::pendulum::{
    PhysicalConstants, State, DEFAULT_AIR_DENSITY, DEFAULT_BOB_RADIUS, DEFAULT_DRAG_COEFFICIENT,
    DEFAULT_GRAVITY, DEFAULT_LENGTH, DEFAULT_MASS,
};
use crate::portrait::{PhaseGrid, DEFAULT_GRID_COUNT, DEFAULT_THETA_LIMIT};
use crate::solver::{linspace, Tolerance, DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_RTOL};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_ANGLE: f64 = -1.0;
pub const DEFAULT_INITIAL_ANGULAR_VELOCITY: f64 = 2.0;
pub const DEFAULT_DURATION: f64 = 30.0;
pub const DEFAULT_SAMPLE_COUNT: usize = 900;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub drag_coefficient: f64,
    pub air_density: f64,
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
    pub bob_radius: f64,
    pub initial_angle: f64,
    pub initial_angular_velocity: f64,
    /// Simulated seconds, starting at t = 0
    pub duration: f64,
    pub sample_count: usize,
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub max_steps: usize,
    pub portrait: PortraitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortraitConfig {
    pub count: usize,
    pub theta_limit: Option<f64>,
    pub omega_limit: Option<f64>,
    pub arrow_stride: usize,
}

impl Default for PortraitConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_GRID_COUNT,
            theta_limit: None,
            omega_limit: None,
            arrow_stride: DEFAULT_ARROW_STRIDE,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            drag_coefficient: DEFAULT_DRAG_COEFFICIENT,
            air_density: DEFAULT_AIR_DENSITY,
            gravity: DEFAULT_GRAVITY,
            mass: DEFAULT_MASS,
            length: DEFAULT_LENGTH,
            bob_radius: DEFAULT_BOB_RADIUS,
            initial_angle: DEFAULT_INITIAL_ANGLE,
            initial_angular_velocity: DEFAULT_INITIAL_ANGULAR_VELOCITY,
            duration: DEFAULT_DURATION,
            sample_count: DEFAULT_SAMPLE_COUNT,
            rel_tol: DEFAULT_RTOL,
            abs_tol: DEFAULT_ATOL,
            max_steps: DEFAULT_MAX_STEPS,
            portrait: PortraitConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn constants(&self) -> Result<PhysicalConstants> {
        PhysicalConstants::new(
            self.drag_coefficient,
            self.air_density,
            self.gravity,
            self.mass,
            self.length,
            self.bob_radius,
        )
    }

    pub fn initial_state(&self) -> Result<State> {
        if !(self.initial_angle.is_finite() && self.initial_angular_velocity.is_finite()) {
            return Err(Error::config("initial angle and angular velocity must be finite"));
        }
        Ok(State::new(self.initial_angle, self.initial_angular_velocity))
    }

    pub fn time_span(&self) -> Result<(f64, f64)> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(Error::config(format!("duration must be finite and positive, got {}", self.duration)));
        }
        Ok((0.0, self.duration))
    }

    /// `sample_count` evenly spaced output times over the whole span.
    pub fn sample_times(&self) -> Result<Vec<f64>> {
        let (t0, tf) = self.time_span()?;
        if self.sample_count == 0 {
            return Err(Error::config("sample count must be at least 1"));
        }
        Ok(linspace(t0, tf, self.sample_count))
    }

    pub fn tolerance(&self) -> Result<Tolerance> {
        let tol = Tolerance {
            rtol: self.rel_tol,
            atol: self.abs_tol,
            max_steps: self.max_steps,
            ..Tolerance::default()
        };
        tol.validate()?;
        Ok(tol)
    }

    pub fn phase_grid(&self) -> Result<PhaseGrid> {
        let count = self.portrait.count;
        let theta_limit = self.portrait.theta_limit.unwrap_or(DEFAULT_THETA_LIMIT);
        let omega_limit = self
            .portrait
            .omega_limit
            .unwrap_or(count as f64 / self.length);
        PhaseGrid::generate(count, theta_limit, omega_limit)
    }

    /// Runs every derived-value check without integrating anything.
    pub fn validate(&self) -> Result<()> {
        self.constants()?;
        self.initial_state()?;
        self.sample_times()?;
        self.tolerance()?;
        self.phase_grid()?;
        Ok(())
    }
}
