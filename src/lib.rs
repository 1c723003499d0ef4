//! Pendulum with quadratic air drag, integrated with an adaptive
//! Dormand–Prince 5(4) scheme.
//!
//! - [`PhysicalConstants`] defines the vector field `(dθ/dt, dω/dt)`.
//! - [`integrate`] samples any first-order ODE at requested output times.
//! - [`generate_phase_grid`] and [`run_batch`] sweep initial states for a
//!   phase portrait.
//! - [`project`] and [`phase_arrows`] turn trajectories into numbers a
//!   renderer can draw.
//!
//! Drawing itself is left to the caller; on `wasm32` the `wasm` module
//! hands flat `f32` buffers to JavaScript.

pub mod config;
pub mod engine;
pub mod error;
pub mod kinematics;
pub mod models;
pub mod portrait;
pub mod solver;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{PortraitConfig, SimulationConfig};
pub use engine::{
    scenario_catalog, scenario_config, Engine, Portrait, ScenarioInfo, Swing, SCENARIO_DAMPED,
    SCENARIO_FRICTIONLESS, SCENARIO_SMALL_ANGLE,
};
pub use error::{Error, FailureReason, Result};
pub use kinematics::{phase_arrows, project, PhaseArrow, VectorSample, ARROW_SCALE};
pub use models::pendulum::{PhysicalConstants, State};
pub use portrait::{generate_phase_grid, run_batch, BatchResult, PhaseGrid};
pub use solver::{
    integrate, linspace, IntegrationStatus, SolverStats, Tolerance, Trajectory, VectorField,
};
