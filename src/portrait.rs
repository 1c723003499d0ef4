//! Phase-portrait batches: a sweep of initial states, one integration each.

use crate::error::{Error, FailureReason, Result};
use crate::models::pendulum::State;
use crate::solver::{integrate, validate_span, IntegrationStatus, Tolerance, Trajectory, VectorField};
use std::f64::consts::PI;
use tracing::{debug, warn};

pub const DEFAULT_GRID_COUNT: usize = 64;
pub const DEFAULT_THETA_LIMIT: f64 = 8.0 * PI;

/// Ordered initial states for a portrait batch. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseGrid {
    states: Vec<State>,
    theta_limit: f64,
    omega_limit: f64,
}

impl PhaseGrid {
    /// Two opposite-angle sheets: angle `-θ_max` for the first half and
    /// `+θ_max` for the second, with ω stepping down from `+ω_max` by
    /// `2·ω_max / count` at every entry.
    pub fn generate(count: usize, theta_limit: f64, omega_limit: f64) -> Result<Self> {
        if count == 0 || count % 2 != 0 {
            return Err(Error::config(format!("grid count must be even and positive, got {}", count)));
        }
        if !(theta_limit.is_finite() && theta_limit > 0.0) {
            return Err(Error::config(format!("theta limit must be finite and positive, got {}", theta_limit)));
        }
        if !(omega_limit.is_finite() && omega_limit > 0.0) {
            return Err(Error::config(format!("omega limit must be finite and positive, got {}", omega_limit)));
        }

        let half = count / 2;
        let step = 2.0 * omega_limit / count as f64;
        let states = (0..count)
            .map(|k| {
                let theta = if k < half { -theta_limit } else { theta_limit };
                State::new(theta, omega_limit - k as f64 * step)
            })
            .collect();

        Ok(Self { states, theta_limit, omega_limit })
    }

    pub fn states(&self) -> &[State] { &self.states }
    pub fn len(&self) -> usize { self.states.len() }
    pub fn is_empty(&self) -> bool { self.states.is_empty() }
    pub fn theta_limit(&self) -> f64 { self.theta_limit }
    pub fn omega_limit(&self) -> f64 { self.omega_limit }

    pub fn iter(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }
}

pub fn generate_phase_grid(count: usize, theta_limit: f64, omega_limit: f64) -> Result<PhaseGrid> {
    PhaseGrid::generate(count, theta_limit, omega_limit)
}

/// One trajectory per grid entry, in grid order. Failed entries stay in place.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    trajectories: Vec<Trajectory<2>>,
}

impl BatchResult {
    pub fn trajectories(&self) -> &[Trajectory<2>] { &self.trajectories }
    pub fn len(&self) -> usize { self.trajectories.len() }
    pub fn is_empty(&self) -> bool { self.trajectories.is_empty() }

    pub fn successful(&self) -> impl Iterator<Item = &Trajectory<2>> + '_ {
        self.trajectories.iter().filter(|t| t.is_success())
    }

    /// Grid index, stop time and reason of every failed entry.
    pub fn failures(&self) -> Vec<(usize, f64, FailureReason)> {
        self.trajectories
            .iter()
            .enumerate()
            .filter_map(|(i, traj)| match traj.status() {
                IntegrationStatus::Failed { t, reason } => Some((i, t, reason)),
                IntegrationStatus::Success => None,
            })
            .collect()
    }

    pub fn into_trajectories(self) -> Vec<Trajectory<2>> {
        self.trajectories
    }
}

/// Integrates `field` once per grid state over a shared span and output grid.
///
/// Input is validated once up front; an individual integration failure is
/// recorded on its trajectory and the remaining entries still run.
pub fn run_batch<F>(
    field: &F,
    grid: &PhaseGrid,
    t_span: (f64, f64),
    t_eval: &[f64],
    tolerance: &Tolerance,
) -> Result<BatchResult>
where
    F: VectorField<2>,
{
    validate_span(t_span, t_eval)?;
    tolerance.validate()?;

    let run_one = |y0: &State| integrate(field, *y0, t_span, t_eval, tolerance);

    #[cfg(feature = "parallel")]
    let trajectories = {
        use rayon::prelude::*;
        grid.states().par_iter().map(run_one).collect::<Result<Vec<_>>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let trajectories = grid.states().iter().map(run_one).collect::<Result<Vec<_>>>()?;

    let batch = BatchResult { trajectories };
    for (i, t, reason) in batch.failures() {
        warn!(index = i, t, %reason, "portrait trajectory failed, skipping");
    }
    debug!(
        count = batch.len(),
        failed = batch.len() - batch.successful().count(),
        "portrait batch finished"
    );
    Ok(batch)
}
