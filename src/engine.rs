use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::kinematics::{phase_arrows, project, PhaseArrow, VectorSample};
use crate::models::pendulum::PhysicalConstants;
use crate::portrait::{run_batch, BatchResult, PhaseGrid};
use crate::solver::{integrate, Trajectory};
use tracing::info;

pub const SCENARIO_DAMPED: &str = "damped";
pub const SCENARIO_FRICTIONLESS: &str = "frictionless";
pub const SCENARIO_SMALL_ANGLE: &str = "small-angle";

pub struct ScenarioInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn scenario_catalog() -> &'static [ScenarioInfo] {
    &[
        ScenarioInfo {
            id: SCENARIO_DAMPED,
            name: "Damped swing",
            description: "Bob launched at -1 rad with 2 rad/s, slowed by quadratic air drag.",
        },
        ScenarioInfo {
            id: SCENARIO_FRICTIONLESS,
            name: "Frictionless swing",
            description: "Same launch with the drag coefficient set to zero; energy is conserved.",
        },
        ScenarioInfo {
            id: SCENARIO_SMALL_ANGLE,
            name: "Small oscillation",
            description: "Released from rest at 0.1 rad, close to simple harmonic motion.",
        },
    ]
}

pub fn scenario_config(id: &str) -> Option<SimulationConfig> {
    match id {
        SCENARIO_DAMPED => Some(SimulationConfig::default()),
        SCENARIO_FRICTIONLESS => Some(SimulationConfig {
            drag_coefficient: 0.0,
            ..SimulationConfig::default()
        }),
        SCENARIO_SMALL_ANGLE => Some(SimulationConfig {
            initial_angle: 0.1,
            initial_angular_velocity: 0.0,
            ..SimulationConfig::default()
        }),
        _ => None,
    }
}

/// The main pendulum run: a complete trajectory and its bob samples.
#[derive(Debug, Clone)]
pub struct Swing {
    pub trajectory: Trajectory<2>,
    pub samples: Vec<VectorSample>,
}

impl Swing {
    /// `[x, y, vx, vy]` per sample.
    pub fn samples_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.samples.len() * 4);
        for s in &self.samples {
            out.push(s.position_x as f32);
            out.push(s.position_y as f32);
            out.push(s.velocity_x as f32);
            out.push(s.velocity_y as f32);
        }
        out
    }

    /// `[θ, ω]` per sample, for tracing the run through the phase portrait.
    pub fn phase_path_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.trajectory.len() * 2);
        for s in self.trajectory.states() {
            out.push(s[0] as f32);
            out.push(s[1] as f32);
        }
        out
    }

    pub fn times_flat(&self) -> Vec<f32> {
        self.trajectory.times().iter().map(|&t| t as f32).collect()
    }
}

/// Batch of grid trajectories plus the field arrows of the successful ones.
#[derive(Debug, Clone)]
pub struct Portrait {
    pub grid: PhaseGrid,
    pub batch: BatchResult,
    pub arrows: Vec<PhaseArrow>,
}

impl Portrait {
    /// `[θ, ω, dθ, dω]` per arrow.
    pub fn arrows_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.arrows.len() * 4);
        for a in &self.arrows {
            out.extend_from_slice(&[a.theta as f32, a.omega as f32, a.d_theta as f32, a.d_omega as f32]);
        }
        out
    }

    /// Grid entries whose integration stopped early.
    pub fn failed_count(&self) -> usize {
        self.batch.failures().len()
    }
}

pub struct Engine {
    config: SimulationConfig,
    constants: PhysicalConstants,
}

impl Engine {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let constants = config.constants()?;
        Ok(Self { config, constants })
    }

    pub fn new_builtin(scenario_id: &str) -> Result<Self> {
        let config = scenario_config(scenario_id)
            .ok_or_else(|| Error::config(format!("unknown scenario id '{}'", scenario_id)))?;
        Self::new(config)
    }

    pub fn config(&self) -> &SimulationConfig { &self.config }

    pub fn constants(&self) -> &PhysicalConstants { &self.constants }

    /// Integrates the configured initial state. A partial trajectory is an error here:
    /// an animation with a gap would misrepresent the motion.
    pub fn swing(&self) -> Result<Swing> {
        let t_eval = self.config.sample_times()?;
        let trajectory = integrate(
            &self.constants.vector_field(),
            self.config.initial_state()?,
            self.config.time_span()?,
            &t_eval,
            &self.config.tolerance()?,
        )?
        .into_complete()?;

        let samples = project(&trajectory, &self.constants);
        info!(
            samples = samples.len(),
            steps = trajectory.stats().accepted,
            "swing integrated"
        );
        Ok(Swing { trajectory, samples })
    }

    /// Runs the phase-portrait batch; failed entries contribute no arrows.
    pub fn portrait(&self) -> Result<Portrait> {
        let grid = self.config.phase_grid()?;
        let t_eval = self.config.sample_times()?;
        let batch = run_batch(
            &self.constants.vector_field(),
            &grid,
            self.config.time_span()?,
            &t_eval,
            &self.config.tolerance()?,
        )?;

        let stride = self.config.portrait.arrow_stride;
        let arrows: Vec<PhaseArrow> = batch
            .successful()
            .flat_map(|traj| phase_arrows(traj, stride))
            .collect();

        info!(
            trajectories = batch.len(),
            failed = batch.failures().len(),
            arrows = arrows.len(),
            "portrait built"
        );
        Ok(Portrait { grid, batch, arrows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_entry_builds() {
        for info in scenario_catalog() {
            assert!(Engine::new_builtin(info.id).is_ok(), "{}", info.id);
        }
        assert!(Engine::new_builtin("double-pendulum").is_err());
    }

    #[test]
    fn swing_flat_buffers_have_expected_layout() {
        let engine = Engine::new(SimulationConfig {
            duration: 2.0,
            sample_count: 10,
            ..SimulationConfig::default()
        })
        .unwrap();
        let swing = engine.swing().unwrap();
        assert_eq!(swing.samples_flat().len(), 40);
        assert_eq!(swing.phase_path_flat().len(), 20);
        assert_eq!(swing.times_flat().len(), 10);
        assert_eq!(swing.phase_path_flat()[0], -1.0);
        assert_eq!(swing.phase_path_flat()[1], 2.0);
    }

    #[test]
    fn swing_surfaces_integration_failure() {
        let engine = Engine::new(SimulationConfig { max_steps: 2, ..SimulationConfig::default() }).unwrap();
        assert!(matches!(engine.swing(), Err(Error::IntegrationFailure { .. })));
    }

    #[test]
    fn small_portrait_produces_arrows() {
        let mut config = SimulationConfig {
            duration: 5.0,
            sample_count: 101,
            ..SimulationConfig::default()
        };
        config.portrait.count = 4;
        let portrait = Engine::new(config).unwrap().portrait().unwrap();
        assert_eq!(portrait.batch.len(), 4);
        // 4 arrows (k = 25, 50, 75, 100) per trajectory
        assert_eq!(portrait.arrows.len(), 16);
        assert_eq!(portrait.arrows_flat().len(), 64);
        assert_eq!(portrait.failed_count(), 0);
    }

    #[test]
    fn portrait_counts_failed_entries() {
        let mut config = SimulationConfig { max_steps: 2, ..SimulationConfig::default() };
        config.portrait.count = 4;
        let portrait = Engine::new(config).unwrap().portrait().unwrap();
        assert_eq!(portrait.batch.len(), 4);
        assert_eq!(portrait.failed_count(), 4);
        assert!(portrait.arrows.is_empty());
    }
}
