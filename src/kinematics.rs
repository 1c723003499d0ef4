//! Projection of (θ, ω) trajectories into render-ready samples.

use crate::models::pendulum::{PhysicalConstants, State};
use crate::solver::Trajectory;

/// Visual scale of the velocity arrow drawn at the bob.
pub const ARROW_SCALE: f64 = 0.5;
/// Sample spacing of phase-field arrows.
pub const DEFAULT_ARROW_STRIDE: usize = 25;

/// Bob position (pivot at the origin) and its velocity arrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSample {
    pub position_x: f64,
    pub position_y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl VectorSample {
    /// The arrow is `0.5·ω·(cos θ, sin θ)`: a visual cue, not `L·ω` Cartesian velocity.
    pub fn from_state(state: &State, length: f64) -> Self {
        let (theta, omega) = (state[0], state[1]);
        let (sin, cos) = theta.sin_cos();
        Self {
            position_x: length * sin,
            position_y: -length * cos,
            velocity_x: ARROW_SCALE * omega * cos,
            velocity_y: ARROW_SCALE * omega * sin,
        }
    }
}

/// One sample per trajectory state, in order. Empty in, empty out.
pub fn project(trajectory: &Trajectory<2>, constants: &PhysicalConstants) -> Vec<VectorSample> {
    let length = constants.length();
    trajectory
        .states()
        .iter()
        .map(|s| VectorSample::from_state(s, length))
        .collect()
}

/// Arrow in phase space from the previous sample to the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseArrow {
    pub theta: f64,
    pub omega: f64,
    pub d_theta: f64,
    pub d_omega: f64,
}

/// Arrows at every `stride`-th sample (excluding the first). A zero stride yields none.
pub fn phase_arrows(trajectory: &Trajectory<2>, stride: usize) -> Vec<PhaseArrow> {
    if stride == 0 {
        return Vec::new();
    }
    let states = trajectory.states();
    (stride..states.len())
        .step_by(stride)
        .map(|k| {
            let (cur, prev) = (states[k], states[k - 1]);
            PhaseArrow {
                theta: cur[0],
                omega: cur[1],
                d_theta: cur[0] - prev[0],
                d_omega: cur[1] - prev[1],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{integrate, linspace, Tolerance};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn hanging_at_rest_is_straight_down() {
        let s = VectorSample::from_state(&State::new(0.0, 0.0), 10.0);
        assert_eq!(s.position_x, 0.0);
        assert_eq!(s.position_y, -10.0);
        assert_eq!(s.velocity_x, 0.0);
        assert_eq!(s.velocity_y, 0.0);
    }

    #[test]
    fn horizontal_bob_uses_scaled_omega() {
        let s = VectorSample::from_state(&State::new(FRAC_PI_2, 2.0), 10.0);
        assert!((s.position_x - 10.0).abs() < 1e-12);
        assert!(s.position_y.abs() < 1e-12);
        assert!(s.velocity_x.abs() < 1e-12);
        assert!((s.velocity_y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn projection_follows_trajectory() {
        let constants = PhysicalConstants::default();
        let t_eval = linspace(0.0, 5.0, 60);
        let traj = integrate(&constants.vector_field(), State::new(-1.0, 2.0), (0.0, 5.0), &t_eval, &Tolerance::default()).unwrap();
        let samples = project(&traj, &constants);
        assert_eq!(samples.len(), traj.len());
        for (sample, state) in samples.iter().zip(traj.states()) {
            let r = sample.position_x.hypot(sample.position_y);
            assert!((r - constants.length()).abs() < 1e-9);
            let arrow = sample.velocity_x.hypot(sample.velocity_y);
            assert!((arrow - ARROW_SCALE * state[1].abs()).abs() < 1e-12);
        }
    }

    #[test]
    fn arrows_skip_first_sample_and_use_differences() {
        let constants = PhysicalConstants::default();
        let t_eval = linspace(0.0, 10.0, 101);
        let traj = integrate(&constants.vector_field(), State::new(0.5, 0.0), (0.0, 10.0), &t_eval, &Tolerance::default()).unwrap();
        let arrows = phase_arrows(&traj, 25);
        assert_eq!(arrows.len(), 4);
        let s = traj.states();
        assert_eq!(arrows[0].theta, s[25][0]);
        assert_eq!(arrows[0].d_omega, s[25][1] - s[24][1]);
        assert_eq!(arrows[3].omega, s[100][1]);
        assert!(phase_arrows(&traj, 0).is_empty());
    }
}
