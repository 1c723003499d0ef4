use crate::error::{Error, Result};
use nalgebra::Vector2;
use std::f64::consts::PI;

pub const DEFAULT_DRAG_COEFFICIENT: f64 = 0.48;
pub const DEFAULT_AIR_DENSITY: f64 = 1.293;
pub const DEFAULT_GRAVITY: f64 = 9.81;
pub const DEFAULT_MASS: f64 = 1.0;
pub const DEFAULT_LENGTH: f64 = 10.0;
pub const DEFAULT_BOB_RADIUS: f64 = 0.05;

/// Phase-space point: [angle (rad), angular velocity (rad/s)].
pub type State = Vector2<f64>;

/// Fixed physical constants of the pendulum. Built once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    drag_coefficient: f64,
    air_density: f64,
    gravity: f64,
    mass: f64,
    length: f64,
    bob_radius: f64,
    cross_sectional_area: f64,
}

impl PhysicalConstants {
    /// Validates the constants and derives the bob's cross-sectional area `π·R²`.
    ///
    /// The drag coefficient may be zero (frictionless pendulum); every other
    /// constant must be strictly positive and finite.
    pub fn new(
        drag_coefficient: f64,
        air_density: f64,
        gravity: f64,
        mass: f64,
        length: f64,
        bob_radius: f64,
    ) -> Result<Self> {
        if !(drag_coefficient.is_finite() && drag_coefficient >= 0.0) {
            return Err(Error::config(format!(
                "drag coefficient must be finite and non-negative, got {}",
                drag_coefficient
            )));
        }
        for (name, value) in [
            ("air density", air_density),
            ("gravity", gravity),
            ("mass", mass),
            ("length", length),
            ("bob radius", bob_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::config(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            drag_coefficient,
            air_density,
            gravity,
            mass,
            length,
            bob_radius,
            cross_sectional_area: PI * bob_radius * bob_radius,
        })
    }

    pub fn drag_coefficient(&self) -> f64 { self.drag_coefficient }
    pub fn air_density(&self) -> f64 { self.air_density }
    pub fn gravity(&self) -> f64 { self.gravity }
    pub fn mass(&self) -> f64 { self.mass }
    pub fn length(&self) -> f64 { self.length }
    pub fn bob_radius(&self) -> f64 { self.bob_radius }
    pub fn cross_sectional_area(&self) -> f64 { self.cross_sectional_area }

    /// Small-oscillation angular frequency `√(g/L)`.
    pub fn natural_frequency(&self) -> f64 {
        (self.gravity / self.length).sqrt()
    }

    /// `C·ρ·A·L / (2m)`, the coefficient in front of `ω·|ω|`.
    fn drag_factor(&self) -> f64 {
        self.drag_coefficient * self.air_density * self.cross_sectional_area * self.length
            / (2.0 * self.mass)
    }

    /// dθ/dt = ω, dω/dt = −k·ω·|ω| − (g/L)·sin θ.
    ///
    /// The drag term keeps the sign of ω, so the torque always opposes motion.
    pub fn derivative(&self, state: &State) -> State {
        let theta = state[0];
        let omega = state[1];
        let domega = -self.drag_factor() * omega * omega.abs()
            - self.gravity * theta.sin() / self.length;
        State::new(omega, domega)
    }

    /// The derivative as a time-independent vector field for the integrator.
    pub fn vector_field(&self) -> impl Fn(f64, &State) -> State + Sync + Copy + use<> {
        let constants = *self;
        move |_t: f64, state: &State| constants.derivative(state)
    }

    /// Kinetic plus potential energy, zero at rest hanging straight down.
    pub fn mechanical_energy(&self, state: &State) -> f64 {
        let (theta, omega) = (state[0], state[1]);
        let l = self.length;
        0.5 * self.mass * l * l * omega * omega
            + self.mass * self.gravity * l * (1.0 - theta.cos())
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            drag_coefficient: DEFAULT_DRAG_COEFFICIENT,
            air_density: DEFAULT_AIR_DENSITY,
            gravity: DEFAULT_GRAVITY,
            mass: DEFAULT_MASS,
            length: DEFAULT_LENGTH,
            bob_radius: DEFAULT_BOB_RADIUS,
            cross_sectional_area: PI * DEFAULT_BOB_RADIUS * DEFAULT_BOB_RADIUS,
        }
    }
}
