//! Adaptive Dormand–Prince 5(4) integration with dense output.
//!
//! [`integrate`] advances `dy/dt = f(t, y)` over `[t0, tf]` with an internal
//! step that is independent of the requested output times. Each accepted step
//! builds a quartic interpolant from its stage derivatives, and every output
//! time that falls inside the step is evaluated through it.
//!
//! Failures (step underflow, exhausted step budget, non-finite state) do not
//! abort with an error: the returned [`Trajectory`] carries a failed status and
//! the prefix of output times that were reached.

use crate::error::{Error, FailureReason, Result};
use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_RTOL: f64 = 1e-3;
pub const DEFAULT_ATOL: f64 = 1e-6;
pub const DEFAULT_MAX_STEPS: usize = 100_000;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
// -1 / (embedded order + 1)
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

const N_STAGES: usize = 6;
const INTERPOLANT_ORDER: usize = 4;

const C: [f64; N_STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; N_STAGES - 1]; N_STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
];

const B: [f64; N_STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

// Difference between the 5th and embedded 4th order weights, FSAL stage last.
const E: [f64; N_STAGES + 1] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

// Dense output coefficients: y(t_old + x·h) = y_old + h · Σ_p (Σ_j K_j P[j][p]) x^(p+1)
const P: [[f64; INTERPOLANT_ORDER]; N_STAGES + 1] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

/// Right-hand side `f(t, y)` of a first-order ODE system.
pub trait VectorField<const D: usize>: Sync {
    fn eval(&self, t: f64, y: &SVector<f64, D>) -> SVector<f64, D>;
}

// Any closure Fn(t, y) -> dy/dt works as a field
impl<F, const D: usize> VectorField<D> for F
where
    F: Fn(f64, &SVector<f64, D>) -> SVector<f64, D> + Sync,
{
    fn eval(&self, t: f64, y: &SVector<f64, D>) -> SVector<f64, D> {
        (self)(t, y)
    }
}

/// Accuracy knobs and limits for one integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
    /// Budget of step attempts (accepted + rejected).
    pub max_steps: usize,
    pub max_step: Option<f64>,
    pub first_step: Option<f64>,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            max_steps: DEFAULT_MAX_STEPS,
            max_step: None,
            first_step: None,
        }
    }
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(Error::config(format!("rtol must be finite and positive, got {}", self.rtol)));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(Error::config(format!("atol must be finite and positive, got {}", self.atol)));
        }
        if self.max_steps == 0 {
            return Err(Error::config("max_steps must be at least 1"));
        }
        if let Some(h) = self.max_step {
            if !(h > 0.0) {
                return Err(Error::config(format!("max_step must be positive, got {}", h)));
            }
        }
        if let Some(h) = self.first_step {
            if !(h.is_finite() && h > 0.0) {
                return Err(Error::config(format!("first_step must be finite and positive, got {}", h)));
            }
        }
        Ok(())
    }
}

/// Checks `t0 < tf` and that `t_eval` is a non-empty, ordered subset of `[t0, tf]`.
pub fn validate_span(t_span: (f64, f64), t_eval: &[f64]) -> Result<()> {
    let (t0, tf) = t_span;
    if !(t0.is_finite() && tf.is_finite()) {
        return Err(Error::config(format!("time span ({}, {}) must be finite", t0, tf)));
    }
    if t0 >= tf {
        return Err(Error::config(format!("time span requires t0 < tf, got ({}, {})", t0, tf)));
    }
    if t_eval.is_empty() {
        return Err(Error::config("t_eval must not be empty"));
    }
    for (i, &t) in t_eval.iter().enumerate() {
        if !(t >= t0 && t <= tf) {
            return Err(Error::config(format!(
                "t_eval[{}] = {} lies outside [{}, {}]",
                i, t, t0, tf
            )));
        }
        if i > 0 && t < t_eval[i - 1] {
            return Err(Error::config(format!("t_eval is not ordered at index {}", i)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegrationStatus {
    Success,
    /// Stopped at time `t`; only the output times up to `t` were produced.
    Failed { t: f64, reason: FailureReason },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Number of right-hand side evaluations.
    pub evaluations: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// States sampled at the requested output times, plus how the run went.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<const D: usize> {
    initial: SVector<f64, D>,
    t_span: (f64, f64),
    times: Vec<f64>,
    states: Vec<SVector<f64, D>>,
    status: IntegrationStatus,
    stats: SolverStats,
    max_error_norm: f64,
    tolerance: Tolerance,
}

impl<const D: usize> Trajectory<D> {
    pub fn initial(&self) -> &SVector<f64, D> { &self.initial }
    pub fn t_span(&self) -> (f64, f64) { self.t_span }
    pub fn times(&self) -> &[f64] { &self.times }
    pub fn states(&self) -> &[SVector<f64, D>] { &self.states }
    pub fn status(&self) -> IntegrationStatus { self.status }
    pub fn stats(&self) -> SolverStats { self.stats }
    pub fn tolerance(&self) -> &Tolerance { &self.tolerance }

    /// Largest scaled error norm among accepted steps; at most 1.
    pub fn max_error_norm(&self) -> f64 { self.max_error_norm }

    pub fn len(&self) -> usize { self.times.len() }
    pub fn is_empty(&self) -> bool { self.times.is_empty() }
    pub fn is_success(&self) -> bool { self.status == IntegrationStatus::Success }

    pub fn samples(&self) -> impl Iterator<Item = (f64, &SVector<f64, D>)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Returns the trajectory only if it covers every requested time.
    pub fn into_complete(self) -> Result<Self> {
        match self.status {
            IntegrationStatus::Success => Ok(self),
            IntegrationStatus::Failed { t, reason } => Err(Error::IntegrationFailure { t, reason }),
        }
    }
}

/// Solution over one accepted step, valid on `[t_old, t_old + h]`.
struct DenseStep<const D: usize> {
    t_old: f64,
    h: f64,
    y_old: SVector<f64, D>,
    q: [SVector<f64, D>; INTERPOLANT_ORDER],
}

impl<const D: usize> DenseStep<D> {
    fn eval(&self, t: f64) -> SVector<f64, D> {
        let x = (t - self.t_old) / self.h;
        let mut power = x;
        let mut acc = SVector::<f64, D>::zeros();
        for q in &self.q {
            acc += q * power;
            power *= x;
        }
        self.y_old + acc * self.h
    }
}

/// Working state of one integration. Nothing here outlives the call.
struct DormandPrince<'a, F, const D: usize> {
    field: &'a F,
    t: f64,
    y: SVector<f64, D>,
    f: SVector<f64, D>,
    h_abs: f64,
    t_bound: f64,
    rtol: f64,
    atol: f64,
    max_step: f64,
    max_steps: usize,
    // Stage buffer reused between attempts, last slot is f(t + h, y_new)
    k: [SVector<f64, D>; N_STAGES + 1],
    stats: SolverStats,
    max_error_norm: f64,
}

impl<'a, F: VectorField<D>, const D: usize> DormandPrince<'a, F, D> {
    fn new(field: &'a F, t0: f64, y0: SVector<f64, D>, t_bound: f64, tol: &Tolerance) -> Self {
        // Tighter than this the error estimate is pure rounding noise
        let rtol = tol.rtol.max(100.0 * f64::EPSILON);
        let max_step = tol.max_step.unwrap_or(f64::INFINITY);
        let f0 = field.eval(t0, &y0);
        let mut solver = Self {
            field,
            t: t0,
            y: y0,
            f: f0,
            h_abs: 0.0,
            t_bound,
            rtol,
            atol: tol.atol,
            max_step,
            max_steps: tol.max_steps,
            k: [SVector::zeros(); N_STAGES + 1],
            stats: SolverStats { evaluations: 1, ..SolverStats::default() },
            max_error_norm: 0.0,
        };
        solver.h_abs = match tol.first_step {
            Some(h) => h.min(t_bound - t0).min(max_step),
            None => solver.initial_step(),
        };
        solver
    }

    fn rms(v: &SVector<f64, D>) -> f64 {
        if D == 0 {
            return 0.0;
        }
        v.norm() / (D as f64).sqrt()
    }

    /// Hairer–Wanner starting step estimate; costs one extra evaluation.
    fn initial_step(&mut self) -> f64 {
        let interval = self.t_bound - self.t;
        let scale = self.y.map(|v| self.atol + v.abs() * self.rtol);
        let d0 = Self::rms(&self.y.component_div(&scale));
        let d1 = Self::rms(&self.f.component_div(&scale));

        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(interval);

        let y1 = self.y + self.f * h0;
        let f1 = self.field.eval(self.t + h0, &y1);
        self.stats.evaluations += 1;
        let d2 = Self::rms(&(f1 - self.f).component_div(&scale)) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };
        (100.0 * h0).min(h1).min(interval).min(self.max_step)
    }

    /// Fills the stage buffer for a step of size `h` and returns the 5th order state.
    fn attempt(&mut self, h: f64) -> SVector<f64, D> {
        self.k[0] = self.f;
        for s in 1..N_STAGES {
            let mut dy = SVector::<f64, D>::zeros();
            for j in 0..s {
                dy += self.k[j] * A[s][j];
            }
            self.k[s] = self.field.eval(self.t + C[s] * h, &(self.y + dy * h));
        }
        let mut incr = SVector::<f64, D>::zeros();
        for j in 0..N_STAGES {
            incr += self.k[j] * B[j];
        }
        let y_new = self.y + incr * h;
        self.k[N_STAGES] = self.field.eval(self.t + h, &y_new);
        self.stats.evaluations += N_STAGES;
        y_new
    }

    fn error_norm(&self, h: f64, y_new: &SVector<f64, D>) -> f64 {
        let mut err = SVector::<f64, D>::zeros();
        for (k, e) in self.k.iter().zip(E.iter()) {
            err += k * *e;
        }
        err *= h;
        let mut scaled = SVector::<f64, D>::zeros();
        for i in 0..D {
            let scale = self.atol + self.rtol * self.y[i].abs().max(y_new[i].abs());
            scaled[i] = err[i] / scale;
        }
        Self::rms(&scaled)
    }

    fn dense(&self, h: f64) -> DenseStep<D> {
        let mut q = [SVector::<f64, D>::zeros(); INTERPOLANT_ORDER];
        for (k, row) in self.k.iter().zip(P.iter()) {
            for (qp, coef) in q.iter_mut().zip(row.iter()) {
                *qp += k * *coef;
            }
        }
        DenseStep { t_old: self.t, h, y_old: self.y, q }
    }

    /// Advances by one accepted step, retrying with smaller steps on rejection.
    fn step(&mut self) -> std::result::Result<DenseStep<D>, FailureReason> {
        let t = self.t;
        let min_step = 10.0 * (f64::EPSILON * t.abs()).max(f64::MIN_POSITIVE);
        if self.h_abs > self.max_step {
            self.h_abs = self.max_step;
        } else if self.h_abs < min_step {
            self.h_abs = min_step;
        }

        let mut rejected = false;
        loop {
            if self.h_abs < min_step {
                return Err(FailureReason::StepUnderflow { h: self.h_abs, min_step });
            }
            if self.stats.accepted + self.stats.rejected >= self.max_steps {
                return Err(FailureReason::MaxStepsExceeded(self.max_steps));
            }

            // Never step past the end of the span
            let t_new = (t + self.h_abs).min(self.t_bound);
            let h = t_new - t;
            self.h_abs = h;

            let y_new = self.attempt(h);
            let error_norm = self.error_norm(h, &y_new);
            if !error_norm.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
                return Err(FailureReason::NonFinite);
            }

            if error_norm <= 1.0 {
                let mut factor = if error_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * error_norm.powf(ERROR_EXPONENT))
                };
                if rejected {
                    factor = factor.min(1.0);
                }
                self.h_abs *= factor;

                let dense = self.dense(h);
                self.t = t_new;
                self.y = y_new;
                self.f = self.k[N_STAGES];
                self.stats.accepted += 1;
                self.max_error_norm = self.max_error_norm.max(error_norm);
                return Ok(dense);
            }

            self.h_abs *= MIN_FACTOR.max(SAFETY * error_norm.powf(ERROR_EXPONENT));
            self.stats.rejected += 1;
            rejected = true;
        }
    }
}

/// Integrates `field` from `y0` over `t_span`, sampling the solution at `t_eval`.
///
/// Returns `Err` only for invalid input. A run that stops early is reported
/// through [`Trajectory::status`]; check it before assuming full coverage.
pub fn integrate<F, const D: usize>(
    field: &F,
    y0: SVector<f64, D>,
    t_span: (f64, f64),
    t_eval: &[f64],
    tolerance: &Tolerance,
) -> Result<Trajectory<D>>
where
    F: VectorField<D>,
{
    validate_span(t_span, t_eval)?;
    tolerance.validate()?;
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(Error::config("initial state must be finite"));
    }

    let (t0, tf) = t_span;
    let mut times = Vec::with_capacity(t_eval.len());
    let mut states = Vec::with_capacity(t_eval.len());
    let mut next = 0;

    // Samples at t0 are the initial state itself
    while next < t_eval.len() && t_eval[next] <= t0 {
        times.push(t_eval[next]);
        states.push(y0);
        next += 1;
    }

    let mut solver = DormandPrince::new(field, t0, y0, tf, tolerance);
    let mut status = IntegrationStatus::Success;

    while next < t_eval.len() && solver.t < tf {
        match solver.step() {
            Ok(dense) => {
                while next < t_eval.len() && t_eval[next] <= solver.t {
                    let t = t_eval[next];
                    let y = if t == solver.t { solver.y } else { dense.eval(t) };
                    times.push(t);
                    states.push(y);
                    next += 1;
                }
            }
            Err(reason) => {
                warn!(t = solver.t, %reason, produced = times.len(), requested = t_eval.len(), "integration stopped early");
                status = IntegrationStatus::Failed { t: solver.t, reason };
                break;
            }
        }
    }

    debug!(
        accepted = solver.stats.accepted,
        rejected = solver.stats.rejected,
        evaluations = solver.stats.evaluations,
        samples = times.len(),
        "integration finished"
    );

    Ok(Trajectory {
        initial: y0,
        t_span,
        times,
        states,
        status,
        stats: solver.stats,
        max_error_norm: solver.max_error_norm,
        tolerance: *tolerance,
    })
}

/// `n` evenly spaced points from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}
