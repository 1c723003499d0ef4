use rpendulum::{
    generate_phase_grid, integrate, linspace, project, run_batch, Engine, IntegrationStatus,
    PhysicalConstants, SimulationConfig, State, Tolerance,
};

/// Default constants with the drag coefficient replaced
pub fn constants_with_drag(drag: f64) -> PhysicalConstants {
    PhysicalConstants::new(drag, 1.293, 9.81, 1.0, 10.0, 0.05).unwrap()
}

// ==================================================================================
// Single trajectories
// ==================================================================================

#[test]
fn example_scenario_integrates_all_samples() {
    let constants = PhysicalConstants::default();
    let t_eval = linspace(0.0, 30.0, 900);
    let traj = integrate(
        &constants.vector_field(),
        State::new(-1.0, 2.0),
        (0.0, 30.0),
        &t_eval,
        &Tolerance::default(),
    )
    .unwrap();

    assert_eq!(traj.status(), IntegrationStatus::Success);
    assert_eq!(traj.len(), 900);
    assert_eq!(traj.times(), t_eval.as_slice());
    assert_eq!(traj.states()[0][0], -1.0);
    assert_eq!(traj.states()[0][1], 2.0);

    // Drag drains energy and the swing settles down
    let states = traj.states();
    let e0 = constants.mechanical_energy(&states[0]);
    let e1 = constants.mechanical_energy(&states[899]);
    assert!(e1 < e0, "energy did not decrease: {} -> {}", e0, e1);
    let peak = |s: &[State]| s.iter().map(|x| x[1].abs()).fold(0.0, f64::max);
    assert!(peak(&states[800..]) < peak(&states[..100]));
}

#[test]
fn frictionless_energy_is_conserved() {
    let constants = constants_with_drag(0.0);
    let tf = 20.0;
    let tol = Tolerance::new(1e-8, 1e-10);
    let traj = integrate(
        &constants.vector_field(),
        State::new(1.0, 0.0),
        (0.0, tf),
        &[0.0, tf],
        &tol,
    )
    .unwrap();
    assert!(traj.is_success());

    let e0 = constants.mechanical_energy(&traj.states()[0]);
    let e1 = constants.mechanical_energy(&traj.states()[1]);
    let drift = ((e1 - e0) / e0).abs();
    assert!(drift <= tol.rtol * tf, "relative energy drift {}", drift);
}

#[test]
fn swing_peaks_never_grow_with_drag() {
    let constants = PhysicalConstants::default();
    let t_eval = linspace(0.0, 60.0, 6001);
    let traj = integrate(
        &constants.vector_field(),
        State::new(1.0, 0.0),
        (0.0, 60.0),
        &t_eval,
        &Tolerance::new(1e-8, 1e-10),
    )
    .unwrap();
    assert!(traj.is_success());

    let s = traj.states();
    let peaks: Vec<f64> = (1..s.len() - 1)
        .filter(|&i| s[i][1] * s[i + 1][1] < 0.0)
        .map(|i| s[i][0].abs().max(s[i + 1][0].abs()))
        .collect();

    assert!(peaks.len() >= 10, "only {} turning points", peaks.len());
    for w in peaks.windows(2) {
        assert!(w[1] <= w[0] + 1e-9, "peak grew: {} -> {}", w[0], w[1]);
    }
    assert!(peaks[peaks.len() - 1] < 0.8 * peaks[0]);
}

#[test]
fn small_angle_start_matches_harmonic_motion() {
    let constants = PhysicalConstants::default();
    let theta0 = 0.01;
    let wn = constants.natural_frequency();
    let t_eval = linspace(0.0, 1.0, 11);
    let y0 = State::new(theta0, 0.0);
    let traj = integrate(
        &constants.vector_field(),
        y0,
        (0.0, 1.0),
        &t_eval,
        &Tolerance::new(1e-8, 1e-12),
    )
    .unwrap();

    assert!(traj.is_success());
    assert_eq!(traj.states()[0], y0);
    assert_eq!(*traj.times().last().unwrap(), 1.0);
    for (t, y) in traj.samples() {
        let expected = theta0 * (wn * t).cos();
        assert!((y[0] - expected).abs() < 1e-5, "t = {}: {} vs {}", t, y[0], expected);
    }
}

#[test]
fn repeated_integration_is_bit_identical() {
    let constants = PhysicalConstants::default();
    let t_eval = linspace(0.0, 30.0, 900);
    let run = || {
        integrate(
            &constants.vector_field(),
            State::new(-1.0, 2.0),
            (0.0, 30.0),
            &t_eval,
            &Tolerance::default(),
        )
        .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.stats(), b.stats());
    for (x, y) in a.states().iter().zip(b.states()) {
        assert_eq!(x[0].to_bits(), y[0].to_bits());
        assert_eq!(x[1].to_bits(), y[1].to_bits());
    }
    assert_eq!(a, b);
}

#[test]
fn projected_samples_sit_on_the_rod_circle() {
    let constants = PhysicalConstants::default();
    let t_eval = linspace(0.0, 30.0, 900);
    let traj = integrate(
        &constants.vector_field(),
        State::new(-1.0, 2.0),
        (0.0, 30.0),
        &t_eval,
        &Tolerance::default(),
    )
    .unwrap();
    let samples = project(&traj, &constants);
    assert_eq!(samples.len(), 900);
    let first = samples[0];
    assert!((first.position_x - 10.0 * (-1.0f64).sin()).abs() < 1e-12);
    assert!((first.position_y + 10.0 * (-1.0f64).cos()).abs() < 1e-12);
    assert!((first.velocity_x - 0.5 * 2.0 * (-1.0f64).cos()).abs() < 1e-12);
    assert!((first.velocity_y - 0.5 * 2.0 * (-1.0f64).sin()).abs() < 1e-12);
}

// ==================================================================================
// Phase portrait
// ==================================================================================

#[test]
fn sixty_four_entry_grid_sweeps_two_sheets() {
    let theta_max = 8.0 * std::f64::consts::PI;
    let omega_max = 6.4;
    let grid = generate_phase_grid(64, theta_max, omega_max).unwrap();
    let s = grid.states();
    assert_eq!(s.len(), 64);
    assert_eq!(s[0][1], omega_max);
    for w in s.windows(2) {
        assert!(w[1][1] < w[0][1]);
    }
    assert!(s[63][1] > -omega_max);
    assert!(s[..32].iter().all(|x| x[0] == -theta_max));
    assert!(s[32..].iter().all(|x| x[0] == theta_max));
}

#[test]
fn batch_matches_individual_runs() {
    let constants = PhysicalConstants::default();
    let field = constants.vector_field();
    let grid = generate_phase_grid(8, 1.5, 0.8).unwrap();
    let t_eval = linspace(0.0, 10.0, 101);
    let tol = Tolerance::default();
    let batch = run_batch(&field, &grid, (0.0, 10.0), &t_eval, &tol).unwrap();

    assert_eq!(batch.len(), 8);
    for (traj, y0) in batch.trajectories().iter().zip(grid.iter()) {
        let single = integrate(&field, *y0, (0.0, 10.0), &t_eval, &tol).unwrap();
        assert_eq!(traj, &single);
    }
}

#[test]
fn default_engine_runs_end_to_end() {
    let mut config = SimulationConfig::default();
    config.portrait.count = 8;
    let engine = Engine::new(config).unwrap();

    let swing = engine.swing().unwrap();
    assert_eq!(swing.samples.len(), 900);

    let portrait = engine.portrait().unwrap();
    assert_eq!(portrait.batch.len(), 8);
    let expected: usize = portrait
        .batch
        .successful()
        .map(|t| (t.len() - 1) / 25)
        .sum();
    assert_eq!(portrait.arrows.len(), expected);
}

#[test]
fn invalid_configuration_never_integrates() {
    let bad = SimulationConfig { length: 0.0, ..SimulationConfig::default() };
    assert!(matches!(Engine::new(bad), Err(rpendulum::Error::InvalidConfiguration(_))));
}
