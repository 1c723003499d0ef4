use rpendulum::{scenario_catalog, Engine, Error, SCENARIO_DAMPED};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Error> {
    if let Err(e) = tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(LevelFilter::INFO)
            .finish(),
    ) {
        eprintln!("failed to install tracing subscriber: {}", e);
    }

    let id = std::env::args().nth(1).unwrap_or_else(|| SCENARIO_DAMPED.to_string());
    if let Some(info) = scenario_catalog().iter().find(|s| s.id == id) {
        info!(scenario = info.id, "{}", info.description);
    }

    let engine = Engine::new_builtin(&id)?;
    let constants = *engine.constants();

    let swing = engine.swing()?;
    let states = swing.trajectory.states();
    if let (Some(first), Some(last)) = (states.first(), states.last()) {
        info!(
            theta = last[0],
            omega = last[1],
            energy_start = constants.mechanical_energy(first),
            energy_end = constants.mechanical_energy(last),
            "final state"
        );
    }
    if let Some(s) = swing.samples.last() {
        println!(
            "bob at ({:.3}, {:.3}), arrow ({:.3}, {:.3})",
            s.position_x, s.position_y, s.velocity_x, s.velocity_y
        );
    }

    let portrait = engine.portrait()?;
    for (index, t, reason) in portrait.batch.failures() {
        warn!(index, t, %reason, "grid trajectory skipped");
    }
    println!(
        "portrait: {} trajectories, {} arrows",
        portrait.batch.successful().count(),
        portrait.arrows.len()
    );

    Ok(())
}
