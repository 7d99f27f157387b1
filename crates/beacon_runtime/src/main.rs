//! Beacon Runtime
//!
//! Loads a scenario (or the built-in demo), spawns its robots and runs the
//! tick loop: move every body, rebuild the RAB grid, report.
//!
//! Usage: `beacon [scenario.json]`

use anyhow::{Context, Result};
use beacon_core::glam::{Quat, Vec3};
use beacon_core::{AnchorTable, EntityId, EntityTree, RabMedium, SimulationTime, SweepError};
use beacon_metrics::SweepTimer;
use beacon_services::{Robot, Scenario};

const DEMO_ROBOTS: usize = 6;
const DEMO_RADIUS: f32 = 2.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Beacon v{}", beacon_core::VERSION);

    let scenario = match std::env::args().nth(1) {
        Some(path) => Scenario::load(&path).with_context(|| format!("loading scenario {path}"))?,
        None => {
            tracing::info!("No scenario given, running the demo");
            Scenario::demo(DEMO_ROBOTS, DEMO_RADIUS)
        }
    };
    let settings = &scenario.settings;

    let mut tree = EntityTree::new();
    let mut anchors = AnchorTable::new();
    let mut medium = RabMedium::new(&settings.grid.arena(), settings.grid.coverage)
        .context("building the RAB grid")?;

    let mut robots = Vec::with_capacity(scenario.robots.len());
    for node in &scenario.robots {
        let robot = Robot::assemble(node, &mut tree, &mut anchors, &mut medium)
            .map_err(|err| anyhow::anyhow!(err.chain_message()))?;
        robots.push(robot);
    }
    tracing::info!(
        robots = robots.len(),
        devices = medium.len(),
        coverage = ?settings.grid.coverage,
        "Scenario initialized"
    );

    let mut time = SimulationTime::with_rate(settings.simulation.ticks_per_second);
    let step_angle =
        settings.simulation.orbit_degrees_per_second.to_radians() * time.tick_duration().as_secs_f32();
    let step = Quat::from_rotation_z(step_angle);
    let center = settings.grid.center();

    for _ in 0..settings.simulation.ticks {
        time.advance_tick();
        for robot in &robots {
            let (position, orientation) = robot.pose(&anchors)?;
            let moved = center + step * (position - center);
            anchors.move_body(robot.body, moved, step * orientation);
        }

        match medium.update(&tree, &anchors) {
            Ok(stats) => tracing::debug!(
                tick = time.tick_count(),
                registered = stats.entities_registered,
                cells = stats.cells_updated,
                "tick"
            ),
            Err(err) => report_failures(time.tick_count(), &err),
        }
    }

    for robot in &robots {
        for &rab in &robot.rabs {
            let Some(device) = medium.rab(rab) else {
                continue;
            };
            let heard = neighbours(&medium, device.position(), rab);
            tracing::info!(robot = %robot.id, neighbours = heard, "final reception");
        }
    }

    let timer: &SweepTimer = medium.sweep_timer();
    let (fastest, slowest) = timer.sweep_time_range_ms();
    tracing::info!(
        ticks = time.tick_count(),
        simulated_secs = time.total_time().as_secs_f32(),
        sweeps = medium.counters().get("sweeps"),
        failed = medium.counters().get("entities_failed"),
        out_of_bounds = medium.counters().get("cells_out_of_bounds"),
        avg_ms = timer.sweep_time_ms(),
        fastest_ms = fastest,
        slowest_ms = slowest,
        "Run complete"
    );

    Ok(())
}

/// Devices other than `own` whose range covers `point`.
fn neighbours(medium: &RabMedium, point: Vec3, own: EntityId) -> usize {
    medium
        .senders_reaching(point)
        .into_iter()
        .filter(|&sender| sender != own)
        .count()
}

fn report_failures(tick: u64, err: &SweepError) {
    tracing::warn!(tick, registered = err.stats.entities_registered, "{err}");
    for failure in &err.failures {
        tracing::warn!(path = %failure.path, cause = %failure.source.chain_message(), "{failure}");
    }
}
