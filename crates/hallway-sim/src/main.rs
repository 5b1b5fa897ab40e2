//! Headless scene runner for Project Hallway.
//!
//! Loads a layout and tuning, replays a scripted player for a number of
//! ticks and prints a JSON report with the final reservation table.
//!
//! Usage: `hallway-sim [LAYOUT.toml] [SCENE.toml] [TICKS]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod script;

use anyhow::{Context, Result};
use hallway_ai::prelude::*;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::script::PlayerScript;

/// Layout used when none is given on the command line.
const DEMO_LAYOUT: &str = include_str!("../scenes/mansion.toml");

/// Fixed simulation step in seconds.
const DT: f32 = 0.1;

/// Ticks run when none are given on the command line.
const DEFAULT_TICKS: u32 = 900;

/// Count of outbound events by kind.
#[derive(Debug, Default, Serialize)]
struct EventTally {
    activated: usize,
    deactivated: usize,
    arrived: usize,
    escalations: usize,
    reservations: usize,
    transits: usize,
    dropped: usize,
}

impl EventTally {
    fn record(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::AgentActivated { .. } => self.activated += 1,
            SceneEvent::AgentDeactivated { .. } => self.deactivated += 1,
            SceneEvent::AgentArrivedAtZone { .. } => self.arrived += 1,
            SceneEvent::EscalationChanged { .. } => self.escalations += 1,
            SceneEvent::ReservationAcquired { .. } => self.reservations += 1,
            SceneEvent::TransitCompleted { .. } => self.transits += 1,
        }
    }
}

/// Final report printed to stdout.
#[derive(Debug, Serialize)]
struct Report {
    ticks: u32,
    escalation: EscalationState,
    player: PlayerTracker,
    events: EventTally,
    snapshot: ArbiterSnapshot,
}

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("hallway_ai=info".parse()?)
                .add_directive("hallway_sim=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let layout = match args.first() {
        Some(path) => SceneLayout::load(path)?,
        None => SceneLayout::from_toml(DEMO_LAYOUT).context("built-in layout is invalid")?,
    };
    let config = args.get(1).map_or_else(
        || SceneConfig {
            seed: Some(7),
            ..SceneConfig::default()
        },
        SceneConfig::load_from,
    );
    let ticks = args
        .get(2)
        .map(|s| s.parse::<u32>())
        .transpose()
        .context("tick count must be a positive integer")?
        .unwrap_or(DEFAULT_TICKS);

    info!("Project Hallway simulation starting ({ticks} ticks)");

    let mut director = Director::from_layout(config, &layout);
    let script = PlayerScript::demo();
    let vision = SightLineProbe::default();
    let mut tally = EventTally::default();

    for tick in 0..ticks {
        script.apply(tick, &mut director);
        director.tick(DT, &vision);
        for event in director.drain_events() {
            tally.record(&event);
        }
    }

    tally.dropped = director.events().dropped_count();
    let report = Report {
        ticks,
        escalation: director.escalation(),
        player: director.player().clone(),
        events: tally,
        snapshot: director.snapshot(),
    };
    info!(
        "Finished: stalker {:?}, {} transits completed",
        report.escalation, report.events.transits
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
