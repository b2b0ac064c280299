#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Throne Defence session.

mod rally;

use std::{collections::VecDeque, path::PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use throne_defence_core::{BuildingDirectory, BuildingKind, Event, Team, Vec2};
use throne_defence_system_bootstrap::{
    headless::{RecordingPool, TopDownCamera},
    Frontend, Session, SessionConfig, TickReport,
};
use throne_defence_system_input::InputFrame;
use throne_defence_system_scheduler::{BackgroundTimer, MainThreadQueue};
use throne_defence_world::query;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Runs a Throne Defence session without a window and prints how it went.
#[derive(Debug, Parser)]
#[command(name = "throne-defence", version)]
struct Cli {
    /// TOML session configuration; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of fixed ticks to simulate.
    #[arg(long, default_value_t = 1200)]
    ticks: u32,
    /// Overrides the tick length in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Overrides the spawn position seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Paces ticks against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Selects the starting minions and orders them to `x,z`.
    #[arg(long, value_parser = rally::parse_point)]
    rally: Option<Vec2>,
    /// Log filter directive; falls back to RUST_LOG, then `info`.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load session from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    ensure!(config.tick_ms > 0, "tick length must be at least one millisecond");
    let tick = config.tick();

    let mut script = match cli.rally {
        Some(point) => rally::script(&config, point),
        None => VecDeque::new(),
    };
    let mut session = Session::new(config).context("failed to start the session")?;
    let camera = TopDownCamera::default();
    let mut pool = RecordingPool::default();

    let pacing = if cli.realtime {
        let queue = MainThreadQueue::new();
        let timer = BackgroundTimer::start(tick, queue.sender(), || ())
            .context("failed to start the frame timer")?;
        Some((queue, timer))
    } else {
        None
    };

    let mut summary = Summary::default();
    for _ in 0..cli.ticks {
        if let Some((queue, _)) = &pacing {
            if queue.wait(tick * 4).is_none() {
                warn!("frame timer stalled");
            }
        }

        let frame = script
            .pop_front()
            .unwrap_or_else(|| InputFrame::new(Vec2::ZERO));
        let report = session.tick(
            tick,
            &frame,
            Frontend {
                projector: &camera,
                pool: &mut pool,
            },
        )?;
        summary.record(&report);

        if query::is_game_over(session.world()) {
            warn!("the throne has fallen");
            break;
        }
    }
    info!(ticks = summary.ticks, "session finished");

    summary.print(&session);
    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter {directive:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to install the log subscriber")
}

#[derive(Debug, Default)]
struct Summary {
    ticks: u32,
    friends_lost: usize,
    enemies_slain: usize,
    revivals: usize,
    arrows_fired: usize,
    gold_earned: u64,
}

impl Summary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        for event in &report.events {
            match event {
                Event::UnitDied {
                    team: Team::Friends,
                    ..
                } => self.friends_lost += 1,
                Event::UnitDied {
                    team: Team::Enemies,
                    ..
                } => self.enemies_slain += 1,
                Event::UnitRevived { .. } => self.revivals += 1,
                Event::ProjectileFired { .. } => self.arrows_fired += 1,
                Event::GoldChanged { old, new } => {
                    self.gold_earned += new.saturating_sub(*old);
                }
                _ => {}
            }
        }
    }

    fn print(&self, session: &Session) {
        let world = session.world();
        println!("{}", query::welcome_banner(world));
        println!(
            "simulated {:.1} s over {} ticks",
            query::elapsed(world).as_secs_f32(),
            self.ticks
        );
        println!(
            "waves spawned: {}{}",
            session.spawner().waves_spawned(),
            if session.spawner().is_finished() {
                " (all)"
            } else {
                ""
            }
        );
        println!(
            "friends alive: {} (lost {}, revived {})",
            query::living_units_of(world, Team::Friends).len(),
            self.friends_lost,
            self.revivals
        );
        println!(
            "enemies alive: {} (slain {})",
            query::living_units_of(world, Team::Enemies).len(),
            self.enemies_slain
        );
        match world
            .building_of_kind(BuildingKind::Throne)
            .and_then(|id| world.building(id))
        {
            Some(throne) => println!("throne: {:.0} / {:.0}", throne.health, throne.max_health),
            None => println!("throne: destroyed"),
        }
        println!("gold: {} (earned {})", query::gold(world), self.gold_earned);
        if let Some(production) = world
            .building_of_kind(BuildingKind::Barracks)
            .and_then(|id| world.building(id))
            .and_then(|barracks| barracks.production)
        {
            println!(
                "barracks: level {}, one {} every {:.1} s",
                production.level,
                production.unit.display_name(),
                production.spawn_interval().as_secs_f32()
            );
        }
        if self.arrows_fired > 0 {
            println!("arrows fired: {}", self.arrows_fired);
        }
        let selected = session.selector().controllable_units().len();
        if selected > 0 {
            println!("units under orders: {selected}");
        }
    }
}
