#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner responsible for emitting enemy spawn commands.
//!
//! Waves run one after another. Each wave waits for its start delay, then
//! spawns its enemy sheets one enemy at a time with a short gap between
//! enemies. Positions are drawn from a seeded generator inside the spawn
//! area, so a given seed always replays the same waves.

use std::{collections::VecDeque, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use throne_defence_core::{Command, Event, UnitKind, Vec2};
use tracing::{info, warn};

/// Gap between two enemies of the same wave.
pub const DEFAULT_DELAY_BETWEEN_ENEMIES: Duration = Duration::from_millis(10);

/// Default corner of the spawn area.
pub const DEFAULT_SPAWN_FROM: Vec2 = Vec2::new(-48.0, 48.0);

/// Default opposite corner of the spawn area.
pub const DEFAULT_SPAWN_TO: Vec2 = Vec2::new(48.0, 48.0);

/// Wave settings the spawner cannot run.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SpawnError {
    /// Start delay that is negative, not finite or too long for a duration.
    #[error("wave {wave} has an unusable start delay of {secs} seconds")]
    InvalidWaveDelay {
        /// Index of the wave.
        wave: usize,
        /// Rejected delay.
        secs: f32,
    },
    /// Spawn rectangle whose corners or extent are not finite.
    #[error("spawn area from {from} to {to} is not finite")]
    InvalidArea {
        /// Rejected corner.
        from: Vec2,
        /// Rejected opposite corner.
        to: Vec2,
    },
}

/// A number of enemies of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySheet {
    /// Kind of the enemies.
    pub kind: UnitKind,
    /// How many to spawn. Values below one count as one.
    pub count: u32,
}

/// A wave of enemies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveData {
    /// Seconds to wait after the previous wave before this one starts.
    #[serde(default)]
    pub start_delay_secs: f32,
    /// Enemies spawned by the wave, in order.
    pub enemies: Vec<EnemySheet>,
}

/// Rectangle on the ground where enemies appear. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    /// One corner.
    pub from: Vec2,
    /// Opposite corner.
    pub to: Vec2,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            from: DEFAULT_SPAWN_FROM,
            to: DEFAULT_SPAWN_TO,
        }
    }
}

/// Configuration parameters required to construct the wave spawner.
#[derive(Clone, Debug)]
pub struct Config {
    waves: Vec<WaveData>,
    area: SpawnArea,
    delay_between_enemies: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration spawning `waves` inside `area`.
    #[must_use]
    pub fn new(waves: Vec<WaveData>, area: SpawnArea, rng_seed: u64) -> Self {
        Self {
            waves,
            area,
            delay_between_enemies: DEFAULT_DELAY_BETWEEN_ENEMIES,
            rng_seed,
        }
    }

    /// Checks that every wave delay converts to a duration and that the
    /// spawn area can be sampled.
    pub fn validate(&self) -> Result<(), SpawnError> {
        for (wave, data) in self.waves.iter().enumerate() {
            let secs = data.start_delay_secs;
            if Duration::try_from_secs_f32(secs).is_err() {
                return Err(SpawnError::InvalidWaveDelay { wave, secs });
            }
        }
        let SpawnArea { from, to } = self.area;
        if !from.is_finite() || !to.is_finite() || !(to - from).is_finite() {
            return Err(SpawnError::InvalidArea { from, to });
        }
        Ok(())
    }

    /// Overrides the gap between two enemies.
    #[must_use]
    pub fn with_delay_between_enemies(mut self, delay: Duration) -> Self {
        self.delay_between_enemies = delay;
        self
    }
}

/// Progress notifications of the spawner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnReport {
    /// Every enemy of the wave at `wave` (zero-based) has been spawned.
    WaveSpawned {
        /// Index of the wave.
        wave: usize,
    },
    /// The last wave has been spawned.
    WavesEnded,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Wait(Duration),
    Spawn(UnitKind),
    WaveDone(usize),
}

/// Pure system that turns the wave list into timed spawn commands.
#[derive(Debug)]
pub struct WaveSpawner {
    waves: Vec<WaveData>,
    area: SpawnArea,
    delay_between_enemies: Duration,
    rng: ChaCha8Rng,
    plan: VecDeque<Step>,
    started: bool,
    waves_spawned: usize,
}

impl WaveSpawner {
    /// Creates a spawner using the supplied configuration. It stays idle
    /// until [`WaveSpawner::start`] is called. A configuration rejected by
    /// [`Config::validate`] disables spawning.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let valid = config.validate();
        let mut waves = config.waves;
        if let Err(error) = valid {
            warn!(%error, "invalid wave configuration; enemy spawning is disabled");
            waves.clear();
        } else if waves.is_empty() {
            warn!("no waves configured; enemy spawning is disabled");
        }
        Self {
            waves,
            area: config.area,
            delay_between_enemies: config.delay_between_enemies,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            plan: VecDeque::new(),
            started: false,
            waves_spawned: 0,
        }
    }

    /// Starts the first wave. Later calls are ignored.
    pub fn start(&mut self) {
        if self.started || self.waves.is_empty() {
            return;
        }
        self.started = true;
        for (index, wave) in self.waves.iter().enumerate() {
            let delay = Duration::try_from_secs_f32(wave.start_delay_secs).unwrap_or_default();
            self.plan.push_back(Step::Wait(delay));
            for sheet in &wave.enemies {
                for _ in 0..sheet.count.max(1) {
                    self.plan.push_back(Step::Spawn(sheet.kind));
                    self.plan.push_back(Step::Wait(self.delay_between_enemies));
                }
            }
            self.plan.push_back(Step::WaveDone(index));
        }
        info!(waves = self.waves.len(), "waves started");
    }

    /// Reports whether spawning has started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Reports whether every wave has been spawned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.started && self.plan.is_empty()
    }

    /// Number of waves fully spawned so far.
    #[must_use]
    pub fn waves_spawned(&self) -> usize {
        self.waves_spawned
    }

    /// Consumes world events to emit spawn commands for elapsed time.
    pub fn handle(
        &mut self,
        events: &[Event],
        out: &mut Vec<Command>,
        reports: &mut Vec<SpawnReport>,
    ) {
        if self.is_finished() || !self.started {
            return;
        }

        let mut budget = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                budget = budget.saturating_add(*dt);
            }
        }

        while let Some(step) = self.plan.front_mut() {
            match step {
                Step::Wait(left) => {
                    if *left > budget {
                        *left -= budget;
                        return;
                    }
                    budget -= *left;
                }
                Step::Spawn(kind) => {
                    let kind = *kind;
                    let position = self.random_position();
                    out.push(Command::SpawnUnit { kind, position });
                }
                Step::WaveDone(wave) => {
                    let wave = *wave;
                    info!(wave, "wave spawned");
                    self.waves_spawned += 1;
                    reports.push(SpawnReport::WaveSpawned { wave });
                }
            }
            let _ = self.plan.pop_front();
        }

        info!("waves have ended");
        reports.push(SpawnReport::WavesEnded);
    }

    fn random_position(&mut self) -> Vec2 {
        let min = self.area.from.min(self.area.to);
        let max = self.area.from.max(self.area.to);
        Vec2::new(
            self.rng.gen_range(min.x..=max.x),
            self.rng.gen_range(min.y..=max.y),
        )
    }
}
