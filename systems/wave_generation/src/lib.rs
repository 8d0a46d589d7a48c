#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Deterministic wave composition and spawn scheduling.
//!
//! The number of each enemy kind in a wave depends only on the wave number.
//! Spawn order is shuffled with a stream derived from the session seed and the
//! wave number, so a replay of the same session produces the same queue. Spawn
//! offsets are simulation time, which keeps cadence independent of the speed
//! multiplier.

use std::time::Duration;

use grid_defence_core::{EnemyKind, ScheduledSpawn, WavePlan};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

const RNG_STREAM_SPAWN_ORDER: &str = "wave-spawn-order";

/// Tunables for wave composition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation time between consecutive spawns, in milliseconds.
    pub spawn_interval_ms: u64,
    /// Bosses appear on multiples of this wave number.
    pub boss_interval: u32,
    /// Bosses only appear on waves strictly above this number.
    pub boss_threshold: u32,
    /// Hit point multiplier compounded per wave after the first.
    pub hp_growth: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spawn_interval_ms: 800,
            boss_interval: 5,
            boss_threshold: 4,
            hp_growth: 1.15,
        }
    }
}

impl Config {
    /// Simulation time between consecutive spawns.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

/// Pure system that turns wave numbers into spawn queues.
#[derive(Clone, Debug)]
pub struct WaveDirector {
    config: Config,
    seed: u64,
}

impl WaveDirector {
    /// Creates a director for a session seeded with `seed`.
    #[must_use]
    pub fn new(config: Config, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Tunables the director was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enemy counts of the wave in a fixed kind order. Kinds with no enemies
    /// are omitted.
    #[must_use]
    pub fn composition(&self, wave: u32) -> Vec<(EnemyKind, u32)> {
        let wave = wave.max(1);
        let mut groups = vec![(EnemyKind::Scout, 4 + 2 * wave)];

        if wave >= 3 {
            groups.push((EnemyKind::Grunt, wave));
        }
        if wave >= 5 {
            groups.push((EnemyKind::Runner, wave - 2));
        }
        if wave >= 7 {
            groups.push((EnemyKind::Brute, 1 + (wave - 7) / 2));
        }
        if wave >= 9 {
            groups.push((EnemyKind::Guardian, 1 + (wave - 9) / 3));
        }
        if wave >= 4 && wave % 2 == 0 {
            groups.push((EnemyKind::Swarm, 8 + wave));
        }
        if self.has_boss(wave) {
            groups.push((EnemyKind::Boss, 1));
        }

        groups
    }

    /// Reports whether a boss closes the wave.
    #[must_use]
    pub fn has_boss(&self, wave: u32) -> bool {
        self.config.boss_interval > 0
            && wave > self.config.boss_threshold
            && wave % self.config.boss_interval == 0
    }

    /// Hit point multiplier applied to every enemy of the wave.
    #[must_use]
    pub fn hp_scale(&self, wave: u32) -> f32 {
        let exponent = wave.max(1) - 1;
        self.config
            .hp_growth
            .max(0.0)
            .powi(i32::try_from(exponent).unwrap_or(i32::MAX))
    }

    /// Builds the spawn queue for the wave.
    ///
    /// Regular enemies are shuffled deterministically; a boss always spawns
    /// last. Spawns are spaced by the configured interval.
    #[must_use]
    pub fn plan(&self, wave: u32) -> WavePlan {
        let mut regular = Vec::new();
        let mut bosses = 0;
        for (kind, count) in self.composition(wave) {
            if kind == EnemyKind::Boss {
                bosses += count;
                continue;
            }
            regular.extend(std::iter::repeat(kind).take(count as usize));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(self.seed, wave));
        regular.shuffle(&mut rng);
        regular.extend(std::iter::repeat(EnemyKind::Boss).take(bosses as usize));

        let interval = self.config.spawn_interval();
        let hp_scale = self.hp_scale(wave);
        let spawns: Vec<ScheduledSpawn> = regular
            .into_iter()
            .enumerate()
            .map(|(index, kind)| ScheduledSpawn {
                kind,
                at: interval.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX)),
                hp_scale,
            })
            .collect();

        debug!(wave, enemies = spawns.len(), hp_scale, "wave planned");
        WavePlan::new(wave, spawns)
    }
}

fn derive_wave_seed(seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(RNG_STREAM_SPAWN_ORDER.as_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
