//! Static stat tables for towers and enemies.

use serde::{Deserialize, Serialize};

use crate::{AuraEffect, MAX_TOWER_LEVEL, MIN_TOWER_LEVEL};

/// Enumerates the tower kinds that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Single-target periodic shooter.
    Arrow,
    /// Slow single-target shooter whose shells splash on impact.
    Cannon,
    /// Fires at the furthest-progressed enemies at once.
    Multishot,
    /// Fires one projectile at every enemy in range.
    Nova,
    /// Continuous beam on the furthest-progressed enemy.
    Laser,
    /// Chain lightning that hops between nearby enemies.
    Tesla,
    /// Slows every enemy in range.
    Frost,
    /// Raises the damage of nearby towers.
    Amplifier,
    /// Shortens the firing interval of nearby towers.
    Overclock,
    /// Extends the range of nearby towers.
    Beacon,
    /// Adds chain jumps to nearby chain towers.
    Conductor,
    /// Raises the gold granted by enemies dying nearby.
    Treasury,
    /// Cheap wall placed on the route; forces enemies to reroute.
    Barricade,
}

impl TowerKind {
    /// Every constructible kind in declaration order.
    pub const ALL: [TowerKind; 13] = [
        Self::Arrow,
        Self::Cannon,
        Self::Multishot,
        Self::Nova,
        Self::Laser,
        Self::Tesla,
        Self::Frost,
        Self::Amplifier,
        Self::Overclock,
        Self::Beacon,
        Self::Conductor,
        Self::Treasury,
        Self::Barricade,
    ];

    /// Gold required to construct a level one tower.
    #[must_use]
    pub const fn build_cost(self) -> u32 {
        match self {
            Self::Arrow => 60,
            Self::Cannon => 100,
            Self::Multishot => 90,
            Self::Nova => 110,
            Self::Laser => 120,
            Self::Tesla => 140,
            Self::Frost => 80,
            Self::Amplifier => 120,
            Self::Overclock => 120,
            Self::Beacon => 100,
            Self::Conductor => 110,
            Self::Treasury => 150,
            Self::Barricade => 20,
        }
    }

    /// Gold required to raise a tower from `current_level` to the next level.
    ///
    /// Returns `None` when the tower is already at the maximum level.
    #[must_use]
    pub const fn upgrade_cost(self, current_level: u8) -> Option<u32> {
        if current_level >= MAX_TOWER_LEVEL {
            None
        } else {
            Some(self.build_cost() * current_level as u32)
        }
    }

    /// Whether the kind is placed on route cells instead of buildable ground.
    #[must_use]
    pub const fn blocks_route(self) -> bool {
        matches!(self, Self::Barricade)
    }

    /// Stable lowercase label used in configuration files and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Cannon => "cannon",
            Self::Multishot => "multishot",
            Self::Nova => "nova",
            Self::Laser => "laser",
            Self::Tesla => "tesla",
            Self::Frost => "frost",
            Self::Amplifier => "amplifier",
            Self::Overclock => "overclock",
            Self::Beacon => "beacon",
            Self::Conductor => "conductor",
            Self::Treasury => "treasury",
            Self::Barricade => "barricade",
        }
    }

    /// Single glyph used by text renderers.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Arrow => 'A',
            Self::Cannon => 'C',
            Self::Multishot => 'M',
            Self::Nova => 'N',
            Self::Laser => 'L',
            Self::Tesla => 'T',
            Self::Frost => 'F',
            Self::Amplifier => 'a',
            Self::Overclock => 'o',
            Self::Beacon => 'b',
            Self::Conductor => 'c',
            Self::Treasury => 't',
            Self::Barricade => '#',
        }
    }

    /// Stats of the kind at the provided level, before auras.
    ///
    /// Levels outside `1..=3` are clamped.
    #[must_use]
    pub fn stats_at(self, level: u8) -> TowerStats {
        let steps = f32::from(level.clamp(MIN_TOWER_LEVEL, MAX_TOWER_LEVEL) - MIN_TOWER_LEVEL);
        let mut stats = self.base_stats();
        stats.damage *= 1.0 + 0.5 * steps;
        if stats.range > 0.0 {
            stats.range += 0.5 * steps;
        }
        stats.interval *= 1.0 - 0.1 * steps;
        stats.aura = stats.aura.map(|aura| aura.scaled(1.0 + 0.5 * steps));
        if let Some(multiplier) = stats.slow_multiplier.as_mut() {
            *multiplier -= 0.1 * steps;
        }
        stats
    }

    fn base_stats(self) -> TowerStats {
        let idle = TowerStats {
            damage: 0.0,
            range: 2.5,
            interval: 0.0,
            projectile_speed: 0.0,
            mode: FiringMode::Support,
            splash_radius: None,
            chain: None,
            slow_multiplier: None,
            aura: None,
        };

        match self {
            Self::Arrow => TowerStats {
                damage: 10.0,
                range: 3.5,
                interval: 0.8,
                projectile_speed: 12.0,
                mode: FiringMode::Single,
                ..idle
            },
            Self::Cannon => TowerStats {
                damage: 24.0,
                range: 3.0,
                interval: 1.6,
                projectile_speed: 8.0,
                mode: FiringMode::Single,
                splash_radius: Some(1.5),
                ..idle
            },
            Self::Multishot => TowerStats {
                damage: 8.0,
                range: 3.5,
                interval: 1.0,
                projectile_speed: 12.0,
                mode: FiringMode::Multi { count: 3 },
                ..idle
            },
            Self::Nova => TowerStats {
                damage: 6.0,
                range: 2.5,
                interval: 1.2,
                projectile_speed: 10.0,
                mode: FiringMode::Broadcast,
                ..idle
            },
            Self::Laser => TowerStats {
                damage: 30.0,
                range: 3.0,
                mode: FiringMode::Continuous,
                ..idle
            },
            Self::Tesla => TowerStats {
                damage: 30.0,
                range: 3.5,
                interval: 1.5,
                projectile_speed: 30.0,
                mode: FiringMode::Chain,
                chain: Some(ChainSpec {
                    jumps: 3,
                    radius: 2.5,
                }),
                ..idle
            },
            Self::Frost => TowerStats {
                mode: FiringMode::Slow,
                slow_multiplier: Some(0.6),
                ..idle
            },
            Self::Amplifier => TowerStats {
                aura: Some(AuraEffect::Damage(0.25)),
                ..idle
            },
            Self::Overclock => TowerStats {
                aura: Some(AuraEffect::FireRate(0.15)),
                ..idle
            },
            Self::Beacon => TowerStats {
                aura: Some(AuraEffect::Range(0.75)),
                ..idle
            },
            Self::Conductor => TowerStats {
                aura: Some(AuraEffect::ChainJumps(1)),
                ..idle
            },
            Self::Treasury => TowerStats {
                range: 3.0,
                aura: Some(AuraEffect::GoldYield(0.25)),
                ..idle
            },
            Self::Barricade => TowerStats {
                range: 0.0,
                mode: FiringMode::Blocking,
                ..idle
            },
        }
    }
}

/// How a tower kind delivers damage. Exactly one mode per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiringMode {
    /// One projectile at the furthest-progressed target.
    Single,
    /// Up to `count` projectiles at the furthest-progressed targets.
    Multi {
        /// Maximum projectiles per volley.
        count: u8,
    },
    /// One projectile at every enemy in range.
    Broadcast,
    /// Damage per second applied directly each tick.
    Continuous,
    /// Fast projectile that hops after impact.
    Chain,
    /// Reapplies a speed multiplier to every enemy in range.
    Slow,
    /// Never fires; only exerts an aura.
    Support,
    /// Never fires; blocks the route.
    Blocking,
}

/// Chain lightning parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainSpec {
    /// Hops after the primary hit.
    pub jumps: u32,
    /// Maximum distance of a single hop, in cells.
    pub radius: f32,
}

/// Level-scaled tower stats before auras are folded in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerStats {
    /// Damage per projectile, or per second for continuous kinds.
    pub damage: f32,
    /// Targeting and aura radius in cells.
    pub range: f32,
    /// Seconds between volleys.
    pub interval: f32,
    /// Projectile speed in cells per second.
    pub projectile_speed: f32,
    /// Damage delivery mode.
    pub mode: FiringMode,
    /// Area damage radius around the impact point.
    pub splash_radius: Option<f32>,
    /// Chain parameters for chain kinds.
    pub chain: Option<ChainSpec>,
    /// Speed multiplier applied by slowing kinds.
    pub slow_multiplier: Option<f32>,
    /// Aura exerted on nearby towers or dying enemies.
    pub aura: Option<AuraEffect>,
}

/// Enumerates the enemy kinds that can appear in waves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Fast, fragile opener.
    Scout,
    /// Baseline infantry.
    Grunt,
    /// Very fast runner.
    Runner,
    /// Slow, heavily armoured brute.
    Brute,
    /// Shields nearby enemies from incoming damage.
    Guardian,
    /// Cheap fodder spawned in bulk.
    Swarm,
    /// Milestone boss.
    Boss,
}

/// Damage-reduction aura exerted by an enemy on its neighbours.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WardSpec {
    /// Fraction of incoming damage removed.
    pub reduction: f32,
    /// Radius of the ward in cells.
    pub radius: f32,
}

/// Base stats of an enemy kind before wave scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Hit points at wave one.
    pub hp: f32,
    /// Movement speed in cells per second.
    pub speed: f32,
    /// Gold granted on death before gold auras.
    pub reward: u32,
    /// Lives lost when the enemy leaks.
    pub lives_cost: u32,
    /// Ward exerted on other enemies, if any.
    pub ward: Option<WardSpec>,
}

impl EnemyKind {
    /// Base stats of the kind.
    #[must_use]
    pub const fn stats(self) -> EnemyStats {
        let (hp, speed, reward) = match self {
            Self::Scout => (60.0, 2.0, 5),
            Self::Grunt => (110.0, 1.4, 8),
            Self::Runner => (70.0, 3.0, 8),
            Self::Brute => (320.0, 0.9, 20),
            Self::Guardian => (180.0, 1.2, 15),
            Self::Swarm => (30.0, 2.4, 2),
            Self::Boss => (2000.0, 0.7, 150),
        };
        let lives_cost = match self {
            Self::Boss => 3,
            _ => 1,
        };
        let ward = match self {
            Self::Guardian => Some(WardSpec {
                reduction: 0.3,
                radius: 2.0,
            }),
            _ => None,
        };

        EnemyStats {
            hp,
            speed,
            reward,
            lives_cost,
            ward,
        }
    }

    /// Single glyph used by text renderers.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Scout => 's',
            Self::Grunt => 'g',
            Self::Runner => 'r',
            Self::Brute => 'B',
            Self::Guardian => 'G',
            Self::Swarm => 'w',
            Self::Boss => 'X',
        }
    }
}
