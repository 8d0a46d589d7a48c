//! Aura folding.
//!
//! Contributions are summed per effect and each sum is clamped on its own, so
//! the order in which towers are visited never changes the result.

use crate::{ChainSpec, FiringMode, TowerStats};

/// Lowest fraction of the base firing interval auras may reduce a tower to.
pub const FIRE_INTERVAL_FLOOR: f32 = 0.2;
/// Largest range bonus auras may grant, in cells.
pub const RANGE_BONUS_CAP: f32 = 2.0;
/// Largest additive damage bonus auras may grant.
pub const DAMAGE_BONUS_CAP: f32 = 2.0;
/// Largest number of chain jumps auras may add.
pub const CHAIN_BONUS_CAP: u32 = 4;
/// Largest additive gold bonus auras may grant.
pub const GOLD_BONUS_CAP: f32 = 1.0;
/// Lowest fraction of nominal damage an enemy may take under wards.
pub const DAMAGE_TAKEN_FLOOR: f32 = 0.25;

/// A passive effect exerted on everything within the source's range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AuraEffect {
    /// Shortens firing intervals by the given fraction.
    FireRate(f32),
    /// Extends range by the given number of cells.
    Range(f32),
    /// Raises damage by the given fraction.
    Damage(f32),
    /// Adds chain jumps to chain kinds.
    ChainJumps(u32),
    /// Raises gold granted by enemies dying nearby.
    GoldYield(f32),
}

impl AuraEffect {
    /// Scales the magnitude of the effect. Chain jumps round down.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Self::FireRate(value) => Self::FireRate(value * factor),
            Self::Range(value) => Self::Range(value * factor),
            Self::Damage(value) => Self::Damage(value * factor),
            Self::ChainJumps(value) => Self::ChainJumps((value as f32 * factor) as u32),
            Self::GoldYield(value) => Self::GoldYield(value * factor),
        }
    }
}

/// Running sums of every aura affecting one tower or one death location.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AuraTotals {
    fire_rate: f32,
    range: f32,
    damage: f32,
    chain_jumps: u32,
    gold_yield: f32,
}

impl AuraTotals {
    /// Adds a single aura contribution.
    pub fn add(&mut self, effect: AuraEffect) {
        match effect {
            AuraEffect::FireRate(value) => self.fire_rate += value,
            AuraEffect::Range(value) => self.range += value,
            AuraEffect::Damage(value) => self.damage += value,
            AuraEffect::ChainJumps(value) => self.chain_jumps += value,
            AuraEffect::GoldYield(value) => self.gold_yield += value,
        }
    }

    /// Multiplier applied to the base firing interval.
    #[must_use]
    pub fn interval_multiplier(&self) -> f32 {
        (1.0 - self.fire_rate).max(FIRE_INTERVAL_FLOOR)
    }

    /// Bonus added to range, in cells.
    #[must_use]
    pub fn range_bonus(&self) -> f32 {
        self.range.min(RANGE_BONUS_CAP)
    }

    /// Multiplier applied to damage.
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        1.0 + self.damage.min(DAMAGE_BONUS_CAP)
    }

    /// Extra chain jumps granted to chain kinds.
    #[must_use]
    pub fn chain_bonus(&self) -> u32 {
        self.chain_jumps.min(CHAIN_BONUS_CAP)
    }

    /// Multiplier applied to gold rewards.
    #[must_use]
    pub fn gold_multiplier(&self) -> f32 {
        1.0 + self.gold_yield.min(GOLD_BONUS_CAP)
    }

    /// Folds the totals into level-scaled stats.
    #[must_use]
    pub fn apply(&self, base: &TowerStats) -> EffectiveStats {
        let chain = base.chain.map(|chain| ChainSpec {
            jumps: chain.jumps + self.chain_bonus(),
            radius: chain.radius,
        });

        EffectiveStats {
            damage: base.damage * self.damage_multiplier(),
            range: if base.range > 0.0 {
                base.range + self.range_bonus()
            } else {
                0.0
            },
            interval: base.interval * self.interval_multiplier(),
            projectile_speed: base.projectile_speed,
            mode: base.mode,
            splash_radius: base.splash_radius,
            chain,
            slow_multiplier: base.slow_multiplier,
        }
    }
}

/// Multiplier on incoming damage for an enemy covered by the given ward sum.
#[must_use]
pub fn damage_taken_multiplier(ward_reduction: f32) -> f32 {
    (1.0 - ward_reduction).max(DAMAGE_TAKEN_FLOOR)
}

/// Tower stats after auras.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveStats {
    /// Damage per projectile, or per second for continuous kinds.
    pub damage: f32,
    /// Targeting radius in cells.
    pub range: f32,
    /// Seconds between volleys.
    pub interval: f32,
    /// Projectile speed in cells per second.
    pub projectile_speed: f32,
    /// Damage delivery mode.
    pub mode: FiringMode,
    /// Area damage radius around the impact point.
    pub splash_radius: Option<f32>,
    /// Chain parameters with aura jumps included.
    pub chain: Option<ChainSpec>,
    /// Speed multiplier applied by slowing kinds.
    pub slow_multiplier: Option<f32>,
}
