//! Spawn queue bookkeeping for the active wave.

use std::{collections::VecDeque, time::Duration};

use grid_defence_core::{ScheduledSpawn, WavePlan};

/// Gold granted for completing a wave, before the per-wave increment.
pub(crate) const WAVE_BONUS_BASE: u32 = 20;
/// Extra completion gold per wave number.
pub(crate) const WAVE_BONUS_PER_WAVE: u32 = 5;
/// Score granted per wave number on completion.
pub(crate) const WAVE_SCORE_PER_WAVE: u64 = 50;

#[derive(Clone, Debug, Default)]
pub(crate) struct WaveState {
    pub(crate) current: u32,
    pub(crate) completed: u32,
    active: bool,
    elapsed: Duration,
    queue: VecDeque<ScheduledSpawn>,
}

impl WaveState {
    pub(crate) fn restored(completed: u32) -> Self {
        Self {
            current: completed,
            completed,
            ..Self::default()
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Loads a plan and returns the number of queued spawns.
    pub(crate) fn start(&mut self, plan: WavePlan) -> usize {
        self.current = plan.wave();
        self.active = true;
        self.elapsed = Duration::ZERO;
        self.queue = plan.into_spawns().into();
        self.queue.len()
    }

    /// Advances wave time and moves every spawn now due into `out`.
    pub(crate) fn release_due(&mut self, dt: Duration, out: &mut Vec<ScheduledSpawn>) {
        if !self.active {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        while self
            .queue
            .front()
            .is_some_and(|spawn| spawn.at <= self.elapsed)
        {
            if let Some(spawn) = self.queue.pop_front() {
                out.push(spawn);
            }
        }
    }

    /// Marks the wave complete when nothing is queued and nothing is alive.
    ///
    /// Returns the completion bonus gold when the wave just finished.
    pub(crate) fn try_complete(&mut self, live_enemies: usize) -> Option<u32> {
        if !self.active || !self.queue.is_empty() || live_enemies > 0 {
            return None;
        }
        self.active = false;
        self.completed = self.completed.max(self.current);
        Some(WAVE_BONUS_BASE + WAVE_BONUS_PER_WAVE * self.current)
    }
}
