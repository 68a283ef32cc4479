//! Mission pool, a bounded set of reward-bearing objectives.
//!
//! Each kind owns its progress rule. Progress advances from run-start and
//! per-tick hooks; claiming a completed mission pays out premium currency,
//! drops it from the pool and rolls a replacement.

use bevy::log::{info, warn};
use rand::Rng;
use thiserror::Error;

use crate::profile::Profile;
use crate::shared::{Currency, RunContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissionError {
    #[error("mission is not in the active pool")]
    NotFound,
    #[error("mission is not complete yet")]
    NotComplete,
}

/// The discriminant is the wire tag used in save blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionKind {
    /// Cover a distance within one run.
    SingleRun = 0,
    /// Collect coins across runs.
    Pickup = 1,
    /// Clear barriers across runs.
    BarrierJump = 2,
    /// Slide a distance across runs.
    Sliding = 3,
    /// Reach a score multiplier within one run.
    Multiplier = 4,
}

impl MissionKind {
    pub const ALL: [MissionKind; 5] = [
        MissionKind::SingleRun,
        MissionKind::Pickup,
        MissionKind::BarrierJump,
        MissionKind::Sliding,
        MissionKind::Multiplier,
    ];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Possible targets, easiest first. Reward is the chosen index + 1.
    fn targets(self) -> [f32; 4] {
        match self {
            MissionKind::SingleRun => [500.0, 1000.0, 1500.0, 2000.0],
            MissionKind::Pickup => [1000.0, 2000.0, 3000.0, 4000.0],
            MissionKind::BarrierJump => [20.0, 50.0, 75.0, 100.0],
            MissionKind::Sliding => [20.0, 30.0, 75.0, 150.0],
            MissionKind::Multiplier => [3.0, 5.0, 8.0, 10.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mission {
    pub kind: MissionKind,
    pub target: f32,
    pub progress: f32,
    /// Premium currency paid on claim.
    pub reward: u32,
    complete: bool,
    /// Progress when the current run started; not persisted.
    baseline: f32,
}

impl PartialEq for Mission {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.target == other.target
            && self.progress == other.progress
            && self.reward == other.reward
            && self.complete == other.complete
    }
}

impl Mission {
    pub fn new(kind: MissionKind, target: f32, reward: u32) -> Self {
        Self::restore(kind, 0.0, target, reward)
    }

    /// Rebuilds a mission from persisted values.
    pub fn restore(kind: MissionKind, progress: f32, target: f32, reward: u32) -> Self {
        Self {
            kind,
            target,
            progress,
            reward,
            complete: progress >= target,
            baseline: progress,
        }
    }

    /// A fresh mission of `kind` with a randomly chosen difficulty.
    pub fn roll(kind: MissionKind, rng: &mut impl Rng) -> Self {
        let targets = kind.targets();
        let chosen = rng.gen_range(0..targets.len());
        Self::new(kind, targets[chosen], chosen as u32 + 1)
    }

    /// A fresh mission of a uniformly random kind.
    pub fn random(rng: &mut impl Rng) -> Self {
        let kind = MissionKind::ALL[rng.gen_range(0..MissionKind::ALL.len())];
        Self::roll(kind, rng)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn description(&self) -> String {
        let target = self.target as u32;
        match self.kind {
            MissionKind::SingleRun => format!("Run {target}m in a single run"),
            MissionKind::Pickup => format!("Pick up {target} fishbones"),
            MissionKind::BarrierJump => format!("Jump over {target} barriers"),
            MissionKind::Sliding => format!("Slide for {target}m"),
            MissionKind::Multiplier => format!("Reach a x{target} multiplier"),
        }
    }

    pub fn on_run_start(&mut self, _run: &RunContext) {
        if self.complete {
            return;
        }
        match self.kind {
            MissionKind::SingleRun | MissionKind::Multiplier => self.progress = 0.0,
            MissionKind::Pickup | MissionKind::BarrierJump | MissionKind::Sliding => {}
        }
        self.baseline = self.progress;
    }

    /// Updates progress from the live run. Returns true on the tick the
    /// mission completes.
    pub fn on_run_tick(&mut self, run: &RunContext) -> bool {
        if self.complete {
            return false;
        }
        self.progress = match self.kind {
            MissionKind::SingleRun => run.world_distance,
            MissionKind::Pickup => self.baseline + run.coins as f32,
            MissionKind::BarrierJump => self.baseline + run.barriers_jumped as f32,
            MissionKind::Sliding => self.baseline + run.sliding_distance,
            MissionKind::Multiplier => self.progress.max(run.multiplier as f32),
        };
        if self.progress >= self.target {
            self.complete = true;
        }
        self.complete
    }
}

// ═══════════════════════════════════════════════════════════════════════
// POOL OPERATIONS
// ═══════════════════════════════════════════════════════════════════════

/// Tops the pool up to `target` missions of random kinds.
pub fn ensure_pool_size(profile: &mut Profile, target: usize, rng: &mut impl Rng) {
    while profile.missions.len() < target {
        let mission = Mission::random(rng);
        info!("[Missions] New mission: {}", mission.description());
        profile.missions.push(mission);
    }
}

pub fn on_run_start(profile: &mut Profile, run: &RunContext) {
    for mission in profile.missions.iter_mut() {
        mission.on_run_start(run);
    }
}

/// Advances every active mission. Returns how many completed this tick.
pub fn on_run_tick(profile: &mut Profile, run: &RunContext) -> usize {
    let mut newly_complete = 0;
    for mission in profile.missions.iter_mut() {
        if mission.on_run_tick(run) {
            info!("[Missions] Completed: {}", mission.description());
            newly_complete += 1;
        }
    }
    newly_complete
}

/// Pays out a completed mission and refills the pool. Returns the reward.
pub fn claim(
    profile: &mut Profile,
    mission: &Mission,
    pool_size: usize,
    rng: &mut impl Rng,
) -> Result<u32, MissionError> {
    let Some(index) = profile.missions.iter().position(|m| m == mission) else {
        warn!("[Missions] Claim for a mission not in the pool: {:?}", mission);
        return Err(MissionError::NotFound);
    };
    if !profile.missions[index].is_complete() {
        warn!(
            "[Missions] Claim for incomplete mission: {}",
            mission.description()
        );
        return Err(MissionError::NotComplete);
    }

    let claimed = profile.missions.remove(index);
    profile.credit(Currency::Premium, claimed.reward);
    info!(
        "[Missions] Claimed '{}' for {} premium",
        claimed.description(),
        claimed.reward
    );
    ensure_pool_size(profile, pool_size, rng);
    Ok(claimed.reward)
}

pub fn any_complete(profile: &Profile) -> bool {
    profile.missions.iter().any(Mission::is_complete)
}
