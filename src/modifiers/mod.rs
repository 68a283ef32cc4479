//! Run modifiers: per-run rule sets chosen on the loadout screen.
//!
//! The loadout screen holds the selected modifier and hands it to the game
//! state when the run starts. The game state always has one; `NoModifier`
//! stands in when nothing was selected.

use bevy::log::info;

use crate::session::SessionContext;
use crate::shared::GAME_OVER;

pub trait Modifier: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Called every time the run (re)starts, including after a second wind.
    fn on_run_start(&mut self, _ctx: &mut SessionContext) {}

    /// Called once per game tick while the run is live.
    fn on_run_tick(&mut self, _ctx: &mut SessionContext) {}

    /// Called once the end-of-run delay has elapsed. Returning `false` means
    /// the modifier has already resolved what happens next and the regular
    /// second-wind / game-over handling is skipped.
    fn on_run_end(&mut self, _ctx: &mut SessionContext) -> bool {
        true
    }
}

/// Pass-through; the run plays with default rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModifier;

impl Modifier for NoModifier {
    fn name(&self) -> &'static str {
        "None"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DoubleCoins;

impl Modifier for DoubleCoins {
    fn name(&self) -> &'static str {
        "DoubleCoins"
    }

    fn on_run_start(&mut self, ctx: &mut SessionContext) {
        ctx.run.coin_value = 2;
    }
}

/// One life and no second wind.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleLife;

impl Modifier for SingleLife {
    fn name(&self) -> &'static str {
        "SingleLife"
    }

    fn on_run_start(&mut self, ctx: &mut SessionContext) {
        ctx.run.max_lives = 1;
        ctx.run.lives = ctx.run.lives.min(1);
    }

    fn on_run_end(&mut self, ctx: &mut SessionContext) -> bool {
        ctx.request_push(GAME_OVER);
        false
    }
}

/// Ends the run once the player has covered `distance` metres.
#[derive(Debug, Clone, Copy)]
pub struct LimitedLength {
    pub distance: f32,
}

impl Modifier for LimitedLength {
    fn name(&self) -> &'static str {
        "LimitedLength"
    }

    fn on_run_tick(&mut self, ctx: &mut SessionContext) {
        if ctx.run.lives > 0 && ctx.run.world_distance >= self.distance {
            info!("[Modifiers] Distance limit of {}m reached", self.distance);
            ctx.run.lives = 0;
        }
    }

    fn on_run_end(&mut self, ctx: &mut SessionContext) -> bool {
        ctx.request_push(GAME_OVER);
        false
    }
}
