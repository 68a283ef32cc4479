use bevy::log::{debug, info, warn};

use crate::flow::GameFlowState;
use crate::missions;
use crate::modifiers::{Modifier, NoModifier};
use crate::session::SessionContext;
use crate::shared::{ButtonState, Currency, FlowAction, GameOverPrompt, GAME, GAME_OVER, LOADOUT};

/// The live run.
///
/// Track simulation happens outside the session and reports into
/// `ctx.run`. This state watches for the final death, waits out the
/// end-of-run delay, then lets the modifier, the second-chance prompt or
/// the game-over screen decide what comes next.
pub struct GameState {
    modifier: Box<dyn Modifier>,
    finished: bool,
    /// Seconds left before the end-of-run decision.
    game_over_timer: Option<f32>,
    /// Set once the player has answered the second-chance prompt.
    game_over_selection_done: bool,
    was_moving: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            modifier: Box::new(NoModifier),
            finished: false,
            game_over_timer: None,
            game_over_selection_done: false,
            was_moving: false,
        }
    }
}

impl GameState {
    fn start_game(&mut self, ctx: &mut SessionContext) {
        ctx.hud.game_over_prompt = None;
        ctx.hud.pause_menu_open = false;
        ctx.clock.time_scale = 1.0;

        if !ctx.run.is_rerun {
            ctx.run.begin(ctx.config.max_lives);
            missions::on_run_start(&mut ctx.profile, &ctx.run);
        }
        self.modifier.on_run_start(ctx);

        self.finished = false;
        self.game_over_timer = None;
        self.game_over_selection_done = false;
        ctx.run.is_moving = true;
        info!(
            "[Game] Run started with {} lives{}",
            ctx.run.lives,
            if ctx.run.is_rerun { " (second wind)" } else { "" }
        );
    }

    fn on_death(&mut self, ctx: &mut SessionContext) {
        self.finished = true;
        ctx.run.is_moving = false;
        self.game_over_timer = Some(ctx.config.game_over_delay_secs);
        info!("[Game] Out of lives at {:.0}m", ctx.run.world_distance);
    }

    fn resolve_run_end(&mut self, ctx: &mut SessionContext) {
        if !self.modifier.on_run_end(ctx) {
            debug!("[Game] {} resolved the end of the run", self.modifier.name());
            return;
        }
        if ctx.run.is_rerun {
            ctx.request_push(GAME_OVER);
        } else {
            Self::open_game_over_prompt(ctx);
        }
    }

    fn open_game_over_prompt(ctx: &mut SessionContext) {
        let cost = ctx.config.second_wind_cost;
        ctx.hud.game_over_prompt = Some(GameOverPrompt {
            premium_for_life: ButtonState {
                interactable: ctx.profile.can_afford(Currency::Premium, cost),
                label: format!("{cost} for a life"),
            },
            premium_owned: ctx.profile.premium,
        });
    }

    fn premium_for_life(&mut self, ctx: &mut SessionContext) {
        if self.game_over_selection_done || ctx.hud.game_over_prompt.is_none() {
            return;
        }
        let cost = ctx.config.second_wind_cost;
        if let Err(err) = ctx.profile.debit(Currency::Premium, cost) {
            warn!("[Game] Second wind refused: {}", err);
            return;
        }
        self.game_over_selection_done = true;
        // Premium picked up this run was already credited, so it is spent
        // first.
        ctx.run.premium -= ctx.run.premium.min(cost);
        self.second_wind(ctx);
    }

    fn second_wind(&mut self, ctx: &mut SessionContext) {
        ctx.run.lives = 1;
        ctx.run.is_rerun = true;
        self.start_game(ctx);
    }

    fn pause(&mut self, ctx: &mut SessionContext) {
        if self.finished || ctx.clock.is_paused() {
            return;
        }
        self.was_moving = ctx.run.is_moving;
        ctx.run.is_moving = false;
        ctx.clock.time_scale = 0.0;
        ctx.hud.pause_menu_open = true;
    }

    fn resume(&mut self, ctx: &mut SessionContext) {
        if !ctx.clock.is_paused() {
            return;
        }
        ctx.clock.time_scale = 1.0;
        ctx.hud.pause_menu_open = false;
        ctx.run.is_moving = self.was_moving;
    }
}

impl GameFlowState for GameState {
    fn name(&self) -> &'static str {
        GAME
    }

    fn enter(&mut self, ctx: &mut SessionContext, _from: Option<&'static str>) {
        if let Some(modifier) = ctx.pending_modifier.take() {
            self.modifier = modifier;
        }
        ctx.hud.run_button = ButtonState::default();
        self.start_game(ctx);
    }

    fn exit(&mut self, ctx: &mut SessionContext, to: &'static str) {
        ctx.clock.time_scale = 1.0;
        ctx.hud.pause_menu_open = false;
        ctx.hud.game_over_prompt = None;
        ctx.run.is_moving = false;
        if to == LOADOUT {
            self.modifier = Box::new(NoModifier);
        }
    }

    fn tick(&mut self, ctx: &mut SessionContext, delta_secs: f32) {
        if self.finished {
            if let Some(remaining) = self.game_over_timer.as_mut() {
                *remaining -= delta_secs;
                if *remaining <= 0.0 {
                    self.game_over_timer = None;
                    self.resolve_run_end(ctx);
                }
            }
            return;
        }
        if ctx.clock.is_paused() {
            return;
        }

        missions::on_run_tick(&mut ctx.profile, &ctx.run);
        self.modifier.on_run_tick(ctx);

        if ctx.run.is_dead() {
            self.on_death(ctx);
        }
    }

    fn handle_action(&mut self, ctx: &mut SessionContext, action: FlowAction) -> bool {
        match action {
            FlowAction::Pause => self.pause(ctx),
            FlowAction::Resume => self.resume(ctx),
            FlowAction::QuitToLoadout => {
                ctx.clock.time_scale = 1.0;
                ctx.finish_run();
                ctx.run.is_rerun = false;
                ctx.request_switch(LOADOUT);
            }
            FlowAction::PremiumForLife => self.premium_for_life(ctx),
            FlowAction::SecondWind => {
                if self.game_over_selection_done || ctx.hud.game_over_prompt.is_none() {
                    return true;
                }
                self.game_over_selection_done = true;
                self.second_wind(ctx);
            }
            FlowAction::DeclineSecondWind => {
                if ctx.hud.game_over_prompt.take().is_some() {
                    self.game_over_selection_done = true;
                    ctx.request_push(GAME_OVER);
                }
            }
            _ => return false,
        }
        true
    }
}
