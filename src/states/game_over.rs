use bevy::log::info;

use crate::flow::GameFlowState;
use crate::missions;
use crate::session::SessionContext;
use crate::shared::{FlowAction, GAME_OVER, LOADOUT};

/// Results screen, pushed over the suspended game. Leaving it in either
/// direction settles the run.
#[derive(Debug, Default)]
pub struct GameOverState;

impl GameFlowState for GameOverState {
    fn name(&self) -> &'static str {
        GAME_OVER
    }

    fn enter(&mut self, ctx: &mut SessionContext, _from: Option<&'static str>) {
        ctx.hud.game_over_prompt = None;
        ctx.hud.game_over_screen_open = true;
        ctx.hud.mission_popup_open = missions::any_complete(&ctx.profile);
        info!(
            "[GameOver] Score {} over {:.0}m",
            ctx.run.score, ctx.run.world_distance
        );
    }

    fn exit(&mut self, ctx: &mut SessionContext, _to: &'static str) {
        ctx.hud.game_over_screen_open = false;
        ctx.hud.mission_popup_open = false;
        if ctx.run.in_progress {
            ctx.record_highscore();
        }
        ctx.finish_run();
    }

    fn tick(&mut self, _ctx: &mut SessionContext, _delta_secs: f32) {}

    fn handle_action(&mut self, ctx: &mut SessionContext, action: FlowAction) -> bool {
        match action {
            FlowAction::GoToLoadout => {
                ctx.run.is_rerun = false;
                ctx.request_switch(LOADOUT);
            }
            FlowAction::RunAgain => {
                ctx.run.is_rerun = false;
                ctx.request_pop();
            }
            _ => return false,
        }
        true
    }
}
