use bevy::log::{debug, info, warn};
use std::mem;

use crate::flow::GameFlowState;
use crate::modifiers::{Modifier, NoModifier};
use crate::session::SessionContext;
use crate::shared::{ButtonState, FlowAction, GAME, LOADOUT};

/// Pre-run screen. The run button stays disabled until the equipped
/// character and theme are both loaded.
pub struct LoadoutState {
    modifier: Box<dyn Modifier>,
}

impl Default for LoadoutState {
    fn default() -> Self {
        Self {
            modifier: Box::new(NoModifier),
        }
    }
}

impl LoadoutState {
    fn refresh_run_button(ctx: &mut SessionContext) {
        let ready = ctx.loadout_assets_ready();
        if ready == ctx.hud.run_button.interactable {
            return;
        }
        ctx.hud.run_button = if ready {
            ButtonState {
                interactable: true,
                label: "Run!".to_string(),
            }
        } else {
            ButtonState {
                interactable: false,
                label: "Loading...".to_string(),
            }
        };
    }

    /// Once the character is loaded, an equipped accessory it does not have
    /// (stale save, changed content) is dropped.
    fn validate_accessory(ctx: &mut SessionContext) {
        let Some(available) = ctx.current_character_def().map(|def| def.accessories.len()) else {
            return;
        };
        if ctx.profile.clamp_accessory(available) {
            warn!("[Loadout] Equipped accessory out of range. Unequipped.");
        }
    }

    fn change_accessory(ctx: &mut SessionContext, index: Option<usize>) {
        let Some(character) = ctx.current_character_def() else {
            warn!("[Loadout] Accessory change before the character loaded");
            return;
        };
        let available = character.accessories.len();
        if let Some(i) = index {
            let owned = character
                .accessory_id(i)
                .is_some_and(|id| ctx.profile.owns_accessory(&id));
            if !owned {
                warn!("[Loadout] Accessory {} is not owned", i);
                return;
            }
        }
        if let Err(err) = ctx.profile.equip_accessory(index, available) {
            warn!("[Loadout] {}", err);
        }
    }
}

impl GameFlowState for LoadoutState {
    fn name(&self) -> &'static str {
        LOADOUT
    }

    fn enter(&mut self, ctx: &mut SessionContext, from: Option<&'static str>) {
        // Arriving with nothing before it means the player came through the
        // start screen.
        if from.is_none() {
            ctx.profile.advance_ftue(0, 1);
        }
        ctx.clock.time_scale = 1.0;
        ctx.hud.pause_menu_open = false;
        ctx.hud.game_over_prompt = None;
        ctx.hud.game_over_screen_open = false;
        ctx.hud.mission_popup_open = false;
        ctx.hud.run_button = ButtonState {
            interactable: false,
            label: "Loading...".to_string(),
        };
        ctx.request_loadout_assets();
    }

    fn exit(&mut self, ctx: &mut SessionContext, to: &'static str) {
        if to == GAME {
            let modifier = mem::replace(&mut self.modifier, Box::new(NoModifier));
            info!("[Loadout] Starting run with modifier {}", modifier.name());
            ctx.pending_modifier = Some(modifier);
        }
    }

    fn tick(&mut self, ctx: &mut SessionContext, _delta_secs: f32) {
        Self::validate_accessory(ctx);
        Self::refresh_run_button(ctx);
    }

    fn handle_action(&mut self, ctx: &mut SessionContext, action: FlowAction) -> bool {
        match action {
            FlowAction::StartRun => {
                if !ctx.loadout_assets_ready() {
                    debug!("[Loadout] Run requested before assets were ready");
                    return true;
                }
                ctx.profile.advance_ftue(1, 2);
                ctx.request_switch(GAME);
            }
            FlowAction::SetModifier(modifier) => {
                info!("[Loadout] Modifier set to {}", modifier.name());
                self.modifier = modifier;
            }
            FlowAction::ChangeCharacter(index) => {
                if let Err(err) = ctx.profile.equip_character(index) {
                    warn!("[Loadout] {}", err);
                }
                ctx.request_loadout_assets();
                Self::refresh_run_button(ctx);
            }
            FlowAction::ChangeTheme(index) => {
                if let Err(err) = ctx.profile.equip_theme(index) {
                    warn!("[Loadout] {}", err);
                }
                ctx.request_loadout_assets();
                Self::refresh_run_button(ctx);
            }
            FlowAction::ChangeAccessory(index) => Self::change_accessory(ctx, index),
            _ => return false,
        }
        true
    }
}
