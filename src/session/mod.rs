//! Session composition root.
//!
//! [`SessionContext`] is everything the flow states read and write: config,
//! profile, asset registries, the live run, the clock and the HUD affordances.
//! [`GameFlow`] bundles it with the controller as a bevy resource, and
//! [`SessionPlugin`] wires that resource into an app's `Update` schedule.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::assets::{AssetLoader, AssetRegistry};
use crate::config::SessionConfig;
use crate::data::{BuiltinContent, CharacterDef, ThemeDef};
use crate::flow::{FlowError, GameFlowController, Transition};
use crate::missions::{self, Mission, MissionError};
use crate::modifiers::Modifier;
use crate::profile::Profile;
use crate::save;
use crate::shared::*;
use crate::states::{GameOverState, GameState, LoadoutState};
use crate::telemetry::{self, LogTelemetry, Telemetry};

// ═══════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════

pub struct SessionContext {
    pub config: SessionConfig,
    pub profile: Profile,
    pub characters: AssetRegistry<CharacterDef>,
    pub themes: AssetRegistry<ThemeDef>,
    pub run: RunContext,
    pub clock: GameClock,
    pub hud: Hud,
    pub telemetry: Arc<dyn Telemetry>,
    pub rng: StdRng,
    /// Modifier chosen on the loadout screen, waiting for the game state.
    pub pending_modifier: Option<Box<dyn Modifier>>,
    pending_transition: Option<Transition>,
}

/// Seeded from config when a seed is set, otherwise from entropy.
pub fn session_rng(config: &SessionConfig) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl SessionContext {
    pub fn new(
        config: SessionConfig,
        profile: Profile,
        characters: Arc<dyn AssetLoader<CharacterDef>>,
        themes: Arc<dyn AssetLoader<ThemeDef>>,
        telemetry: Arc<dyn Telemetry>,
        rng: StdRng,
    ) -> Self {
        let retry = config.asset_retry;
        Self {
            config,
            profile,
            characters: AssetRegistry::new("characters", characters, retry),
            themes: AssetRegistry::new("themes", themes, retry),
            run: RunContext::default(),
            clock: GameClock::default(),
            hud: Hud::default(),
            telemetry,
            rng,
            pending_modifier: None,
            pending_transition: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transition requests
    // ─────────────────────────────────────────────────────────────────────

    pub fn request_switch(&mut self, name: &str) {
        self.set_transition(Transition::Switch(name.to_string()));
    }

    pub fn request_push(&mut self, name: &str) {
        self.set_transition(Transition::Push(name.to_string()));
    }

    pub fn request_pop(&mut self) {
        self.set_transition(Transition::Pop);
    }

    pub fn has_pending_transition(&self) -> bool {
        self.pending_transition.is_some()
    }

    pub(crate) fn take_transition(&mut self) -> Option<Transition> {
        self.pending_transition.take()
    }

    fn set_transition(&mut self, transition: Transition) {
        if let Some(previous) = &self.pending_transition {
            warn!(
                "[Session] {:?} replaces pending {:?}",
                transition, previous
            );
        }
        self.pending_transition = Some(transition);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Assets
    // ─────────────────────────────────────────────────────────────────────

    pub fn update_assets(&mut self, delta_secs: f32) {
        self.characters.update(delta_secs);
        self.themes.update(delta_secs);
    }

    /// Starts loading the equipped character and theme.
    pub fn request_loadout_assets(&mut self) {
        if let Some(name) = self.profile.current_character() {
            self.characters.request(name);
        }
        if let Some(name) = self.profile.current_theme() {
            self.themes.request(name);
        }
    }

    pub fn loadout_assets_ready(&self) -> bool {
        self.current_character_def().is_some() && self.current_theme_def().is_some()
    }

    pub fn current_character_def(&self) -> Option<&CharacterDef> {
        self.characters.try_get(self.profile.current_character()?)
    }

    pub fn current_theme_def(&self) -> Option<&ThemeDef> {
        self.themes.try_get(self.profile.current_theme()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Run ledger
    // ─────────────────────────────────────────────────────────────────────

    /// Premium pickups go straight to the profile.
    pub fn collect_premium(&mut self) {
        self.run.premium = self.run.premium.saturating_add(1);
        self.profile.credit(Currency::Premium, 1);
    }

    /// Settles the current run: credits collected coins and updates rank.
    /// Does nothing once the run has been settled.
    pub fn finish_run(&mut self) {
        if !self.run.in_progress {
            return;
        }
        self.run.in_progress = false;
        let coins = self.run.coins;
        if coins > 0 {
            self.profile.credit(Currency::Soft, coins);
            telemetry::report(self.telemetry.as_ref(), Currency::Soft, coins, "run");
        }
        self.profile
            .record_distance(self.run.world_distance, self.config.rank_distance);
        info!(
            "[Session] Run finished: {:.0}m, score {}, {} coins",
            self.run.world_distance, self.run.score, coins
        );
    }

    /// Enters the last run's score under the player's name if it qualifies.
    pub fn record_highscore(&mut self) -> Option<usize> {
        let score = i32::try_from(self.run.score).unwrap_or(i32::MAX);
        let name = self.profile.previous_name.clone();
        let placed = self
            .profile
            .insert_score(name, score, self.config.max_highscores);
        if let Some(position) = placed {
            info!("[Session] New highscore {} at #{}", score, position + 1);
        }
        placed
    }

    pub fn claim_mission(&mut self, mission: &Mission) -> Result<u32, MissionError> {
        let reward = missions::claim(
            &mut self.profile,
            mission,
            self.config.mission_pool_size,
            &mut self.rng,
        )?;
        telemetry::report(self.telemetry.as_ref(), Currency::Premium, reward, "mission");
        if !missions::any_complete(&self.profile) {
            self.hud.mission_popup_open = false;
        }
        Ok(reward)
    }

    /// Discards all progress and starts over with a new profile.
    pub fn reset_profile(&mut self) {
        warn!("[Session] Profile reset");
        self.profile = Profile::new_save(&self.config, &mut self.rng);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// RESOURCE
// ═══════════════════════════════════════════════════════════════════════

/// The flow controller and its context, driven once per frame.
#[derive(Resource)]
pub struct GameFlow {
    pub controller: GameFlowController,
    pub ctx: SessionContext,
}

impl GameFlow {
    /// Registers the three standard screens and enters the loadout.
    pub fn new(mut ctx: SessionContext) -> Result<Self, FlowError> {
        let mut controller = GameFlowController::new();
        controller.register(Box::new(LoadoutState::default()))?;
        controller.register(Box::new(GameState::default()))?;
        controller.register(Box::new(GameOverState))?;
        controller.switch_state(&mut ctx, LOADOUT)?;
        Ok(Self { controller, ctx })
    }

    pub fn tick(&mut self, delta_secs: f32) {
        self.ctx.update_assets(delta_secs);
        self.controller.tick(&mut self.ctx, delta_secs);
    }

    pub fn dispatch(&mut self, action: FlowAction) -> bool {
        self.controller.dispatch(&mut self.ctx, action)
    }

    pub fn active_state(&self) -> Option<&'static str> {
        self.controller.active_name()
    }

    pub fn save_bytes(&self) -> Vec<u8> {
        save::save(&self.ctx.profile)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

/// A user intent for the active screen.
#[derive(Event, Debug)]
pub struct SessionActionEvent(pub FlowAction);

pub struct SessionPlugin {
    pub config: SessionConfig,
    pub characters: Arc<dyn AssetLoader<CharacterDef>>,
    pub themes: Arc<dyn AssetLoader<ThemeDef>>,
    pub telemetry: Arc<dyn Telemetry>,
    /// Save blob read by the host, if any.
    pub profile_bytes: Option<Vec<u8>>,
}

impl SessionPlugin {
    /// Built-in content, log telemetry and a fresh or loaded profile.
    pub fn new(config: SessionConfig) -> Self {
        let content = Arc::new(BuiltinContent::new());
        Self {
            config,
            characters: content.clone(),
            themes: content,
            telemetry: Arc::new(LogTelemetry),
            profile_bytes: None,
        }
    }

    pub fn with_profile_bytes(mut self, bytes: Option<Vec<u8>>) -> Self {
        self.profile_bytes = bytes;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_loaders(
        mut self,
        characters: Arc<dyn AssetLoader<CharacterDef>>,
        themes: Arc<dyn AssetLoader<ThemeDef>>,
    ) -> Self {
        self.characters = characters;
        self.themes = themes;
        self
    }
}

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        let mut rng = session_rng(&self.config);
        let profile = save::load_or_new(self.profile_bytes.as_deref(), &self.config, &mut rng);
        let ctx = SessionContext::new(
            self.config.clone(),
            profile,
            self.characters.clone(),
            self.themes.clone(),
            self.telemetry.clone(),
            rng,
        );

        match GameFlow::new(ctx) {
            Ok(flow) => {
                app.insert_resource(flow);
            }
            Err(err) => error!("[Session] Could not start the game flow: {}", err),
        }

        app.add_event::<SessionActionEvent>();
        app.add_systems(Update, (forward_actions, tick_flow).chain());
    }
}

/// Hands queued actions to the active state in the order they were sent.
pub fn forward_actions(
    mut events: ResMut<Events<SessionActionEvent>>,
    flow: Option<ResMut<GameFlow>>,
) {
    let Some(mut flow) = flow else {
        events.clear();
        return;
    };
    for SessionActionEvent(action) in events.drain() {
        flow.dispatch(action);
    }
}

pub fn tick_flow(time: Res<Time>, flow: Option<ResMut<GameFlow>>) {
    if let Some(mut flow) = flow {
        flow.tick(time.delta_secs());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::telemetry::NullTelemetry;

    pub fn test_context() -> SessionContext {
        let config = SessionConfig {
            rng_seed: Some(7),
            ..SessionConfig::default()
        };
        let mut rng = session_rng(&config);
        let profile = Profile::new_save(&config, &mut rng);
        let content = Arc::new(BuiltinContent::new());
        SessionContext::new(
            config,
            profile,
            content.clone(),
            content,
            Arc::new(NullTelemetry),
            rng,
        )
    }

    /// Ticks assets until the loadout character and theme are loaded.
    pub fn settle_loadout_assets(ctx: &mut SessionContext) {
        ctx.request_loadout_assets();
        for _ in 0..2_000 {
            ctx.update_assets(0.016);
            if ctx.loadout_assets_ready() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        panic!("loadout assets never became ready");
    }
}
