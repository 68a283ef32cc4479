//! Shared types, actions, and run bookkeeping for Alleydash.
//!
//! This is the type contract. Every domain module imports from here.
//! Screens, gameplay, and the host talk to the session through these types.

use serde::{Deserialize, Serialize};

use crate::modifiers::Modifier;

// ═══════════════════════════════════════════════════════════════════════
// STATE NAMES
// ═══════════════════════════════════════════════════════════════════════

pub const LOADOUT: &str = "Loadout";
pub const GAME: &str = "Game";
pub const GAME_OVER: &str = "GameOver";

// ═══════════════════════════════════════════════════════════════════════
// CURRENCY & CONSUMABLES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Coins picked up on the track.
    Soft,
    /// Premium currency (fish bones / anchovies).
    Premium,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Soft => write!(f, "coins"),
            Currency::Premium => write!(f, "premium"),
        }
    }
}

/// Power-ups the player can own and spend at the start of a run.
/// The discriminant is the wire tag used in save blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConsumableKind {
    CoinMagnet = 1,
    ScoreMultiplier = 2,
    Invincibility = 3,
    ExtraLife = 4,
}

impl ConsumableKind {
    pub const ALL: [ConsumableKind; 4] = [
        ConsumableKind::CoinMagnet,
        ConsumableKind::ScoreMultiplier,
        ConsumableKind::Invincibility,
        ConsumableKind::ExtraLife,
    ];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// RUN CONTEXT: written by gameplay, read by states
// ═══════════════════════════════════════════════════════════════════════

/// Live statistics for the run in progress.
///
/// The track and character controllers own the simulation; they report into
/// this struct and the session reads it. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub world_distance: f32,
    pub score: u32,
    pub coins: u32,
    /// Premium picked up this run (already credited to the profile).
    pub premium: u32,
    pub multiplier: u32,
    pub barriers_jumped: u32,
    pub sliding_distance: f32,
    pub lives: u32,
    pub max_lives: u32,
    /// Coins added per pickup; modifiers may raise it.
    pub coin_value: u32,
    /// True while resuming after a second wind.
    pub is_rerun: bool,
    pub is_moving: bool,
    /// Set by `begin`, cleared once the run's payout is settled.
    pub in_progress: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            world_distance: 0.0,
            score: 0,
            coins: 0,
            premium: 0,
            multiplier: 1,
            barriers_jumped: 0,
            sliding_distance: 0.0,
            lives: 0,
            max_lives: 3,
            coin_value: 1,
            is_rerun: false,
            is_moving: false,
            in_progress: false,
        }
    }
}

impl RunContext {
    /// Clears per-run counters for a fresh run with full lives.
    pub fn begin(&mut self, max_lives: u32) {
        *self = Self {
            max_lives,
            lives: max_lives,
            in_progress: true,
            ..Self::default()
        };
    }

    pub fn collect_coin(&mut self) {
        self.coins = self.coins.saturating_add(self.coin_value);
    }

    pub fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════

/// Process-wide simulation rate. Pausing sets the scale to zero; ticks keep
/// arriving but gameplay sees no elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameClock {
    pub time_scale: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self { time_scale: 1.0 }
    }
}

impl GameClock {
    pub fn scaled(&self, delta: f32) -> f32 {
        delta * self.time_scale
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// HUD: what the UI layer should currently show
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub interactable: bool,
    pub label: String,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            interactable: false,
            label: String::new(),
        }
    }
}

/// The "second chance" popup shown when a run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOverPrompt {
    pub premium_for_life: ButtonState,
    pub premium_owned: u32,
}

/// Widget affordances the session exposes to an external renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hud {
    pub run_button: ButtonState,
    pub game_over_prompt: Option<GameOverPrompt>,
    pub pause_menu_open: bool,
    pub mission_popup_open: bool,
    pub game_over_screen_open: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// ACTIONS: user intents forwarded to the active state
// ═══════════════════════════════════════════════════════════════════════

pub enum FlowAction {
    // Loadout
    StartRun,
    SetModifier(Box<dyn Modifier>),
    ChangeCharacter(usize),
    ChangeTheme(usize),
    ChangeAccessory(Option<usize>),
    // Game
    Pause,
    Resume,
    QuitToLoadout,
    PremiumForLife,
    SecondWind,
    DeclineSecondWind,
    // GameOver
    GoToLoadout,
    RunAgain,
}

impl std::fmt::Debug for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowAction::StartRun => write!(f, "StartRun"),
            FlowAction::SetModifier(m) => write!(f, "SetModifier({})", m.name()),
            FlowAction::ChangeCharacter(i) => write!(f, "ChangeCharacter({i})"),
            FlowAction::ChangeTheme(i) => write!(f, "ChangeTheme({i})"),
            FlowAction::ChangeAccessory(i) => write!(f, "ChangeAccessory({i:?})"),
            FlowAction::Pause => write!(f, "Pause"),
            FlowAction::Resume => write!(f, "Resume"),
            FlowAction::QuitToLoadout => write!(f, "QuitToLoadout"),
            FlowAction::PremiumForLife => write!(f, "PremiumForLife"),
            FlowAction::SecondWind => write!(f, "SecondWind"),
            FlowAction::DeclineSecondWind => write!(f, "DeclineSecondWind"),
            FlowAction::GoToLoadout => write!(f, "GoToLoadout"),
            FlowAction::RunAgain => write!(f, "RunAgain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumable_tags_round_trip() {
        for kind in ConsumableKind::ALL {
            assert_eq!(ConsumableKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ConsumableKind::from_tag(0), None);
        assert_eq!(ConsumableKind::from_tag(5), None);
    }

    #[test]
    fn test_run_begin_resets_counters() {
        let mut run = RunContext {
            world_distance: 812.0,
            coins: 40,
            lives: 0,
            is_rerun: true,
            ..Default::default()
        };
        run.begin(3);
        assert_eq!(run.world_distance, 0.0);
        assert_eq!(run.coins, 0);
        assert_eq!(run.lives, 3);
        assert!(!run.is_rerun);
        assert!(run.in_progress);
    }

    #[test]
    fn test_collect_coin_uses_coin_value() {
        let mut run = RunContext::default();
        run.coin_value = 2;
        run.collect_coin();
        run.collect_coin();
        assert_eq!(run.coins, 4);
    }

    #[test]
    fn test_lose_life_saturates() {
        let mut run = RunContext::default();
        run.begin(1);
        run.lose_life();
        run.lose_life();
        assert_eq!(run.lives, 0);
        assert!(run.is_dead());
    }

    #[test]
    fn test_paused_clock_scales_to_zero() {
        let clock = GameClock { time_scale: 0.0 };
        assert!(clock.is_paused());
        assert_eq!(clock.scaled(0.016), 0.0);
        assert_eq!(GameClock::default().scaled(0.5), 0.5);
    }
}
