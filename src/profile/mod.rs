//! The player profile: currencies, owned items, missions, settings and
//! progression counters, plus every mutator that may change it.
//!
//! All mutators are synchronous and take effect immediately. Persistence is
//! the host's call (see `crate::save`); nothing here schedules writes.

pub mod settings;

use bevy::log::{info, warn};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::missions::{self, Mission};
use crate::shared::{ConsumableKind, Currency};

pub use settings::Settings;

/// Ceiling for every counter the save stores as a non-negative i32.
pub const MAX_COUNTER: u32 = i32::MAX as u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("need {needed} {currency} but only {available} available")]
    InsufficientFunds {
        currency: Currency,
        needed: u32,
        available: u32,
    },
    #[error("accessory index {index} out of range ({available} available)")]
    AccessoryOutOfRange { index: usize, available: usize },
    #[error("character index {index} out of range ({available} owned)")]
    CharacterOutOfRange { index: usize, available: usize },
    #[error("theme index {index} out of range ({available} owned)")]
    ThemeOutOfRange { index: usize, available: usize },
    #[error("accessory id '{0}' is not of the form character:accessory")]
    MalformedAccessoryId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighscoreEntry {
    pub name: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub coins: u32,
    pub premium: u32,
    pub owned_characters: Vec<String>,
    pub used_character: usize,
    /// Owned accessories as `"<character>:<accessory>"`.
    pub accessories: BTreeSet<String>,
    /// Index into the equipped character's accessory list.
    pub used_accessory: Option<usize>,
    /// Owned themes in unlock order.
    pub themes: Vec<String>,
    pub used_theme: usize,
    /// Never holds a zero count; the key is removed instead.
    pub consumables: BTreeMap<ConsumableKind, u32>,
    pub missions: Vec<Mission>,
    /// Sorted best first.
    pub highscores: Vec<HighscoreEntry>,
    pub previous_name: String,
    pub settings: Settings,
    /// First-time-experience step; only ever increases.
    pub ftue_level: u32,
    /// One rank per `rank_distance` metres of best run.
    pub rank: u32,
    pub tutorial_done: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self::blank(&SessionConfig::default())
    }
}

impl Profile {
    /// Default field values without any missions rolled.
    pub fn blank(config: &SessionConfig) -> Self {
        Self {
            coins: 0,
            premium: 0,
            owned_characters: vec![config.default_character.clone()],
            used_character: 0,
            accessories: BTreeSet::new(),
            used_accessory: None,
            themes: vec![config.default_theme.clone()],
            used_theme: 0,
            consumables: BTreeMap::new(),
            missions: Vec::new(),
            highscores: Vec::new(),
            previous_name: config.default_player_name.clone(),
            settings: Settings::default(),
            ftue_level: 0,
            rank: 0,
            tutorial_done: false,
        }
    }

    /// The canonical fresh profile: defaults plus a full mission pool.
    pub fn new_save(config: &SessionConfig, rng: &mut impl Rng) -> Self {
        let mut profile = Self::blank(config);
        missions::ensure_pool_size(&mut profile, config.mission_pool_size, rng);
        profile
    }

    // ─────────────────────────────────────────────────────────────────────
    // Currencies
    // ─────────────────────────────────────────────────────────────────────

    pub fn balance(&self, currency: Currency) -> u32 {
        match currency {
            Currency::Soft => self.coins,
            Currency::Premium => self.premium,
        }
    }

    pub fn can_afford(&self, currency: Currency, amount: u32) -> bool {
        self.balance(currency) >= amount
    }

    /// Adds `amount`, saturating at `MAX_COUNTER`.
    pub fn credit(&mut self, currency: Currency, amount: u32) {
        let balance = self.balance_mut(currency);
        let credited = balance.saturating_add(amount);
        if credited > MAX_COUNTER {
            warn!(
                "[Profile] {} balance capped at {} (credit of {} overflowed)",
                currency, MAX_COUNTER, amount
            );
        }
        *balance = credited.min(MAX_COUNTER);
    }

    /// Spends `amount`. Premium spends are checked and rejected when the
    /// balance is short. Soft spends are pre-validated by callers; an
    /// overdraft is logged and clamped to zero.
    pub fn debit(&mut self, currency: Currency, amount: u32) -> Result<(), LedgerError> {
        let available = self.balance(currency);
        if amount <= available {
            *self.balance_mut(currency) = available - amount;
            return Ok(());
        }
        match currency {
            Currency::Premium => Err(LedgerError::InsufficientFunds {
                currency,
                needed: amount,
                available,
            }),
            Currency::Soft => {
                warn!(
                    "[Profile] Tried to spend {} coins with only {}. Clamping to 0.",
                    amount, available
                );
                self.coins = 0;
                Ok(())
            }
        }
    }

    fn balance_mut(&mut self, currency: Currency) -> &mut u32 {
        match currency {
            Currency::Soft => &mut self.coins,
            Currency::Premium => &mut self.premium,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Consumables
    // ─────────────────────────────────────────────────────────────────────

    pub fn grant_consumable(&mut self, kind: ConsumableKind) {
        let count = self.consumables.entry(kind).or_insert(0);
        *count = count.saturating_add(1).min(MAX_COUNTER);
    }

    /// Uses one of `kind`. Returns false, changing nothing, when none are owned.
    pub fn consume_one(&mut self, kind: ConsumableKind) -> bool {
        match self.consumables.get_mut(&kind) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.consumables.remove(&kind);
                true
            }
            None => false,
        }
    }

    pub fn consumable_count(&self, kind: ConsumableKind) -> u32 {
        self.consumables.get(&kind).copied().unwrap_or(0)
    }

    /// Owned power-ups and their counts, for inventory UIs.
    pub fn owned_consumables(&self) -> impl Iterator<Item = (ConsumableKind, u32)> + '_ {
        self.consumables.iter().map(|(kind, count)| (*kind, *count))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Characters, accessories, themes
    // ─────────────────────────────────────────────────────────────────────

    pub fn current_character(&self) -> Option<&str> {
        self.owned_characters
            .get(self.used_character)
            .map(String::as_str)
    }

    pub fn current_theme(&self) -> Option<&str> {
        self.themes.get(self.used_theme).map(String::as_str)
    }

    pub fn add_character(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.owned_characters.contains(&name) {
            return false;
        }
        self.owned_characters.push(name);
        true
    }

    /// Switches character. The equipped accessory belongs to the previous
    /// character, so it is cleared on an actual change.
    pub fn equip_character(&mut self, index: usize) -> Result<(), LedgerError> {
        if index >= self.owned_characters.len() {
            return Err(LedgerError::CharacterOutOfRange {
                index,
                available: self.owned_characters.len(),
            });
        }
        if index != self.used_character {
            self.used_character = index;
            self.used_accessory = None;
        }
        Ok(())
    }

    pub fn add_theme(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.themes.contains(&name) {
            return false;
        }
        self.themes.push(name);
        true
    }

    pub fn equip_theme(&mut self, index: usize) -> Result<(), LedgerError> {
        if index >= self.themes.len() {
            return Err(LedgerError::ThemeOutOfRange {
                index,
                available: self.themes.len(),
            });
        }
        self.used_theme = index;
        Ok(())
    }

    /// Records ownership of `"<character>:<accessory>"`. Returns false when
    /// it was already owned.
    pub fn unlock_accessory(&mut self, compound_id: &str) -> Result<bool, LedgerError> {
        match compound_id.split_once(':') {
            Some((character, accessory)) if !character.is_empty() && !accessory.is_empty() => {
                Ok(self.accessories.insert(compound_id.to_string()))
            }
            _ => Err(LedgerError::MalformedAccessoryId(compound_id.to_string())),
        }
    }

    pub fn owns_accessory(&self, compound_id: &str) -> bool {
        self.accessories.contains(compound_id)
    }

    /// Equips accessory `index` of the current character, or none.
    /// `available` is the length of that character's accessory list.
    pub fn equip_accessory(
        &mut self,
        index: Option<usize>,
        available: usize,
    ) -> Result<(), LedgerError> {
        if let Some(index) = index {
            if index >= available {
                return Err(LedgerError::AccessoryOutOfRange { index, available });
            }
        }
        self.used_accessory = index;
        Ok(())
    }

    /// Puts character and theme selection back in range: re-adds the config
    /// defaults to empty lists and resets out-of-range indices to 0. Returns
    /// true when anything changed.
    pub fn repair_selection(&mut self, config: &SessionConfig) -> bool {
        let mut repaired = false;
        if self.owned_characters.is_empty() {
            self.owned_characters.push(config.default_character.clone());
            repaired = true;
        }
        if self.used_character >= self.owned_characters.len() {
            self.used_character = 0;
            self.used_accessory = None;
            repaired = true;
        }
        if self.themes.is_empty() {
            self.themes.push(config.default_theme.clone());
            repaired = true;
        }
        if self.used_theme >= self.themes.len() {
            self.used_theme = 0;
            repaired = true;
        }
        repaired
    }

    /// Drops the equipped accessory when it does not index into a list of
    /// `available` accessories. Returns true when it was dropped.
    pub fn clamp_accessory(&mut self, available: usize) -> bool {
        match self.used_accessory {
            Some(index) if index >= available => {
                self.used_accessory = None;
                true
            }
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Progression
    // ─────────────────────────────────────────────────────────────────────

    /// Moves the first-time-experience counter from `from` to `to`, only if
    /// it currently sits at `from` and `to` is further along.
    pub fn advance_ftue(&mut self, from: u32, to: u32) -> bool {
        let to = to.min(MAX_COUNTER);
        if self.ftue_level == from && to > from {
            self.ftue_level = to;
            info!("[Profile] FTUE step {} -> {}", from, to);
            true
        } else {
            false
        }
    }

    /// Raises rank to match a run of `distance` metres. Never lowers it.
    pub fn record_distance(&mut self, distance: f32, rank_distance: f32) {
        if rank_distance <= 0.0 || distance <= 0.0 {
            return;
        }
        let reached = ((distance / rank_distance).floor() as u32).min(MAX_COUNTER);
        if reached > self.rank {
            info!("[Profile] Rank {} -> {}", self.rank, reached);
            self.rank = reached;
        }
    }

    pub fn score_qualifies(&self, score: i32, max_entries: usize) -> bool {
        max_entries > 0
            && (self.highscores.len() < max_entries
                || self.highscores.last().map_or(true, |last| score > last.score))
    }

    /// Inserts a score keeping the table sorted and trimmed. Returns the
    /// placement, or `None` when the score did not make the table.
    pub fn insert_score(
        &mut self,
        name: impl Into<String>,
        score: i32,
        max_entries: usize,
    ) -> Option<usize> {
        if !self.score_qualifies(score, max_entries) {
            return None;
        }
        let position = self
            .highscores
            .iter()
            .position(|entry| score > entry.score)
            .unwrap_or(self.highscores.len());
        self.highscores.insert(
            position,
            HighscoreEntry {
                name: name.into(),
                score,
            },
        );
        self.highscores.truncate(max_entries);
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_save_defaults() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let profile = Profile::new_save(&config, &mut rng);
        assert_eq!(profile.coins, 0);
        assert_eq!(profile.premium, 0);
        assert_eq!(profile.themes, vec!["Day".to_string()]);
        assert_eq!(profile.current_character(), Some("Trash Cat"));
        assert_eq!(profile.used_accessory, None);
        assert_eq!(profile.missions.len(), 2);
        assert!(profile.settings.master_volume_db.is_none());
    }

    #[test]
    fn test_premium_debit_rejects_overdraft() {
        let mut profile = Profile::default();
        profile.credit(Currency::Premium, 2);
        let err = profile.debit(Currency::Premium, 3).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                currency: Currency::Premium,
                needed: 3,
                available: 2
            }
        );
        assert_eq!(profile.premium, 2);
    }

    #[test]
    fn test_premium_debit_exact_balance() {
        let mut profile = Profile::default();
        profile.credit(Currency::Premium, 3);
        profile.debit(Currency::Premium, 3).unwrap();
        assert_eq!(profile.premium, 0);
    }

    #[test]
    fn test_soft_overdraft_clamps_to_zero() {
        let mut profile = Profile::default();
        profile.credit(Currency::Soft, 100);
        assert!(profile.debit(Currency::Soft, 250).is_ok());
        assert_eq!(profile.coins, 0);
    }

    #[test]
    fn test_consumable_counts_never_hold_zero() {
        let mut profile = Profile::default();
        profile.grant_consumable(ConsumableKind::CoinMagnet);
        profile.grant_consumable(ConsumableKind::CoinMagnet);
        assert_eq!(profile.consumable_count(ConsumableKind::CoinMagnet), 2);

        assert!(profile.consume_one(ConsumableKind::CoinMagnet));
        assert!(profile.consume_one(ConsumableKind::CoinMagnet));
        assert!(!profile.consumables.contains_key(&ConsumableKind::CoinMagnet));

        assert!(!profile.consume_one(ConsumableKind::CoinMagnet));
        assert_eq!(profile.consumable_count(ConsumableKind::CoinMagnet), 0);
        assert!(profile.consumables.values().all(|count| *count > 0));
    }

    #[test]
    fn test_owned_consumables_lists_counts() {
        let mut profile = Profile::default();
        profile.grant_consumable(ConsumableKind::ExtraLife);
        profile.grant_consumable(ConsumableKind::Invincibility);
        profile.grant_consumable(ConsumableKind::ExtraLife);
        let owned: Vec<_> = profile.owned_consumables().collect();
        assert_eq!(
            owned,
            vec![
                (ConsumableKind::Invincibility, 1),
                (ConsumableKind::ExtraLife, 2)
            ]
        );
    }

    #[test]
    fn test_unlock_accessory_validates_format() {
        let mut profile = Profile::default();
        assert_eq!(profile.unlock_accessory("Trash Cat:Smart"), Ok(true));
        assert_eq!(profile.unlock_accessory("Trash Cat:Smart"), Ok(false));
        assert!(profile.owns_accessory("Trash Cat:Smart"));
        assert!(matches!(
            profile.unlock_accessory("Smart"),
            Err(LedgerError::MalformedAccessoryId(_))
        ));
        assert!(matches!(
            profile.unlock_accessory("Trash Cat:"),
            Err(LedgerError::MalformedAccessoryId(_))
        ));
    }

    #[test]
    fn test_equip_accessory_bounds() {
        let mut profile = Profile::default();
        profile.equip_accessory(Some(2), 3).unwrap();
        assert_eq!(profile.used_accessory, Some(2));
        assert_eq!(
            profile.equip_accessory(Some(3), 3),
            Err(LedgerError::AccessoryOutOfRange {
                index: 3,
                available: 3
            })
        );
        assert_eq!(profile.used_accessory, Some(2));
        profile.equip_accessory(None, 0).unwrap();
        assert_eq!(profile.used_accessory, None);
    }

    #[test]
    fn test_changing_character_clears_accessory() {
        let mut profile = Profile::default();
        profile.add_character("Rubbish Raccoon");
        profile.equip_accessory(Some(1), 3).unwrap();

        profile.equip_character(0).unwrap();
        assert_eq!(profile.used_accessory, Some(1));

        profile.equip_character(1).unwrap();
        assert_eq!(profile.current_character(), Some("Rubbish Raccoon"));
        assert_eq!(profile.used_accessory, None);

        assert!(profile.equip_character(5).is_err());
    }

    #[test]
    fn test_themes_keep_unlock_order() {
        let mut profile = Profile::default();
        assert!(profile.add_theme("NightTime"));
        assert!(!profile.add_theme("Day"));
        assert_eq!(profile.themes, vec!["Day".to_string(), "NightTime".to_string()]);
        profile.equip_theme(1).unwrap();
        assert_eq!(profile.current_theme(), Some("NightTime"));
        assert!(profile.equip_theme(2).is_err());
    }

    #[test]
    fn test_ftue_only_moves_forward_from_expected_step() {
        let mut profile = Profile::default();
        assert!(!profile.advance_ftue(1, 2));
        assert!(profile.advance_ftue(0, 1));
        assert!(profile.advance_ftue(1, 2));
        assert!(!profile.advance_ftue(0, 1));
        assert!(!profile.advance_ftue(2, 1));
        assert_eq!(profile.ftue_level, 2);
    }

    #[test]
    fn test_rank_is_monotonic() {
        let mut profile = Profile::default();
        profile.record_distance(1250.0, 300.0);
        assert_eq!(profile.rank, 4);
        profile.record_distance(310.0, 300.0);
        assert_eq!(profile.rank, 4);
    }

    #[test]
    fn test_counters_saturate_at_wire_ceiling() {
        let mut profile = Profile::default();
        profile.credit(Currency::Soft, 3_000_000_000);
        assert_eq!(profile.coins, MAX_COUNTER);
        profile.credit(Currency::Premium, u32::MAX);
        profile.credit(Currency::Premium, 1);
        assert_eq!(profile.premium, MAX_COUNTER);

        profile.consumables.insert(ConsumableKind::ExtraLife, MAX_COUNTER);
        profile.grant_consumable(ConsumableKind::ExtraLife);
        assert_eq!(profile.consumable_count(ConsumableKind::ExtraLife), MAX_COUNTER);

        profile.record_distance(f32::MAX, 1.0);
        assert_eq!(profile.rank, MAX_COUNTER);
        assert!(profile.advance_ftue(0, u32::MAX));
        assert_eq!(profile.ftue_level, MAX_COUNTER);
    }

    #[test]
    fn test_repair_selection_restores_defaults() {
        let config = SessionConfig::default();
        let mut profile = Profile::default();
        assert!(!profile.repair_selection(&config));

        profile.used_character = 5;
        profile.used_accessory = Some(1);
        profile.themes.clear();
        profile.used_theme = 9;
        assert!(profile.repair_selection(&config));
        assert_eq!(profile.current_character(), Some("Trash Cat"));
        assert_eq!(profile.current_theme(), Some("Day"));
        assert_eq!(profile.used_accessory, None);

        profile.owned_characters.clear();
        profile.used_character = 0;
        assert!(profile.repair_selection(&config));
        assert_eq!(profile.current_character(), Some("Trash Cat"));
    }

    #[test]
    fn test_clamp_accessory_drops_stale_index() {
        let mut profile = Profile::default();
        profile.used_accessory = Some(2);
        assert!(!profile.clamp_accessory(3));
        assert_eq!(profile.used_accessory, Some(2));
        assert!(profile.clamp_accessory(2));
        assert_eq!(profile.used_accessory, None);
    }

    #[test]
    fn test_highscores_sorted_and_trimmed() {
        let mut profile = Profile::default();
        assert_eq!(profile.insert_score("a", 100, 3), Some(0));
        assert_eq!(profile.insert_score("b", 300, 3), Some(0));
        assert_eq!(profile.insert_score("c", 200, 3), Some(1));
        assert!(!profile.score_qualifies(50, 3));
        assert_eq!(profile.insert_score("d", 50, 3), None);
        assert_eq!(profile.insert_score("e", 250, 3), Some(1));

        let scores: Vec<i32> = profile.highscores.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![300, 250, 200]);
    }
}
