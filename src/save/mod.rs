//! Versioned binary save format for the player profile.
//!
//! A blob starts with the schema version it was written with, followed by
//! field groups in the order they were introduced. Each group added after
//! version 0 is read only when the blob's version is at least the version
//! that introduced it, so saves from older builds load with defaults for the
//! newer fields. Groups are only ever appended; an existing group never
//! changes shape.
//!
//! | version | group |
//! |---|---|
//! | 0 | coins, consumables, owned characters, used character, accessories, themes, used theme |
//! | 2 | premium |
//! | 3 | highscores |
//! | 4 | missions |
//! | 7 | previous player name |
//! | 8 | licence accepted |
//! | 9 | master / music / sfx volume |
//! | 10 | ftue level, rank |
//! | 11 | tutorial done, used accessory |

pub mod codec;

use bevy::log::{info, warn};
use rand::Rng;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::missions::{self, Mission, MissionKind};
use crate::profile::{HighscoreEntry, Profile};
use crate::shared::ConsumableKind;

use codec::{SaveReader, SaveWriter};

pub const SAVE_VERSION: i32 = 11;

/// Wire value for a volume the player never set.
const UNSET_VOLUME: f32 = f32::MIN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptSaveError {
    #[error("save blob has no version tag")]
    MissingVersion,
    #[error("unsupported save version {0}")]
    UnsupportedVersion(i32),
    #[error("save blob truncated while reading {0}")]
    Truncated(&'static str),
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: i64 },
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("unknown mission kind {0}")]
    UnknownMissionKind(i32),
}

// ═══════════════════════════════════════════════════════════════════════
// SAVE
// ═══════════════════════════════════════════════════════════════════════

pub fn save(profile: &Profile) -> Vec<u8> {
    let mut w = SaveWriter::new();
    w.write_i32(SAVE_VERSION);

    w.write_u32(profile.coins);
    w.write_len(profile.consumables.len());
    for (kind, count) in &profile.consumables {
        w.write_i32(kind.tag());
        w.write_u32(*count);
    }
    w.write_len(profile.owned_characters.len());
    for name in &profile.owned_characters {
        w.write_string(name);
    }
    w.write_len(profile.used_character);
    w.write_len(profile.accessories.len());
    for id in &profile.accessories {
        w.write_string(id);
    }
    w.write_len(profile.themes.len());
    for theme in &profile.themes {
        w.write_string(theme);
    }
    w.write_len(profile.used_theme);

    // v2
    w.write_u32(profile.premium);

    // v3
    w.write_len(profile.highscores.len());
    for entry in &profile.highscores {
        w.write_string(&entry.name);
        w.write_i32(entry.score);
    }

    // v4
    w.write_len(profile.missions.len());
    for mission in &profile.missions {
        w.write_i32(mission.kind.tag());
        w.write_f32(mission.progress);
        w.write_f32(mission.target);
        w.write_u32(mission.reward);
    }

    // v7
    w.write_string(&profile.previous_name);

    // v8
    w.write_bool(profile.settings.licence_accepted);

    // v9
    for volume in [
        profile.settings.master_volume_db,
        profile.settings.music_volume_db,
        profile.settings.sfx_volume_db,
    ] {
        w.write_f32(volume.unwrap_or(UNSET_VOLUME));
    }

    // v10
    w.write_u32(profile.ftue_level);
    w.write_u32(profile.rank);

    // v11
    w.write_bool(profile.tutorial_done);
    w.write_i32(profile.used_accessory.map_or(-1, |i| i as i32));

    w.into_bytes()
}

// ═══════════════════════════════════════════════════════════════════════
// LOAD
// ═══════════════════════════════════════════════════════════════════════

pub fn load(bytes: &[u8]) -> Result<Profile, CorruptSaveError> {
    let mut r = SaveReader::new(bytes);
    let version = match r.read_i32("version") {
        Ok(version) => version,
        Err(CorruptSaveError::Truncated(_)) => return Err(CorruptSaveError::MissingVersion),
        Err(err) => return Err(err),
    };
    if version < 0 {
        return Err(CorruptSaveError::UnsupportedVersion(version));
    }
    if version > SAVE_VERSION {
        warn!(
            "[Save] Blob has version {} but current version is {}. Loading known fields only.",
            version, SAVE_VERSION
        );
    }

    let mut profile = Profile::default();

    profile.coins = r.read_u32("coins")?;
    profile.consumables.clear();
    let consumable_count = r.read_len("consumable count")?;
    for _ in 0..consumable_count {
        let tag = r.read_i32("consumable kind")?;
        let count = r.read_u32("consumable amount")?;
        let kind = ConsumableKind::from_tag(tag).ok_or(CorruptSaveError::InvalidValue {
            field: "consumable kind",
            value: i64::from(tag),
        })?;
        if count > 0 {
            profile.consumables.insert(kind, count);
        }
    }

    profile.owned_characters = read_strings(&mut r, "character")?;
    profile.used_character = r.read_len("used character")?;
    profile.accessories = read_strings(&mut r, "accessory")?.into_iter().collect();
    profile.themes = read_strings(&mut r, "theme")?;
    profile.used_theme = r.read_len("used theme")?;

    if version >= 2 {
        profile.premium = r.read_u32("premium")?;
    }

    if version >= 3 {
        let count = r.read_len("highscore count")?;
        profile.highscores = (0..count)
            .map(|_| {
                Ok(HighscoreEntry {
                    name: r.read_string("highscore name")?,
                    score: r.read_i32("highscore score")?,
                })
            })
            .collect::<Result<_, CorruptSaveError>>()?;
    }

    if version >= 4 {
        let count = r.read_len("mission count")?;
        profile.missions.clear();
        for _ in 0..count {
            let tag = r.read_i32("mission kind")?;
            let kind =
                MissionKind::from_tag(tag).ok_or(CorruptSaveError::UnknownMissionKind(tag))?;
            let progress = r.read_f32("mission progress")?;
            let target = r.read_f32("mission target")?;
            let reward = r.read_u32("mission reward")?;
            profile
                .missions
                .push(Mission::restore(kind, progress, target, reward));
        }
    }

    if version >= 7 {
        profile.previous_name = r.read_string("previous name")?;
    }

    if version >= 8 {
        profile.settings.licence_accepted = r.read_bool("licence accepted")?;
    }

    if version >= 9 {
        profile.settings.master_volume_db = read_volume(&mut r, "master volume")?;
        profile.settings.music_volume_db = read_volume(&mut r, "music volume")?;
        profile.settings.sfx_volume_db = read_volume(&mut r, "sfx volume")?;
    }

    if version >= 10 {
        profile.ftue_level = r.read_u32("ftue level")?;
        profile.rank = r.read_u32("rank")?;
    }

    if version >= 11 {
        profile.tutorial_done = r.read_bool("tutorial done")?;
        let used = r.read_i32("used accessory")?;
        profile.used_accessory = match used {
            -1 => None,
            i if i >= 0 => Some(i as usize),
            other => {
                return Err(CorruptSaveError::InvalidValue {
                    field: "used accessory",
                    value: i64::from(other),
                })
            }
        };
    }

    Ok(profile)
}

fn read_strings(
    r: &mut SaveReader<'_>,
    field: &'static str,
) -> Result<Vec<String>, CorruptSaveError> {
    let count = r.read_len(field)?;
    (0..count).map(|_| r.read_string(field)).collect()
}

fn read_volume(
    r: &mut SaveReader<'_>,
    field: &'static str,
) -> Result<Option<f32>, CorruptSaveError> {
    let value = r.read_f32(field)?;
    Ok((value != UNSET_VOLUME).then_some(value))
}

/// Loads `bytes` if present and readable, otherwise starts a new profile.
/// Corruption is logged and never reaches the player.
pub fn load_or_new(bytes: Option<&[u8]>, config: &SessionConfig, rng: &mut impl Rng) -> Profile {
    let Some(bytes) = bytes else {
        info!("[Save] No save found. Creating a new profile.");
        return Profile::new_save(config, rng);
    };
    match load(bytes) {
        Ok(mut profile) => {
            if profile.repair_selection(config) {
                warn!("[Save] Character or theme selection out of range. Reset to defaults.");
            }
            missions::ensure_pool_size(&mut profile, config.mission_pool_size, rng);
            info!(
                "[Save] Loaded profile: {} coins, {} premium, {} missions.",
                profile.coins,
                profile.premium,
                profile.missions.len()
            );
            profile
        }
        Err(err) => {
            warn!("[Save] Save is unreadable ({}). Starting a new profile.", err);
            Profile::new_save(config, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MAX_COUNTER;
    use crate::shared::Currency;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Writes the groups present up to version 7 exactly as an old build did.
    fn legacy_v7_blob() -> Vec<u8> {
        let mut w = SaveWriter::new();
        w.write_i32(7);
        w.write_i32(1_250); // coins
        w.write_i32(1); // consumables
        w.write_i32(ConsumableKind::ExtraLife.tag());
        w.write_i32(2);
        w.write_i32(1);
        w.write_string("Trash Cat");
        w.write_i32(0);
        w.write_i32(1);
        w.write_string("Trash Cat:Smart");
        w.write_i32(2);
        w.write_string("Day");
        w.write_string("NightTime");
        w.write_i32(1);
        w.write_i32(6); // premium
        w.write_i32(1); // highscores
        w.write_string("Tom");
        w.write_i32(4_200);
        w.write_i32(1); // missions
        w.write_i32(MissionKind::Pickup.tag());
        w.write_f32(150.0);
        w.write_f32(1000.0);
        w.write_i32(1);
        w.write_string("Tom");
        w.into_bytes()
    }

    fn busy_profile() -> Profile {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(77);
        let mut profile = Profile::new_save(&config, &mut rng);
        profile.credit(Currency::Soft, 4_321);
        profile.credit(Currency::Premium, 17);
        profile.grant_consumable(ConsumableKind::CoinMagnet);
        profile.grant_consumable(ConsumableKind::Invincibility);
        profile.grant_consumable(ConsumableKind::Invincibility);
        profile.add_character("Rubbish Raccoon");
        profile.equip_character(1).unwrap();
        profile.unlock_accessory("Rubbish Raccoon:Headphones").unwrap();
        profile.equip_accessory(Some(0), 2).unwrap();
        profile.add_theme("NightTime");
        profile.equip_theme(1).unwrap();
        profile.insert_score("Émilie", 9_001, 10);
        profile.previous_name = "Émilie".to_string();
        profile.settings.licence_accepted = true;
        profile.settings.set_master_from_slider(0.75);
        profile.settings.set_sfx_from_slider(0.0);
        profile.advance_ftue(0, 1);
        profile.record_distance(950.0, 300.0);
        profile.tutorial_done = true;
        profile.missions[0].progress = profile.missions[0].target / 2.0;
        profile
    }

    #[test]
    fn test_round_trip_new_profile() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let profile = Profile::new_save(&config, &mut rng);
        assert_eq!(load(&save(&profile)).unwrap(), profile);
    }

    #[test]
    fn test_round_trip_after_mutations() {
        let profile = busy_profile();
        let loaded = load(&save(&profile)).unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(loaded.settings.music_volume_db, None);
        assert_eq!(loaded.used_accessory, Some(0));
    }

    #[test]
    fn test_round_trip_at_counter_ceiling() {
        let mut profile = busy_profile();
        profile.credit(Currency::Soft, 3_000_000_000);
        profile.credit(Currency::Premium, u32::MAX);
        profile.record_distance(f32::MAX, 300.0);
        assert_eq!(profile.coins, MAX_COUNTER);
        assert_eq!(load(&save(&profile)).unwrap(), profile);
    }

    /// Applies `steps` random ledger and selection mutations.
    fn mutate(profile: &mut Profile, rng: &mut StdRng, steps: usize) {
        const KINDS: [ConsumableKind; 3] = [
            ConsumableKind::CoinMagnet,
            ConsumableKind::Invincibility,
            ConsumableKind::ExtraLife,
        ];
        let config = SessionConfig::default();
        for _ in 0..steps {
            let kind = KINDS[rng.gen_range(0..KINDS.len())];
            match rng.gen_range(0..12) {
                0 => profile.credit(Currency::Soft, rng.gen()),
                1 => profile.credit(Currency::Premium, rng.gen_range(0..1_000)),
                2 => {
                    let _ = profile.debit(Currency::Premium, rng.gen_range(0..500));
                }
                3 => {
                    let _ = profile.debit(Currency::Soft, rng.gen());
                }
                4 => profile.grant_consumable(kind),
                5 => {
                    profile.consume_one(kind);
                }
                6 => {
                    let name = format!("Runner {}", rng.gen_range(0..4));
                    profile.add_character(name);
                    let index = rng.gen_range(0..profile.owned_characters.len());
                    profile.equip_character(index).unwrap();
                }
                7 => {
                    let id = format!("Trash Cat:Hat {}", rng.gen_range(0..5));
                    profile.unlock_accessory(&id).unwrap();
                    let index = rng.gen_range(0..3);
                    profile.equip_accessory(Some(index), 3).unwrap();
                }
                8 => {
                    profile.add_theme(format!("Theme {}", rng.gen_range(0..3)));
                    let index = rng.gen_range(0..profile.themes.len());
                    profile.equip_theme(index).unwrap();
                }
                9 => {
                    profile.insert_score("Runner", rng.gen(), config.max_highscores);
                }
                10 => profile.record_distance(rng.gen_range(0.0..f32::MAX), 300.0),
                _ => {
                    let from = profile.ftue_level;
                    profile.advance_ftue(from, from.saturating_add(rng.gen_range(1..3)));
                }
            }
        }
    }

    #[test]
    fn test_round_trip_after_random_mutations() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(2024);
        for round in 0..200 {
            let mut profile = Profile::new_save(&config, &mut rng);
            mutate(&mut profile, &mut rng, 1 + round % 40);
            let loaded = load(&save(&profile)).unwrap();
            assert_eq!(loaded, profile, "round {round}");
        }
    }

    #[test]
    fn test_load_or_new_repairs_out_of_range_selection() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut broken = Profile::default();
        broken.coins = 90;
        broken.used_character = 5;
        broken.used_theme = 9;
        let bytes = save(&broken);
        assert_eq!(load(&bytes).unwrap().current_character(), None);

        let profile = load_or_new(Some(&bytes), &config, &mut rng);
        assert_eq!(profile.coins, 90);
        assert_eq!(profile.current_character(), Some("Trash Cat"));
        assert_eq!(profile.current_theme(), Some("Day"));
    }

    #[test]
    fn test_load_or_new_refills_empty_lists() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut broken = Profile::default();
        broken.owned_characters.clear();
        broken.themes.clear();
        let profile = load_or_new(Some(&save(&broken)), &config, &mut rng);
        assert_eq!(profile.owned_characters, vec!["Trash Cat".to_string()]);
        assert_eq!(profile.themes, vec!["Day".to_string()]);
    }

    #[test]
    fn test_blob_starts_with_current_version() {
        let bytes = save(&Profile::default());
        assert_eq!(&bytes[..4], &SAVE_VERSION.to_le_bytes());
    }

    #[test]
    fn test_v7_blob_gets_defaults_for_newer_groups() {
        let profile = load(&legacy_v7_blob()).unwrap();
        assert_eq!(profile.coins, 1_250);
        assert_eq!(profile.premium, 6);
        assert_eq!(profile.consumable_count(ConsumableKind::ExtraLife), 2);
        assert_eq!(profile.current_theme(), Some("NightTime"));
        assert_eq!(profile.highscores[0].score, 4_200);
        assert_eq!(profile.missions.len(), 1);
        assert_eq!(profile.previous_name, "Tom");

        assert!(!profile.settings.licence_accepted);
        assert_eq!(profile.settings.master_volume_db, None);
        assert_eq!(profile.settings.music_volume_db, None);
        assert_eq!(profile.settings.sfx_volume_db, None);
        assert_eq!(profile.ftue_level, 0);
        assert_eq!(profile.rank, 0);
        assert!(!profile.tutorial_done);
        assert_eq!(profile.used_accessory, None);
    }

    #[test]
    fn test_v1_blob_skips_premium_and_later() {
        let mut w = SaveWriter::new();
        w.write_i32(1);
        w.write_i32(30);
        w.write_i32(0);
        w.write_i32(1);
        w.write_string("Trash Cat");
        w.write_i32(0);
        w.write_i32(0);
        w.write_i32(1);
        w.write_string("Day");
        w.write_i32(0);
        let profile = load(&w.into_bytes()).unwrap();
        assert_eq!(profile.coins, 30);
        assert_eq!(profile.premium, 0);
        assert!(profile.missions.is_empty());
        assert_eq!(profile.previous_name, "Trash Cat");
    }

    #[test]
    fn test_empty_blob_is_missing_version() {
        assert_eq!(load(&[]), Err(CorruptSaveError::MissingVersion));
        assert_eq!(load(&[11, 0]), Err(CorruptSaveError::MissingVersion));
    }

    #[test]
    fn test_negative_version_rejected() {
        assert_eq!(
            load(&(-3i32).to_le_bytes()),
            Err(CorruptSaveError::UnsupportedVersion(-3))
        );
    }

    #[test]
    fn test_truncated_blob_is_corrupt() {
        let bytes = save(&busy_profile());
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(load(cut), Err(CorruptSaveError::Truncated(_))));
    }

    #[test]
    fn test_unknown_mission_kind_is_corrupt() {
        let mut bytes = legacy_v7_blob();
        // Mission kind sits right after the single mission count.
        let name_len = 1 + "Tom".len();
        let mission_payload = 4 + 4 + 4 + 4;
        let kind_at = bytes.len() - name_len - mission_payload;
        bytes[kind_at..kind_at + 4].copy_from_slice(&42i32.to_le_bytes());
        assert_eq!(load(&bytes), Err(CorruptSaveError::UnknownMissionKind(42)));
    }

    #[test]
    fn test_future_version_loads_known_groups() {
        let mut bytes = save(&busy_profile());
        bytes[..4].copy_from_slice(&(SAVE_VERSION + 1).to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(load(&bytes).unwrap(), busy_profile());
    }

    #[test]
    fn test_load_or_new_falls_back_on_corruption() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let profile = load_or_new(Some(&[0xde, 0xad]), &config, &mut rng);
        assert_eq!(profile.coins, 0);
        assert_eq!(profile.missions.len(), 2);
    }

    #[test]
    fn test_load_or_new_refills_old_mission_pool() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let profile = load_or_new(Some(&legacy_v7_blob()), &config, &mut rng);
        assert_eq!(profile.coins, 1_250);
        assert_eq!(profile.missions.len(), 2);
    }
}
