/// Lowest mixer level the volume sliders map to.
pub const MIN_VOLUME_DB: f32 = -80.0;

/// Player-facing audio and legal settings.
///
/// Volumes are mixer levels in dB. `None` means the player never touched
/// the slider and the platform default applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub master_volume_db: Option<f32>,
    pub music_volume_db: Option<f32>,
    pub sfx_volume_db: Option<f32>,
    pub licence_accepted: bool,
}

/// Converts a 0..=1 slider position to a mixer level.
pub fn slider_to_db(slider: f32) -> f32 {
    MIN_VOLUME_DB * (1.0 - slider.clamp(0.0, 1.0))
}

/// Converts a mixer level back to a slider position. Unset volumes sit at
/// full.
pub fn db_to_slider(db: Option<f32>) -> f32 {
    match db {
        Some(db) => 1.0 - (db / MIN_VOLUME_DB),
        None => 1.0,
    }
}

impl Settings {
    pub fn set_master_from_slider(&mut self, slider: f32) {
        self.master_volume_db = Some(slider_to_db(slider));
    }

    pub fn set_music_from_slider(&mut self, slider: f32) {
        self.music_volume_db = Some(slider_to_db(slider));
    }

    pub fn set_sfx_from_slider(&mut self, slider: f32) {
        self.sfx_volume_db = Some(slider_to_db(slider));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_extremes() {
        assert_eq!(slider_to_db(1.0), 0.0);
        assert_eq!(slider_to_db(0.0), MIN_VOLUME_DB);
        assert_eq!(slider_to_db(2.0), 0.0);
    }

    #[test]
    fn test_slider_inverse() {
        let db = slider_to_db(0.25);
        assert_eq!(db, -60.0);
        assert!((db_to_slider(Some(db)) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_unset_volume_reads_as_full() {
        assert_eq!(db_to_slider(None), 1.0);
        let settings = Settings::default();
        assert!(settings.master_volume_db.is_none());
        assert!(!settings.licence_accepted);
    }

    #[test]
    fn test_setters_store_db() {
        let mut settings = Settings::default();
        settings.set_music_from_slider(0.5);
        assert_eq!(settings.music_volume_db, Some(-40.0));
        assert!(settings.sfx_volume_db.is_none());
    }
}
