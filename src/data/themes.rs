use super::ThemeDef;

/// Populate the built-in track themes.
pub fn populate_themes(themes: &mut Vec<ThemeDef>) {
    themes.extend([
        ThemeDef {
            name: "Day".into(),
            cost: 0,
            premium_cost: 0,
            fog_color: [0.62, 0.78, 0.92, 1.0],
            cloud_count: 10,
        },
        ThemeDef {
            name: "NightTime".into(),
            cost: 40_000,
            premium_cost: 15,
            fog_color: [0.05, 0.06, 0.18, 1.0],
            cloud_count: 4,
        },
    ]);
}
