use super::CharacterDef;

/// Populate the built-in character roster.
///
/// Accessory lists are ordered; a profile's equipped accessory index points
/// into the list of whichever character is equipped.
pub fn populate_characters(characters: &mut Vec<CharacterDef>) {
    characters.extend([
        CharacterDef {
            name: "Trash Cat".into(),
            cost: 0,
            premium_cost: 0,
            accessories: vec!["Party Hat".into(), "Smart".into(), "Baseball".into()],
        },
        CharacterDef {
            name: "Rubbish Raccoon".into(),
            cost: 50_000,
            premium_cost: 20,
            accessories: vec!["Headphones".into(), "Sports".into()],
        },
    ]);
}
