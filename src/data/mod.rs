//! Content layer: character and theme definitions and the loaders that
//! serve them to the asset registries.
//!
//! `BuiltinContent` serves the hard-coded game-design data from the
//! submodules. `RonContentLoader` reads one `<key>.ron` file per asset from a
//! directory, on the IO task pool.

mod characters;
mod themes;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::assets::{AssetFetchError, AssetLoader, FetchFuture};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub name: String,
    pub cost: u32,
    pub premium_cost: u32,
    #[serde(default)]
    pub accessories: Vec<String>,
}

impl CharacterDef {
    /// Owned-item id for one of this character's accessories.
    pub fn accessory_id(&self, index: usize) -> Option<String> {
        self.accessories
            .get(index)
            .map(|accessory| format!("{}:{}", self.name, accessory))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDef {
    pub name: String,
    pub cost: u32,
    pub premium_cost: u32,
    pub fog_color: [f32; 4],
    #[serde(default)]
    pub cloud_count: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// BUILT-IN CONTENT
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct BuiltinContent {
    pub characters: HashMap<String, CharacterDef>,
    pub themes: HashMap<String, ThemeDef>,
}

impl BuiltinContent {
    pub fn new() -> Self {
        let mut character_list = Vec::new();
        let mut theme_list = Vec::new();
        characters::populate_characters(&mut character_list);
        themes::populate_themes(&mut theme_list);

        Self {
            characters: character_list
                .into_iter()
                .map(|def| (def.name.clone(), def))
                .collect(),
            themes: theme_list
                .into_iter()
                .map(|def| (def.name.clone(), def))
                .collect(),
        }
    }
}

impl AssetLoader<CharacterDef> for BuiltinContent {
    fn fetch(&self, key: &str) -> FetchFuture<CharacterDef> {
        let result = self
            .characters
            .get(key)
            .cloned()
            .ok_or_else(|| AssetFetchError::NotFound(key.to_string()));
        Box::pin(async move { result })
    }
}

impl AssetLoader<ThemeDef> for BuiltinContent {
    fn fetch(&self, key: &str) -> FetchFuture<ThemeDef> {
        let result = self
            .themes
            .get(key)
            .cloned()
            .ok_or_else(|| AssetFetchError::NotFound(key.to_string()));
        Box::pin(async move { result })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// RON DIRECTORY LOADER
// ═══════════════════════════════════════════════════════════════════════

/// Loads `<root>/<key>.ron` into `T`. File reads happen inside the fetch
/// future, so they run on the task pool rather than the tick thread.
pub struct RonContentLoader<T> {
    root: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RonContentLoader<T> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> AssetLoader<T> for RonContentLoader<T> {
    fn fetch(&self, key: &str) -> FetchFuture<T> {
        let path = self.root.join(format!("{key}.ron"));
        let key = key.to_string();
        Box::pin(async move {
            let contents = fs::read_to_string(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AssetFetchError::NotFound(key.clone())
                } else {
                    AssetFetchError::Io {
                        key: key.clone(),
                        message: e.to_string(),
                    }
                }
            })?;
            ron::from_str(&contents).map_err(|e| AssetFetchError::Parse {
                key,
                message: e.to_string(),
            })
        })
    }
}
