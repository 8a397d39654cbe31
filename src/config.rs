//! TOML settings with full defaults

use std::collections::HashMap;

use macroquad::file::load_string;
use serde::Deserialize;

use crate::assets;
use crate::world::{WorldConfig, INTERIOR_SHEET_KEY, INTERIOR_SHEET_PATH};

/// Engine settings. Every section and field is optional in the file;
/// whatever is missing (including the whole file) falls back to the
/// defaults, so the demo always starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConfig,
    pub movement: MovementConfig,
    pub assets: AssetConfig,
    /// Sheet key -> image path relative to `assets.base_path`. These
    /// are warmed at startup alongside the character pool.
    pub sheets: HashMap<String, String>,
    /// Tileset name (as it appears in a map file) -> sheet key.
    pub tileset_sheets: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub tiles_per_second: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            tiles_per_second: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub base_path: String,
    /// Tiled JSON map to load at startup, as given (not under
    /// `base_path`). None keeps the generated room.
    pub map_path: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_path: "assets/pod-assets".to_string(),
            map_path: None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut sheets = HashMap::new();
        sheets.insert(
            INTERIOR_SHEET_KEY.to_string(),
            INTERIOR_SHEET_PATH.to_string(),
        );
        Self {
            world: WorldConfig::default(),
            movement: MovementConfig::default(),
            assets: AssetConfig::default(),
            sheets,
            tileset_sheets: HashMap::new(),
        }
    }
}

impl GameConfig {
    /// Read settings from `path`. A missing file is normal; a malformed
    /// one is logged. Either way the result is usable.
    pub async fn load(path: &str) -> Self {
        let config = match load_string(path).await {
            Ok(text) => match toml::from_str::<GameConfig>(&text) {
                Ok(config) => {
                    log::info!("loaded settings from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("failed to parse {}: {}; using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no settings at {}; using defaults", path);
                Self::default()
            }
        };
        config.validated()
    }

    fn validated(mut self) -> Self {
        if !self.world.is_valid() {
            log::warn!(
                "world {}x{} with {}px tiles is not tile-aligned; using the default room size",
                self.world.width,
                self.world.height,
                self.world.tile_size
            );
            self.world = WorldConfig::default();
        }
        self
    }

    /// Full path of a sheet image under the asset base.
    pub fn sheet_path(&self, relative: &str) -> String {
        format!("{}/{}", self.assets.base_path, relative)
    }

    /// Every `(key, path)` pair to warm at startup: the configured
    /// sheets plus all premade character sheets.
    pub fn preload_items(&self) -> Vec<(String, String)> {
        let mut items: Vec<(String, String)> = self
            .sheets
            .iter()
            .map(|(key, relative)| (key.clone(), self.sheet_path(relative)))
            .collect();
        for number in assets::character_pool() {
            items.push((
                assets::character_sprite_key(number),
                assets::character_sprite_path(&self.assets.base_path, number),
            ));
        }
        items
    }
}
