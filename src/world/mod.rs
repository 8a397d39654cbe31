//! World model: tile grid, Tiled map overlay, collision and rendering

use std::collections::HashMap;

use macroquad::file::load_string;
use macroquad::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::assets::AssetCache;

pub mod tilemap;
pub use tilemap::{TiledLayer, TiledMap, TiledProperty, TiledTileset};

/// Sheet the generated room draws from, and where it lives under the
/// asset base.
pub const INTERIOR_SHEET_KEY: &str = "room_builder";
pub const INTERIOR_SHEET_PATH: &str = "1_Interiors/48x48/Room_Builder_48x48.png";

/// Source offsets into the room builder sheet for the generated room.
const FLOOR_SOURCE: (f32, f32) = (0.0, 1440.0);
const WALL_SOURCE: (f32, f32) = (0.0, 96.0);

const GRID_LINE_WIDTH: f32 = 1.0;

/// Pixel dimensions of the world and its tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 768,
            height: 576,
            tile_size: 48,
        }
    }
}

impl WorldConfig {
    /// A config the world can actually be built from: positive tile
    /// size dividing both dimensions evenly.
    pub fn is_valid(&self) -> bool {
        self.tile_size > 0 && self.width % self.tile_size == 0 && self.height % self.tile_size == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Floor,
    Wall,
    Furniture,
    Decoration,
}

impl TileKind {
    fn solid_by_default(self) -> bool {
        matches!(self, TileKind::Wall | TileKind::Furniture)
    }
}

/// One drawable cell layer: which sheet region it shows and whether it
/// blocks, with `solid: None` falling back to the kind's default.
#[derive(Debug, Clone)]
pub struct TileRef {
    pub kind: TileKind,
    pub sheet_key: String,
    pub source_x: f32,
    pub source_y: f32,
    pub solid: Option<bool>,
}

impl TileRef {
    fn interior(kind: TileKind, source: (f32, f32)) -> Self {
        Self {
            kind,
            sheet_key: INTERIOR_SHEET_KEY.to_string(),
            source_x: source.0,
            source_y: source.1,
            solid: None,
        }
    }

    pub fn is_solid(&self) -> bool {
        self.solid.unwrap_or(self.kind.solid_by_default())
    }
}

/// A cell of the generated room: floor underneath, optional wall on top.
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub floor: Option<TileRef>,
    pub wall: Option<TileRef>,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to fetch tile map {path}: {message}")]
    Fetch { path: String, message: String },
    #[error("failed to parse tile map {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The playable room. Starts as a generated grid (floor everywhere,
/// walls around the edge) and can swap in a Tiled map; collision only
/// ever comes from a loaded map's collision layer.
pub struct World {
    config: WorldConfig,
    tiles_x: u32,
    tiles_y: u32,
    tiles: Vec<Tile>,
    map: Option<TiledMap>,
    collision_layer: Option<usize>,
    tileset_sheets: HashMap<String, String>,
    background_color: Color,
    grid_color: Color,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let tile_size = config.tile_size.max(1);
        let tiles_x = config.width / tile_size;
        let tiles_y = config.height / tile_size;
        Self {
            config,
            tiles_x,
            tiles_y,
            tiles: build_default_grid(tiles_x, tiles_y),
            map: None,
            collision_layer: None,
            tileset_sheets: HashMap::new(),
            background_color: Color::from_rgba(42, 42, 42, 255),
            grid_color: Color::from_rgba(68, 68, 68, 255),
        }
    }

    pub fn config(&self) -> WorldConfig {
        self.config
    }

    pub fn tile_size(&self) -> u32 {
        self.config.tile_size
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    /// Generated-room cell at a grid position. An installed map
    /// supersedes the grid, so this answers `None` once a map is in.
    pub fn tile_at(&self, x: u32, y: u32) -> Option<&Tile> {
        if self.map.is_some() || x >= self.tiles_x || y >= self.tiles_y {
            return None;
        }
        self.tiles.get((y * self.tiles_x + x) as usize)
    }

    /// Pixel extents characters are clamped into. A loaded map decides
    /// them; otherwise the configured dimensions do.
    pub fn bounds(&self) -> (f32, f32) {
        match &self.map {
            Some(map) => (
                (map.width * map.tilewidth) as f32,
                (map.height * map.tileheight) as f32,
            ),
            None => (self.config.width as f32, self.config.height as f32),
        }
    }

    /// Whether a grid cell blocks movement. Only a loaded map's
    /// collision layer speaks here; without one (including for every
    /// out-of-range query) the answer is walkable.
    pub fn is_collision(&self, tile_x: i32, tile_y: i32) -> bool {
        if tile_x < 0 || tile_y < 0 {
            return false;
        }
        let (x, y) = (tile_x as u32, tile_y as u32);
        if x >= self.tiles_x || y >= self.tiles_y {
            return false;
        }
        match (&self.map, self.collision_layer) {
            (Some(map), Some(index)) => map.layers[index].gid_at(x, y) != 0,
            _ => false,
        }
    }

    /// Swap in a parsed map: grid size, bounds and collision all follow
    /// it from now on.
    pub fn install_map(&mut self, map: TiledMap) {
        self.collision_layer = map.collision_layer_index();
        self.tiles_x = map.width;
        self.tiles_y = map.height;
        self.map = Some(map);
    }

    /// Fetch, parse and install a Tiled JSON map. Any failure leaves
    /// the world exactly as it was.
    pub async fn load_tiled_map(&mut self, path: &str) -> Result<(), MapError> {
        let json = load_string(path).await.map_err(|e| MapError::Fetch {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let map = TiledMap::from_json(&json).map_err(|e| MapError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        self.install_map(map);
        log::info!(
            "loaded tile map {} ({}x{} tiles, collision layer: {})",
            path,
            self.tiles_x,
            self.tiles_y,
            self.collision_layer.is_some()
        );
        Ok(())
    }

    /// Point a tileset (by its name in the map file) at a cached sheet.
    /// Unmapped tilesets use their own name as the sheet key.
    pub fn map_tileset_sheet(&mut self, tileset_name: impl Into<String>, sheet_key: impl Into<String>) {
        self.tileset_sheets.insert(tileset_name.into(), sheet_key.into());
    }

    fn sheet_key_for<'a>(&'a self, tileset: &'a TiledTileset) -> &'a str {
        self.tileset_sheets
            .get(&tileset.name)
            .map(String::as_str)
            .unwrap_or(&tileset.name)
    }

    /// Draw the room: background, then the loaded map's layers in file
    /// order (or the generated grid), with a line grid as the fallback
    /// when no sheet has arrived yet.
    pub fn render(&self, assets: &AssetCache) {
        clear_background(self.background_color);
        match &self.map {
            Some(map) => self.render_map(map, assets),
            None => self.render_default_grid(assets),
        }
    }

    fn render_map(&self, map: &TiledMap, assets: &AssetCache) {
        let any_sheet = map
            .tilesets
            .iter()
            .any(|tileset| assets.get_if_loaded(self.sheet_key_for(tileset)).is_some());
        if !any_sheet {
            self.render_reference_grid();
            return;
        }

        let tile_size = map.tilewidth as f32;
        for (index, layer) in map.layers.iter().enumerate() {
            if Some(index) == self.collision_layer || !layer.visible || layer.data.is_empty() {
                continue;
            }
            for y in 0..layer.height {
                for x in 0..layer.width {
                    let gid = layer.gid_at(x, y);
                    if gid == 0 {
                        continue;
                    }
                    let Some(tileset) = map.tileset_for_gid(gid) else {
                        continue;
                    };
                    // A sheet that never loaded skips its tiles only.
                    let Some(sheet) = assets.get_if_loaded(self.sheet_key_for(tileset)) else {
                        continue;
                    };
                    let (source_x, source_y) = tileset.source_offset(gid);
                    assets.extract(
                        &sheet,
                        source_x,
                        source_y,
                        x as f32 * tile_size,
                        y as f32 * map.tileheight as f32,
                        tile_size,
                    );
                }
            }
        }
    }

    fn render_default_grid(&self, assets: &AssetCache) {
        if assets.get_if_loaded(INTERIOR_SHEET_KEY).is_none() {
            self.render_reference_grid();
            return;
        }
        let size = self.config.tile_size as f32;
        for tile in &self.tiles {
            let dest_x = tile.x as f32 * size;
            let dest_y = tile.y as f32 * size;
            // Floor first so edge walls draw over it.
            for tile_ref in [&tile.floor, &tile.wall].into_iter().flatten() {
                if let Some(sheet) = assets.get_if_loaded(&tile_ref.sheet_key) {
                    assets.extract(&sheet, tile_ref.source_x, tile_ref.source_y, dest_x, dest_y, size);
                }
            }
        }
    }

    /// Plain line grid over the background, for when sheets are absent.
    fn render_reference_grid(&self) {
        let (width, height) = self.bounds();
        let step = self.config.tile_size.max(1) as f32;
        let mut x = 0.0;
        while x <= width {
            draw_line(x, 0.0, x, height, GRID_LINE_WIDTH, self.grid_color);
            x += step;
        }
        let mut y = 0.0;
        while y <= height {
            draw_line(0.0, y, width, y, GRID_LINE_WIDTH, self.grid_color);
            y += step;
        }
    }
}

/// Floor everywhere, a wall ring around the perimeter.
fn build_default_grid(tiles_x: u32, tiles_y: u32) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for y in 0..tiles_y {
        for x in 0..tiles_x {
            let edge = x == 0 || y == 0 || x == tiles_x - 1 || y == tiles_y - 1;
            tiles.push(Tile {
                x,
                y,
                floor: Some(TileRef::interior(TileKind::Floor, FLOOR_SOURCE)),
                wall: edge.then(|| TileRef::interior(TileKind::Wall, WALL_SOURCE)),
            });
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collision_map() -> TiledMap {
        TiledMap::from_json(
            r#"{
                "width": 4, "height": 4, "tilewidth": 48, "tileheight": 48,
                "layers": [
                    {"name": "Ground", "width": 4, "height": 4,
                     "data": [1,1,1,1, 1,1,1,1, 1,1,1,1, 1,1,1,1]},
                    {"name": "Collision", "width": 4, "height": 4, "visible": false,
                     "data": [1,0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,1]}
                ],
                "tilesets": [{"firstgid": 1, "name": "room_builder", "tilewidth": 48,
                              "tileheight": 48, "tilecount": 16, "columns": 4}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_world_derives_grid_from_config() {
        let world = World::new(WorldConfig::default());
        assert_eq!(world.tiles_x(), 16);
        assert_eq!(world.tiles_y(), 12);
        assert_eq!(world.bounds(), (768.0, 576.0));
        assert!(!world.has_map());
    }

    #[test]
    fn test_config_validity() {
        assert!(WorldConfig::default().is_valid());
        assert!(!WorldConfig { width: 768, height: 576, tile_size: 0 }.is_valid());
        assert!(!WorldConfig { width: 100, height: 576, tile_size: 48 }.is_valid());
    }

    #[test]
    fn test_default_grid_is_floor_with_wall_ring() {
        let world = World::new(WorldConfig::default());

        for y in 0..world.tiles_y() {
            for x in 0..world.tiles_x() {
                let tile = world.tile_at(x, y).unwrap();
                let floor = tile.floor.as_ref().unwrap();
                assert_eq!(floor.kind, TileKind::Floor);
                assert!(!floor.is_solid());

                let edge = x == 0 || y == 0 || x == 15 || y == 11;
                assert_eq!(tile.wall.is_some(), edge, "wall at ({}, {})", x, y);
                if let Some(wall) = &tile.wall {
                    assert_eq!(wall.kind, TileKind::Wall);
                    assert!(wall.is_solid());
                }
            }
        }
    }

    #[test]
    fn test_tiny_world_is_all_perimeter() {
        // 96x96 at 48px tiles is a 2x2 grid; every cell touches the edge.
        let world = World::new(WorldConfig {
            width: 96,
            height: 96,
            tile_size: 48,
        });
        assert_eq!(world.tiles_x(), 2);
        assert_eq!(world.tiles_y(), 2);
        for y in 0..2 {
            for x in 0..2 {
                assert!(world.tile_at(x, y).unwrap().wall.is_some());
            }
        }
    }

    #[test]
    fn test_solid_override_beats_kind_default() {
        let mut tile_ref = TileRef::interior(TileKind::Wall, (0.0, 0.0));
        assert!(tile_ref.is_solid());
        tile_ref.solid = Some(false);
        assert!(!tile_ref.is_solid());

        let mut floor = TileRef::interior(TileKind::Floor, (0.0, 0.0));
        floor.solid = Some(true);
        assert!(floor.is_solid());

        assert!(TileRef::interior(TileKind::Furniture, (0.0, 0.0)).is_solid());
        assert!(!TileRef::interior(TileKind::Decoration, (0.0, 0.0)).is_solid());
    }

    #[test]
    fn test_collision_answers_walkable_without_a_map() {
        let world = World::new(WorldConfig::default());
        // Generated walls are data, not collision.
        assert!(!world.is_collision(0, 0));
        assert!(!world.is_collision(8, 6));
    }

    #[test]
    fn test_collision_follows_the_map_layer() {
        let mut world = World::new(WorldConfig::default());
        world.install_map(collision_map());

        assert!(world.is_collision(0, 0));
        assert!(!world.is_collision(1, 0));
        assert!(!world.is_collision(2, 2));
        assert!(world.is_collision(3, 3));
    }

    #[test]
    fn test_collision_out_of_range_is_walkable() {
        let mut world = World::new(WorldConfig::default());
        world.install_map(collision_map());

        assert!(!world.is_collision(-1, 0));
        assert!(!world.is_collision(0, -1));
        assert!(!world.is_collision(4, 0));
        assert!(!world.is_collision(0, 4));
    }

    #[test]
    fn test_installed_map_takes_over_grid_and_bounds() {
        let mut world = World::new(WorldConfig::default());
        world.install_map(collision_map());

        assert!(world.has_map());
        assert_eq!(world.tiles_x(), 4);
        assert_eq!(world.tiles_y(), 4);
        assert_eq!(world.bounds(), (192.0, 192.0));
    }

    #[test]
    fn test_tile_at_is_superseded_by_an_installed_map() {
        let mut world = World::new(WorldConfig::default());
        let tile = world.tile_at(1, 1).unwrap();
        assert_eq!((tile.x, tile.y), (1, 1));

        // The 4x4 map replaces the 16x12 grid; cells indexed with the
        // map's stride would land on the wrong grid tile.
        world.install_map(collision_map());
        assert!(world.tile_at(1, 1).is_none());
        assert!(world.tile_at(0, 0).is_none());
        assert!(world.tile_at(5, 0).is_none());
    }

    #[test]
    fn test_bad_map_json_leaves_the_world_alone() {
        let mut world = World::new(WorldConfig::default());
        world.install_map(collision_map());

        // The parse step fails before anything is swapped in.
        assert!(TiledMap::from_json("{\"width\": \"oops\"}").is_err());
        assert!(world.is_collision(0, 0));
        assert_eq!(world.bounds(), (192.0, 192.0));
    }

    #[test]
    fn test_tileset_sheets_default_to_tileset_name() {
        let mut world = World::new(WorldConfig::default());
        let map = collision_map();
        let tileset = &map.tilesets[0];

        assert_eq!(world.sheet_key_for(tileset), "room_builder");
        world.map_tileset_sheet("room_builder", "interior_sheet");
        assert_eq!(world.sheet_key_for(tileset), "interior_sheet");
    }
}
