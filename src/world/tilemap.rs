//! Serde model of a Tiled JSON map export

use serde::Deserialize;

/// A Tiled map document: orthogonal, CSV-encoded tile layers.
#[derive(Debug, Clone, Deserialize)]
pub struct TiledMap {
    /// Size in tiles.
    pub width: u32,
    pub height: u32,
    /// Tile size in pixels.
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledLayer {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Flat row-major GIDs, 0 = empty. Non-tile layers leave it empty.
    #[serde(default)]
    pub data: Vec<u32>,
    /// Hidden layers keep their data but are not drawn. Absent in older
    /// exports, which means shown.
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

/// Custom property attached to a layer.
#[derive(Debug, Clone, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub property_type: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTileset {
    /// First global tile id this tileset owns.
    pub firstgid: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tilewidth: u32,
    #[serde(default)]
    pub tileheight: u32,
    #[serde(default)]
    pub tilecount: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default)]
    pub image: String,
}

fn default_columns() -> u32 {
    1
}

impl TiledMap {
    /// Parse a Tiled JSON export.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Index of the collision layer, if the map has one: the first
    /// layer named "collision" (any casing) or carrying a boolean
    /// `collision: true` property.
    pub fn collision_layer_index(&self) -> Option<usize> {
        self.layers.iter().position(TiledLayer::is_collision_layer)
    }

    /// The tileset owning `gid`: greatest `firstgid` at or below it.
    /// GID 0 (empty) belongs to no tileset.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&TiledTileset> {
        self.tilesets
            .iter()
            .filter(|tileset| tileset.firstgid <= gid)
            .max_by_key(|tileset| tileset.firstgid)
    }
}

impl TiledLayer {
    pub fn is_collision_layer(&self) -> bool {
        self.name.eq_ignore_ascii_case("collision")
            || self.bool_property("collision").unwrap_or(false)
    }

    /// Boolean custom property by name.
    pub fn bool_property(&self, name: &str) -> Option<bool> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_bool())
    }

    /// GID at a cell of this layer; 0 for empty or out of range.
    pub fn gid_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or(0)
    }
}

impl TiledTileset {
    /// Pixel offset of `gid`'s tile within this tileset's sheet.
    pub fn source_offset(&self, gid: u32) -> (f32, f32) {
        let local = gid - self.firstgid;
        let columns = self.columns.max(1);
        let column = local % columns;
        let row = local / columns;
        (
            column as f32 * self.tilewidth as f32,
            row as f32 * self.tileheight as f32,
        )
    }
}
