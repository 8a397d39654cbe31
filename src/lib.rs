//! 2D tile-world engine: a fixed game loop over a Tiled (or generated)
//! room, direct-controlled sprite characters, and a shared sprite-sheet
//! cache with single-flight loads.
//!
//! Everything below the `app` layer runs without a window; the host
//! owns the real clock and raw input and pumps both in each frame.

pub mod app;
pub mod assets;
pub mod character;
pub mod config;
pub mod engine;
pub mod input;
pub mod time;
pub mod world;

pub use assets::{AssetCache, AssetError};
pub use character::{Animation, Character, Direction};
pub use config::GameConfig;
pub use engine::{GameEngine, RunState};
pub use input::{KeyBindings, KeyboardState};
pub use time::Clock;
pub use world::{MapError, World, WorldConfig};
