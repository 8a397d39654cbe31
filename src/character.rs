//! Direct-controlled sprite characters

use macroquad::prelude::*;

use crate::assets::{self, AssetCache};
use crate::time::Clock;

/// Sprite footprint in pixels: one tile wide, two tiles tall.
pub const CHARACTER_WIDTH: f32 = 48.0;
pub const CHARACTER_HEIGHT: f32 = 96.0;

/// Facing direction. Premade sheets lay a row out as four blocks of six
/// frames, one block per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Movement resolution order for held keys.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Column offset of this direction's frame block within a sheet row.
    pub fn frame_offset(self) -> u32 {
        match self {
            Direction::Right => 0,
            Direction::Up => 6,
            Direction::Left => 12,
            Direction::Down => 18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Idle,
    Walk,
}

/// Sheet layout and pacing for one animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// Row in the sheet, counted in character heights.
    pub row: u32,
    pub frames: u32,
    /// Seconds each frame stays on screen.
    pub frame_time: f32,
}

/// Premade character sheet layout: idle on row 1, walk on row 2.
pub fn animation_config(animation: Animation) -> AnimationConfig {
    match animation {
        Animation::Idle => AnimationConfig {
            row: 1,
            frames: 6,
            frame_time: 0.1,
        },
        Animation::Walk => AnimationConfig {
            row: 2,
            frames: 6,
            frame_time: 0.2,
        },
    }
}

/// One character in the world: pixel position, facing, current
/// animation frame, and which cached sheet it draws from.
#[derive(Debug, Clone)]
pub struct Character {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub animation: Animation,
    pub frame_index: u32,
    frame_timer: f32,
    sprite_key: String,
    /// Pixels per second.
    speed: f32,
}

impl Character {
    pub fn new(sprite_key: impl Into<String>, speed: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            direction: Direction::default(),
            animation: Animation::Idle,
            frame_index: 0,
            frame_timer: 0.0,
            sprite_key: sprite_key.into(),
            speed,
        }
    }

    /// Character using premade sheet `number`, moving at
    /// `tiles_per_second` on a grid of `tile_size` pixels.
    pub fn with_number(number: u32, tiles_per_second: f32, tile_size: u32) -> Self {
        Self::new(
            assets::character_sprite_key(number),
            tiles_per_second * tile_size as f32,
        )
    }

    /// Character with a random premade sheet.
    pub fn random(tiles_per_second: f32, tile_size: u32) -> Self {
        Self::with_number(assets::random_character_number(), tiles_per_second, tile_size)
    }

    pub fn sprite_key(&self) -> &str {
        &self.sprite_key
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Switch animations, restarting the frame cycle. Setting the one
    /// already playing changes nothing.
    pub fn set_animation(&mut self, animation: Animation) {
        if self.animation != animation {
            self.animation = animation;
            self.frame_index = 0;
            self.frame_timer = 0.0;
        }
    }

    /// Advance the frame timer by `delta_ms`. Frames wrap around the
    /// animation's cycle; the timer resets on each advance.
    pub fn update(&mut self, delta_ms: f32) {
        self.frame_timer += delta_ms / 1000.0;
        let config = animation_config(self.animation);
        if self.frame_timer >= config.frame_time {
            self.frame_index = (self.frame_index + 1) % config.frames;
            self.frame_timer = 0.0;
        }
    }

    /// Step in `direction` at this character's speed for the frame the
    /// clock describes, clamped into `bounds` (world width, height in
    /// pixels). Also turns the character and starts the walk cycle.
    pub fn walk(&mut self, direction: Direction, clock: &Clock, bounds: (f32, f32)) {
        let distance = self.speed * clock.delta_seconds();
        let (width, height) = bounds;
        match direction {
            Direction::Up => self.y -= distance,
            Direction::Down => self.y += distance,
            Direction::Left => self.x -= distance,
            Direction::Right => self.x += distance,
        }
        self.x = self.x.min(width - CHARACTER_WIDTH).max(0.0);
        self.y = self.y.min(height - CHARACTER_HEIGHT).max(0.0);
        self.set_direction(direction);
        self.set_animation(Animation::Walk);
    }

    /// Back to the idle cycle; facing is kept.
    pub fn stop_moving(&mut self) {
        self.set_animation(Animation::Idle);
    }

    /// Source rectangle of the current frame within the sheet.
    pub fn sheet_source(&self) -> Rect {
        let config = animation_config(self.animation);
        let column = self.direction.frame_offset() + self.frame_index;
        Rect::new(
            column as f32 * CHARACTER_WIDTH,
            config.row as f32 * CHARACTER_HEIGHT,
            CHARACTER_WIDTH,
            CHARACTER_HEIGHT,
        )
    }

    /// Draw at the current position. Skipped silently while the sheet
    /// is still loading; the character pops in once it arrives.
    pub fn render(&self, assets: &AssetCache) {
        let Some(sheet) = assets.get_if_loaded(&self.sprite_key) else {
            return;
        };
        draw_texture_ex(
            &sheet,
            self.x,
            self.y,
            WHITE,
            DrawTextureParams {
                source: Some(self.sheet_source()),
                dest_size: Some(vec2(CHARACTER_WIDTH, CHARACTER_HEIGHT)),
                ..Default::default()
            },
        );
    }
}
