//! Game loop core: run state, per-frame state step, render step

use std::rc::Rc;

use macroquad::prelude::*;
use macroquad::rand::gen_range;

use crate::assets::{self, AssetCache};
use crate::character::{Character, Direction, CHARACTER_HEIGHT, CHARACTER_WIDTH};
use crate::config::GameConfig;
use crate::input::{KeyBindings, KeyboardState};
use crate::time::Clock;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// The engine: owns the world, the character registry, input state and
/// the clock. A frame is split in two so state can advance without a
/// window: `tick` takes a timestamp and mutates, `draw` only reads.
pub struct GameEngine {
    world: World,
    assets: Rc<AssetCache>,
    players: Vec<Character>,
    keyboard: KeyboardState,
    bindings: KeyBindings,
    clock: Clock,
    run_state: RunState,
    last_time_ms: f64,
    fps: i32,
    frame_count: u64,
    debug_mode: bool,
    tiles_per_second: f32,
}

impl GameEngine {
    /// Build an engine over a shared sheet cache and spawn the default
    /// character in the middle of the room.
    pub fn new(config: &GameConfig, assets: Rc<AssetCache>) -> Self {
        let mut world = World::new(config.world);
        for (tileset, sheet) in &config.tileset_sheets {
            world.map_tileset_sheet(tileset.clone(), sheet.clone());
        }

        let mut engine = Self {
            world,
            assets,
            players: Vec::new(),
            keyboard: KeyboardState::new(),
            bindings: KeyBindings::default(),
            clock: Clock::new(),
            run_state: RunState::Stopped,
            last_time_ms: 0.0,
            fps: 0,
            frame_count: 0,
            debug_mode: true,
            tiles_per_second: config.movement.tiles_per_second,
        };
        engine.spawn_default_character();
        engine
    }

    fn spawn_default_character(&mut self) {
        let (width, height) = self.world.bounds();
        let mut character = Character::random(self.tiles_per_second, self.world.tile_size());
        character.set_position(
            width / 2.0 - CHARACTER_WIDTH / 2.0,
            height / 2.0 - CHARACTER_HEIGHT / 2.0,
        );
        self.players.push(character);
    }

    /// Spawn an extra character using premade sheet `number`, at a
    /// random spot inside the bounds.
    pub fn create_character(&mut self, number: u32) -> &mut Character {
        let (width, height) = self.world.bounds();
        let mut character = Character::with_number(number, self.tiles_per_second, self.world.tile_size());
        character.set_position(
            gen_range(0.0, (width - CHARACTER_WIDTH).max(0.0)),
            gen_range(0.0, (height - CHARACTER_HEIGHT).max(0.0)),
        );
        self.players.push(character);
        let index = self.players.len() - 1;
        &mut self.players[index]
    }

    pub fn create_random_character(&mut self) -> &mut Character {
        self.create_character(assets::random_character_number())
    }

    /// Begin (or resume) the loop. The timestamp becomes the new delta
    /// baseline so paused time never turns into one giant step. Calling
    /// this while already running changes nothing.
    pub fn start(&mut self, now_ms: f64) {
        if self.run_state == RunState::Running {
            return;
        }
        self.run_state = RunState::Running;
        self.last_time_ms = now_ms;
    }

    /// Freeze state between frames. Only a running engine can pause.
    pub fn pause(&mut self) {
        if self.run_state == RunState::Running {
            self.run_state = RunState::Paused;
        }
    }

    /// End the loop for good (until a fresh `start`). Safe to call any
    /// number of times from any state.
    pub fn stop(&mut self) {
        self.run_state = RunState::Stopped;
    }

    /// State half of a frame. Returns whether state advanced; a paused
    /// or stopped engine does nothing and touches nothing.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        let delta_ms = ((now_ms - self.last_time_ms).max(0.0)) as f32;
        self.last_time_ms = now_ms;
        if delta_ms > 0.0 {
            self.fps = (1000.0 / delta_ms).round() as i32;
        }
        self.clock.set_delta_ms(delta_ms);

        self.resolve_movement();
        for character in &mut self.players {
            character.update(delta_ms);
        }
        self.frame_count += 1;
        true
    }

    /// Each held direction applies once per frame, in a fixed order, to
    /// every character; opposite directions cancel through the bounds
    /// clamp. No held direction sends everyone back to idle.
    fn resolve_movement(&mut self) {
        let bounds = self.world.bounds();
        let mut moving = false;
        for direction in Direction::ALL {
            if !self.bindings.direction_held(&self.keyboard, direction) {
                continue;
            }
            moving = true;
            for character in &mut self.players {
                character.walk(direction, &self.clock, bounds);
            }
        }
        if !moving {
            for character in &mut self.players {
                character.stop_moving();
            }
        }
    }

    /// Render half of a frame: room, characters, debug overlay.
    pub fn draw(&self) {
        self.world.render(&self.assets);
        for character in &self.players {
            character.render(&self.assets);
        }
        if self.debug_mode {
            draw_text(&format!("FPS: {}", self.fps), 10.0, 20.0, 14.0, WHITE);
            draw_text(
                &format!("Players: {}", self.players.len()),
                10.0,
                40.0,
                14.0,
                WHITE,
            );
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn players(&self) -> &[Character] {
        &self.players
    }

    /// The registry itself; removing a character from it destroys the
    /// character.
    pub fn players_mut(&mut self) -> &mut Vec<Character> {
        &mut self.players
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.run_state == RunState::Stopped
    }

    pub fn fps(&self) -> i32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn toggle_debug(&mut self) {
        self.debug_mode = !self.debug_mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Animation;

    fn test_engine() -> GameEngine {
        GameEngine::new(&GameConfig::default(), Rc::new(AssetCache::new()))
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {} to be close to {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_new_engine_has_one_centered_character() {
        let engine = test_engine();
        assert_eq!(engine.players().len(), 1);
        assert_eq!(engine.run_state(), RunState::Stopped);
        assert_eq!(engine.frame_count(), 0);

        let character = &engine.players()[0];
        assert_eq!(character.x, 768.0 / 2.0 - CHARACTER_WIDTH / 2.0);
        assert_eq!(character.y, 576.0 / 2.0 - CHARACTER_HEIGHT / 2.0);
        assert_eq!(character.animation, Animation::Idle);
    }

    #[test]
    fn test_tick_only_advances_while_running() {
        let mut engine = test_engine();
        assert!(!engine.tick(16.0));
        assert_eq!(engine.frame_count(), 0);

        engine.start(0.0);
        assert!(engine.tick(16.0));
        assert_eq!(engine.frame_count(), 1);
        assert_eq!(engine.clock().delta_ms(), 16.0);
    }

    #[test]
    fn test_start_while_running_keeps_the_baseline() {
        let mut engine = test_engine();
        engine.start(0.0);
        engine.tick(16.0);

        // A redundant start must not reset the delta baseline.
        engine.start(1000.0);
        engine.tick(32.0);
        assert_eq!(engine.clock().delta_ms(), 16.0);
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let mut engine = test_engine();
        engine.keyboard_mut().press(KeyCode::D);
        engine.start(0.0);
        engine.tick(100.0);

        let x_before = engine.players()[0].x;
        let frames_before = engine.frame_count();
        engine.pause();

        assert!(!engine.tick(200.0));
        assert!(!engine.tick(300.0));
        assert_eq!(engine.players()[0].x, x_before);
        assert_eq!(engine.frame_count(), frames_before);

        // Resuming rebases time; the pause gap is not replayed.
        engine.start(400.0);
        assert!(engine.tick(500.0));
        assert_eq!(engine.clock().delta_ms(), 100.0);
        assert!(engine.players()[0].x > x_before);
    }

    #[test]
    fn test_pause_only_leaves_running() {
        let mut engine = test_engine();
        engine.pause();
        assert_eq!(engine.run_state(), RunState::Stopped);

        engine.start(0.0);
        engine.pause();
        assert_eq!(engine.run_state(), RunState::Paused);

        engine.stop();
        engine.stop();
        assert_eq!(engine.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_held_direction_moves_every_character() {
        let mut engine = test_engine();
        engine.create_character(2);
        let starts: Vec<f32> = engine.players().iter().map(|c| c.x).collect();

        engine.keyboard_mut().press(KeyCode::D);
        engine.start(0.0);
        engine.tick(100.0);

        // 2 tiles/s on 48px tiles for 100ms = 9.6px.
        for (character, start_x) in engine.players().iter().zip(starts) {
            assert_close(character.x, (start_x + 9.6).min(768.0 - CHARACTER_WIDTH));
            assert_eq!(character.animation, Animation::Walk);
            assert_eq!(character.direction, Direction::Right);
        }
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut engine = test_engine();
        engine.keyboard_mut().press(KeyCode::A);
        engine.keyboard_mut().press(KeyCode::D);
        engine.start(0.0);
        engine.tick(100.0);

        let character = &engine.players()[0];
        assert_close(character.x, 768.0 / 2.0 - CHARACTER_WIDTH / 2.0);
        // Both applied: the character still entered the walk cycle.
        assert_eq!(character.animation, Animation::Walk);
    }

    #[test]
    fn test_releasing_keys_idles_characters() {
        let mut engine = test_engine();
        engine.keyboard_mut().press(KeyCode::W);
        engine.start(0.0);
        engine.tick(16.0);
        assert_eq!(engine.players()[0].animation, Animation::Walk);
        assert_eq!(engine.players()[0].direction, Direction::Up);

        engine.keyboard_mut().release(KeyCode::W);
        engine.tick(32.0);
        assert_eq!(engine.players()[0].animation, Animation::Idle);
        assert_eq!(engine.players()[0].direction, Direction::Up);
    }

    #[test]
    fn test_long_hold_clamps_at_the_wall() {
        let mut engine = test_engine();
        engine.keyboard_mut().press(KeyCode::S);
        engine.keyboard_mut().press(KeyCode::D);
        engine.start(0.0);
        for frame in 1..=200 {
            engine.tick(frame as f64 * 100.0);
        }

        let character = &engine.players()[0];
        assert_eq!(character.x, 768.0 - CHARACTER_WIDTH);
        assert_eq!(character.y, 576.0 - CHARACTER_HEIGHT);
    }

    #[test]
    fn test_create_character_spawns_in_bounds() {
        let mut engine = test_engine();
        let character = engine.create_character(5);
        assert_eq!(character.sprite_key(), "character_05");

        assert_eq!(engine.players().len(), 2);
        let character = &engine.players()[1];
        assert!(character.x >= 0.0 && character.x <= 768.0 - CHARACTER_WIDTH);
        assert!(character.y >= 0.0 && character.y <= 576.0 - CHARACTER_HEIGHT);
    }

    #[test]
    fn test_removing_from_the_registry_drops_the_character() {
        let mut engine = test_engine();
        engine.create_character(3);
        assert_eq!(engine.players().len(), 2);

        engine.players_mut().pop();
        assert_eq!(engine.players().len(), 1);
    }

    #[test]
    fn test_fps_follows_the_frame_delta() {
        let mut engine = test_engine();
        engine.start(0.0);
        engine.tick(100.0);
        assert_eq!(engine.fps(), 10);

        engine.tick(116.0);
        assert_eq!(engine.fps(), 63);
    }

    #[test]
    fn test_debug_toggle() {
        let mut engine = test_engine();
        assert!(engine.debug_mode());
        engine.toggle_debug();
        assert!(!engine.debug_mode());
        engine.toggle_debug();
        assert!(engine.debug_mode());
    }
}
