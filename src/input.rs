//! Held-key table fed by the host, read by the engine

use std::collections::HashSet;

use macroquad::prelude::KeyCode;

use crate::character::Direction;

/// Which keys are currently held. The host pumps real key state in once
/// per frame; the engine core only ever reads this table, never the
/// window's event queue, so ticks can run without a window at all.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<KeyCode>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn is_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}

/// Movement bindings. Every listed key counts; holding any of them
/// drives the matching direction.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
}

impl Default for KeyBindings {
    /// WASD plus arrow keys.
    fn default() -> Self {
        Self {
            up: vec![KeyCode::W, KeyCode::Up],
            down: vec![KeyCode::S, KeyCode::Down],
            left: vec![KeyCode::A, KeyCode::Left],
            right: vec![KeyCode::D, KeyCode::Right],
        }
    }
}

impl KeyBindings {
    pub fn keys_for(&self, direction: Direction) -> &[KeyCode] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    /// True when any key bound to `direction` is held.
    pub fn direction_held(&self, keyboard: &KeyboardState, direction: Direction) -> bool {
        self.keys_for(direction).iter().any(|key| keyboard.is_down(*key))
    }

    /// Every bound key, for the host's per-frame pump.
    pub fn all_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.up
            .iter()
            .chain(&self.down)
            .chain(&self.left)
            .chain(&self.right)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.is_down(KeyCode::W));

        keyboard.press(KeyCode::W);
        assert!(keyboard.is_down(KeyCode::W));

        // Pressing twice then releasing once still releases.
        keyboard.press(KeyCode::W);
        keyboard.release(KeyCode::W);
        assert!(!keyboard.is_down(KeyCode::W));
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::A);
        keyboard.press(KeyCode::D);
        keyboard.clear();
        assert!(!keyboard.is_down(KeyCode::A));
        assert!(!keyboard.is_down(KeyCode::D));
    }

    #[test]
    fn test_either_bound_key_drives_direction() {
        let bindings = KeyBindings::default();
        let mut keyboard = KeyboardState::new();
        assert!(!bindings.direction_held(&keyboard, Direction::Up));

        keyboard.press(KeyCode::W);
        assert!(bindings.direction_held(&keyboard, Direction::Up));

        keyboard.release(KeyCode::W);
        keyboard.press(KeyCode::Up);
        assert!(bindings.direction_held(&keyboard, Direction::Up));
        assert!(!bindings.direction_held(&keyboard, Direction::Down));
    }

    #[test]
    fn test_all_keys_covers_every_binding() {
        let bindings = KeyBindings::default();
        let keys: Vec<KeyCode> = bindings.all_keys().collect();
        assert_eq!(keys.len(), 8);
        assert!(keys.contains(&KeyCode::W));
        assert!(keys.contains(&KeyCode::Right));
    }
}
