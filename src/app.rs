//! Host glue: window settings and the per-frame pump

use macroquad::prelude::*;

use crate::engine::{GameEngine, RunState};
use crate::world::WorldConfig;

/// Window sized to the default room. A settings file that changes the
/// room size resizes right after startup.
pub fn window_conf() -> Conf {
    let world = WorldConfig::default();
    Conf {
        window_title: "Pod".to_string(),
        window_width: world.width as i32,
        window_height: world.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

/// Wall-clock timestamp in the engine's time base (milliseconds).
pub fn now_ms() -> f64 {
    get_time() * 1000.0
}

/// One frame of the demo: controls, key pump, state tick, draw.
/// Returns false once the engine has stopped and the loop should end.
///
/// Controls: F3 toggles the debug overlay, P pauses/resumes, N spawns
/// a character, Escape quits.
pub fn run_frame(engine: &mut GameEngine) -> bool {
    if is_key_pressed(KeyCode::F3) {
        engine.toggle_debug();
    }
    if is_key_pressed(KeyCode::P) {
        match engine.run_state() {
            RunState::Running => engine.pause(),
            RunState::Paused => engine.start(now_ms()),
            RunState::Stopped => {}
        }
    }
    if is_key_pressed(KeyCode::N) {
        engine.create_random_character();
    }
    if is_key_pressed(KeyCode::Escape) {
        engine.stop();
    }

    pump_keyboard(engine);

    engine.tick(now_ms());
    // Paused frames re-render the frozen state; skipping the draw
    // would flicker between stale swapchain buffers.
    engine.draw();

    !engine.is_stopped()
}

fn pump_keyboard(engine: &mut GameEngine) {
    let keys: Vec<KeyCode> = engine.bindings().all_keys().collect();
    for key in keys {
        if is_key_down(key) {
            engine.keyboard_mut().press(key);
        } else {
            engine.keyboard_mut().release(key);
        }
    }
}
