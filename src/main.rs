use std::rc::Rc;

use macroquad::prelude::*;

use pod_engine::app::{now_ms, run_frame, window_conf};
use pod_engine::assets::AssetCache;
use pod_engine::config::GameConfig;
use pod_engine::engine::GameEngine;
use pod_engine::world::WorldConfig;

const SETTINGS_PATH: &str = "pod.toml";

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let config = GameConfig::load(SETTINGS_PATH).await;
    if config.world != WorldConfig::default() {
        request_new_screen_size(config.world.width as f32, config.world.height as f32);
    }

    let assets = Rc::new(AssetCache::new());
    let mut engine = GameEngine::new(&config, Rc::clone(&assets));

    // Warm every sheet up front; anything that fails just renders as
    // the fallback grid until the file shows up on a later run.
    assets.preload(&config.preload_items()).await;

    if let Some(map_path) = &config.assets.map_path {
        if let Err(e) = engine.world_mut().load_tiled_map(map_path).await {
            log::warn!("{}; keeping the generated room", e);
        }
    }

    engine.start(now_ms());

    while run_frame(&mut engine) {
        next_frame().await;
    }
}
