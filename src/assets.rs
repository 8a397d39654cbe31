//! Sprite-sheet cache with single-flight loads

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::join_all;
use macroquad::prelude::*;
use thiserror::Error;

/// How many premade character sheets ship with the asset pack.
pub const CHARACTER_POOL_SIZE: u32 = 20;

const CHARACTER_DIR: &str = "2_Characters/Character_Generator/0_Premade_Characters/48x48";

/// Cache key for premade character sheet `number` (1-based).
pub fn character_sprite_key(number: u32) -> String {
    format!("character_{:02}", number)
}

/// Image path for premade character sheet `number`, relative to the
/// asset base. Sheet files are numbered with two digits.
pub fn character_sprite_path(base_path: &str, number: u32) -> String {
    format!(
        "{}/{}/Premade_Character_48x48_{:02}.png",
        base_path, CHARACTER_DIR, number
    )
}

/// Random sheet number from the premade pool.
pub fn random_character_number() -> u32 {
    macroquad::rand::gen_range(1, CHARACTER_POOL_SIZE + 1)
}

/// Every sheet number in the premade pool.
pub fn character_pool() -> impl Iterator<Item = u32> {
    1..=CHARACTER_POOL_SIZE
}

/// Asset load failure. Cloneable so one failure can be handed to every
/// waiter of a shared load.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("failed to load sheet {path}: {message}")]
    Load { path: String, message: String },
}

/// What a caller asking for a key must do next.
enum Claim<S> {
    /// Already cached, here is the handle.
    Ready(S),
    /// Someone else is loading it, await this.
    Wait(LoadWaiter<S>),
    /// The caller claimed the load and must call `complete`.
    Load,
}

enum Slot<S> {
    InFlight(Rc<LoadCell<S>>),
    Ready(S),
}

enum CellState<S> {
    Pending { wakers: Vec<Waker> },
    Done(Result<S, AssetError>),
}

/// Shared completion cell for one in-flight load: a single producer
/// publishes the result, every waiter gets a clone of it.
struct LoadCell<S> {
    state: RefCell<CellState<S>>,
}

impl<S: Clone> LoadCell<S> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(CellState::Pending { wakers: Vec::new() }),
        })
    }

    fn complete(&self, result: Result<S, AssetError>) {
        let pending = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                CellState::Pending { wakers } => {
                    let pending = std::mem::take(wakers);
                    *state = CellState::Done(result);
                    pending
                }
                // First result wins; a late duplicate is dropped.
                CellState::Done(_) => Vec::new(),
            }
        };
        for waker in pending {
            waker.wake();
        }
    }
}

/// Future that resolves when the shared load it watches completes.
struct LoadWaiter<S> {
    cell: Rc<LoadCell<S>>,
}

impl<S: Clone> Future for LoadWaiter<S> {
    type Output = Result<S, AssetError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.cell.state.borrow_mut();
        match &mut *state {
            CellState::Pending { wakers } => {
                wakers.push(cx.waker().clone());
                Poll::Pending
            }
            CellState::Done(result) => Poll::Ready(result.clone()),
        }
    }
}

/// Single-flight bookkeeping, generic over the sheet handle so the
/// coalescing rules stay testable without a GPU context.
struct LoadTable<S> {
    slots: RefCell<HashMap<String, Slot<S>>>,
}

impl<S: Clone> LoadTable<S> {
    fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Decide what the caller must do for `key`. A `Claim::Load` answer
    /// marks the key in-flight; the caller owes a matching `complete`.
    fn claim(&self, key: &str) -> Claim<S> {
        let mut slots = self.slots.borrow_mut();
        match slots.get(key) {
            Some(Slot::Ready(sheet)) => Claim::Ready(sheet.clone()),
            Some(Slot::InFlight(cell)) => Claim::Wait(LoadWaiter {
                cell: Rc::clone(cell),
            }),
            None => {
                slots.insert(key.to_string(), Slot::InFlight(LoadCell::new()));
                Claim::Load
            }
        }
    }

    /// Publish the result of a claimed load. Success caches the handle;
    /// failure evicts the key so a later request retries. Every waiter
    /// is woken with the same outcome either way.
    fn complete(&self, key: &str, result: Result<S, AssetError>) {
        let cell = {
            let mut slots = self.slots.borrow_mut();
            match slots.remove(key) {
                Some(Slot::InFlight(cell)) => {
                    if let Ok(sheet) = &result {
                        slots.insert(key.to_string(), Slot::Ready(sheet.clone()));
                    }
                    cell
                }
                Some(other) => {
                    // Not ours to complete; put it back.
                    slots.insert(key.to_string(), other);
                    return;
                }
                None => return,
            }
        };
        cell.complete(result);
    }

    /// Non-suspending lookup: the handle if the load already finished.
    fn get(&self, key: &str) -> Option<S> {
        match self.slots.borrow().get(key) {
            Some(Slot::Ready(sheet)) => Some(sheet.clone()),
            _ => None,
        }
    }
}

/// Settles a claimed load if its loader goes away: dropping the guard
/// without `complete` publishes a cancellation failure, so waiters
/// unpark and the key is evicted for retry.
struct LoadGuard<'a, S: Clone> {
    table: &'a LoadTable<S>,
    key: String,
    path: String,
    armed: bool,
}

impl<'a, S: Clone> LoadGuard<'a, S> {
    fn new(table: &'a LoadTable<S>, key: &str, path: &str) -> Self {
        Self {
            table,
            key: key.to_string(),
            path: path.to_string(),
            armed: true,
        }
    }

    /// Publish the real result and disarm the drop path.
    fn complete(mut self, result: Result<S, AssetError>) {
        self.armed = false;
        self.table.complete(&self.key, result);
    }
}

impl<'a, S: Clone> Drop for LoadGuard<'a, S> {
    fn drop(&mut self) {
        if self.armed {
            self.table.complete(
                &self.key,
                Err(AssetError::Load {
                    path: self.path.clone(),
                    message: "load cancelled".to_string(),
                }),
            );
        }
    }
}

/// Process-wide sprite-sheet cache. The host constructs one and shares
/// it (behind `Rc`) with every engine instance; a sheet requested by
/// many callers is fetched from disk exactly once.
pub struct AssetCache {
    table: LoadTable<Texture2D>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            table: LoadTable::new(),
        }
    }

    /// Resolve `key` to a loaded sheet, fetching it from `path` if
    /// nobody has yet. Concurrent calls for the same key share one
    /// underlying fetch. Dropping the loading call mid-fetch settles
    /// the key with a cancellation failure and frees it for retry.
    pub async fn ensure_loaded(&self, key: &str, path: &str) -> Result<Texture2D, AssetError> {
        match self.table.claim(key) {
            Claim::Ready(sheet) => Ok(sheet),
            Claim::Wait(waiter) => waiter.await,
            Claim::Load => {
                let guard = LoadGuard::new(&self.table, key, path);
                let result = match load_texture(path).await {
                    Ok(texture) => {
                        texture.set_filter(FilterMode::Nearest);
                        log::info!("loaded sheet {} from {}", key, path);
                        Ok(texture)
                    }
                    Err(e) => Err(AssetError::Load {
                        path: path.to_string(),
                        message: e.to_string(),
                    }),
                };
                guard.complete(result.clone());
                result
            }
        }
    }

    /// Non-suspending lookup for the render path. `None` while the
    /// sheet is still loading (or failed); callers skip drawing.
    pub fn get_if_loaded(&self, key: &str) -> Option<Texture2D> {
        self.table.get(key)
    }

    /// Blit a square `size` x `size` region of a sheet onto the
    /// surface at native scale.
    pub fn extract(
        &self,
        sheet: &Texture2D,
        source_x: f32,
        source_y: f32,
        dest_x: f32,
        dest_y: f32,
        size: f32,
    ) {
        draw_texture_ex(
            sheet,
            dest_x,
            dest_y,
            WHITE,
            DrawTextureParams {
                source: Some(Rect::new(source_x, source_y, size, size)),
                dest_size: Some(vec2(size, size)),
                ..Default::default()
            },
        );
    }

    /// Warm the cache with `(key, path)` pairs. Failures are logged and
    /// never abort the sibling loads; rendering falls back per sheet.
    pub async fn preload(&self, items: &[(String, String)]) {
        let loads = items
            .iter()
            .map(|(key, path)| self.ensure_loaded(key, path));
        let mut failures: usize = 0;
        for result in join_all(loads).await {
            if let Err(e) = result {
                log::warn!("preload: {}", e);
                failures += 1;
            }
        }
        log::info!(
            "preloaded {} sheets ({} failed)",
            items.len() - failures,
            failures
        );
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}
