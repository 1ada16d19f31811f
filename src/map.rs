//! Map streaming controller.
//!
//! [`Map`] owns the tile set and the completion queue and orchestrates the
//! pipeline between them:
//!
//! ```text
//! request_load ──▶ job queue ──▶ decode workers ──▶ completion queue ──▶ drain_one ──▶ atlas
//!   (any thread)                 (pool threads)                         (render thread)
//! ```
//!
//! The tile set is fixed at construction; no tile is added or removed for
//! the controller's lifetime. Tiles cross threads only through the two
//! queues, and every mutation of a tile happens under its own lock.

use crate::atlas::{AtlasRegion, PixelFormat, TextureAtlas};
use crate::decode::Decoder;
use crate::pool::{Job, JobQueue};
use crate::queue::BoundedQueue;
use crate::tile::{Tile, TileInner, TileState};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A load request was rejected because the decode job queue is full.
///
/// Recoverable: the tile stays `Unloaded` and the caller may retry later.
#[derive(Debug, Clone, Copy, Error)]
#[error("decode job queue is full")]
pub struct Backpressure;

/// Outcome of one [`Map::drain_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// The completion queue was empty; nothing more is ready this frame.
    Empty,
    /// A tile was uploaded to the atlas and is now `Loaded`.
    Uploaded,
    /// A queued completion was superseded by a reload and skipped.
    Stale,
}

/// Configuration for [`Map`].
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Directory holding the `{z}/{x}/{y}.png` tile tree.
    pub root_dir: PathBuf,
    /// Completion queue capacity; defaults to the tile count.
    pub completion_capacity: Option<usize>,
}

impl MapConfig {
    /// Configuration for a tile tree rooted at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            completion_capacity: None,
        }
    }

    /// Override the completion queue capacity.
    ///
    /// A capacity of at least the tile count guarantees the workers'
    /// blocking completion pushes can never wedge the whole pool; smaller
    /// values remain live only while the render thread keeps draining.
    pub fn with_completion_capacity(mut self, capacity: usize) -> Self {
        self.completion_capacity = Some(capacity);
        self
    }
}

/// State shared between the controller, its decode jobs, and the drain path.
struct MapShared {
    root_dir: PathBuf,
    tiles: Vec<Arc<Tile>>,
    completed: BoundedQueue<Arc<Tile>>,
    jobs: Arc<dyn JobQueue>,
    decoder: Arc<dyn Decoder>,
}

/// Streams tiles from disk into the texture atlas.
pub struct Map {
    shared: Arc<MapShared>,
}

impl Map {
    /// Create a controller over a fixed tile set.
    ///
    /// `jobs` is the externally-owned worker pool the decode work is
    /// submitted to; `decoder` performs the actual image decode on those
    /// workers.
    pub fn new(
        config: MapConfig,
        tiles: Vec<Arc<Tile>>,
        jobs: Arc<dyn JobQueue>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        let capacity = config
            .completion_capacity
            .unwrap_or(tiles.len())
            .max(1);
        if capacity < tiles.len() {
            warn!(
                capacity,
                tiles = tiles.len(),
                "completion queue smaller than tile set; workers will stall when it fills"
            );
        }
        info!(
            root = %config.root_dir.display(),
            tiles = tiles.len(),
            completion_capacity = capacity,
            "map streaming controller ready"
        );
        Self {
            shared: Arc::new(MapShared {
                root_dir: config.root_dir,
                tiles,
                completed: BoundedQueue::new(capacity),
                jobs,
                decoder,
            }),
        }
    }

    /// The controller's tile set.
    pub fn tiles(&self) -> &[Arc<Tile>] {
        &self.shared.tiles
    }

    /// Request an asynchronous decode of `tile`.
    ///
    /// On success the tile moves to `InLoadQueue` and some worker thread
    /// will eventually decode it. On a saturated job queue the tile stays
    /// `Unloaded` and `Err(Backpressure)` is returned; retry later.
    ///
    /// # Panics
    ///
    /// Panics if the tile is not `Unloaded`: issuing a second request for
    /// an in-flight or already-loaded tile means the caller lost track of
    /// the state machine.
    pub fn request_load(&self, tile: &Arc<Tile>) -> Result<(), Backpressure> {
        let mut inner = tile.lock();
        assert_eq!(
            inner.state,
            TileState::Unloaded,
            "request_load on tile {} which is not Unloaded",
            tile.coord()
        );
        submit_decode(&self.shared, tile, &mut inner)
    }

    /// Re-fetch `tile`'s content, e.g. after the backing file changed.
    ///
    /// Idempotent under storms: if a decode is already in flight, this only
    /// marks the tile so the worker redoes the load once when it finishes,
    /// never queueing more than one additional job. In every other state
    /// the tile is reset to `Unloaded` (dropping any stale pixels) and
    /// re-requested immediately.
    pub fn reload(&self, tile: &Arc<Tile>) -> Result<(), Backpressure> {
        let mut inner = tile.lock();
        if inner.state == TileState::InLoadQueue {
            inner.reload_pending = true;
            return Ok(());
        }
        inner.state = TileState::Unloaded;
        inner.pixels = None;
        submit_decode(&self.shared, tile, &mut inner)
    }

    /// Upload at most one completed tile to `atlas`.
    ///
    /// Render thread only. Never blocks: an empty completion queue returns
    /// [`DrainStatus::Empty`] immediately, which is the caller's signal to
    /// stop its per-frame drain loop.
    pub fn drain_one(&self, atlas: &mut dyn TextureAtlas) -> DrainStatus {
        let Some(tile) = self.shared.completed.try_pop() else {
            return DrainStatus::Empty;
        };

        let mut inner = tile.lock();
        if inner.state != TileState::InLoadedQueue {
            // A reload reset this tile after its decode completed; the
            // queued buffer no longer reflects what the caller wants.
            debug!(tile = %tile.coord(), state = ?inner.state, "skipping stale completion");
            return DrainStatus::Stale;
        }

        let buffer = inner
            .pixels
            .as_ref()
            .expect("tile in completion queue has no pixel buffer");
        let format = PixelFormat::from_channels(buffer.channels());
        let region = AtlasRegion::for_tile(tile.coord(), buffer.width(), buffer.height());
        atlas.upload(region, format, buffer.data());
        inner.state = TileState::Loaded;
        debug!(tile = %tile.coord(), "tile uploaded to atlas");
        DrainStatus::Uploaded
    }

    /// Drain everything currently ready, returning the number uploaded.
    ///
    /// Bounded by "whatever is ready now": tiles completing while this
    /// loop runs are picked up, but the loop never waits on decode latency.
    pub fn drain_completed(&self, atlas: &mut dyn TextureAtlas) -> usize {
        let mut uploaded = 0;
        loop {
            match self.drain_one(atlas) {
                DrainStatus::Empty => return uploaded,
                DrainStatus::Uploaded => uploaded += 1,
                DrainStatus::Stale => {}
            }
        }
    }

    /// Request every currently-`Unloaded` tile, tolerating backpressure.
    ///
    /// Returns the number of accepted requests; rejected tiles stay
    /// `Unloaded` and can be retried on a later call.
    pub fn load_all(&self) -> usize {
        let mut accepted = 0;
        for tile in &self.shared.tiles {
            let mut inner = tile.lock();
            if inner.state != TileState::Unloaded {
                continue;
            }
            if submit_decode(&self.shared, tile, &mut inner).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }
}

/// Move `tile` into `InLoadQueue` and hand a decode job to the pool.
///
/// Called with the tile lock held. The state change is optimistic and
/// rolled back if the job queue rejects the push.
fn submit_decode(
    shared: &Arc<MapShared>,
    tile: &Arc<Tile>,
    inner: &mut TileInner,
) -> Result<(), Backpressure> {
    inner.state = TileState::InLoadQueue;
    let job = decode_job(shared, tile);
    match shared.jobs.submit(job) {
        Ok(()) => Ok(()),
        Err(_rejected) => {
            inner.state = TileState::Unloaded;
            debug!(tile = %tile.coord(), "decode request rejected, job queue full");
            Err(Backpressure)
        }
    }
}

fn decode_job(shared: &Arc<MapShared>, tile: &Arc<Tile>) -> Job {
    let shared = Arc::clone(shared);
    let tile = Arc::clone(tile);
    Job::new("tile_decode", move || run_decode(&shared, &tile))
}

/// Decode worker body, executed on a pool thread.
///
/// Holds the tile lock for the whole decode so state, buffer, and the
/// pending-reload flag change as one unit. Errors are signalled purely
/// through tile state; the pool fires and forgets. Must never touch the
/// GPU.
fn run_decode(shared: &Arc<MapShared>, tile: &Arc<Tile>) {
    let mut inner = tile.lock();

    // Free any buffer left over from a previous decode of this tile.
    inner.pixels = None;

    let path = tile.coord().path(&shared.root_dir);
    let result = shared.decoder.decode(&path);

    if inner.reload_pending {
        // The caller asked for fresh content while this decode ran; the
        // result (success or not) is already out of date. Redo the load
        // once with current parameters.
        inner.reload_pending = false;
        inner.state = TileState::Unloaded;
        if submit_decode(shared, tile, &mut inner).is_err() {
            warn!(tile = %tile.coord(), "pending reload dropped, job queue full");
        }
        return;
    }

    match result {
        Ok(buffer) => {
            // Blocking push: a successfully decoded tile must never be
            // silently dropped. The render thread's draining is what frees
            // space here.
            shared.completed.push(Arc::clone(tile));
            inner.pixels = Some(buffer);
            inner.state = TileState::InLoadedQueue;
        }
        Err(err) => {
            warn!(tile = %tile.coord(), error = %err, "tile decode failed");
            inner.state = TileState::Unloaded;
        }
    }
}
