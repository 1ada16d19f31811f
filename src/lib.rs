//! TileStream - streams tiled map imagery into a GPU texture atlas.
//!
//! This library keeps a slippy-map pyramid of `z/x/y` image tiles flowing
//! from disk into a texture atlas without ever blocking the render loop:
//! decodes run on a worker pool, uploads happen only on the render thread,
//! and a per-tile state machine keeps the two sides consistent.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  request_load   ┌───────────────┐   decode    ┌──────────────────┐
//! │     Map      │ ──────────────▶ │   job queue   │ ──────────▶ │  worker threads  │
//! │  controller  │  (non-blocking) │  (JobQueue)   │             │  (Decoder)       │
//! └──────────────┘                 └───────────────┘             └──────────────────┘
//!        ▲                                                                │
//!        │ drain_one (render thread)                                      │ blocking push
//!        │                                                                ▼
//! ┌──────────────┐    try_pop      ┌─────────────────────────────────────────┐
//! │ TextureAtlas │ ◀────────────── │            completion queue             │
//! │   (upload)   │                 │        (BoundedQueue<Arc<Tile>>)        │
//! └──────────────┘                 └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tilestream::map::{Map, MapConfig};
//! use tilestream::pool::{PoolConfig, ThreadPool};
//! use tilestream::decode::PngFileDecoder;
//! use tilestream::tile::tile_grid;
//! use std::sync::Arc;
//!
//! let pool = Arc::new(ThreadPool::new(PoolConfig::default()));
//! let map = Map::new(
//!     MapConfig::new("/data/tiles"),
//!     tile_grid(16, 16, 4),
//!     pool,
//!     Arc::new(PngFileDecoder::new()),
//! );
//! map.load_all();
//!
//! // Each frame, on the render thread:
//! // map.drain_completed(&mut atlas);
//! ```

pub mod atlas;
pub mod decode;
pub mod logging;
pub mod map;
pub mod pool;
pub mod queue;
pub mod tile;

/// Version of the TileStream library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
