//! Tile identity, state, and pixel storage.
//!
//! A [`Tile`] is one addressable unit of the map pyramid. Its coordinate is
//! fixed at creation; everything mutable (state, decoded pixels, the
//! pending-reload flag) lives behind a single mutex so the state machine
//! and buffer ownership are always observed consistently.
//!
//! # State machine
//!
//! ```text
//! Unloaded ──request_load──▶ InLoadQueue ──decode ok──▶ InLoadedQueue ──upload──▶ Loaded
//!     ▲                          │
//!     └────────decode failed─────┘        (reload re-enters at Unloaded)
//! ```

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Position of a tile in the slippy-map pyramid.
///
/// `x` and `y` are grid indices within zoom level `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    x: u32,
    y: u32,
    z: u8,
}

impl TileCoord {
    /// Create a coordinate at grid position `(x, y)` of zoom level `z`.
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Grid column.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Grid row.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Zoom level.
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Path of this tile's image under `root`.
    ///
    /// The layout is `{root}/{z}/{x}/{y}.png`, matching how slippy-map tile
    /// sets are stored on disk. Existing datasets depend on this shape
    /// exactly, so it must not change.
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.png", self.y))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Where a tile currently sits in the streaming pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// No valid pixel buffer; eligible for a decode request.
    Unloaded,
    /// A decode job is in flight; no second request may be issued.
    InLoadQueue,
    /// Decode finished; the tile sits in the completion queue awaiting upload.
    InLoadedQueue,
    /// Pixels have been uploaded to the GPU; the tile is render-ready.
    Loaded,
}

/// Owned block of decoded pixels with its dimensions.
///
/// The buffer moves between the decode worker and the render thread as a
/// value inside the tile lock, so exactly one side can touch it at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl PixelBuffer {
    /// Wrap decoded pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly `width * height * channels` bytes;
    /// a mismatch means the decoder broke its contract.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        let expected = width as usize * height as usize * channels as usize;
        assert_eq!(
            data.len(),
            expected,
            "pixel buffer is {} bytes, expected {}x{}x{} = {}",
            data.len(),
            width,
            height,
            channels,
            expected
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Raw pixel bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of channels per pixel.
    pub fn channels(&self) -> u8 {
        self.channels
    }
}

/// Mutable tile fields, guarded as one unit by the tile mutex.
///
/// Invariant: `pixels` is `Some` iff `state` is `InLoadedQueue` or
/// `Loaded`, except transiently inside the decode worker while it holds
/// the lock.
pub(crate) struct TileInner {
    pub(crate) state: TileState,
    pub(crate) pixels: Option<PixelBuffer>,
    /// Set by `reload` while a decode is in flight; the worker re-checks it
    /// on completion and redoes the load instead of publishing a stale result.
    pub(crate) reload_pending: bool,
}

/// One addressable tile of the visible pyramid level.
pub struct Tile {
    coord: TileCoord,
    inner: Mutex<TileInner>,
}

impl Tile {
    /// Create an unloaded tile at `coord`.
    pub fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            inner: Mutex::new(TileInner {
                state: TileState::Unloaded,
                pixels: None,
                reload_pending: false,
            }),
        }
    }

    /// The tile's fixed pyramid coordinate.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Snapshot of the tile's current state.
    pub fn state(&self) -> TileState {
        self.inner.lock().state
    }

    /// Whether a decoded buffer is currently present.
    pub fn has_pixels(&self) -> bool {
        self.inner.lock().pixels.is_some()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TileInner> {
        self.inner.lock()
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("coord", &self.coord)
            .field("state", &self.state())
            .finish()
    }
}

/// Build a `cols x rows` grid of unloaded tiles at zoom level `zoom`.
///
/// Convenience for the common case where the visible pyramid level is a
/// full rectangle starting at the origin.
pub fn tile_grid(cols: u32, rows: u32, zoom: u8) -> Vec<Arc<Tile>> {
    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for x in 0..cols {
        for y in 0..rows {
            tiles.push(Arc::new(Tile::new(TileCoord::new(x, y, zoom))));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_accessors() {
        let coord = TileCoord::new(2, 3, 4);
        assert_eq!(coord.x(), 2);
        assert_eq!(coord.y(), 3);
        assert_eq!(coord.z(), 4);
    }

    #[test]
    fn test_coord_path_layout() {
        let coord = TileCoord::new(2, 3, 4);
        let path = coord.path(Path::new("/data"));
        assert_eq!(path, PathBuf::from("/data/4/2/3.png"));
    }

    #[test]
    fn test_coord_display() {
        let coord = TileCoord::new(12, 7, 9);
        assert_eq!(coord.to_string(), "9/12/7");
    }

    #[test]
    fn test_coord_hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(TileCoord::new(1, 2, 3));
        set.insert(TileCoord::new(1, 2, 3));
        set.insert(TileCoord::new(2, 1, 3));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_new_tile_is_unloaded() {
        let tile = Tile::new(TileCoord::new(0, 0, 1));
        assert_eq!(tile.state(), TileState::Unloaded);
        assert!(!tile.has_pixels());
    }

    #[test]
    fn test_pixel_buffer_accessors() {
        let buffer = PixelBuffer::new(vec![0u8; 2 * 2 * 4], 2, 2, 4);
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.channels(), 4);
        assert_eq!(buffer.data().len(), 16);
    }

    #[test]
    #[should_panic(expected = "pixel buffer is")]
    fn test_pixel_buffer_length_mismatch_panics() {
        let _ = PixelBuffer::new(vec![0u8; 5], 2, 2, 4);
    }

    #[test]
    fn test_tile_grid_covers_every_cell() {
        let tiles = tile_grid(3, 2, 5);
        assert_eq!(tiles.len(), 6);
        let coords: Vec<_> = tiles.iter().map(|t| t.coord()).collect();
        for x in 0..3 {
            for y in 0..2 {
                assert!(coords.contains(&TileCoord::new(x, y, 5)));
            }
        }
        assert!(tiles.iter().all(|t| t.state() == TileState::Unloaded));
    }

    #[test]
    fn test_tile_debug_includes_state() {
        let tile = Tile::new(TileCoord::new(1, 1, 1));
        let debug = format!("{:?}", tile);
        assert!(debug.contains("Unloaded"));
    }
}
