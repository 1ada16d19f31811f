//! Texture-atlas upload seam and GPU setup schema.
//!
//! The render thread owns a single large 2-D texture holding every tile at
//! a fixed grid position. The streaming controller only needs to write a
//! decoded buffer into one sub-region, so the GPU side is reduced to the
//! [`TextureAtlas`] trait; the real implementation wraps the graphics API,
//! while tests record the calls.
//!
//! The vertex layout consts at the bottom are pure draw-setup data for the
//! fullscreen map quad. They are consumed once when the renderer builds its
//! vertex buffer and play no part in the streaming pipeline.

use crate::tile::TileCoord;
use std::mem;

/// Pixel format of an upload, derived from the decoded channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single-channel (grayscale) data.
    Gray,
    /// Three-channel RGB data.
    Rgb,
    /// Four-channel RGBA data.
    Rgba,
}

impl PixelFormat {
    /// Map a channel count to its upload format.
    ///
    /// # Panics
    ///
    /// Panics on any count other than 1, 3, or 4. Reaching this with an
    /// unsupported count means a decoder produced data the pipeline was
    /// never built to carry, which is a caller contract violation.
    pub fn from_channels(channels: u8) -> Self {
        match channels {
            1 => PixelFormat::Gray,
            3 => PixelFormat::Rgb,
            4 => PixelFormat::Rgba,
            other => panic!("unsupported channel count for atlas upload: {}", other),
        }
    }

    /// Number of channels this format carries.
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Rectangular sub-region of the atlas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRegion {
    /// Left edge of the region.
    pub x_offset: u32,
    /// Top edge of the region.
    pub y_offset: u32,
    /// Region width.
    pub width: u32,
    /// Region height.
    pub height: u32,
}

impl AtlasRegion {
    /// Region for a tile of `width` x `height` pixels at its grid slot.
    ///
    /// Tiles are laid out on a fixed grid: the pixel offset is the grid
    /// index scaled by the per-tile dimensions.
    pub fn for_tile(coord: TileCoord, width: u32, height: u32) -> Self {
        Self {
            x_offset: coord.x() * width,
            y_offset: coord.y() * height,
            width,
            height,
        }
    }
}

/// Destination for decoded tile pixels.
///
/// Implementations wrap the graphics API's sub-image upload and must only
/// ever be called from the thread owning the graphics context; the
/// streaming controller guarantees it invokes this solely from the drain
/// path, which runs on the render thread.
pub trait TextureAtlas {
    /// Write `pixels` into `region` of the atlas.
    ///
    /// `pixels` is tightly packed, `region.width * region.height *
    /// format.channels()` bytes.
    fn upload(&mut self, region: AtlasRegion, format: PixelFormat, pixels: &[u8]);
}

/// One vertex of the map quad: position, color, texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapVertex {
    /// Position in clip space.
    pub position: [f32; 3],
    /// Debug vertex color.
    pub color: [f32; 3],
    /// Atlas texture coordinate.
    pub uv: [f32; 2],
}

/// One entry of the vertex layout schema.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Shader attribute name.
    pub name: &'static str,
    /// Number of float components.
    pub components: usize,
    /// Byte offset within [`MapVertex`].
    pub offset: usize,
}

/// Declarative vertex layout, consumed once at renderer setup.
pub const MAP_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        name: "position",
        components: 3,
        offset: mem::offset_of!(MapVertex, position),
    },
    VertexAttribute {
        name: "color",
        components: 3,
        offset: mem::offset_of!(MapVertex, color),
    },
    VertexAttribute {
        name: "uv",
        components: 2,
        offset: mem::offset_of!(MapVertex, uv),
    },
];

/// Fullscreen quad the atlas is drawn with, as a triangle strip.
pub const MAP_QUAD: [MapVertex; 4] = [
    MapVertex {
        position: [-1.0, 1.0, 1.0],
        color: [1.0, 1.0, 0.0],
        uv: [0.0, 1.0],
    },
    MapVertex {
        position: [-1.0, -1.0, 1.0],
        color: [0.0, 0.0, 1.0],
        uv: [0.0, 0.0],
    },
    MapVertex {
        position: [1.0, 1.0, 1.0],
        color: [1.0, 0.0, 0.0],
        uv: [1.0, 1.0],
    },
    MapVertex {
        position: [1.0, -1.0, 1.0],
        color: [0.0, 1.0, 0.0],
        uv: [1.0, 0.0],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_channels() {
        assert_eq!(PixelFormat::from_channels(1), PixelFormat::Gray);
        assert_eq!(PixelFormat::from_channels(3), PixelFormat::Rgb);
        assert_eq!(PixelFormat::from_channels(4), PixelFormat::Rgba);
    }

    #[test]
    #[should_panic(expected = "unsupported channel count")]
    fn test_format_from_two_channels_panics() {
        let _ = PixelFormat::from_channels(2);
    }

    #[test]
    fn test_format_channels_round_trip() {
        for channels in [1u8, 3, 4] {
            assert_eq!(PixelFormat::from_channels(channels).channels(), channels);
        }
    }

    #[test]
    fn test_region_for_tile_scales_by_dimensions() {
        let region = AtlasRegion::for_tile(TileCoord::new(2, 3, 4), 256, 256);
        assert_eq!(region.x_offset, 512);
        assert_eq!(region.y_offset, 768);
        assert_eq!(region.width, 256);
        assert_eq!(region.height, 256);
    }

    #[test]
    fn test_region_for_origin_tile() {
        let region = AtlasRegion::for_tile(TileCoord::new(0, 0, 4), 256, 256);
        assert_eq!(region.x_offset, 0);
        assert_eq!(region.y_offset, 0);
    }

    #[test]
    fn test_vertex_attributes_cover_whole_vertex() {
        let total: usize = MAP_VERTEX_ATTRIBUTES
            .iter()
            .map(|a| a.components * mem::size_of::<f32>())
            .sum();
        assert_eq!(total, mem::size_of::<MapVertex>());
    }

    #[test]
    fn test_vertex_attribute_offsets_ascend() {
        assert_eq!(MAP_VERTEX_ATTRIBUTES[0].offset, 0);
        assert!(MAP_VERTEX_ATTRIBUTES[1].offset > MAP_VERTEX_ATTRIBUTES[0].offset);
        assert!(MAP_VERTEX_ATTRIBUTES[2].offset > MAP_VERTEX_ATTRIBUTES[1].offset);
    }

    #[test]
    fn test_quad_spans_clip_space() {
        let xs: Vec<f32> = MAP_QUAD.iter().map(|v| v.position[0]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        let uvs: Vec<[f32; 2]> = MAP_QUAD.iter().map(|v| v.uv).collect();
        assert!(uvs.contains(&[0.0, 0.0]) && uvs.contains(&[1.0, 1.0]));
    }
}
