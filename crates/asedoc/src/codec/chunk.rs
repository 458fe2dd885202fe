//! Magic numbers, chunk type codes and flag words of the wire format.

use bitflags::bitflags;

pub(super) const FILE_MAGIC: u16 = 0xA5E0;
pub(super) const FRAME_MAGIC: u16 = 0xF1FA;

/// The file header is a fixed 128 bytes, the frame header a fixed 16.
pub(super) const FILE_HEADER_LEN: u64 = 128;
pub(super) const FRAME_HEADER_LEN: u64 = 16;

/// `Size:DWORD` + `Type:WORD` framing every chunk.
pub(super) const CHUNK_HEADER_LEN: u64 = 6;

// Chunk type codes.
pub(super) const CHUNK_OLD_PALETTE_8BIT: u16 = 0x0004;
pub(super) const CHUNK_OLD_PALETTE_6BIT: u16 = 0x0011;
pub(super) const CHUNK_LAYER: u16 = 0x2004;
pub(super) const CHUNK_CEL: u16 = 0x2005;
pub(super) const CHUNK_CEL_EXTRA: u16 = 0x2006;
pub(super) const CHUNK_COLOR_PROFILE: u16 = 0x2007;
pub(super) const CHUNK_EXTERNAL_FILES: u16 = 0x2008;
pub(super) const CHUNK_TAGS: u16 = 0x2018;
pub(super) const CHUNK_PALETTE: u16 = 0x2019;
pub(super) const CHUNK_USER_DATA: u16 = 0x2020;
pub(super) const CHUNK_SLICE: u16 = 0x2022;
pub(super) const CHUNK_TILESET: u16 = 0x2023;

// Layer chunk `Type` field.
pub(super) const LAYER_TYPE_IMAGE: u16 = 0;
pub(super) const LAYER_TYPE_GROUP: u16 = 1;
pub(super) const LAYER_TYPE_TILEMAP: u16 = 2;

// Cel chunk `CelType` field.
pub(super) const CEL_TYPE_RAW: u16 = 0;
pub(super) const CEL_TYPE_LINKED: u16 = 1;
pub(super) const CEL_TYPE_COMPRESSED_IMAGE: u16 = 2;
pub(super) const CEL_TYPE_COMPRESSED_TILEMAP: u16 = 3;

/// Tilemap cels always use 32-bit cells.
pub(super) const BITS_PER_TILE: u16 = 32;

bitflags! {
    /// File header flags.
    #[derive(Debug, Clone, Copy)]
    pub(super) struct HeaderFlags: u32 {
        /// Per-layer opacity of image/tilemap layers is meaningful.
        const LAYER_OPACITY_VALID = 0x0001;
        /// Per-layer opacity of group layers is meaningful.
        const GROUP_OPACITY_VALID = 0x0002;
        /// Layer chunks carry a trailing UUID.
        const LAYERS_HAVE_UUID = 0x0004;
    }
}

bitflags! {
    /// User data chunk flags.
    #[derive(Debug, Clone, Copy)]
    pub(super) struct UserDataFlags: u32 {
        const HAS_TEXT = 0x0001;
        const HAS_COLOR = 0x0002;
        const HAS_PROPERTIES = 0x0004;
    }
}

bitflags! {
    /// Slice chunk flags, OR-ed over the slice's keys.
    #[derive(Debug, Clone, Copy)]
    pub(super) struct SliceFlags: u32 {
        const NINE_SLICE = 0x0001;
        const HAS_PIVOT = 0x0002;
    }
}

bitflags! {
    /// Tileset chunk flags.
    #[derive(Debug, Clone, Copy)]
    pub(super) struct TilesetFlags: u32 {
        const EXTERNAL_FILE = 0x0001;
        const EMBED_TILES = 0x0002;
        const EMPTY_TILE_IS_ZERO = 0x0004;
    }
}
