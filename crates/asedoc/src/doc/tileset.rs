use bitflags::bitflags;

use super::image::{ColorMode, Image};
use super::user_data::UserData;
use crate::error::{Error, Result};

/// Low 29 bits of a tile cell carry the tile index.
pub const TILE_INDEX_MASK: u32 = 0x1FFF_FFFF;

bitflags! {
    /// Orientation flags in the high bits of a 32-bit tile cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileFlags: u32 {
        const FLIP_X = 0x8000_0000;
        const FLIP_Y = 0x4000_0000;
        const ROTATE_90 = 0x2000_0000;
    }
}

/// Packs a tile index and orientation flags into one tilemap cell.
#[must_use]
pub fn encode_tile_ref(index: u32, flags: TileFlags) -> u32 {
    (index & TILE_INDEX_MASK) | flags.bits()
}

/// Splits a tilemap cell into its tile index and orientation flags.
#[must_use]
pub fn decode_tile_ref(cell: u32) -> (u32, TileFlags) {
    (cell & TILE_INDEX_MASK, TileFlags::from_bits_truncate(cell))
}

/// A fixed-size tile dictionary. Tile 0 is the reserved empty tile: it
/// is seeded at construction and can never be removed or replaced in
/// place.
#[derive(Debug, Clone)]
pub struct Tileset {
    name: String,
    mode: ColorMode,
    tile_width: u16,
    tile_height: u16,
    base_index: i16,
    user_data: UserData,
    tiles: Vec<Image>,
}

impl Tileset {
    /// A tileset holding only the empty tile. Tile dimensions must be
    /// positive; the mode is the pixel encoding of the tiles themselves,
    /// so `Tilemap` is rejected.
    pub fn new(
        name: impl Into<String>,
        mode: ColorMode,
        tile_width: u16,
        tile_height: u16,
    ) -> Result<Tileset> {
        if mode == ColorMode::Tilemap {
            return Err(Error::InvalidData(
                "tileset tiles must use a pixel color mode".into(),
            ));
        }
        let empty = Image::new(mode, tile_width, tile_height)?;
        Ok(Tileset {
            name: name.into(),
            mode,
            tile_width,
            tile_height,
            base_index: 1,
            user_data: UserData::new(),
            tiles: vec![empty],
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    #[must_use]
    pub fn tile_width(&self) -> u16 {
        self.tile_width
    }

    #[must_use]
    pub fn tile_height(&self) -> u16 {
        self.tile_height
    }

    /// Display index of the first non-empty tile in the UI.
    #[must_use]
    pub fn base_index(&self) -> i16 {
        self.base_index
    }

    pub fn set_base_index(&mut self, base_index: i16) {
        self.base_index = base_index;
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn tile(&self, index: usize) -> Option<&Image> {
        self.tiles.get(index)
    }

    #[must_use]
    pub fn tiles(&self) -> &[Image] {
        &self.tiles
    }

    fn check_tile(&self, image: &Image) -> Result<()> {
        if image.mode() != self.mode
            || image.width() != self.tile_width
            || image.height() != self.tile_height
        {
            return Err(Error::InvalidData(format!(
                "tile must be {}x{} in the tileset's color mode",
                self.tile_width, self.tile_height
            )));
        }
        Ok(())
    }

    /// Appends a tile, returning its index.
    pub fn push_tile(&mut self, image: Image) -> Result<u32> {
        self.check_tile(&image)?;
        self.tiles.push(image);
        Ok(u32::try_from(self.tiles.len() - 1).unwrap_or(u32::MAX))
    }

    /// Replaces a tile in place. Tile 0 is reserved and out-of-range
    /// indices are rejected.
    pub fn replace_tile(&mut self, index: usize, image: Image) -> Result<()> {
        if index == 0 {
            return Err(Error::InvalidData(
                "tile 0 is the reserved empty tile".into(),
            ));
        }
        if index >= self.tiles.len() {
            return Err(Error::InvalidData(format!(
                "tile index {index} out of range"
            )));
        }
        self.check_tile(&image)?;
        self.tiles[index] = image;
        Ok(())
    }

    /// Wholesale replacement used when decoding an embedded tileset;
    /// tile 0 arrives in the payload like any other tile.
    pub(crate) fn set_tiles(&mut self, tiles: Vec<Image>) -> Result<()> {
        for tile in &tiles {
            self.check_tile(tile)?;
        }
        if tiles.is_empty() {
            return Err(Error::InvalidData("tileset cannot be empty".into()));
        }
        self.tiles = tiles;
        Ok(())
    }

    #[must_use]
    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        &mut self.user_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_ref_masks() {
        let cell = encode_tile_ref(5, TileFlags::FLIP_X | TileFlags::ROTATE_90);
        assert_eq!(cell, 0xA000_0005);
        let (index, flags) = decode_tile_ref(cell);
        assert_eq!(index, 5);
        assert_eq!(flags, TileFlags::FLIP_X | TileFlags::ROTATE_90);
    }

    #[test]
    fn index_is_truncated_to_29_bits() {
        let cell = encode_tile_ref(u32::MAX, TileFlags::empty());
        assert_eq!(cell, TILE_INDEX_MASK);
    }

    #[test]
    fn new_tileset_seeds_the_empty_tile() {
        let tileset = Tileset::new("terrain", ColorMode::Rgba, 8, 8).unwrap();
        assert_eq!(tileset.tile_count(), 1);
        assert!(tileset.tile(0).unwrap().bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn tile_validation() {
        let mut tileset = Tileset::new("terrain", ColorMode::Rgba, 8, 8).unwrap();
        let wrong_size = Image::new(ColorMode::Rgba, 4, 8).unwrap();
        assert!(tileset.push_tile(wrong_size).is_err());
        let wrong_mode = Image::new(ColorMode::Indexed, 8, 8).unwrap();
        assert!(tileset.push_tile(wrong_mode).is_err());
        let good = Image::new(ColorMode::Rgba, 8, 8).unwrap();
        assert_eq!(tileset.push_tile(good.clone()).unwrap(), 1);
        assert!(tileset.replace_tile(0, good.clone()).is_err());
        assert!(tileset.replace_tile(1, good).is_ok());
    }
}
