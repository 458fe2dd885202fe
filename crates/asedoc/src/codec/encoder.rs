use std::io::{Seek, Write};

use crate::doc::{
    Cel, CelContent, ColorMode, FrameInfo, Layer, Palette, Slice, Sprite, TILE_INDEX_MASK, Tag,
    TileFlags, Tileset, UserData,
};
use crate::error::{Error, Result};
use crate::io::AseWriter;

use super::chunk::{
    BITS_PER_TILE, CEL_TYPE_COMPRESSED_IMAGE, CEL_TYPE_COMPRESSED_TILEMAP, CEL_TYPE_LINKED,
    CHUNK_CEL, CHUNK_LAYER, CHUNK_PALETTE, CHUNK_SLICE, CHUNK_TAGS, CHUNK_TILESET,
    CHUNK_USER_DATA, FILE_HEADER_LEN, FILE_MAGIC, FRAME_HEADER_LEN, FRAME_MAGIC, HeaderFlags,
    LAYER_TYPE_GROUP, LAYER_TYPE_IMAGE, LAYER_TYPE_TILEMAP, SliceFlags, TilesetFlags,
    UserDataFlags,
};
use super::zlib;

/// Serialises `sprite` to `sink` such that decoding the bytes yields an
/// equivalent sprite.
pub(super) fn encode<W: Write + Seek>(sprite: &Sprite, sink: W) -> Result<()> {
    let mut encoder = Encoder {
        writer: AseWriter::new(sink),
        sprite,
        layers: sprite.flattened_layers(),
        chunks_in_frame: 0,
    };
    encoder.run()
}

struct Encoder<'a, W> {
    writer: AseWriter<W>,
    sprite: &'a Sprite,
    /// Pre-order flattened `(depth, layer)` pairs; the position in this
    /// vector is the on-wire layer index cel chunks refer to.
    layers: Vec<(u16, &'a Layer)>,
    chunks_in_frame: u32,
}

impl<W: Write + Seek> Encoder<'_, W> {
    fn run(&mut self) -> Result<()> {
        let frame_count = u16::try_from(self.sprite.frame_count())
            .map_err(|_| Error::InvalidData("too many frames for the format".into()))?;
        if u16::try_from(self.layers.len()).is_err() {
            return Err(Error::InvalidData("too many layers for the format".into()));
        }

        let file_start = self.writer.position()?;
        self.writer.pad(usize::try_from(FILE_HEADER_LEN).unwrap())?;
        for frame in 0..frame_count {
            self.write_frame(frame)?;
        }
        let file_end = self.writer.position()?;
        self.write_file_header(file_start, file_end, frame_count)?;
        self.writer.flush()
    }

    fn write_frame(&mut self, frame: u16) -> Result<()> {
        let frame_start = self.writer.position()?;
        self.writer.pad(usize::try_from(FRAME_HEADER_LEN).unwrap())?;
        self.chunks_in_frame = 0;

        if frame == 0 {
            // Tilesets precede layers so layer chunks can reference them.
            for (index, tileset) in self.sprite.tilesets().iter().enumerate() {
                self.write_tileset_chunk(index, tileset)?;
                self.write_user_data_chunk_if_any(tileset.user_data())?;
            }
            for position in 0..self.layers.len() {
                let (depth, layer) = self.layers[position];
                self.write_layer_chunk(depth, layer)?;
                self.write_user_data_chunk_if_any(layer.core().user_data())?;
            }
            let palette = self.sprite.palette_at(0);
            if !palette.is_empty() {
                self.write_palette_chunk(palette)?;
            }
            if !self.sprite.tags().is_empty() {
                self.write_tags_chunk()?;
                // One user data chunk per tag, in tag order, empty or not:
                // the decoder pairs them positionally.
                for tag in self.sprite.tags() {
                    self.write_user_data_chunk(tag.user_data())?;
                }
            }
            for slice in self.sprite.slices() {
                self.write_slice_chunk(slice)?;
                self.write_user_data_chunk_if_any(slice.user_data())?;
            }
        } else {
            for palette in self.sprite.palettes() {
                if palette.first_frame() == frame && !palette.is_empty() {
                    self.write_palette_chunk(palette)?;
                }
            }
        }

        for position in 0..self.layers.len() {
            let (_, layer) = self.layers[position];
            if let Some(cel) = layer.cel(frame) {
                self.write_cel_chunk(position, cel)?;
                self.write_user_data_chunk_if_any(cel.user_data())?;
            }
        }

        let frame_end = self.writer.position()?;
        let frame_bytes = u32::try_from(frame_end - frame_start)
            .map_err(|_| Error::InvalidData("frame too large for the format".into()))?;
        self.writer.seek_to(frame_start)?;
        self.writer.write_u32_le(frame_bytes)?;
        self.writer.write_u16_le(FRAME_MAGIC)?;
        // The 16-bit chunk count is superseded; always defer to the
        // 32-bit field.
        self.writer.write_u16_le(0xFFFF)?;
        self.writer.write_u16_le(
            self.sprite
                .frame(usize::from(frame))
                .map_or(100, FrameInfo::duration_ms),
        )?;
        self.writer.pad(2)?;
        self.writer.write_u32_le(self.chunks_in_frame)?;
        self.writer.seek_to(frame_end)
    }

    fn write_file_header(&mut self, file_start: u64, file_end: u64, frame_count: u16) -> Result<()> {
        let file_size = u32::try_from(file_end - file_start)
            .map_err(|_| Error::InvalidData("file too large for the format".into()))?;
        let color_depth: u16 = match self.sprite.mode() {
            ColorMode::Rgba => 32,
            ColorMode::Grayscale => 16,
            ColorMode::Indexed => 8,
            ColorMode::Tilemap => {
                return Err(Error::InvalidData(
                    "a sprite canvas cannot be in tilemap mode".into(),
                ));
            }
        };
        let num_colors = u16::try_from(self.sprite.palette_at(0).len()).unwrap_or(u16::MAX);

        self.writer.seek_to(file_start)?;
        self.writer.write_u32_le(file_size)?;
        self.writer.write_u16_le(FILE_MAGIC)?;
        self.writer.write_u16_le(frame_count)?;
        self.writer.write_u16_le(self.sprite.width())?;
        self.writer.write_u16_le(self.sprite.height())?;
        self.writer.write_u16_le(color_depth)?;
        self.writer.write_u32_le(
            (HeaderFlags::LAYER_OPACITY_VALID | HeaderFlags::GROUP_OPACITY_VALID).bits(),
        )?;
        // Deprecated frame speed; readers take durations from the frame
        // headers, but the field must be present.
        self.writer.write_u16_le(100)?;
        self.writer.pad(8)?;
        self.writer.write_u8(self.sprite.transparent_index())?;
        self.writer.pad(3)?;
        self.writer.write_u16_le(num_colors)?;
        self.writer.write_u8(self.sprite.pixel_ratio().width())?;
        self.writer.write_u8(self.sprite.pixel_ratio().height())?;
        self.writer.write_i16_le(self.sprite.grid().x())?;
        self.writer.write_i16_le(self.sprite.grid().y())?;
        self.writer.write_u16_le(self.sprite.grid().width())?;
        self.writer.write_u16_le(self.sprite.grid().height())?;
        self.writer.pad(84)?;
        self.writer.seek_to(file_end)
    }

    // ----- chunk framing -----

    fn begin_chunk(&mut self, chunk_type: u16) -> Result<u64> {
        let start = self.writer.position()?;
        self.writer.write_u32_le(0)?; // size, patched by end_chunk
        self.writer.write_u16_le(chunk_type)?;
        Ok(start)
    }

    fn end_chunk(&mut self, start: u64) -> Result<()> {
        let end = self.writer.position()?;
        let size = u32::try_from(end - start)
            .map_err(|_| Error::InvalidData("chunk too large for the format".into()))?;
        self.writer.patch_u32_le_at(start, size)?;
        self.chunks_in_frame += 1;
        Ok(())
    }

    // ----- chunk bodies -----

    fn write_layer_chunk(&mut self, depth: u16, layer: &Layer) -> Result<()> {
        let start = self.begin_chunk(CHUNK_LAYER)?;
        let core = layer.core();
        self.writer.write_u16_le(core.flags().bits())?;
        self.writer.write_u16_le(match layer {
            Layer::Image(_) => LAYER_TYPE_IMAGE,
            Layer::Group(_) => LAYER_TYPE_GROUP,
            Layer::Tilemap(_) => LAYER_TYPE_TILEMAP,
        })?;
        self.writer.write_u16_le(depth)?;
        self.writer.pad(4)?; // default width/height, ignored by readers
        self.writer.write_u16_le(core.blend_mode().to_wire())?;
        self.writer.write_u8(core.opacity())?;
        self.writer.pad(3)?;
        self.writer.write_string(core.name())?;
        if let Layer::Tilemap(tilemap) = layer {
            self.writer.write_u32_le(tilemap.tileset_index())?;
        }
        self.end_chunk(start)
    }

    fn write_cel_chunk(&mut self, layer_index: usize, cel: &Cel) -> Result<()> {
        let start = self.begin_chunk(CHUNK_CEL)?;
        self.writer
            .write_u16_le(u16::try_from(layer_index).unwrap_or(u16::MAX))?;
        self.writer.write_i16_le(cel.x())?;
        self.writer.write_i16_le(cel.y())?;
        self.writer.write_u8(cel.opacity())?;
        let cel_type = match cel.content() {
            CelContent::Linked(_) => CEL_TYPE_LINKED,
            CelContent::Image(image) if image.mode() == ColorMode::Tilemap => {
                CEL_TYPE_COMPRESSED_TILEMAP
            }
            CelContent::Image(_) => CEL_TYPE_COMPRESSED_IMAGE,
        };
        self.writer.write_u16_le(cel_type)?;
        self.writer.write_i16_le(cel.z_index())?;
        self.writer.pad(5)?;

        match cel.content() {
            CelContent::Linked(target) => self.writer.write_u16_le(*target)?,
            CelContent::Image(image) => {
                self.writer.write_u16_le(image.width())?;
                self.writer.write_u16_le(image.height())?;
                if cel_type == CEL_TYPE_COMPRESSED_TILEMAP {
                    self.writer.write_u16_le(BITS_PER_TILE)?;
                    self.writer.write_u32_le(TILE_INDEX_MASK)?;
                    self.writer.write_u32_le(TileFlags::FLIP_X.bits())?;
                    self.writer.write_u32_le(TileFlags::FLIP_Y.bits())?;
                    self.writer.write_u32_le(TileFlags::ROTATE_90.bits())?;
                    self.writer.pad(10)?;
                } else if image.mode() != self.sprite.mode() {
                    return Err(Error::InvalidData(
                        "cel pixel mode does not match the sprite".into(),
                    ));
                }
                self.writer.write_bytes(&zlib::deflate(image.bytes())?)?;
            }
        }
        self.end_chunk(start)
    }

    fn write_palette_chunk(&mut self, palette: &Palette) -> Result<()> {
        let start = self.begin_chunk(CHUNK_PALETTE)?;
        let len = u32::try_from(palette.len()).unwrap_or(u32::MAX);
        self.writer.write_u32_le(len)?;
        self.writer.write_u32_le(0)?;
        self.writer.write_u32_le(len - 1)?;
        self.writer.pad(8)?;
        for color in palette.colors() {
            self.writer.write_u16_le(0)?; // no entry name
            self.writer.write_u8(color.r())?;
            self.writer.write_u8(color.g())?;
            self.writer.write_u8(color.b())?;
            self.writer.write_u8(color.a())?;
        }
        self.end_chunk(start)
    }

    fn write_tags_chunk(&mut self) -> Result<()> {
        let tags = self.sprite.tags();
        let count = u16::try_from(tags.len())
            .map_err(|_| Error::InvalidData("too many tags for the format".into()))?;
        let start = self.begin_chunk(CHUNK_TAGS)?;
        self.writer.write_u16_le(count)?;
        self.writer.pad(8)?;
        for tag in tags {
            self.write_tag(tag)?;
        }
        self.end_chunk(start)
    }

    fn write_tag(&mut self, tag: &Tag) -> Result<()> {
        self.writer.write_u16_le(tag.from_frame())?;
        self.writer.write_u16_le(tag.to_frame())?;
        self.writer.write_u8(tag.direction().to_wire())?;
        self.writer.write_u16_le(tag.repeat())?;
        self.writer.pad(6)?;
        // Deprecated tag color, kept for old readers.
        self.writer.write_u8(tag.color().r())?;
        self.writer.write_u8(tag.color().g())?;
        self.writer.write_u8(tag.color().b())?;
        self.writer.write_u8(0)?;
        self.writer.write_string(tag.name())
    }

    fn write_slice_chunk(&mut self, slice: &Slice) -> Result<()> {
        let mut flags = SliceFlags::empty();
        if slice.has_nine_slice() {
            flags |= SliceFlags::NINE_SLICE;
        }
        if slice.has_pivot() {
            flags |= SliceFlags::HAS_PIVOT;
        }

        let start = self.begin_chunk(CHUNK_SLICE)?;
        self.writer
            .write_u32_le(u32::try_from(slice.keys().len()).unwrap_or(u32::MAX))?;
        self.writer.write_u32_le(flags.bits())?;
        self.writer.pad(4)?;
        self.writer.write_string(slice.name())?;
        for key in slice.keys() {
            let (x, y, width, height) = key.bounds();
            self.writer.write_u32_le(key.frame())?;
            self.writer.write_i32_le(x)?;
            self.writer.write_i32_le(y)?;
            self.writer.write_u32_le(width)?;
            self.writer.write_u32_le(height)?;
            if flags.contains(SliceFlags::NINE_SLICE) {
                let (cx, cy, cw, ch) = key.center().unwrap_or((0, 0, 0, 0));
                self.writer.write_i32_le(cx)?;
                self.writer.write_i32_le(cy)?;
                self.writer.write_u32_le(cw)?;
                self.writer.write_u32_le(ch)?;
            }
            if flags.contains(SliceFlags::HAS_PIVOT) {
                let (px, py) = key.pivot().unwrap_or((0, 0));
                self.writer.write_i32_le(px)?;
                self.writer.write_i32_le(py)?;
            }
        }
        self.end_chunk(start)
    }

    fn write_tileset_chunk(&mut self, index: usize, tileset: &Tileset) -> Result<()> {
        let start = self.begin_chunk(CHUNK_TILESET)?;
        self.writer
            .write_u32_le(u32::try_from(index).unwrap_or(u32::MAX))?;
        self.writer
            .write_u32_le((TilesetFlags::EMBED_TILES | TilesetFlags::EMPTY_TILE_IS_ZERO).bits())?;
        self.writer
            .write_u32_le(u32::try_from(tileset.tile_count()).unwrap_or(u32::MAX))?;
        self.writer.write_u16_le(tileset.tile_width())?;
        self.writer.write_u16_le(tileset.tile_height())?;
        self.writer.write_i16_le(tileset.base_index())?;
        self.writer.pad(14)?;
        self.writer.write_string(tileset.name())?;

        let mut pixels = Vec::new();
        for tile in tileset.tiles() {
            pixels.extend_from_slice(tile.bytes());
        }
        let packed = zlib::deflate(&pixels)?;
        self.writer
            .write_u32_le(u32::try_from(packed.len()).map_err(|_| {
                Error::InvalidData("tileset payload too large for the format".into())
            })?)?;
        self.writer.write_bytes(&packed)?;
        self.end_chunk(start)
    }

    /// Tags always get a chunk so the decoder can pair them by position.
    fn write_user_data_chunk(&mut self, user_data: &UserData) -> Result<()> {
        let mut flags = UserDataFlags::empty();
        if user_data.has_text() {
            flags |= UserDataFlags::HAS_TEXT;
        }
        if user_data.has_color() {
            flags |= UserDataFlags::HAS_COLOR;
        }

        let start = self.begin_chunk(CHUNK_USER_DATA)?;
        self.writer.write_u32_le(flags.bits())?;
        if let Some(text) = user_data.text() {
            self.writer.write_string(text)?;
        }
        if let Some(color) = user_data.color() {
            self.writer.write_u8(color.r())?;
            self.writer.write_u8(color.g())?;
            self.writer.write_u8(color.b())?;
            self.writer.write_u8(color.a())?;
        }
        self.end_chunk(start)
    }

    /// Everything else only gets a chunk when there is data to attach.
    fn write_user_data_chunk_if_any(&mut self, user_data: &UserData) -> Result<()> {
        if user_data.is_empty() {
            return Ok(());
        }
        self.write_user_data_chunk(user_data)
    }
}
