use std::collections::VecDeque;
use std::io::{Read, Seek};

use crate::doc::{
    AnimationDirection, BlendMode, Cel, ColorMode, FrameInfo, Grid, GroupLayer, Image,
    ImageLayer, Layer, LayerFlags, PixelRatio, Rgba32, Slice, SliceKey, Sprite, Tag,
    TileFlags, TilemapLayer, Tileset, UserData, encode_tile_ref,
};
use crate::error::{Error, Result};
use crate::io::AseReader;

use super::chunk::{
    BITS_PER_TILE, CEL_TYPE_COMPRESSED_IMAGE, CEL_TYPE_COMPRESSED_TILEMAP, CEL_TYPE_LINKED,
    CEL_TYPE_RAW, CHUNK_CEL, CHUNK_CEL_EXTRA, CHUNK_COLOR_PROFILE, CHUNK_EXTERNAL_FILES,
    CHUNK_HEADER_LEN, CHUNK_LAYER, CHUNK_OLD_PALETTE_6BIT, CHUNK_OLD_PALETTE_8BIT,
    CHUNK_PALETTE, CHUNK_SLICE, CHUNK_TAGS, CHUNK_TILESET, CHUNK_USER_DATA, FILE_MAGIC,
    FRAME_HEADER_LEN, FRAME_MAGIC, HeaderFlags, LAYER_TYPE_GROUP, LAYER_TYPE_IMAGE,
    LAYER_TYPE_TILEMAP, SliceFlags, TilesetFlags, UserDataFlags,
};
use super::zlib;

/// Builds a sprite from any seekable byte source.
pub(super) fn decode<R: Read + Seek>(source: R) -> Result<Sprite> {
    let mut reader = AseReader::new(source);
    let header = FileHeader::read(&mut reader)?;

    let mut sprite = Sprite::new(header.width, header.height, header.mode)?;
    if header.mode == ColorMode::Indexed {
        sprite.set_transparent_index(header.transparent_index);
    }
    sprite.set_pixel_ratio(header.pixel_ratio);
    sprite.set_grid(header.grid);
    if header.speed > 0 {
        // Deprecated global speed seeds frame 0; the frame header's own
        // duration overrides it when present.
        sprite.set_frame_duration(0, header.speed);
    }

    let mut decoder = Decoder {
        reader,
        sprite,
        layers: Vec::new(),
        max_child_depth: 0,
        last_target: Target::None,
        pending_tag_user_data: VecDeque::new(),
        found_new_palette: false,
        layer_opacity_valid: header.flags.contains(HeaderFlags::LAYER_OPACITY_VALID),
        group_opacity_valid: header.flags.contains(HeaderFlags::GROUP_OPACITY_VALID),
    };
    for frame in 0..header.frame_count {
        decoder.read_frame(frame)?;
    }
    decoder.finish()
}

/// The fixed 128-byte file header.
struct FileHeader {
    frame_count: u16,
    width: u16,
    height: u16,
    mode: ColorMode,
    flags: HeaderFlags,
    speed: u16,
    transparent_index: u8,
    pixel_ratio: PixelRatio,
    grid: Grid,
}

impl FileHeader {
    fn read<R: Read + Seek>(reader: &mut AseReader<R>) -> Result<FileHeader> {
        let _file_size = reader.read_u32_le()?;
        let magic = reader.read_u16_le()?;
        if magic != FILE_MAGIC {
            return Err(Error::InvalidFileMagic { found: magic });
        }
        let frame_count = reader.read_u16_le()?;
        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        let depth = reader.read_u16_le()?;
        let mode = match depth {
            32 => ColorMode::Rgba,
            16 => ColorMode::Grayscale,
            8 => ColorMode::Indexed,
            bits => return Err(Error::UnknownColorDepth { bits }),
        };
        let flags = HeaderFlags::from_bits_truncate(reader.read_u32_le()?);
        let speed = reader.read_u16_le()?;
        reader.skip(8)?;
        let transparent_index = reader.read_u8()?;
        reader.skip(3)?;
        // The color count here is untrustworthy in old files; the
        // palette chunk's own size is authoritative.
        let _num_colors = reader.read_u16_le()?;
        let pixel_width = reader.read_u8()?;
        let pixel_height = reader.read_u8()?;
        let grid_x = reader.read_i16_le()?;
        let grid_y = reader.read_i16_le()?;
        let grid_width = reader.read_u16_le()?;
        let grid_height = reader.read_u16_le()?;
        reader.skip(84)?;

        Ok(FileHeader {
            frame_count,
            width,
            height,
            mode,
            flags,
            speed,
            transparent_index,
            pixel_ratio: PixelRatio::new(pixel_width, pixel_height),
            grid: Grid::new(grid_x, grid_y, grid_width, grid_height),
        })
    }
}

/// What the next user data chunk attaches to.
#[derive(Debug, Clone, Copy)]
enum Target {
    None,
    Layer(usize),
    Cel { layer: usize, frame: u16 },
    Slice(usize),
    Tileset(usize),
}

/// A decoded layer still in on-wire order; the tree is assembled from
/// the child levels once every frame has been read, because cel chunks
/// in any frame index into this list.
struct FlatLayer {
    depth: u16,
    layer: Layer,
}

struct Decoder<R> {
    reader: AseReader<R>,
    sprite: Sprite,
    layers: Vec<FlatLayer>,
    /// Deepest level the next layer chunk may attach at.
    max_child_depth: u16,
    last_target: Target,
    /// Tags from the most recent tags chunk still awaiting their user
    /// data chunk, by index into the sprite's tag list.
    pending_tag_user_data: VecDeque<usize>,
    /// Once a new-style palette chunk is seen, old palette chunks are
    /// ignored.
    found_new_palette: bool,
    layer_opacity_valid: bool,
    group_opacity_valid: bool,
}

impl<R: Read + Seek> Decoder<R> {
    fn read_frame(&mut self, frame: u16) -> Result<()> {
        let frame_start = self.reader.position()?;
        let frame_bytes = u64::from(self.reader.read_u32_le()?);
        let magic = self.reader.read_u16_le()?;
        if magic != FRAME_MAGIC {
            return Err(Error::BadFrameMagic { frame });
        }
        if frame_bytes < FRAME_HEADER_LEN {
            return Err(Error::InvalidData(format!(
                "frame {frame} claims {frame_bytes} bytes"
            )));
        }
        let old_chunk_count = self.reader.read_u16_le()?;
        let duration = self.reader.read_u16_le()?;
        self.reader.skip(2)?;
        let new_chunk_count = self.reader.read_u32_le()?;

        if frame > 0 {
            // New frames start with the previous frame's duration; the
            // header value below replaces it when non-zero.
            let previous = self
                .sprite
                .frame(usize::from(frame) - 1)
                .map_or(100, FrameInfo::duration_ms);
            self.sprite.add_frame(previous);
        }
        if duration > 0 {
            self.sprite.set_frame_duration(usize::from(frame), duration);
        }

        let chunk_count = if new_chunk_count != 0 {
            Some(u64::from(new_chunk_count))
        } else if old_chunk_count == 0xFFFF {
            // Unknown count; the frame size bounds the loop instead.
            None
        } else {
            Some(u64::from(old_chunk_count))
        };

        let frame_end = frame_start + frame_bytes;
        let mut chunks_read = 0u64;
        while chunk_count.is_none_or(|count| chunks_read < count)
            && self.reader.position()? < frame_end
        {
            self.read_chunk(frame)?;
            chunks_read += 1;
        }
        self.reader.seek_to(frame_end)
    }

    fn read_chunk(&mut self, frame: u16) -> Result<()> {
        let chunk_start = self.reader.position()?;
        let size = u64::from(self.reader.read_u32_le()?);
        let chunk_type = self.reader.read_u16_le()?;
        if size < CHUNK_HEADER_LEN {
            return Err(Error::InvalidData(format!(
                "chunk of {size} bytes at offset {chunk_start}"
            )));
        }
        let chunk_end = chunk_start + size;

        match chunk_type {
            CHUNK_OLD_PALETTE_8BIT => self.handle_old_palette(frame, false)?,
            CHUNK_OLD_PALETTE_6BIT => self.handle_old_palette(frame, true)?,
            CHUNK_LAYER => self.handle_layer()?,
            CHUNK_CEL => self.handle_cel(frame, chunk_end)?,
            CHUNK_TAGS => self.handle_tags()?,
            CHUNK_PALETTE => self.handle_palette(frame, chunk_end)?,
            CHUNK_USER_DATA => self.handle_user_data()?,
            CHUNK_SLICE => self.handle_slice(chunk_end)?,
            CHUNK_TILESET => self.handle_tileset(chunk_end)?,
            CHUNK_CEL_EXTRA | CHUNK_COLOR_PROFILE | CHUNK_EXTERNAL_FILES => {
                log::trace!("discarding chunk {chunk_type:#06x}");
            }
            _ => {
                log::debug!("skipping unknown chunk type {chunk_type:#06x}");
            }
        }

        // Unconditionally step past whatever the handler left unread:
        // unknown trailers inside known chunks are not errors.
        self.reader.seek_to(chunk_end)
    }

    // ----- chunk handlers -----

    fn handle_layer(&mut self) -> Result<()> {
        let flags = LayerFlags::from_bits_truncate(self.reader.read_u16_le()?);
        let layer_type = self.reader.read_u16_le()?;
        let child_level = self.reader.read_u16_le()?;
        self.reader.skip(4)?; // default width/height, ignored
        let blend_mode = self.reader.read_u16_le()?;
        let opacity = self.reader.read_u8()?;
        self.reader.skip(3)?;
        let name = self.reader.read_string()?;

        let mut layer = match layer_type {
            LAYER_TYPE_IMAGE => Layer::Image(ImageLayer::new(name)),
            LAYER_TYPE_GROUP => Layer::Group(GroupLayer::new(name)),
            LAYER_TYPE_TILEMAP => {
                let tileset_index = self.reader.read_u32_le()?;
                Layer::Tilemap(TilemapLayer::new(name, tileset_index))
            }
            _ => {
                return Err(Error::InvalidData(format!(
                    "unknown layer type {layer_type}"
                )));
            }
        };
        // A trailing UUID (header flag bit 2) is skipped by the
        // chunk-end seek.

        let opacity_valid = if layer.is_group() {
            self.group_opacity_valid
        } else {
            self.layer_opacity_valid
        };
        let core = layer.core_mut();
        core.set_flags(flags);
        core.set_blend_mode(BlendMode::from_wire(blend_mode));
        core.set_opacity(if opacity_valid { opacity } else { 255 });

        let depth = child_level.min(self.max_child_depth);
        if child_level > depth {
            log::warn!(
                "layer {:?} claims depth {child_level} with no group above it, attached at {depth}",
                layer.name()
            );
        }
        self.max_child_depth = if layer.is_group() {
            depth.saturating_add(1)
        } else {
            depth
        };
        self.layers.push(FlatLayer { depth, layer });
        self.last_target = Target::Layer(self.layers.len() - 1);
        Ok(())
    }

    fn handle_cel(&mut self, frame: u16, chunk_end: u64) -> Result<()> {
        let layer_index = usize::from(self.reader.read_u16_le()?);
        let x = self.reader.read_i16_le()?;
        let y = self.reader.read_i16_le()?;
        let opacity = self.reader.read_u8()?;
        let cel_type = self.reader.read_u16_le()?;
        let z_index = self.reader.read_i16_le()?;
        self.reader.skip(5)?;

        if layer_index >= self.layers.len() {
            log::warn!("cel chunk for out-of-range layer index {layer_index}, dropped");
            return Ok(());
        }
        if self.layers[layer_index].layer.is_group() {
            log::warn!("cel chunk aimed at a group layer, dropped");
            return Ok(());
        }

        let mode = self.sprite.mode();
        let mut cel = match cel_type {
            CEL_TYPE_RAW => {
                let width = self.reader.read_u16_le()?;
                let height = self.reader.read_u16_le()?;
                let needed =
                    usize::from(width) * usize::from(height) * mode.bytes_per_pixel();
                let available = chunk_end.saturating_sub(self.reader.position()?);
                if u64::try_from(needed).unwrap_or(u64::MAX) > available {
                    return Err(Error::UnexpectedEof);
                }
                let data = self.reader.read_vec(needed)?;
                Cel::from_image(x, y, Image::from_vec(mode, width, height, data)?)
            }
            CEL_TYPE_LINKED => {
                let target = self.reader.read_u16_le()?;
                let target_owns_data = self.layers[layer_index]
                    .layer
                    .cel(target)
                    .is_some_and(|cel| !cel.is_linked());
                if !target_owns_data {
                    log::warn!(
                        "cel at frame {frame} links to frame {target} which owns no pixels, dropped"
                    );
                    return Ok(());
                }
                let mut cel = Cel::linked(target);
                cel.set_position(x, y);
                cel
            }
            CEL_TYPE_COMPRESSED_IMAGE => {
                let image = self.read_compressed_image(mode, chunk_end)?;
                Cel::from_image(x, y, image)
            }
            CEL_TYPE_COMPRESSED_TILEMAP => {
                let image = self.read_compressed_tilemap(chunk_end)?;
                Cel::from_image(x, y, image)
            }
            _ => {
                return Err(Error::InvalidData(format!("unknown cel type {cel_type}")));
            }
        };
        cel.set_opacity(opacity);
        cel.set_z_index(z_index);
        self.layers[layer_index].layer.add_cel(frame, cel)?;
        self.last_target = Target::Cel {
            layer: layer_index,
            frame,
        };
        Ok(())
    }

    /// Zlib-compressed pixels, row-major, zero-filled on a short stream.
    fn read_compressed_image(&mut self, mode: ColorMode, chunk_end: u64) -> Result<Image> {
        let width = self.reader.read_u16_le()?;
        let height = self.reader.read_u16_le()?;
        let payload = self.read_to_chunk_end(chunk_end)?;
        let mut data =
            vec![0u8; usize::from(width) * usize::from(height) * mode.bytes_per_pixel()];
        zlib::inflate_into(&payload, &mut data)?;
        Image::from_vec(mode, width, height, data)
    }

    /// Zlib-compressed 32-bit tile cells. Cells are re-encoded from the
    /// masks the chunk declares into the canonical bit layout.
    fn read_compressed_tilemap(&mut self, chunk_end: u64) -> Result<Image> {
        let width = self.reader.read_u16_le()?;
        let height = self.reader.read_u16_le()?;
        let bits_per_tile = self.reader.read_u16_le()?;
        if bits_per_tile != BITS_PER_TILE {
            return Err(Error::InvalidData(format!(
                "unsupported tilemap cell width of {bits_per_tile} bits"
            )));
        }
        let index_mask = self.reader.read_u32_le()?;
        let flip_x_mask = self.reader.read_u32_le()?;
        let flip_y_mask = self.reader.read_u32_le()?;
        let rotate_mask = self.reader.read_u32_le()?;
        self.reader.skip(10)?;

        let payload = self.read_to_chunk_end(chunk_end)?;
        let mut cells = vec![0u8; usize::from(width) * usize::from(height) * 4];
        zlib::inflate_into(&payload, &mut cells)?;

        for cell in cells.chunks_exact_mut(4) {
            let raw = u32::from_le_bytes((&*cell).try_into().unwrap());
            let mut flags = TileFlags::empty();
            if raw & flip_x_mask != 0 {
                flags |= TileFlags::FLIP_X;
            }
            if raw & flip_y_mask != 0 {
                flags |= TileFlags::FLIP_Y;
            }
            if raw & rotate_mask != 0 {
                flags |= TileFlags::ROTATE_90;
            }
            let mapped = encode_tile_ref(raw & index_mask, flags);
            cell.copy_from_slice(&mapped.to_le_bytes());
        }
        Image::from_vec(ColorMode::Tilemap, width, height, cells)
    }

    fn handle_tags(&mut self) -> Result<()> {
        let count = self.reader.read_u16_le()?;
        self.reader.skip(8)?;
        // The tags chunk resets the user data chain: the next user data
        // chunks pair with the new tags positionally, not with whatever
        // layer or cel came before.
        self.last_target = Target::None;
        self.pending_tag_user_data.clear();

        for _ in 0..count {
            let from_frame = self.reader.read_u16_le()?;
            let to_frame = self.reader.read_u16_le()?;
            let direction = self.reader.read_u8()?;
            let repeat = self.reader.read_u16_le()?;
            self.reader.skip(6)?;
            let r = self.reader.read_u8()?;
            let g = self.reader.read_u8()?;
            let b = self.reader.read_u8()?;
            self.reader.skip(1)?;
            let name = self.reader.read_string()?;

            let mut tag = Tag::new(name, from_frame, to_frame);
            tag.set_direction(AnimationDirection::from_wire(direction));
            tag.set_repeat(repeat);
            tag.set_color(Rgba32::new(r, g, b, 255));
            let index = self.sprite.tags().len();
            self.sprite.add_tag(tag);
            self.pending_tag_user_data.push_back(index);
        }
        Ok(())
    }

    fn handle_palette(&mut self, frame: u16, chunk_end: u64) -> Result<()> {
        let new_size = usize::try_from(self.reader.read_u32_le()?).unwrap_or(usize::MAX);
        let from_index = self.reader.read_u32_le()?;
        let to_index = self.reader.read_u32_le()?;
        self.reader.skip(8)?;

        let mut entries: Vec<(u32, Rgba32)> = Vec::new();
        let mut index = from_index;
        while index <= to_index {
            if self.reader.position()? >= chunk_end {
                break;
            }
            let entry_flags = self.reader.read_u16_le()?;
            let r = self.reader.read_u8()?;
            let g = self.reader.read_u8()?;
            let b = self.reader.read_u8()?;
            let a = self.reader.read_u8()?;
            if entry_flags & 0x0001 != 0 {
                // Entry names are accepted but not kept.
                let _name = self.reader.read_string()?;
            }
            entries.push((index, Rgba32::new(r, g, b, a)));
            let Some(next) = index.checked_add(1) else {
                break;
            };
            index = next;
        }

        let palette = self.sprite.ensure_palette_at(frame);
        if palette.len() != new_size {
            palette.resize(new_size);
        }
        for (index, color) in entries {
            let index = usize::try_from(index).unwrap_or(usize::MAX);
            if index < palette.len() {
                palette.set_color(index, color);
            }
        }
        self.found_new_palette = true;
        Ok(())
    }

    fn handle_old_palette(&mut self, frame: u16, six_bit: bool) -> Result<()> {
        if self.found_new_palette {
            log::debug!("old palette chunk after a new palette chunk, ignored");
            return Ok(());
        }
        let scale = |value: u8| -> u8 {
            if six_bit {
                u8::try_from((u16::from(value.min(63)) * 255) / 63).unwrap_or(255)
            } else {
                value
            }
        };

        let packet_count = self.reader.read_u16_le()?;
        let mut entries: Vec<(usize, Rgba32)> = Vec::new();
        let mut index = 0usize;
        for _ in 0..packet_count {
            index += usize::from(self.reader.read_u8()?);
            let count = self.reader.read_u8()?;
            let count = if count == 0 { 256 } else { usize::from(count) };
            for _ in 0..count {
                let r = scale(self.reader.read_u8()?);
                let g = scale(self.reader.read_u8()?);
                let b = scale(self.reader.read_u8()?);
                entries.push((index, Rgba32::new(r, g, b, 255)));
                index += 1;
            }
        }

        let palette = self.sprite.ensure_palette_at(frame);
        for (index, color) in entries {
            if index >= 256 {
                continue;
            }
            if index >= palette.len() {
                palette.resize(index + 1);
            }
            palette.set_color(index, color);
        }
        Ok(())
    }

    fn handle_user_data(&mut self) -> Result<()> {
        let flags = UserDataFlags::from_bits_truncate(self.reader.read_u32_le()?);
        let mut user_data = UserData::new();
        if flags.contains(UserDataFlags::HAS_TEXT) {
            user_data.set_text(Some(self.reader.read_string()?));
        }
        if flags.contains(UserDataFlags::HAS_COLOR) {
            let r = self.reader.read_u8()?;
            let g = self.reader.read_u8()?;
            let b = self.reader.read_u8()?;
            let a = self.reader.read_u8()?;
            user_data.set_color(Some(Rgba32::new(r, g, b, a)));
        }
        // Property maps (flag bit 2) are skipped by the chunk-end seek.

        if let Some(tag_index) = self.pending_tag_user_data.pop_front() {
            if let Some(tag) = self.sprite.tags_mut().get_mut(tag_index) {
                *tag.user_data_mut() = user_data;
            }
            return Ok(());
        }
        match self.last_target {
            Target::Layer(index) => {
                *self.layers[index].layer.core_mut().user_data_mut() = user_data;
            }
            Target::Cel { layer, frame } => {
                if let Some(cel) = self.layers[layer].layer.cel_mut(frame) {
                    *cel.user_data_mut() = user_data;
                }
            }
            Target::Slice(index) => {
                if let Some(slice) = self.sprite.slices_mut().get_mut(index) {
                    *slice.user_data_mut() = user_data;
                }
            }
            Target::Tileset(index) => {
                if let Some(tileset) = self.sprite.tileset_mut(index) {
                    *tileset.user_data_mut() = user_data;
                }
            }
            Target::None => {
                log::debug!("user data chunk with nothing to attach to, dropped");
            }
        }
        Ok(())
    }

    fn handle_slice(&mut self, chunk_end: u64) -> Result<()> {
        let key_count = self.reader.read_u32_le()?;
        let flags = SliceFlags::from_bits_truncate(self.reader.read_u32_le()?);
        self.reader.skip(4)?;
        let name = self.reader.read_string()?;

        let mut slice = Slice::new(name);
        for _ in 0..key_count {
            if self.reader.position()? >= chunk_end {
                break;
            }
            let frame = self.reader.read_u32_le()?;
            let x = self.reader.read_i32_le()?;
            let y = self.reader.read_i32_le()?;
            let width = self.reader.read_u32_le()?;
            let height = self.reader.read_u32_le()?;
            let mut key = SliceKey::new(frame, x, y, width, height);
            if flags.contains(SliceFlags::NINE_SLICE) {
                let cx = self.reader.read_i32_le()?;
                let cy = self.reader.read_i32_le()?;
                let cw = self.reader.read_u32_le()?;
                let ch = self.reader.read_u32_le()?;
                key.set_center(Some((cx, cy, cw, ch)));
            }
            if flags.contains(SliceFlags::HAS_PIVOT) {
                let px = self.reader.read_i32_le()?;
                let py = self.reader.read_i32_le()?;
                key.set_pivot(Some((px, py)));
            }
            slice.add_key(key);
        }

        let index = self.sprite.slices().len();
        self.sprite.add_slice(slice);
        self.last_target = Target::Slice(index);
        Ok(())
    }

    fn handle_tileset(&mut self, chunk_end: u64) -> Result<()> {
        let _tileset_id = self.reader.read_u32_le()?;
        let flags = TilesetFlags::from_bits_truncate(self.reader.read_u32_le()?);
        let tile_count = usize::try_from(self.reader.read_u32_le()?)
            .map_err(|_| Error::InvalidData("tileset too large".into()))?;
        let tile_width = self.reader.read_u16_le()?;
        let tile_height = self.reader.read_u16_le()?;
        let base_index = self.reader.read_i16_le()?;
        self.reader.skip(14)?;
        let name = self.reader.read_string()?;

        let mode = self.sprite.mode();
        let mut tileset = Tileset::new(name, mode, tile_width, tile_height)?;
        tileset.set_base_index(base_index);

        if flags.contains(TilesetFlags::EXTERNAL_FILE) {
            let _external_file_id = self.reader.read_u32_le()?;
            let _external_tileset_id = self.reader.read_u32_le()?;
        }
        if flags.contains(TilesetFlags::EMBED_TILES) {
            let data_len = u64::from(self.reader.read_u32_le()?);
            let available = chunk_end.saturating_sub(self.reader.position()?);
            if data_len > available {
                return Err(Error::InvalidData(
                    "tileset payload extends past its chunk".into(),
                ));
            }
            let payload = self
                .reader
                .read_vec(usize::try_from(data_len).unwrap_or(usize::MAX))?;
            let tile_len = usize::from(tile_width)
                * usize::from(tile_height)
                * mode.bytes_per_pixel();
            if tile_count > 0 {
                let total = tile_count
                    .checked_mul(tile_len)
                    .ok_or_else(|| Error::InvalidData("tileset too large".into()))?;
                let mut pixels = vec![0u8; total];
                zlib::inflate_into(&payload, &mut pixels)?;
                let mut tiles = Vec::with_capacity(tile_count);
                for tile in pixels.chunks_exact(tile_len) {
                    tiles.push(Image::from_vec(mode, tile_width, tile_height, tile.to_vec())?);
                }
                tileset.set_tiles(tiles)?;
            }
        }

        let index = self.sprite.add_tileset(tileset);
        self.last_target = Target::Tileset(index);
        Ok(())
    }

    // ----- helpers -----

    fn read_to_chunk_end(&mut self, chunk_end: u64) -> Result<Vec<u8>> {
        let available = chunk_end.saturating_sub(self.reader.position()?);
        let len = usize::try_from(available)
            .map_err(|_| Error::InvalidData("chunk too large".into()))?;
        self.reader.read_vec(len)
    }

    /// Validates cross-references and folds the flat layer list into the
    /// sprite's layer tree.
    fn finish(mut self) -> Result<Sprite> {
        let tileset_count = self.sprite.tilesets().len();
        for flat in &self.layers {
            if let Layer::Tilemap(tilemap) = &flat.layer {
                let in_range = usize::try_from(tilemap.tileset_index())
                    .is_ok_and(|index| index < tileset_count);
                if !in_range {
                    return Err(Error::InvalidData(format!(
                        "tilemap layer {:?} references missing tileset {}",
                        flat.layer.name(),
                        tilemap.tileset_index()
                    )));
                }
            }
        }

        // Child levels were clamped as layers were read, so each layer
        // attaches at most one level deeper than the open group chain.
        let mut stack = vec![GroupLayer::new("__root__")];
        for flat in self.layers {
            while stack.len() - 1 > usize::from(flat.depth) {
                let group = stack.pop().unwrap();
                stack.last_mut().unwrap().push(Layer::Group(group));
            }
            match flat.layer {
                Layer::Group(group) => stack.push(group),
                other => {
                    stack.last_mut().unwrap().push(other);
                }
            }
        }
        while stack.len() > 1 {
            let group = stack.pop().unwrap();
            stack.last_mut().unwrap().push(Layer::Group(group));
        }
        *self.sprite.root_mut() = stack.pop().unwrap();
        Ok(self.sprite)
    }
}
