use super::cel::Cel;
use super::color::{Grid, PixelRatio};
use super::image::ColorMode;
use super::layer::{GroupLayer, Layer};
use super::palette::Palette;
use super::slice::Slice;
use super::tag::Tag;
use super::tileset::Tileset;
use super::user_data::UserData;
use crate::error::{Error, Result};

/// Per-frame metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    duration_ms: u16,
}

impl FrameInfo {
    /// Durations are strictly positive; zero clamps to 1 ms.
    #[must_use]
    pub fn new(duration_ms: u16) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    pub fn set_duration_ms(&mut self, duration_ms: u16) {
        self.duration_ms = duration_ms.max(1);
    }
}

/// The root aggregate: canvas, frames, the layer tree, palettes,
/// tilesets, tags and slices.
#[derive(Debug, Clone)]
pub struct Sprite {
    width: u16,
    height: u16,
    mode: ColorMode,
    transparent_index: u8,
    pixel_ratio: PixelRatio,
    grid: Grid,
    frames: Vec<FrameInfo>,
    root: GroupLayer,
    palettes: Vec<Palette>,
    tilesets: Vec<Tileset>,
    tags: Vec<Tag>,
    slices: Vec<Slice>,
    user_data: UserData,
}

impl Sprite {
    /// A one-frame sprite with an empty palette anchored at frame 0.
    /// Canvas dimensions must be positive; `Tilemap` is a cel pixel
    /// encoding, not a canvas mode.
    pub fn new(width: u16, height: u16, mode: ColorMode) -> Result<Sprite> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidData(format!(
                "canvas dimensions must be positive, got {width}x{height}"
            )));
        }
        if mode == ColorMode::Tilemap {
            return Err(Error::InvalidData(
                "a sprite canvas cannot be in tilemap mode".into(),
            ));
        }
        Ok(Sprite {
            width,
            height,
            mode,
            transparent_index: 0,
            pixel_ratio: PixelRatio::default(),
            grid: Grid::default(),
            frames: vec![FrameInfo::new(100)],
            root: GroupLayer::new("__root__"),
            palettes: vec![Palette::new(0)],
            tilesets: Vec::new(),
            tags: Vec::new(),
            slices: Vec::new(),
            user_data: UserData::new(),
        })
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Palette index treated as transparent in indexed mode.
    #[must_use]
    pub fn transparent_index(&self) -> u8 {
        self.transparent_index
    }

    pub fn set_transparent_index(&mut self, index: u8) {
        self.transparent_index = index;
    }

    #[must_use]
    pub fn pixel_ratio(&self) -> PixelRatio {
        self.pixel_ratio
    }

    pub fn set_pixel_ratio(&mut self, ratio: PixelRatio) {
        self.pixel_ratio = ratio;
    }

    #[must_use]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = grid;
    }

    // ----- frames -----

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&FrameInfo> {
        self.frames.get(index)
    }

    pub fn set_frame_duration(&mut self, index: usize, duration_ms: u16) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.set_duration_ms(duration_ms);
        }
    }

    /// Appends a frame, returning its index.
    pub fn add_frame(&mut self, duration_ms: u16) -> usize {
        self.frames.push(FrameInfo::new(duration_ms));
        self.frames.len() - 1
    }

    /// Inserts a frame at `index`, renumbering cels at or past it.
    pub fn insert_frame(&mut self, index: usize, duration_ms: u16) -> Result<()> {
        if index > self.frames.len() {
            return Err(Error::InvalidData(format!(
                "frame index {index} out of range"
            )));
        }
        self.frames.insert(index, FrameInfo::new(duration_ms));
        let from = u16::try_from(index).unwrap_or(u16::MAX);
        self.root
            .for_each_layer_mut(&mut |layer| layer.shift_cels(from, 1));
        Ok(())
    }

    /// Removes a frame and its cels, renumbering the rest. Removing the
    /// last remaining frame fails. Cels linked to the removed frame
    /// adopt a copy of its pixels first.
    pub fn remove_frame(&mut self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return Err(Error::InvalidData(format!(
                "frame index {index} out of range"
            )));
        }
        if self.frames.len() == 1 {
            return Err(Error::InvalidData(
                "a sprite always keeps at least one frame".into(),
            ));
        }
        self.frames.remove(index);
        let at = u16::try_from(index).unwrap_or(u16::MAX);
        self.root.for_each_layer_mut(&mut |layer| {
            if layer.is_group() {
                return;
            }
            let linked_here: Vec<u16> = layer
                .cels()
                .map(|cels| {
                    cels.iter()
                        .filter(|(_, cel)| cel.linked_to() == Some(at))
                        .map(|(frame, _)| *frame)
                        .collect()
                })
                .unwrap_or_default();
            for frame in linked_here {
                if layer.unlink_cel(frame).is_err() {
                    layer.remove_cel(frame);
                }
            }
            layer.remove_cel(at);
            layer.shift_cels(at.saturating_add(1), -1);
        });
        Ok(())
    }

    // ----- layers -----

    /// The invisible root group every layer hangs from.
    #[must_use]
    pub fn root(&self) -> &GroupLayer {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut GroupLayer {
        &mut self.root
    }

    /// All layers in on-wire order: pre-order depth-first from the
    /// root's children, bottom-to-top, groups before their contents.
    #[must_use]
    pub fn flattened_layers(&self) -> Vec<(u16, &Layer)> {
        self.root.flatten()
    }

    /// The drawable `(layer, cel)` pairs present at one frame, in
    /// flattened bottom-to-top order.
    #[must_use]
    pub fn cels_at(&self, frame: u16) -> Vec<(&Layer, &Cel)> {
        self.flattened_layers()
            .into_iter()
            .filter_map(|(_, layer)| Some((layer, layer.cel(frame)?)))
            .collect()
    }

    // ----- palettes -----

    /// Palettes in ascending first-frame order; the first is anchored at
    /// frame 0.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// The palette in effect at `frame`: greatest `first_frame <= frame`.
    #[must_use]
    pub fn palette_at(&self, frame: u16) -> &Palette {
        self.palettes
            .iter()
            .rev()
            .find(|palette| palette.first_frame() <= frame)
            .unwrap_or(&self.palettes[0])
    }

    pub fn palette_at_mut(&mut self, frame: u16) -> &mut Palette {
        let index = self
            .palettes
            .iter()
            .rposition(|palette| palette.first_frame() <= frame)
            .unwrap_or(0);
        &mut self.palettes[index]
    }

    /// The palette anchored exactly at `frame`, creating it as a copy of
    /// the palette previously in effect when absent.
    pub fn ensure_palette_at(&mut self, frame: u16) -> &mut Palette {
        let position = self
            .palettes
            .binary_search_by_key(&frame, Palette::first_frame);
        let index = match position {
            Ok(index) => index,
            Err(index) => {
                let mut palette = self.palette_at(frame).clone();
                palette.set_first_frame(frame);
                self.palettes.insert(index, palette);
                index
            }
        };
        &mut self.palettes[index]
    }

    /// Inserts a palette at its first-frame position, replacing any
    /// palette already anchored there.
    pub fn add_palette(&mut self, palette: Palette) {
        let position = self
            .palettes
            .binary_search_by_key(&palette.first_frame(), Palette::first_frame);
        match position {
            Ok(index) => self.palettes[index] = palette,
            Err(index) => self.palettes.insert(index, palette),
        }
    }

    // ----- tilesets -----

    #[must_use]
    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    #[must_use]
    pub fn tileset(&self, index: usize) -> Option<&Tileset> {
        self.tilesets.get(index)
    }

    pub fn tileset_mut(&mut self, index: usize) -> Option<&mut Tileset> {
        self.tilesets.get_mut(index)
    }

    /// Appends a tileset, returning its index.
    pub fn add_tileset(&mut self, tileset: Tileset) -> usize {
        self.tilesets.push(tileset);
        self.tilesets.len() - 1
    }

    // ----- tags -----

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut [Tag] {
        &mut self.tags
    }

    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    // ----- slices -----

    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn slices_mut(&mut self) -> &mut [Slice] {
        &mut self.slices
    }

    pub fn add_slice(&mut self, slice: Slice) {
        self.slices.push(slice);
    }

    // ----- user data -----

    #[must_use]
    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        &mut self.user_data
    }
}
