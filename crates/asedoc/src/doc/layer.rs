use std::collections::BTreeMap;

use bitflags::bitflags;

use super::cel::Cel;
use super::image::Image;
use super::user_data::UserData;
use crate::error::{Error, Result};

bitflags! {
    /// On-wire layer flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u16 {
        const VISIBLE = 0x0001;
        const EDITABLE = 0x0002;
        const LOCK_MOVEMENT = 0x0004;
        const BACKGROUND = 0x0008;
        const PREFER_LINKED_CELS = 0x0010;
        const COLLAPSED = 0x0020;
        const REFERENCE = 0x0040;
    }
}

/// Blend mode applied when compositing a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BlendMode {
    Normal = 0,
    Multiply = 1,
    Screen = 2,
    Overlay = 3,
    Darken = 4,
    Lighten = 5,
    ColorDodge = 6,
    ColorBurn = 7,
    HardLight = 8,
    SoftLight = 9,
    Difference = 10,
    Exclusion = 11,
    Hue = 12,
    Saturation = 13,
    Color = 14,
    Luminosity = 15,
    Addition = 16,
    Subtraction = 17,
    Divide = 18,
}

impl BlendMode {
    /// Unknown wire values clamp to the highest known mode.
    #[must_use]
    pub fn from_wire(value: u16) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Multiply,
            2 => Self::Screen,
            3 => Self::Overlay,
            4 => Self::Darken,
            5 => Self::Lighten,
            6 => Self::ColorDodge,
            7 => Self::ColorBurn,
            8 => Self::HardLight,
            9 => Self::SoftLight,
            10 => Self::Difference,
            11 => Self::Exclusion,
            12 => Self::Hue,
            13 => Self::Saturation,
            14 => Self::Color,
            15 => Self::Luminosity,
            16 => Self::Addition,
            17 => Self::Subtraction,
            _ => Self::Divide,
        }
    }

    #[must_use]
    pub fn to_wire(self) -> u16 {
        self as u16
    }
}

/// The fields shared by every layer variant.
#[derive(Debug, Clone)]
pub struct LayerCore {
    name: String,
    flags: LayerFlags,
    opacity: u8,
    blend_mode: BlendMode,
    user_data: UserData,
}

impl LayerCore {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: LayerFlags::VISIBLE | LayerFlags::EDITABLE,
            opacity: 255,
            blend_mode: BlendMode::Normal,
            user_data: UserData::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: LayerFlags) {
        self.flags = flags;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    #[must_use]
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    #[must_use]
    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        &mut self.user_data
    }
}

/// A raster layer: one optional cel per frame.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    core: LayerCore,
    cels: BTreeMap<u16, Cel>,
}

impl ImageLayer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: LayerCore::new(name),
            cels: BTreeMap::new(),
        }
    }
}

/// A container layer: an ordered list of children, bottom-to-top in
/// display order.
#[derive(Debug, Clone)]
pub struct GroupLayer {
    core: LayerCore,
    children: Vec<Layer>,
}

impl GroupLayer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: LayerCore::new(name),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn core(&self) -> &LayerCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    #[must_use]
    pub fn children(&self) -> &[Layer] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.children
    }

    /// Appends a child at the top of this group, returning it.
    pub fn push(&mut self, layer: Layer) -> &mut Layer {
        self.children.push(layer);
        self.children.last_mut().unwrap()
    }

    /// Pre-order depth-first traversal of all descendants: each layer is
    /// visited before its contents, groups before their children. The
    /// depth of this group's immediate children is 0.
    #[must_use]
    pub fn flatten(&self) -> Vec<(u16, &Layer)> {
        fn walk<'a>(group: &'a GroupLayer, depth: u16, out: &mut Vec<(u16, &'a Layer)>) {
            for child in group.children() {
                out.push((depth, child));
                if let Layer::Group(inner) = child {
                    walk(inner, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, 0, &mut out);
        out
    }

    /// Applies `f` to every descendant layer, pre-order.
    pub fn for_each_layer_mut(&mut self, f: &mut impl FnMut(&mut Layer)) {
        for child in &mut self.children {
            f(child);
            if let Layer::Group(inner) = child {
                inner.for_each_layer_mut(f);
            }
        }
    }
}

/// A tilemap layer: cels hold tile cells instead of pixels, drawn from
/// one tileset. Its local grid is the referenced tileset's tile size.
#[derive(Debug, Clone)]
pub struct TilemapLayer {
    core: LayerCore,
    tileset_index: u32,
    cels: BTreeMap<u16, Cel>,
}

impl TilemapLayer {
    #[must_use]
    pub fn new(name: impl Into<String>, tileset_index: u32) -> Self {
        Self {
            core: LayerCore::new(name),
            tileset_index,
            cels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn tileset_index(&self) -> u32 {
        self.tileset_index
    }

    pub fn set_tileset_index(&mut self, tileset_index: u32) {
        self.tileset_index = tileset_index;
    }
}

/// A layer of any kind. Cel-carrying operations are defined on the
/// image and tilemap variants; they fail on groups.
#[derive(Debug, Clone)]
pub enum Layer {
    Image(ImageLayer),
    Group(GroupLayer),
    Tilemap(TilemapLayer),
}

impl From<ImageLayer> for Layer {
    fn from(layer: ImageLayer) -> Self {
        Layer::Image(layer)
    }
}

impl From<GroupLayer> for Layer {
    fn from(layer: GroupLayer) -> Self {
        Layer::Group(layer)
    }
}

impl From<TilemapLayer> for Layer {
    fn from(layer: TilemapLayer) -> Self {
        Layer::Tilemap(layer)
    }
}

impl Layer {
    #[must_use]
    pub fn core(&self) -> &LayerCore {
        match self {
            Layer::Image(layer) => &layer.core,
            Layer::Group(layer) => &layer.core,
            Layer::Tilemap(layer) => &layer.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut LayerCore {
        match self {
            Layer::Image(layer) => &mut layer.core,
            Layer::Group(layer) => &mut layer.core,
            Layer::Tilemap(layer) => &mut layer.core,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.core().name()
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Layer::Group(_))
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&GroupLayer> {
        match self {
            Layer::Group(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupLayer> {
        match self {
            Layer::Group(layer) => Some(layer),
            _ => None,
        }
    }

    /// The frame-to-cel map of a drawable layer; `None` for groups.
    #[must_use]
    pub fn cels(&self) -> Option<&BTreeMap<u16, Cel>> {
        match self {
            Layer::Image(layer) => Some(&layer.cels),
            Layer::Tilemap(layer) => Some(&layer.cels),
            Layer::Group(_) => None,
        }
    }

    fn cels_mut(&mut self) -> Option<&mut BTreeMap<u16, Cel>> {
        match self {
            Layer::Image(layer) => Some(&mut layer.cels),
            Layer::Tilemap(layer) => Some(&mut layer.cels),
            Layer::Group(_) => None,
        }
    }

    #[must_use]
    pub fn cel(&self, frame: u16) -> Option<&Cel> {
        self.cels()?.get(&frame)
    }

    pub fn cel_mut(&mut self, frame: u16) -> Option<&mut Cel> {
        self.cels_mut()?.get_mut(&frame)
    }

    /// Places a cel at `frame`, overwriting any existing one.
    pub fn add_cel(&mut self, frame: u16, cel: Cel) -> Result<()> {
        let Some(cels) = self.cels_mut() else {
            return Err(Error::InvalidData(
                "group layers cannot hold cels".into(),
            ));
        };
        cels.insert(frame, cel);
        Ok(())
    }

    pub fn remove_cel(&mut self, frame: u16) -> Option<Cel> {
        self.cels_mut()?.remove(&frame)
    }

    /// The cel whose pixels back the cel at `frame`: the cel itself when
    /// it owns an image, its target when linked. Links never chain, so
    /// one hop resolves.
    #[must_use]
    pub fn resolve_cel(&self, frame: u16) -> Option<&Cel> {
        let cel = self.cel(frame)?;
        match cel.linked_to() {
            None => Some(cel),
            Some(target) => self.cel(target).filter(|target| !target.is_linked()),
        }
    }

    #[must_use]
    pub fn resolve_image(&self, frame: u16) -> Option<&Image> {
        self.resolve_cel(frame)?.image()
    }

    /// Turns a linked cel into one owning a copy of its target's image.
    /// A cel that already owns its image is left untouched.
    pub fn unlink_cel(&mut self, frame: u16) -> Result<()> {
        let Some(cel) = self.cel(frame) else {
            return Err(Error::InvalidData(format!("no cel at frame {frame}")));
        };
        if !cel.is_linked() {
            return Ok(());
        }
        let Some(image) = self.resolve_image(frame).cloned() else {
            return Err(Error::InvalidData(format!(
                "cel at frame {frame} links to a missing cel"
            )));
        };
        self.cel_mut(frame).unwrap().adopt_image(image);
        Ok(())
    }

    /// An unlinked copy of the cel at `frame`, if one can be resolved.
    #[must_use]
    pub fn duplicate_cel(&self, frame: u16) -> Option<Cel> {
        let cel = self.cel(frame)?;
        let image = self.resolve_image(frame)?.clone();
        Some(cel.duplicate_with_image(image))
    }

    /// Renumbers cels at or past `from_frame` by `delta` when frames are
    /// inserted or removed, keeping link targets coherent. Cels that
    /// would land outside the frame range are dropped.
    pub fn shift_cels(&mut self, from_frame: u16, delta: i32) {
        let Some(cels) = self.cels_mut() else {
            return;
        };
        let shifted = |frame: u16| -> Option<u16> {
            if frame < from_frame {
                return Some(frame);
            }
            u16::try_from(i32::from(frame) + delta).ok()
        };
        let old = std::mem::take(cels);
        for (frame, mut cel) in old {
            let Some(new_frame) = shifted(frame) else {
                continue;
            };
            if let Some(target) = cel.linked_to() {
                match shifted(target) {
                    Some(new_target) => cel.retarget_link(new_target),
                    None => continue,
                }
            }
            cels.insert(new_frame, cel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::image::ColorMode;

    fn red_pixel() -> Image {
        Image::from_vec(ColorMode::Rgba, 1, 1, vec![255, 0, 0, 255]).unwrap()
    }

    #[test]
    fn unknown_blend_mode_clamps_to_highest() {
        assert_eq!(BlendMode::from_wire(1000), BlendMode::Divide);
        assert_eq!(BlendMode::from_wire(16), BlendMode::Addition);
    }

    #[test]
    fn groups_reject_cels() {
        let mut group = Layer::Group(GroupLayer::new("g"));
        assert!(group.add_cel(0, Cel::linked(0)).is_err());
    }

    #[test]
    fn linked_cels_resolve_one_hop() {
        let mut layer = Layer::Image(ImageLayer::new("L"));
        layer.add_cel(0, Cel::from_image(0, 0, red_pixel())).unwrap();
        layer.add_cel(1, Cel::linked(0)).unwrap();
        assert_eq!(
            layer.resolve_image(1).unwrap().bytes(),
            &[255, 0, 0, 255]
        );
    }

    #[test]
    fn unlink_copies_the_target_image() {
        let mut layer = Layer::Image(ImageLayer::new("L"));
        layer.add_cel(0, Cel::from_image(0, 0, red_pixel())).unwrap();
        layer.add_cel(1, Cel::linked(0)).unwrap();
        layer.unlink_cel(1).unwrap();
        assert!(!layer.cel(1).unwrap().is_linked());
        layer.cel_mut(0).unwrap().image_mut().unwrap().bytes_mut()[0] = 0;
        assert_eq!(layer.resolve_image(1).unwrap().bytes()[0], 255);
    }

    #[test]
    fn duplicate_is_always_unlinked() {
        let mut layer = Layer::Image(ImageLayer::new("L"));
        layer.add_cel(0, Cel::from_image(3, 4, red_pixel())).unwrap();
        layer.add_cel(2, Cel::linked(0)).unwrap();
        let copy = layer.duplicate_cel(2).unwrap();
        assert!(!copy.is_linked());
        assert_eq!((copy.x(), copy.y()), (0, 0));
        assert_eq!(copy.image().unwrap().bytes(), &[255, 0, 0, 255]);
    }

    #[test]
    fn shift_renumbers_cels_and_links() {
        let mut layer = Layer::Image(ImageLayer::new("L"));
        layer.add_cel(0, Cel::from_image(0, 0, red_pixel())).unwrap();
        layer.add_cel(1, Cel::from_image(0, 0, red_pixel())).unwrap();
        layer.add_cel(2, Cel::linked(1)).unwrap();
        layer.shift_cels(1, 1);
        assert!(layer.cel(1).is_none());
        assert!(layer.cel(2).unwrap().image().is_some());
        assert_eq!(layer.cel(3).unwrap().linked_to(), Some(2));
    }

    #[test]
    fn flatten_is_preorder_groups_first() {
        let mut root = GroupLayer::new("root");
        root.push(ImageLayer::new("a").into());
        let group = root.push(GroupLayer::new("g").into());
        group
            .as_group_mut()
            .unwrap()
            .push(ImageLayer::new("b").into());
        root.push(ImageLayer::new("c").into());
        let flat: Vec<(u16, &str)> = root
            .flatten()
            .into_iter()
            .map(|(depth, layer)| (depth, layer.name()))
            .collect();
        assert_eq!(flat, vec![(0, "a"), (0, "g"), (1, "b"), (0, "c")]);
    }
}
