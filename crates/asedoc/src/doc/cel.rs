use super::image::Image;
use super::user_data::UserData;

/// What a cel holds: its own pixels, or a link to another frame's cel on
/// the same layer.
#[derive(Debug, Clone)]
pub enum CelContent {
    /// The cel is the sole owner of its image.
    Image(Image),
    /// The cel borrows the image of the cel at this frame. The target
    /// must itself own an image; links never chain.
    Linked(u16),
}

/// The content of one (layer, frame) intersection. The frame number is
/// the key of the owning layer's cel map, not a field here.
#[derive(Debug, Clone)]
pub struct Cel {
    x: i16,
    y: i16,
    opacity: u8,
    z_index: i16,
    content: CelContent,
    user_data: UserData,
}

impl Cel {
    /// A cel owning `image`, positioned at `(x, y)` in canvas pixels.
    #[must_use]
    pub fn from_image(x: i16, y: i16, image: Image) -> Self {
        Self {
            x,
            y,
            opacity: 255,
            z_index: 0,
            content: CelContent::Image(image),
            user_data: UserData::new(),
        }
    }

    /// A cel that resolves to the cel at `frame` on the same layer.
    #[must_use]
    pub fn linked(frame: u16) -> Self {
        Self {
            x: 0,
            y: 0,
            opacity: 255,
            z_index: 0,
            content: CelContent::Linked(frame),
            user_data: UserData::new(),
        }
    }

    #[must_use]
    pub fn x(&self) -> i16 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> i16 {
        self.y
    }

    pub fn set_position(&mut self, x: i16, y: i16) {
        self.x = x;
        self.y = y;
    }

    #[must_use]
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    #[must_use]
    pub fn z_index(&self) -> i16 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: i16) {
        self.z_index = z_index;
    }

    #[must_use]
    pub fn content(&self) -> &CelContent {
        &self.content
    }

    #[must_use]
    pub fn image(&self) -> Option<&Image> {
        match &self.content {
            CelContent::Image(image) => Some(image),
            CelContent::Linked(_) => None,
        }
    }

    pub fn image_mut(&mut self) -> Option<&mut Image> {
        match &mut self.content {
            CelContent::Image(image) => Some(image),
            CelContent::Linked(_) => None,
        }
    }

    #[must_use]
    pub fn linked_to(&self) -> Option<u16> {
        match self.content {
            CelContent::Image(_) => None,
            CelContent::Linked(frame) => Some(frame),
        }
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        matches!(self.content, CelContent::Linked(_))
    }

    /// Replaces a link with an owned copy of the resolved image. Used by
    /// the layer-level unlink operation.
    pub(crate) fn adopt_image(&mut self, image: Image) {
        self.content = CelContent::Image(image);
    }

    /// Repoints a link after frames are renumbered. No-op on owning cels.
    pub(crate) fn retarget_link(&mut self, frame: u16) {
        if let CelContent::Linked(target) = &mut self.content {
            *target = frame;
        }
    }

    /// An unlinked duplicate: same placement and metadata, but always
    /// owning `image`.
    #[must_use]
    pub fn duplicate_with_image(&self, image: Image) -> Cel {
        Cel {
            x: self.x,
            y: self.y,
            opacity: self.opacity,
            z_index: self.z_index,
            content: CelContent::Image(image),
            user_data: self.user_data.clone(),
        }
    }

    #[must_use]
    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        &mut self.user_data
    }
}
