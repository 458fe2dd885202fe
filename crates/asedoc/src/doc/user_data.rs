use super::color::Rgba32;

/// Free-form metadata attachable to most document entities: optional
/// UTF-8 text and an optional color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    text: Option<String>,
    color: Option<Rgba32>,
}

impl UserData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    #[must_use]
    pub fn color(&self) -> Option<Rgba32> {
        self.color
    }

    pub fn set_color(&mut self, color: Option<Rgba32>) {
        self.color = color;
    }

    #[must_use]
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    #[must_use]
    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.color.is_none()
    }
}
