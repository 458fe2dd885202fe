use std::path::{Path, PathBuf};

use super::sprite::Sprite;

/// A sprite plus the file bookkeeping the codec maintains: the path it
/// was last decoded from or encoded to, and a modified flag.
#[derive(Debug, Clone)]
pub struct Document {
    sprite: Sprite,
    path: Option<PathBuf>,
    modified: bool,
}

impl Document {
    #[must_use]
    pub fn new(sprite: Sprite) -> Self {
        Self {
            sprite,
            path: None,
            modified: false,
        }
    }

    #[must_use]
    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    /// Mutable access marks the document modified.
    pub fn sprite_mut(&mut self) -> &mut Sprite {
        self.modified = true;
        &mut self.sprite
    }

    #[must_use]
    pub fn into_sprite(self) -> Sprite {
        self.sprite
    }

    /// Where the document was last decoded from or encoded to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn record_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }
}
