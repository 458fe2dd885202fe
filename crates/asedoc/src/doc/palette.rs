use super::color::Rgba32;

/// The most entries a palette can hold; indexed pixels are one byte.
pub(crate) const MAX_PALETTE_ENTRIES: usize = 256;

/// An ordered list of colors, tagged with the first frame it applies to.
///
/// A sprite keeps its palettes sorted ascending by that frame; the
/// palette "in effect" at frame `F` is the one with the greatest
/// `first_frame <= F`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    first_frame: u16,
    entries: Vec<Rgba32>,
}

impl Palette {
    #[must_use]
    pub fn new(first_frame: u16) -> Self {
        Self {
            first_frame,
            entries: Vec::new(),
        }
    }

    /// A palette pre-sized with opaque black entries.
    #[must_use]
    pub fn with_size(first_frame: u16, len: usize) -> Self {
        let mut palette = Self::new(first_frame);
        palette.resize(len);
        palette
    }

    #[must_use]
    pub fn first_frame(&self) -> u16 {
        self.first_frame
    }

    pub fn set_first_frame(&mut self, frame: u16) {
        self.first_frame = frame;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Grows (with opaque black) or shrinks to `len` entries, capped at
    /// 256.
    pub fn resize(&mut self, len: usize) {
        self.entries
            .resize(len.min(MAX_PALETTE_ENTRIES), Rgba32::new(0, 0, 0, 255));
    }

    #[must_use]
    pub fn color(&self, index: usize) -> Option<Rgba32> {
        self.entries.get(index).copied()
    }

    /// Overwrites one entry. Panics when `index` is out of range.
    pub fn set_color(&mut self, index: usize, color: Rgba32) {
        self.entries[index] = color;
    }

    #[must_use]
    pub fn colors(&self) -> &[Rgba32] {
        &self.entries
    }

    /// The entry closest to the target by Euclidean distance in RGB
    /// space (alpha is ignored). Ties resolve to the lowest index.
    #[must_use]
    pub fn find_closest(&self, r: u8, g: u8, b: u8) -> Option<usize> {
        let distance_sq = |entry: &Rgba32| -> u32 {
            let dr = i32::from(entry.r()) - i32::from(r);
            let dg = i32::from(entry.g()) - i32::from(g);
            let db = i32::from(entry.b()) - i32::from(b);
            (dr * dr + dg * dg + db * db).unsigned_abs()
        };
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| distance_sq(entry))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_fills_with_opaque_black() {
        let mut palette = Palette::new(0);
        palette.resize(2);
        assert_eq!(palette.color(1), Some(Rgba32::new(0, 0, 0, 255)));
        palette.resize(1);
        assert_eq!(palette.len(), 1);
    }

    #[test]
    fn resize_caps_at_256() {
        let mut palette = Palette::new(0);
        palette.resize(10_000);
        assert_eq!(palette.len(), 256);
    }

    #[test]
    fn closest_entry_by_rgb_distance() {
        let mut palette = Palette::with_size(0, 3);
        palette.set_color(0, Rgba32::new(0, 0, 0, 255));
        palette.set_color(1, Rgba32::new(200, 0, 0, 255));
        palette.set_color(2, Rgba32::new(255, 255, 255, 255));
        assert_eq!(palette.find_closest(220, 10, 10), Some(1));
        assert_eq!(palette.find_closest(250, 250, 250), Some(2));
        assert_eq!(Palette::new(0).find_closest(0, 0, 0), None);
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let mut palette = Palette::with_size(0, 2);
        palette.set_color(0, Rgba32::new(10, 0, 0, 255));
        palette.set_color(1, Rgba32::new(10, 0, 0, 255));
        assert_eq!(palette.find_closest(10, 0, 0), Some(0));
    }
}
