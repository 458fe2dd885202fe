use super::user_data::UserData;

/// One keyframe of a slice: bounds plus optional 9-slice center and
/// optional pivot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceKey {
    frame: u32,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    center: Option<(i32, i32, u32, u32)>,
    pivot: Option<(i32, i32)>,
}

impl SliceKey {
    #[must_use]
    pub fn new(frame: u32, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            frame,
            x,
            y,
            width,
            height,
            center: None,
            pivot: None,
        }
    }

    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[must_use]
    pub fn bounds(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn center(&self) -> Option<(i32, i32, u32, u32)> {
        self.center
    }

    pub fn set_center(&mut self, center: Option<(i32, i32, u32, u32)>) {
        self.center = center;
    }

    #[must_use]
    pub fn pivot(&self) -> Option<(i32, i32)> {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: Option<(i32, i32)>) {
        self.pivot = pivot;
    }
}

/// A named region keyed by frame. The key active at frame `F` is the one
/// with the greatest `frame <= F`.
#[derive(Debug, Clone)]
pub struct Slice {
    name: String,
    keys: Vec<SliceKey>,
    user_data: UserData,
}

impl Slice {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
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
    pub fn keys(&self) -> &[SliceKey] {
        &self.keys
    }

    /// Inserts a key, keeping keys ordered by frame. A key at an already
    /// present frame replaces the old one.
    pub fn add_key(&mut self, key: SliceKey) {
        match self.keys.binary_search_by_key(&key.frame(), SliceKey::frame) {
            Ok(at) => self.keys[at] = key,
            Err(at) => self.keys.insert(at, key),
        }
    }

    /// The key with the greatest `frame <= F`, if any.
    #[must_use]
    pub fn key_at(&self, frame: u32) -> Option<&SliceKey> {
        self.keys.iter().rev().find(|key| key.frame() <= frame)
    }

    /// True when at least one key carries a 9-slice center.
    #[must_use]
    pub fn has_nine_slice(&self) -> bool {
        self.keys.iter().any(|key| key.center().is_some())
    }

    /// True when at least one key carries a pivot.
    #[must_use]
    pub fn has_pivot(&self) -> bool {
        self.keys.iter().any(|key| key.pivot().is_some())
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
    fn keys_stay_ordered_and_replace_on_same_frame() {
        let mut slice = Slice::new("ui");
        slice.add_key(SliceKey::new(4, 0, 0, 8, 8));
        slice.add_key(SliceKey::new(0, 0, 0, 4, 4));
        slice.add_key(SliceKey::new(4, 1, 1, 9, 9));
        let frames: Vec<u32> = slice.keys().iter().map(SliceKey::frame).collect();
        assert_eq!(frames, vec![0, 4]);
        assert_eq!(slice.keys()[1].bounds(), (1, 1, 9, 9));
    }

    #[test]
    fn active_key_is_greatest_at_or_before() {
        let mut slice = Slice::new("ui");
        slice.add_key(SliceKey::new(2, 0, 0, 1, 1));
        slice.add_key(SliceKey::new(5, 0, 0, 2, 2));
        assert!(slice.key_at(1).is_none());
        assert_eq!(slice.key_at(2).unwrap().frame(), 2);
        assert_eq!(slice.key_at(4).unwrap().frame(), 2);
        assert_eq!(slice.key_at(9).unwrap().frame(), 5);
    }

    #[test]
    fn feature_flags_or_across_keys() {
        let mut slice = Slice::new("ui");
        let mut with_center = SliceKey::new(0, 0, 0, 8, 8);
        with_center.set_center(Some((1, 1, 6, 6)));
        slice.add_key(with_center);
        slice.add_key(SliceKey::new(3, 0, 0, 8, 8));
        assert!(slice.has_nine_slice());
        assert!(!slice.has_pivot());
    }
}
