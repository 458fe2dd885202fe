use super::color::Rgba32;
use super::user_data::UserData;

/// Playback direction of a tagged frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnimationDirection {
    Forward = 0,
    Reverse = 1,
    PingPong = 2,
    PingPongReverse = 3,
}

impl AnimationDirection {
    /// Unknown wire values clamp to the highest known direction.
    #[must_use]
    pub fn from_wire(value: u8) -> Self {
        match value {
            0 => Self::Forward,
            1 => Self::Reverse,
            2 => Self::PingPong,
            _ => Self::PingPongReverse,
        }
    }

    #[must_use]
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

/// A named animation over the inclusive frame range `[from, to]`.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    from_frame: u16,
    to_frame: u16,
    direction: AnimationDirection,
    /// 0 means repeat forever.
    repeat: u16,
    color: Rgba32,
    user_data: UserData,
}

impl Tag {
    #[must_use]
    pub fn new(name: impl Into<String>, from_frame: u16, to_frame: u16) -> Self {
        Self {
            name: name.into(),
            from_frame,
            to_frame,
            direction: AnimationDirection::Forward,
            repeat: 0,
            color: Rgba32::new(0, 0, 0, 255),
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
    pub fn from_frame(&self) -> u16 {
        self.from_frame
    }

    #[must_use]
    pub fn to_frame(&self) -> u16 {
        self.to_frame
    }

    pub fn set_range(&mut self, from_frame: u16, to_frame: u16) {
        self.from_frame = from_frame;
        self.to_frame = to_frame;
    }

    #[must_use]
    pub fn direction(&self) -> AnimationDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: AnimationDirection) {
        self.direction = direction;
    }

    #[must_use]
    pub fn repeat(&self) -> u16 {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: u16) {
        self.repeat = repeat;
    }

    #[must_use]
    pub fn color(&self) -> Rgba32 {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba32) {
        self.color = color;
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
    fn unknown_direction_clamps_to_highest() {
        assert_eq!(
            AnimationDirection::from_wire(200),
            AnimationDirection::PingPongReverse
        );
        assert_eq!(AnimationDirection::from_wire(2), AnimationDirection::PingPong);
    }
}
