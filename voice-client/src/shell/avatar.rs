//! Avatar display model.

use std::fmt;

use crate::core::realtime::Status;

/// Animation state of the avatar orb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvatarState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
    Asleep,
}

impl AvatarState {
    /// Avatar state shown for a session status.
    ///
    /// `connecting` renders as thinking; `connected` and `disconnected`
    /// render as idle.
    pub fn for_status(status: Status) -> Self {
        match status {
            Status::Connecting | Status::Thinking => Self::Thinking,
            Status::Listening => Self::Listening,
            Status::Speaking => Self::Speaking,
            Status::Idle | Status::Connected | Status::Disconnected => Self::Idle,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
            Self::Asleep => "asleep",
        }
    }
}

impl fmt::Display for AvatarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orb color palette. The discriminant is the value fed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AvatarColor {
    Black = 0,
    White = 1,
    Red = 2,
    Orange = 3,
    Yellow = 4,
    Green = 5,
    Cyan = 6,
    Blue = 7,
    Purple = 8,
    Pink = 9,
}

impl AvatarColor {
    /// Parse an uppercase or lowercase color name. Unknown names fall back to white.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "BLACK" => Self::Black,
            "WHITE" => Self::White,
            "RED" => Self::Red,
            "ORANGE" => Self::Orange,
            "YELLOW" => Self::Yellow,
            "GREEN" => Self::Green,
            "CYAN" => Self::Cyan,
            "BLUE" => Self::Blue,
            "PURPLE" => Self::Purple,
            "PINK" => Self::Pink,
            _ => Self::White,
        }
    }

    #[inline]
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Black => "BLACK",
            Self::White => "WHITE",
            Self::Red => "RED",
            Self::Orange => "ORANGE",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
            Self::Cyan => "CYAN",
            Self::Blue => "BLUE",
            Self::Purple => "PURPLE",
            Self::Pink => "PINK",
        }
    }
}

impl fmt::Display for AvatarColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
