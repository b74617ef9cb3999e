//! Presentation shell for the voice modal.
//!
//! The shell subscribes to one session client and keeps the display state the
//! page renders: avatar animation, orb color, modal flags, transcript text and
//! the last error.

mod avatar;
mod presenter;

pub use avatar::{AvatarColor, AvatarState};
pub use presenter::{CONNECT_FAILED_MESSAGE, PresentationShell, ShellState};
