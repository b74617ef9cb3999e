pub mod config;
pub mod core;
pub mod shell;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{ConfigError, VoiceConfig};
pub use crate::core::*;
pub use shell::{PresentationShell, ShellState};
