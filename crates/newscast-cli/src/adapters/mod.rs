//! Concrete port implementations wired in by the CLI.

mod console_speech;
mod sina;

pub use console_speech::{ConsoleSpeech, DEFAULT_CHARS_PER_SECOND};
pub use sina::{SinaConfig, SinaRollSource, decode_roll_response};
