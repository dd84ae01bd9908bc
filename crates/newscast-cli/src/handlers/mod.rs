//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that call the playback controller and format output
//!   for the terminal. No playback logic lives here.

pub mod categories;
pub mod history;
pub mod play;
