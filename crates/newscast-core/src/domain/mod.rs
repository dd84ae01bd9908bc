//! Domain types shared by every newscast crate.
//!
//! These are pure data types with no infrastructure dependencies.

mod category;
mod news;
mod playback;

pub use category::{CategoryId, ParseCategoryError};
pub use news::{ChannelItem, NewsItem};
pub use playback::PlaybackState;
