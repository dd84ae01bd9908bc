//! Subcommand definitions.

use clap::Subcommand;
use newscast_core::CategoryId;

use crate::adapters::DEFAULT_CHARS_PER_SECOND;

#[derive(Subcommand)]
pub enum Commands {
    /// Play news continuously, resuming where the category left off
    Play {
        /// Category key or label (domestic, international, life, tech)
        category: Option<CategoryId>,

        /// Stop after this many items were read to completion
        #[arg(long)]
        count: Option<usize>,

        /// Read a single item instead of advancing automatically
        #[arg(long)]
        manual: bool,

        /// Reading pace in characters per second
        #[arg(long, default_value_t = DEFAULT_CHARS_PER_SECOND)]
        rate: u32,
    },

    /// List categories, their channels and saved positions
    Categories {
        /// Fetch every category and show how many unplayed items it has
        #[arg(long)]
        fetch: bool,
    },

    /// Show listening history
    History {
        /// Forget played items and saved positions
        #[arg(long)]
        reset: bool,
    },
}
