//! Chat text handling for the CineGame host SDK.
//!
//! Chat lines from players never reach game logic raw: they go through a
//! [`ChatPipeline`], which masks denylisted words on a worker thread,
//! annotates emoji from an [`EmojiTable`], and hands results back only when
//! the host drains it from its update loop.
//!
//! The denylist is loaded once at startup with [`load_filter`]. If neither
//! the download nor the cached copy works, chat runs unfiltered and the
//! returned [`FilterOrigin`] says so.

mod emoji;
mod error;
mod filter;
mod pipeline;

pub use emoji::{EmojiMatch, EmojiTable, Rect};
pub use error::ChatError;
pub use filter::{DenylistSource, FilterOrigin, ProfanityFilter, load_filter};
pub use pipeline::{ChatPipeline, FilteredChat};
