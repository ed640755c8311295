//! Output generation for the Markdown tweet log.
//!
//! # Submodules
//!
//! - [`markdown`]: Chooses append vs overwrite and writes one line per tweet
//!
//! # Output Structure
//!
//! ```text
//! tweets.md
//! - 07:15 【X】 11/30 22:41 older post
//! - 07:15 【X】 12/01 21:00 newer post
//! - 19:02 【X】 12/01 23:10 post from a later run (appended)
//! ```
//!
//! Lines from one run share the same leading `HH:MM` (the run's start
//! time) and are sorted by post time.

pub mod markdown;
