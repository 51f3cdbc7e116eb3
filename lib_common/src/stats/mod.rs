//! # Aggregate Statistics Module
//!
//! Pure text statistics over ingested feed content. Nothing in here touches
//! the network or shared state; callers hand in a snapshot and get back a
//! freshly computed ranking.

#![forbid(unsafe_code)]

/// Top-N token frequency ranking.
pub mod top_tokens;

pub use top_tokens::{get_top, HASHTAG_PATTERN, MENTION_PATTERN};
