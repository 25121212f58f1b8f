//! Twitter/X API v2 binding for the tally pipeline.
//!
//! `client` wraps the recent-search and user-lookup endpoints; `types` holds
//! the trimmed response models. Pagination tokens come back in
//! `meta.next_token` and are surfaced to callers as [`crate::Cursor`].
pub mod client;
pub mod types;

pub use client::TwitterApi;
