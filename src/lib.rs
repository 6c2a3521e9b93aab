//! Fetch an RSS feed over HTTP and parse it into an ordered list of entries.
//!
//! The [`feed`] module holds the core: the [`feed::Entry`] model, the
//! streaming parser and the fetcher. [`config`] holds the settings a front
//! end resolves before it calls into the core.

pub mod config;
pub mod feed;
pub mod util;
