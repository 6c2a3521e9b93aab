//! Feed retrieval and parsing.
//!
//! - **Entries**: the immutable [`Entry`] record and its date handling
//! - **Parsing**: a single streaming pass from RSS XML to `Vec<Entry>`
//! - **Fetching**: one HTTP GET with connect/read timeouts, no retries
//! - **Refreshing**: fetch-then-parse on a background task, one at a time
//!
//! # Example
//!
//! ```no_run
//! use pullfeed::feed::{build_client, fetch_and_parse, FetchConfig, ParseOptions};
//!
//! # async fn example() -> Result<(), pullfeed::feed::FeedError> {
//! let client = build_client(&FetchConfig::default())?;
//! let mut entries =
//!     fetch_and_parse(&client, "http://news.ycombinator.com/rss", &ParseOptions::default())
//!         .await?;
//! entries.sort(); // most recent first
//! # Ok(())
//! # }
//! ```

mod date;
mod entry;
mod error;
mod fetcher;
mod parser;
mod refresh;

pub use date::{format_feed_date, parse_feed_date, FEED_DATE_FORMAT};
pub use entry::{Entry, EntryBuilder, EntryError};
pub use error::{ErrorKind, FeedError};
pub use fetcher::{
    build_client, fetch_and_parse, fetch_feed, FetchConfig, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_READ_TIMEOUT,
};
pub use parser::{parse_entries, parse_entries_from_bytes, ParseOptions};
pub use refresh::{FeedView, RefreshEvent, RefreshRequest, Refresher};
