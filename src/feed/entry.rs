use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::date::{format_feed_date, parse_feed_date};

/// Errors raised while validating the fields of a feed entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// A required field never appeared inside the `<item>`.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// The `<link>` value is not a well-formed absolute URL.
    #[error("Invalid link '{link}': {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },
    /// The `<pubDate>` value could not be parsed, even after padding the zone offset.
    #[error("Invalid publish date '{raw}': {source}")]
    InvalidDate {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A single item parsed from a feed.
///
/// Entries are immutable once built. Two entries are equal (and hash the same)
/// when all four fields are equal.
///
/// # Ordering
///
/// Entries order by publish date, most recent first. An entry without a date
/// sorts after every dated entry. Equal dates (or two undated entries) fall
/// back to title, link, then description so the ordering agrees with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entry {
    title: String,
    link: Url,
    description: Option<String>,
    published: Option<DateTime<FixedOffset>>,
}

impl Entry {
    pub fn builder() -> EntryBuilder {
        EntryBuilder::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &Url {
        &self.link
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn published(&self) -> Option<&DateTime<FixedOffset>> {
        self.published.as_ref()
    }

    /// The publish date rendered in the feed's own date layout.
    pub fn formatted_date(&self) -> Option<String> {
        self.published.as_ref().map(format_feed_date)
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_date = match (&self.published, &other.published) {
            (Some(mine), Some(theirs)) => theirs.cmp(mine),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        by_date
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.link.cmp(&other.link))
            .then_with(|| self.description.cmp(&other.description))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        if let Some(date) = self.formatted_date() {
            writeln!(f, "Date: {}", date)?;
        }
        write!(f, "Link: {}", self.link)?;
        if let Some(description) = &self.description {
            write!(f, "\nDescription: {}", description)?;
        }
        Ok(())
    }
}

/// Accumulates the fields of an entry while the parser is inside an `<item>`.
///
/// Link and date values are validated as soon as they are set, so the error
/// names the offending raw value.
#[derive(Debug, Default)]
pub struct EntryBuilder {
    title: Option<String>,
    link: Option<Url>,
    description: Option<String>,
    published: Option<DateTime<FixedOffset>>,
}

impl EntryBuilder {
    pub fn set_title(&mut self, raw: &str) -> &mut Self {
        self.title = Some(raw.trim().to_owned());
        self
    }

    pub fn set_link(&mut self, raw: &str) -> Result<&mut Self, EntryError> {
        let trimmed = raw.trim();
        let link = Url::parse(trimmed).map_err(|source| EntryError::InvalidLink {
            link: trimmed.to_owned(),
            source,
        })?;
        self.link = Some(link);
        Ok(self)
    }

    pub fn set_description(&mut self, raw: &str) -> &mut Self {
        self.description = Some(raw.trim().to_owned());
        self
    }

    pub fn set_published(&mut self, raw: &str) -> Result<&mut Self, EntryError> {
        let published = parse_feed_date(raw).map_err(|source| EntryError::InvalidDate {
            raw: raw.trim().to_owned(),
            source,
        })?;
        self.published = Some(published);
        Ok(self)
    }

    /// Validates the accumulated fields and freezes them into an [`Entry`].
    ///
    /// # Errors
    ///
    /// [`EntryError::MissingField`] when no title or no link was set.
    pub fn build(self) -> Result<Entry, EntryError> {
        Ok(Entry {
            title: self.title.ok_or(EntryError::MissingField("title"))?,
            link: self.link.ok_or(EntryError::MissingField("link"))?,
            description: self.description,
            published: self.published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn entry(title: &str, date: Option<&str>) -> Entry {
        let mut builder = Entry::builder();
        builder.set_title(title);
        builder.set_link("http://example.com/a").unwrap();
        if let Some(date) = date {
            builder.set_published(date).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_build_trims_text_fields() {
        let mut builder = Entry::builder();
        builder
            .set_title("  Hello World  ")
            .set_description("\n  <b>escaped</b> body \t");
        builder.set_link(" http://example.com/a ").unwrap();
        let entry = builder.build().unwrap();

        assert_eq!(entry.title(), "Hello World");
        assert_eq!(entry.link().as_str(), "http://example.com/a");
        assert_eq!(entry.description(), Some("<b>escaped</b> body"));
        assert!(entry.published().is_none());
    }

    #[test]
    fn test_relative_link_rejected() {
        let mut builder = Entry::builder();
        let err = builder.set_link("/relative/path").unwrap_err();
        assert!(matches!(err, EntryError::InvalidLink { .. }));
        assert!(err.to_string().contains("/relative/path"));
    }

    #[test]
    fn test_empty_link_rejected() {
        let mut builder = Entry::builder();
        assert!(builder.set_link("").is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut builder = Entry::builder();
        let err = builder.set_published("not a date").unwrap_err();
        assert!(matches!(err, EntryError::InvalidDate { ref raw, .. } if raw == "not a date"));
    }

    #[test]
    fn test_missing_title_or_link() {
        let mut builder = Entry::builder();
        builder.set_link("http://example.com").unwrap();
        assert!(matches!(
            builder.build(),
            Err(EntryError::MissingField("title"))
        ));

        let mut builder = Entry::builder();
        builder.set_title("No link");
        assert!(matches!(
            builder.build(),
            Err(EntryError::MissingField("link"))
        ));
    }

    #[test]
    fn test_published_date_parsed() {
        let entry = entry("Dated", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        assert_eq!(
            entry.published().copied(),
            Some(Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap().fixed_offset())
        );
        assert_eq!(
            entry.formatted_date().as_deref(),
            Some("Mon, 02 Jan 2006 15:04:05 +0000")
        );
    }

    #[test]
    fn test_equal_entries_hash_identically() {
        let a = entry("Same", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        let b = entry("Same", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        let c = entry("Other", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Entry> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_sort_most_recent_first() {
        let older = entry("Older", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        let newer = entry("Newer", Some("Tue, 03 Jan 2006 15:04:05 +0000"));

        let mut entries = vec![older.clone(), newer.clone()];
        entries.sort();
        assert_eq!(entries, vec![newer, older]);
    }

    #[test]
    fn test_undated_entries_sort_last() {
        let undated = entry("Undated", None);
        let dated = entry("Dated", Some("Mon, 02 Jan 2006 15:04:05 +0000"));

        let mut entries = vec![undated.clone(), dated.clone()];
        entries.sort();
        assert_eq!(entries, vec![dated, undated]);
    }

    #[test]
    fn test_same_instant_different_offset_ties_on_title() {
        let a = entry("A", Some("Mon, 02 Jan 2006 16:04:05 +0100"));
        let b = entry("B", Some("Mon, 02 Jan 2006 15:04:05 +0000"));
        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&a), Ordering::Greater);
    }

    #[test]
    fn test_display_lists_fields() {
        let text = entry("Shown", Some("Mon, 02 Jan 2006 15:04:05 +0000")).to_string();
        assert!(text.starts_with("Title: Shown\n"));
        assert!(text.contains("Date: Mon, 02 Jan 2006 15:04:05 +0000"));
        assert!(text.ends_with("Link: http://example.com/a"));
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(entry("Json", Some("Mon, 02 Jan 2006 15:04:05 +0000")))
            .unwrap();
        assert_eq!(json["title"], "Json");
        assert_eq!(json["link"], "http://example.com/a");
        let published = json["published"].as_str().unwrap();
        assert_eq!(
            DateTime::parse_from_rfc3339(published).unwrap(),
            Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap()
        );
        assert!(json["description"].is_null());
    }
}
