use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::entry::{Entry, EntryBuilder};
use super::error::FeedError;

const ITEM: &[u8] = b"item";
const CHANNEL: &[u8] = b"channel";

/// Options that change what the parser extracts.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// When false, `<description>` is skipped and entries carry no description.
    pub include_description: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_description: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    /// Maps a qualified tag name to a recognized item field.
    ///
    /// Matching is ASCII case-insensitive on the full name, so prefixed tags
    /// like `atom:link` are not mistaken for `link`.
    fn from_tag(name: &[u8], options: &ParseOptions) -> Option<Self> {
        if name.eq_ignore_ascii_case(b"title") {
            Some(Field::Title)
        } else if name.eq_ignore_ascii_case(b"link") {
            Some(Field::Link)
        } else if name.eq_ignore_ascii_case(b"description") && options.include_description {
            Some(Field::Description)
        } else if name.eq_ignore_ascii_case(b"pubDate") {
            Some(Field::PubDate)
        } else {
            None
        }
    }

    fn apply(self, builder: &mut EntryBuilder, text: &str) -> Result<(), FeedError> {
        match self {
            Field::Title => {
                builder.set_title(text);
            }
            Field::Link => {
                builder.set_link(text)?;
            }
            Field::Description => {
                builder.set_description(text);
            }
            Field::PubDate => {
                builder.set_published(text)?;
            }
        }
        Ok(())
    }
}

/// What the parser does with a start tag it has just read.
enum Action {
    /// Descend into the element (document structure outside any item)
    Descend,
    /// Begin a new entry
    OpenItem,
    /// Read the element's text into the current entry
    Extract(Field),
    /// Consume the element and all of its children
    Skip,
}

fn classify(start: &BytesStart<'_>, in_item: bool, options: &ParseOptions) -> Action {
    let name = start.name();
    let name = name.as_ref();

    if in_item {
        match Field::from_tag(name, options) {
            Some(field) => Action::Extract(field),
            None => Action::Skip,
        }
    } else if name.eq_ignore_ascii_case(ITEM) {
        Action::OpenItem
    } else {
        Action::Descend
    }
}

/// Parses an RSS channel document into its entries, in document order.
///
/// The input is read once, event by event, so memory use is bounded by the
/// entry being assembled plus the output. The encoding is taken from the
/// byte order mark or XML declaration and defaults to UTF-8.
///
/// Inside an `<item>`, only `title`, `link`, `description` and `pubDate` are
/// read; every other element is consumed whole, whatever it contains. An
/// entry is appended as soon as its `</item>` is seen, and `</channel>` ends
/// the pass without reading the rest of the input.
///
/// The input is not closed; the caller keeps ownership of it.
///
/// # Errors
///
/// The whole pass fails on the first problem, without partial results:
/// - [`FeedError::Xml`] on syntax errors or mismatched end tags
/// - [`FeedError::Truncated`] if the input ends inside an open element
/// - [`FeedError::NoRootElement`] if the input holds no element at all
/// - [`FeedError::InvalidEntry`] if an item lacks a title or link, or has an
///   unparsable link or date
pub fn parse_entries<R: BufRead>(
    input: R,
    options: &ParseOptions,
) -> Result<Vec<Entry>, FeedError> {
    let mut reader = Reader::from_reader(input);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut buf = Vec::new();
    let mut inner_buf = Vec::new();
    // Open elements outside of extracted/skipped subtrees
    let mut depth: usize = 0;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                seen_root = true;
                match classify(&e, current.is_some(), options) {
                    Action::Descend => depth += 1,
                    Action::OpenItem => {
                        depth += 1;
                        current = Some(Entry::builder());
                    }
                    Action::Extract(field) => {
                        let text = read_text(&mut reader, &mut inner_buf)?;
                        if let Some(builder) = current.as_mut() {
                            field.apply(builder, &text)?;
                        }
                    }
                    Action::Skip => skip_element(&mut reader, &mut inner_buf)?,
                }
            }
            Event::Empty(e) => {
                seen_root = true;
                match classify(&e, current.is_some(), options) {
                    Action::Extract(field) => {
                        if let Some(builder) = current.as_mut() {
                            field.apply(builder, "")?;
                        }
                    }
                    Action::OpenItem => entries.push(Entry::builder().build()?),
                    Action::Descend | Action::Skip => {}
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = e.name();
                if name.as_ref().eq_ignore_ascii_case(ITEM) {
                    if let Some(builder) = current.take() {
                        entries.push(builder.build()?);
                    }
                } else if name.as_ref().eq_ignore_ascii_case(CHANNEL) {
                    break;
                }
            }
            Event::Eof => {
                if depth > 0 {
                    return Err(FeedError::Truncated);
                }
                if !seen_root {
                    return Err(FeedError::NoRootElement);
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(entries = entries.len(), "Parsed feed");
    Ok(entries)
}

/// Convenience wrapper for an in-memory document.
pub fn parse_entries_from_bytes(
    bytes: &[u8],
    options: &ParseOptions,
) -> Result<Vec<Entry>, FeedError> {
    parse_entries(bytes, options)
}

/// Reads the text content of the element whose start tag was just consumed,
/// through its matching end tag.
///
/// Text and CDATA directly inside the element are concatenated; entity
/// references are unescaped. Text inside nested child elements is ignored.
/// An element with no text yields an empty string.
fn read_text<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<String, FeedError> {
    let mut text = String::new();
    let mut depth: usize = 0;

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Text(e) if depth == 0 => text.push_str(&e.unescape()?),
            Event::CData(e) if depth == 0 => {
                let decoded = reader
                    .decoder()
                    .decode(&e)
                    .map_err(quick_xml::Error::from)?;
                text.push_str(&decoded);
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    return Ok(text);
                }
                depth -= 1;
            }
            Event::Eof => return Err(FeedError::Truncated),
            _ => {}
        }
    }
}

/// Consumes every event up to and including the end tag that matches the
/// start tag just read.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<(), FeedError> {
    let mut depth: usize = 1;

    while depth != 0 {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(FeedError::Truncated),
            _ => {}
        }
    }
    Ok(())
}
