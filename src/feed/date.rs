use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};

/// RFC-822 style layout used by RSS `<pubDate>` values, e.g.
/// `Mon, 02 Jan 2006 15:04:05 +0000`.
pub const FEED_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`FEED_DATE_FORMAT`] without the leading weekday.
const UNDATED_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Number of digits in a complete numeric zone offset (`+hhmm`).
const OFFSET_DIGITS: usize = 4;

/// Parses a feed date string into a zoned timestamp.
///
/// Numeric zone offsets that are shorter than `+hhmm` (`+1`, `-05`, `+010`)
/// are padded with trailing zeros first. The strict [`FEED_DATE_FORMAT`]
/// layout is tried before the more lenient RFC 2822 parser, which also
/// accepts named zones such as `GMT` or `EST`. A leading weekday is only
/// checked against the date when that check passes; otherwise it is ignored
/// and the rest of the value is parsed on its own.
///
/// # Errors
///
/// Returns the strict-layout [`chrono::ParseError`] when neither parser
/// accepts the (padded) input, including when the input is empty.
pub fn parse_feed_date(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let padded = pad_zone_offset(raw.trim());

    let strict_err = match DateTime::parse_from_str(&padded, FEED_DATE_FORMAT) {
        Ok(dt) => return Ok(dt),
        Err(e) => e,
    };
    if let Ok(dt) = DateTime::parse_from_rfc2822(&padded) {
        return Ok(dt);
    }

    // Feeds regularly carry a weekday that disagrees with the date; the date wins
    match strip_weekday(&padded) {
        Some(undated) => DateTime::parse_from_str(undated, UNDATED_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc2822(undated))
            .map_err(|_| strict_err),
        None => Err(strict_err),
    }
}

/// Formats a timestamp with [`FEED_DATE_FORMAT`].
pub fn format_feed_date(date: &DateTime<FixedOffset>) -> String {
    date.format(FEED_DATE_FORMAT).to_string()
}

/// Returns the value after a leading `"Xxx, "` weekday, if there is one.
fn strip_weekday(date: &str) -> Option<&str> {
    let (weekday, rest) = date.split_once(',')?;
    if weekday.len() == 3 && weekday.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn pad_zone_offset(date: &str) -> Cow<'_, str> {
    let zone = match date.rsplit_once(char::is_whitespace) {
        Some((_, zone)) => zone,
        None => return Cow::Borrowed(date),
    };

    let digits = match zone.strip_prefix(['+', '-']) {
        Some(digits) => digits,
        None => return Cow::Borrowed(date),
    };

    if digits.is_empty()
        || digits.len() >= OFFSET_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Cow::Borrowed(date);
    }

    let mut padded = String::with_capacity(date.len() + OFFSET_DIGITS - digits.len());
    padded.push_str(date);
    padded.extend(std::iter::repeat('0').take(OFFSET_DIGITS - digits.len()));
    Cow::Owned(padded)
}
