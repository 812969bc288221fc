//! Delimiter search that steps over length-prefixed strings.
//!
//! Protocol layers built on bynar split payloads on punctuation such as
//! `)` or `|`. A plain byte search would stop inside a string payload that
//! happens to contain the delimiter, so callers use [`find_delimiter`]
//! instead.

use crate::tag::{LEN_SEP, Tag};

/// Index of the first `delim` in `buf` that is not inside a string payload.
///
/// Any `s<digits>:` header is treated as the start of a string and its
/// payload is skipped whole. Returns `None` if `delim` does not occur, or
/// if a string payload runs past the end of `buf`.
///
/// ```
/// use bynar::find_delimiter;
///
/// // The `)` inside the string payload is skipped.
/// assert_eq!(find_delimiter(b"s3:f()))", b')'), Some(6));
/// assert_eq!(find_delimiter(b"i1;", b')'), None);
/// ```
#[must_use]
pub fn find_delimiter(buf: &[u8], delim: u8) -> Option<usize> {
    let mut i = 0;
    while let Some(&b) = buf.get(i) {
        if b == Tag::String.byte()
            && let Some((payload_start, len)) = string_header(buf, i)
        {
            i = payload_start.checked_add(len).filter(|&end| end <= buf.len())?;
            continue;
        }
        if b == delim {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Parse `s<digits>:` at `at`, returning the payload start and length.
fn string_header(buf: &[u8], at: usize) -> Option<(usize, usize)> {
    let digits_start = at + 1;
    let digits = buf
        .get(digits_start..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let colon = digits_start + digits;
    if digits == 0 || buf.get(colon) != Some(&LEN_SEP) {
        return None;
    }
    let len = crate::tag::parse_decimal_len(&buf[digits_start..colon])?;
    Some((colon + 1, len))
}
