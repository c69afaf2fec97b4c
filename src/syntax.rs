//! Wire syntax: delimiters, escaping and binary-aware splitting
//!
//! The wire format is plain text with three reserved delimiters and one
//! escape character. Binary fields are framed as `@<length>@<bytes>` and
//! their payload is skipped verbatim while splitting, because raw bytes may
//! contain any delimiter.

use crate::error::{Error, Result};

/// Terminates a segment
pub const SEGMENT_DELIMITER: u8 = b'\'';

/// Separates fields within a segment
pub const FIELD_DELIMITER: u8 = b'+';

/// Separates members within a field group
pub const GROUP_DELIMITER: u8 = b':';

/// Escapes a delimiter (or itself) appearing literally in data
pub const ESCAPE_CHARACTER: u8 = b'?';

/// Marks the length framing of a binary field
pub const BINARY_MARKER: u8 = b'@';

#[inline]
fn is_reserved(byte: u8) -> bool {
    matches!(
        byte,
        SEGMENT_DELIMITER | FIELD_DELIMITER | GROUP_DELIMITER | ESCAPE_CHARACTER
    )
}

/// Escape every reserved character in `text` with the escape character.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() && is_reserved(ch as u8) {
            out.push(ESCAPE_CHARACTER as char);
        }
        out.push(ch);
    }
    out
}

/// Undo [`escape`]: `??`, `?'`, `?+` and `?:` become the literal character.
///
/// An escape character before anything else is kept as-is, so unescaping is
/// lenient on input this crate did not produce.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ESCAPE_CHARACTER as char {
            match chars.peek() {
                Some(&next) if next.is_ascii() && is_reserved(next as u8) => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Split `data` on every unescaped `delimiter`, honouring binary regions.
///
/// A `@<digits>@` sequence at a field boundary (input start or right after
/// any unescaped delimiter) causes `<digits>` raw payload bytes to be
/// consumed without inspection — this holds at every split level, because
/// a binary payload must survive segment splitting just as it survives
/// field splitting. Tokens may be empty; positions are preserved.
fn split_unescaped(data: &[u8], delimiter: u8) -> Result<Vec<&[u8]>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    let mut at_boundary = true;

    while pos < data.len() {
        let byte = data[pos];
        if byte == ESCAPE_CHARACTER {
            if pos + 1 >= data.len() {
                return Err(Error::MalformedSegment(
                    "dangling escape character at end of input".into(),
                ));
            }
            pos += 2;
            at_boundary = false;
            continue;
        }
        if byte == BINARY_MARKER && at_boundary {
            if let Some((len, framing)) = binary_prefix(&data[pos..]) {
                let skip = framing + len;
                if pos + skip > data.len() {
                    return Err(Error::MalformedSegment(format!(
                        "binary field declares {} bytes but only {} remain",
                        len,
                        data.len() - pos - framing
                    )));
                }
                pos += skip;
                at_boundary = false;
                continue;
            }
        }
        if byte == delimiter {
            tokens.push(&data[start..pos]);
            pos += 1;
            start = pos;
            at_boundary = true;
            continue;
        }
        at_boundary = matches!(
            byte,
            SEGMENT_DELIMITER | FIELD_DELIMITER | GROUP_DELIMITER
        );
        pos += 1;
    }
    tokens.push(&data[start..]);
    Ok(tokens)
}

/// Parse a `@<digits>@` prefix; returns (payload length, framing length).
fn binary_prefix(data: &[u8]) -> Option<(usize, usize)> {
    debug_assert_eq!(data.first(), Some(&BINARY_MARKER));
    let close = data[1..].iter().position(|&b| b == BINARY_MARKER)? + 1;
    let digits = &data[1..close];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let len = std::str::from_utf8(digits).ok()?.parse::<usize>().ok()?;
    Some((len, close + 1))
}

/// Split a raw message into segment byte-slices.
///
/// Segments are terminated (not separated) by `'`, so the empty token after
/// the final terminator is dropped. An input yielding no segments is an
/// error.
pub fn split_segments(message: &[u8]) -> Result<Vec<&[u8]>> {
    let tokens = split_unescaped(message, SEGMENT_DELIMITER)
        .map_err(|e| Error::MalformedMessage(e.to_string()))?;
    let segments: Vec<&[u8]> = tokens.into_iter().filter(|t| !t.is_empty()).collect();
    if segments.is_empty() {
        return Err(Error::MalformedMessage("message contains no segments".into()));
    }
    Ok(segments)
}

/// Split one segment into its raw field byte-slices.
///
/// Empty fields are preserved so field positions stay recoverable.
pub fn split_fields(segment: &[u8]) -> Result<Vec<&[u8]>> {
    split_unescaped(segment, FIELD_DELIMITER)
}

/// Split one field into its group-member byte-slices.
pub fn split_group(field: &[u8]) -> Result<Vec<&[u8]>> {
    split_unescaped(field, GROUP_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(escape("a+b"), "a?+b");
        assert_eq!(escape("it's"), "it?'s");
        assert_eq!(escape("a:b?c"), "a?:b??c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_unescape_roundtrip() {
        for text in ["a+b:c'd?e", "???", "nothing special", "+:'?"] {
            assert_eq!(unescape(&escape(text)), text);
        }
    }

    #[test]
    fn test_unescape_leaves_unknown_sequences() {
        assert_eq!(unescape("?x"), "?x");
        assert_eq!(unescape("end?"), "end?");
    }

    #[test]
    fn test_split_segments_basic() {
        let segments = split_segments(b"HKSYN:5:3+0'HKEND:6:1+1'").unwrap();
        assert_eq!(segments, vec![&b"HKSYN:5:3+0"[..], &b"HKEND:6:1+1"[..]]);
    }

    #[test]
    fn test_split_segments_ignores_escaped_delimiter() {
        let segments = split_segments(b"HKTST:2:1+it?'s fine'").unwrap();
        assert_eq!(segments, vec![&b"HKTST:2:1+it?'s fine"[..]]);
    }

    #[test]
    fn test_split_segments_empty_message() {
        assert!(split_segments(b"").is_err());
        assert!(split_segments(b"'").is_err());
    }

    #[test]
    fn test_split_fields_preserves_empty_positions() {
        let fields = split_fields(b"HKKAZ:3:5+acc++20240101").unwrap();
        assert_eq!(
            fields,
            vec![&b"HKKAZ:3:5"[..], &b"acc"[..], &b""[..], &b"20240101"[..]]
        );
    }

    #[test]
    fn test_split_fields_skips_binary_region() {
        // The binary payload contains every delimiter; none of them split.
        let fields = split_fields(b"HNVSD:999:1+@7@a+b'c:d+tail").unwrap();
        assert_eq!(
            fields,
            vec![&b"HNVSD:999:1"[..], &b"@7@a+b'c:d"[..], &b"tail"[..]]
        );
    }

    #[test]
    fn test_split_segments_skips_binary_region() {
        // A binary payload containing the segment terminator must not end
        // the segment early.
        let segments = split_segments(b"HNVSD:3:1+@5@ab'cd'HNHBS:4:1+1'").unwrap();
        assert_eq!(
            segments,
            vec![&b"HNVSD:3:1+@5@ab'cd"[..], &b"HNHBS:4:1+1"[..]]
        );
    }

    #[test]
    fn test_split_fields_truncated_binary() {
        assert!(split_fields(b"HNVSD:999:1+@99@short").is_err());
    }

    #[test]
    fn test_binary_marker_mid_token_is_literal() {
        // `@` inside a token is data, not binary framing.
        let fields = split_fields(b"HKTST:2:1+mail@8@host+x").unwrap();
        assert_eq!(fields[1], b"mail@8@host");
        assert_eq!(fields[2], b"x");
    }

    #[test]
    fn test_split_group_positions() {
        let members = split_group(b"abc::280:12345678").unwrap();
        assert_eq!(
            members,
            vec![&b"abc"[..], &b""[..], &b"280"[..], &b"12345678"[..]]
        );
    }

    #[test]
    fn test_dangling_escape_is_error() {
        assert!(split_fields(b"HKTST:2:1+oops?").is_err());
    }
}
