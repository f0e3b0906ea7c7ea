// ABOUTME: Hex codec for message input and rendered output.
// ABOUTME: Normalizes pasted dumps (quotes, whitespace) before strict even-length hex decoding.

use crate::error::{Error, ErrorKind, Result};
use memchr::memchr3;
use std::borrow::Cow;

#[inline]
fn is_separator(b: u8) -> bool {
    b == b'"' || b.is_ascii_whitespace()
}

/// Strip double quotes and ASCII whitespace from a pasted message.
///
/// Returns the input unchanged (borrowed) when there is nothing to strip.
#[must_use]
pub fn normalize(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'"', b' ', b'\t', bytes).is_none() && memchr3(b'\r', b'\n', b'\x0C', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.chars().filter(|&c| !c.is_ascii() || !is_separator(c as u8)).collect())
}

/// Decode a hex string (either case) into bytes.
///
/// Fails with `MalformedHex` naming the index of the first non-hex
/// character, or of the dangling final character for odd-length input.
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => Error::new(
            ErrorKind::MalformedHex,
            index,
            format!("invalid hex character {c:?}"),
        ),
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            // hex checks the length before the characters; report a bad
            // character first if there is one.
            match input.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
                Some((index, c)) => Error::new(
                    ErrorKind::MalformedHex,
                    index,
                    format!("invalid hex character {c:?}"),
                ),
                None => Error::new(
                    ErrorKind::MalformedHex,
                    input.len().saturating_sub(1),
                    format!("odd number of hex digits ({})", input.len()),
                ),
            }
        }
    })
}

/// Encode bytes as uppercase hex.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Serde helper: write a byte string as uppercase hex.
pub(crate) fn serialize_hex<S: serde::Serializer>(
    bytes: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_hex(bytes))
}
