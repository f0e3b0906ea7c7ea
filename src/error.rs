// ABOUTME: Error types for EMV/ISO 8583 message decoding.
// ABOUTME: Every fatal failure carries a kind, the absolute byte offset and a detail message.

use serde::{Serialize, Serializer};
use std::fmt;

/// The result type for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of a decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Odd-length input or a non-hex character.
    MalformedHex,

    /// The length prefix disagrees with the number of bytes that follow it.
    LengthMismatch,

    /// Indefinite or oversized BER length encoding.
    UnsupportedLengthForm,

    /// A declared length runs past the end of the available bytes.
    TruncatedValue,

    /// A child of a constructed TLV overruns its parent's declared length.
    TrailingBytesInConstructedValue,

    /// Constructed TLV nesting exceeds the configured depth limit.
    NestingTooDeep,

    /// The message type indicator is not four decimal digits.
    InvalidMti,

    /// A bitmap field with no dictionary entry. Only used as an annotation.
    UnknownField,

    /// BER tag wider than four octets.
    TagTooLong,

    /// A length or tag field that does not hold valid decimal digits.
    InvalidLength,

    /// Bytes left over after the last ISO 8583 field.
    TrailingBytes,

    /// Reading the input failed.
    Io,
}

impl ErrorKind {
    /// Returns the stable name used in diagnostics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            ErrorKind::MalformedHex => "MalformedHex",
            ErrorKind::LengthMismatch => "LengthMismatch",
            ErrorKind::UnsupportedLengthForm => "UnsupportedLengthForm",
            ErrorKind::TruncatedValue => "TruncatedValue",
            ErrorKind::TrailingBytesInConstructedValue => "TrailingBytesInConstructedValue",
            ErrorKind::NestingTooDeep => "NestingTooDeep",
            ErrorKind::InvalidMti => "InvalidMti",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::TagTooLong => "TagTooLong",
            ErrorKind::InvalidLength => "InvalidLength",
            ErrorKind::TrailingBytes => "TrailingBytes",
            ErrorKind::Io => "Io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error_type())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.error_type())
    }
}

/// A decoding failure.
///
/// `offset` is the absolute position within the decoded message bytes
/// (for `MalformedHex`, the character index within the normalized input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Error {
    pub kind: ErrorKind,
    pub offset: usize,
    pub detail: String,
}

impl Error {
    pub fn new(kind: ErrorKind, offset: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            detail: detail.into(),
        }
    }

    /// Shorthand for `self.kind.error_type()`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        self.kind.error_type()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.kind, self.offset, self.detail)
    }
}

impl std::error::Error for Error {}

/// Formats a byte count for diagnostics: "1 byte", "4 bytes".
#[derive(Debug, Clone, Copy)]
pub(crate) struct ByteCount(pub usize);

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => f.write_str("1 byte"),
            n => write!(f, "{n} bytes"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, 0, err.to_string())
    }
}
