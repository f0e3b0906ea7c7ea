// ABOUTME: Shared configuration types, decoding modes and resource limits.
// ABOUTME: DecoderConfig gathers every knob the frame, TLV, LTV and ISO 8583 stages read.

use crate::dictionary::Dictionary;

/// Default limits and wire constants.
pub mod limits {
    /// Maximum constructed TLV nesting depth.
    pub const MAX_DEPTH: usize = 32;

    /// Bytes of opaque header following the length prefix (a 5-byte TPDU).
    pub const HEADER_LENGTH: usize = 5;

    /// Width of the big-endian length prefix in bytes.
    pub const LENGTH_PREFIX_WIDTH: usize = 2;

    /// Widest length prefix that still fits a u64.
    pub const MAX_LENGTH_PREFIX_WIDTH: usize = 8;

    /// Widest BER tag accepted, in octets.
    pub const MAX_TAG_WIDTH: usize = 4;

    /// Most subsequent octets accepted in a long-form BER length.
    pub const MAX_LENGTH_OCTETS: usize = 4;

    /// Size of one ISO 8583 bitmap in bytes.
    pub const BITMAP_SIZE: usize = 8;

    /// Number of digits in a message type indicator.
    pub const MTI_DIGITS: usize = 4;
}

/// Which message family the body holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A bare sequence of BER-TLV data objects.
    Emv,
    /// An ISO 8583 message: MTI, bitmap(s) and fields.
    #[default]
    Iso8583,
}

/// How decimal digits (MTI, length indicators, numeric fields) are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericEncoding {
    /// Two digits per byte, one per nibble.
    #[default]
    Bcd,
    /// One ASCII character per digit.
    Ascii,
}

impl NumericEncoding {
    /// Bytes needed to carry `digits` decimal digits.
    #[must_use]
    pub const fn byte_len(self, digits: usize) -> usize {
        match self {
            NumericEncoding::Bcd => digits.div_ceil(2),
            NumericEncoding::Ascii => digits,
        }
    }
}

/// Order of the framing elements ahead of the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLayout {
    /// `[length][header][body]`; the length counts header and body.
    #[default]
    LengthThenHeader,
    /// `[header][length][body]`; the length counts the body only.
    HeaderThenLength,
}

/// Framing options.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Discard a fixed-length header (default: false)
    pub strip_header: bool,
    /// Header size in bytes
    pub header_length: usize,
    /// Expect a big-endian length prefix (default: false)
    pub has_length_prefix: bool,
    /// Length prefix size in bytes
    pub length_prefix_width: usize,
    /// Element order when both are present
    pub layout: FrameLayout,
}

impl FrameConfig {
    /// Both header and length prefix, in the default layout.
    #[must_use]
    pub fn header_and_length() -> Self {
        Self {
            strip_header: true,
            has_length_prefix: true,
            ..Self::default()
        }
    }

    /// True when no framing is configured.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        !self.strip_header && !self.has_length_prefix
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            strip_header: false,
            header_length: limits::HEADER_LENGTH,
            has_length_prefix: false,
            length_prefix_width: limits::LENGTH_PREFIX_WIDTH,
            layout: FrameLayout::default(),
        }
    }
}

/// How the integer octets of an LTV item are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LtvNumberFormat {
    /// Packed decimal: `0x11` means eleven.
    #[default]
    Bcd,
    /// Plain big-endian binary.
    Binary,
}

/// LTV layout options.
#[derive(Debug, Clone)]
pub struct LtvConfig {
    /// Length field size in bytes
    pub length_width: usize,
    /// Tag field size in bytes
    pub tag_width: usize,
    /// Encoding of both the length and tag fields
    pub number_format: LtvNumberFormat,
    /// The length counts the tag bytes as well as the value (default: true)
    pub length_includes_tag: bool,
}

impl Default for LtvConfig {
    fn default() -> Self {
        Self {
            length_width: 1,
            tag_width: 1,
            number_format: LtvNumberFormat::default(),
            length_includes_tag: true,
        }
    }
}

/// Configuration options for a decode call.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Message family of the body (default: ISO 8583)
    pub mode: Mode,
    /// Framing ahead of the body
    pub frame: FrameConfig,
    /// Maximum constructed TLV nesting depth
    pub max_depth: usize,
    /// Skip 0x00 filler bytes between top-level TLV objects (default: true)
    pub skip_padding: bool,
    /// Digit encoding for MTI, length indicators and numeric fields
    pub numeric_encoding: NumericEncoding,
    /// Run the TLV sub-decoder on fields that declare it (default: false)
    pub parse_private_tlv: bool,
    /// Run the LTV sub-decoder on fields that declare it (default: false)
    pub parse_private_ltv: bool,
    /// LTV layout
    pub ltv: LtvConfig,
    /// Keep bytes after the last ISO 8583 field instead of failing (default: true)
    pub allow_trailing_bytes: bool,
    /// ISO 8583 field layouts (default: ISO 8583:1987)
    pub dictionary: Dictionary,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            frame: FrameConfig::default(),
            max_depth: limits::MAX_DEPTH,
            skip_padding: true,
            numeric_encoding: NumericEncoding::default(),
            parse_private_tlv: false,
            parse_private_ltv: false,
            ltv: LtvConfig::default(),
            allow_trailing_bytes: true,
            dictionary: Dictionary::default(),
        }
    }
}
