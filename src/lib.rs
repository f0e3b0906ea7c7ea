// ABOUTME: EMV BER-TLV and ISO 8583 message decoder for Rust.
// ABOUTME: Hex input in, structured model or rendered report out; one synchronous decode per call.

//! # emv_parser
//!
//! Decodes payment messages pasted as hex: bare EMV BER-TLV data objects,
//! or ISO 8583 messages whose private fields may carry TLV (ICC data) and
//! LTV sub-structures.
//!
//! ## Quick Start
//!
//! ```rust
//! use emv_parser::{decode, Body, DecoderConfig, Mode};
//!
//! let config = DecoderConfig {
//!     mode: Mode::Emv,
//!     ..DecoderConfig::default()
//! };
//! let decoded = decode("9F0206000000000100 9A03231125", &config).unwrap();
//! let Body::Emv(nodes) = &decoded.body else { unreachable!() };
//! assert_eq!(nodes[0].tag.value(), 0x9F02);
//! assert_eq!(nodes[1].bytes(), Some(&[0x23, 0x11, 0x25][..]));
//! ```
//!
//! ## One-shot requests
//!
//! ```rust
//! use emv_parser::{execute, DecodeRequest, Mode};
//!
//! let mut request = DecodeRequest::new("01002000000000000000930000");
//! request.mode = Mode::Emv;
//! let outcome = execute(&request);
//! assert!(outcome.success);
//! assert_eq!(outcome.exit_code(), 0);
//! assert!(outcome.text.starts_with("tag: 01 |"));
//! ```
//!
//! ## Errors
//!
//! Every fatal failure is an [`Error`] naming its [`ErrorKind`] and the byte
//! offset where decoding stopped, rendered as
//! `<ErrorKind> at byte <offset>: <detail>`. Sub-structure failures inside
//! ISO 8583 fields are not fatal; they are kept on the field.
//!
//! ## Resource Limits
//!
//! - Maximum constructed TLV nesting depth: 32 (configurable)
//! - Tags up to 4 octets, long-form lengths up to 4 octets

pub mod bitmap;
pub mod codec;
pub mod cursor;
pub mod dictionary;
pub mod error;
pub mod frame;
pub mod iso8583;
pub mod ltv;
pub mod render;
pub mod tlv;
pub mod types;

// Re-export commonly used items at the crate root
pub use bitmap::Bitmap;
pub use codec::{decode_hex, encode_hex};
pub use cursor::ByteCursor;
pub use dictionary::{Dictionary, FieldDefinition, ISO8583_1987};
pub use error::{Error, ErrorKind, Result};
pub use iso8583::{FieldValue, Iso8583Message, SubDecode};
pub use ltv::LtvItem;
pub use render::OutputFormat;
pub use tlv::{Tag, TlvNode, TlvValue};
pub use types::{limits, DecoderConfig, FrameConfig, FrameLayout, LtvConfig, Mode, NumericEncoding};

use codec::serialize_hex;
use serde::Serialize;

/// Framing elements removed ahead of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_length: Option<u64>,
    #[serde(serialize_with = "serialize_hex")]
    pub header: Vec<u8>,
}

/// The decoded message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Emv(Vec<TlvNode>),
    Iso8583(Iso8583Message),
}

/// Everything one decode call produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoded {
    /// Present when framing was configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameInfo>,
    pub body: Body,
}

/// Decode a hex message.
///
/// Quotes and whitespace are stripped first, so pasted dumps decode as-is.
pub fn decode(message: &str, config: &DecoderConfig) -> Result<Decoded> {
    let normalized = codec::normalize(message);
    let bytes = decode_hex(&normalized)?;
    decode_bytes(&bytes, config)
}

/// Decode raw message bytes.
pub fn decode_bytes(data: &[u8], config: &DecoderConfig) -> Result<Decoded> {
    let frame = frame::strip_frame(data, &config.frame)?;
    let mut cur = frame.body_cursor();
    let body = match config.mode {
        Mode::Emv => Body::Emv(tlv::decode_sequence(&mut cur, config)?),
        Mode::Iso8583 => Body::Iso8583(iso8583::decode_message(&mut cur, config)?),
    };
    let frame = (!config.frame.is_bare()).then(|| FrameInfo {
        declared_length: frame.declared_length,
        header: frame.header.to_vec(),
    });
    Ok(Decoded { frame, body })
}

/// The inputs of one front-end invocation.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// Hex message text
    pub message: String,
    /// Strip a 2-byte length prefix and 5-byte header (default: false)
    pub include_header_and_length: bool,
    /// Decode TLV private fields (default: false)
    pub parse_private_tlv: bool,
    /// Decode LTV private fields (default: false)
    pub parse_private_ltv: bool,
    pub mode: Mode,
    pub format: OutputFormat,
}

impl DecodeRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            include_header_and_length: false,
            parse_private_tlv: false,
            parse_private_ltv: false,
            mode: Mode::default(),
            format: OutputFormat::default(),
        }
    }

    /// The decoder configuration this request describes.
    #[must_use]
    pub fn config(&self) -> DecoderConfig {
        let frame = if self.include_header_and_length {
            FrameConfig::header_and_length()
        } else {
            FrameConfig::default()
        };
        DecoderConfig {
            mode: self.mode,
            frame,
            parse_private_tlv: self.parse_private_tlv,
            parse_private_ltv: self.parse_private_ltv,
            ..DecoderConfig::default()
        }
    }
}

/// Result of [`execute`]: rendered output on success, the diagnostic line on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub text: String,
}

impl Outcome {
    /// Process exit status: 0 on success, 1 on a decode failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.success)
    }
}

/// Decode and render one request. Exactly one fatal error is reported on failure.
#[must_use]
pub fn execute(request: &DecodeRequest) -> Outcome {
    match decode(&request.message, &request.config()) {
        Ok(decoded) => Outcome {
            success: true,
            text: render::render(&decoded, request.format),
        },
        Err(err) => {
            log::debug!("decode failed: {err}");
            Outcome {
                success: false,
                text: err.to_string(),
            }
        }
    }
}
