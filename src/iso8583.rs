// ABOUTME: ISO 8583 message decoder: MTI, bitmaps, then dictionary-driven field extraction.
// ABOUTME: Field overruns are fatal; private sub-structure failures are recorded per field.

use crate::bitmap::Bitmap;
use crate::codec::{encode_hex, serialize_hex};
use crate::cursor::ByteCursor;
use crate::dictionary::{Content, Encoding, FieldDefinition, SubDecoder};
use crate::error::{ByteCount, Error, ErrorKind, Result};
use crate::ltv::{bcd_to_u64, decode_ltv, LtvItem};
use crate::tlv::{decode_sequence, TlvNode};
use crate::types::{limits, DecoderConfig, NumericEncoding};
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of running a field's sub-decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubDecode {
    Tlv(Vec<TlvNode>),
    Ltv(Vec<LtvItem>),
    /// The value did not decode; the raw bytes are still on the field.
    Failed(Error),
}

/// One extracted data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub number: u8,
    /// Dictionary name, or empty for undefined fields
    pub name: &'static str,
    /// Length in the field's own units (digits or bytes)
    pub length: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub raw: Vec<u8>,
    /// Absolute offset of the field, including any length indicator
    pub offset: usize,
    /// The raw bytes are characters rather than packed digits or binary
    #[serde(skip)]
    pub textual: bool,
    /// The field is not in the dictionary (`UnknownField`)
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unknown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<SubDecode>,
}

impl FieldValue {
    fn unknown(number: u8, raw: &[u8], offset: usize) -> Self {
        Self {
            number,
            name: "",
            length: raw.len(),
            raw: raw.to_vec(),
            offset,
            textual: false,
            unknown: true,
            sub: None,
        }
    }
}

/// A decoded ISO 8583 message. Never modified after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Iso8583Message {
    /// Message type indicator, four decimal digits
    pub mti: String,
    pub bitmap: Bitmap,
    pub fields: BTreeMap<u8, FieldValue>,
    /// Bytes after the last field
    #[serde(serialize_with = "serialize_hex")]
    pub unparsed: Vec<u8>,
    pub unparsed_offset: usize,
}

impl Iso8583Message {
    #[must_use]
    pub fn field(&self, number: u8) -> Option<&FieldValue> {
        self.fields.get(&number)
    }
}

/// Decode a message body.
///
/// Fields are read in ascending bitmap order using `config.dictionary`.
/// A field missing from the dictionary cannot be delimited, so it takes the
/// rest of the body and any later fields are recorded empty.
pub fn decode_message(cur: &mut ByteCursor<'_>, config: &DecoderConfig) -> Result<Iso8583Message> {
    let mti = read_mti(cur, config.numeric_encoding)?;
    let bitmap = Bitmap::read(cur)?;
    log::debug!("mti {mti}, bitmap {bitmap}");

    let mut fields = BTreeMap::new();
    let mut swallowed = false;
    for number in bitmap.fields() {
        if swallowed {
            fields.insert(number, FieldValue::unknown(number, &[], cur.offset()));
            continue;
        }
        let value = match config.dictionary.get(number) {
            Some(def) => read_field(cur, def, config)?,
            None => {
                log::warn!("field {number} is not in the dictionary; taking the remaining {} bytes", cur.remaining());
                swallowed = true;
                let offset = cur.offset();
                FieldValue::unknown(number, cur.take_rest(), offset)
            }
        };
        fields.insert(number, value);
    }

    let unparsed_offset = cur.offset();
    if !cur.is_empty() && !config.allow_trailing_bytes {
        return Err(Error::new(
            ErrorKind::TrailingBytes,
            unparsed_offset,
            format!("{} after the last field", ByteCount(cur.remaining())),
        ));
    }
    let unparsed = cur.take_rest().to_vec();
    if !unparsed.is_empty() {
        log::debug!("{} unparsed bytes at {unparsed_offset}", unparsed.len());
    }

    Ok(Iso8583Message {
        mti,
        bitmap,
        fields,
        unparsed,
        unparsed_offset,
    })
}

/// Decode a whole body; offsets start at 0.
pub fn decode_iso8583(data: &[u8], config: &DecoderConfig) -> Result<Iso8583Message> {
    decode_message(&mut ByteCursor::new(data), config)
}

fn read_mti(cur: &mut ByteCursor<'_>, encoding: NumericEncoding) -> Result<String> {
    let start = cur.offset();
    let bytes = cur.read_bytes(encoding.byte_len(limits::MTI_DIGITS))?;
    let digits = match encoding {
        NumericEncoding::Bcd => unpack_bcd(bytes),
        NumericEncoding::Ascii => ascii_digits(bytes),
    };
    digits.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidMti,
            start,
            format!("{} is not four decimal digits", encode_hex(bytes)),
        )
    })
}

fn unpack_bcd(bytes: &[u8]) -> Option<String> {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        for nibble in [b >> 4, b & 0x0F] {
            digits.push(char::from_digit(u32::from(nibble), 10)?);
        }
    }
    Some(digits)
}

fn ascii_digits(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .all(u8::is_ascii_digit)
        .then(|| bytes.iter().map(|&b| char::from(b)).collect())
}

fn read_length_indicator(cur: &mut ByteCursor<'_>, number: u8, digits: usize, encoding: NumericEncoding) -> Result<usize> {
    let start = cur.offset();
    let bytes = cur.read_bytes(encoding.byte_len(digits))?;
    let value = match encoding {
        NumericEncoding::Bcd => bcd_to_u64(bytes),
        NumericEncoding::Ascii => ascii_digits(bytes).and_then(|s| s.parse().ok()),
    };
    value
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidLength,
                start,
                format!("field {number} length indicator {} is not decimal", encode_hex(bytes)),
            )
        })
}

fn read_field(cur: &mut ByteCursor<'_>, def: &'static FieldDefinition, config: &DecoderConfig) -> Result<FieldValue> {
    let offset = cur.offset();
    let numeric = config.numeric_encoding;
    let length = match def.encoding {
        Encoding::Fixed(width) => width,
        Encoding::Variable(digits) => read_length_indicator(cur, def.number, digits, numeric)?,
    };
    let byte_len = def.content.byte_len(length, numeric);
    if byte_len > cur.remaining() {
        return Err(Error::new(
            ErrorKind::TruncatedValue,
            cur.offset(),
            format!("field {} needs {}, {} remaining", def.number, ByteCount(byte_len), cur.remaining()),
        ));
    }
    let value_offset = cur.offset();
    let raw = cur.read_bytes(byte_len)?;
    log::debug!("field {} ({}) at {offset}: {byte_len} bytes", def.number, def.name);

    let enabled = match def.sub_decoder {
        SubDecoder::None => false,
        SubDecoder::Tlv => config.parse_private_tlv,
        SubDecoder::Ltv => config.parse_private_ltv,
    };
    let sub = enabled.then(|| sub_decode(def, raw, value_offset, config));

    Ok(FieldValue {
        number: def.number,
        name: def.name,
        length,
        raw: raw.to_vec(),
        offset,
        textual: is_textual(def.content, numeric),
        unknown: false,
        sub,
    })
}

fn is_textual(content: Content, numeric: NumericEncoding) -> bool {
    match content {
        Content::Text => true,
        Content::Numeric | Content::Track => numeric == NumericEncoding::Ascii,
        Content::Binary => false,
    }
}

fn sub_decode(def: &FieldDefinition, raw: &[u8], base: usize, config: &DecoderConfig) -> SubDecode {
    let mut cur = ByteCursor::with_base(raw, base);
    let decoded = if def.sub_decoder == SubDecoder::Ltv {
        decode_ltv(&mut cur, &config.ltv).map(SubDecode::Ltv)
    } else {
        decode_sequence(&mut cur, config).map(SubDecode::Tlv)
    };
    decoded.unwrap_or_else(|err| {
        log::warn!("field {}: {err}", def.number);
        SubDecode::Failed(err)
    })
}
