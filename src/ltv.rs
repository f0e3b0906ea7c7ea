// ABOUTME: Flat length-tag-value decoder for private ISO 8583 sub-fields.
// ABOUTME: Fixed-width length and tag octets, BCD by default; no nesting.

use crate::codec::serialize_hex;
use crate::cursor::ByteCursor;
use crate::error::{ByteCount, Error, ErrorKind, Result};
use crate::types::{LtvConfig, LtvNumberFormat};
use serde::Serialize;
use std::fmt;

/// One decoded LTV entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LtvItem {
    pub tag: u64,
    /// Length as written on the wire
    pub length: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub value: Vec<u8>,
    /// Absolute offset of the length field
    pub offset: usize,
}

impl fmt::Display for LtvItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length: {:3} | tag: {:3} | value: {}",
            self.length,
            self.tag,
            crate::render::display_value(&self.value)
        )
    }
}

/// Decode LTV items until `cur` is exhausted.
///
/// Both the length and tag widths must be at least one byte.
pub fn decode_ltv(cur: &mut ByteCursor<'_>, config: &LtvConfig) -> Result<Vec<LtvItem>> {
    if config.length_width == 0 || config.tag_width == 0 {
        return Err(Error::new(
            ErrorKind::InvalidLength,
            cur.offset(),
            format!(
                "LTV length width {} and tag width {} must both be non-zero",
                config.length_width, config.tag_width
            ),
        ));
    }
    let mut items = Vec::new();
    while !cur.is_empty() {
        let offset = cur.offset();
        let length = read_number(cur, config.length_width, config.number_format)?;
        let length = usize::try_from(length)
            .map_err(|_| Error::new(ErrorKind::InvalidLength, offset, format!("length {length} is too large")))?;
        let tag = read_number(cur, config.tag_width, config.number_format)?;

        let value_len = if config.length_includes_tag {
            length.checked_sub(config.tag_width).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidLength,
                    offset,
                    format!("length {length} is shorter than the {}-byte tag", config.tag_width),
                )
            })?
        } else {
            length
        };

        if value_len > cur.remaining() {
            return Err(Error::new(
                ErrorKind::TruncatedValue,
                cur.offset(),
                format!("tag {tag} declares {} of value, {} remaining", ByteCount(value_len), cur.remaining()),
            ));
        }
        let value = cur.read_bytes(value_len)?.to_vec();
        items.push(LtvItem {
            tag,
            length,
            value,
            offset,
        });
    }
    Ok(items)
}

fn read_number(cur: &mut ByteCursor<'_>, width: usize, format: LtvNumberFormat) -> Result<u64> {
    let start = cur.offset();
    match format {
        LtvNumberFormat::Binary => cur.read_be_uint(width),
        LtvNumberFormat::Bcd => {
            let bytes = cur.read_bytes(width)?;
            bcd_to_u64(bytes).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidLength,
                    start,
                    format!("{} is not packed decimal", crate::codec::encode_hex(bytes)),
                )
            })
        }
    }
}

/// Interpret packed BCD octets as a decimal number.
pub(crate) fn bcd_to_u64(bytes: &[u8]) -> Option<u64> {
    bytes.iter().try_fold(0u64, |acc, &b| {
        let (hi, lo) = (u64::from(b >> 4), u64::from(b & 0x0F));
        if hi > 9 || lo > 9 {
            return None;
        }
        acc.checked_mul(100)?.checked_add(hi * 10 + lo)
    })
}
