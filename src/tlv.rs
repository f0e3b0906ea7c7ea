// ABOUTME: Recursive BER-TLV decoder (and definite-length re-encoder) for EMV data objects.
// ABOUTME: Constructed values are parsed from bounded sub-cursors with an explicit depth limit.

#![allow(clippy::cast_possible_truncation)]

use crate::codec::{encode_hex, serialize_hex};
use crate::cursor::ByteCursor;
use crate::error::{ByteCount, Error, ErrorKind, Result};
use crate::types::{limits, DecoderConfig};
use serde::{Serialize, Serializer};
use std::fmt;

/// BER tag class (bits 8-7 of the first tag octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// A BER tag, kept as its raw octets packed big-endian into a `u32`.
///
/// `9F02` is stored as `0x9F02` with a width of 2, which is also how EMV
/// tag lists are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    value: u32,
    width: u8,
}

impl Tag {
    /// Build a tag from its packed octets, e.g. `Tag::from_u32(0x9F02)`.
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        let width = (4 - value.leading_zeros() as u8 / 8).max(1);
        Self { value, width }
    }

    /// Packed octets.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Encoded size in octets.
    #[must_use]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }

    fn first_octet(&self) -> u8 {
        (self.value >> ((self.width - 1) * 8)) as u8
    }

    #[must_use]
    pub fn class(&self) -> TagClass {
        match self.first_octet() >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    /// Bit 6 (0x20) of the first octet.
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        self.first_octet() & 0x20 != 0
    }

    /// The encoded octets.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.to_be_bytes()[4 - self.width()..].to_vec()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$X}", self.value, width = self.width() * 2)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Content of a TLV node: raw bytes, or nested nodes for a constructed tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlvValue {
    Primitive(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    Constructed(Vec<TlvNode>),
}

/// One decoded data object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlvNode {
    pub tag: Tag,
    /// Length as written on the wire
    pub declared_length: usize,
    pub value: TlvValue,
    /// Absolute offset of the first tag octet
    pub offset: usize,
}

impl TlvNode {
    /// A primitive node; `declared_length` is taken from the value.
    #[must_use]
    pub fn primitive(tag: Tag, value: Vec<u8>) -> Self {
        Self {
            tag,
            declared_length: value.len(),
            value: TlvValue::Primitive(value),
            offset: 0,
        }
    }

    /// A constructed node; `declared_length` is the children's encoded size.
    #[must_use]
    pub fn constructed(tag: Tag, children: Vec<TlvNode>) -> Self {
        let declared_length = children.iter().map(TlvNode::encoded_len).sum();
        Self {
            tag,
            declared_length,
            value: TlvValue::Constructed(children),
            offset: 0,
        }
    }

    /// Child nodes (empty for primitives).
    #[must_use]
    pub fn children(&self) -> &[TlvNode] {
        match &self.value {
            TlvValue::Constructed(children) => children,
            TlvValue::Primitive(_) => &[],
        }
    }

    /// Primitive value bytes, if this is a primitive node.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            TlvValue::Primitive(bytes) => Some(bytes),
            TlvValue::Constructed(_) => None,
        }
    }

    /// Depth-first search for a tag, including this node.
    #[must_use]
    pub fn find(&self, tag: u32) -> Option<&TlvNode> {
        if self.tag.value() == tag {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(tag))
    }

    fn content_len(&self) -> usize {
        match &self.value {
            TlvValue::Primitive(bytes) => bytes.len(),
            TlvValue::Constructed(children) => children.iter().map(TlvNode::encoded_len).sum(),
        }
    }

    /// Size of this node in minimal definite-length BER.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let content = self.content_len();
        self.tag.width() + length_octets(content) + content
    }

    /// Encode this node in minimal definite-length BER.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.tag.to_bytes());
        write_length(self.content_len(), out);
        match &self.value {
            TlvValue::Primitive(bytes) => out.extend_from_slice(bytes),
            TlvValue::Constructed(children) => {
                for child in children {
                    child.encode_into(out);
                }
            }
        }
    }
}

impl fmt::Display for TlvNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TlvValue::Primitive(bytes) => {
                write!(f, "tag: {} | length: {:3} | value: {}", self.tag, self.declared_length, encode_hex(bytes))
            }
            TlvValue::Constructed(children) => write!(
                f,
                "tag: {} | length: {:3} | constructed, {} children",
                self.tag,
                self.declared_length,
                children.len()
            ),
        }
    }
}

/// Encode a sequence of sibling nodes.
#[must_use]
pub fn encode_tlv(nodes: &[TlvNode]) -> Vec<u8> {
    let mut out = Vec::new();
    for node in nodes {
        node.encode_into(&mut out);
    }
    out
}

fn length_octets(len: usize) -> usize {
    if len < 0x80 {
        1
    } else {
        1 + (usize::BITS - len.leading_zeros()).div_ceil(8) as usize
    }
}

fn write_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let count = length_octets(len) - 1;
    out.push(0x80 | count as u8);
    out.extend_from_slice(&len.to_be_bytes()[std::mem::size_of::<usize>() - count..]);
}

/// Decode a whole buffer of TLV objects; offsets start at 0.
pub fn decode_tlv(data: &[u8], config: &DecoderConfig) -> Result<Vec<TlvNode>> {
    let mut cur = ByteCursor::new(data);
    decode_sequence(&mut cur, config)
}

/// Decode sibling TLV objects until `cur` is exhausted.
///
/// 0x00 filler between objects is skipped when `config.skip_padding` is set.
pub fn decode_sequence(cur: &mut ByteCursor<'_>, config: &DecoderConfig) -> Result<Vec<TlvNode>> {
    let mut nodes = Vec::new();
    while let Some(byte) = cur.peek() {
        if config.skip_padding && byte == 0x00 {
            cur.read_byte()?;
            continue;
        }
        nodes.push(decode_node(cur, 1, config.max_depth, false)?);
    }
    Ok(nodes)
}

/// Decode one node at nesting level `depth` (top level is 1).
///
/// `bounded` is set for children of a constructed node, whose overruns
/// are reported against the parent's declared length.
fn decode_node(cur: &mut ByteCursor<'_>, depth: usize, max_depth: usize, bounded: bool) -> Result<TlvNode> {
    let offset = cur.offset();
    if depth > max_depth {
        return Err(Error::new(
            ErrorKind::NestingTooDeep,
            offset,
            format!("constructed values nested deeper than {max_depth} levels"),
        ));
    }

    let tag = read_tag(cur).map_err(|e| overrun(e, bounded))?;
    let length = read_length(cur).map_err(|e| overrun(e, bounded))?;

    if length > cur.remaining() {
        let err = Error::new(
            ErrorKind::TruncatedValue,
            cur.offset(),
            format!("tag {tag} declares {}, {} remaining", ByteCount(length), cur.remaining()),
        );
        return Err(overrun(err, bounded));
    }

    let value = if tag.is_constructed() {
        let mut sub = cur.sub_cursor(length)?;
        let mut children = Vec::new();
        while !sub.is_empty() {
            children.push(decode_node(&mut sub, depth + 1, max_depth, true)?);
        }
        TlvValue::Constructed(children)
    } else {
        TlvValue::Primitive(cur.read_bytes(length)?.to_vec())
    };

    Ok(TlvNode {
        tag,
        declared_length: length,
        value,
        offset,
    })
}

fn overrun(err: Error, bounded: bool) -> Error {
    if bounded && err.kind == ErrorKind::TruncatedValue {
        Error::new(
            ErrorKind::TrailingBytesInConstructedValue,
            err.offset,
            format!("child overruns its constructed parent: {}", err.detail),
        )
    } else {
        err
    }
}

fn read_tag(cur: &mut ByteCursor<'_>) -> Result<Tag> {
    let start = cur.offset();
    let first = cur.read_byte()?;
    let mut value = u32::from(first);
    let mut width = 1u8;

    if first & 0x1F == 0x1F {
        loop {
            let byte = cur.read_byte()?;
            if usize::from(width) == limits::MAX_TAG_WIDTH {
                return Err(Error::new(
                    ErrorKind::TagTooLong,
                    start,
                    format!("tag longer than {} octets", limits::MAX_TAG_WIDTH),
                ));
            }
            value = (value << 8) | u32::from(byte);
            width += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }
    }

    Ok(Tag { value, width })
}

fn read_length(cur: &mut ByteCursor<'_>) -> Result<usize> {
    let start = cur.offset();
    let first = cur.read_byte()?;
    if first & 0x80 == 0 {
        return Ok(usize::from(first));
    }

    let count = usize::from(first & 0x7F);
    if count == 0 {
        return Err(Error::new(
            ErrorKind::UnsupportedLengthForm,
            start,
            "indefinite length form (0x80) is not supported",
        ));
    }
    if count > limits::MAX_LENGTH_OCTETS {
        return Err(Error::new(
            ErrorKind::UnsupportedLengthForm,
            start,
            format!("long form length with {count} octets (0x{first:02X})"),
        ));
    }

    let length = cur.read_be_uint(count)?;
    usize::try_from(length).map_err(|_| {
        Error::new(ErrorKind::UnsupportedLengthForm, start, format!("length {length} exceeds address space"))
    })
}
