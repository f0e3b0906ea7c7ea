// ABOUTME: Deterministic text and JSON rendering of a decoded message.
// ABOUTME: Rendering never fails; sub-structure failures appear as inline warnings.

use crate::codec::encode_hex;
use crate::error::ErrorKind;
use crate::iso8583::{FieldValue, Iso8583Message, SubDecode};
use crate::tlv::TlvNode;
use crate::{Body, Decoded};
use std::fmt;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Line-oriented human-readable report
    #[default]
    Text,
    /// Pretty-printed JSON of the decoded model
    Json,
}

/// Validate bytes as UTF-8.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn as_utf8(bytes: &[u8]) -> Option<&str> {
    simdutf8::basic::from_utf8(bytes).ok()
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn as_utf8(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

/// Show bytes as text when every byte is printable ASCII, else as uppercase hex.
#[must_use]
pub fn display_value(bytes: &[u8]) -> String {
    match as_utf8(bytes) {
        Some(text) if !text.is_empty() && text.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) => {
            text.to_owned()
        }
        _ => encode_hex(bytes),
    }
}

/// Render `decoded` in the requested format.
#[must_use]
pub fn render(decoded: &Decoded, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(decoded),
        OutputFormat::Json => render_json(decoded),
    }
}

#[must_use]
pub fn render_text(decoded: &Decoded) -> String {
    TextReport(decoded).to_string()
}

#[must_use]
pub fn render_json(decoded: &Decoded) -> String {
    serde_json::to_string_pretty(decoded)
        .unwrap_or_else(|err| format!("{{\"render_error\": {:?}}}", err.to_string()))
}

/// `Display` adapter producing the text report.
pub struct TextReport<'a>(pub &'a Decoded);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoded = self.0;
        if let Some(frame) = &decoded.frame {
            if let Some(length) = frame.declared_length {
                writeln!(f, "Length: {length}")?;
            }
            if !frame.header.is_empty() {
                writeln!(f, "Header: {}", encode_hex(&frame.header))?;
            }
        }
        match &decoded.body {
            Body::Emv(nodes) => write_nodes(f, nodes, 0),
            Body::Iso8583(message) => write_message(f, message),
        }
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("\t")?;
    }
    Ok(())
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[TlvNode], depth: usize) -> fmt::Result {
    for node in nodes {
        write_indent(f, depth)?;
        writeln!(f, "{node}")?;
        write_nodes(f, node.children(), depth + 1)?;
    }
    Ok(())
}

fn write_message(f: &mut fmt::Formatter<'_>, message: &Iso8583Message) -> fmt::Result {
    writeln!(f, "MTI: {}", message.mti)?;
    writeln!(
        f,
        "Bitmap: {} {:?}",
        message.bitmap,
        message.bitmap.fields().collect::<Vec<_>>()
    )?;
    for field in message.fields.values() {
        write_field(f, field)?;
    }
    if !message.unparsed.is_empty() {
        writeln!(f, "Unparsed: {}", encode_hex(&message.unparsed))?;
    }
    Ok(())
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FieldValue) -> fmt::Result {
    let value = if field.textual {
        display_value(&field.raw)
    } else {
        encode_hex(&field.raw)
    };
    write!(
        f,
        "Field {:3} | {:12} | Length: {:3} | {}",
        field.number, field.name, field.length, value
    )?;
    if field.unknown {
        write!(f, " [{}]", ErrorKind::UnknownField)?;
    }
    writeln!(f)?;

    match &field.sub {
        None => Ok(()),
        Some(SubDecode::Tlv(nodes)) => write_nodes(f, nodes, 1),
        Some(SubDecode::Ltv(items)) => {
            for item in items {
                writeln!(f, "\t{item}")?;
            }
            Ok(())
        }
        Some(SubDecode::Failed(err)) => writeln!(f, "\twarning: {err}"),
    }
}
