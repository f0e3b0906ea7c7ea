// ABOUTME: Strips the optional length prefix and opaque header in front of a message body.
// ABOUTME: The declared length must match the bytes that follow it exactly.

use crate::cursor::ByteCursor;
use crate::error::{ByteCount, Error, ErrorKind, Result};
use crate::types::{limits, FrameConfig, FrameLayout};

/// The framing elements removed from a message, plus the body that remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Value of the length prefix, if one was read
    pub declared_length: Option<u64>,
    /// Stripped header bytes (empty when no header is configured)
    pub header: &'a [u8],
    /// Bytes left for the body decoder
    pub body: &'a [u8],
    /// Absolute offset of `body[0]`
    pub body_offset: usize,
}

impl<'a> Frame<'a> {
    /// A cursor over the body that reports absolute offsets.
    #[must_use]
    pub fn body_cursor(&self) -> ByteCursor<'a> {
        ByteCursor::with_base(self.body, self.body_offset)
    }
}

/// Remove the configured header and length prefix from `data`.
///
/// The header is discarded without looking at its content. With
/// `FrameLayout::HeaderThenLength` the header goes strictly before the
/// prefix is read; otherwise the prefix comes first and counts the header.
pub fn strip_frame<'a>(data: &'a [u8], config: &FrameConfig) -> Result<Frame<'a>> {
    let mut cur = ByteCursor::new(data);
    let mut declared_length = None;
    let mut header: &[u8] = &[];

    match config.layout {
        FrameLayout::LengthThenHeader => {
            if config.has_length_prefix {
                declared_length = Some(read_length_prefix(&mut cur, config.length_prefix_width)?);
            }
            if config.strip_header {
                header = read_header(&mut cur, config.header_length)?;
            }
        }
        FrameLayout::HeaderThenLength => {
            if config.strip_header {
                header = read_header(&mut cur, config.header_length)?;
            }
            if config.has_length_prefix {
                declared_length = Some(read_length_prefix(&mut cur, config.length_prefix_width)?);
            }
        }
    }

    log::debug!(
        "frame: declared length {:?}, {} header bytes, {} body bytes",
        declared_length,
        header.len(),
        cur.remaining()
    );

    let body_offset = cur.offset();
    Ok(Frame {
        declared_length,
        header,
        body: cur.take_rest(),
        body_offset,
    })
}

/// Read the prefix and check it against everything after it.
fn read_length_prefix(cur: &mut ByteCursor<'_>, width: usize) -> Result<u64> {
    let start = cur.offset();
    if width == 0 || width > limits::MAX_LENGTH_PREFIX_WIDTH {
        return Err(Error::new(
            ErrorKind::UnsupportedLengthForm,
            start,
            format!("length prefix width {width} is outside 1..={}", limits::MAX_LENGTH_PREFIX_WIDTH),
        ));
    }
    let declared = cur.read_be_uint(width).map_err(|_| {
        Error::new(
            ErrorKind::TruncatedValue,
            start,
            format!("need {} for the length prefix, {} available", ByteCount(width), cur.remaining()),
        )
    })?;
    let actual = cur.remaining();
    if declared != actual as u64 {
        return Err(Error::new(
            ErrorKind::LengthMismatch,
            start,
            format!("length prefix declares {declared}, found {}", ByteCount(actual)),
        ));
    }
    Ok(declared)
}

fn read_header<'a>(cur: &mut ByteCursor<'a>, length: usize) -> Result<&'a [u8]> {
    let start = cur.offset();
    cur.read_bytes(length).map_err(|_| {
        Error::new(
            ErrorKind::TruncatedValue,
            start,
            format!("header needs {}, {} available", ByteCount(length), cur.remaining()),
        )
    })
}
