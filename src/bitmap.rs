// ABOUTME: ISO 8583 primary/secondary bitmap.
// ABOUTME: Bit 1 is never stored; it is derived from whether the secondary bitmap exists.

#![allow(clippy::cast_possible_truncation)]

use crate::codec::encode_hex;
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::types::limits;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Highest addressable field number.
pub const MAX_FIELD: u8 = 128;

/// Set of present data fields (2..=128).
///
/// Field `n` lives at bit `128 - n` of `fields`, so the high half lines up
/// with the primary bitmap and the low half with the secondary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitmap {
    fields: u128,
    secondary: bool,
}

impl Bitmap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bitmap from field numbers; the secondary bitmap is present
    /// exactly when one of them is above 64.
    ///
    /// Numbers outside 2..=128 are ignored.
    pub fn from_fields<I: IntoIterator<Item = u8>>(fields: I) -> Self {
        let mut bitmap = Self::new();
        for field in fields {
            bitmap.insert(field);
        }
        bitmap
    }

    /// Mark a data field present. Returns false for 0, 1 and numbers above 128.
    pub fn insert(&mut self, field: u8) -> bool {
        if !(2..=MAX_FIELD).contains(&field) {
            return false;
        }
        self.fields |= 1u128 << (128 - u32::from(field));
        if field > 64 {
            self.secondary = true;
        }
        true
    }

    /// True if data field `field` is present; field 1 reports the secondary bitmap.
    #[must_use]
    pub fn contains(&self, field: u8) -> bool {
        match field {
            1 => self.secondary,
            2..=MAX_FIELD => self.fields & (1u128 << (128 - u32::from(field))) != 0,
            _ => false,
        }
    }

    #[must_use]
    pub fn has_secondary(&self) -> bool {
        self.secondary
    }

    /// Present data fields in ascending order. Never yields field 1.
    pub fn fields(&self) -> impl Iterator<Item = u8> + '_ {
        (2..=MAX_FIELD).filter(move |&field| self.contains(field))
    }

    fn primary_word(&self) -> u64 {
        let word = (self.fields >> 64) as u64 & !(1u64 << 63);
        if self.secondary {
            word | (1u64 << 63)
        } else {
            word
        }
    }

    /// Wire form: 8 bytes, or 16 with the secondary bitmap.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.primary_word().to_be_bytes().to_vec();
        if self.secondary {
            out.extend_from_slice(&(self.fields as u64).to_be_bytes());
        }
        out
    }

    /// Read the primary bitmap and, when its bit 1 is set, the secondary.
    pub fn read(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let primary = cur.read_be_uint(limits::BITMAP_SIZE)?;
        let secondary = primary & (1u64 << 63) != 0;
        let mut fields = u128::from(primary & !(1u64 << 63)) << 64;
        if secondary {
            fields |= u128::from(cur.read_be_uint(limits::BITMAP_SIZE)?);
        }
        Ok(Self { fields, secondary })
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.to_bytes()))
    }
}

impl Serialize for Bitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Bitmap", 2)?;
        state.serialize_field("hex", &self.to_string())?;
        state.serialize_field("fields", &self.fields().collect::<Vec<_>>())?;
        state.end()
    }
}
