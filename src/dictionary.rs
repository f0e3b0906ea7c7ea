// ABOUTME: Static ISO 8583 field dictionary: layout, content class and sub-decoder per field.
// ABOUTME: The default table follows ISO 8583:1987 with the private-use fields this tool decodes.

use crate::types::NumericEncoding;
use std::fmt;

/// What a field's units are and how they pack into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    /// Decimal digits, packed per the configured numeric encoding.
    Numeric,
    /// Track data digits and separators, packed like numeric digits.
    Track,
    /// Character data, one byte per character.
    Text,
    /// Opaque bytes.
    Binary,
}

impl Content {
    /// Bytes occupied by `units` units of this content.
    #[must_use]
    pub const fn byte_len(self, units: usize, numeric: NumericEncoding) -> usize {
        match self {
            Content::Numeric | Content::Track => numeric.byte_len(units),
            Content::Text | Content::Binary => units,
        }
    }
}

/// How a field is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Exactly this many units.
    Fixed(usize),
    /// A length indicator of this many decimal digits, then that many units.
    Variable(usize),
}

/// Secondary decoder applied to a field's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubDecoder {
    #[default]
    None,
    /// BER-TLV data objects (ICC data)
    Tlv,
    /// Flat length-tag-value items
    Ltv,
}

/// Layout of one data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub number: u8,
    pub name: &'static str,
    pub content: Content,
    pub encoding: Encoding,
    pub sub_decoder: SubDecoder,
}

impl FieldDefinition {
    #[must_use]
    pub const fn fixed(number: u8, name: &'static str, content: Content, width: usize) -> Self {
        Self {
            number,
            name,
            content,
            encoding: Encoding::Fixed(width),
            sub_decoder: SubDecoder::None,
        }
    }

    #[must_use]
    pub const fn variable(number: u8, name: &'static str, content: Content, digits: usize) -> Self {
        Self {
            number,
            name,
            content,
            encoding: Encoding::Variable(digits),
            sub_decoder: SubDecoder::None,
        }
    }

    /// Attach a sub-decoder to the definition.
    #[must_use]
    pub const fn decoded_as(mut self, sub_decoder: SubDecoder) -> Self {
        self.sub_decoder = sub_decoder;
        self
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.content {
            Content::Numeric => "n",
            Content::Track => "z",
            Content::Text => "ans",
            Content::Binary => "b",
        };
        match self.encoding {
            Encoding::Fixed(width) => write!(f, "{class}{width}"),
            Encoding::Variable(digits) => write!(f, "{class} {}VAR", "L".repeat(digits)),
        }
    }
}

/// A field table, sorted by field number.
#[derive(Debug, Clone, Copy)]
pub struct Dictionary {
    fields: &'static [FieldDefinition],
}

impl Dictionary {
    /// Wrap a table. `fields` must be sorted by number with no duplicates.
    #[must_use]
    pub const fn new(fields: &'static [FieldDefinition]) -> Self {
        Self { fields }
    }

    /// Look up a data field.
    #[must_use]
    pub fn get(&self, number: u8) -> Option<&'static FieldDefinition> {
        let fields = self.fields;
        fields
            .binary_search_by_key(&number, |def| def.number)
            .ok()
            .map(|index| &fields[index])
    }

    /// Every definition in ascending field order.
    pub fn iter(&self) -> impl Iterator<Item = &'static FieldDefinition> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        ISO8583_1987
    }
}

/// The ISO 8583:1987 layout. Field 48 carries LTV items, field 55 ICC data.
pub const ISO8583_1987: Dictionary = Dictionary::new(ISO8583_1987_FIELDS);

use Content::{Binary as B, Numeric as N, Text as T, Track as Z};

#[rustfmt::skip]
const ISO8583_1987_FIELDS: &[FieldDefinition] = &[
    FieldDefinition::variable(2, "PAN", N, 2),
    FieldDefinition::fixed(3, "Process Code", N, 6),
    FieldDefinition::fixed(4, "Amount", N, 12),
    FieldDefinition::fixed(5, "Settle Amt", N, 12),
    FieldDefinition::fixed(6, "Billing Amt", N, 12),
    FieldDefinition::fixed(7, "Transmission", N, 10),
    FieldDefinition::fixed(8, "Billing Fee", N, 8),
    FieldDefinition::fixed(9, "Settle Rate", N, 8),
    FieldDefinition::fixed(10, "Billing Rate", N, 8),
    FieldDefinition::fixed(11, "Trace", N, 6),
    FieldDefinition::fixed(12, "Time", N, 6),
    FieldDefinition::fixed(13, "Date", N, 4),
    FieldDefinition::fixed(14, "Expiry", N, 4),
    FieldDefinition::fixed(15, "Settle Date", N, 4),
    FieldDefinition::fixed(16, "Conv Date", N, 4),
    FieldDefinition::fixed(17, "Capture Date", N, 4),
    FieldDefinition::fixed(18, "Merchant Type", N, 4),
    FieldDefinition::fixed(19, "Acq Country", N, 3),
    FieldDefinition::fixed(20, "PAN Country", N, 3),
    FieldDefinition::fixed(21, "Fwd Country", N, 3),
    FieldDefinition::fixed(22, "Entry Mode", N, 3),
    FieldDefinition::fixed(23, "Card Seq", N, 3),
    FieldDefinition::fixed(24, "NII", N, 3),
    FieldDefinition::fixed(25, "Condition", N, 2),
    FieldDefinition::fixed(26, "PIN Capture", N, 2),
    FieldDefinition::fixed(27, "Auth Id Len", N, 1),
    FieldDefinition::fixed(28, "Txn Fee", T, 9),
    FieldDefinition::fixed(29, "Settle Fee", T, 9),
    FieldDefinition::fixed(30, "Txn Proc Fee", T, 9),
    FieldDefinition::fixed(31, "Settle Proc", T, 9),
    FieldDefinition::variable(32, "Acquirer", N, 2),
    FieldDefinition::variable(33, "Forwarder", N, 2),
    FieldDefinition::variable(34, "PAN Extended", T, 2),
    FieldDefinition::variable(35, "Track2", Z, 2),
    FieldDefinition::variable(36, "Track3", Z, 3),
    FieldDefinition::fixed(37, "RRN", T, 12),
    FieldDefinition::fixed(38, "Auth Code", T, 6),
    FieldDefinition::fixed(39, "Response", T, 2),
    FieldDefinition::fixed(40, "Service Code", T, 3),
    FieldDefinition::fixed(41, "Terminal", T, 8),
    FieldDefinition::fixed(42, "Acceptor", T, 15),
    FieldDefinition::fixed(43, "Location", T, 40),
    FieldDefinition::variable(44, "Add Response", T, 2),
    FieldDefinition::variable(45, "Track1", T, 2),
    FieldDefinition::variable(46, "Add Data ISO", T, 3),
    FieldDefinition::variable(47, "Add Data Nat", T, 3),
    FieldDefinition::variable(48, "Add Data", B, 3).decoded_as(SubDecoder::Ltv),
    FieldDefinition::fixed(49, "Currency", T, 3),
    FieldDefinition::fixed(50, "Settle Curr", T, 3),
    FieldDefinition::fixed(51, "Billing Curr", T, 3),
    FieldDefinition::fixed(52, "PIN Block", B, 8),
    FieldDefinition::fixed(53, "Security", N, 16),
    FieldDefinition::variable(54, "Add Amounts", T, 3),
    FieldDefinition::variable(55, "ICC Data", B, 3).decoded_as(SubDecoder::Tlv),
    FieldDefinition::variable(56, "Reserved ISO", T, 3),
    FieldDefinition::variable(57, "Reserved Nat", T, 3),
    FieldDefinition::variable(58, "Reserved Nat", T, 3),
    FieldDefinition::variable(59, "Reserved Nat", T, 3),
    FieldDefinition::variable(60, "Reserved Nat", T, 3),
    FieldDefinition::variable(61, "Private", T, 3),
    FieldDefinition::variable(62, "Private", T, 3),
    FieldDefinition::variable(63, "Private", T, 3),
    FieldDefinition::fixed(64, "MAC", B, 8),
    FieldDefinition::fixed(65, "Bitmap Ext", B, 1),
    FieldDefinition::fixed(66, "Settle Code", N, 1),
    FieldDefinition::fixed(67, "Ext Payment", N, 2),
    FieldDefinition::fixed(68, "Recv Country", N, 3),
    FieldDefinition::fixed(69, "Settle Ctry", N, 3),
    FieldDefinition::fixed(70, "Network Mgmt", N, 3),
    FieldDefinition::fixed(71, "Message No", N, 4),
    FieldDefinition::fixed(72, "Last Msg No", N, 4),
    FieldDefinition::fixed(73, "Action Date", N, 6),
    FieldDefinition::fixed(74, "Credits", N, 10),
    FieldDefinition::fixed(75, "Credit Revs", N, 10),
    FieldDefinition::fixed(76, "Debits", N, 10),
    FieldDefinition::fixed(77, "Debit Revs", N, 10),
    FieldDefinition::fixed(78, "Transfers", N, 10),
    FieldDefinition::fixed(79, "Transfer Rev", N, 10),
    FieldDefinition::fixed(80, "Inquiries", N, 10),
    FieldDefinition::fixed(81, "Auths", N, 10),
    FieldDefinition::fixed(82, "Credit Fee", N, 12),
    FieldDefinition::fixed(83, "Credit Txn", N, 12),
    FieldDefinition::fixed(84, "Debit Fee", N, 12),
    FieldDefinition::fixed(85, "Debit Txn", N, 12),
    FieldDefinition::fixed(86, "Credit Amt", N, 16),
    FieldDefinition::fixed(87, "Credit Rev", N, 16),
    FieldDefinition::fixed(88, "Debit Amt", N, 16),
    FieldDefinition::fixed(89, "Debit Rev", N, 16),
    FieldDefinition::fixed(90, "Original", N, 42),
    FieldDefinition::fixed(91, "File Update", T, 1),
    FieldDefinition::fixed(92, "File Sec", T, 2),
    FieldDefinition::fixed(93, "Resp Ind", T, 5),
    FieldDefinition::fixed(94, "Service Ind", T, 7),
    FieldDefinition::fixed(95, "Replacement", T, 42),
    FieldDefinition::fixed(96, "Msg Security", B, 8),
    FieldDefinition::fixed(97, "Net Settle", T, 17),
    FieldDefinition::fixed(98, "Payee", T, 25),
    FieldDefinition::variable(99, "Settle Inst", N, 2),
    FieldDefinition::variable(100, "Receiver", N, 2),
    FieldDefinition::variable(101, "File Name", T, 2),
    FieldDefinition::variable(102, "Account 1", T, 2),
    FieldDefinition::variable(103, "Account 2", T, 2),
    FieldDefinition::variable(104, "Description", T, 3),
    FieldDefinition::variable(105, "Reserved ISO", T, 3),
    FieldDefinition::variable(106, "Reserved ISO", T, 3),
    FieldDefinition::variable(107, "Reserved ISO", T, 3),
    FieldDefinition::variable(108, "Reserved ISO", T, 3),
    FieldDefinition::variable(109, "Reserved ISO", T, 3),
    FieldDefinition::variable(110, "Reserved ISO", T, 3),
    FieldDefinition::variable(111, "Reserved ISO", T, 3),
    FieldDefinition::variable(112, "Reserved Nat", T, 3),
    FieldDefinition::variable(113, "Reserved Nat", T, 3),
    FieldDefinition::variable(114, "Reserved Nat", T, 3),
    FieldDefinition::variable(115, "Reserved Nat", T, 3),
    FieldDefinition::variable(116, "Reserved Nat", T, 3),
    FieldDefinition::variable(117, "Reserved Nat", T, 3),
    FieldDefinition::variable(118, "Reserved Nat", T, 3),
    FieldDefinition::variable(119, "Reserved Nat", T, 3),
    FieldDefinition::variable(120, "Private", T, 3),
    FieldDefinition::variable(121, "Private", T, 3),
    FieldDefinition::variable(122, "Private", T, 3),
    FieldDefinition::variable(123, "Private", T, 3),
    FieldDefinition::variable(124, "Private", T, 3),
    FieldDefinition::variable(125, "Private", T, 3),
    FieldDefinition::variable(126, "Private", T, 3),
    FieldDefinition::variable(127, "Private", T, 3),
    FieldDefinition::fixed(128, "MAC 2", B, 8),
];
