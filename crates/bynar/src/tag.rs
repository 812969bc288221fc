//! Tag bytes of the bynar wire format.
//!
//! Every encoded value starts with a single ASCII tag byte (or a zero byte
//! for null). Numbers and containers end with [`END`]; strings carry their
//! length before [`LEN_SEP`] and have no terminator.

/// Closes numbers, lists and dicts.
pub const END: u8 = b';';

/// Separates a string's decimal length from its payload.
pub const LEN_SEP: u8 = b':';

/// Value type of a node, used for dispatch and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Dict,
}

impl ValueType {
    /// Get the type name as a string (for error messages).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Dict => "dict",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, ValueType::List | ValueType::Dict)
    }
}

/// A parsed tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Null,
    True,
    False,
    Int,
    Float,
    String,
    List,
    Dict,
    End,
}

impl Tag {
    /// Parse a tag byte, or `None` if the byte starts no value.
    #[inline]
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Tag::Null),
            b'T' => Some(Tag::True),
            b'F' => Some(Tag::False),
            b'i' => Some(Tag::Int),
            b'f' => Some(Tag::Float),
            b's' => Some(Tag::String),
            b'l' => Some(Tag::List),
            b'd' => Some(Tag::Dict),
            END => Some(Tag::End),
            _ => None,
        }
    }

    /// Get the raw tag byte.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Tag::Null => 0x00,
            Tag::True => b'T',
            Tag::False => b'F',
            Tag::Int => b'i',
            Tag::Float => b'f',
            Tag::String => b's',
            Tag::List => b'l',
            Tag::Dict => b'd',
            Tag::End => END,
        }
    }

    /// Tag for a boolean value.
    #[inline]
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        if value { Tag::True } else { Tag::False }
    }
}

/// Parse unsigned decimal digits. Returns `None` on empty input, a
/// non-digit byte, or overflow.
#[must_use]
pub fn parse_decimal_len(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(usize::from(b - b'0'))?;
    }
    Some(n)
}
