//! Error types for bynar operations.

use std::fmt;

/// The specific way a buffer failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// The buffer holds no bytes at all.
    Empty,
    /// A byte that does not start any value.
    UnknownTag(u8),
    /// An `i` or `f` value without its closing `;`.
    MissingTerminator,
    /// An `s` value without the `:` ending its length.
    MissingColon,
    /// Integer text that is not a decimal `i64`.
    InvalidInteger,
    /// Float text that does not parse as `f64`.
    InvalidFloat,
    /// String length that is not plain decimal digits.
    InvalidLength,
    /// String payload runs past the end of the buffer.
    TruncatedString,
    /// Buffer ended while a list or dict was still open.
    UnterminatedContainer,
    /// A `;` with no open list or dict.
    UnbalancedEnd,
    /// A dict closed between a key and its value.
    MissingDictValue,
    /// A dict key that is not allowed (containers, or non-strings in strict mode).
    InvalidDictKey,
    /// Bytes remain after the root value completed.
    TrailingBytes,
    /// Containers nested deeper than the configured limit.
    DepthLimitExceeded,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::Empty => write!(f, "empty input"),
            MalformedKind::UnknownTag(b) => write!(f, "unknown tag byte {b:#04x}"),
            MalformedKind::MissingTerminator => write!(f, "expected `;` to end number"),
            MalformedKind::MissingColon => write!(f, "expected `:` to start string"),
            MalformedKind::InvalidInteger => write!(f, "invalid integer"),
            MalformedKind::InvalidFloat => write!(f, "invalid float"),
            MalformedKind::InvalidLength => write!(f, "invalid string length"),
            MalformedKind::TruncatedString => write!(f, "truncated string payload"),
            MalformedKind::UnterminatedContainer => write!(f, "unterminated list or dict"),
            MalformedKind::UnbalancedEnd => write!(f, "`;` without open container"),
            MalformedKind::MissingDictValue => write!(f, "dict key without value"),
            MalformedKind::InvalidDictKey => write!(f, "invalid dict key"),
            MalformedKind::TrailingBytes => write!(f, "trailing bytes after value"),
            MalformedKind::DepthLimitExceeded => write!(f, "nesting depth limit exceeded"),
        }
    }
}

/// Error type for bynar operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    // Storage errors
    /// Backing storage could not be reserved.
    AllocationFailure,
    /// Caller-provided output buffer cannot hold the encoding.
    BufferTooSmall { needed: usize, available: usize },

    // Decode errors
    /// Decoding stopped at the first malformed token.
    MalformedInput { kind: MalformedKind, offset: usize },

    // Tree contract errors
    /// Dict keys must be strings.
    InvalidKeyType { found: &'static str },
    /// Expected one type but found another.
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    /// Node id is stale or belongs to another tree.
    InvalidNode,
    /// Node already has a parent.
    AlreadyAttached,
    /// Attaching the node would make it its own ancestor.
    CycleDetected,
    /// Only a root node can be freed.
    NotRoot,

    // JSON errors
    /// Failed to parse JSON input.
    JsonParse(String),
    /// Failed to serialize to JSON.
    JsonSerialize(String),
    /// f64 is NaN or Infinity (not representable in JSON).
    NonFiniteFloat(f64),
    /// JSON object keys must be strings.
    NonStringKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationFailure => write!(f, "allocation failure"),
            Error::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: need {needed} bytes, have {available}")
            }
            Error::MalformedInput { kind, offset } => {
                write!(f, "malformed input at offset {offset}: {kind}")
            }
            Error::InvalidKeyType { found } => {
                write!(f, "dict key must be a string, found {found}")
            }
            Error::UnexpectedType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Error::InvalidNode => write!(f, "invalid or freed node id"),
            Error::AlreadyAttached => write!(f, "node already has a parent"),
            Error::CycleDetected => write!(f, "node is an ancestor of the container"),
            Error::NotRoot => write!(f, "node is not a root"),
            Error::JsonParse(msg) => write!(f, "JSON parse error: {msg}"),
            Error::JsonSerialize(msg) => write!(f, "JSON serialize error: {msg}"),
            Error::NonFiniteFloat(n) => write!(f, "cannot encode non-finite float {n} as JSON"),
            Error::NonStringKey => write!(f, "JSON object keys must be strings"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::AllocationFailure
    }
}

/// Result type alias for bynar operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_offset() {
        let err = Error::MalformedInput {
            kind: MalformedKind::MissingColon,
            offset: 7,
        };
        assert_eq!(
            err.to_string(),
            "malformed input at offset 7: expected `:` to start string"
        );
    }

    #[test]
    fn test_unknown_tag_display_is_hex() {
        assert_eq!(
            MalformedKind::UnknownTag(b'x').to_string(),
            "unknown tag byte 0x78"
        );
    }
}
