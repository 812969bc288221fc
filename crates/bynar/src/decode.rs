//! Decoding bynar bytes into a [`Tree`].
//!
//! The decoder makes one left-to-right pass and tracks only the container
//! currently being filled. A `;` climbs back to that container's parent
//! through the back-reference, so nesting depth costs no decoder state.
//!
//! Decoding is fail-fast: the first malformed token aborts with
//! [`Error::MalformedInput`], and everything built so far is freed again.
//!
//! ```
//! use bynar::{Tree, decode, encode};
//!
//! let mut tree = Tree::new();
//! let root = decode(&mut tree, b"lf3.21;di42;i17;;s3:Hi!;").unwrap();
//! assert_eq!(encode(&tree, root).unwrap(), b"lf3.21;di42;i17;;s3:Hi!;");
//! ```

use log::{debug, trace};

use crate::error::{Error, MalformedKind, Result};
use crate::tag::{END, LEN_SEP, Tag, ValueType, parse_decimal_len};
use crate::tree::Tree;
use crate::value::NodeId;

/// Options controlling what the decoder accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    max_depth: Option<usize>,
    strict_keys: bool,
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit container nesting. `None` (the default) means unbounded.
    #[must_use]
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Require dict keys to be strings. Off by default, in which case any
    /// scalar key is accepted; container keys are always rejected.
    #[must_use]
    pub fn strict_keys(mut self, strict: bool) -> Self {
        self.strict_keys = strict;
        self
    }
}

/// Decode `buf` into `tree` with default options, returning the new root.
pub fn decode(tree: &mut Tree, buf: &[u8]) -> Result<NodeId> {
    decode_with(tree, buf, &DecodeOptions::default())
}

/// Decode `buf` into `tree`, returning the new root.
///
/// `buf` must hold exactly one value. On error the tree is left as it was.
pub fn decode_with(tree: &mut Tree, buf: &[u8], options: &DecodeOptions) -> Result<NodeId> {
    let mut decoder = Decoder {
        tree,
        buf,
        options,
        pos: 0,
        root: None,
        current: None,
        depth: 0,
    };
    match decoder.run() {
        Ok(root) => Ok(root),
        Err(err) => {
            debug!("bynar decode failed: {err}");
            if let Some(root) = decoder.root {
                decoder.tree.free(root)?;
            }
            Err(err)
        }
    }
}

struct Decoder<'t, 'b, 'o> {
    tree: &'t mut Tree,
    buf: &'b [u8],
    options: &'o DecodeOptions,
    pos: usize,
    root: Option<NodeId>,
    /// Container receiving new values; `None` before the root opens.
    current: Option<NodeId>,
    depth: usize,
}

fn malformed(kind: MalformedKind, offset: usize) -> Error {
    Error::MalformedInput { kind, offset }
}

impl Decoder<'_, '_, '_> {
    fn run(&mut self) -> Result<NodeId> {
        if self.buf.is_empty() {
            return Err(malformed(MalformedKind::Empty, 0));
        }

        loop {
            let start = self.pos;
            let Some(&byte) = self.buf.get(start) else {
                return Err(malformed(MalformedKind::UnterminatedContainer, start));
            };
            let tag = Tag::from_byte(byte).ok_or(malformed(MalformedKind::UnknownTag(byte), start))?;

            let new = match tag {
                Tag::Null => {
                    self.pos += 1;
                    self.tree.null()?
                }
                Tag::True | Tag::False => {
                    self.pos += 1;
                    self.tree.bool(tag == Tag::True)?
                }
                Tag::Int => {
                    let n = self.read_int(start)?;
                    self.tree.int(n)?
                }
                Tag::Float => {
                    let n = self.read_float(start)?;
                    self.tree.float(n)?
                }
                Tag::String => {
                    let (from, to) = self.read_string(start)?;
                    self.tree.string_copy(&self.buf[from..to])?
                }
                Tag::List => {
                    self.pos += 1;
                    self.tree.list(0)?
                }
                Tag::Dict => {
                    self.pos += 1;
                    self.tree.dict(0)?
                }
                Tag::End => {
                    if self.close(start)? {
                        break;
                    }
                    continue;
                }
            };

            let placed = self.attach(new, start)?;
            if self.tree.value_type(placed)?.is_container() {
                self.open(placed, start)?;
            } else if self.current.is_none() {
                // scalar root
                break;
            }
        }

        if self.pos < self.buf.len() {
            return Err(malformed(MalformedKind::TrailingBytes, self.pos));
        }
        self.root
            .ok_or(malformed(MalformedKind::UnterminatedContainer, self.pos))
    }

    /// Attach a freshly built node to the current container, returning the
    /// node that now holds it (a duplicate dict key reuses the old value).
    fn attach(&mut self, new: NodeId, offset: usize) -> Result<NodeId> {
        let result = self.try_attach(new, offset);
        if result.is_err() && self.tree.parent(new)?.is_none() {
            self.tree.free(new)?;
        }
        result
    }

    fn try_attach(&mut self, new: NodeId, offset: usize) -> Result<NodeId> {
        let Some(container) = self.current else {
            self.root = Some(new);
            return Ok(new);
        };

        match self.tree.value_type(container)? {
            ValueType::List => self.tree.list_append(container, new),
            ValueType::Dict => {
                if let Some(key) = self.tree.take_pending_key(container)? {
                    let placed = self.tree.push_entry(container, key, new);
                    if placed.is_err() {
                        self.tree.free(key)?;
                    }
                    return placed;
                }
                let key_type = self.tree.value_type(new)?;
                if key_type.is_container()
                    || key_type == ValueType::Null
                    || (self.options.strict_keys && key_type != ValueType::String)
                {
                    return Err(malformed(MalformedKind::InvalidDictKey, offset));
                }
                self.tree.set_pending_key(container, new)?;
                Ok(new)
            }
            other => Err(Error::UnexpectedType {
                expected: "list or dict",
                found: other.name(),
            }),
        }
    }

    fn open(&mut self, container: NodeId, offset: usize) -> Result<()> {
        self.depth += 1;
        if let Some(max) = self.options.max_depth
            && self.depth > max
        {
            return Err(malformed(MalformedKind::DepthLimitExceeded, offset));
        }
        trace!("open {container:?} at {offset}, depth {}", self.depth);
        self.current = Some(container);
        Ok(())
    }

    /// Close the current container. Returns `true` once the root closed.
    fn close(&mut self, offset: usize) -> Result<bool> {
        let Some(container) = self.current else {
            return Err(malformed(MalformedKind::UnbalancedEnd, offset));
        };
        if self.tree.has_pending_key(container)? {
            return Err(malformed(MalformedKind::MissingDictValue, offset));
        }
        self.pos += 1;
        self.depth -= 1;
        trace!("close {container:?} at {offset}");
        self.current = self.tree.parent(container)?;
        Ok(self.current.is_none())
    }

    /// Text between a tag at `start` and the next `;`; advances past it.
    fn read_number(&mut self, start: usize) -> Result<&[u8]> {
        let body = start + 1;
        let end = self.buf[body..]
            .iter()
            .position(|&b| b == END)
            .map(|i| body + i)
            .ok_or(malformed(MalformedKind::MissingTerminator, start))?;
        self.pos = end + 1;
        Ok(&self.buf[body..end])
    }

    fn read_int(&mut self, start: usize) -> Result<i64> {
        let text = self.read_number(start)?;
        if text.first() == Some(&b'+') {
            return Err(malformed(MalformedKind::InvalidInteger, start));
        }
        std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(malformed(MalformedKind::InvalidInteger, start))
    }

    fn read_float(&mut self, start: usize) -> Result<f64> {
        let text = self.read_number(start)?;
        std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(malformed(MalformedKind::InvalidFloat, start))
    }

    /// Parse `s<len>:` at `start` and return the payload range.
    fn read_string(&mut self, start: usize) -> Result<(usize, usize)> {
        let digits_start = start + 1;
        let digits_len = self.buf[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let colon = digits_start + digits_len;
        match self.buf.get(colon) {
            Some(&LEN_SEP) => {}
            Some(_) | None if digits_len > 0 => {
                return Err(malformed(MalformedKind::MissingColon, start));
            }
            _ => return Err(malformed(MalformedKind::InvalidLength, digits_start)),
        }

        let len = parse_decimal_len(&self.buf[digits_start..colon])
            .ok_or(malformed(MalformedKind::InvalidLength, digits_start))?;
        let from = colon + 1;
        let to = from
            .checked_add(len)
            .filter(|&to| to <= self.buf.len())
            .ok_or(malformed(MalformedKind::TruncatedString, start))?;
        self.pos = to;
        Ok((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::value::Value;

    fn decode_err(buf: &[u8]) -> Error {
        let mut tree = Tree::new();
        let err = decode(&mut tree, buf).unwrap_err();
        assert!(tree.is_empty(), "partial tree left behind for {buf:?}");
        err
    }

    #[test]
    fn test_decode_scalars() {
        let mut tree = Tree::new();
        let n = decode(&mut tree, b"i-42;").unwrap();
        assert!(matches!(tree.get(n).unwrap(), Value::Int(-42)));

        let f = decode(&mut tree, b"f1.23;").unwrap();
        assert_eq!(tree.get(f).unwrap().as_float(), Some(1.23));

        let t = decode(&mut tree, b"T").unwrap();
        assert!(matches!(tree.get(t).unwrap(), Value::Bool(true)));

        let z = decode(&mut tree, b"\x00").unwrap();
        assert!(matches!(tree.get(z).unwrap(), Value::Null));

        let s = decode(&mut tree, b"s5:a;b:c").unwrap();
        assert!(matches!(tree.get(s).unwrap(), Value::String(b"a;b:c")));
    }

    #[test]
    fn test_decode_overview_buffer() {
        let input = b"lf3.21;di42;i17;;s3:Hi!;";
        let mut tree = Tree::new();
        let root = decode(&mut tree, input).unwrap();

        let Value::List(items) = tree.get(root).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        let dict = tree.get(items.get(1).unwrap()).unwrap().as_dict().unwrap();
        assert_eq!(dict.len(), 1);

        let out = encode(&tree, root).unwrap();
        assert_eq!(out.len(), 24);
        assert_eq!(&out[..], &input[..]);
    }

    #[test]
    fn test_decode_empty_containers() {
        let mut tree = Tree::new();
        let l = decode(&mut tree, b"l;").unwrap();
        assert!(tree.get(l).unwrap().as_list().unwrap().is_empty());
        let d = decode(&mut tree, b"d;").unwrap();
        assert!(tree.get(d).unwrap().as_dict().unwrap().is_empty());
    }

    #[test]
    fn test_decode_nested_dict_values() {
        let mut tree = Tree::new();
        let root = decode(&mut tree, b"ds1:ald;;s1:bi2;;").unwrap();
        let a = tree.dict_get(root, b"a").unwrap().unwrap();
        let inner = tree.get(a).unwrap().as_list().unwrap();
        assert_eq!(inner.len(), 1);
        let b = tree.dict_get(root, b"b").unwrap().unwrap();
        assert_eq!(tree.get(b).unwrap().as_int(), Some(2));
    }

    #[test]
    fn test_decode_duplicate_key_keeps_last_value() {
        let mut tree = Tree::new();
        let root = decode(&mut tree, b"ds1:ai7;s1:ai11;;").unwrap();
        assert_eq!(encode(&tree, root).unwrap(), b"ds1:ai11;;");
        // dict, key, value
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_decode_duplicate_key_with_container_value() {
        let mut tree = Tree::new();
        let root = decode(&mut tree, b"ds1:ai1;s1:ali2;i3;;;").unwrap();
        assert_eq!(encode(&tree, root).unwrap(), b"ds1:ali2;i3;;;");
    }

    #[test]
    fn test_decode_strict_keys() {
        let mut tree = Tree::new();
        let options = DecodeOptions::new().strict_keys(true);
        let err = decode_with(&mut tree, b"di42;i17;;", &options).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedInput {
                kind: MalformedKind::InvalidDictKey,
                offset: 1
            }
        );
        assert!(tree.is_empty());
        assert!(decode_with(&mut tree, b"ds1:ki17;;", &options).is_ok());
    }

    #[test]
    fn test_decode_container_key_rejected() {
        assert_eq!(
            decode_err(b"dl;i1;;"),
            Error::MalformedInput {
                kind: MalformedKind::InvalidDictKey,
                offset: 1
            }
        );
    }

    #[test]
    fn test_decode_null_key_rejected() {
        assert_eq!(
            decode_err(b"d\x00i1;;"),
            Error::MalformedInput {
                kind: MalformedKind::InvalidDictKey,
                offset: 1
            }
        );
        assert_eq!(
            decode_err(b"ds1:ai1;\x00T;"),
            Error::MalformedInput {
                kind: MalformedKind::InvalidDictKey,
                offset: 8
            }
        );
    }

    #[test]
    fn test_decode_duplicate_scalar_keys_overwrite() {
        let mut tree = Tree::new();
        let root = decode(&mut tree, b"di1;i2;i1;i3;;").unwrap();
        assert_eq!(encode(&tree, root).unwrap(), b"di1;i3;;");
        let Value::Dict(dict) = tree.get(root).unwrap() else {
            panic!("expected dict");
        };
        assert_eq!(dict.len(), 1);

        // Keys of different types never collide.
        let root = decode(&mut tree, b"di1;Ts1:1;Fi1;\x00;").unwrap();
        assert_eq!(encode(&tree, root).unwrap(), b"di1;\x00s1:1;F;");

        let root = decode(&mut tree, b"df0.5;i1;Ti2;f0.5;i3;;").unwrap();
        assert_eq!(encode(&tree, root).unwrap(), b"df0.5;i3;Ti2;;");
    }

    #[test]
    fn test_decode_depth_limit() {
        let options = DecodeOptions::new().max_depth(Some(2));
        let mut tree = Tree::new();
        assert!(decode_with(&mut tree, b"ll;;", &options).is_ok());
        assert_eq!(
            decode_with(&mut tree, b"lll;;;", &options).unwrap_err(),
            Error::MalformedInput {
                kind: MalformedKind::DepthLimitExceeded,
                offset: 2
            }
        );
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_decode_deep_nesting_without_limit() {
        let depth = 100_000;
        let mut buf = vec![b'l'; depth];
        buf.extend(std::iter::repeat_n(b';', depth));
        let mut tree = Tree::new();
        let root = decode(&mut tree, &buf).unwrap();
        assert_eq!(tree.len(), depth);
        assert_eq!(encode(&tree, root).unwrap(), buf);
        tree.free(root).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_decode_errors() {
        use MalformedKind::*;
        let cases: &[(&[u8], MalformedKind, usize)] = &[
            (b"", Empty, 0),
            (b"x", UnknownTag(b'x'), 0),
            (b"li1;x;", UnknownTag(b'x'), 4),
            (b"i12", MissingTerminator, 0),
            (b"lf1.5", MissingTerminator, 1),
            (b"i1a;", InvalidInteger, 0),
            (b"i+1;", InvalidInteger, 0),
            (b"i99999999999999999999;", InvalidInteger, 0),
            (b"fabc;", InvalidFloat, 0),
            (b"s3abc", MissingColon, 0),
            (b"s:abc", InvalidLength, 1),
            (b"s-1:a", InvalidLength, 1),
            (b"s10:abc", TruncatedString, 0),
            (b"li1;", UnterminatedContainer, 4),
            (b"ds1:a;", MissingDictValue, 5),
            (b";", UnbalancedEnd, 0),
            (b"i1;i2;", TrailingBytes, 3),
            (b"l;;", TrailingBytes, 2),
        ];
        for &(buf, kind, offset) in cases {
            assert_eq!(
                decode_err(buf),
                Error::MalformedInput { kind, offset },
                "input {:?}",
                String::from_utf8_lossy(buf)
            );
        }
    }

    #[test]
    fn test_failed_decode_leaves_existing_roots_alone() {
        let mut tree = Tree::new();
        let keep = decode(&mut tree, b"li1;;").unwrap();
        assert!(decode(&mut tree, b"ds1:ali1;i2;").is_err());
        assert_eq!(tree.len(), 2);
        assert_eq!(encode(&tree, keep).unwrap(), b"li1;;");
    }
}
