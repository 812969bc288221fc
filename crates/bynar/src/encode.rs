//! Encoding and size estimation for bynar values.
//!
//! Both are the same walk driven into a different [`Sink`]: the estimator
//! counts bytes, the encoders store them. `encoded_len(tree, v)` therefore
//! always equals `encode(tree, v)?.len()`.
//!
//! | Value  | Encoding                    |
//! |--------|-----------------------------|
//! | null   | `0x00`                      |
//! | bool   | `T` / `F`                   |
//! | int    | `i<decimal>;`               |
//! | float  | `f<decimal>;`               |
//! | string | `s<len>:<bytes>`            |
//! | list   | `l<values>;`                |
//! | dict   | `d<key><value>...;`         |
//!
//! Floats use the shortest text that parses back to the same `f64`
//! (Rust's `{:?}` form: `1.23`, `42.0`, `1e-7`, `NaN`, `-inf`), independent
//! of platform and locale.

use std::fmt;

use crate::error::{Error, Result};
use crate::tag::{END, LEN_SEP, Tag};
use crate::tree::Tree;
use crate::value::NodeId;
use crate::walk::{Event, Walk};

/// Destination for encoded bytes.
pub trait Sink {
    fn put(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Counts bytes without storing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counter(pub usize);

impl Sink for Counter {
    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.0 += bytes.len();
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.try_reserve(bytes.len())?;
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Writes into a fixed caller-provided buffer.
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceSink<'a> {
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.pos
    }
}

impl Sink for SliceSink<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos + bytes.len();
        let available = self.buf.len();
        let dest = self.buf.get_mut(self.pos..end).ok_or(Error::BufferTooSmall {
            needed: end,
            available,
        })?;
        dest.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

/// Adapter so `write!` can format numbers straight into a sink.
struct Formatted<'s, S: Sink> {
    sink: &'s mut S,
    error: Option<Error>,
}

impl<S: Sink> fmt::Write for Formatted<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.put(s.as_bytes()).map_err(|err| {
            self.error = Some(err);
            fmt::Error
        })
    }
}

fn put_fmt<S: Sink>(sink: &mut S, args: fmt::Arguments<'_>) -> Result<()> {
    let mut out = Formatted { sink, error: None };
    fmt::write(&mut out, args).map_err(|_| out.error.take().unwrap_or(Error::AllocationFailure))
}

fn put_event<S: Sink>(sink: &mut S, event: &Event<'_>) -> Result<()> {
    match *event {
        Event::Null => sink.put(&[Tag::Null.byte()]),
        Event::Bool(b) => sink.put(&[Tag::bool(b).byte()]),
        Event::Int(n) => {
            sink.put(&[Tag::Int.byte()])?;
            put_fmt(sink, format_args!("{n}"))?;
            sink.put(&[END])
        }
        Event::Float(n) => {
            sink.put(&[Tag::Float.byte()])?;
            put_fmt(sink, format_args!("{n:?}"))?;
            sink.put(&[END])
        }
        Event::String(bytes) => {
            sink.put(&[Tag::String.byte()])?;
            put_fmt(sink, format_args!("{}", bytes.len()))?;
            sink.put(&[LEN_SEP])?;
            sink.put(bytes)
        }
        Event::OpenList => sink.put(&[Tag::List.byte()]),
        Event::OpenDict => sink.put(&[Tag::Dict.byte()]),
        Event::Close => sink.put(&[END]),
    }
}

/// Encode the subtree at `root` into any [`Sink`].
pub fn encode_to<S: Sink>(tree: &Tree, root: NodeId, sink: &mut S) -> Result<()> {
    for event in Walk::new(tree, root) {
        put_event(sink, &event?)?;
    }
    Ok(())
}

/// Exact number of bytes [`encode`] will produce for `root`.
pub fn encoded_len(tree: &Tree, root: NodeId) -> Result<usize> {
    let mut counter = Counter::default();
    encode_to(tree, root, &mut counter)?;
    Ok(counter.0)
}

/// Encode `root` into a new buffer sized by [`encoded_len`].
///
/// # Errors
///
/// `AllocationFailure` if the buffer cannot be reserved, `InvalidNode`
/// for a stale handle.
pub fn encode(tree: &Tree, root: NodeId) -> Result<Vec<u8>> {
    let len = encoded_len(tree, root)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len)?;
    encode_to(tree, root, &mut out)?;
    debug_assert_eq!(out.len(), len);
    Ok(out)
}

/// Encode `root` into `out`, returning the number of bytes written.
///
/// Checks the size first, so on `BufferTooSmall` nothing is written.
pub fn encode_into(tree: &Tree, root: NodeId, out: &mut [u8]) -> Result<usize> {
    let needed = encoded_len(tree, root)?;
    if needed > out.len() {
        return Err(Error::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }
    let mut sink = SliceSink::new(out);
    encode_to(tree, root, &mut sink)?;
    Ok(sink.written())
}
