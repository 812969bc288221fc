//! Bynar: a compact, self-delimiting binary serialization format.
//!
//! Values live in a [`Tree`] arena and are addressed by [`NodeId`] handles.
//! A value becomes owned by exactly one container once attached; free the
//! root with [`Tree::free`] to release a whole tree.
//!
//! ```
//! use bynar::{Tree, decode, encode};
//!
//! let mut tree = Tree::new();
//! let root = decode(&mut tree, b"lf3.21;di42;i17;;s3:Hi!;").unwrap();
//! assert_eq!(encode(&tree, root).unwrap(), b"lf3.21;di42;i17;;s3:Hi!;");
//! tree.free(root).unwrap();
//! assert!(tree.is_empty());
//! ```

pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod scan;
pub mod seq;
pub mod tag;
pub mod tree;
pub mod value;
mod walk;

pub use decode::{DecodeOptions, decode, decode_with};
pub use encode::{Counter, Sink, SliceSink, encode, encode_into, encode_to, encoded_len};
pub use error::{Error, MalformedKind, Result};
pub use json::{from_json, to_json};
pub use scan::find_delimiter;
pub use seq::Growth;
pub use tag::ValueType;
pub use tree::Tree;
pub use value::{DictRef, ListRef, NodeId, Value};
