//! JSON conversion for bynar values.
//!
//! ```
//! use bynar::{Tree, encode, from_json, to_json};
//!
//! let mut tree = Tree::new();
//! let root = from_json(&mut tree, r#"{"name": "alice", "tags": [1, 2.5]}"#).unwrap();
//! assert_eq!(encode(&tree, root).unwrap(), b"ds4:names5:alices4:tagsli1;f2.5;;;");
//! assert_eq!(to_json(&tree, root).unwrap(), r#"{"name":"alice","tags":[1,2.5]}"#);
//! ```
//!
//! # Mapping
//!
//! | bynar              | JSON                                     |
//! |--------------------|------------------------------------------|
//! | null               | null                                     |
//! | bool               | true/false                               |
//! | int                | integer (fits i64)                       |
//! | float              | other number                             |
//! | string (UTF-8)     | string                                   |
//! | string (non-UTF-8) | string with `b64:` prefix (valid base64) |
//! | list               | array                                    |
//! | dict               | object (keys must be strings)            |
//!
//! Dict order is kept in both directions.

use base64::Engine;
use log::trace;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::tree::Tree;
use crate::value::NodeId;
use crate::walk::{Event, Walk};

const B64_PREFIX: &str = "b64:";

/// Parse a JSON string into a new root in `tree`.
///
/// # Errors
///
/// Returns `Error::JsonParse` if the JSON is invalid. On any error the
/// tree is left as it was.
pub fn from_json(tree: &mut Tree, json: &str) -> Result<NodeId> {
    let json_value: JsonValue =
        serde_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))?;
    from_json_value(tree, &json_value)
}

/// Build a tree from an already parsed JSON value.
pub fn from_json_value(tree: &mut Tree, value: &JsonValue) -> Result<NodeId> {
    let mut builder = Builder {
        tree,
        root: None,
        work: Vec::new(),
    };
    match builder.build(value) {
        Ok(root) => Ok(root),
        Err(err) => {
            if let Some(root) = builder.root {
                builder.tree.free(root)?;
            }
            Err(err)
        }
    }
}

/// Where a built node goes.
#[derive(Clone, Copy)]
enum Target<'j> {
    Root,
    List(NodeId),
    Dict(NodeId, &'j str),
}

struct Builder<'t, 'j> {
    tree: &'t mut Tree,
    root: Option<NodeId>,
    /// Values still to build, last one first.
    work: Vec<(&'j JsonValue, Target<'j>)>,
}

impl<'j> Builder<'_, 'j> {
    fn build(&mut self, value: &'j JsonValue) -> Result<NodeId> {
        self.work.try_reserve(1)?;
        self.work.push((value, Target::Root));

        while let Some((value, target)) = self.work.pop() {
            let id = self.node_for(value)?;
            if let Err(err) = self.place(id, target) {
                self.tree.free(id)?;
                return Err(err);
            }

            // Children are pushed in reverse so they are built in order.
            match value {
                JsonValue::Array(items) => {
                    self.work.try_reserve(items.len())?;
                    self.work
                        .extend(items.iter().rev().map(|item| (item, Target::List(id))));
                }
                JsonValue::Object(obj) => {
                    self.work.try_reserve(obj.len())?;
                    self.work.extend(
                        obj.iter()
                            .rev()
                            .map(|(key, item)| (item, Target::Dict(id, key.as_str()))),
                    );
                }
                _ => {}
            }
        }

        self.root.ok_or(Error::InvalidNode)
    }

    fn node_for(&mut self, value: &JsonValue) -> Result<NodeId> {
        match value {
            JsonValue::Null => self.tree.null(),
            JsonValue::Bool(b) => self.tree.bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => self.tree.int(i),
                None => self.tree.float(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::String(s) => {
                if let Some(b64_payload) = s.strip_prefix(B64_PREFIX)
                    && let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64_payload)
                {
                    return self.tree.string_take(bytes);
                }
                self.tree.string_copy(s)
            }
            JsonValue::Array(items) => self.tree.list(items.len()),
            JsonValue::Object(obj) => self.tree.dict(obj.len()),
        }
    }

    fn place(&mut self, id: NodeId, target: Target<'j>) -> Result<()> {
        match target {
            Target::Root => self.root = Some(id),
            Target::List(list) => {
                self.tree.list_append(list, id)?;
            }
            Target::Dict(dict, key) => {
                self.tree.dict_push_str(dict, key, id)?;
            }
        }
        Ok(())
    }
}

/// Convert the subtree at `root` to a JSON string.
///
/// # Errors
///
/// Returns `Error::NonFiniteFloat` if a float is NaN or Infinity,
/// `Error::NonStringKey` if a dict key is not a string, and
/// `Error::JsonSerialize` if serialization fails.
pub fn to_json(tree: &Tree, root: NodeId) -> Result<String> {
    let json_value = to_json_value(tree, root)?;
    serde_json::to_string(&json_value).map_err(|e| Error::JsonSerialize(e.to_string()))
}

enum Frame {
    Array(Vec<JsonValue>),
    Object {
        map: serde_json::Map<String, JsonValue>,
        key: Option<String>,
    },
}

/// Convert the subtree at `root` to a `serde_json::Value`.
pub fn to_json_value(tree: &Tree, root: NodeId) -> Result<JsonValue> {
    let mut stack: Vec<Frame> = Vec::new();

    for event in Walk::new(tree, root) {
        let value = match event? {
            Event::Null => JsonValue::Null,
            Event::Bool(b) => JsonValue::Bool(b),
            Event::Int(n) => JsonValue::Number(n.into()),
            Event::Float(f) => {
                let num = serde_json::Number::from_f64(f).ok_or(Error::NonFiniteFloat(f))?;
                JsonValue::Number(num)
            }
            Event::String(bytes) => JsonValue::String(bytes_to_text(bytes)),
            Event::OpenList => {
                stack.try_reserve(1)?;
                stack.push(Frame::Array(Vec::new()));
                continue;
            }
            Event::OpenDict => {
                stack.try_reserve(1)?;
                stack.push(Frame::Object {
                    map: serde_json::Map::new(),
                    key: None,
                });
                continue;
            }
            Event::Close => match stack.pop() {
                Some(Frame::Array(items)) => JsonValue::Array(items),
                Some(Frame::Object { map, .. }) => JsonValue::Object(map),
                None => return Err(Error::InvalidNode),
            },
        };

        match stack.last_mut() {
            None => return Ok(value),
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Object { map, key }) => match key.take() {
                Some(k) => {
                    map.insert(k, value);
                }
                None => match value {
                    JsonValue::String(k) => *key = Some(k),
                    _ => {
                        trace!("to_json: dict key is not a string");
                        return Err(Error::NonStringKey);
                    }
                },
            },
        }
    }

    Err(Error::InvalidNode)
}

fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            format!("{B64_PREFIX}{encoded}")
        }
    }
}
