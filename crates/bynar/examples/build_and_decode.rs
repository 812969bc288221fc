//! Build a value, encode it, decode it back and walk into it.
//!
//! cargo run --package bynar --example build_and_decode

use bynar::{Tree, Value, decode, encode, from_json};

fn main() -> Result<(), bynar::Error> {
    let mut tree = Tree::new();
    let doc = from_json(&mut tree, r#"{"users": [{"name": "Amy"}, {"name": "Bob"}]}"#)?;
    let bytes = encode(&tree, doc)?;
    println!("{}", String::from_utf8_lossy(&bytes));

    let mut decoded = Tree::new();
    let root = decode(&mut decoded, &bytes)?;

    // node = root["users"][1]["name"]
    let Some(users) = decoded.dict_get(root, b"users")? else {
        panic!("missing users")
    };
    let Value::List(list) = decoded.get(users)? else {
        panic!("users is not a list")
    };
    let Some(bob) = list.get(1) else {
        panic!("missing second user")
    };
    let Some(name) = decoded.dict_get(bob, b"name")? else {
        panic!("missing name")
    };
    println!("{}", decoded.get(name)?.as_str().unwrap_or("<binary>"));

    decoded.free(root)?;
    tree.free(doc)?;
    Ok(())
}
