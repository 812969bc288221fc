//! JSON bridge tests driven through the public API.

use bynar::{Error, Tree, decode, encode, from_json, to_json};

#[test]
fn test_json_roundtrip_documents() {
    let documents = [
        "null",
        "[]",
        "{}",
        r#"[1,-2,3.5,"four",true,false,null]"#,
        r#"{"users":[{"name":"Amy","age":31},{"name":"Bob","age":27}]}"#,
        r#"{"z":1,"a":2,"m":{"nested":{"deep":[[[]]]}}}"#,
        r#"{"bin":"b64:AAEC/w=="}"#,
    ];
    for original in documents {
        let mut tree = Tree::new();
        let root = from_json(&mut tree, original)
            .unwrap_or_else(|e| panic!("from_json failed for {original}: {e}"));
        let result = to_json(&tree, root).unwrap();
        assert_eq!(result, original, "roundtrip failed");
    }
}

#[test]
fn test_json_through_wire_format() {
    let mut tree = Tree::new();
    let root = from_json(&mut tree, r#"{"k":[1,"v",{"x":null}]}"#).unwrap();
    let bytes = encode(&tree, root).unwrap();
    assert_eq!(bytes, b"ds1:kli1;s1:vds1:x\x00;;;");

    let mut other = Tree::new();
    let copy = decode(&mut other, &bytes).unwrap();
    assert!(tree.structurally_eq(root, &other, copy).unwrap());
    assert_eq!(to_json(&other, copy).unwrap(), r#"{"k":[1,"v",{"x":null}]}"#);
}

#[test]
fn test_json_deep_nesting() {
    let depth = 100;
    let json = format!("{}{}", "[".repeat(depth), "]".repeat(depth));

    let mut tree = Tree::new();
    let root = from_json(&mut tree, &json).unwrap();
    let bytes = encode(&tree, root).unwrap();
    assert_eq!(bytes, format!("{}{}", "l".repeat(depth), ";".repeat(depth)).as_bytes());
    assert_eq!(to_json(&tree, root).unwrap(), json);
    tree.free(root).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn test_json_errors_leave_tree_clean() {
    let mut tree = Tree::new();
    assert!(matches!(
        from_json(&mut tree, "[1, 2"),
        Err(Error::JsonParse(_))
    ));
    assert!(tree.is_empty());

    let inf = decode(&mut tree, b"lfinf;;").unwrap();
    assert!(matches!(to_json(&tree, inf), Err(Error::NonFiniteFloat(_))));
}
