//! Tests using the `vectors.json` test vectors.

use bynar::{Error, Tree, decode, encode, encoded_len, to_json};
use serde::Deserialize;

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

#[derive(Deserialize)]
struct TestVectors {
    valid: Vec<ValidTest>,
    invalid: Vec<InvalidTest>,
}

#[derive(Deserialize)]
struct ValidTest {
    description: String,
    hex: String,
    /// Canonical re-encoding, when it differs from the input.
    #[serde(default)]
    encoded: Option<String>,
    #[serde(default)]
    json: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct InvalidTest {
    description: String,
    hex: String,
    kind: String,
    offset: usize,
}

fn load_vectors() -> TestVectors {
    let json = include_str!("testdata/vectors.json");
    serde_json::from_str(json).expect("Failed to parse test vectors")
}

#[test]
fn test_valid_vectors_reencode() {
    let vectors = load_vectors();
    for case in &vectors.valid {
        let input = hex_to_bytes(&case.hex);
        let expected = hex_to_bytes(case.encoded.as_deref().unwrap_or(&case.hex));

        let mut tree = Tree::new();
        let root = decode(&mut tree, &input)
            .unwrap_or_else(|e| panic!("decode failed for '{}': {}", case.description, e));

        let out = encode(&tree, root).unwrap();
        assert_eq!(out, expected, "re-encode mismatch for '{}'", case.description);
        assert_eq!(
            encoded_len(&tree, root).unwrap(),
            expected.len(),
            "size mismatch for '{}'",
            case.description
        );

        tree.free(root).unwrap();
        assert!(tree.is_empty(), "leaked nodes for '{}'", case.description);
    }
}

#[test]
fn test_valid_vectors_json() {
    let vectors = load_vectors();
    for case in vectors.valid.iter().filter(|c| c.json.is_some()) {
        let Some(expected) = &case.json else {
            continue;
        };
        let mut tree = Tree::new();
        let root = decode(&mut tree, &hex_to_bytes(&case.hex)).unwrap();
        let result = to_json(&tree, root)
            .unwrap_or_else(|e| panic!("to_json failed for '{}': {}", case.description, e));
        assert_eq!(
            result,
            serde_json::to_string(expected).unwrap(),
            "JSON mismatch for '{}'",
            case.description
        );
    }
}

#[test]
fn test_invalid_vectors() {
    let vectors = load_vectors();
    for case in &vectors.invalid {
        let mut tree = Tree::new();
        let keep = tree.string_copy("untouched").unwrap();

        let err = decode(&mut tree, &hex_to_bytes(&case.hex)).unwrap_err();
        let Error::MalformedInput { kind, offset } = err else {
            panic!("unexpected error for '{}': {err:?}", case.description);
        };
        assert_eq!(format!("{kind:?}"), case.kind, "kind for '{}'", case.description);
        assert_eq!(offset, case.offset, "offset for '{}'", case.description);

        // Only the unrelated root survives.
        assert_eq!(tree.len(), 1, "partial tree left for '{}'", case.description);
        assert_eq!(tree.get(keep).unwrap().as_str(), Some("untouched"));
    }
}
