use sha2::{Digest, Sha256};

use crate::flatten::SchemaElementDraft;

/// A stable hash (hex SHA-256) of the sorted list of `(path, data_type,
/// nullable)` triples collected while walking a document (§4.3).
///
/// Two documents with identical sorted triples produce the same
/// fingerprint regardless of emission order, since the triples are sorted
/// before hashing.
pub fn fingerprint(elements: &[SchemaElementDraft]) -> String {
    let mut triples: Vec<String> = elements
        .iter()
        .map(|e| format!("{}\u{1}{}\u{1}{}", e.key, e.data_type.as_str(), e.nullable))
        .collect();
    triples.sort();

    let mut hasher = Sha256::new();
    for triple in &triples {
        hasher.update(triple.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{flatten, schema_elements};
    use serde_json::json;

    #[test]
    fn identical_documents_share_fingerprint() {
        let a = flatten(&json!({ "first": "Joel", "age": 42 }));
        let b = flatten(&json!({ "age": 42, "first": "Joel" }));
        assert_eq!(
            fingerprint(&schema_elements(&a)),
            fingerprint(&schema_elements(&b))
        );
    }

    #[test]
    fn different_shapes_produce_different_fingerprints() {
        let a = flatten(&json!({ "first": "Joel" }));
        let b = flatten(&json!({ "first": 1 }));
        assert_ne!(
            fingerprint(&schema_elements(&a)),
            fingerprint(&schema_elements(&b))
        );
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let doc = flatten(&json!({ "a": 1, "b": [1, 2, 3] }));
        let elements = schema_elements(&doc);
        assert_eq!(fingerprint(&elements), fingerprint(&elements));
    }
}
