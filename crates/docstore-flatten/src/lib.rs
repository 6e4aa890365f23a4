mod fingerprint;
mod flatten;
mod value;

pub use fingerprint::fingerprint;
pub use flatten::{flatten, schema_elements, FlattenedEntry, SchemaElementDraft};
pub use value::{DataType, TypedValue};

/// Convenience wrapper bundling flatten + intern-ready element list +
/// fingerprint, the shape `docstore-core`'s ingest pipeline actually wants
/// (§2 data flow: raw JSON → C6 → C3 → C4 → ...).
pub struct FlattenResult {
    pub entries: Vec<FlattenedEntry>,
    pub elements: Vec<SchemaElementDraft>,
    pub fingerprint: String,
}

pub fn flatten_document(value: &serde_json::Value) -> FlattenResult {
    let entries = flatten(value);
    let elements = schema_elements(&entries);
    let fp = fingerprint(&elements);
    FlattenResult { entries, elements, fingerprint: fp }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_document_bundles_everything() {
        let result = flatten_document(&json!({ "first": "Joel", "age": 42 }));
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.elements.len(), 2);
        assert_eq!(result.fingerprint.len(), 64);
    }
}
