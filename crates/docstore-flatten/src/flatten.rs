use serde_json::Value as Json;

use crate::value::{DataType, TypedValue};

/// One `(field-path, scalar-value, position)` tuple emitted while walking
/// a document (§4.3). `position` is set only when the source path
/// traversed an array.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedEntry {
    pub path: String,
    pub value: TypedValue,
    pub position: Option<i64>,
}

/// One deduplicated element of a schema (§4.4 `SchemaElement`), ordered by
/// first emission position within the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElementDraft {
    pub key: String,
    pub data_type: DataType,
    pub nullable: bool,
}

fn child_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// Walk a parsed JSON value, emitting `(path, value, position)` tuples for
/// every scalar leaf.
///
/// Object members append `.member` to the path. Array elements append
/// nothing to the path but set `position = index`. Only one level of
/// positional unfolding: arrays nested inside arrays flatten outer
/// positions only — inner elements appear with the outermost position of
/// their enclosing array element.
pub fn flatten(value: &Json) -> Vec<FlattenedEntry> {
    let mut out = Vec::new();
    walk(value, "", None, &mut out);
    out
}

fn walk(value: &Json, path: &str, position: Option<i64>, out: &mut Vec<FlattenedEntry>) {
    match value {
        Json::Object(map) => {
            for (key, child) in map {
                walk(child, &child_path(path, key), position, out);
            }
        }
        Json::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let pos = position.or(Some(index as i64));
                walk(item, path, pos, out);
            }
        }
        scalar => {
            if let Some(typed) = TypedValue::from_json_scalar(scalar) {
                out.push(FlattenedEntry {
                    path: path.to_string(),
                    value: typed,
                    position,
                });
            }
        }
    }
}

/// Collapse the emitted entries into one ordered, deduplicated element per
/// path (§4.4), keeping first-emission order and OR-ing nullability across
/// every encounter of that path (§4.3).
pub fn schema_elements(entries: &[FlattenedEntry]) -> Vec<SchemaElementDraft> {
    let mut order: Vec<String> = Vec::new();
    let mut by_path: std::collections::HashMap<String, (DataType, bool)> =
        std::collections::HashMap::new();

    for entry in entries {
        let is_null = matches!(entry.value, TypedValue::Null);
        let entry_type = entry.value.data_type();
        by_path
            .entry(entry.path.clone())
            .and_modify(|(ty, nullable)| {
                *nullable = *nullable || is_null;
                if *ty == DataType::Null && entry_type != DataType::Null {
                    *ty = entry_type;
                }
            })
            .or_insert_with(|| {
                order.push(entry.path.clone());
                (entry_type, is_null)
            });
    }

    order
        .into_iter()
        .map(|path| {
            let (data_type, nullable) = by_path[&path];
            SchemaElementDraft { key: path, data_type, nullable }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_object_produces_dotted_paths() {
        let doc = json!({ "first": "Joel", "age": 42 });
        let entries = flatten(&doc);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path == "first" && e.position.is_none()));
        assert!(entries.iter().any(|e| e.path == "age" && e.position.is_none()));
    }

    #[test]
    fn nested_object_appends_member_path() {
        let doc = json!({ "user": { "address": { "city": "NYC" } } });
        let entries = flatten(&doc);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "user.address.city");
        assert_eq!(entries[0].value, TypedValue::String("NYC".into()));
    }

    #[test]
    fn array_of_scalars_sets_position_without_changing_path() {
        let doc = json!({ "tags": ["a", "b", "c"] });
        let entries = flatten(&doc);
        assert_eq!(entries.len(), 3);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.path, "tags");
            assert_eq!(entry.position, Some(i as i64));
        }
    }

    #[test]
    fn array_of_objects_propagates_position_through_members() {
        let doc = json!({ "items": [{"name": "A"}, {"name": "B"}] });
        let entries = flatten(&doc);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "items.name");
        assert_eq!(entries[0].position, Some(0));
        assert_eq!(entries[1].position, Some(1));
    }

    #[test]
    fn nested_arrays_keep_outermost_position_only() {
        let doc = json!({ "grid": [["a", "b"], ["c"]] });
        let entries = flatten(&doc);
        // outer array has 2 elements; each inner array's elements inherit the
        // outer index rather than their own.
        assert_eq!(entries.len(), 3);
        assert!(entries[0..2].iter().all(|e| e.position == Some(0)));
        assert!(entries[2].position == Some(1));
    }

    #[test]
    fn objects_and_arrays_are_never_emitted_as_leaves() {
        let doc = json!({ "meta": {}, "list": [] });
        let entries = flatten(&doc);
        assert!(entries.is_empty());
    }

    #[test]
    fn null_leaf_is_recorded_with_null_type() {
        let doc = json!({ "deleted_at": null });
        let entries = flatten(&doc);
        assert_eq!(entries[0].value, TypedValue::Null);
        assert_eq!(entries[0].value.data_type(), DataType::Null);
    }

    #[test]
    fn schema_elements_dedupe_and_or_nullability() {
        let doc = json!({ "scores": [1, null, 3] });
        let entries = flatten(&doc);
        let elements = schema_elements(&entries);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].key, "scores");
        assert_eq!(elements[0].data_type, DataType::Integer);
        assert!(elements[0].nullable);
    }

    #[test]
    fn schema_elements_preserve_first_emission_order() {
        let doc = json!({ "b": 1, "a": 2 });
        let entries = flatten(&doc);
        let elements = schema_elements(&entries);
        assert_eq!(elements.iter().map(|e| e.key.clone()).collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
