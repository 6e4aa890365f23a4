use docstore_index::TableMapper;
use docstore_schema::SchemaRegistry;
use docstore_storage::Backend;

use crate::error::DocStoreError;

/// Creates every fixed table the system needs (§6's persisted-state list),
/// delegating the tables each sibling crate owns to that crate so the DDL
/// for a table lives next to the code that reads/writes it.
pub fn ensure_fixed_tables(backend: &Backend) -> Result<(), DocStoreError> {
    SchemaRegistry::new(backend).ensure_tables()?;
    TableMapper::new(backend).ensure_tables()?;

    let d = backend.dialect();

    let collections_cols = format!(
        "id {pk} PRIMARY KEY, name {short} NOT NULL, description {text}, documents_directory {short} NOT NULL, \
         schema_enforcement_mode {short} NOT NULL, indexing_mode {short} NOT NULL, \
         created_utc {ts} NOT NULL, last_update_utc {ts} NOT NULL",
        pk = d.short_text_type(),
        short = d.short_text_type(),
        text = d.text_type(),
        ts = d.timestamp_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("collections", &d.quote_ident("collections"), &collections_cols),
        &[],
    )?;
    backend
        .exec_nonquery(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS collections_name_idx ON {} (name)",
                d.quote_ident("collections")
            ),
            &[],
        )
        .ok();

    let documents_cols = format!(
        "id {pk} PRIMARY KEY, collection_id {short} NOT NULL, schema_id {short} NOT NULL, name {short}, \
         content_length {int} NOT NULL, sha256 {short} NOT NULL, \
         created_utc {ts} NOT NULL, last_update_utc {ts} NOT NULL",
        pk = d.short_text_type(),
        short = d.short_text_type(),
        int = d.integer_type(),
        ts = d.timestamp_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("documents", &d.quote_ident("documents"), &documents_cols),
        &[],
    )?;
    backend
        .exec_nonquery(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS documents_collection_name_idx ON {} (collection_id, name)",
                d.quote_ident("documents")
            ),
            &[],
        )
        .ok();

    let labels_cols = format!(
        "id {pk}, document_id {short} NOT NULL, label_value {short} NOT NULL",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("labels", &d.quote_ident("labels"), &labels_cols),
        &[],
    )?;

    let collectionlabels_cols = format!(
        "id {pk}, collection_id {short} NOT NULL, label_value {short} NOT NULL",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists(
            "collectionlabels",
            &d.quote_ident("collectionlabels"),
            &collectionlabels_cols,
        ),
        &[],
    )?;

    // `owner_kind` discriminates whether `owner_id` names a collection or a
    // document, since §3 defines Tag as keyed by `collection_id|document_id`.
    let tags_cols = format!(
        "id {pk}, owner_kind {short} NOT NULL, owner_id {short} NOT NULL, key {short} NOT NULL, value {text}",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
        text = d.text_type(),
    );
    backend.exec_nonquery(&d.create_if_not_exists("tags", &d.quote_ident("tags"), &tags_cols), &[])?;

    let constraints_cols = format!(
        "id {pk}, collection_id {short} NOT NULL, field_path {short} NOT NULL, data_type {short} NOT NULL, \
         required {boolean} NOT NULL, nullable {boolean} NOT NULL, regex_pattern {text}, \
         min_value {real}, max_value {real}, min_length {int}, max_length {int}, \
         allowed_values {text}, array_element_type {short}",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
        boolean = d.boolean_type(),
        text = d.text_type(),
        real = "REAL",
        int = d.integer_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("fieldconstraints", &d.quote_ident("fieldconstraints"), &constraints_cols),
        &[],
    )?;

    let indexedfields_cols = format!(
        "id {pk}, collection_id {short} NOT NULL, field_path {short} NOT NULL",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("indexedfields", &d.quote_ident("indexedfields"), &indexedfields_cols),
        &[],
    )?;

    let objectlocks_cols = format!(
        "id {pk}, collection_id {short} NOT NULL, document_name {short} NOT NULL, \
         hostname {short} NOT NULL, created_utc {ts} NOT NULL",
        pk = d.autoincrement_pk(),
        short = d.short_text_type(),
        ts = d.timestamp_type(),
    );
    backend.exec_nonquery(
        &d.create_if_not_exists("objectlocks", &d.quote_ident("objectlocks"), &objectlocks_cols),
        &[],
    )?;
    backend
        .exec_nonquery(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS objectlocks_collection_name_idx ON {} (collection_id, document_name)",
                d.quote_ident("objectlocks")
            ),
            &[],
        )
        .ok();

    Ok(())
}
