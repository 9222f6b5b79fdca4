use std::collections::HashMap;

use serde_json::Value;

use crate::store::{Fields, Formula, RecordStore, StoreError};

/// The store serves at most this many records per select page; linked-record
/// lookups stay within a single page.
const PAGE_LIMIT: u32 = 100;

/// fetch_linked_names
///
/// Resolves a set of linked-record ids to their display names in one bounded
/// select over `OR(RECORD_ID() = ...)`. Empty input yields an empty map without
/// touching the store. Ids the store does not return are simply absent from the
/// map; the caller decides what to show instead.
pub async fn fetch_linked_names(
    store: &dyn RecordStore,
    table: &str,
    ids: &[String],
    name_field: &str,
) -> Result<HashMap<String, String>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let filter = Formula::any_of(ids.iter().map(|id| Formula::record_id_is(id)).collect());
    let records = store.select(table, Some(filter), Some(PAGE_LIMIT)).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let name = record.str_field(name_field).to_string();
            (record.id, name)
        })
        .collect())
}

/// ensure_linked_records
///
/// Maps display names to record ids, creating records for names the table does
/// not hold yet. One select over the distinct names, one batched create for the
/// missing ones. The returned ids line up with the input names, duplicates
/// included. Matching is exact and case-sensitive: a candidate the store
/// returns under a differently-cased name does not count as existing.
pub async fn ensure_linked_records(
    store: &dyn RecordStore,
    table: &str,
    names: &[String],
    name_field: &str,
) -> Result<Vec<String>, StoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut distinct: Vec<&String> = Vec::new();
    for name in names {
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }

    let filter = Formula::any_of(
        distinct
            .iter()
            .map(|name| Formula::field_eq(name_field, name.as_str()))
            .collect(),
    );
    let existing = store.select(table, Some(filter), Some(PAGE_LIMIT)).await?;

    let mut id_by_name: HashMap<String, String> = existing
        .into_iter()
        .map(|record| (record.str_field(name_field).to_string(), record.id))
        .collect();

    let missing: Vec<&String> = distinct
        .iter()
        .copied()
        .filter(|name| !id_by_name.contains_key(*name))
        .collect();

    if !missing.is_empty() {
        let batch: Vec<Fields> = missing
            .iter()
            .map(|name| {
                let mut fields = Fields::new();
                fields.insert(name_field.to_string(), Value::String((*name).clone()));
                fields
            })
            .collect();
        let created = store.create(table, batch).await?;
        // Key by the requested name, so the map is complete even if the store
        // normalizes the stored value.
        for (name, record) in missing.iter().zip(created) {
            id_by_name.insert((*name).clone(), record.id);
        }
    }

    Ok(names
        .iter()
        .map(|name| id_by_name.get(name).cloned().unwrap_or_default())
        .collect())
}
