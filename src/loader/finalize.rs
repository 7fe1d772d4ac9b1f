//! Metadata stamping and re-keying (phase 3)

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use profile_inherit::Document;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::LoadReport;
use crate::kind::{
    DocumentKind, IS_ACTIVE_KEY, IS_DELETED_KEY, NAME_KEY, REV_KEY, TIMESTAMP_KEY, TYPE_KEY,
};

/// A document whose inherited or declared id was already taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdReassignment {
    pub name: String,
    pub duplicate_id: String,
    pub assigned_id: String,
}

/// Fill in missing metadata fields.
///
/// A field counts as missing when absent or `null`. The instance id is
/// also regenerated when it is not a non-empty string.
pub fn stamp_defaults<K: DocumentKind>(document: &mut Document, now: DateTime<Utc>) {
    let has_id = matches!(document.get(K::ID_KEY), Some(Value::String(id)) if !id.is_empty());
    if !has_id {
        document.insert(K::ID_KEY.to_string(), Value::String(new_id()));
    }

    set_if_missing(document, REV_KEY, Value::from(1));
    set_if_missing(document, IS_ACTIVE_KEY, Value::Bool(true));
    set_if_missing(document, IS_DELETED_KEY, Value::Bool(false));
    set_if_missing(
        document,
        TIMESTAMP_KEY,
        Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, false)),
    );
}

fn set_if_missing(document: &mut Document, key: &str, default: Value) {
    if document.get(key).map_or(true, Value::is_null) {
        document.insert(key.to_string(), default);
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stamp every resolved document and re-key the set by instance id.
///
/// Documents are processed in name order. A document whose id is
/// already taken (usually inherited from an explicit parent id) gets a
/// fresh one.
pub fn finalize<K: DocumentKind>(
    resolved: BTreeMap<String, Document>,
    now: DateTime<Utc>,
    report: &mut LoadReport,
) -> BTreeMap<String, Document> {
    let mut by_id = BTreeMap::new();

    for (name, mut document) in resolved {
        stamp_defaults::<K>(&mut document, now);

        let mut id = string_field(&document, K::ID_KEY).to_string();
        if by_id.contains_key(&id) {
            let assigned = new_id();
            warn!(
                kind = K::LABEL,
                name = %name,
                duplicate_id = %id,
                assigned_id = %assigned,
                "instance id already taken, assigning a fresh one"
            );
            report.reassigned_ids.push(IdReassignment {
                name: name.clone(),
                duplicate_id: id,
                assigned_id: assigned.clone(),
            });
            document.insert(K::ID_KEY.to_string(), Value::String(assigned.clone()));
            id = assigned;
        }

        info!(
            kind = K::LABEL,
            doc_type = string_field(&document, TYPE_KEY),
            name = string_field(&document, NAME_KEY),
            id = %id,
            base = string_field(&document, K::BASE_KEY),
            "finalized document"
        );
        by_id.insert(id, document);
    }

    report.finalized = by_id.len();
    by_id
}

fn string_field<'a>(document: &'a Document, key: &str) -> &'a str {
    document.get(key).and_then(Value::as_str).unwrap_or("None")
}
