//! Document merge logic
//!
//! Merge semantics:
//! - Objects: deep-merge by key (base key order kept, new keys appended)
//! - Arrays: depends on [`ListMerge`]
//! - Scalars: override (last wins)
//! - Type mismatch: override, never an error

use std::collections::HashMap;

use serde_json::{Map, Value};

/// A configuration document: one parsed YAML mapping.
pub type Document = Map<String, Value>;

/// Field that identifies list items for merge-by-id.
pub const ITEM_ID_KEY: &str = "id";

/// How two arrays found under the same key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMerge {
    /// Inheritance semantics.
    ///
    /// If every item on both sides is an object with an `id`, items are
    /// merged by id: parent order is kept, a child item overwrites the
    /// parent item with the same id in place, new ids are appended in
    /// child order. Otherwise the lists are concatenated and deduplicated
    /// by value, keeping the first occurrence.
    ///
    /// Ids and items compare as JSON values: `1`, `1.0` and `"1"` are
    /// three different ids, and likewise different list items.
    #[default]
    Inherit,

    /// Overlay array replaces the base array entirely.
    Replace,
}

/// Deep merge two JSON values, `overlay` taking precedence.
pub fn deep_merge(base: Value, overlay: Value, lists: ListMerge) -> Value {
    match (base, overlay) {
        // Both objects: deep merge
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map, lists))
        }

        (Value::Array(base_items), Value::Array(overlay_items)) => match lists {
            ListMerge::Inherit => Value::Array(merge_lists(base_items, overlay_items)),
            ListMerge::Replace => Value::Array(overlay_items),
        },

        // Scalars, null and mismatched types: overlay wins
        (_, overlay) => overlay,
    }
}

/// Merge a resolved parent document with a raw child document.
///
/// Neither input is modified; the result is a fresh document.
pub fn inherit(parent: &Document, child: &Document) -> Document {
    merge_maps(parent.clone(), child.clone(), ListMerge::Inherit)
}

/// Merge multiple layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>, lists: ListMerge) -> Value {
    layers
        .into_iter()
        .fold(Value::Null, |merged, layer| deep_merge(merged, layer, lists))
}

fn merge_maps(mut base: Document, overlay: Document, lists: ListMerge) -> Document {
    for (key, overlay_value) in overlay {
        match base.get_mut(&key) {
            // Replace in place so the key keeps its base position
            Some(slot) => {
                let base_value = slot.take();
                *slot = deep_merge(base_value, overlay_value, lists);
            }
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
    base
}

fn merge_lists(base: Vec<Value>, overlay: Vec<Value>) -> Vec<Value> {
    if base.iter().chain(overlay.iter()).all(has_item_id) {
        merge_by_id(base, overlay)
    } else {
        concat_dedup(base, overlay)
    }
}

fn has_item_id(item: &Value) -> bool {
    item.as_object()
        .is_some_and(|obj| obj.contains_key(ITEM_ID_KEY))
}

fn merge_by_id(base: Vec<Value>, overlay: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(base.len() + overlay.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in base.into_iter().chain(overlay) {
        let key = item_key(&item);
        match positions.get(&key) {
            Some(&index) => merged[index] = item,
            None => {
                positions.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

/// JSON text of the item id; keeps `1` and `"1"` apart.
fn item_key(item: &Value) -> String {
    item.get(ITEM_ID_KEY)
        .map(Value::to_string)
        .unwrap_or_default()
}

fn concat_dedup(base: Vec<Value>, overlay: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(base.len() + overlay.len());
    for item in base.into_iter().chain(overlay) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}
