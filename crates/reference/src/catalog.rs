//! Item lookup inside catalog documents.
//!
//! A catalog either lists items directly under a top-level `items` array, or
//! groups them into categories inside one or more `*_types` families:
//!
//! ```json
//! {
//!   "metadata": { "version": 2 },
//!   "weapon_types": {
//!     "swords": { "items": [{ "name": "Iron Sword", "rarityWeight": 50 }] }
//!   }
//! }
//! ```
//!
//! Families are visited in document order and the first family holding the
//! requested item wins.

use serde_json::{Map, Value};

const ITEMS_KEY: &str = "items";
const METADATA_KEY: &str = "metadata";
const TYPES_SUFFIX: &str = "_types";

fn type_families(catalog: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    catalog
        .as_object()
        .into_iter()
        .flat_map(Map::iter)
        .filter(|(key, _)| key.as_str() != METADATA_KEY && key.ends_with(TYPES_SUFFIX))
        .filter_map(|(_, family)| family.as_object())
}

fn items_of(container: &Value) -> &[Value] {
    container
        .get(ITEMS_KEY)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn item_label(item: &Value) -> Option<&str> {
    item.get("name")
        .and_then(Value::as_str)
        .or_else(|| item.get("slug").and_then(Value::as_str))
}

/// `name` equality, or an exact `slug` match.
pub fn item_matches(item: &Value, item_name: &str) -> bool {
    ["name", "slug"]
        .iter()
        .any(|field| item.get(*field).and_then(Value::as_str) == Some(item_name))
}

/// Find a named item. An empty `category` searches the top-level `items` array.
pub fn find_item<'a>(catalog: &'a Value, category: &str, item_name: &str) -> Option<&'a Value> {
    if category.is_empty() {
        return items_of(catalog)
            .iter()
            .find(|item| item_matches(item, item_name));
    }
    type_families(catalog)
        .filter_map(|family| family.get(category))
        .flat_map(items_of)
        .find(|item| item_matches(item, item_name))
}

/// Every item of every occurrence of `category`. An empty category collects
/// the top-level items plus all categorized items.
pub fn collect_items(catalog: &Value, category: &str) -> Vec<Value> {
    if category.is_empty() {
        let mut items = items_of(catalog).to_vec();
        for family in type_families(catalog) {
            items.extend(family.values().flat_map(items_of).cloned());
        }
        return items;
    }
    type_families(catalog)
        .filter_map(|family| family.get(category))
        .flat_map(items_of)
        .cloned()
        .collect()
}

/// Category names across all families, first occurrence order, no duplicates.
pub fn categories(catalog: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for family in type_families(catalog) {
        for (name, category) in family {
            if category.is_object() && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Names (or slugs) of the items in `category`, without duplicates.
pub fn item_names(catalog: &Value, category: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in collect_items(catalog, category) {
        if let Some(label) = item_label(&item) {
            if !names.iter().any(|n| n == label) {
                names.push(label.to_string());
            }
        }
    }
    names
}
