use crate::catalog::{categories, collect_items, find_item, item_names};
use crate::error::{ReferenceError, Result};
use crate::filter::FilterExpr;
use crate::parser::{is_valid_reference, parse_reference, ReferenceComponents, WILDCARD};
use crate::sampling::weighted_pick;
use crate::value::{get_path, render};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use realm_cache::{CachedDocument, DocumentSource};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Resolves `@domain/path/category:item` references against cached catalogs.
///
/// [`resolve`](Self::resolve) and [`resolve_to_object`](Self::resolve_to_object)
/// never fail: problems are logged and turned into `None`. Lookup misses on
/// references marked optional (`?`) are not logged above debug level. The
/// `try_*` variants return the underlying [`ReferenceError`] instead.
pub struct ReferenceResolver {
    source: Arc<dyn DocumentSource>,
    rng: Mutex<StdRng>,
}

impl ReferenceResolver {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Resolver with a deterministic random source.
    pub fn with_seed(source: Arc<dyn DocumentSource>, seed: u64) -> Self {
        Self {
            source,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Compact form: a wildcard yields the (filtered) item array, a specific
    /// item its resolved id, and a property its value as text (falling back
    /// to the resolved id when the property is missing).
    pub fn resolve(&self, reference: &str) -> Option<Value> {
        let components = self.parse_logged(reference)?;
        let result = self.resolve_components(&components);
        self.settle(reference, &components, result)
    }

    /// Full form: a wildcard yields one rarity-weighted pick, a specific item
    /// the item object, and a property the projected value.
    pub fn resolve_to_object(&self, reference: &str) -> Option<Value> {
        let components = self.parse_logged(reference)?;
        let result = self.resolve_components_to_object(&components);
        self.settle(reference, &components, result)
    }

    pub fn try_resolve(&self, reference: &str) -> Result<Value> {
        self.resolve_components(&parse_reference(reference)?)
    }

    pub fn try_resolve_to_object(&self, reference: &str) -> Result<Value> {
        self.resolve_components_to_object(&parse_reference(reference)?)
    }

    pub fn resolve_components(&self, components: &ReferenceComponents) -> Result<Value> {
        let catalog = self.catalog(components)?;
        if components.is_wildcard() {
            return Ok(Value::Array(candidates(components, &catalog.document)?));
        }

        let item = lookup_item(components, &catalog.document)?;
        let id = components.resolved_id();
        let resolved = match &components.property {
            Some(property) => get_path(item, property).map_or(id, render),
            None => id,
        };
        Ok(Value::String(resolved))
    }

    pub fn resolve_components_to_object(&self, components: &ReferenceComponents) -> Result<Value> {
        let catalog = self.catalog(components)?;
        let item = if components.is_wildcard() {
            let items = candidates(components, &catalog.document)?;
            weighted_pick(&items, &mut *self.lock_rng())
                .cloned()
                .ok_or_else(|| ReferenceError::ItemNotFound {
                    catalog: components.catalog_path(),
                    item: WILDCARD.to_string(),
                })?
        } else {
            lookup_item(components, &catalog.document)?.clone()
        };

        match &components.property {
            Some(property) => get_path(&item, property).cloned().ok_or_else(|| {
                ReferenceError::PropertyNotFound {
                    id: components.resolved_id(),
                    property: property.clone(),
                }
            }),
            None => Ok(item),
        }
    }

    /// Categories defined by the catalog at `domain[/path]`.
    pub fn available_categories(&self, domain: &str, path: &str) -> Vec<String> {
        self.source
            .document(&catalog_path(domain, path))
            .map(|catalog| categories(&catalog.document))
            .unwrap_or_default()
    }

    /// Canonical reference strings for every named item in `category`, or in
    /// every category when `category` is empty.
    pub fn available_references(&self, domain: &str, path: &str, category: &str) -> Vec<String> {
        let Some(catalog) = self.source.document(&catalog_path(domain, path)) else {
            return Vec::new();
        };
        let wanted = if category.is_empty() {
            categories(&catalog.document)
        } else {
            vec![category.to_string()]
        };

        let mut references = Vec::new();
        for category in wanted {
            for name in item_names(&catalog.document, &category) {
                let reference = ReferenceComponents {
                    domain: domain.to_string(),
                    path: path.trim_matches('/').to_string(),
                    category: category.clone(),
                    item_name: name,
                    filters: None,
                    is_optional: false,
                    property: None,
                }
                .to_string();
                if is_valid_reference(&reference) {
                    references.push(reference);
                }
            }
        }
        references
    }

    pub(crate) fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    pub(crate) fn catalog(&self, components: &ReferenceComponents) -> Result<Arc<CachedDocument>> {
        let path = components.catalog_path();
        self.source
            .document(&path)
            .ok_or(ReferenceError::CatalogNotFound(path))
    }

    fn parse_logged(&self, reference: &str) -> Option<ReferenceComponents> {
        match parse_reference(reference) {
            Ok(components) => Some(components),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }

    fn settle(
        &self,
        reference: &str,
        components: &ReferenceComponents,
        result: Result<Value>,
    ) -> Option<Value> {
        match result {
            Ok(value) => Some(value),
            Err(err @ ReferenceError::PropertyNotFound { .. }) => {
                debug!("{err} (reference: {reference})");
                None
            }
            Err(err) if err.is_not_found() && components.is_optional => {
                debug!("Optional reference unresolved: {reference} ({err})");
                None
            }
            Err(err) => {
                warn!("{err} (reference: {reference})");
                None
            }
        }
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn lookup_item<'a>(
    components: &ReferenceComponents,
    catalog: &'a Value,
) -> Result<&'a Value> {
    find_item(catalog, &components.category, &components.item_name).ok_or_else(|| {
        ReferenceError::ItemNotFound {
            catalog: components.catalog_path(),
            item: components.item_name.clone(),
        }
    })
}

pub(crate) fn candidates(components: &ReferenceComponents, catalog: &Value) -> Result<Vec<Value>> {
    let items = collect_items(catalog, &components.category);
    match &components.filters {
        Some(body) => Ok(FilterExpr::parse(body)?.apply(items)),
        None => Ok(items),
    }
}

fn catalog_path(domain: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        format!("{domain}/catalog.json")
    } else {
        format!("{domain}/{path}/catalog.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use realm_cache::ContentStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn resolver() -> (TempDir, ReferenceResolver) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ContentStore::open(temp.path()));
        store.put(
            "d/catalog.json",
            json!({
                "metadata": {"version": 1},
                "thing_types": {
                    "c": {"items": [
                        {"name": "A", "rarityWeight": 1, "tag": "x", "stats": {"power": 7}},
                        {"name": "B", "rarityWeight": 1, "tag": "y"}
                    ]}
                }
            }),
        );
        store.put(
            "items/weapons/catalog.json",
            json!({
                "weapon_types": {
                    "swords": {"items": [{"name": "Iron Sword", "slug": "iron-sword", "damage": 4}]}
                },
                "relic_types": {
                    "swords": {"items": [{"name": "Dawnblade"}]},
                    "rings": {"items": [{"name": "Band of Ash"}, {"name": "Ring's End"}]}
                }
            }),
        );
        (temp, ReferenceResolver::with_seed(store, 42))
    }

    #[test]
    fn resolve_returns_ids_for_specific_items() {
        let (_temp, resolver) = resolver();
        assert_eq!(resolver.resolve("@d/c:A"), Some(json!("c:A")));
        assert_eq!(
            resolver.resolve("@items/weapons/swords:Dawnblade"),
            Some(json!("weapons/swords:Dawnblade"))
        );
        assert_eq!(
            resolver.resolve("@items/weapons/swords:iron-sword"),
            Some(json!("weapons/swords:iron-sword"))
        );
    }

    #[test]
    fn resolve_projects_properties_as_text_with_id_fallback() {
        let (_temp, resolver) = resolver();
        assert_eq!(resolver.resolve("@d/c:A.stats.power"), Some(json!("7")));
        assert_eq!(resolver.resolve("@d/c:A.tag"), Some(json!("x")));
        assert_eq!(resolver.resolve("@d/c:A.stats.missing"), Some(json!("c:A")));
    }

    #[test]
    fn resolve_to_object_returns_items_and_properties() {
        let (_temp, resolver) = resolver();
        assert_eq!(
            resolver.resolve_to_object("@items/weapons/swords:Iron Sword"),
            Some(json!({"name": "Iron Sword", "slug": "iron-sword", "damage": 4}))
        );
        assert_eq!(resolver.resolve_to_object("@d/c:A.stats.power"), Some(json!(7)));
        assert_eq!(resolver.resolve_to_object("@d/c:A.stats.missing"), None);
    }

    #[test]
    fn wildcard_with_filter() {
        let (_temp, resolver) = resolver();
        let resolved = resolver.resolve("@d/c:*[tag=x]").unwrap();
        let names: Vec<&str> = resolved
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["A"]);

        for _ in 0..50 {
            let picked = resolver.resolve_to_object("@d/c:*[tag=x]").unwrap();
            assert_eq!(picked.get("name"), Some(&json!("A")));
        }
    }

    #[test]
    fn wildcard_spans_every_family() {
        let (_temp, resolver) = resolver();
        let all = resolver.resolve("@items/weapons/swords:*").unwrap();
        assert_eq!(all.as_array().map(Vec::len), Some(2));
        assert_eq!(resolver.resolve("@d/c:*[tag=z]"), Some(json!([])));
        assert_eq!(resolver.resolve_to_object("@d/c:*[tag=z]"), None);
    }

    #[test]
    fn misses_become_none_and_errors_surface_in_try_variants() {
        let (_temp, resolver) = resolver();
        assert_eq!(resolver.resolve("@missing/domain:x?"), None);
        assert_eq!(resolver.resolve("@missing/domain:x"), None);
        assert_eq!(resolver.resolve("not a reference"), None);
        assert_eq!(resolver.resolve("@d/c:*[=x]"), None);

        assert!(matches!(
            resolver.try_resolve("@missing/domain:x"),
            Err(ReferenceError::CatalogNotFound(path)) if path == "missing/catalog.json"
        ));
        assert!(matches!(
            resolver.try_resolve("@d/c:Z"),
            Err(ReferenceError::ItemNotFound { .. })
        ));
        assert!(matches!(
            resolver.try_resolve_to_object("@d/c:A.nope"),
            Err(ReferenceError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            resolver.try_resolve("@d/c:*[=x]"),
            Err(ReferenceError::InvalidFilter { .. })
        ));
        assert!(matches!(resolver.try_resolve("@d"), Err(ReferenceError::Syntax(_))));
    }

    #[test]
    fn lists_categories_and_references() {
        let (_temp, resolver) = resolver();
        assert_eq!(
            resolver.available_categories("items", "weapons"),
            vec!["swords", "rings"]
        );
        assert_eq!(
            resolver.available_references("items", "weapons", "swords"),
            vec![
                "@items/weapons/swords:Iron Sword",
                "@items/weapons/swords:Dawnblade"
            ]
        );
        assert_eq!(
            resolver.available_references("items", "weapons", "rings"),
            vec!["@items/weapons/rings:Band of Ash"]
        );
        assert_eq!(resolver.available_references("d", "", "").len(), 2);
        assert!(resolver.available_categories("nowhere", "").is_empty());
    }
}
