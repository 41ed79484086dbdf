use pretty_assertions::assert_eq;
use realm_cache::{CacheConfig, ContentCache, ContentStore, FileType, ROOT_SUBDOMAIN};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

fn seed_tree() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "abilities/active/catalog.json", r#"{"items": [{"name": "Fireball"}]}"#);
    write(root, "abilities/passive/catalog.json", r#"{"items": [{"name": "Toughness"}]}"#);
    write(root, "abilities/names.json", r#"{"names": ["Ember"]}"#);
    write(root, "abilities/.cbconfig.json", r#"{"icon": "spark"}"#);
    write(root, "items/materials/colors.json", r#"{"colors": ["red"]}"#);
    write(root, "settings.json", r#"{"version": 3}"#);
    temp
}

#[test]
fn load_all_classifies_and_indexes_every_file() {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp = seed_tree();
    let cache = ContentCache::new(CacheConfig::new(temp.path()));

    let report = cache.load_all();
    assert_eq!(report.files_found, 6);
    assert_eq!(report.loaded, 6);
    assert_eq!(report.failed, 0);

    assert_eq!(cache.all_domains(), vec!["abilities", "items"]);
    assert_eq!(cache.subdomains_of("abilities"), vec!["active", "passive"]);
    assert_eq!(cache.by_type(FileType::GenericCatalog).len(), 2);
    assert_eq!(cache.by_type(FileType::NamesFile).len(), 1);
    assert_eq!(cache.by_type(FileType::ConfigFile).len(), 1);
    assert_eq!(cache.by_type(FileType::ComponentData).len(), 1);
    assert_eq!(cache.by_type(FileType::Unknown).len(), 1);

    let root_files: Vec<String> = cache
        .by_subdomain("abilities", ROOT_SUBDOMAIN)
        .iter()
        .map(|doc| doc.relative_path.clone())
        .collect();
    assert_eq!(root_files, vec!["abilities/.cbconfig.json", "abilities/names.json"]);

    let stats = cache.stats();
    assert_eq!(stats.total_files, 6);
    assert_eq!(stats.files_by_domain.get("abilities"), Some(&4));
    cache.store().verify_index().unwrap();
}

#[test]
fn load_all_is_idempotent() {
    let temp = seed_tree();
    let store = ContentStore::open(temp.path());

    store.load_all();
    let first = store.paths();
    let first_hierarchy = store.domain_hierarchy();
    store.load_all();

    assert_eq!(store.paths(), first);
    assert_eq!(store.domain_hierarchy(), first_hierarchy);
    store.verify_index().unwrap();
}

#[test]
fn lookups_normalize_separators() {
    let temp = seed_tree();
    let store = ContentStore::open(temp.path());
    store.load_all();

    let doc = store.get("abilities\\active\\catalog.json").expect("backslash path");
    assert_eq!(doc.relative_path, "abilities/active/catalog.json");
    assert!(store.get("./abilities/active/catalog.json").is_some());

    let stats = store.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 0);
}

#[test]
fn get_lazily_loads_files_added_after_load_all() {
    let temp = seed_tree();
    let store = ContentStore::open(temp.path());
    store.load_all();

    write(temp.path(), "npcs/common/catalog.json", r#"{"items": []}"#);
    let doc = store.get("npcs/common/catalog.json").expect("lazy load");
    assert_eq!(doc.domain, "npcs");
    assert_eq!(doc.subdomain, "common");
    assert_eq!(store.subdomains_of("npcs"), vec!["common"]);

    assert!(store.get("npcs/missing.json").is_none());
    assert!(!store.contains("npcs/missing.json"));

    let stats = store.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.total_requests, 2);
    store.verify_index().unwrap();
}

#[test]
fn put_and_evict_keep_indexes_consistent() {
    let temp = TempDir::new().expect("tempdir");
    let store = ContentStore::open(temp.path());

    store.put("quests/main/catalog.json", json!({"items": []}));
    store.put("quests/side/catalog.json", json!({"items": []}));
    store.put("quests/names.json", json!({"names": []}));
    store.put("quests/main/catalog.json", json!({"items": [{"name": "Prologue"}]}));
    store.verify_index().unwrap();
    assert_eq!(store.len(), 3);

    assert!(store.evict("quests/side/catalog.json"));
    assert!(!store.evict("quests/side/catalog.json"));
    assert_eq!(store.subdomains_of("quests"), vec!["main"]);
    store.verify_index().unwrap();

    assert!(store.evict("quests/main/catalog.json"));
    assert!(store.evict("quests/names.json"));
    assert!(store.all_domains().is_empty());
    assert!(store.domain_hierarchy().is_empty());
    store.verify_index().unwrap();
}

#[test]
fn reload_one_keeps_old_version_on_parse_error() {
    let temp = seed_tree();
    let store = ContentStore::open(temp.path());
    store.load_all();

    write(temp.path(), "settings.json", "{ not json");
    assert!(store.reload_one("settings.json").is_err());
    let kept = store.peek("settings.json").expect("old version kept");
    assert_eq!(kept.document, json!({"version": 3}));

    write(temp.path(), "settings.json", r#"{"version": 4}"#);
    let reloaded = store.reload_one("settings.json").unwrap().expect("reloaded");
    assert_eq!(reloaded.document, json!({"version": 4}));

    fs::remove_file(temp.path().join("settings.json")).unwrap();
    assert!(store.reload_one("settings.json").unwrap().is_none());
    assert!(!store.contains("settings.json"));
    store.verify_index().unwrap();
}

#[test]
fn content_queries_skip_config_files() {
    let temp = seed_tree();
    let store = ContentStore::open(temp.path());
    store.load_all();

    assert_eq!(store.by_domain("abilities").len(), 4);
    assert_eq!(store.content_by_domain("abilities").len(), 3);
    assert_eq!(
        store
            .by_domain_and_type("abilities", FileType::ConfigFile)
            .len(),
        1
    );
    assert_eq!(
        store
            .by_subdomain_and_type("abilities", "active", FileType::GenericCatalog)
            .len(),
        1
    );
}
