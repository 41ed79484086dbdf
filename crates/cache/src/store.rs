use crate::config::CacheConfig;
use crate::document::{normalize_path, CachedDocument, Classifier, FileType};
use crate::error::{CacheError, Result};
use crate::index::ContentIndex;
use crate::stats::{CacheStats, StatsCounters};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Instant, SystemTime};

/// Read access to cached documents by relative path.
///
/// The reference resolver only ever goes through this trait, so it can run
/// against a [`ContentStore`], a [`crate::ContentCache`], or a test double.
pub trait DocumentSource: Send + Sync {
    fn document(&self, relative_path: &str) -> Option<Arc<CachedDocument>>;
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    documents: HashMap<String, Arc<CachedDocument>>,
    index: ContentIndex,
}

impl StoreState {
    pub(crate) fn from_documents(documents: impl IntoIterator<Item = CachedDocument>) -> Self {
        let mut state = Self::default();
        for doc in documents {
            state.upsert(Arc::new(doc));
        }
        state
    }

    fn upsert(&mut self, doc: Arc<CachedDocument>) -> Option<Arc<CachedDocument>> {
        let previous = self.documents.remove(&doc.relative_path);
        if let Some(old) = &previous {
            self.index.remove(old);
        }
        self.index.insert(&doc);
        self.documents.insert(doc.relative_path.clone(), doc);
        previous
    }

    fn remove(&mut self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        let removed = self.documents.remove(relative_path)?;
        self.index.remove(&removed);
        Some(removed)
    }

    fn resolve(&self, paths: Vec<String>) -> Vec<Arc<CachedDocument>> {
        paths
            .into_iter()
            .filter_map(|path| self.documents.get(&path).cloned())
            .collect()
    }
}

/// In-memory store of classified JSON documents keyed by normalized relative path.
pub struct ContentStore {
    root: PathBuf,
    classifier: Classifier,
    state: RwLock<StoreState>,
    /// Held by every path that reads disk and then mutates `state`, so a bulk
    /// load can never swap in a snapshot older than a concurrent reload.
    writer: Mutex<()>,
    counters: Mutex<StatsCounters>,
}

impl ContentStore {
    pub fn new(config: &CacheConfig) -> Self {
        info!("Content store initialized with root {}", config.root.display());
        Self {
            root: config.root.clone(),
            classifier: Classifier::from_config(config),
            state: RwLock::new(StoreState::default()),
            writer: Mutex::new(()),
            counters: Mutex::new(StatsCounters::default()),
        }
    }

    /// Store with default classification rules rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::new(&CacheConfig::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn absolute_path(&self, relative_path: &str) -> PathBuf {
        self.root.join(normalize_path(relative_path))
    }

    /// Classify `document` under `relative_path` and insert it, replacing any
    /// previous entry together with its index membership.
    pub fn put(&self, relative_path: &str, document: Value) -> Arc<CachedDocument> {
        let key = normalize_path(relative_path);
        let absolute_path = self.root.join(&key);
        let last_modified = modified_time(&absolute_path);
        let doc = Arc::new(self.build_document(key, absolute_path, document, last_modified));
        let _writer = self.lock_writer();
        self.write_state().upsert(doc.clone());
        doc
    }

    /// Read, parse and insert one file. Errors leave the store untouched.
    pub fn load_file(&self, relative_path: &str) -> Result<Arc<CachedDocument>> {
        let _writer = self.lock_writer();
        let doc = Arc::new(self.read_document(relative_path)?);
        self.write_state().upsert(doc.clone());
        Ok(doc)
    }

    /// Look up a document, loading it from disk on a miss.
    ///
    /// Every call counts exactly one hit or one miss. A failed lazy load
    /// (missing file, unreadable, invalid JSON) returns `None` and creates no entry.
    pub fn get(&self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        let started = Instant::now();
        let key = normalize_path(relative_path);

        let cached = self.read_state().documents.get(&key).cloned();
        if let Some(doc) = cached {
            let mut counters = self.lock_counters();
            counters.hits += 1;
            counters.total_load_time += started.elapsed();
            drop(counters);
            debug!("Cache hit: {key}");
            return Some(doc);
        }

        self.lock_counters().misses += 1;

        let loaded = match self.load_file(&key) {
            Ok(doc) => {
                debug!("Cache miss: loaded {key} from disk in {:?}", started.elapsed());
                Some(doc)
            }
            Err(CacheError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache miss: {key} does not exist");
                None
            }
            Err(err) => {
                warn!("Cache miss: failed to load {key}: {err}");
                None
            }
        };

        self.lock_counters().total_load_time += started.elapsed();
        loaded
    }

    /// Look up a cached document without stats or disk access.
    pub fn peek(&self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        self.read_state()
            .documents
            .get(&normalize_path(relative_path))
            .cloned()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.read_state()
            .documents
            .contains_key(&normalize_path(relative_path))
    }

    /// Remove a document and its index entries. Unknown paths are a no-op.
    pub fn evict(&self, relative_path: &str) -> bool {
        let key = normalize_path(relative_path);
        let _writer = self.lock_writer();
        self.evict_locked(&key)
    }

    /// Re-read one file from disk.
    ///
    /// The new version is parsed before anything is touched, so a failed parse
    /// keeps the previous entry. A file that no longer exists is evicted and
    /// `Ok(None)` is returned.
    pub fn reload_one(&self, relative_path: &str) -> Result<Option<Arc<CachedDocument>>> {
        let key = checked_key(relative_path)?;
        let _writer = self.lock_writer();
        if !self.root.join(&key).is_file() {
            self.evict_locked(&key);
            info!("Reload of {key}: file is gone, evicted");
            return Ok(None);
        }

        let doc = Arc::new(self.read_document(&key)?);
        let previous = self.write_state().upsert(doc.clone());
        info!(
            "Reloaded {key} ({})",
            if previous.is_some() { "replaced" } else { "new" }
        );
        Ok(Some(doc))
    }

    pub fn by_type(&self, file_type: FileType) -> Vec<Arc<CachedDocument>> {
        let state = self.read_state();
        state.resolve(state.index.paths_by_type(file_type))
    }

    pub fn by_domain(&self, domain: &str) -> Vec<Arc<CachedDocument>> {
        let state = self.read_state();
        state.resolve(state.index.paths_by_domain(domain))
    }

    pub fn by_subdomain(&self, domain: &str, subdomain: &str) -> Vec<Arc<CachedDocument>> {
        let state = self.read_state();
        state.resolve(state.index.paths_by_subdomain(domain, subdomain))
    }

    pub fn by_domain_and_type(
        &self,
        domain: &str,
        file_type: FileType,
    ) -> Vec<Arc<CachedDocument>> {
        self.by_domain(domain)
            .into_iter()
            .filter(|doc| doc.file_type == file_type)
            .collect()
    }

    pub fn by_subdomain_and_type(
        &self,
        domain: &str,
        subdomain: &str,
        file_type: FileType,
    ) -> Vec<Arc<CachedDocument>> {
        self.by_subdomain(domain, subdomain)
            .into_iter()
            .filter(|doc| doc.file_type == file_type)
            .collect()
    }

    /// Like [`Self::by_domain`] but without editor config files.
    pub fn content_by_domain(&self, domain: &str) -> Vec<Arc<CachedDocument>> {
        self.by_domain(domain)
            .into_iter()
            .filter(|doc| doc.file_type != FileType::ConfigFile)
            .collect()
    }

    /// Like [`Self::by_subdomain`] but without editor config files.
    pub fn content_by_subdomain(&self, domain: &str, subdomain: &str) -> Vec<Arc<CachedDocument>> {
        self.by_subdomain(domain, subdomain)
            .into_iter()
            .filter(|doc| doc.file_type != FileType::ConfigFile)
            .collect()
    }

    pub fn all_domains(&self) -> Vec<String> {
        self.read_state().index.domains()
    }

    pub fn subdomains_of(&self, domain: &str) -> Vec<String> {
        self.read_state().index.subdomains_of(domain)
    }

    /// Domain -> subdomain -> relative paths, including the `root` subdomain.
    pub fn domain_hierarchy(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        self.read_state().index.hierarchy()
    }

    /// All cached relative paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.read_state().documents.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.read_state().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        {
            let state = self.read_state();
            stats.total_files = state.documents.len();
            stats.files_by_type = state.index.count_by_type();
            stats.files_by_domain = state.index.count_by_domain();
            stats.domains = state.index.domains();
        }
        self.lock_counters().fill(&mut stats);
        stats
    }

    pub fn reset_stats(&self) {
        *self.lock_counters() = StatsCounters::default();
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        info!("Cache statistics:");
        info!("  Total files: {}", stats.total_files);
        for file_type in FileType::ALL {
            info!("  {file_type}: {}", stats.files_of_type(file_type));
        }
        info!("  Domains: {}", stats.domains.join(", "));
    }

    pub fn log_performance_stats(&self) {
        let stats = self.stats();
        info!("Cache performance:");
        info!("  Requests: {}", stats.total_requests);
        info!("  Hits: {}", stats.hits);
        info!("  Misses: {}", stats.misses);
        info!("  Hit rate: {:.2}%", stats.hit_rate * 100.0);
        info!("  Avg load time: {}ms", stats.avg_load_time_ms);
        info!("  Total load time: {}ms", stats.total_load_time_ms);
    }

    /// Check that the indexes agree with the document map.
    pub fn verify_index(&self) -> std::result::Result<(), String> {
        let state = self.read_state();
        state
            .index
            .verify(state.documents.values().map(|doc| doc.as_ref()))
    }

    pub(crate) fn read_document(&self, relative_path: &str) -> Result<CachedDocument> {
        let key = checked_key(relative_path)?;
        let absolute_path = self.root.join(&key);
        let text = std::fs::read_to_string(&absolute_path)?;
        let document: Value =
            serde_json::from_str(&text).map_err(|source| CacheError::JsonError {
                path: absolute_path.clone(),
                source,
            })?;
        let last_modified = modified_time(&absolute_path);
        Ok(self.build_document(key, absolute_path, document, last_modified))
    }

    pub(crate) fn replace_all(&self, state: StoreState) {
        *self.write_state() = state;
    }

    /// Serializes disk-to-state mutations. Never take it while holding `state`.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_locked(&self, key: &str) -> bool {
        let removed = self.write_state().remove(key).is_some();
        if removed {
            debug!("Evicted {key}");
        }
        removed
    }

    fn build_document(
        &self,
        relative_path: String,
        absolute_path: PathBuf,
        document: Value,
        last_modified: SystemTime,
    ) -> CachedDocument {
        let class = self.classifier.classify(&relative_path);
        CachedDocument {
            absolute_path,
            relative_path,
            file_type: class.file_type,
            domain: class.domain,
            subdomain: class.subdomain,
            document,
            last_modified,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_counters(&self) -> MutexGuard<'_, StatsCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentSource for ContentStore {
    fn document(&self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        self.get(relative_path)
    }
}

/// Normalize a key and refuse anything that would resolve outside the root.
fn checked_key(relative_path: &str) -> Result<String> {
    let key = normalize_path(relative_path);
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(CacheError::InvalidPath(relative_path.to_string()));
    }
    Ok(key)
}

fn modified_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| SystemTime::now())
}
