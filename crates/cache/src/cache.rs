use crate::config::{CacheConfig, HotReloadConfig};
use crate::document::{CachedDocument, FileType};
use crate::error::Result;
use crate::stats::{CacheStats, LoadReport};
use crate::store::{ContentStore, DocumentSource};
use crate::watcher::{HotReloader, ReloadEvent};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Content store plus optional hot reload, the entry point most callers want.
pub struct ContentCache {
    store: Arc<ContentStore>,
    hot_reload: HotReloadConfig,
    reloader: Mutex<Option<HotReloader>>,
}

impl ContentCache {
    pub fn new(config: CacheConfig) -> Self {
        let hot_reload = config.hot_reload;
        Self {
            store: Arc::new(ContentStore::new(&config)),
            hot_reload,
            reloader: Mutex::new(None),
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<ContentStore> {
        self.store.clone()
    }

    pub fn load_all(&self) -> LoadReport {
        self.store.load_all()
    }

    pub fn get(&self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        self.store.get(relative_path)
    }

    pub fn by_type(&self, file_type: FileType) -> Vec<Arc<CachedDocument>> {
        self.store.by_type(file_type)
    }

    pub fn by_domain(&self, domain: &str) -> Vec<Arc<CachedDocument>> {
        self.store.by_domain(domain)
    }

    pub fn by_subdomain(&self, domain: &str, subdomain: &str) -> Vec<Arc<CachedDocument>> {
        self.store.by_subdomain(domain, subdomain)
    }

    pub fn all_domains(&self) -> Vec<String> {
        self.store.all_domains()
    }

    pub fn subdomains_of(&self, domain: &str) -> Vec<String> {
        self.store.subdomains_of(domain)
    }

    pub fn reload_one(&self, relative_path: &str) -> Result<Option<Arc<CachedDocument>>> {
        self.store.reload_one(relative_path)
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn log_performance_stats(&self) {
        self.store.log_performance_stats();
    }

    /// Start watching the data root. Needs a running tokio runtime.
    /// Calling it while already enabled only logs a warning.
    pub fn enable_hot_reload(&self) -> Result<()> {
        let mut reloader = self.lock_reloader();
        if reloader.as_ref().is_some_and(HotReloader::is_running) {
            warn!("Hot reload already enabled");
            return Ok(());
        }
        *reloader = Some(HotReloader::start(self.store.clone(), self.hot_reload)?);
        Ok(())
    }

    pub fn disable_hot_reload(&self) {
        if let Some(reloader) = self.lock_reloader().take() {
            reloader.stop();
        } else {
            info!("Hot reload already disabled");
        }
    }

    pub fn is_hot_reload_enabled(&self) -> bool {
        self.lock_reloader()
            .as_ref()
            .is_some_and(HotReloader::is_running)
    }

    /// Receiver for applied reloads; `None` while hot reload is off.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ReloadEvent>> {
        self.lock_reloader().as_ref().map(HotReloader::subscribe)
    }

    fn lock_reloader(&self) -> MutexGuard<'_, Option<HotReloader>> {
        self.reloader.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentSource for ContentCache {
    fn document(&self, relative_path: &str) -> Option<Arc<CachedDocument>> {
        self.get(relative_path)
    }
}

impl Drop for ContentCache {
    fn drop(&mut self) {
        if let Some(reloader) = self.lock_reloader().take() {
            reloader.stop();
        }
    }
}
