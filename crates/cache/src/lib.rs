//! # Realm Cache
//!
//! In-memory cache of the JSON content tree that drives procedural generation.
//!
//! ## Layout
//!
//! ```text
//! Data/Json/
//!     │
//!     ├──> abilities/active/catalog.json    domain=abilities  subdomain=active
//!     ├──> abilities/names.json             domain=abilities  subdomain=root
//!     └──> abilities/.cbconfig.json         config file
//! ```
//!
//! Every document is classified by file type and indexed by type, domain and
//! subdomain. [`ContentCache::enable_hot_reload`] keeps the cache in step with
//! edits on disk.
//!
//! ## Example
//!
//! ```no_run
//! use realm_cache::{CacheConfig, ContentCache, FileType};
//!
//! #[tokio::main]
//! async fn main() -> realm_cache::Result<()> {
//!     let cache = ContentCache::new(CacheConfig::new("Data/Json"));
//!     let report = cache.load_all();
//!     println!("Loaded {} of {} files", report.loaded, report.files_found);
//!
//!     for doc in cache.by_type(FileType::GenericCatalog) {
//!         println!("{}", doc.relative_path);
//!     }
//!
//!     cache.enable_hot_reload()?;
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod document;
mod error;
mod index;
mod loader;
mod scanner;
mod stats;
mod store;
mod watcher;

pub use cache::ContentCache;
pub use config::{
    CacheConfig, HotReloadConfig, DEFAULT_COMPONENT_KEYWORDS, DEFAULT_CONFIG_FILE_NAME,
};
pub use document::{
    normalize_path, CachedDocument, Classification, Classifier, FileType, ROOT_SUBDOMAIN,
};
pub use error::{CacheError, Result};
pub use scanner::JsonScanner;
pub use stats::{CacheStats, LoadReport};
pub use store::{ContentStore, DocumentSource};
pub use watcher::{HotReloader, ReloadEvent, ReloadOutcome};
