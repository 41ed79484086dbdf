use crate::config::CacheConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Subdomain reported for files that sit directly under a domain (or the root).
pub const ROOT_SUBDOMAIN: &str = "root";

/// Role of a JSON file, derived from its filename alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    Unknown,
    NamesFile,
    GenericCatalog,
    ComponentData,
    ConfigFile,
}

impl FileType {
    pub const ALL: [Self; 5] = [
        Self::Unknown,
        Self::NamesFile,
        Self::GenericCatalog,
        Self::ComponentData,
        Self::ConfigFile,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::NamesFile => "NamesFile",
            Self::GenericCatalog => "GenericCatalog",
            Self::ComponentData => "ComponentData",
            Self::ConfigFile => "ConfigFile",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed JSON file plus its classification.
#[derive(Debug, Clone, Serialize)]
pub struct CachedDocument {
    pub absolute_path: PathBuf,
    /// Normalized, forward-slash path relative to the data root. The cache key.
    pub relative_path: String,
    pub file_type: FileType,
    /// First path segment; empty for files at the data root.
    pub domain: String,
    /// Second directory segment, or [`ROOT_SUBDOMAIN`].
    pub subdomain: String,
    pub document: Value,
    pub last_modified: SystemTime,
}

/// Classification derived from a relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub file_type: FileType,
    pub domain: String,
    pub subdomain: String,
}

/// Filename heuristics used to assign a [`FileType`].
#[derive(Debug, Clone)]
pub struct Classifier {
    config_file_name: String,
    component_keywords: Vec<String>,
}

impl Classifier {
    pub fn new(config_file_name: &str, component_keywords: &[String]) -> Self {
        Self {
            config_file_name: config_file_name.to_lowercase(),
            component_keywords: component_keywords
                .iter()
                .map(|kw| kw.to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.config_file_name, &config.component_keywords)
    }

    /// Checks run in priority order: config marker, catalog, names, component keyword.
    pub fn file_type(&self, relative_path: &str) -> FileType {
        let normalized = normalize_path(relative_path);
        let file_name = normalized
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        if file_name == self.config_file_name {
            return FileType::ConfigFile;
        }
        if file_name == "catalog.json" {
            return FileType::GenericCatalog;
        }
        if file_name == "names.json" {
            return FileType::NamesFile;
        }
        if file_name.ends_with(".json")
            && self
                .component_keywords
                .iter()
                .any(|kw| file_name.contains(kw.as_str()))
        {
            return FileType::ComponentData;
        }
        FileType::Unknown
    }

    pub fn classify(&self, relative_path: &str) -> Classification {
        let normalized = normalize_path(relative_path);
        let (domain, subdomain) = domain_and_subdomain(&normalized);
        Classification {
            file_type: self.file_type(&normalized),
            domain,
            subdomain,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&CacheConfig::new(""))
    }
}

/// Normalize a relative path into its cache-key form.
///
/// Backslashes become forward slashes, and leading `./` and `/` are dropped so
/// the same file always maps to the same key.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.trim().replace('\\', "/");
    let mut rest = replaced.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

fn domain_and_subdomain(normalized: &str) -> (String, String) {
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] | [_] => (String::new(), ROOT_SUBDOMAIN.to_string()),
        [domain, _file] => ((*domain).to_string(), ROOT_SUBDOMAIN.to_string()),
        [domain, subdomain, ..] => ((*domain).to_string(), (*subdomain).to_string()),
    }
}
