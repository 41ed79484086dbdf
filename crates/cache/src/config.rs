use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filename that marks per-directory editor configuration.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".cbconfig.json";

/// Filename fragments that identify component data files.
pub const DEFAULT_COMPONENT_KEYWORDS: &[&str] = &[
    "colors",
    "traits",
    "objectives",
    "materials",
    "rarity_config",
    "sizes",
    "types",
];

const DATA_ROOT_ENV: &str = "REALM_DATA_ROOT";
const DEBOUNCE_ENV: &str = "REALM_HOT_RELOAD_DEBOUNCE_MS";
const DEFAULT_DATA_ROOT: &str = "Data/Json";
const DEFAULT_DEBOUNCE_MS: u64 = 100;
const MAX_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the content tree; every cache key is relative to it.
    pub root: PathBuf,
    pub config_file_name: String,
    pub component_keywords: Vec<String>,
    pub hot_reload: HotReloadConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct HotReloadConfig {
    /// Quiet period per path before a change is applied.
    pub debounce: Duration,
    /// Only used by polling watcher backends.
    pub notify_poll_interval: Duration,
    pub channel_capacity: usize,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            notify_poll_interval: Duration::from_secs(2),
            channel_capacity: 1024,
        }
    }
}

impl CacheConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            component_keywords: DEFAULT_COMPONENT_KEYWORDS
                .iter()
                .map(|kw| (*kw).to_string())
                .collect(),
            hot_reload: HotReloadConfig::default(),
        }
    }

    /// Build a config from `REALM_DATA_ROOT` and `REALM_HOT_RELOAD_DEBOUNCE_MS`.
    pub fn from_env() -> Self {
        let root = std::env::var(DATA_ROOT_ENV)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_ROOT.to_string());
        let debounce_raw = std::env::var(DEBOUNCE_ENV).ok();
        Self::new(root).with_debounce(parse_debounce_ms(
            debounce_raw.as_deref(),
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        ))
    }

    #[must_use]
    pub fn with_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = name.into();
        self
    }

    #[must_use]
    pub fn with_component_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.hot_reload.debounce = debounce;
        self
    }
}

fn parse_debounce_ms(raw: Option<&str>, default_value: Duration) -> Duration {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default_value, |ms| {
            Duration::from_millis(ms.min(MAX_DEBOUNCE_MS))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_debounce_defaults_and_clamps() {
        let default_value = Duration::from_millis(DEFAULT_DEBOUNCE_MS);
        assert_eq!(parse_debounce_ms(None, default_value), default_value);
        assert_eq!(parse_debounce_ms(Some(""), default_value), default_value);
        assert_eq!(parse_debounce_ms(Some("  "), default_value), default_value);
        assert_eq!(
            parse_debounce_ms(Some("250"), default_value),
            Duration::from_millis(250)
        );
        assert_eq!(
            parse_debounce_ms(Some(" 50 "), default_value),
            Duration::from_millis(50)
        );
        assert_eq!(
            parse_debounce_ms(Some("999999"), default_value),
            Duration::from_millis(MAX_DEBOUNCE_MS)
        );
        assert_eq!(parse_debounce_ms(Some("-1"), default_value), default_value);
        assert_eq!(parse_debounce_ms(Some("soon"), default_value), default_value);
    }

    #[test]
    fn new_uses_default_classification_inputs() {
        let config = CacheConfig::new("data");
        assert_eq!(config.root, PathBuf::from("data"));
        assert_eq!(config.config_file_name, DEFAULT_CONFIG_FILE_NAME);
        assert!(config.component_keywords.iter().any(|kw| kw == "materials"));
        assert_eq!(
            config.hot_reload.debounce,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS)
        );
    }
}
