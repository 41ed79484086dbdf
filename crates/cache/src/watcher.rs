use crate::config::HotReloadConfig;
use crate::document::normalize_path;
use crate::loader::relative_key;
use crate::scanner::JsonScanner;
use crate::store::ContentStore;
use crate::{CacheError, Result};
use log::{debug, error, info, warn};
use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{broadcast, mpsc};
use tokio::time;

/// What happened to a path after its debounced change was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// File parsed and swapped into the store.
    Reloaded,
    /// File is gone; its entry was removed.
    Evicted,
    /// A directory changed; its cached files were reconciled with disk.
    Synced { loaded: usize, evicted: usize },
    /// Reload failed; the previous entry (if any) is still cached.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub relative_path: String,
    pub outcome: ReloadOutcome,
    pub completed_at: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    Other,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Renamed,
            EventKind::Modify(_) => Self::Modified,
            EventKind::Remove(_) => Self::Removed,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Other => "changed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeScope {
    File,
    Directory,
}

/// Keeps a [`ContentStore`] in sync with file-system changes under its root.
///
/// The notify callback only forwards events into a channel; a single task
/// debounces them per path and applies the resulting reloads and evictions.
#[derive(Clone)]
pub struct HotReloader {
    inner: Arc<HotReloaderInner>,
}

struct HotReloaderInner {
    command_tx: mpsc::Sender<WatcherCommand>,
    update_tx: broadcast::Sender<ReloadEvent>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    root: PathBuf,
}

enum WatcherCommand {
    Shutdown,
}

impl HotReloader {
    /// Start watching the store's root. Must be called inside a tokio runtime.
    pub fn start(store: Arc<ContentStore>, config: HotReloadConfig) -> Result<Self> {
        let root = store.root().to_path_buf();
        if !root.is_dir() {
            return Err(CacheError::InvalidPath(format!(
                "Data directory does not exist: {}",
                root.display()
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CacheError::WatcherError("hot reload requires a tokio runtime".into()))?;

        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (command_tx, command_rx) = mpsc::channel(4);
        let (update_tx, _) = broadcast::channel(256);

        let watcher = create_fs_watcher(&root, event_tx, config.notify_poll_interval)?;
        let roots = WatchRoots::new(&root);

        runtime.spawn(run_reload_loop(
            store,
            config.debounce,
            roots,
            event_rx,
            command_rx,
            update_tx.clone(),
        ));

        info!("Hot reload enabled for {}", root.display());
        Ok(Self {
            inner: Arc::new(HotReloaderInner {
                command_tx,
                update_tx,
                watcher: Mutex::new(Some(watcher)),
                root,
            }),
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.inner.update_tx.subscribe()
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop watching. Safe to call more than once.
    pub fn stop(&self) {
        let watcher = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if watcher.is_some() {
            drop(watcher);
            let _ = self.inner.command_tx.try_send(WatcherCommand::Shutdown);
            info!("Hot reload disabled for {}", self.inner.root.display());
        }
    }
}

impl Drop for HotReloader {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            self.stop();
        }
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
    poll_interval: Duration,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default().with_poll_interval(poll_interval),
    )
    .map_err(|e| CacheError::WatcherError(format!("watcher init failed: {e}")))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| CacheError::WatcherError(format!("failed to watch {}: {e}", root.display())))?;
    Ok(watcher)
}

/// The configured root plus its canonical form; some backends report
/// canonicalized paths (e.g. `/private/var` on macOS).
struct WatchRoots {
    root: PathBuf,
    canonical: Option<PathBuf>,
}

impl WatchRoots {
    fn new(root: &Path) -> Self {
        let canonical = std::fs::canonicalize(root)
            .ok()
            .filter(|canonical| canonical != root);
        Self {
            root: root.to_path_buf(),
            canonical,
        }
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let base = if path.starts_with(&self.root) {
            &self.root
        } else {
            self.canonical.as_ref().filter(|c| path.starts_with(c))?
        };
        let key = relative_key(base, path);
        (!key.is_empty()).then_some(key)
    }
}

async fn run_reload_loop(
    store: Arc<ContentStore>,
    debounce: Duration,
    roots: WatchRoots,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    update_tx: broadcast::Sender<ReloadEvent>,
) {
    let mut state = DebounceState::new(debounce);

    loop {
        let next_deadline = state.next_deadline();

        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(event) => handle_event(&roots, event, &mut state),
                    None => break,
                }
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(WatcherCommand::Shutdown) | None => break,
                }
            }
            () = async {
                if let Some(deadline) = next_deadline {
                    time::sleep_until(deadline).await;
                }
            }, if next_deadline.is_some() => {
                let due = state.take_due(Instant::now());
                debug!("Applying {} change(s), {} still pending", due.len(), state.pending());
                for (relative_path, change) in due {
                    info!("Content {}: {relative_path}", change.kind);
                    let outcome =
                        apply_change(store.clone(), relative_path.clone(), change.scope).await;
                    let _ = update_tx.send(ReloadEvent {
                        relative_path,
                        outcome,
                        completed_at: SystemTime::now(),
                    });
                }
            }
        }
    }

    debug!("Hot reload loop for {} stopped", roots.root.display());
}

fn handle_event(roots: &WatchRoots, event: notify::Result<Event>, state: &mut DebounceState) {
    match event {
        Ok(evt) => {
            if matches!(evt.kind, EventKind::Access(_)) {
                return;
            }
            let kind = ChangeKind::from_event(&evt.kind);
            for path in evt.paths {
                let Some(scope) = change_scope(&path) else {
                    continue;
                };
                let Some(relative) = roots.relative(&path) else {
                    continue;
                };
                state.record(relative, kind, scope);
            }
        }
        Err(err) => warn!("Watcher error: {err}"),
    }
}

/// JSON files are tracked individually; extension-less paths may be
/// directories that were moved or removed wholesale.
fn change_scope(path: &Path) -> Option<ChangeScope> {
    if JsonScanner::is_json_file(path) {
        return Some(ChangeScope::File);
    }
    if path.is_dir() || (path.extension().is_none() && !path.exists()) {
        return Some(ChangeScope::Directory);
    }
    None
}

async fn apply_change(
    store: Arc<ContentStore>,
    relative_path: String,
    scope: ChangeScope,
) -> ReloadOutcome {
    let task = tokio::task::spawn_blocking(move || match scope {
        ChangeScope::File => reload_file(&store, &relative_path),
        ChangeScope::Directory => sync_directory(&store, &relative_path),
    });
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => ReloadOutcome::Failed(format!("reload task failed: {err}")),
    }
}

fn reload_file(store: &ContentStore, relative_path: &str) -> ReloadOutcome {
    match store.reload_one(relative_path) {
        Ok(Some(_)) => ReloadOutcome::Reloaded,
        Ok(None) => ReloadOutcome::Evicted,
        Err(err) => {
            error!("Failed to reload {relative_path}, keeping cached version: {err}");
            ReloadOutcome::Failed(err.to_string())
        }
    }
}

fn sync_directory(store: &ContentStore, relative_dir: &str) -> ReloadOutcome {
    let prefix = format!("{}/", normalize_path(relative_dir).trim_end_matches('/'));
    let mut evicted = 0usize;
    for path in store.paths() {
        if path.starts_with(&prefix) && !store.absolute_path(&path).is_file() && store.evict(&path)
        {
            evicted += 1;
        }
    }

    let mut loaded = 0usize;
    let dir = store.absolute_path(relative_dir);
    if dir.is_dir() {
        for file in JsonScanner::new(&dir).scan() {
            let relative = relative_key(store.root(), &file);
            if store.contains(&relative) {
                continue;
            }
            match store.load_file(&relative) {
                Ok(_) => loaded += 1,
                Err(err) => error!("Failed to load {relative}: {err}"),
            }
        }
    }

    ReloadOutcome::Synced { loaded, evicted }
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    kind: ChangeKind,
    scope: ChangeScope,
    arrival: u64,
    last_event: Instant,
}

/// Per-path debounce: a path becomes due once no event for it has arrived
/// for `debounce`. Bursts of writes to one file collapse into one reload.
struct DebounceState {
    debounce: Duration,
    pending: HashMap<String, PendingChange>,
    next_arrival: u64,
}

impl DebounceState {
    fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: HashMap::new(),
            next_arrival: 0,
        }
    }

    fn record(&mut self, relative_path: String, kind: ChangeKind, scope: ChangeScope) {
        self.record_at(relative_path, kind, scope, Instant::now());
    }

    fn record_at(
        &mut self,
        relative_path: String,
        kind: ChangeKind,
        scope: ChangeScope,
        at: Instant,
    ) {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.pending
            .entry(relative_path)
            .and_modify(|change| {
                change.kind = kind;
                change.last_event = at;
                if scope == ChangeScope::Directory {
                    change.scope = scope;
                }
            })
            .or_insert(PendingChange {
                kind,
                scope,
                arrival,
                last_event: at,
            });
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    fn next_deadline(&self) -> Option<time::Instant> {
        self.pending
            .values()
            .map(|change| change.last_event + self.debounce)
            .min()
            .map(time::Instant::from_std)
    }

    /// Remove and return changes whose quiet period has elapsed, oldest first.
    fn take_due(&mut self, now: Instant) -> Vec<(String, PendingChange)> {
        let due_keys: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, change)| change.last_event + self.debounce <= now)
            .map(|(path, _)| path.clone())
            .collect();
        let mut due: Vec<(String, PendingChange)> = due_keys
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|change| (path, change)))
            .collect();
        due.sort_by_key(|(_, change)| change.arrival);
        due
    }
}
