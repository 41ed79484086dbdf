use crate::document::normalize_path;
use crate::scanner::JsonScanner;
use crate::stats::LoadReport;
use crate::store::{ContentStore, StoreState};
use log::{error, info, warn};
use std::path::Path;
use std::time::Instant;

impl ContentStore {
    /// Load every JSON file under the root, replacing the current contents.
    ///
    /// Files are parsed outside the state lock and the new document set is
    /// swapped in at once, so concurrent readers see either the old or the new
    /// snapshot. The writer lock is held from scan to swap: reloads and
    /// evictions that arrive meanwhile wait and then apply on top of the new
    /// snapshot. A missing root is a warning and leaves the store as it was.
    pub fn load_all(&self) -> LoadReport {
        let started = Instant::now();
        let mut report = LoadReport::new();
        let root = self.root().to_path_buf();
        info!("Starting data load from {}", root.display());

        if !root.is_dir() {
            warn!("Data directory not found: {}", root.display());
            return report;
        }

        let writer = self.lock_writer();
        let files = JsonScanner::new(&root).scan();
        report.files_found = files.len();
        info!("Found {} JSON files to load", files.len());

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let relative = relative_key(&root, &path);
            match self.read_document(&relative) {
                Ok(doc) => {
                    documents.push(doc);
                    report.add_loaded();
                }
                Err(err) => {
                    error!("Failed to load {relative}: {err}");
                    report.add_failure(&relative, &err);
                }
            }
        }

        self.replace_all(StoreState::from_documents(documents));
        drop(writer);

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Data load complete: {} loaded, {} failed in {}ms",
            report.loaded, report.failed, report.elapsed_ms
        );
        self.log_stats();
        report
    }
}

pub(crate) fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_path(&relative.to_string_lossy())
}
