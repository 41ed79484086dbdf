use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Scanner for finding JSON content files under a data root
pub struct JsonScanner {
    root: PathBuf,
}

impl JsonScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Recursively collect every `*.json` file.
    ///
    /// Hidden files are included (config markers are dot-files) and ignore
    /// files are not consulted: the content tree is data, not a source repo.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false);

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if !Self::is_json_file(path) {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        log::debug!("Found {} JSON files under {}", files.len(), self.root.display());
        files
    }

    pub fn is_json_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}
