use crate::document::{CachedDocument, FileType, ROOT_SUBDOMAIN};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Derived lookup tables over the cached documents.
///
/// Every insert and remove touches all four tables; callers hold the store's
/// write lock while doing so, so readers never observe them out of step.
#[derive(Debug, Default, Clone)]
pub(crate) struct ContentIndex {
    by_type: HashMap<FileType, BTreeSet<String>>,
    by_domain: HashMap<String, BTreeSet<String>>,
    hierarchy: HashMap<String, HashMap<String, BTreeSet<String>>>,
    subdomains: HashMap<String, BTreeSet<String>>,
}

impl ContentIndex {
    pub(crate) fn insert(&mut self, doc: &CachedDocument) {
        let path = doc.relative_path.clone();
        self.by_type
            .entry(doc.file_type)
            .or_default()
            .insert(path.clone());
        self.by_domain
            .entry(doc.domain.clone())
            .or_default()
            .insert(path.clone());
        self.hierarchy
            .entry(doc.domain.clone())
            .or_default()
            .entry(doc.subdomain.clone())
            .or_default()
            .insert(path);
        if doc.subdomain != ROOT_SUBDOMAIN {
            self.subdomains
                .entry(doc.domain.clone())
                .or_default()
                .insert(doc.subdomain.clone());
        }
    }

    pub(crate) fn remove(&mut self, doc: &CachedDocument) {
        let path = doc.relative_path.as_str();

        if let Some(paths) = self.by_type.get_mut(&doc.file_type) {
            paths.remove(path);
            if paths.is_empty() {
                self.by_type.remove(&doc.file_type);
            }
        }

        if let Some(paths) = self.by_domain.get_mut(&doc.domain) {
            paths.remove(path);
            if paths.is_empty() {
                self.by_domain.remove(&doc.domain);
            }
        }

        let mut subdomain_emptied = false;
        if let Some(subdomains) = self.hierarchy.get_mut(&doc.domain) {
            if let Some(paths) = subdomains.get_mut(&doc.subdomain) {
                paths.remove(path);
                if paths.is_empty() {
                    subdomains.remove(&doc.subdomain);
                    subdomain_emptied = true;
                }
            }
            if subdomains.is_empty() {
                self.hierarchy.remove(&doc.domain);
            }
        }

        if subdomain_emptied {
            if let Some(names) = self.subdomains.get_mut(&doc.domain) {
                names.remove(&doc.subdomain);
                if names.is_empty() {
                    self.subdomains.remove(&doc.domain);
                }
            }
        }
    }

    pub(crate) fn paths_by_type(&self, file_type: FileType) -> Vec<String> {
        self.by_type
            .get(&file_type)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn paths_by_domain(&self, domain: &str) -> Vec<String> {
        self.by_domain
            .get(domain)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn paths_by_subdomain(&self, domain: &str, subdomain: &str) -> Vec<String> {
        self.hierarchy
            .get(domain)
            .and_then(|subdomains| subdomains.get(subdomain))
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Named domains, sorted. Files at the data root have no domain and are not listed.
    pub(crate) fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self
            .by_domain
            .keys()
            .filter(|domain| !domain.is_empty())
            .cloned()
            .collect();
        domains.sort();
        domains
    }

    pub(crate) fn subdomains_of(&self, domain: &str) -> Vec<String> {
        self.subdomains
            .get(domain)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn hierarchy(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        self.hierarchy
            .iter()
            .filter(|(domain, _)| !domain.is_empty())
            .map(|(domain, subdomains)| {
                let inner = subdomains
                    .iter()
                    .map(|(sub, paths)| (sub.clone(), paths.iter().cloned().collect()))
                    .collect();
                (domain.clone(), inner)
            })
            .collect()
    }

    pub(crate) fn count_by_type(&self) -> BTreeMap<String, usize> {
        self.by_type
            .iter()
            .map(|(file_type, paths)| (file_type.as_str().to_string(), paths.len()))
            .collect()
    }

    pub(crate) fn count_by_domain(&self) -> BTreeMap<String, usize> {
        self.by_domain
            .iter()
            .filter(|(domain, _)| !domain.is_empty())
            .map(|(domain, paths)| (domain.clone(), paths.len()))
            .collect()
    }

    /// Check that every path sits in exactly one bucket of each table and
    /// that no table refers to a path outside `live`.
    pub(crate) fn verify<'a>(
        &self,
        live: impl IntoIterator<Item = &'a CachedDocument>,
    ) -> Result<(), String> {
        let mut expected = 0usize;
        for doc in live {
            expected += 1;
            let path = doc.relative_path.as_str();

            let type_hits = self.by_type.values().filter(|p| p.contains(path)).count();
            let in_type = self
                .by_type
                .get(&doc.file_type)
                .is_some_and(|p| p.contains(path));
            if type_hits != 1 || !in_type {
                return Err(format!("{path}: {type_hits} type buckets"));
            }

            let domain_hits = self.by_domain.values().filter(|p| p.contains(path)).count();
            let in_domain = self
                .by_domain
                .get(&doc.domain)
                .is_some_and(|p| p.contains(path));
            if domain_hits != 1 || !in_domain {
                return Err(format!("{path}: {domain_hits} domain buckets"));
            }

            let hierarchy_hits = self
                .hierarchy
                .values()
                .flat_map(HashMap::values)
                .filter(|p| p.contains(path))
                .count();
            let in_own_bucket = self
                .hierarchy
                .get(&doc.domain)
                .and_then(|subs| subs.get(&doc.subdomain))
                .is_some_and(|p| p.contains(path));
            if hierarchy_hits != 1 || !in_own_bucket {
                return Err(format!("{path}: {hierarchy_hits} hierarchy buckets"));
            }
        }

        let indexed_by_type: usize = self.by_type.values().map(BTreeSet::len).sum();
        let indexed_by_domain: usize = self.by_domain.values().map(BTreeSet::len).sum();
        let indexed_in_hierarchy: usize = self
            .hierarchy
            .values()
            .flat_map(HashMap::values)
            .map(BTreeSet::len)
            .sum();
        if indexed_by_type != expected
            || indexed_by_domain != expected
            || indexed_in_hierarchy != expected
        {
            return Err(format!(
                "orphaned index entries: {indexed_by_type} typed, {indexed_by_domain} by domain, \
                 {indexed_in_hierarchy} in hierarchy, {expected} live"
            ));
        }

        for (domain, names) in &self.subdomains {
            for name in names {
                let populated = self
                    .hierarchy
                    .get(domain)
                    .and_then(|subs| subs.get(name))
                    .is_some_and(|p| !p.is_empty());
                if !populated {
                    return Err(format!("stale subdomain {domain}/{name}"));
                }
            }
        }
        Ok(())
    }
}
