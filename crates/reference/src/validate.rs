use crate::error::ReferenceError;
use crate::parser::{parse_reference, ReferenceComponents};
use crate::resolver::{candidates, lookup_item, ReferenceResolver};
use crate::value::get_path;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REFERENCE_PREFIX: char = '@';

/// A reference string found inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    /// JSONPath-like location, e.g. `$.loot[0].item`.
    pub location: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub location: String,
    pub reference: Option<String>,
    pub message: String,
    pub severity: Severity,
}

/// Collect every string value starting with `@`, in document order.
pub fn find_references(document: &Value) -> Vec<ReferenceSite> {
    let mut sites = Vec::new();
    collect_sites(document, "$".to_string(), &mut sites);
    sites
}

fn collect_sites(value: &Value, location: String, sites: &mut Vec<ReferenceSite>) {
    match value {
        Value::String(s) if s.starts_with(REFERENCE_PREFIX) => sites.push(ReferenceSite {
            location,
            reference: s.clone(),
        }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_sites(item, format!("{location}[{i}]"), sites);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                collect_sites(child, format!("{location}.{key}"), sites);
            }
        }
        _ => {}
    }
}

impl ReferenceResolver {
    /// Check every reference in a cached document.
    ///
    /// Malformed references and filters are errors. Required references that
    /// do not resolve are warnings; optional ones are skipped. A document that
    /// cannot be loaded yields a single error.
    pub fn validate_document(&self, relative_path: &str) -> Vec<ValidationIssue> {
        let Some(doc) = self.source().document(relative_path) else {
            return vec![ValidationIssue {
                location: "$".into(),
                reference: None,
                message: format!("Document not found: {relative_path}"),
                severity: Severity::Error,
            }];
        };
        let issues = self.validate_value(&doc.document);
        info!("Validated {relative_path}: {} issue(s)", issues.len());
        issues
    }

    pub fn validate_value(&self, document: &Value) -> Vec<ValidationIssue> {
        find_references(document)
            .into_iter()
            .filter_map(|site| self.check_site(site))
            .collect()
    }

    fn check_site(&self, site: ReferenceSite) -> Option<ValidationIssue> {
        let issue = |message: String, severity| ValidationIssue {
            location: site.location.clone(),
            reference: Some(site.reference.clone()),
            message,
            severity,
        };

        let components = match parse_reference(&site.reference) {
            Ok(components) => components,
            Err(err) => return Some(issue(err.to_string(), Severity::Error)),
        };

        match self.check(&components) {
            Ok(()) => None,
            Err(err @ ReferenceError::InvalidFilter { .. }) => {
                Some(issue(err.to_string(), Severity::Error))
            }
            Err(err) if components.is_optional => {
                debug!("Optional reference {} unresolved: {err}", site.reference);
                None
            }
            Err(err) => Some(issue(err.to_string(), Severity::Warning)),
        }
    }

    /// Resolution without sampling: a wildcard only needs its filter to parse.
    fn check(&self, components: &ReferenceComponents) -> Result<(), ReferenceError> {
        let catalog = self.catalog(components)?;
        if components.is_wildcard() {
            candidates(components, &catalog.document)?;
            return Ok(());
        }
        let item = lookup_item(components, &catalog.document)?;
        if let Some(property) = &components.property {
            if get_path(item, property).is_none() {
                return Err(ReferenceError::PropertyNotFound {
                    id: components.resolved_id(),
                    property: property.clone(),
                });
            }
        }
        Ok(())
    }
}
