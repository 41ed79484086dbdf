use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReferenceError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Invalid reference syntax: {0}")]
    Syntax(String),

    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),

    #[error("Item '{item}' not found in {catalog}")]
    ItemNotFound { catalog: String, item: String },

    #[error("Property '{property}' not found on {id}")]
    PropertyNotFound { id: String, property: String },
}

impl ReferenceError {
    /// Lookup misses, as opposed to malformed input.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CatalogNotFound(_) | Self::ItemNotFound { .. } | Self::PropertyNotFound { .. }
        )
    }
}
