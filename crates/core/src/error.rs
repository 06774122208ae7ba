use crate::types::DocumentId;

/// Errors surfaced by the publishing core.
///
/// Lookups that may legitimately miss return `Option` instead of
/// [`CoreError::NotFound`]; this variant is reserved for operations whose
/// target must exist.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Route conflict: '{path}' ({locale}) is already assigned to another document")]
    RouteConflict { path: String, locale: String },

    #[error("Structure type not found: {0}")]
    StructureTypeNotFound(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing content node.
    pub fn document_not_found(id: DocumentId) -> Self {
        Self::NotFound {
            entity: "document",
            id: id.to_string(),
        }
    }
}
