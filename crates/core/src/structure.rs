//! Registry of known structure types (templates).

use std::collections::BTreeSet;

use crate::error::CoreError;

/// The structure types articles may use, plus the default for new ones.
#[derive(Debug, Clone)]
pub struct StructureRegistry {
    types: BTreeSet<String>,
    default_type: String,
}

impl StructureRegistry {
    /// Build the registry, failing when the default type is not registered.
    ///
    /// This runs once at startup; a missing default template is fatal.
    pub fn new<I, S>(types: I, default_type: impl Into<String>) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: BTreeSet<String> = types.into_iter().map(Into::into).collect();
        let default_type = default_type.into();
        if !types.contains(&default_type) {
            return Err(CoreError::StructureTypeNotFound(default_type));
        }
        Ok(Self {
            types,
            default_type,
        })
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    pub fn contains(&self, structure_type: &str) -> bool {
        self.types.contains(structure_type)
    }

    /// The given type if registered, the default when empty.
    pub fn resolve(&self, structure_type: &str) -> Result<String, CoreError> {
        if structure_type.is_empty() {
            return Ok(self.default_type.clone());
        }
        if !self.contains(structure_type) {
            return Err(CoreError::StructureTypeNotFound(structure_type.to_string()));
        }
        Ok(structure_type.to_string())
    }
}
