//! Search index contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Workspace;
use crate::view::ViewDocument;

/// Which of the two indices a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTarget {
    Draft,
    Live,
}

impl IndexTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
        }
    }

    /// The content workspace this index mirrors.
    pub fn workspace(&self) -> Workspace {
        match self {
            Self::Draft => Workspace::Draft,
            Self::Live => Workspace::Live,
        }
    }
}

impl std::fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search index holding [`ViewDocument`]s keyed by their id.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upsert(&self, document: ViewDocument) -> Result<(), CoreError>;

    async fn remove(&self, id: &str) -> Result<(), CoreError>;

    /// Make pending writes visible.
    async fn commit(&self) -> Result<(), CoreError>;
}
