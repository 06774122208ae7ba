//! Shared primitive types.

use serde::{Deserialize, Serialize};

/// Every content node is identified by a store-assigned UUID.
pub type DocumentId = uuid::Uuid;

/// Route rows use BIGSERIAL primary keys.
pub type RouteId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The two parallel copies of the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workspace {
    /// Work-in-progress content edited by the editor.
    Draft,
    /// The currently published content served to the website.
    Live,
}

impl Workspace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
        }
    }
}

impl std::fmt::Display for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the locale-suffixed node property holding a page number.
pub fn page_number_property(locale: &str) -> String {
    format!("i18n:{locale}-pageNumber")
}
