//! Webspace resolution.
//!
//! Articles bound to the page tree always live in the webspace of their
//! ancestor page. Other articles use their explicit settings.

use std::sync::Arc;

use crate::document::HasWebspace;
use crate::error::CoreError;
use crate::page_tree::PageTreeResolver;

/// Resolved webspace assignment of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebspaceAssignment {
    pub main: Option<String>,
    pub additional: Vec<String>,
}

/// Computes which webspaces own a document.
#[derive(Clone)]
pub struct WebspaceResolver {
    pages: Arc<dyn PageTreeResolver>,
}

impl WebspaceResolver {
    pub fn new(pages: Arc<dyn PageTreeResolver>) -> Self {
        Self { pages }
    }

    pub async fn resolve(
        &self,
        document: &dyn HasWebspace,
        locale: &str,
    ) -> Result<WebspaceAssignment, CoreError> {
        if let Some(binding) = document.page_tree() {
            let main = match self.pages.find_page(binding.page_id, locale).await? {
                Some(page) => Some(page.webspace),
                None => {
                    tracing::warn!(
                        page_id = %binding.page_id,
                        locale,
                        "Page-tree ancestor missing, keeping current webspace"
                    );
                    document.main_webspace().map(str::to_string)
                }
            };
            return Ok(WebspaceAssignment {
                main,
                additional: Vec::new(),
            });
        }

        let main = document.main_webspace().map(str::to_string);
        let additional = if main.is_some() {
            document
                .additional_webspaces()
                .iter()
                .filter(|w| Some(w.as_str()) != main.as_deref())
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        Ok(WebspaceAssignment { main, additional })
    }

    /// Resolve and write the assignment back onto the document.
    pub async fn apply(
        &self,
        document: &mut dyn HasWebspace,
        locale: &str,
    ) -> Result<WebspaceAssignment, CoreError> {
        let assignment = self.resolve(&*document, locale).await?;
        document.set_webspaces(assignment.main.clone(), assignment.additional.clone());
        Ok(assignment)
    }
}

/// The webspace a projection is rendered for: the main webspace, else the
/// configured default.
pub fn target_webspace(main: Option<&str>, default_webspace: Option<&str>) -> Option<String> {
    main.or(default_webspace).map(str::to_string)
}
