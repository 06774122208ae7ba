//! Lifecycle subscribers.
//!
//! Each subscriber owns one concern and registers for the events it cares
//! about. Priorities decide the order within one event:
//!
//! | Priority | Subscriber                             |
//! |----------|----------------------------------------|
//! | 4096     | domain event classification            |
//! | 2048     | structure defaults, page numbering     |
//! | 1024     | workflow stage                         |
//! | 512      | webspaces                              |
//! | 256      | routes                                 |
//! | 128      | page summaries                         |
//! | -256     | search index scheduling                |
//! | -1024    | domain event recording                 |

mod domain_event;
mod index;
mod page_number;
mod page_summary;
mod route;
mod structure;
mod webspace;
mod workflow;

pub use domain_event::DomainEventSubscriber;
pub use index::IndexSubscriber;
pub use page_number::PageNumberSubscriber;
pub use page_summary::PageSummarySubscriber;
pub use route::RouteSubscriber;
pub use structure::StructureSubscriber;
pub use webspace::WebspaceSubscriber;
pub use workflow::WorkflowSubscriber;

use pressroom_core::document::{ArticlePage, Document, Localized, PageSummary};
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

pub const PRIORITY_CLASSIFY: i32 = 4096;
pub const PRIORITY_STRUCTURE: i32 = 2048;
pub const PRIORITY_PAGE_NUMBER: i32 = 2048;
pub const PRIORITY_WORKFLOW: i32 = 1024;
pub const PRIORITY_WEBSPACE: i32 = 512;
pub const PRIORITY_ROUTE: i32 = 256;
pub const PRIORITY_PAGE_SUMMARY: i32 = 128;
pub const PRIORITY_INDEX: i32 = -256;
pub const PRIORITY_DOMAIN_EVENT: i32 = -1024;

// ---------------------------------------------------------------------------
// Shared store helpers
// ---------------------------------------------------------------------------

/// Own (non-ghost) translations of the pages below `parent`, in child order.
pub(crate) async fn child_pages(
    store: &dyn ContentStore,
    parent: DocumentId,
    locale: &str,
    workspace: Workspace,
) -> Result<Vec<ArticlePage>, CoreError> {
    let mut pages = Vec::new();
    for child in store.children(parent, workspace).await? {
        if let Some(Document::Page(page)) = store.find(child, locale, workspace).await? {
            if !page.is_ghost() {
                pages.push(page);
            }
        }
    }
    Ok(pages)
}

pub(crate) async fn page_summaries(
    store: &dyn ContentStore,
    parent: DocumentId,
    locale: &str,
    workspace: Workspace,
) -> Result<Vec<PageSummary>, CoreError> {
    Ok(child_pages(store, parent, locale, workspace)
        .await?
        .iter()
        .map(PageSummary::from_page)
        .collect())
}

/// The article `id` in `locale`, if it has an own translation in `workspace`.
pub(crate) async fn own_translation(
    store: &dyn ContentStore,
    id: DocumentId,
    locale: &str,
    workspace: Workspace,
) -> Result<Option<Document>, CoreError> {
    Ok(store
        .find(id, locale, workspace)
        .await?
        .filter(|d| !d.is_ghost()))
}
