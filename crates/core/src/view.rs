//! Denormalized search projections of articles.

use serde::{Deserialize, Serialize};

use crate::document::{Article, PageSummary, WorkflowStage};
use crate::types::{DocumentId, Timestamp};
use crate::webspace::target_webspace;

/// Deterministic index id of `(uuid, locale)`.
pub fn view_document_id(uuid: DocumentId, locale: &str) -> String {
    format!("{uuid}-{locale}")
}

/// Localization part of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationView {
    pub state: String,
    pub locale: Option<String>,
}

/// Locale-specific projection of an article prepared for a search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDocument {
    pub id: String,
    pub uuid: DocumentId,
    pub locale: String,
    pub title: String,
    pub route_path: Option<String>,
    pub structure_type: String,
    pub creator: Option<String>,
    pub changer: Option<String>,
    pub author: Option<String>,
    pub created: Option<Timestamp>,
    pub changed: Option<Timestamp>,
    pub authored: Option<Timestamp>,
    pub published: Option<Timestamp>,
    pub localization: LocalizationView,
    pub workflow_stage: WorkflowStage,
    pub published_state: bool,
    pub excerpt: serde_json::Value,
    pub seo: serde_json::Value,
    pub pages: Vec<PageSummary>,
    pub target_webspace: Option<String>,
    pub main_webspace: Option<String>,
    pub additional_webspaces: Vec<String>,
    pub content: serde_json::Value,
}

/// Converts hydrated articles into projections.
pub trait ProjectionBuilder: Send + Sync {
    fn to_view_document(&self, article: &Article) -> ViewDocument;
}

/// Flattens article fields one-to-one.
#[derive(Debug, Clone, Default)]
pub struct DefaultProjectionBuilder {
    default_webspace: Option<String>,
}

impl DefaultProjectionBuilder {
    pub fn new(default_webspace: Option<String>) -> Self {
        Self { default_webspace }
    }
}

impl ProjectionBuilder for DefaultProjectionBuilder {
    fn to_view_document(&self, article: &Article) -> ViewDocument {
        ViewDocument {
            id: view_document_id(article.uuid, &article.locale),
            uuid: article.uuid,
            locale: article.locale.clone(),
            title: article.title.clone(),
            route_path: article.route_path.clone(),
            structure_type: article.structure_type.clone(),
            creator: article.creator.clone(),
            changer: article.changer.clone(),
            author: article.author.clone(),
            created: article.created,
            changed: article.changed,
            authored: article.authored,
            published: article.published,
            localization: LocalizationView {
                state: article.localization.as_str().to_string(),
                locale: article.localization.reference_locale().map(str::to_string),
            },
            workflow_stage: article.workflow_stage,
            published_state: article.workflow_stage == WorkflowStage::Published,
            excerpt: article.excerpt.clone(),
            seo: article.seo.clone(),
            pages: article.pages.clone(),
            target_webspace: target_webspace(
                article.main_webspace.as_deref(),
                self.default_webspace.as_deref(),
            ),
            main_webspace: article.main_webspace.clone(),
            additional_webspaces: article.additional_webspaces.clone(),
            content: article.content.clone(),
        }
    }
}
