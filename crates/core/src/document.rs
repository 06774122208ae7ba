//! Article and page document model.
//!
//! A [`Document`] is a tagged union over the two content kinds. Components
//! never branch on the concrete kind directly when a capability is enough:
//! they ask for [`Routable`], [`HasWebspace`] or [`HasPages`] and act on what
//! they get back.

use serde::{Deserialize, Serialize};

use crate::route::EntityRef;
use crate::types::{DocumentId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Route entity type for articles.
pub const ARTICLE_ENTITY_TYPE: &str = "article";

/// Route entity type for article pages.
pub const PAGE_ENTITY_TYPE: &str = "article_page";

/// The first numbered page. The article itself is implicitly page 1.
pub const FIRST_PAGE_NUMBER: u32 = 2;

// ---------------------------------------------------------------------------
// WorkflowStage
// ---------------------------------------------------------------------------

/// Publication state of one locale of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    #[default]
    Draft,
    Published,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

// ---------------------------------------------------------------------------
// LocalizationState
// ---------------------------------------------------------------------------

/// How a document was materialized for the requested locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocalizationState {
    /// The document has its own translation in the requested locale.
    #[default]
    Localized,
    /// No own translation; content of `locale` is shown as a placeholder.
    Ghost { locale: String },
    /// Explicitly configured to mirror the content of `locale`.
    Shadow { locale: String },
}

impl LocalizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Localized => "localized",
            Self::Ghost { .. } => "ghost",
            Self::Shadow { .. } => "shadow",
        }
    }

    /// The locale whose content is displayed, for ghosts and shadows.
    pub fn reference_locale(&self) -> Option<&str> {
        match self {
            Self::Localized => None,
            Self::Ghost { locale } | Self::Shadow { locale } => Some(locale),
        }
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self, Self::Ghost { .. })
    }
}

// ---------------------------------------------------------------------------
// Supporting value types
// ---------------------------------------------------------------------------

/// Binds an article's route to a page of the site's page tree.
///
/// The full path is `ancestor.path + "/" + suffix`. The suffix is persisted
/// so the path can be recomputed when the ancestor moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTreeBinding {
    pub page_id: DocumentId,
    pub suffix: Option<String>,
}

impl PageTreeBinding {
    pub fn new(page_id: DocumentId) -> Self {
        Self {
            page_id,
            suffix: None,
        }
    }
}

/// Entry of an article's ordered page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub uuid: DocumentId,
    pub title: String,
    pub route_path: Option<String>,
    pub page_number: u32,
}

impl PageSummary {
    pub fn from_page(page: &ArticlePage) -> Self {
        Self {
            uuid: page.uuid,
            title: page.title.clone(),
            route_path: page.route_path.clone(),
            page_number: page.page_number,
        }
    }
}

/// Discriminant of [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Article,
    Page,
}

impl DocumentKind {
    /// The entity type routes of this kind point at.
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Article => ARTICLE_ENTITY_TYPE,
            Self::Page => PAGE_ENTITY_TYPE,
        }
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// Root content unit, materialized for one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub uuid: DocumentId,
    pub locale: String,
    pub title: String,
    pub structure_type: String,
    pub route_path: Option<String>,
    pub page_tree: Option<PageTreeBinding>,
    pub workflow_stage: WorkflowStage,
    pub published: Option<Timestamp>,
    pub authored: Option<Timestamp>,
    pub created: Option<Timestamp>,
    pub changed: Option<Timestamp>,
    pub last_modified: Option<Timestamp>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub changer: Option<String>,
    pub shadow_locale: Option<String>,
    pub main_webspace: Option<String>,
    pub additional_webspaces: Vec<String>,
    pub pages: Vec<PageSummary>,
    pub excerpt: serde_json::Value,
    pub seo: serde_json::Value,
    pub content: serde_json::Value,
    pub localization: LocalizationState,
}

impl Article {
    /// A new, not yet persisted article. The uuid is assigned by the store.
    pub fn new(
        locale: impl Into<String>,
        title: impl Into<String>,
        structure_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: DocumentId::nil(),
            locale: locale.into(),
            title: title.into(),
            structure_type: structure_type.into(),
            route_path: None,
            page_tree: None,
            workflow_stage: WorkflowStage::Draft,
            published: None,
            authored: None,
            created: None,
            changed: None,
            last_modified: None,
            author: None,
            creator: None,
            changer: None,
            shadow_locale: None,
            main_webspace: None,
            additional_webspaces: Vec::new(),
            pages: Vec::new(),
            excerpt: serde_json::Value::Object(Default::default()),
            seo: serde_json::Value::Object(Default::default()),
            content: serde_json::Value::Object(Default::default()),
            localization: LocalizationState::Localized,
        }
    }
}

// ---------------------------------------------------------------------------
// ArticlePage
// ---------------------------------------------------------------------------

/// Child content unit beneath an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub uuid: DocumentId,
    pub parent: DocumentId,
    pub locale: String,
    pub title: String,
    /// `0` until the sequencer numbers the page.
    pub page_number: u32,
    pub route_path: Option<String>,
    pub structure_type: String,
    pub shadow_locale: Option<String>,
    pub workflow_stage: WorkflowStage,
    pub content: serde_json::Value,
    pub localization: LocalizationState,
}

impl ArticlePage {
    /// A new, not yet persisted page below `parent`.
    pub fn new(parent: DocumentId, locale: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uuid: DocumentId::nil(),
            parent,
            locale: locale.into(),
            title: title.into(),
            page_number: 0,
            route_path: None,
            structure_type: String::new(),
            shadow_locale: None,
            workflow_stage: WorkflowStage::Draft,
            content: serde_json::Value::Object(Default::default()),
            localization: LocalizationState::Localized,
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A document materialized for a specific locale.
pub trait Localized: Send + Sync {
    fn locale(&self) -> &str;
    fn localization(&self) -> &LocalizationState;

    fn is_ghost(&self) -> bool {
        self.localization().is_ghost()
    }
}

/// A document addressable by a route.
pub trait Routable: Localized {
    fn route_entity(&self) -> EntityRef;
    fn route_path(&self) -> Option<&str>;
    fn set_route_path(&mut self, path: String);
}

/// A document assigned to one or more webspaces.
pub trait HasWebspace: Send + Sync {
    fn page_tree(&self) -> Option<&PageTreeBinding>;
    fn main_webspace(&self) -> Option<&str>;
    fn additional_webspaces(&self) -> &[String];
    fn set_webspaces(&mut self, main: Option<String>, additional: Vec<String>);
}

/// A document carrying an ordered summary of its pages.
pub trait HasPages: Send + Sync {
    fn pages(&self) -> &[PageSummary];
    fn set_pages(&mut self, pages: Vec<PageSummary>);
}

impl Localized for Article {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn localization(&self) -> &LocalizationState {
        &self.localization
    }
}

impl Routable for Article {
    fn route_entity(&self) -> EntityRef {
        EntityRef::new(ARTICLE_ENTITY_TYPE, self.uuid)
    }

    fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    fn set_route_path(&mut self, path: String) {
        self.route_path = Some(path);
    }
}

impl HasWebspace for Article {
    fn page_tree(&self) -> Option<&PageTreeBinding> {
        self.page_tree.as_ref()
    }

    fn main_webspace(&self) -> Option<&str> {
        self.main_webspace.as_deref()
    }

    fn additional_webspaces(&self) -> &[String] {
        &self.additional_webspaces
    }

    fn set_webspaces(&mut self, main: Option<String>, additional: Vec<String>) {
        self.main_webspace = main;
        self.additional_webspaces = additional;
    }
}

impl HasPages for Article {
    fn pages(&self) -> &[PageSummary] {
        &self.pages
    }

    fn set_pages(&mut self, pages: Vec<PageSummary>) {
        self.pages = pages;
    }
}

impl Localized for ArticlePage {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn localization(&self) -> &LocalizationState {
        &self.localization
    }
}

impl Routable for ArticlePage {
    fn route_entity(&self) -> EntityRef {
        EntityRef::new(PAGE_ENTITY_TYPE, self.uuid)
    }

    fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    fn set_route_path(&mut self, path: String) {
        self.route_path = Some(path);
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Any content unit handled by the lifecycle pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Article(Article),
    Page(ArticlePage),
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Article(_) => DocumentKind::Article,
            Self::Page(_) => DocumentKind::Page,
        }
    }

    pub fn uuid(&self) -> DocumentId {
        match self {
            Self::Article(a) => a.uuid,
            Self::Page(p) => p.uuid,
        }
    }

    pub fn set_uuid(&mut self, uuid: DocumentId) {
        match self {
            Self::Article(a) => a.uuid = uuid,
            Self::Page(p) => p.uuid = uuid,
        }
    }

    /// True until the store has assigned an identifier.
    pub fn is_new(&self) -> bool {
        self.uuid().is_nil()
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        match self {
            Self::Article(a) => a.locale = locale.into(),
            Self::Page(p) => p.locale = locale.into(),
        }
    }

    pub fn set_localization(&mut self, state: LocalizationState) {
        match self {
            Self::Article(a) => a.localization = state,
            Self::Page(p) => p.localization = state,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Article(a) => &a.title,
            Self::Page(p) => &p.title,
        }
    }

    pub fn structure_type(&self) -> &str {
        match self {
            Self::Article(a) => &a.structure_type,
            Self::Page(p) => &p.structure_type,
        }
    }

    pub fn set_structure_type(&mut self, structure_type: impl Into<String>) {
        match self {
            Self::Article(a) => a.structure_type = structure_type.into(),
            Self::Page(p) => p.structure_type = structure_type.into(),
        }
    }

    pub fn shadow_locale(&self) -> Option<&str> {
        match self {
            Self::Article(a) => a.shadow_locale.as_deref(),
            Self::Page(p) => p.shadow_locale.as_deref(),
        }
    }

    /// The article a page belongs to; `None` for articles.
    pub fn parent_id(&self) -> Option<DocumentId> {
        match self {
            Self::Article(_) => None,
            Self::Page(p) => Some(p.parent),
        }
    }

    /// The article whose projection reflects this document.
    pub fn article_id(&self) -> DocumentId {
        match self {
            Self::Article(a) => a.uuid,
            Self::Page(p) => p.parent,
        }
    }

    pub fn workflow_stage(&self) -> WorkflowStage {
        match self {
            Self::Article(a) => a.workflow_stage,
            Self::Page(p) => p.workflow_stage,
        }
    }

    /// Set the workflow stage. Articles also track the publication date.
    pub fn set_workflow_stage(&mut self, stage: WorkflowStage, at: Option<Timestamp>) {
        match self {
            Self::Article(a) => {
                a.workflow_stage = stage;
                a.published = match stage {
                    WorkflowStage::Published => at.or(a.published),
                    WorkflowStage::Draft => None,
                };
            }
            Self::Page(p) => p.workflow_stage = stage,
        }
    }

    /// Whether the document owns child pages.
    pub fn has_children(&self) -> bool {
        matches!(self, Self::Article(_))
    }

    pub fn routable(&self) -> &dyn Routable {
        match self {
            Self::Article(a) => a,
            Self::Page(p) => p,
        }
    }

    pub fn routable_mut(&mut self) -> &mut dyn Routable {
        match self {
            Self::Article(a) => a,
            Self::Page(p) => p,
        }
    }

    pub fn webspace(&self) -> Option<&dyn HasWebspace> {
        match self {
            Self::Article(a) => Some(a),
            Self::Page(_) => None,
        }
    }

    pub fn webspace_mut(&mut self) -> Option<&mut dyn HasWebspace> {
        match self {
            Self::Article(a) => Some(a),
            Self::Page(_) => None,
        }
    }

    pub fn pages_mut(&mut self) -> Option<&mut dyn HasPages> {
        match self {
            Self::Article(a) => Some(a),
            Self::Page(_) => None,
        }
    }

    pub fn as_article(&self) -> Option<&Article> {
        match self {
            Self::Article(a) => Some(a),
            Self::Page(_) => None,
        }
    }

    pub fn as_article_mut(&mut self) -> Option<&mut Article> {
        match self {
            Self::Article(a) => Some(a),
            Self::Page(_) => None,
        }
    }

    pub fn as_page(&self) -> Option<&ArticlePage> {
        match self {
            Self::Article(_) => None,
            Self::Page(p) => Some(p),
        }
    }

    pub fn as_page_mut(&mut self) -> Option<&mut ArticlePage> {
        match self {
            Self::Article(_) => None,
            Self::Page(p) => Some(p),
        }
    }
}

impl Localized for Document {
    fn locale(&self) -> &str {
        self.routable().locale()
    }

    fn localization(&self) -> &LocalizationState {
        match self {
            Self::Article(a) => &a.localization,
            Self::Page(p) => &p.localization,
        }
    }
}

impl From<Article> for Document {
    fn from(article: Article) -> Self {
        Self::Article(article)
    }
}

impl From<ArticlePage> for Document {
    fn from(page: ArticlePage) -> Self {
        Self::Page(page)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
