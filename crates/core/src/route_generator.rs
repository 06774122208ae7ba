//! Route path generation.
//!
//! Generators are tried in order by [`ChainRouteGenerator`]; the first one
//! that produces a path wins. [`PageTreeRouteGenerator`] handles articles
//! bound to a page of the site tree, [`SchemaRouteGenerator`] everything
//! else.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::document::{Document, Localized};
use crate::error::CoreError;
use crate::page_tree::PageTreeResolver;
use crate::slug::slugify;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default schema for article routes.
pub const DEFAULT_ARTICLE_SCHEMA: &str = "/articles/{title}";

/// Default schema for page routes.
pub const DEFAULT_PAGE_SCHEMA: &str = "{parent}/page-{page}";

/// Tokens understood in article schemas.
pub const ARTICLE_TOKENS: &[&str] = &["title", "locale", "structure_type", "uuid"];

/// Tokens understood in page schemas.
pub const PAGE_TOKENS: &[&str] = &["title", "locale", "structure_type", "uuid", "parent", "page"];

/// Regex matching `{token}` placeholders in route schemas.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Output of a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRoute {
    pub path: String,
    /// A page-tree suffix derived during generation that must be persisted
    /// on the document. `None` when the stored suffix was used.
    pub suffix: Option<String>,
}

impl GeneratedRoute {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            suffix: None,
        }
    }
}

/// Inputs a generator cannot read from the document itself.
#[derive(Debug, Clone, Default)]
pub struct RouteContext<'a> {
    /// Route of the parent article, for pages.
    pub parent_path: Option<&'a str>,
}

/// Computes a candidate path for a document.
#[async_trait]
pub trait RouteGenerator: Send + Sync {
    /// `Ok(None)` lets the next generator of the chain try.
    async fn generate(
        &self,
        document: &Document,
        context: &RouteContext<'_>,
    ) -> Result<Option<GeneratedRoute>, CoreError>;
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Ensure a leading slash, collapse repeated slashes and drop a trailing one.
///
/// # Examples
///
/// ```
/// use pressroom_core::route_generator::normalize_path;
///
/// assert_eq!(normalize_path("articles//hello/"), "/articles/hello");
/// assert_eq!(normalize_path("/"), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Extract the token names of a schema.
pub fn schema_tokens(schema: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(schema)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Fail on tokens outside `allowed`.
pub fn validate_schema(schema: &str, allowed: &[&str]) -> Result<(), CoreError> {
    let unknown: Vec<String> = schema_tokens(schema)
        .into_iter()
        .filter(|t| !allowed.contains(&t.as_str()))
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::Validation(format!(
            "Route schema '{schema}' uses unknown tokens: {}. Allowed: {}",
            unknown.join(", "),
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn expand(schema: &str, values: &HashMap<&str, String>) -> String {
    TOKEN_RE
        .replace_all(schema, |caps: &regex::Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}

/// Slug of the title, or the uuid when the title has no usable characters.
fn title_slug(document: &Document) -> String {
    let slug = slugify(document.title());
    if slug.is_empty() {
        document.uuid().to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// SchemaRouteGenerator
// ---------------------------------------------------------------------------

/// Expands configured schemas such as `/articles/{title}`.
#[derive(Debug, Clone)]
pub struct SchemaRouteGenerator {
    article_schema: String,
    page_schema: String,
}

impl SchemaRouteGenerator {
    pub fn new(
        article_schema: impl Into<String>,
        page_schema: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let article_schema = article_schema.into();
        let page_schema = page_schema.into();
        validate_schema(&article_schema, ARTICLE_TOKENS)?;
        validate_schema(&page_schema, PAGE_TOKENS)?;
        Ok(Self {
            article_schema,
            page_schema,
        })
    }

    /// Whether page routes change when pages are reordered.
    pub fn page_routes_depend_on_order(&self) -> bool {
        schema_tokens(&self.page_schema).iter().any(|t| t == "page")
    }
}

impl Default for SchemaRouteGenerator {
    fn default() -> Self {
        Self {
            article_schema: DEFAULT_ARTICLE_SCHEMA.to_string(),
            page_schema: DEFAULT_PAGE_SCHEMA.to_string(),
        }
    }
}

#[async_trait]
impl RouteGenerator for SchemaRouteGenerator {
    async fn generate(
        &self,
        document: &Document,
        context: &RouteContext<'_>,
    ) -> Result<Option<GeneratedRoute>, CoreError> {
        let mut values: HashMap<&str, String> = HashMap::new();
        values.insert("title", title_slug(document));
        values.insert("locale", document.locale().to_string());
        values.insert("structure_type", document.structure_type().to_string());
        values.insert("uuid", document.uuid().to_string());

        let schema = match document {
            Document::Article(_) => &self.article_schema,
            Document::Page(page) => {
                let Some(parent) = context.parent_path else {
                    return Ok(None);
                };
                values.insert("parent", parent.to_string());
                values.insert("page", page.page_number.to_string());
                &self.page_schema
            }
        };

        Ok(Some(GeneratedRoute::path(normalize_path(&expand(
            schema, &values,
        )))))
    }
}

// ---------------------------------------------------------------------------
// PageTreeRouteGenerator
// ---------------------------------------------------------------------------

/// Builds `ancestor.path + "/" + suffix` for page-tree-bound articles.
///
/// A stored suffix always wins over a slug of the current title. When the
/// ancestor page is gone the last known full path is kept.
pub struct PageTreeRouteGenerator {
    pages: Arc<dyn PageTreeResolver>,
}

impl PageTreeRouteGenerator {
    pub fn new(pages: Arc<dyn PageTreeResolver>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl RouteGenerator for PageTreeRouteGenerator {
    async fn generate(
        &self,
        document: &Document,
        _context: &RouteContext<'_>,
    ) -> Result<Option<GeneratedRoute>, CoreError> {
        let Some(article) = document.as_article() else {
            return Ok(None);
        };
        let Some(binding) = &article.page_tree else {
            return Ok(None);
        };

        let (suffix, derived) = match &binding.suffix {
            Some(stored) => (stored.clone(), None),
            None => {
                let slug = title_slug(document);
                (slug.clone(), Some(slug))
            }
        };

        match self.pages.find_page(binding.page_id, &article.locale).await? {
            Some(page) => Ok(Some(GeneratedRoute {
                path: normalize_path(&format!("{}/{}", page.path, suffix)),
                suffix: derived,
            })),
            None => {
                tracing::warn!(
                    uuid = %article.uuid,
                    page_id = %binding.page_id,
                    locale = %article.locale,
                    "Page-tree ancestor missing, keeping last known route"
                );
                Ok(article.route_path.clone().map(|path| GeneratedRoute {
                    path,
                    suffix: derived,
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChainRouteGenerator
// ---------------------------------------------------------------------------

/// Tries generators in order.
#[derive(Clone, Default)]
pub struct ChainRouteGenerator {
    generators: Vec<Arc<dyn RouteGenerator>>,
}

impl ChainRouteGenerator {
    pub fn new(generators: Vec<Arc<dyn RouteGenerator>>) -> Self {
        Self { generators }
    }

    /// Generate a path, or use `hint` verbatim when the editor supplied one.
    pub async fn generate(
        &self,
        document: &Document,
        context: &RouteContext<'_>,
        hint: Option<&str>,
    ) -> Result<Option<GeneratedRoute>, CoreError> {
        if let Some(hint) = hint {
            return Ok(Some(GeneratedRoute::path(normalize_path(hint))));
        }
        for generator in &self.generators {
            if let Some(route) = generator.generate(document, context).await? {
                return Ok(Some(route));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
