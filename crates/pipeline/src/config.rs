use pressroom_core::route_generator::{DEFAULT_ARTICLE_SCHEMA, DEFAULT_PAGE_SCHEMA};
use pressroom_core::route_manager::RouteConflictPolicy;
use pressroom_core::CoreError;

/// Publishing configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishingConfig {
    /// Route schema for articles (default: `/articles/{title}`).
    pub article_route_schema: String,
    /// Route schema for article pages (default: `{parent}/page-{page}`).
    pub page_route_schema: String,
    /// Registered structure types, parsed from a comma-separated list.
    pub structure_types: Vec<String>,
    /// Structure type used when a document does not name one.
    pub default_structure_type: String,
    /// Webspace projections fall back to when an article has none.
    pub default_webspace: Option<String>,
    /// What happens when a generated path is taken at persist or publish.
    pub conflict_policy: RouteConflictPolicy,
}

impl PublishingConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                 |
    /// |--------------------------------------|-------------------------|
    /// | `PRESSROOM_ARTICLE_ROUTE_SCHEMA`     | `/articles/{title}`     |
    /// | `PRESSROOM_PAGE_ROUTE_SCHEMA`        | `{parent}/page-{page}`  |
    /// | `PRESSROOM_STRUCTURE_TYPES`          | `default`               |
    /// | `PRESSROOM_DEFAULT_STRUCTURE_TYPE`   | `default`               |
    /// | `PRESSROOM_DEFAULT_WEBSPACE`         | unset                   |
    /// | `PRESSROOM_ROUTE_CONFLICT_POLICY`    | `reject`                |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        let article_route_schema = lookup("PRESSROOM_ARTICLE_ROUTE_SCHEMA")
            .unwrap_or(defaults.article_route_schema);

        let page_route_schema =
            lookup("PRESSROOM_PAGE_ROUTE_SCHEMA").unwrap_or(defaults.page_route_schema);

        let structure_types: Vec<String> = lookup("PRESSROOM_STRUCTURE_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.structure_types);

        let default_structure_type = lookup("PRESSROOM_DEFAULT_STRUCTURE_TYPE")
            .unwrap_or(defaults.default_structure_type);

        let default_webspace =
            lookup("PRESSROOM_DEFAULT_WEBSPACE").filter(|s| !s.trim().is_empty());

        let conflict_policy = match lookup("PRESSROOM_ROUTE_CONFLICT_POLICY") {
            Some(raw) => RouteConflictPolicy::from_str(raw.trim())?,
            None => defaults.conflict_policy,
        };

        Ok(Self {
            article_route_schema,
            page_route_schema,
            structure_types,
            default_structure_type,
            default_webspace,
            conflict_policy,
        })
    }
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            article_route_schema: DEFAULT_ARTICLE_SCHEMA.to_string(),
            page_route_schema: DEFAULT_PAGE_SCHEMA.to_string(),
            structure_types: vec!["default".to_string()],
            default_structure_type: "default".to_string(),
            default_webspace: None,
            conflict_policy: RouteConflictPolicy::Reject,
        }
    }
}
