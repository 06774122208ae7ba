use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Document, DocumentKind, LocalizationState};
use crate::error::CoreError;
use crate::store::ContentStore;
use crate::types::{page_number_property, DocumentId, Workspace};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Node {
    kind: DocumentKind,
    parent: Option<DocumentId>,
    children: Vec<DocumentId>,
    properties: BTreeMap<String, serde_json::Value>,
    translations: BTreeMap<String, Document>,
}

impl Node {
    fn new(kind: DocumentKind, parent: Option<DocumentId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            properties: BTreeMap::new(),
            translations: BTreeMap::new(),
        }
    }

    /// Properties that belong to `locale` or to no locale at all.
    fn properties_for(&self, locale: &str) -> Vec<(String, serde_json::Value)> {
        let prefix = locale_prefix(locale);
        self.properties
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix) || !k.starts_with("i18n:"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn drop_locale(&mut self, locale: &str) {
        let prefix = locale_prefix(locale);
        self.translations.remove(locale);
        self.properties.retain(|k, _| !k.starts_with(&prefix));
    }
}

fn locale_prefix(locale: &str) -> String {
    format!("i18n:{locale}-")
}

/// A published state of an article subtree in one locale.
#[derive(Debug, Clone)]
struct Snapshot {
    root: Document,
    pages: Vec<(Document, Option<serde_json::Value>)>,
}

#[derive(Debug, Default)]
struct StoreState {
    draft: HashMap<DocumentId, Node>,
    live: HashMap<DocumentId, Node>,
    versions: HashMap<(DocumentId, String), Vec<Snapshot>>,
    flushes: usize,
}

impl StoreState {
    fn nodes(&self, workspace: Workspace) -> &HashMap<DocumentId, Node> {
        match workspace {
            Workspace::Draft => &self.draft,
            Workspace::Live => &self.live,
        }
    }

    fn nodes_mut(&mut self, workspace: Workspace) -> &mut HashMap<DocumentId, Node> {
        match workspace {
            Workspace::Draft => &mut self.draft,
            Workspace::Live => &mut self.live,
        }
    }

    fn node_mut(&mut self, id: DocumentId, workspace: Workspace) -> Result<&mut Node, CoreError> {
        self.nodes_mut(workspace)
            .get_mut(&id)
            .ok_or_else(|| CoreError::document_not_found(id))
    }

    /// `id` and its descendants in pre-order.
    fn subtree(&self, id: DocumentId, workspace: Workspace) -> Vec<DocumentId> {
        let nodes = self.nodes(workspace);
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = nodes.get(&next) else {
                continue;
            };
            out.push(next);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn load(&self, id: DocumentId, locale: &str, workspace: Workspace) -> Option<Document> {
        let node = self.nodes(workspace).get(&id)?;
        if let Some(own) = node.translations.get(locale) {
            let mut document = own.clone();
            let state = match document.shadow_locale() {
                Some(shadow) => LocalizationState::Shadow {
                    locale: shadow.to_string(),
                },
                None => LocalizationState::Localized,
            };
            document.set_localization(state);
            return Some(document);
        }

        let (source, translation) = node.translations.iter().next()?;
        let mut ghost = translation.clone();
        ghost.set_locale(locale);
        ghost.set_localization(LocalizationState::Ghost {
            locale: source.clone(),
        });
        Some(ghost)
    }

    fn detach(&mut self, id: DocumentId, workspace: Workspace) {
        let parent = self.nodes(workspace).get(&id).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.nodes_mut(workspace).get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
    }

    fn remove_subtree(&mut self, id: DocumentId, workspace: Workspace) {
        self.detach(id, workspace);
        for node in self.subtree(id, workspace) {
            self.nodes_mut(workspace).remove(&node);
        }
    }

    /// Insert `id` below `parent` at the position its draft sibling order
    /// implies.
    fn attach_in_draft_order(&mut self, id: DocumentId, parent: DocumentId, workspace: Workspace) {
        let draft_order = self
            .draft
            .get(&parent)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        let Some(node) = self.nodes_mut(workspace).get_mut(&parent) else {
            return;
        };
        if !node.children.contains(&id) {
            node.children.push(id);
        }
        let rank = |c: &DocumentId| {
            draft_order
                .iter()
                .position(|d| d == c)
                .unwrap_or(usize::MAX)
        };
        node.children.sort_by_key(rank);
    }

    /// Copy one locale of `id` from `from` into `to`, creating the target
    /// node below its parent when missing.
    fn copy_locale_between(
        &mut self,
        id: DocumentId,
        locale: &str,
        from: Workspace,
        to: Workspace,
    ) -> Result<(), CoreError> {
        let source = self
            .nodes(from)
            .get(&id)
            .ok_or_else(|| CoreError::document_not_found(id))?;
        let translation = source
            .translations
            .get(locale)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "translation",
                id: format!("{id}/{locale}"),
            })?;
        let properties = source.properties_for(locale);
        let kind = source.kind;
        let parent = source.parent;

        if !self.nodes(to).contains_key(&id) {
            if let Some(parent) = parent {
                if !self.nodes(to).contains_key(&parent) {
                    return Err(CoreError::Validation(format!(
                        "parent {parent} of {id} does not exist in the {to} workspace"
                    )));
                }
            }
            self.nodes_mut(to).insert(id, Node::new(kind, parent));
            if let Some(parent) = parent {
                self.attach_in_draft_order(id, parent, to);
            }
        }

        let target = self.node_mut(id, to)?;
        target.drop_locale(locale);
        target.translations.insert(locale.to_string(), translation);
        target.properties.extend(properties);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryContentStore
// ---------------------------------------------------------------------------

/// Content store with draft and live workspaces held in maps.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    state: RwLock<StoreState>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`ContentStore::flush`] calls.
    pub async fn flush_count(&self) -> usize {
        self.state.read().await.flushes
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create_node(
        &self,
        kind: DocumentKind,
        parent: Option<DocumentId>,
    ) -> Result<DocumentId, CoreError> {
        let mut state = self.state.write().await;
        let id = DocumentId::new_v4();
        if let Some(parent) = parent {
            state.node_mut(parent, Workspace::Draft)?.children.push(id);
        }
        state.draft.insert(id, Node::new(kind, parent));
        Ok(id)
    }

    async fn node_exists(&self, id: DocumentId, workspace: Workspace) -> Result<bool, CoreError> {
        Ok(self.state.read().await.nodes(workspace).contains_key(&id))
    }

    async fn node_kind(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Option<DocumentKind>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .nodes(workspace)
            .get(&id)
            .map(|n| n.kind))
    }

    async fn find(
        &self,
        id: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<Option<Document>, CoreError> {
        Ok(self.state.read().await.load(id, locale, workspace))
    }

    async fn locales(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Vec<String>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .nodes(workspace)
            .get(&id)
            .map(|n| n.translations.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn children(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Vec<DocumentId>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .nodes(workspace)
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default())
    }

    async fn parent(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Option<DocumentId>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .nodes(workspace)
            .get(&id)
            .and_then(|n| n.parent))
    }

    async fn save(&self, document: &Document, workspace: Workspace) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let node = state.node_mut(document.uuid(), workspace)?;
        let mut own = document.clone();
        own.set_localization(LocalizationState::Localized);
        node.translations
            .insert(document.routable().locale().to_string(), own);
        Ok(())
    }

    async fn set_property(
        &self,
        id: DocumentId,
        workspace: Workspace,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        state
            .node_mut(id, workspace)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    async fn property(
        &self,
        id: DocumentId,
        workspace: Workspace,
        name: &str,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .nodes(workspace)
            .get(&id)
            .and_then(|n| n.properties.get(name).cloned()))
    }

    async fn publish(&self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        state.copy_locale_between(id, locale, Workspace::Draft, Workspace::Live)
    }

    async fn unpublish(&self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let subtree = state.subtree(id, Workspace::Live);
        for node_id in subtree.into_iter().rev() {
            let empty = match state.live.get_mut(&node_id) {
                Some(node) => {
                    node.drop_locale(locale);
                    node.translations.is_empty()
                }
                None => continue,
            };
            if empty {
                state.remove_subtree(node_id, Workspace::Live);
            }
        }
        Ok(())
    }

    async fn remove(&self, id: DocumentId) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        if !state.draft.contains_key(&id) && !state.live.contains_key(&id) {
            return Err(CoreError::document_not_found(id));
        }
        state.remove_subtree(id, Workspace::Draft);
        state.remove_subtree(id, Workspace::Live);
        state.versions.retain(|(root, _), _| *root != id);
        Ok(())
    }

    async fn remove_node(&self, id: DocumentId, workspace: Workspace) -> Result<(), CoreError> {
        self.state.write().await.remove_subtree(id, workspace);
        Ok(())
    }

    async fn remove_draft(&self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        state.copy_locale_between(id, locale, Workspace::Live, Workspace::Draft)
    }

    async fn remove_locale(&self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        for workspace in [Workspace::Draft, Workspace::Live] {
            for node_id in state.subtree(id, workspace) {
                if let Some(node) = state.nodes_mut(workspace).get_mut(&node_id) {
                    node.drop_locale(locale);
                }
            }
        }
        Ok(())
    }

    async fn copy(
        &self,
        id: DocumentId,
        parent: Option<DocumentId>,
    ) -> Result<DocumentId, CoreError> {
        let mut state = self.state.write().await;
        let subtree = state.subtree(id, Workspace::Draft);
        if subtree.is_empty() {
            return Err(CoreError::document_not_found(id));
        }
        if parent.is_none() && state.draft[&id].kind == DocumentKind::Page {
            return Err(CoreError::Validation(format!("page {id} cannot be copied without a parent")));
        }

        let mapping: HashMap<DocumentId, DocumentId> = subtree
            .iter()
            .map(|old| (*old, DocumentId::new_v4()))
            .collect();

        let mut copies = Vec::with_capacity(subtree.len());
        for old in &subtree {
            let source = &state.draft[old];
            let mut node = source.clone();
            node.parent = if *old == id {
                parent
            } else {
                source.parent.and_then(|p| mapping.get(&p).copied())
            };
            node.children = source
                .children
                .iter()
                .filter_map(|c| mapping.get(c).copied())
                .collect();
            for translation in node.translations.values_mut() {
                translation.set_uuid(mapping[old]);
                if let Some(page) = translation.as_page_mut() {
                    page.parent = if *old == id {
                        parent.unwrap_or(page.parent)
                    } else {
                        mapping.get(&page.parent).copied().unwrap_or(page.parent)
                    };
                }
            }
            copies.push((mapping[old], node));
        }

        let root = mapping[&id];
        if let Some(parent) = parent {
            state.node_mut(parent, Workspace::Draft)?.children.push(root);
        }
        state.draft.extend(copies);
        Ok(root)
    }

    async fn copy_locale(
        &self,
        id: DocumentId,
        source: &str,
        target: &str,
    ) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let source_prefix = locale_prefix(source);
        let target_prefix = locale_prefix(target);
        for node_id in state.subtree(id, Workspace::Draft) {
            let Some(node) = state.draft.get_mut(&node_id) else {
                continue;
            };
            let Some(mut translation) = node.translations.get(source).cloned() else {
                continue;
            };
            translation.set_locale(target);
            node.translations.insert(target.to_string(), translation);

            let copied: Vec<(String, serde_json::Value)> = node
                .properties
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(&source_prefix)
                        .map(|rest| (format!("{target_prefix}{rest}"), v.clone()))
                })
                .collect();
            node.properties.extend(copied);
        }
        Ok(())
    }

    async fn reorder(&self, id: DocumentId, position: usize) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let parent = state
            .draft
            .get(&id)
            .ok_or_else(|| CoreError::document_not_found(id))?
            .parent
            .ok_or_else(|| CoreError::Validation(format!("{id} has no parent to reorder in")))?;
        let siblings = &mut state.node_mut(parent, Workspace::Draft)?.children;
        siblings.retain(|c| *c != id);
        let position = position.min(siblings.len());
        siblings.insert(position, id);
        Ok(())
    }

    async fn create_version(&self, id: DocumentId, locale: &str) -> Result<u32, CoreError> {
        let mut state = self.state.write().await;
        let root = state
            .draft
            .get(&id)
            .and_then(|n| n.translations.get(locale))
            .cloned()
            .ok_or_else(|| CoreError::document_not_found(id))?;

        let property = page_number_property(locale);
        let pages = state.draft[&id]
            .children
            .iter()
            .filter_map(|child| state.draft.get(child))
            .filter_map(|node| {
                node.translations
                    .get(locale)
                    .map(|t| (t.clone(), node.properties.get(&property).cloned()))
            })
            .collect();

        let versions = state.versions.entry((id, locale.to_string())).or_default();
        versions.push(Snapshot { root, pages });
        Ok(versions.len() as u32)
    }

    async fn restore(&self, id: DocumentId, locale: &str, version: u32) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let snapshot = state
            .versions
            .get(&(id, locale.to_string()))
            .and_then(|v| v.get((version as usize).checked_sub(1)?))
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "version",
                id: format!("{id}/{locale}/{version}"),
            })?;

        state
            .node_mut(id, Workspace::Draft)?
            .translations
            .insert(locale.to_string(), snapshot.root.clone());

        let property = page_number_property(locale);
        let mut order = Vec::with_capacity(snapshot.pages.len());
        for (page, number) in snapshot.pages {
            let page_id = page.uuid();
            if !state.draft.contains_key(&page_id) {
                state
                    .draft
                    .insert(page_id, Node::new(DocumentKind::Page, Some(id)));
                state.node_mut(id, Workspace::Draft)?.children.push(page_id);
            }
            let node = state.node_mut(page_id, Workspace::Draft)?;
            node.translations.insert(locale.to_string(), page);
            if let Some(number) = number {
                node.properties.insert(property.clone(), number);
            }
            order.push(page_id);
        }

        let children = &mut state.node_mut(id, Workspace::Draft)?.children;
        let rank = |c: &DocumentId| order.iter().position(|o| o == c).unwrap_or(usize::MAX);
        children.sort_by_key(rank);
        Ok(())
    }

    async fn find_by_page_tree_parent(
        &self,
        page_id: DocumentId,
        workspace: Workspace,
    ) -> Result<Vec<DocumentId>, CoreError> {
        let state = self.state.read().await;
        let mut ids: Vec<DocumentId> = state
            .nodes(workspace)
            .iter()
            .filter(|(_, node)| {
                node.translations.values().any(|t| {
                    t.as_article()
                        .and_then(|a| a.page_tree.as_ref())
                        .is_some_and(|b| b.page_id == page_id)
                })
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn flush(&self) -> Result<(), CoreError> {
        self.state.write().await.flushes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
