//! Rich-text document model and editing API.
//!
//! A [`Document`] owns the rich text and keeps every derived view of it (tag
//! map, poor text, style maps, object placeholders) rebuilt after each
//! mutation. Edits that would leave the markup unbalanced are rejected and the
//! previous text is kept.

use crate::config::DocumentConfig;
use crate::core::balance::{self, BalanceError};
use crate::core::mark::{
    StyleEdit, StyleError, StyleMap, StyleSpanEngine, StyleState, StyleTag,
};
use crate::core::{
    Direction, IndexRepairExhausted, TagGrammar, TagKind, TagMap, TagToken, char_to_byte,
    make_poor_text,
};
use crate::registry::{
    AutoSync, IdCollision, ObjectFieldRegistry, ObjectId, ObjectIdPair, ObjectRef,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

pub mod snapshot;

pub use snapshot::{DocumentSnapshot, SnapshotError};

/// Which side of neighbouring markup an insert lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorBias {
    /// Right after the previous content character, inside its spans.
    Before,
    /// Right before the next content character, inside its spans.
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFieldPlaceholder {
    #[serde(rename = "objectId")]
    pub id: ObjectId,
    /// Rich-text character offset of the placeholder tag.
    pub index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("rich text has unbalanced tags: {0}")]
    TagImbalance(BalanceError),
    #[error("style could not be applied: {0}")]
    StyleApplication(StyleError),
    #[error(transparent)]
    IndexRepairExhausted(#[from] IndexRepairExhausted),
    #[error(transparent)]
    IdCollision(#[from] IdCollision),
    #[error("object field {0} not found")]
    ObjectFieldNotFound(ObjectId),
    #[error("edit would turn content into markup")]
    ContentMerged,
}

#[derive(Debug, Clone)]
pub struct Document<R> {
    rich_text: String,
    poor_text: String,
    tokens: Vec<TagToken>,
    tag_map: TagMap,
    styles: StyleSpanEngine,
    balance: Result<(), BalanceError>,
    object_id_pairs: Vec<ObjectIdPair<R>>,
    saved: Option<DocumentSnapshot<R>>,
    config: DocumentConfig,
}

impl<R: ObjectRef> Document<R> {
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            rich_text: String::new(),
            poor_text: String::new(),
            tokens: Vec::new(),
            tag_map: TagMap::default(),
            styles: StyleSpanEngine::from_config(&config),
            balance: Ok(()),
            object_id_pairs: Vec::new(),
            saved: None,
            config,
        }
    }

    /// Wraps existing rich text without gating it. Unbalanced text is kept for
    /// display but refuses edits until replaced.
    pub fn from_rich_text(text: impl Into<String>) -> Self {
        let mut document = Self::new();
        document.load_rich_text(text.into());
        document
    }

    pub(crate) fn load_rich_text(&mut self, text: String) {
        self.rich_text = text;
        self.refresh();
        if let Err(err) = &self.balance {
            tracing::warn!(%err, "loaded rich text is unbalanced, document is read-only");
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn rich_text(&self) -> &str {
        &self.rich_text
    }

    pub fn poor_text(&self) -> &str {
        &self.poor_text
    }

    pub fn tag_map(&self) -> &TagMap {
        &self.tag_map
    }

    pub fn tokens(&self) -> &[TagToken] {
        &self.tokens
    }

    /// The balance problem of the current text, if any.
    pub fn imbalance(&self) -> Option<&BalanceError> {
        self.balance.as_ref().err()
    }

    pub fn is_editable(&self) -> bool {
        !self.config.enforce_tag_balance || self.balance.is_ok()
    }

    /// Replaces the rich text. Unbalanced text is rejected and the current
    /// text stays.
    pub fn set_rich_text(&mut self, text: impl Into<String>) -> Result<(), EditError> {
        self.apply_checked(text.into())
    }

    pub fn to_poor_index(&self, rich_index: usize) -> usize {
        self.tag_map.to_poor_index(rich_index)
    }

    pub fn to_rich_index(&self, poor_index: usize) -> usize {
        self.tag_map.to_rich_index(poor_index)
    }

    pub fn nearest_content_index(
        &self,
        rich_index: usize,
        direction: Direction,
    ) -> Result<usize, EditError> {
        self.tag_map
            .nearest_content_index(rich_index, direction)
            .map_err(|err| {
                tracing::warn!(%err, "caret repair aborted");
                EditError::from(err)
            })
    }

    pub fn is_styled(&self, tag: StyleTag, poor_index: usize) -> bool {
        self.styles.is_styled(tag, poor_index)
    }

    pub fn style_map(&self, tag: StyleTag) -> Option<&StyleMap> {
        self.styles.map(tag)
    }

    /// Toggles `tag` over `poor_length` characters starting at `poor_start`.
    /// Mixed ranges are styled throughout.
    pub fn toggle_style(
        &mut self,
        tag: StyleTag,
        poor_start: usize,
        poor_length: usize,
    ) -> Result<StyleState, EditError> {
        self.ensure_editable()?;
        let range = poor_start..poor_start.saturating_add(poor_length);
        match self.styles.toggle(&self.rich_text, tag, range) {
            Ok(StyleEdit {
                state, rich_text, ..
            }) => {
                if state != StyleState::Unchanged {
                    self.rich_text = rich_text;
                }
                self.refresh();
                Ok(state)
            }
            Err(err) => {
                tracing::warn!(%err, ?tag, "style toggle reverted");
                self.refresh();
                Err(EditError::StyleApplication(err))
            }
        }
    }

    /// Inserts `text` in front of content character `poor_index`. Returns the
    /// rich offset the text was inserted at.
    pub fn insert_text(
        &mut self,
        poor_index: usize,
        text: &str,
        bias: AnchorBias,
    ) -> Result<usize, EditError> {
        self.ensure_editable()?;
        let poor_index = poor_index.min(self.tag_map.poor_len());
        let at = match bias {
            AnchorBias::Before => self.tag_map.content_end_before(poor_index),
            AnchorBias::After => self.tag_map.to_rich_index(poor_index),
        };
        let mut candidate = self.rich_text.clone();
        candidate.insert_str(char_to_byte(&self.rich_text, at), text);
        let mut expected = self.poor_text.clone();
        expected.insert_str(char_to_byte(&self.poor_text, poor_index), text);
        self.apply_content_edit(candidate, &expected)?;
        Ok(at)
    }

    /// Deletes content characters only. Tags around and inside the range
    /// survive. Returns the deleted poor text.
    pub fn delete_text(
        &mut self,
        poor_start: usize,
        poor_length: usize,
    ) -> Result<String, EditError> {
        self.ensure_editable()?;
        let end = poor_start
            .saturating_add(poor_length)
            .min(self.tag_map.poor_len());
        let start = poor_start.min(end);

        let mut chars: Vec<char> = self.rich_text.chars().collect();
        let mut removed = Vec::with_capacity(end - start);
        for poor_index in (start..end).rev() {
            removed.push(chars.remove(self.tag_map.to_rich_index(poor_index)));
        }
        removed.reverse();

        let expected: String = self
            .poor_text
            .chars()
            .enumerate()
            .filter(|(index, _)| !(start..end).contains(index))
            .map(|(_, ch)| ch)
            .collect();
        self.apply_content_edit(chars.into_iter().collect(), &expected)?;
        Ok(removed.into_iter().collect())
    }

    /// Embeds a placeholder for `object` at the first content position at or
    /// after `rich_index`. A `None` object gets a fresh id with no target.
    pub fn insert_object_field(
        &mut self,
        rich_index: usize,
        object: Option<R>,
        registry: &mut ObjectFieldRegistry<R>,
    ) -> Result<ObjectId, EditError> {
        self.ensure_editable()?;
        let at = self.nearest_content_index(rich_index, Direction::Forward)?;
        let display_name = object
            .as_ref()
            .map(ObjectRef::display_name)
            .unwrap_or_default();
        let id = match &object {
            Some(object) => registry.get_id_from_object(object),
            None => {
                let id = registry.allocate_id();
                registry.add_object_id_pair(None, id, display_name.clone())?;
                id
            }
        };

        let mut candidate = self.rich_text.clone();
        candidate.insert_str(char_to_byte(&self.rich_text, at), &id.placeholder());
        let expected = self.poor_text.clone();
        self.apply_content_edit(candidate, &expected)?;
        self.remember_pair(ObjectIdPair {
            id,
            display_name,
            object,
        });
        Ok(id)
    }

    /// Removes every placeholder carrying `id`. Returns how many were removed.
    pub fn remove_object_field(&mut self, id: ObjectId) -> Result<usize, EditError> {
        self.ensure_editable()?;
        let ranges: Vec<Range<usize>> = self
            .tokens
            .iter()
            .filter(|token| placeholder_id(token) == Some(id))
            .map(|token| token.range.clone())
            .collect();
        if ranges.is_empty() {
            return Err(EditError::ObjectFieldNotFound(id));
        }

        let mut chars: Vec<char> = self.rich_text.chars().collect();
        for range in ranges.iter().rev() {
            chars.drain(range.clone());
        }
        let expected = self.poor_text.clone();
        self.apply_content_edit(chars.into_iter().collect(), &expected)?;
        self.object_id_pairs.retain(|pair| pair.id != id);
        Ok(ranges.len())
    }

    pub fn object_fields(&self) -> Vec<ObjectFieldPlaceholder> {
        self.tokens
            .iter()
            .filter_map(|token| {
                placeholder_id(token).map(|id| ObjectFieldPlaceholder {
                    id,
                    index: token.range.start,
                    length: token.range.len(),
                })
            })
            .collect()
    }

    /// Every pair this document knows, including ones no longer referenced.
    pub fn object_id_pairs(&self) -> &[ObjectIdPair<R>] {
        &self.object_id_pairs
    }

    /// Pairs whose id appears in a placeholder of the current text.
    pub fn referenced_pairs(&self) -> impl Iterator<Item = &ObjectIdPair<R>> {
        let ids: BTreeSet<ObjectId> = self
            .object_fields()
            .iter()
            .map(|field| field.id)
            .collect();
        self.object_id_pairs
            .iter()
            .filter(move |pair| ids.contains(&pair.id))
    }

    /// Registers this document's referenced pairs with `registry`.
    pub fn discover_object_fields(
        &self,
        registry: &mut ObjectFieldRegistry<R>,
    ) -> Vec<IdCollision> {
        self.referenced_pairs()
            .filter_map(|pair| {
                registry
                    .add_object_id_pair(pair.object.clone(), pair.id, pair.display_name.clone())
                    .err()
            })
            .collect()
    }

    /// Placeholder ids the registry currently has no entry for.
    pub fn missing_object_fields(&self, registry: &ObjectFieldRegistry<R>) -> Vec<ObjectId> {
        let ids: BTreeSet<ObjectId> = self.object_fields().iter().map(|field| field.id).collect();
        ids.into_iter()
            .filter(|id| !registry.contains_id(*id))
            .collect()
    }

    /// Looks `id` up, resyncing from this document and `open_documents` on a
    /// miss.
    pub fn resolve_object_field(
        &self,
        id: ObjectId,
        registry: &mut ObjectFieldRegistry<R>,
        open_documents: &[&Document<R>],
    ) -> Option<R> {
        let mut sources = open_documents.to_vec();
        if !sources.iter().any(|document| std::ptr::eq(*document, self)) {
            sources.push(self);
        }
        registry.get_object_from_id(id, AutoSync::Enabled(&sources))
    }

    fn remember_pair(&mut self, pair: ObjectIdPair<R>) {
        match self
            .object_id_pairs
            .iter_mut()
            .find(|existing| existing.id == pair.id)
        {
            Some(existing) => *existing = pair,
            None => self.object_id_pairs.push(pair),
        }
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        match &self.balance {
            Err(err) if self.config.enforce_tag_balance => Err(EditError::TagImbalance(err.clone())),
            _ => Ok(()),
        }
    }

    /// Like [`Self::apply_checked`], but first requires the candidate's poor
    /// text to be `expected`, so content never fuses into a new tag.
    fn apply_content_edit(&mut self, candidate: String, expected: &str) -> Result<(), EditError> {
        if make_poor_text(&candidate) != expected {
            tracing::warn!("edit would turn content into markup, previous rich text kept");
            return Err(EditError::ContentMerged);
        }
        self.apply_checked(candidate)
    }

    fn apply_checked(&mut self, candidate: String) -> Result<(), EditError> {
        if self.config.enforce_tag_balance
            && let Err(err) = balance::check_balance(&candidate)
        {
            tracing::warn!(%err, "edit rejected, previous rich text kept");
            return Err(EditError::TagImbalance(err));
        }
        self.rich_text = candidate;
        self.refresh();
        Ok(())
    }

    fn refresh(&mut self) {
        self.tokens = TagGrammar::get().tokenize(&self.rich_text);
        self.tag_map = TagMap::from_tokens(&self.tokens, self.rich_text.chars().count());
        self.poor_text = self.tag_map.strip(&self.rich_text);
        self.styles.rebuild(&self.tokens, &self.tag_map);
        self.balance = balance::check_tokens(&self.tokens);
    }
}

impl<R: ObjectRef> Default for Document<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder_id(token: &TagToken) -> Option<ObjectId> {
    if token.kind != TagKind::ObjectField {
        return None;
    }
    token.value.as_deref().and_then(ObjectId::parse)
}
