//! Inline style marks over poor text.
//!
//! A [`StyleMap`] records, per content character, whether a style tag covers
//! it. Toggling a style edits the map and then regenerates that tag's markup
//! from the map, leaving every other tag where it was.

use super::balance::{self, BalanceError};
use super::{TagGrammar, TagKind, TagMap, TagRole, TagToken};
use crate::config::DocumentConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
    Bold,
    Italic,
}

impl StyleTag {
    pub const ALL: [StyleTag; 2] = [StyleTag::Bold, StyleTag::Italic];

    pub fn kind(self) -> TagKind {
        match self {
            StyleTag::Bold => TagKind::Bold,
            StyleTag::Italic => TagKind::Italic,
        }
    }

    pub fn open_tag(self) -> &'static str {
        match self {
            StyleTag::Bold => "<b>",
            StyleTag::Italic => "<i>",
        }
    }

    pub fn close_tag(self) -> &'static str {
        match self {
            StyleTag::Bold => "</b>",
            StyleTag::Italic => "</i>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleState {
    Applied,
    Removed,
    /// The requested range was empty.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Styled,
    Unstyled,
    Mixed,
}

/// One flag per poor-text character plus a trailing sentinel that is always
/// `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMap {
    bits: Vec<bool>,
}

impl StyleMap {
    pub fn unstyled(poor_len: usize) -> Self {
        Self {
            bits: vec![false; poor_len + 1],
        }
    }

    /// Projects the open/close pairs of `tag` onto content characters.
    /// Depth never drops below zero, so stray closes in unbalanced text are
    /// ignored.
    pub fn from_tokens(tokens: &[TagToken], tag_map: &TagMap, tag: StyleTag) -> Self {
        let mut map = Self::unstyled(tag_map.poor_len());
        let mut pending = tokens
            .iter()
            .filter(|token| token.kind == tag.kind())
            .peekable();
        let mut depth = 0usize;
        for poor_index in 0..tag_map.poor_len() {
            let rich_index = tag_map.to_rich_index(poor_index);
            while let Some(token) = pending.next_if(|token| token.range.start < rich_index) {
                match token.role {
                    TagRole::Open => depth += 1,
                    TagRole::Close => depth = depth.saturating_sub(1),
                    TagRole::SelfClosing => {}
                }
            }
            map.bits[poor_index] = depth > 0;
        }
        map
    }

    /// Length including the sentinel slot.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.len() <= 1
    }

    pub fn poor_len(&self) -> usize {
        self.bits.len() - 1
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    pub fn is_styled(&self, poor_index: usize) -> bool {
        poor_index < self.poor_len() && self.bits[poor_index]
    }

    pub fn coverage(&self, range: Range<usize>) -> Coverage {
        let range = self.clamp(range);
        let styled = self.bits[range.clone()].iter().filter(|bit| **bit).count();
        if styled == 0 {
            Coverage::Unstyled
        } else if styled == range.len() {
            Coverage::Styled
        } else {
            Coverage::Mixed
        }
    }

    pub fn set_range(&mut self, range: Range<usize>, styled: bool) {
        let range = self.clamp(range);
        for bit in &mut self.bits[range] {
            *bit = styled;
        }
    }

    /// Maximal styled runs, in poor coordinates.
    pub fn runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for (index, bit) in self.bits.iter().enumerate() {
            match (start, *bit) {
                (None, true) => start = Some(index),
                (Some(run_start), false) => {
                    runs.push(run_start..index);
                    start = None;
                }
                _ => {}
            }
        }
        runs
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.poor_len());
        range.start.min(end)..end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StyleError {
    #[error(transparent)]
    Unbalanced(#[from] BalanceError),
    /// Removing the old tags joined neighbouring content into new markup.
    #[error("removing <{0}> tags would turn content into markup")]
    ContentMerged(TagKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEdit {
    pub tag: StyleTag,
    pub state: StyleState,
    pub rich_text: String,
}

/// Holds one [`StyleMap`] per supported style tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpanEngine {
    maps: BTreeMap<StyleTag, StyleMap>,
    split_at_foreign_tags: bool,
    enforce_tag_balance: bool,
}

impl StyleSpanEngine {
    /// An engine that rejects toggles producing unbalanced text.
    pub fn new(split_at_foreign_tags: bool) -> Self {
        Self {
            maps: BTreeMap::new(),
            split_at_foreign_tags,
            enforce_tag_balance: true,
        }
    }

    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            maps: BTreeMap::new(),
            split_at_foreign_tags: config.split_at_foreign_tags,
            enforce_tag_balance: config.enforce_tag_balance,
        }
    }

    pub fn rebuild(&mut self, tokens: &[TagToken], tag_map: &TagMap) {
        self.maps = StyleTag::ALL
            .iter()
            .map(|tag| (*tag, StyleMap::from_tokens(tokens, tag_map, *tag)))
            .collect();
    }

    pub fn rebuild_from_text(&mut self, rich_text: &str) {
        let tokens = TagGrammar::get().tokenize(rich_text);
        let tag_map = TagMap::from_tokens(&tokens, rich_text.chars().count());
        self.rebuild(&tokens, &tag_map);
    }

    pub fn map(&self, tag: StyleTag) -> Option<&StyleMap> {
        self.maps.get(&tag)
    }

    pub fn is_styled(&self, tag: StyleTag, poor_index: usize) -> bool {
        self.maps
            .get(&tag)
            .is_some_and(|map| map.is_styled(poor_index))
    }

    /// Toggles `tag` over a poor-text range and returns the regenerated rich
    /// text. A uniformly styled range is cleared, anything else is styled
    /// throughout. Unless balance enforcement is off, the result is checked
    /// before it is returned; the caller keeps its previous text on error.
    pub fn toggle(
        &mut self,
        rich_text: &str,
        tag: StyleTag,
        range: Range<usize>,
    ) -> Result<StyleEdit, StyleError> {
        self.rebuild_from_text(rich_text);
        let Some(map) = self.maps.get_mut(&tag) else {
            return Ok(StyleEdit {
                tag,
                state: StyleState::Unchanged,
                rich_text: rich_text.to_string(),
            });
        };
        let range = map.clamp(range);
        if range.is_empty() {
            return Ok(StyleEdit {
                tag,
                state: StyleState::Unchanged,
                rich_text: rich_text.to_string(),
            });
        }

        let state = match map.coverage(range.clone()) {
            Coverage::Styled => StyleState::Removed,
            Coverage::Unstyled | Coverage::Mixed => StyleState::Applied,
        };
        map.set_range(range.clone(), state == StyleState::Applied);

        let regenerated = regenerate(rich_text, tag, map, range, self.split_at_foreign_tags)
            .ok_or(StyleError::ContentMerged(tag.kind()))?;
        if self.enforce_tag_balance {
            balance::check_balance(&regenerated)?;
        }
        Ok(StyleEdit {
            tag,
            state,
            rich_text: regenerated,
        })
    }
}

/// Rewrites the markup of `tag` around the poor range `edited` so it matches
/// `map`.
///
/// Only the `tag` pairs whose content overlaps the edit are rewritten; the
/// window grows until no untouched pair overlaps it, and every other `tag`
/// token stays where it is. The rewritten tokens are removed, then window
/// boundaries are visited from the end toward the start, so every insertion
/// lands after the offsets still to be processed and the stripped text's tag
/// map stays valid throughout. Closing tags go right after the last content
/// character of a run, opening tags right before the first one.
///
/// Returns `None` when stripping the old tags changes the content, which
/// happens when the characters on either side of a removed tag form a new one.
pub fn regenerate(
    rich_text: &str,
    tag: StyleTag,
    map: &StyleMap,
    edited: Range<usize>,
    split_at_foreign_tags: bool,
) -> Option<String> {
    let grammar = TagGrammar::get();
    let tokens = grammar.tokenize(rich_text);
    let old_map = TagMap::from_tokens(&tokens, rich_text.chars().count());
    let (rewritten, window) = rewritten_tokens(&tokens, &old_map, tag, edited);

    let mut chars: Vec<char> = rich_text.chars().collect();
    for index in rewritten.iter().rev() {
        chars.drain(tokens[*index].range.clone());
    }

    let stripped: String = chars.iter().collect();
    let tokens = grammar.tokenize(&stripped);
    let tag_map = TagMap::from_tokens(&tokens, chars.len());
    let poor_len = tag_map.poor_len();
    if poor_len != map.poor_len() {
        return None;
    }
    let window = window.start.min(poor_len)..window.end.min(poor_len);

    let runs: Vec<Range<usize>> = map
        .runs()
        .into_iter()
        .map(|run| run.start.max(window.start)..run.end.min(window.end))
        .filter(|run| !run.is_empty())
        .collect();
    let cuts = if split_at_foreign_tags {
        cut_points(&runs, &foreign_endpoints(&tokens, &tag_map))
    } else {
        BTreeSet::new()
    };

    let open: Vec<char> = tag.open_tag().chars().collect();
    let close: Vec<char> = tag.close_tag().chars().collect();
    for poor_index in (window.start..=window.end).rev() {
        let previous = poor_index > window.start && map.is_styled(poor_index - 1);
        let current = poor_index < window.end && map.is_styled(poor_index);
        let split = previous && current && cuts.contains(&poor_index);
        if current && (!previous || split) {
            let at = tag_map.to_rich_index(poor_index);
            chars.splice(at..at, open.iter().copied());
        }
        if previous && (!current || split) {
            let at = tag_map.content_end_before(poor_index);
            chars.splice(at..at, close.iter().copied());
        }
    }

    Some(chars.into_iter().collect())
}

/// Indices of the `tag` tokens an edit of `edited` must rewrite, in token
/// order, and the poor window they span.
///
/// A pair covers the content between its open and close. Pairs with content
/// overlapping the window join it and widen it. An unclosed open styles
/// everything after it, and a stray close styles nothing; both are always
/// rewritten.
fn rewritten_tokens(
    tokens: &[TagToken],
    tag_map: &TagMap,
    tag: StyleTag,
    edited: Range<usize>,
) -> (Vec<usize>, Range<usize>) {
    let mut pairs: Vec<(usize, usize, Range<usize>)> = Vec::new();
    let mut stray = Vec::new();
    let mut open = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if token.kind != tag.kind() {
            continue;
        }
        match token.role {
            TagRole::Open => open.push(index),
            TagRole::Close => match open.pop() {
                Some(start) => {
                    let covered = tag_map.to_poor_index(tokens[start].range.start)
                        ..tag_map.to_poor_index(token.range.start);
                    pairs.push((start, index, covered));
                }
                None => stray.push(index),
            },
            TagRole::SelfClosing => {}
        }
    }

    let mut window = edited;
    let mut rewritten = stray;
    for start in open {
        let from = tag_map.to_poor_index(tokens[start].range.start);
        window = window.start.min(from)..window.end.max(tag_map.poor_len());
        rewritten.push(start);
    }

    let mut taken = vec![false; pairs.len()];
    loop {
        let mut grown = false;
        for (slot, (start, end, covered)) in pairs.iter().enumerate() {
            let overlaps = covered.start < window.end && window.start < covered.end;
            if taken[slot] || covered.is_empty() || !overlaps {
                continue;
            }
            taken[slot] = true;
            grown = true;
            window = window.start.min(covered.start)..window.end.max(covered.end);
            rewritten.push(*start);
            rewritten.push(*end);
        }
        if !grown {
            break;
        }
    }

    rewritten.sort_unstable();
    (rewritten, window)
}

/// Every non-placeholder tag as its poor gap plus the gap of its matching
/// partner, or `None` when it has none.
fn foreign_endpoints(tokens: &[TagToken], tag_map: &TagMap) -> Vec<(usize, Option<usize>)> {
    let gap = |token: &TagToken| tag_map.to_poor_index(token.range.start);
    let mut endpoints: Vec<(usize, Option<usize>)> = Vec::new();
    let mut open: Vec<(usize, TagKind)> = Vec::new();
    for token in tokens {
        match token.role {
            TagRole::SelfClosing => {}
            TagRole::Open => {
                open.push((endpoints.len(), token.kind));
                endpoints.push((gap(token), None));
            }
            TagRole::Close => match open.last().copied() {
                Some((slot, kind)) if kind == token.kind => {
                    open.pop();
                    let partner = endpoints[slot].0;
                    endpoints[slot].1 = Some(gap(token));
                    endpoints.push((gap(token), Some(partner)));
                }
                _ => endpoints.push((gap(token), None)),
            },
        }
    }
    endpoints
}

/// Gaps at which the runs must be cut so the regenerated tags nest with
/// every other tag. A tag strictly inside a piece of a run forces a cut there
/// unless its partner is strictly inside the same piece. Tags in the gap
/// before or after a piece already sit outside it.
fn cut_points(runs: &[Range<usize>], endpoints: &[(usize, Option<usize>)]) -> BTreeSet<usize> {
    let mut cuts = BTreeSet::new();
    for run in runs {
        loop {
            let mut grown = false;
            for &(gap, partner) in endpoints {
                if gap <= run.start || gap >= run.end || cuts.contains(&gap) {
                    continue;
                }
                let low = cuts.range(..gap).next_back().copied().unwrap_or(run.start);
                let high = cuts.range(gap + 1..).next().copied().unwrap_or(run.end);
                if !partner.is_some_and(|partner| low < partner && partner < high) {
                    cuts.insert(gap);
                    grown = true;
                }
            }
            if !grown {
                break;
            }
        }
    }
    cuts
}
