//! Markup grammar, tag map and index translation.
//!
//! This module provides the building blocks the document model is made of:
//!
//! - [`TagGrammar`] - The fixed set of recognized tags and their patterns
//! - [`TagToken`] - One matched tag occurrence in rich text
//! - [`TagMap`] - Per-character mask marking markup versus content, plus the
//!   rich ↔ poor index translation built on top of it
//! - [`balance`] - Stack-based tag balance checking
//! - [`mark`] - Bold/italic style maps and the toggle rewrite
//!
//! Every index in this module is a character offset, never a byte offset.

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

pub mod balance;
pub mod mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    Bold,
    Italic,
    Color,
    Size,
    ObjectField,
}

impl TagKind {
    pub fn name(self) -> &'static str {
        match self {
            TagKind::Bold => "b",
            TagKind::Italic => "i",
            TagKind::Color => "color",
            TagKind::Size => "size",
            TagKind::ObjectField => "o",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRole {
    Open,
    Close,
    /// A tag that opens and closes in one token, like the object placeholder.
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub kind: TagKind,
    pub role: TagRole,
    /// Character range of the whole tag literal.
    pub range: Range<usize>,
    /// Attribute payload (`#ff0000` for color, the digits of an object id).
    pub value: Option<String>,
}

#[derive(Debug)]
pub struct TagPattern {
    pub kind: TagKind,
    pub role: TagRole,
    regex: Regex,
}

impl TagPattern {
    fn new(kind: TagKind, role: TagRole, pattern: &str) -> Self {
        Self {
            kind,
            role,
            regex: Regex::new(pattern).expect("tag grammar pattern must compile"),
        }
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[derive(Debug)]
pub struct TagGrammar {
    patterns: Vec<TagPattern>,
}

impl TagGrammar {
    /// The process-wide grammar. Patterns are compiled once.
    pub fn get() -> &'static TagGrammar {
        static GRAMMAR: OnceLock<TagGrammar> = OnceLock::new();
        GRAMMAR.get_or_init(|| TagGrammar {
            patterns: vec![
                TagPattern::new(TagKind::Bold, TagRole::Open, r"<b>"),
                TagPattern::new(TagKind::Bold, TagRole::Close, r"</b>"),
                TagPattern::new(TagKind::Italic, TagRole::Open, r"<i>"),
                TagPattern::new(TagKind::Italic, TagRole::Close, r"</i>"),
                TagPattern::new(TagKind::Color, TagRole::Open, r"<color=([^<>]*)>"),
                TagPattern::new(TagKind::Color, TagRole::Close, r"</color>"),
                TagPattern::new(TagKind::Size, TagRole::Open, r"<size=([^<>]*)>"),
                TagPattern::new(TagKind::Size, TagRole::Close, r"</size>"),
                TagPattern::new(
                    TagKind::ObjectField,
                    TagRole::SelfClosing,
                    r#"<o="(-?[0-9]+)"></o>"#,
                ),
            ],
        })
    }

    pub fn patterns(&self) -> &[TagPattern] {
        &self.patterns
    }

    /// Matches every pattern against `text` and returns the tokens ordered by
    /// start offset. Patterns are applied one after another, each leftmost-first
    /// and non-overlapping; a later match that overlaps an earlier token is
    /// dropped.
    pub fn tokenize(&self, text: &str) -> Vec<TagToken> {
        let char_at = byte_to_char_table(text);
        let mut tokens = Vec::new();
        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                tokens.push(TagToken {
                    kind: pattern.kind,
                    role: pattern.role,
                    range: char_at[whole.start()]..char_at[whole.end()],
                    value: caps.get(1).map(|value| value.as_str().to_string()),
                });
            }
        }
        tokens.sort_by_key(|token| token.range.start);

        let mut accepted: Vec<TagToken> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if accepted
                .last()
                .is_some_and(|last| token.range.start < last.range.end)
            {
                continue;
            }
            accepted.push(token);
        }
        accepted
    }
}

fn byte_to_char_table(text: &str) -> Vec<usize> {
    let mut table = vec![0; text.len() + 1];
    let mut chars = 0;
    for (byte, ch) in text.char_indices() {
        for slot in &mut table[byte..byte + ch.len_utf8()] {
            *slot = chars;
        }
        chars += 1;
    }
    table[text.len()] = chars;
    table
}

/// Removes every recognized tag from `text`.
pub fn make_poor_text(text: &str) -> String {
    TagMap::build(text).strip(text)
}

/// Byte offset of the character at `char_index`, or `text.len()` past the end.
pub(crate) fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index repair from {index} exceeded {steps} steps")]
pub struct IndexRepairExhausted {
    pub index: usize,
    pub steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
    /// Toward whichever end of the surrounding tag run is closer.
    Nearest,
}

/// Markup mask over rich text. `true` marks a character that belongs to a tag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagMap {
    mask: Vec<bool>,
    /// Rich offset of every content character, in order.
    content: Vec<usize>,
}

impl TagMap {
    pub fn build(text: &str) -> Self {
        let tokens = TagGrammar::get().tokenize(text);
        Self::from_tokens(&tokens, text.chars().count())
    }

    pub fn from_tokens(tokens: &[TagToken], len: usize) -> Self {
        let mut mask = vec![false; len];
        for token in tokens {
            let end = token.range.end.min(len);
            for slot in &mut mask[token.range.start.min(end)..end] {
                *slot = true;
            }
        }
        Self::from_mask(mask)
    }

    pub fn from_mask(mask: Vec<bool>) -> Self {
        let content = mask
            .iter()
            .enumerate()
            .filter(|(_, is_tag)| !**is_tag)
            .map(|(index, _)| index)
            .collect();
        Self { mask, content }
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn poor_len(&self) -> usize {
        self.content.len()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_tag(&self, rich_index: usize) -> bool {
        self.mask.get(rich_index).copied().unwrap_or(false)
    }

    /// Keeps the characters of `text` that the mask marks as content.
    pub fn strip(&self, text: &str) -> String {
        text.chars()
            .zip(self.mask.iter())
            .filter(|(_, is_tag)| !**is_tag)
            .map(|(ch, _)| ch)
            .collect()
    }

    /// Number of content characters before `rich_index`.
    pub fn to_poor_index(&self, rich_index: usize) -> usize {
        let rich_index = rich_index.min(self.len());
        self.content.partition_point(|&offset| offset < rich_index)
    }

    /// Rich offset of content character `poor_index`, or the end of the text.
    pub fn to_rich_index(&self, poor_index: usize) -> usize {
        self.content
            .get(poor_index)
            .copied()
            .unwrap_or(self.len())
    }

    /// Rich offset right after content character `poor_index - 1`. Unlike
    /// [`TagMap::to_rich_index`] this stays in front of any tags that precede
    /// content `poor_index`.
    pub fn content_end_before(&self, poor_index: usize) -> usize {
        match poor_index {
            0 => 0,
            _ => self
                .content
                .get(poor_index - 1)
                .map(|offset| offset + 1)
                .unwrap_or(self.len()),
        }
    }

    /// A caret may sit at the end of the text or on a content character.
    pub fn is_content_position(&self, rich_index: usize) -> bool {
        rich_index >= self.len() || !self.mask[rich_index]
    }

    /// Moves `rich_index` off markup. Backward searches fall through to a
    /// forward search when no content precedes the tag run.
    pub fn nearest_content_index(
        &self,
        rich_index: usize,
        direction: Direction,
    ) -> Result<usize, IndexRepairExhausted> {
        let start = rich_index.min(self.len());
        if self.is_content_position(start) {
            return Ok(start);
        }
        match direction {
            Direction::Forward => self.scan_forward(start),
            Direction::Backward => match self.scan_backward(start) {
                Some(index) => Ok(index),
                None => self.scan_forward(start),
            },
            Direction::Nearest => {
                let forward = self.scan_forward(start)?;
                match self.scan_backward(start) {
                    // Distance to the run start versus distance to the run end.
                    Some(back) if start - (back + 1) < forward - start => Ok(back),
                    _ => Ok(forward),
                }
            }
        }
    }

    fn scan_forward(&self, from: usize) -> Result<usize, IndexRepairExhausted> {
        let bound = self.len();
        let mut index = from;
        let mut steps = 0;
        while !self.is_content_position(index) {
            if steps >= bound {
                return Err(IndexRepairExhausted { index: from, steps });
            }
            index += 1;
            steps += 1;
        }
        Ok(index)
    }

    fn scan_backward(&self, from: usize) -> Option<usize> {
        (0..from).rev().find(|&index| !self.mask[index])
    }
}
