//! Configuration for documents and the object field registry.

use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Reject edits that leave the rich text with unbalanced tags.
    pub enforce_tag_balance: bool,
    /// Split regenerated style runs wherever another tag opens or closes
    /// inside them, so the result always nests.
    pub split_at_foreign_tags: bool,
}

impl DocumentConfig {
    pub fn strict() -> Self {
        Self {
            enforce_tag_balance: true,
            split_at_foreign_tags: true,
        }
    }

    pub fn lenient() -> Self {
        Self {
            enforce_tag_balance: false,
            split_at_foreign_tags: true,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Ids handed out by allocation. Seven digits fit the placeholder width.
    pub id_range: RangeInclusive<i32>,
    /// Random draws before falling back to the lowest free id.
    pub max_allocation_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_range: 1..=9_999_999,
            max_allocation_attempts: 64,
        }
    }
}
