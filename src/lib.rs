//! rich-readme: rich-text readme documents with embedded object references.
//!
//! The crate is the document model behind an in-place rich-text note editor.
//! It includes:
//!
//! - **Markup core** - Tag grammar, tag map, rich ↔ poor index translation
//! - **Style engine** - Bold/italic style maps and the toggle rewrite
//! - **Balance checking** - Stack-based tag validation that gates every write
//! - **Object field registry** - Shared id ↔ object table for placeholders
//! - **Document model** - Editing API and JSON snapshot persistence
//!
//! # Quick Start
//!
//! ```rust
//! use rich_readme::{Document, StyleTag};
//!
//! let mut doc: Document<String> = Document::from_rich_text("Hi there");
//! doc.toggle_style(StyleTag::Bold, 0, 2).unwrap();
//!
//! assert_eq!(doc.rich_text(), "<b>Hi</b> there");
//! assert_eq!(doc.poor_text(), "Hi there");
//! ```
//!
//! # Features
//!
//! - `cli` - Builds the `rich-readme` command-line tool (default)

// Configuration structs
pub mod config;

// Markup grammar, tag map, index translation, style marks
pub mod core;

// Document model and snapshot persistence
pub mod doc;

// Object field registry
pub mod registry;

// Re-export config types
pub use config::{DocumentConfig, RegistryConfig};

// Re-export core types
pub use crate::core::{
    Direction, IndexRepairExhausted, TagGrammar, TagKind, TagMap, TagRole, TagToken,
    make_poor_text,
};

// Re-export balance and mark types
pub use crate::core::balance::{BalanceError, check_balance, has_balanced_tags};
pub use crate::core::mark::{
    Coverage, StyleError, StyleMap, StyleSpanEngine, StyleState, StyleTag,
};

// Re-export doc types
pub use doc::{
    AnchorBias, Document, DocumentSnapshot, EditError, ObjectFieldPlaceholder, SnapshotError,
};

// Re-export registry types
pub use registry::{
    AutoSync, IdAllocator, IdCollision, ObjectFieldRegistry, ObjectId, ObjectIdPair, ObjectRef,
    RandomIdAllocator,
};
