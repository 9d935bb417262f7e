//! JSON snapshot persistence.
//!
//! A snapshot is what the host writes on an explicit save:
//!
//! ```json
//! {
//!   "richText": "<b>Hi</b> there",
//!   "textAreaObjectFields": [ { "objectId": 7, "index": 9, "length": 17 } ],
//!   "objectIdPairs": [ { "id": 7, "name": "Main Camera", "objectRef": "..." } ]
//! }
//! ```
//!
//! Placeholder positions are derived data; on load they are recomputed from
//! the rich text.

use super::{Document, ObjectFieldPlaceholder};
use crate::config::DocumentConfig;
use crate::registry::{ObjectIdPair, ObjectRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot<R> {
    pub rich_text: String,
    #[serde(default)]
    pub text_area_object_fields: Vec<ObjectFieldPlaceholder>,
    #[serde(default = "Vec::new")]
    pub object_id_pairs: Vec<ObjectIdPair<R>>,
}

/// Wire form that tolerates a null or absent `richText` so it can be reported.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot<R> {
    rich_text: Option<String>,
    #[serde(default)]
    text_area_object_fields: Vec<ObjectFieldPlaceholder>,
    #[serde(default = "Vec::new")]
    object_id_pairs: Vec<ObjectIdPair<R>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot has no rich text")]
    MissingRichText,
}

impl<R: DeserializeOwned> DocumentSnapshot<R> {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawSnapshot<R> = serde_json::from_str(json)?;
        let rich_text = raw.rich_text.ok_or(SnapshotError::MissingRichText)?;
        Ok(Self {
            rich_text,
            text_area_object_fields: raw.text_area_object_fields,
            object_id_pairs: raw.object_id_pairs,
        })
    }
}

impl<R: Serialize> DocumentSnapshot<R> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<R: ObjectRef> Document<R> {
    pub fn from_snapshot(snapshot: DocumentSnapshot<R>) -> Self {
        Self::from_snapshot_with_config(snapshot, DocumentConfig::default())
    }

    pub fn from_snapshot_with_config(
        snapshot: DocumentSnapshot<R>,
        config: DocumentConfig,
    ) -> Self {
        let mut document = Self::with_config(config);
        document.restore(snapshot);
        document
    }

    /// Current state in persisted form. Only pairs referenced by a
    /// placeholder are written.
    pub fn to_snapshot(&self) -> DocumentSnapshot<R> {
        DocumentSnapshot {
            rich_text: self.rich_text.clone(),
            text_area_object_fields: self.object_fields(),
            object_id_pairs: self.referenced_pairs().cloned().collect(),
        }
    }

    /// Records the current state as the revert point and returns it.
    pub fn save(&mut self) -> DocumentSnapshot<R> {
        let snapshot = self.to_snapshot();
        self.saved = Some(snapshot.clone());
        snapshot
    }

    pub fn saved_snapshot(&self) -> Option<&DocumentSnapshot<R>> {
        self.saved.as_ref()
    }

    /// Restores the last saved or loaded snapshot. Returns `false` when there
    /// is none.
    pub fn revert_to_saved(&mut self) -> bool {
        match self.saved.clone() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole document state with `snapshot`, which also becomes
    /// the revert point. The rich text is accepted as is.
    pub fn restore(&mut self, snapshot: DocumentSnapshot<R>) {
        self.load_rich_text(snapshot.rich_text.clone());
        self.object_id_pairs = snapshot.object_id_pairs.clone();
        if self.object_fields() != snapshot.text_area_object_fields {
            tracing::debug!("stored placeholder positions differ from rich text, using rich text");
        }
        self.saved = Some(snapshot);
    }
}

impl<R: ObjectRef + Serialize> Document<R> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        self.to_snapshot().to_json()
    }
}

impl<R: ObjectRef + DeserializeOwned> Document<R> {
    /// Parses a snapshot. Malformed input never fails the load: it yields an
    /// empty document together with the error.
    pub fn load_json(json: &str) -> (Self, Option<SnapshotError>) {
        match DocumentSnapshot::from_json(json) {
            Ok(snapshot) => (Self::from_snapshot(snapshot), None),
            Err(err) => {
                tracing::warn!(%err, "snapshot could not be loaded, starting empty");
                (Self::new(), Some(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ObjectId;

    #[test]
    fn test_snapshot_field_names() {
        let document = Document::<String>::from_rich_text(r#"x<o="0000007"></o>"#);
        let json = document.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["richText"], r#"x<o="0000007"></o>"#);
        assert_eq!(value["textAreaObjectFields"][0]["objectId"], 7);
        assert_eq!(value["textAreaObjectFields"][0]["index"], 1);
        assert_eq!(value["textAreaObjectFields"][0]["length"], 17);
        assert!(value["objectIdPairs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_pairs_round_trip() {
        let json = r#"{
            "richText": "<o=\"0000003\"></o>",
            "objectIdPairs": [ { "id": 3, "name": "Cube", "objectRef": "Cube" } ]
        }"#;
        let snapshot = DocumentSnapshot::<String>::from_json(json).unwrap();
        assert_eq!(snapshot.object_id_pairs[0].id, ObjectId(3));
        assert_eq!(snapshot.object_id_pairs[0].object.as_deref(), Some("Cube"));
        let document = Document::from_snapshot(snapshot);
        assert_eq!(document.referenced_pairs().count(), 1);
    }

    #[test]
    fn test_null_object_ref() {
        let json = r#"{ "richText": "", "objectIdPairs": [ { "id": 1, "name": "gone", "objectRef": null } ] }"#;
        let snapshot = DocumentSnapshot::<String>::from_json(json).unwrap();
        assert_eq!(snapshot.object_id_pairs[0].object, None);
    }

    #[test]
    fn test_null_rich_text_is_rejected() {
        let err = DocumentSnapshot::<String>::from_json(r#"{ "richText": null }"#).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingRichText));
    }

    #[test]
    fn test_malformed_json_loads_empty_document() {
        let (document, err) = Document::<String>::load_json("{ not json");
        assert!(matches!(err, Some(SnapshotError::Json(_))));
        assert_eq!(document.rich_text(), "");
        assert!(document.is_editable());
    }

    #[test]
    fn test_revert_to_saved() {
        let mut document = Document::<String>::from_rich_text("first");
        assert!(!document.revert_to_saved());
        document.save();
        document.set_rich_text("second").unwrap();
        assert!(document.revert_to_saved());
        assert_eq!(document.rich_text(), "first");
    }
}
