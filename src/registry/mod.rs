//! Object field registry.
//!
//! Maps the small integer ids embedded in object placeholders to host objects
//! and back. One registry is shared by every open document of a session so the
//! same object always gets the same id. The registry is an ordinary value: the
//! host constructs it and passes it by `&mut` to the document operations that
//! need it. A multi-threaded host wraps it in a `Mutex` for the duration of each
//! compound call.

use crate::config::RegistryConfig;
use crate::doc::Document;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// A host object that placeholders can point at.
pub trait ObjectRef: Clone + Eq + Hash + fmt::Debug {
    fn display_name(&self) -> String;
}

impl ObjectRef for String {
    fn display_name(&self) -> String {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i32);

impl ObjectId {
    /// Digits in the placeholder form. A minus sign is not counted.
    pub const WIDTH: usize = 7;

    pub fn parse(digits: &str) -> Option<Self> {
        digits.parse().ok().map(ObjectId)
    }

    /// The `<o="0000042"></o>` placeholder for this id.
    pub fn placeholder(self) -> String {
        format!("<o=\"{self}\"></o>")
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-{:0width$}", self.0.unsigned_abs(), width = Self::WIDTH)
        } else {
            write!(f, "{:0width$}", self.0, width = Self::WIDTH)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdPair<R> {
    pub id: ObjectId,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(rename = "objectRef")]
    pub object: Option<R>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdCollision {
    #[error("object id {id} is already registered to a different object")]
    IdTaken { id: ObjectId },
    #[error("object is already registered under id {existing}, rejected id {rejected}")]
    ObjectRegistered {
        existing: ObjectId,
        rejected: ObjectId,
    },
}

/// Source of candidate ids. Candidates may collide; the registry retries.
pub trait IdAllocator: fmt::Debug {
    fn next_candidate(&mut self, range: &RangeInclusive<i32>) -> ObjectId;
}

/// Draws candidates uniformly from the range using UUIDv4 randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdAllocator;

impl IdAllocator for RandomIdAllocator {
    fn next_candidate(&mut self, range: &RangeInclusive<i32>) -> ObjectId {
        let start = i64::from(*range.start());
        let span = (i64::from(*range.end()) - start + 1).max(1) as u64;
        let (random, _) = Uuid::new_v4().as_u64_pair();
        ObjectId((start + (random % span) as i64) as i32)
    }
}

/// Whether a failed lookup may resync and rebuild the registry.
#[derive(Debug)]
pub enum AutoSync<'a, R> {
    Disabled,
    /// Rebuild from the placeholders of these open documents.
    Enabled(&'a [&'a Document<R>]),
}

impl<R> Clone for AutoSync<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for AutoSync<'_, R> {}

#[derive(Debug)]
pub struct ObjectFieldRegistry<R> {
    pairs: Vec<ObjectIdPair<R>>,
    objects_by_id: HashMap<ObjectId, Option<R>>,
    ids_by_object: HashMap<R, ObjectId>,
    missing: BTreeSet<ObjectId>,
    allocator: Box<dyn IdAllocator>,
    config: RegistryConfig,
}

impl<R: ObjectRef> ObjectFieldRegistry<R> {
    pub fn new() -> Self {
        Self::with_allocator(Box::new(RandomIdAllocator), RegistryConfig::default())
    }

    pub fn with_allocator(allocator: Box<dyn IdAllocator>, config: RegistryConfig) -> Self {
        Self {
            pairs: Vec::new(),
            objects_by_id: HashMap::new(),
            ids_by_object: HashMap::new(),
            missing: BTreeSet::new(),
            allocator,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn pairs(&self) -> &[ObjectIdPair<R>] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_id(&self, id: ObjectId) -> bool {
        self.objects_by_id.contains_key(&id)
    }

    pub fn is_missing(&self, id: ObjectId) -> bool {
        self.missing.contains(&id)
    }

    /// Returns the id registered for `object`, allocating and registering a
    /// fresh one on first use.
    pub fn get_id_from_object(&mut self, object: &R) -> ObjectId {
        if let Some(id) = self.ids_by_object.get(object) {
            return *id;
        }
        let id = self.allocate_id();
        self.insert_pair(ObjectIdPair {
            id,
            display_name: object.display_name(),
            object: Some(object.clone()),
        });
        id
    }

    /// Picks an id that no registered pair uses. Does not register it.
    pub fn allocate_id(&mut self) -> ObjectId {
        for _ in 0..self.config.max_allocation_attempts {
            let candidate = self.allocator.next_candidate(&self.config.id_range);
            if !self.objects_by_id.contains_key(&candidate) {
                return candidate;
            }
            tracing::debug!(%candidate, "object id collision, drawing again");
        }
        self.lowest_free_id()
    }

    fn lowest_free_id(&self) -> ObjectId {
        self.config
            .id_range
            .clone()
            .map(ObjectId)
            .find(|id| !self.objects_by_id.contains_key(id))
            .unwrap_or_else(|| {
                let highest = self.objects_by_id.keys().map(|id| id.0).max().unwrap_or(0);
                ObjectId(highest.saturating_add(1))
            })
    }

    /// Looks up the object behind `id`. With [`AutoSync::Enabled`] a miss
    /// first resyncs the lookup tables from the pair list, then rebuilds the
    /// pair list from the given documents. An id that still fails is flagged
    /// missing and skips that work on later lookups until it is registered
    /// again or the registry is cleared.
    pub fn get_object_from_id(&mut self, id: ObjectId, auto_sync: AutoSync<'_, R>) -> Option<R> {
        if let Some(object) = self.objects_by_id.get(&id) {
            let object = object.clone();
            self.missing.remove(&id);
            return object;
        }
        let AutoSync::Enabled(documents) = auto_sync else {
            return None;
        };
        if self.missing.contains(&id) {
            return None;
        }

        self.resync();
        if let Some(object) = self.objects_by_id.get(&id) {
            return object.clone();
        }

        self.rebuild(documents.iter().copied());
        if let Some(object) = self.objects_by_id.get(&id) {
            return object.clone();
        }

        self.missing.insert(id);
        tracing::warn!(%id, "object field id could not be resolved");
        None
    }

    /// Registers a pair. Re-adding an identical pair is a no-op. A pair whose
    /// id or object is already taken by a different mapping is rejected and
    /// the existing mapping is kept.
    pub fn add_object_id_pair(
        &mut self,
        object: Option<R>,
        id: ObjectId,
        display_name: impl Into<String>,
    ) -> Result<(), IdCollision> {
        if let Some(existing) = self.objects_by_id.get(&id) {
            if *existing == object {
                return Ok(());
            }
            tracing::warn!(%id, "object id already registered to a different object");
            return Err(IdCollision::IdTaken { id });
        }
        if let Some(existing) = object
            .as_ref()
            .and_then(|object| self.ids_by_object.get(object))
        {
            tracing::warn!(%existing, rejected = %id, "object already registered under another id");
            return Err(IdCollision::ObjectRegistered {
                existing: *existing,
                rejected: id,
            });
        }
        self.insert_pair(ObjectIdPair {
            id,
            display_name: display_name.into(),
            object,
        });
        Ok(())
    }

    fn insert_pair(&mut self, pair: ObjectIdPair<R>) {
        if let Some(object) = &pair.object {
            self.ids_by_object.insert(object.clone(), pair.id);
        }
        self.objects_by_id.insert(pair.id, pair.object.clone());
        self.missing.remove(&pair.id);
        self.pairs.push(pair);
    }

    /// Rebuilds both lookup tables from the pair list. Earlier pairs win.
    pub fn resync(&mut self) {
        self.objects_by_id.clear();
        self.ids_by_object.clear();
        for pair in &self.pairs {
            if self.objects_by_id.contains_key(&pair.id) {
                continue;
            }
            if let Some(object) = &pair.object {
                if self.ids_by_object.contains_key(object) {
                    continue;
                }
                self.ids_by_object.insert(object.clone(), pair.id);
            }
            self.objects_by_id.insert(pair.id, pair.object.clone());
        }
        tracing::debug!(pairs = self.pairs.len(), "object field registry resynced");
    }

    /// Clears the registry and re-registers the pairs referenced by the
    /// placeholders of `documents`. Returns the collisions found on the way.
    pub fn rebuild<'d, I>(&mut self, documents: I) -> Vec<IdCollision>
    where
        I: IntoIterator<Item = &'d Document<R>>,
        R: 'd,
    {
        self.clear();
        let mut collisions = Vec::new();
        for document in documents {
            for pair in document.referenced_pairs() {
                if let Err(collision) =
                    self.add_object_id_pair(pair.object.clone(), pair.id, pair.display_name.clone())
                {
                    collisions.push(collision);
                }
            }
        }
        tracing::debug!(pairs = self.pairs.len(), "object field registry rebuilt");
        collisions
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
        self.objects_by_id.clear();
        self.ids_by_object.clear();
        self.missing.clear();
    }
}

impl<R: ObjectRef> Default for ObjectFieldRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
