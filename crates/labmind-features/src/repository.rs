//! Storage port for the feature store, plus the in-memory adapter.
//!
//! The port isolates storage so a database can replace the in-memory maps
//! without touching retrieval or drift logic.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use labmind_core::{EntityId, GroupId, TimeWindow, ViewId};

use crate::error::{FeatureError, FeatureResult};
use crate::types::{FeatureGroup, FeatureVector, FeatureView};

/// Storage port for feature groups, views, and append-only vectors.
#[async_trait]
pub trait FeatureRepository: Send + Sync {
    /// Persist a new feature group.
    async fn insert_group(&self, group: FeatureGroup) -> FeatureResult<()>;

    /// Fetch a group by id.
    async fn group(&self, id: GroupId) -> FeatureResult<FeatureGroup>;

    /// Fetch a group by name, if registered.
    async fn group_by_name(&self, name: &str) -> Option<FeatureGroup>;

    /// Persist a new feature view.
    async fn insert_view(&self, view: FeatureView) -> FeatureResult<()>;

    /// Fetch a view by id.
    async fn view(&self, id: ViewId) -> FeatureResult<FeatureView>;

    /// Append a validated batch of vectors to a group.
    ///
    /// Callers validate before appending; the repository itself never splits
    /// a batch.
    async fn append_vectors(
        &self,
        group_id: GroupId,
        vectors: Vec<FeatureVector>,
    ) -> FeatureResult<()>;

    /// All vectors of a group observed within the window.
    async fn vectors_in_window(
        &self,
        group_id: GroupId,
        window: TimeWindow,
    ) -> FeatureResult<Vec<FeatureVector>>;

    /// Most recent vector of a group for one entity.
    async fn latest_for_entity(
        &self,
        group_id: GroupId,
        entity_id: &EntityId,
    ) -> FeatureResult<Option<FeatureVector>>;
}

/// In-memory [`FeatureRepository`].
///
/// Backs the store with a `DashMap` per entity kind and a locked append-only
/// vector log per group. Scans are O(n) over a group's log, which is fine at
/// test and single-tenant scale; swap in an indexed adapter behind the same
/// port when that stops being true.
#[derive(Debug, Default)]
pub struct InMemoryFeatureRepository {
    groups: DashMap<GroupId, FeatureGroup>,
    views: DashMap<ViewId, FeatureView>,
    /// Append-only observation log per group.
    vectors: DashMap<GroupId, RwLock<Vec<FeatureVector>>>,
}

impl InMemoryFeatureRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeatureRepository for InMemoryFeatureRepository {
    async fn insert_group(&self, group: FeatureGroup) -> FeatureResult<()> {
        debug!(group = %group.name, id = %group.id, "registering feature group");
        self.vectors.entry(group.id).or_default();
        self.groups.insert(group.id, group);
        Ok(())
    }

    async fn group(&self, id: GroupId) -> FeatureResult<FeatureGroup> {
        self.groups
            .get(&id)
            .map(|g| g.value().clone())
            .ok_or(FeatureError::GroupNotFound(id))
    }

    async fn group_by_name(&self, name: &str) -> Option<FeatureGroup> {
        self.groups
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value().clone())
    }

    async fn insert_view(&self, view: FeatureView) -> FeatureResult<()> {
        debug!(view = %view.name, id = %view.id, groups = view.group_ids.len(), "registering feature view");
        self.views.insert(view.id, view);
        Ok(())
    }

    async fn view(&self, id: ViewId) -> FeatureResult<FeatureView> {
        self.views
            .get(&id)
            .map(|v| v.value().clone())
            .ok_or(FeatureError::ViewNotFound(id))
    }

    async fn append_vectors(
        &self,
        group_id: GroupId,
        mut vectors: Vec<FeatureVector>,
    ) -> FeatureResult<()> {
        if !self.groups.contains_key(&group_id) {
            return Err(FeatureError::GroupNotFound(group_id));
        }
        let log = self.vectors.entry(group_id).or_default();
        log.write().append(&mut vectors);
        Ok(())
    }

    async fn vectors_in_window(
        &self,
        group_id: GroupId,
        window: TimeWindow,
    ) -> FeatureResult<Vec<FeatureVector>> {
        if !self.groups.contains_key(&group_id) {
            return Err(FeatureError::GroupNotFound(group_id));
        }
        Ok(self
            .vectors
            .get(&group_id)
            .map(|log| {
                log.read()
                    .iter()
                    .filter(|v| window.contains(v.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_for_entity(
        &self,
        group_id: GroupId,
        entity_id: &EntityId,
    ) -> FeatureResult<Option<FeatureVector>> {
        if !self.groups.contains_key(&group_id) {
            return Err(FeatureError::GroupNotFound(group_id));
        }
        Ok(self.vectors.get(&group_id).and_then(|log| {
            log.read()
                .iter()
                .filter(|v| &v.entity_id == entity_id)
                .max_by_key(|v| v.timestamp)
                .cloned()
        }))
    }
}
