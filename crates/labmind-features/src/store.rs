//! The feature store service.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use labmind_core::{EntityId, GroupId, TimeWindow, ViewId};

use crate::drift::{detect_drift, FeatureDriftConfig, FeatureDriftReport};
use crate::error::{FeatureError, FeatureResult};
use crate::repository::FeatureRepository;
use crate::types::{
    FeatureDefinition, FeatureGroup, FeatureValue, FeatureVector, FeatureView,
};

/// Combined online features for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineFeatures {
    /// The entity the values belong to.
    pub entity_id: EntityId,
    /// Merged feature values, last-write-wins in view group order.
    pub values: HashMap<String, FeatureValue>,
}

/// Historical query result: all vectors in the window plus the de-duplicated
/// schema across the view's groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalFeatures {
    /// Feature definitions across all referenced groups, de-duplicated by
    /// name (first group in view order wins the definition).
    pub definitions: Vec<FeatureDefinition>,
    /// Every vector observed in the window, tagged with its source group.
    pub vectors: Vec<(GroupId, FeatureVector)>,
}

/// Feature store: schema registration, validated ingestion, online and
/// historical retrieval, and feature drift detection.
///
/// All storage access goes through the [`FeatureRepository`] port; this
/// service owns validation and merge semantics only.
pub struct FeatureStore<R: FeatureRepository> {
    repo: Arc<R>,
    drift_config: FeatureDriftConfig,
}

impl<R: FeatureRepository> FeatureStore<R> {
    /// Create a store over a repository with default drift thresholds.
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            drift_config: FeatureDriftConfig::default(),
        }
    }

    /// Override the drift configuration.
    #[must_use]
    pub fn with_drift_config(mut self, config: FeatureDriftConfig) -> Self {
        self.drift_config = config;
        self
    }

    /// Register a named, owned, tagged set of typed feature definitions.
    ///
    /// # Errors
    ///
    /// `DuplicateGroupName` when the name is already registered.
    pub async fn create_feature_group(
        &self,
        name: &str,
        definitions: Vec<FeatureDefinition>,
        owner: &str,
        tags: Vec<String>,
    ) -> FeatureResult<FeatureGroup> {
        if self.repo.group_by_name(name).await.is_some() {
            return Err(FeatureError::DuplicateGroupName(name.to_string()));
        }
        let group = FeatureGroup::new(name, definitions, owner, tags);
        self.repo.insert_group(group.clone()).await?;
        info!(group = %group.name, id = %group.id, "feature group created");
        Ok(group)
    }

    /// Register a view over existing groups. Group order is merge order.
    ///
    /// # Errors
    ///
    /// `UnknownGroupReference` when any referenced group does not exist.
    pub async fn create_feature_view(
        &self,
        name: &str,
        group_ids: Vec<GroupId>,
    ) -> FeatureResult<FeatureView> {
        for id in &group_ids {
            if self.repo.group(*id).await.is_err() {
                return Err(FeatureError::UnknownGroupReference(*id));
            }
        }
        let view = FeatureView::new(name, group_ids);
        self.repo.insert_view(view.clone()).await?;
        info!(view = %view.name, id = %view.id, "feature view created");
        Ok(view)
    }

    /// Ingest a batch of vectors into a group.
    ///
    /// The whole batch is validated against the group schema before anything
    /// is written: one violation anywhere rejects the entire call, never a
    /// partial subset. Values for names absent from the schema are rejected
    /// as well. Returns the number of vectors written.
    ///
    /// # Errors
    ///
    /// `GroupNotFound`, or `SchemaViolation` naming the first offending
    /// entity/feature.
    pub async fn ingest_features(
        &self,
        group_id: GroupId,
        vectors: Vec<FeatureVector>,
    ) -> FeatureResult<usize> {
        let group = self.repo.group(group_id).await?;

        for vector in &vectors {
            for (name, value) in &vector.values {
                let Some(def) = group.definition(name) else {
                    return Err(FeatureError::SchemaViolation {
                        group: group.name.clone(),
                        entity: vector.entity_id.clone(),
                        feature: name.clone(),
                        reason: "feature not declared in group schema".into(),
                    });
                };
                if !value.matches(def.feature_type) {
                    return Err(FeatureError::SchemaViolation {
                        group: group.name.clone(),
                        entity: vector.entity_id.clone(),
                        feature: name.clone(),
                        reason: format!("value does not match declared type {}", def.feature_type),
                    });
                }
            }
        }

        let written = vectors.len();
        self.repo.append_vectors(group_id, vectors).await?;
        debug!(group = %group.name, written, "feature batch ingested");
        Ok(written)
    }

    /// Latest combined features for each entity, through a view.
    ///
    /// Per entity, the most recent vector of each referenced group is merged
    /// field-by-field, last-write-wins in the view's group order. Entities
    /// with no value in any group are omitted from the result.
    pub async fn get_online_features(
        &self,
        view_id: ViewId,
        entity_ids: &[EntityId],
    ) -> FeatureResult<Vec<OnlineFeatures>> {
        let view = self.repo.view(view_id).await?;

        let mut results = Vec::with_capacity(entity_ids.len());
        for entity_id in entity_ids {
            let mut merged: HashMap<String, FeatureValue> = HashMap::new();
            for group_id in &view.group_ids {
                if let Some(vector) = self.repo.latest_for_entity(*group_id, entity_id).await? {
                    for (name, value) in vector.values {
                        merged.insert(name, value);
                    }
                }
            }
            if !merged.is_empty() {
                results.push(OnlineFeatures {
                    entity_id: entity_id.clone(),
                    values: merged,
                });
            }
        }
        Ok(results)
    }

    /// All vectors across a view's groups within a time window.
    ///
    /// Feature definitions are de-duplicated by name across groups; the first
    /// group in view order keeps the definition.
    pub async fn get_historical_features(
        &self,
        view_id: ViewId,
        window: TimeWindow,
    ) -> FeatureResult<HistoricalFeatures> {
        let view = self.repo.view(view_id).await?;

        let mut definitions: Vec<FeatureDefinition> = Vec::new();
        let mut vectors = Vec::new();
        for group_id in &view.group_ids {
            let group = self.repo.group(*group_id).await?;
            for def in group.definitions {
                if !definitions.iter().any(|d| d.name == def.name) {
                    definitions.push(def);
                }
            }
            for vector in self.repo.vectors_in_window(*group_id, window).await? {
                vectors.push((*group_id, vector));
            }
        }
        Ok(HistoricalFeatures {
            definitions,
            vectors,
        })
    }

    /// Detect drift for every feature of a group between two windows.
    ///
    /// Thin windows never fail the call: features without usable values on
    /// either side come back scored 1.0 with `insufficient_data` set.
    pub async fn detect_feature_drift(
        &self,
        group_id: GroupId,
        baseline: TimeWindow,
        comparison: TimeWindow,
    ) -> FeatureResult<FeatureDriftReport> {
        let group = self.repo.group(group_id).await?;
        let base_vectors = self.repo.vectors_in_window(group_id, baseline).await?;
        let cmp_vectors = self.repo.vectors_in_window(group_id, comparison).await?;

        let report = detect_drift(&group, &base_vectors, &cmp_vectors, &self.drift_config);
        if report.has_drift() {
            warn!(
                group = %group.name,
                drifted = ?report.drifted_features(),
                "feature drift detected"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryFeatureRepository;
    use crate::types::FeatureType;
    use chrono::{Duration, Utc};

    fn store() -> FeatureStore<InMemoryFeatureRepository> {
        FeatureStore::new(Arc::new(InMemoryFeatureRepository::new()))
    }

    fn values(pairs: &[(&str, FeatureValue)]) -> HashMap<String, FeatureValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn reactor_group(store: &FeatureStore<InMemoryFeatureRepository>) -> FeatureGroup {
        store
            .create_feature_group(
                "reactor_conditions",
                vec![
                    FeatureDefinition::new("power_density", FeatureType::Numerical),
                    FeatureDefinition::new("anode_material", FeatureType::Categorical),
                ],
                "bioenergy-team",
                vec!["reactor".into()],
            )
            .await
            .expect("group creation")
    }

    #[tokio::test]
    async fn duplicate_group_name_is_rejected() {
        let store = store();
        reactor_group(&store).await;
        let err = store
            .create_feature_group("reactor_conditions", vec![], "other", vec![])
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, FeatureError::DuplicateGroupName(_)));
    }

    #[tokio::test]
    async fn batch_with_one_bad_vector_writes_nothing() {
        let store = store();
        let group = reactor_group(&store).await;

        let good = FeatureVector::now(
            "reactor-1",
            values(&[("power_density", FeatureValue::Number(1.2))]),
        );
        let bad = FeatureVector::now(
            "reactor-2",
            values(&[("power_density", FeatureValue::Text("high".into()))]),
        );

        let err = store
            .ingest_features(group.id, vec![good, bad])
            .await
            .expect_err("schema violation must reject the batch");
        assert!(matches!(err, FeatureError::SchemaViolation { .. }));

        // Nothing from the batch may be visible afterwards.
        let window = TimeWindow::last_minutes(10);
        let report = store
            .detect_feature_drift(group.id, window, window)
            .await
            .expect("drift call");
        assert!(report.features.iter().all(|f| f.insufficient_data));
    }

    #[tokio::test]
    async fn undeclared_feature_rejects_batch() {
        let store = store();
        let group = reactor_group(&store).await;
        let vector = FeatureVector::now(
            "reactor-1",
            values(&[("ph_level", FeatureValue::Number(6.8))]),
        );
        let err = store
            .ingest_features(group.id, vec![vector])
            .await
            .expect_err("undeclared feature must fail");
        assert!(matches!(err, FeatureError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn null_is_always_accepted() {
        let store = store();
        let group = reactor_group(&store).await;
        let vector = FeatureVector::now(
            "reactor-1",
            values(&[
                ("power_density", FeatureValue::Null),
                ("anode_material", FeatureValue::Null),
            ]),
        );
        let written = store
            .ingest_features(group.id, vec![vector])
            .await
            .expect("nulls are schema-valid");
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn online_features_merge_last_write_wins_in_group_order() {
        let store = store();
        let group_a = store
            .create_feature_group(
                "base_conditions",
                vec![
                    FeatureDefinition::new("temperature", FeatureType::Numerical),
                    FeatureDefinition::new("ph_level", FeatureType::Numerical),
                ],
                "lab",
                vec![],
            )
            .await
            .expect("group a");
        let group_b = store
            .create_feature_group(
                "override_conditions",
                vec![FeatureDefinition::new("temperature", FeatureType::Numerical)],
                "lab",
                vec![],
            )
            .await
            .expect("group b");

        store
            .ingest_features(
                group_a.id,
                vec![FeatureVector::now(
                    "reactor-1",
                    values(&[
                        ("temperature", FeatureValue::Number(25.0)),
                        ("ph_level", FeatureValue::Number(7.0)),
                    ]),
                )],
            )
            .await
            .expect("ingest a");
        store
            .ingest_features(
                group_b.id,
                vec![FeatureVector::now(
                    "reactor-1",
                    values(&[("temperature", FeatureValue::Number(30.0))]),
                )],
            )
            .await
            .expect("ingest b");

        let view = store
            .create_feature_view("reactor_view", vec![group_a.id, group_b.id])
            .await
            .expect("view");

        let online = store
            .get_online_features(view.id, &["reactor-1".to_string(), "reactor-9".to_string()])
            .await
            .expect("online");

        // reactor-9 has no values anywhere and is omitted.
        assert_eq!(online.len(), 1);
        let features = &online[0];
        assert_eq!(features.entity_id, "reactor-1");
        // group_b is later in view order, so its temperature wins.
        assert_eq!(
            features.values.get("temperature"),
            Some(&FeatureValue::Number(30.0))
        );
        assert_eq!(
            features.values.get("ph_level"),
            Some(&FeatureValue::Number(7.0))
        );
    }

    #[tokio::test]
    async fn online_uses_most_recent_vector_per_group() {
        let store = store();
        let group = reactor_group(&store).await;

        let old = FeatureVector {
            entity_id: "reactor-1".into(),
            values: values(&[("power_density", FeatureValue::Number(1.0))]),
            timestamp: Utc::now() - Duration::hours(2),
        };
        let newer = FeatureVector {
            entity_id: "reactor-1".into(),
            values: values(&[("power_density", FeatureValue::Number(2.0))]),
            timestamp: Utc::now(),
        };
        store
            .ingest_features(group.id, vec![newer.clone(), old])
            .await
            .expect("ingest");

        let view = store
            .create_feature_view("v", vec![group.id])
            .await
            .expect("view");
        let online = store
            .get_online_features(view.id, &["reactor-1".to_string()])
            .await
            .expect("online");
        assert_eq!(
            online[0].values.get("power_density"),
            Some(&FeatureValue::Number(2.0))
        );
    }

    #[tokio::test]
    async fn historical_features_dedupe_definitions_by_name() {
        let store = store();
        let group_a = store
            .create_feature_group(
                "a",
                vec![FeatureDefinition::new("temperature", FeatureType::Numerical)],
                "lab",
                vec![],
            )
            .await
            .expect("a");
        let group_b = store
            .create_feature_group(
                "b",
                vec![
                    FeatureDefinition::new("temperature", FeatureType::Numerical),
                    FeatureDefinition::new("ph_level", FeatureType::Numerical),
                ],
                "lab",
                vec![],
            )
            .await
            .expect("b");
        let view = store
            .create_feature_view("v", vec![group_a.id, group_b.id])
            .await
            .expect("view");

        store
            .ingest_features(
                group_a.id,
                vec![FeatureVector::now(
                    "reactor-1",
                    values(&[("temperature", FeatureValue::Number(25.0))]),
                )],
            )
            .await
            .expect("ingest");

        let history = store
            .get_historical_features(view.id, TimeWindow::last_minutes(10))
            .await
            .expect("history");

        let names: Vec<&str> = history.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "ph_level"]);
        assert_eq!(history.vectors.len(), 1);
    }

    #[tokio::test]
    async fn unknown_view_reports_not_found() {
        let store = store();
        let err = store
            .get_online_features(uuid::Uuid::new_v4(), &["reactor-1".to_string()])
            .await
            .expect_err("unknown view");
        assert!(matches!(err, FeatureError::ViewNotFound(_)));
    }
}
