//! Feature store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use labmind_core::{EntityId, GroupId, ViewId};

/// Declared type of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Numeric measurement (power density, pH, temperature).
    Numerical,
    /// String-valued category (electrode material, organism strain).
    Categorical,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numerical => write!(f, "numerical"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// A single feature value. `Null` is always schema-valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Numeric value for a numerical feature.
    Number(f64),
    /// String value for a categorical feature.
    Text(String),
    /// Missing measurement; permitted for any feature type.
    Null,
}

impl FeatureValue {
    /// Whether this value satisfies the declared feature type.
    pub fn matches(&self, feature_type: FeatureType) -> bool {
        match (self, feature_type) {
            (Self::Null, _) => true,
            (Self::Number(_), FeatureType::Numerical) => true,
            (Self::Text(_), FeatureType::Categorical) => true,
            _ => false,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value, if it is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Schema entry for one feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    /// Column name, unique within its group.
    pub name: String,
    /// Declared type enforced at ingestion.
    pub feature_type: FeatureType,
    /// Optional human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FeatureDefinition {
    /// Create a definition without a description.
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            feature_type,
            description: None,
        }
    }
}

/// A named, owned, tagged set of typed feature definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureGroup {
    /// Unique group id.
    pub id: GroupId,
    /// Group name, unique across the store.
    pub name: String,
    /// Typed column schema.
    pub definitions: Vec<FeatureDefinition>,
    /// Owning team or person.
    pub owner: String,
    /// Free-form tags for discovery.
    pub tags: Vec<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl FeatureGroup {
    /// Create a group with a fresh id.
    pub fn new(
        name: impl Into<String>,
        definitions: Vec<FeatureDefinition>,
        owner: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            definitions,
            owner: owner.into(),
            tags,
            created_at: Utc::now(),
        }
    }

    /// Look up a column definition by name.
    pub fn definition(&self, name: &str) -> Option<&FeatureDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

/// One observation: an entity's feature values at a point in time.
///
/// Vectors are append-only; a later observation for the same entity never
/// overwrites an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// The observed entity (reactor, electrode batch, strain).
    pub entity_id: EntityId,
    /// Feature name -> value.
    pub values: HashMap<String, FeatureValue>,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
}

impl FeatureVector {
    /// Create a vector observed now.
    pub fn now(entity_id: impl Into<EntityId>, values: HashMap<String, FeatureValue>) -> Self {
        Self {
            entity_id: entity_id.into(),
            values,
            timestamp: Utc::now(),
        }
    }
}

/// An ordered selection of feature groups served together.
///
/// Group order matters: online retrieval merges per-field values
/// last-write-wins in group-list order, so later groups override earlier
/// ones on name collisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureView {
    /// Unique view id.
    pub id: ViewId,
    /// View name.
    pub name: String,
    /// Referenced groups, in merge order.
    pub group_ids: Vec<GroupId>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl FeatureView {
    /// Create a view with a fresh id.
    pub fn new(name: impl Into<String>, group_ids: Vec<GroupId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            group_ids,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_matches_every_type() {
        assert!(FeatureValue::Null.matches(FeatureType::Numerical));
        assert!(FeatureValue::Null.matches(FeatureType::Categorical));
    }

    #[test]
    fn numbers_do_not_match_categorical() {
        assert!(!FeatureValue::Number(1.5).matches(FeatureType::Categorical));
        assert!(!FeatureValue::Text("carbon_felt".into()).matches(FeatureType::Numerical));
    }

    #[test]
    fn feature_value_serializes_untagged() {
        let json = serde_json::to_string(&FeatureValue::Number(2.5)).unwrap();
        assert_eq!(json, "2.5");
        let json = serde_json::to_string(&FeatureValue::Text("anode".into())).unwrap();
        assert_eq!(json, r#""anode""#);
    }
}
