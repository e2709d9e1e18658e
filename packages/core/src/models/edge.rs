//! Edge Data Structures
//!
//! Directed, typed relationships between two nodes of the same owner.
//! Hierarchy is expressed as `BelongsTo` edges (child → parent) carrying a
//! `sort_order`; there is no separate parent pointer on [`Node`](super::Node).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::node::{deserialize_optional_field, ValidationError, MAX_RELATIONSHIP_STRENGTH};

/// Upper bound on edge weight; path weights are sums of these
pub const MAX_EDGE_WEIGHT: i64 = u32::MAX as i64;

/// Relationship type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Person → Goal/Project: this person can help
    Supports,
    /// Person ↔ Person acquaintance
    Knows,
    /// Structural child → parent (Goal → Vision, Project → Goal)
    BelongsTo,
    Mentors,
    RelatedTo,
}

impl EdgeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            EdgeType::Supports => "supports",
            EdgeType::Knows => "knows",
            EdgeType::BelongsTo => "belongs_to",
            EdgeType::Mentors => "mentors",
            EdgeType::RelatedTo => "related_to",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supports" => Ok(EdgeType::Supports),
            "knows" => Ok(EdgeType::Knows),
            "belongs_to" => Ok(EdgeType::BelongsTo),
            "mentors" => Ok(EdgeType::Mentors),
            "related_to" => Ok(EdgeType::RelatedTo),
            other => Err(ValidationError::InvalidEdgeType(other.to_string())),
        }
    }
}

/// One directed relationship.
///
/// `weight` is the general strength used as traversal weight by the path
/// finder; `relationship_strength` (0-5) is the person-specific nuance shown
/// to users. They are deliberately separate fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,

    pub owner_id: String,

    pub source_id: String,

    pub target_id: String,

    pub edge_type: EdgeType,

    #[serde(default = "default_weight")]
    pub weight: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// `false` for edges inferred by the system
    #[serde(default = "default_added_by_user")]
    pub added_by_user: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,

    pub created_at: DateTime<Utc>,
}

fn default_weight() -> i64 {
    1
}

fn default_added_by_user() -> bool {
    true
}

impl Edge {
    pub fn new(
        owner_id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight: default_weight(),
            relationship_strength: None,
            relevance_score: None,
            last_interaction_date: None,
            notes: None,
            added_by_user: true,
            sort_order: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_relationship_strength(mut self, strength: u8) -> Self {
        self.relationship_strength = Some(strength);
        self
    }

    pub fn with_relevance_score(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    pub fn with_last_interaction(mut self, at: DateTime<Utc>) -> Self {
        self.last_interaction_date = Some(at);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn inferred(mut self) -> Self {
        self.added_by_user = false;
        self
    }

    /// Whether `node_id` is either endpoint
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    /// The endpoint opposite `node_id`, if `node_id` is on this edge
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source_id == node_id {
            Some(&self.target_id)
        } else if self.target_id == node_id {
            Some(&self.source_id)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }
        if self.owner_id.is_empty() {
            return Err(ValidationError::MissingField("owner_id".to_string()));
        }
        if self.source_id.is_empty() {
            return Err(ValidationError::MissingField("source_id".to_string()));
        }
        if self.target_id.is_empty() {
            return Err(ValidationError::MissingField("target_id".to_string()));
        }
        if self.source_id == self.target_id {
            return Err(ValidationError::SelfLoop(self.source_id.clone()));
        }
        if !(0..=MAX_EDGE_WEIGHT).contains(&self.weight) {
            return Err(ValidationError::OutOfRange {
                field: "weight".to_string(),
                value: self.weight,
                max: MAX_EDGE_WEIGHT,
            });
        }
        validate_strength(self.relationship_strength)?;
        if let Some(score) = self.relevance_score {
            if !score.is_finite() {
                return Err(ValidationError::InvalidValue {
                    field: "relevance_score".to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
        }
        if let Some(order) = self.sort_order {
            if order < 0 {
                return Err(ValidationError::InvalidValue {
                    field: "sort_order".to_string(),
                    reason: format!("must not be negative, got {}", order),
                });
            }
        }
        Ok(())
    }
}

fn validate_strength(strength: Option<u8>) -> Result<(), ValidationError> {
    match strength {
        Some(value) if value > MAX_RELATIONSHIP_STRENGTH => Err(ValidationError::OutOfRange {
            field: "relationship_strength".to_string(),
            value: i64::from(value),
            max: i64::from(MAX_RELATIONSHIP_STRENGTH),
        }),
        _ => Ok(()),
    }
}

/// Input for edge creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_added_by_user")]
    pub added_by_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl NewEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight: None,
            relationship_strength: None,
            relevance_score: None,
            last_interaction_date: None,
            notes: None,
            added_by_user: true,
            sort_order: None,
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_relationship_strength(mut self, strength: u8) -> Self {
        self.relationship_strength = Some(strength);
        self
    }

    pub fn with_relevance_score(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    pub fn with_last_interaction(mut self, at: DateTime<Utc>) -> Self {
        self.last_interaction_date = Some(at);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Materialize the edge for `owner_id`
    ///
    /// Weight defaults to the relationship strength when only that is given,
    /// otherwise to 1.
    pub fn into_edge(self, owner_id: impl Into<String>) -> Edge {
        let weight = self
            .weight
            .or_else(|| self.relationship_strength.map(i64::from))
            .unwrap_or_else(default_weight);

        let mut edge = Edge::new(owner_id, self.source_id, self.target_id, self.edge_type);
        edge.weight = weight;
        edge.relationship_strength = self.relationship_strength;
        edge.relevance_score = self.relevance_score;
        edge.last_interaction_date = self.last_interaction_date;
        edge.notes = self.notes;
        edge.added_by_user = self.added_by_user;
        edge.sort_order = self.sort_order;
        edge
    }
}

/// Sparse edge update; endpoints and type are immutable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub relationship_strength: Option<Option<u8>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub relevance_score: Option<Option<f64>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub last_interaction_date: Option<Option<DateTime<Utc>>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub notes: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub sort_order: Option<Option<i64>>,
}

impl EdgeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_relationship_strength(mut self, strength: Option<u8>) -> Self {
        self.relationship_strength = Some(strength);
        self
    }

    pub fn with_relevance_score(mut self, score: Option<f64>) -> Self {
        self.relevance_score = Some(score);
        self
    }

    pub fn with_last_interaction(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_interaction_date = Some(at);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn with_sort_order(mut self, sort_order: Option<i64>) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_none()
            && self.relationship_strength.is_none()
            && self.relevance_score.is_none()
            && self.last_interaction_date.is_none()
            && self.notes.is_none()
            && self.sort_order.is_none()
    }

    pub fn apply_to(self, edge: &mut Edge) {
        if let Some(weight) = self.weight {
            edge.weight = weight;
        }
        if let Some(strength) = self.relationship_strength {
            edge.relationship_strength = strength;
        }
        if let Some(score) = self.relevance_score {
            edge.relevance_score = score;
        }
        if let Some(at) = self.last_interaction_date {
            edge.last_interaction_date = at;
        }
        if let Some(notes) = self.notes {
            edge.notes = notes;
        }
        if let Some(order) = self.sort_order {
            edge.sort_order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edge_type_wire_names() {
        assert_eq!(
            serde_json::to_value(EdgeType::BelongsTo).unwrap(),
            json!("belongs_to")
        );
        assert_eq!("related_to".parse::<EdgeType>().unwrap(), EdgeType::RelatedTo);
        assert!("follows".parse::<EdgeType>().is_err());
    }

    #[test]
    fn test_self_loop_rejected() {
        let edge = Edge::new("owner-1", "n1", "n1", EdgeType::Knows);
        assert_eq!(
            edge.validate(),
            Err(ValidationError::SelfLoop("n1".to_string()))
        );
    }

    #[test]
    fn test_strength_out_of_range_rejected() {
        let edge = Edge::new("owner-1", "a", "b", EdgeType::Supports).with_relationship_strength(9);
        assert!(matches!(
            edge.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let negative = Edge::new("owner-1", "a", "b", EdgeType::Knows).with_weight(-1);
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::OutOfRange { value: -1, .. })
        ));

        let huge = Edge::new("owner-1", "a", "b", EdgeType::Knows).with_weight(i64::MAX);
        assert!(matches!(
            huge.validate(),
            Err(ValidationError::OutOfRange { max: MAX_EDGE_WEIGHT, .. })
        ));

        let heaviest = Edge::new("owner-1", "a", "b", EdgeType::Knows).with_weight(MAX_EDGE_WEIGHT);
        assert!(heaviest.validate().is_ok());
    }

    #[test]
    fn test_new_edge_weight_falls_back_to_strength() {
        let edge = NewEdge::new("p", "g", EdgeType::Supports)
            .with_relationship_strength(4)
            .into_edge("owner-1");
        assert_eq!(edge.weight, 4);

        let edge = NewEdge::new("p", "g", EdgeType::Supports).into_edge("owner-1");
        assert_eq!(edge.weight, 1);

        let edge = NewEdge::new("p", "g", EdgeType::Supports)
            .with_weight(7)
            .with_relationship_strength(2)
            .into_edge("owner-1");
        assert_eq!(edge.weight, 7);
    }

    #[test]
    fn test_other_end() {
        let edge = Edge::new("owner-1", "a", "b", EdgeType::Knows);
        assert_eq!(edge.other_end("a"), Some("b"));
        assert_eq!(edge.other_end("b"), Some("a"));
        assert_eq!(edge.other_end("c"), None);
        assert!(edge.touches("b"));
    }

    #[test]
    fn test_edge_update_clears_and_sets() {
        let mut edge = Edge::new("owner-1", "a", "b", EdgeType::Supports)
            .with_notes("intro via Sam")
            .with_relationship_strength(2);

        let update: EdgeUpdate =
            serde_json::from_value(json!({"notes": null, "relationshipStrength": 4})).unwrap();
        update.apply_to(&mut edge);

        assert_eq!(edge.notes, None);
        assert_eq!(edge.relationship_strength, Some(4));
        assert_eq!(edge.weight, 1);
    }
}
