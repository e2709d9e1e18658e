//! Node Data Structures
//!
//! This module defines the `Node` struct and related types for the Compass
//! relationship graph.
//!
//! # Architecture
//!
//! - **Typed vertices**: every node is a Vision, Goal, Project or Person
//! - **Type-conditional attributes**: carried by [`NodeDetails`], so the type
//!   and its attributes can never disagree
//! - **Property bag**: open-ended user data in an ordered [`PropertyMap`]
//! - **Lazy embedding**: `embedding` stays `None` until first computed
//!
//! # Examples
//!
//! ```rust
//! use compass_core::models::{Node, NodeType};
//!
//! let goal = Node::goal("user-1", "Raise a seed round");
//! assert_eq!(goal.node_type(), NodeType::Goal);
//!
//! let person = Node::person("user-1", "Ada").with_sector("Finance");
//! assert_eq!(person.sector(), Some("Finance"));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::property::PropertyMap;

/// Upper bound of the person relationship-strength scale (0-5)
pub const MAX_RELATIONSHIP_STRENGTH: u8 = 5;

/// Validation errors for node and edge records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Invalid edge type: {0}")]
    InvalidEdgeType(String),

    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        max: i64,
    },

    #[error("Self-loop edges are not allowed: {0}")]
    SelfLoop(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Vertex type in a user's relationship graph
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Vision,
    Goal,
    Project,
    Person,
}

impl NodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Vision => "vision",
            NodeType::Goal => "goal",
            NodeType::Project => "project",
            NodeType::Person => "person",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vision" => Ok(NodeType::Vision),
            "goal" => Ok(NodeType::Goal),
            "project" => Ok(NodeType::Project),
            "person" => Ok(NodeType::Person),
            other => Err(ValidationError::InvalidNodeType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

/// Person-only attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// 0-5, how close the user feels to this person
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// Goal-only attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<GoalPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Project-only attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Node type together with its type-conditional attributes
///
/// Serialized internally tagged: `{"type": "person", "sector": "Finance"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDetails {
    Vision,
    Goal(GoalDetails),
    Project(ProjectDetails),
    Person(PersonDetails),
}

impl NodeDetails {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeDetails::Vision => NodeType::Vision,
            NodeDetails::Goal(_) => NodeType::Goal,
            NodeDetails::Project(_) => NodeType::Project,
            NodeDetails::Person(_) => NodeType::Person,
        }
    }

    /// Empty attribute set for a given type
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Vision => NodeDetails::Vision,
            NodeType::Goal => NodeDetails::Goal(GoalDetails::default()),
            NodeType::Project => NodeDetails::Project(ProjectDetails::default()),
            NodeType::Person => NodeDetails::Person(PersonDetails::default()),
        }
    }
}

/// One vertex of a user's relationship graph.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4 unless supplied)
/// - `owner_id`: The user this node belongs to; every traversal is scoped by it
/// - `name`: Display name, never blank
/// - `description` / `notes`: Free text, also the source of embedding text
/// - `details`: Type plus type-conditional attributes
/// - `properties`: Ordered, user-defined key-value data
/// - `embedding`: Fixed-length vector, present only after lazy computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub owner_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub details: NodeDetails,

    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node with an auto-generated UUID
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, details: NodeDetails) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), owner_id, name, details)
    }

    /// Create a node with a caller-chosen id (imports, fixtures)
    pub fn new_with_id(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        details: NodeDetails,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            notes: None,
            details,
            properties: PropertyMap::new(),
            embedding: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn vision(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(owner_id, name, NodeDetails::Vision)
    }

    pub fn goal(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(owner_id, name, NodeDetails::Goal(GoalDetails::default()))
    }

    pub fn project(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(owner_id, name, NodeDetails::Project(ProjectDetails::default()))
    }

    pub fn person(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(owner_id, name, NodeDetails::Person(PersonDetails::default()))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set the sector of a person node (no-op for other types)
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        if let NodeDetails::Person(person) = &mut self.details {
            person.sector = Some(sector.into());
        }
        self
    }

    /// Set the relationship strength of a person node (no-op for other types)
    pub fn with_relationship_strength(mut self, strength: u8) -> Self {
        if let NodeDetails::Person(person) = &mut self.details {
            person.relationship_strength = Some(strength);
        }
        self
    }

    /// Add tags to a person node (no-op for other types)
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let NodeDetails::Person(person) = &mut self.details {
            person.tags.extend(tags.into_iter().map(Into::into));
        }
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.details.node_type()
    }

    pub fn is_type(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }

    pub fn person_details(&self) -> Option<&PersonDetails> {
        match &self.details {
            NodeDetails::Person(person) => Some(person),
            _ => None,
        }
    }

    pub fn goal_details(&self) -> Option<&GoalDetails> {
        match &self.details {
            NodeDetails::Goal(goal) => Some(goal),
            _ => None,
        }
    }

    pub fn project_details(&self) -> Option<&ProjectDetails> {
        match &self.details {
            NodeDetails::Project(project) => Some(project),
            _ => None,
        }
    }

    pub fn sector(&self) -> Option<&str> {
        self.person_details().and_then(|p| p.sector.as_deref())
    }

    pub fn relationship_strength(&self) -> Option<u8> {
        self.person_details().and_then(|p| p.relationship_strength)
    }

    pub fn tags(&self) -> &[String] {
        self.person_details().map(|p| p.tags.as_slice()).unwrap_or(&[])
    }

    /// Validate the node structure
    ///
    /// Checks:
    /// - `id`, `owner_id` present and `name` not blank
    /// - person relationship strength within 0-5
    /// - project end date not before its start date
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if self.owner_id.is_empty() {
            return Err(ValidationError::MissingField("owner_id".to_string()));
        }

        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }

        match &self.details {
            NodeDetails::Person(person) => {
                if let Some(strength) = person.relationship_strength {
                    if strength > MAX_RELATIONSHIP_STRENGTH {
                        return Err(ValidationError::OutOfRange {
                            field: "relationship_strength".to_string(),
                            value: i64::from(strength),
                            max: i64::from(MAX_RELATIONSHIP_STRENGTH),
                        });
                    }
                }
            }
            NodeDetails::Project(project) => {
                if let (Some(start), Some(end)) = (project.start_date, project.end_date) {
                    if end < start {
                        return Err(ValidationError::InvalidDateRange(format!(
                            "project ends ({}) before it starts ({})",
                            end, start
                        )));
                    }
                }
            }
            NodeDetails::Vision | NodeDetails::Goal(_) => {}
        }

        if let Some(embedding) = &self.embedding {
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::InvalidValue {
                    field: "embedding".to_string(),
                    reason: "contains non-finite values".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Set the embedding vector
    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
        self.modified_at = Utc::now();
    }

    /// Apply a sparse update in place.
    ///
    /// Returns `true` when text that feeds the embedding changed; the stale
    /// embedding is dropped in that case so it is recomputed on next use.
    pub fn apply_update(&mut self, update: NodeUpdate) -> bool {
        let mut text_changed = false;

        if let Some(name) = update.name {
            text_changed |= name != self.name;
            self.name = name;
        }
        if let Some(description) = update.description {
            text_changed |= description != self.description;
            self.description = description;
        }
        if let Some(notes) = update.notes {
            text_changed |= notes != self.notes;
            self.notes = notes;
        }
        if let Some(details) = update.details {
            self.details = details;
        }
        if let Some(properties) = update.properties {
            self.properties = properties;
        }

        if text_changed {
            self.embedding = None;
        }
        self.modified_at = Utc::now();
        text_changed
    }
}

/// Compact node descriptor used in result payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type(),
            name: node.name.clone(),
            sector: node.sector().map(str::to_string),
            relationship_strength: node.relationship_strength(),
        }
    }
}

/// Input for node creation; the owner comes from the acting user, never the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub details: NodeDetails,

    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

impl NewNode {
    pub fn new(name: impl Into<String>, details: NodeDetails) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            notes: None,
            details,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    /// Materialize the node for `owner_id`
    pub fn into_node(self, owner_id: impl Into<String>) -> Node {
        let mut node = match self.id {
            Some(id) => Node::new_with_id(id, owner_id, self.name, self.details),
            None => Node::new(owner_id, self.name, self.details),
        };
        node.description = self.description;
        node.notes = self.notes;
        node.properties = self.properties;
        node
    }
}

impl From<Node> for NewNode {
    fn from(node: Node) -> Self {
        Self {
            id: Some(node.id),
            name: node.name,
            description: node.description,
            notes: node.notes,
            details: node.details,
            properties: node.properties,
        }
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nested Options
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (clear the value)
/// - "value" → Some(Some("value")) (set to value)
pub(crate) fn deserialize_optional_field<'de, D, T>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Sparse node update
///
/// Only provided fields are changed. The node type itself is fixed at
/// creation; `details` must keep the same variant.
///
/// ```rust
/// use compass_core::models::NodeUpdate;
///
/// let update = NodeUpdate::new()
///     .with_name("Ada Lovelace")
///     .with_notes(None);
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub notes: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<NodeDetails>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn with_details(mut self, details: NodeDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.details.is_none()
            && self.properties.is_none()
    }
}

/// Result of a delete operation
///
/// Deletes are idempotent; `existed` reports whether anything was removed and
/// `removed_edges` how many edges the cascade took with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub existed: bool,
    pub removed_edges: usize,
}

impl DeleteResult {
    pub fn existed(removed_edges: usize) -> Self {
        Self {
            existed: true,
            removed_edges,
        }
    }

    pub fn not_found() -> Self {
        Self {
            existed: false,
            removed_edges: 0,
        }
    }
}
