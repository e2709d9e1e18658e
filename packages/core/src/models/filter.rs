//! Composable node filter
//!
//! Every set criterion must match (logical AND). Within `node_types` and
//! `tags_any` a single hit is enough (logical OR).

use serde::{Deserialize, Serialize};

use crate::models::node::{Node, NodeType};

/// Node filtering criteria for owner-scoped listings
///
/// # Examples
///
/// ```rust
/// # use compass_core::models::{NodeFilter, NodeType};
/// // All people in finance that the user feels close to
/// let filter = NodeFilter::new()
///     .with_node_type(NodeType::Person)
///     .with_sector("Finance")
///     .with_strength_range(Some(4), None);
///
/// // Free-text search across name, description and notes
/// let filter = NodeFilter::new().with_search("climbing");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    /// Match any of these node types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<NodeType>>,

    /// Person sector, case-insensitive equality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Person carries at least one of these tags (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_any: Option<Vec<String>>,

    /// Inclusive lower bound on person relationship strength
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_strength: Option<u8>,

    /// Inclusive upper bound on person relationship strength
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_strength: Option<u8>,

    /// Case-insensitive substring over name, description and notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl NodeFilter {
    /// Create a new empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_types.get_or_insert_with(Vec::new).push(node_type);
        self
    }

    pub fn with_node_types(mut self, node_types: impl IntoIterator<Item = NodeType>) -> Self {
        self.node_types
            .get_or_insert_with(Vec::new)
            .extend(node_types);
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_tags_any<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags_any
            .get_or_insert_with(Vec::new)
            .extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_strength_range(mut self, min: Option<u8>, max: Option<u8>) -> Self {
        self.min_strength = min;
        self.max_strength = max;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Whether the filter has no criteria
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Evaluate the predicate against one node
    ///
    /// Person-only criteria (sector, tags, strength) never match nodes of
    /// other types.
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(types) = &self.node_types {
            if !types.contains(&node.node_type()) {
                return false;
            }
        }

        if let Some(sector) = &self.sector {
            match node.sector() {
                Some(actual) if actual.eq_ignore_ascii_case(sector) => {}
                _ => return false,
            }
        }

        if let Some(wanted) = &self.tags_any {
            let hit = node
                .tags()
                .iter()
                .any(|tag| wanted.iter().any(|w| w.eq_ignore_ascii_case(tag)));
            if !hit {
                return false;
            }
        }

        if self.min_strength.is_some() || self.max_strength.is_some() {
            let Some(strength) = node.relationship_strength() else {
                return false;
            };
            if self.min_strength.is_some_and(|min| strength < min) {
                return false;
            }
            if self.max_strength.is_some_and(|max| strength > max) {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let haystacks = [
                    Some(node.name.as_str()),
                    node.description.as_deref(),
                    node.notes.as_deref(),
                ];
                let found = haystacks
                    .into_iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&needle));
                if !found {
                    return false;
                }
            }
        }

        true
    }
}
