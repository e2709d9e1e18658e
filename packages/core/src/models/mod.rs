//! Data Models
//!
//! This module contains the core data structures of the relationship graph:
//!
//! - `Node` - typed vertex (Vision, Goal, Project, Person) with type-specific details
//! - `Edge` - directed, typed, weighted relationship between two nodes
//! - `PropertyMap` - ordered, typed property bag attached to nodes
//! - `NodeFilter` - composable predicate for owner-scoped listings

mod edge;
mod filter;
mod node;
mod property;

pub use edge::{Edge, EdgeType, EdgeUpdate, NewEdge, MAX_EDGE_WEIGHT};
pub use filter::NodeFilter;
pub use node::{
    DeleteResult, GoalDetails, GoalPriority, NewNode, Node, NodeDetails, NodeSummary, NodeType,
    NodeUpdate, PersonDetails, ProjectDetails, ProjectStatus, ValidationError,
    MAX_RELATIONSHIP_STRENGTH,
};
pub use property::{PropertyMap, PropertyValue};
