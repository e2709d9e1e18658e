//! Graph Services
//!
//! The owner-scoped operations of the relationship graph engine:
//!
//! - `GraphService` - ownership checks, node and edge CRUD with cascades
//! - Graph views and the Vision → Goal → Project tree
//! - Goal path suggestions, proximity, diagnostics and nudges
//! - Similarity recommendations and person → goal linking
//! - Hierarchy moves with dense sibling ordering
//!
//! Services coordinate between the store and the pure algorithms; they hold
//! no per-request state.

pub mod assembler;
pub mod error;
pub mod graph_service;
pub mod hierarchy;
pub mod insights;
pub mod recommendations;

pub use assembler::{
    build_vision_tree, GoalBranch, GraphView, GraphViewEdge, GraphViewNode, ProjectLeaf,
    VisionTree,
};
pub use error::{GraphError, GraphResult};
pub use graph_service::GraphService;
pub use recommendations::LinkAttributes;
