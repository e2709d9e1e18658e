//! Graph Algorithms
//!
//! Pure, synchronous computations over one owner's materialized subgraph.
//! Nothing here touches storage or checks ownership; the service layer
//! loads the data, builds an [`AdjacencyIndex`] and calls in.

pub mod adjacency;
pub mod diagnostics;
pub mod nudges;
pub mod path_finder;
pub mod proximity;
pub mod similarity;

pub use adjacency::{AdjacencyIndex, Direction, Neighbor};
pub use diagnostics::{diagnose_goal, sector_highlights, GoalDiagnostics, ReadinessLevel, Supporter};
pub use nudges::{relationship_nudges, Nudge};
pub use path_finder::{find_goal_paths, PathSuggestion};
pub use proximity::{influence_score, proximity_report, NeighborDetail, ProximityReport};
pub use similarity::{cosine_similarity, rank_by_similarity, SimilaritySuggestion};
