//! Compass Core - Relationship Graph Engine
//!
//! Models a user's personal network as a typed property graph: people,
//! visions, goals and projects joined by weighted, typed edges. On top of
//! that graph the crate answers "who can help me with this goal?".
//!
//! # Modules
//!
//! - [`models`] - Nodes, edges, property bags and filters
//! - [`db`] - The `GraphStore` contract with in-memory and libsql stores
//! - [`algorithms`] - Path finding, proximity, similarity, diagnostics, nudges
//! - [`services`] - `GraphService`, the owner-scoped entry point
//! - [`embedding`] - The embedding model seam
//! - [`config`] - Engine tuning knobs
//! - [`logging`] - Tracing subscriber setup

pub mod algorithms;
pub mod config;
pub mod db;
pub mod embedding;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::GraphEngineConfig;
pub use db::{GraphStore, InMemoryGraphStore, TursoGraphStore};
pub use embedding::{EmbeddingError, EmbeddingProvider};
pub use models::*;
pub use services::{GraphError, GraphResult, GraphService};
