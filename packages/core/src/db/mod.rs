//! Database Layer
//!
//! Persistence for the relationship graph:
//!
//! - `GraphStore` trait: the contract every backend implements
//! - `MutationBatch`: multi-step writes applied as one atomic unit
//! - `InMemoryGraphStore`: process-local store for tests and embedding
//! - `DatabaseService` + `TursoGraphStore`: libsql-backed durable store
//!
//! Stores know nothing about ownership rules; those are enforced by
//! [`GraphService`](crate::services::GraphService).

mod database;
mod error;
mod graph_store;
mod memory_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use graph_store::{GraphStore, Mutation, MutationBatch};
pub use memory_store::InMemoryGraphStore;
pub use turso_store::TursoGraphStore;
