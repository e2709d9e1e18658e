//! TursoGraphStore - GraphStore Implementation for Turso/libsql
//!
//! Persists nodes and edges in the local libsql database opened by
//! [`DatabaseService`].
//!
//! # Design Principles
//!
//! 1. **Upserts, never REPLACE**: `INSERT ... ON CONFLICT DO UPDATE` keeps the
//!    row alive, so re-saving a node does not trip `ON DELETE CASCADE`
//! 2. **Row Conversion**: all decoding lives in `row_to_node` / `row_to_edge`
//! 3. **Explicit cascade**: node deletion removes touching edges itself and
//!    reports how many went, inside the same transaction
//! 4. **Transactions**: every batch runs in `BEGIN`/`COMMIT` with `ROLLBACK`
//!    on the first failure
//!
//! # Examples
//!
//! ```rust,no_run
//! use compass_core::db::{DatabaseService, GraphStore, TursoGraphStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/compass.db")).await?);
//!     let store: Arc<dyn GraphStore> = Arc::new(TursoGraphStore::new(db));
//!
//!     let node = store.get_node("node-123").await?;
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::db::graph_store::{GraphStore, Mutation, MutationBatch};
use crate::db::DatabaseService;
use crate::models::{DeleteResult, Edge, EdgeType, Node, NodeDetails, NodeFilter, PropertyMap};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Row, Value};
use std::sync::Arc;

const NODE_COLUMNS: &str = "id, owner_id, node_type, name, description, notes, details, properties, embedding, created_at, modified_at";

const EDGE_COLUMNS: &str = "id, owner_id, source_id, target_id, edge_type, weight, relationship_strength, relevance_score, last_interaction_date, notes, added_by_user, sort_order, created_at";

/// GraphStore backed by a libsql database
pub struct TursoGraphStore {
    db: Arc<DatabaseService>,
}

impl TursoGraphStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    async fn connection(&self) -> Result<Connection> {
        self.db
            .connect_with_timeout()
            .await
            .context("Failed to open database connection")
    }

    /// Parse timestamp from database - accepts RFC3339 and SQLite's
    /// `CURRENT_TIMESTAMP` format
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
            s
        ))
    }

    fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn decode_embedding(id: &str, bytes: &[u8]) -> Result<Vec<f32>, DatabaseError> {
        if bytes.len() % 4 != 0 {
            return Err(DatabaseError::corrupt_row(
                id,
                "embedding",
                format!("blob length {} is not a multiple of 4", bytes.len()),
            ));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn opt_text(value: Option<&str>) -> Value {
        value.map_or(Value::Null, |s| Value::Text(s.to_string()))
    }

    fn opt_integer(value: Option<i64>) -> Value {
        value.map_or(Value::Null, Value::Integer)
    }

    /// Convert libsql::Row to Node
    ///
    /// Expects columns in `NODE_COLUMNS` order.
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: String = row.get(0).context("Failed to get id")?;
        let owner_id: String = row.get(1).context("Failed to get owner_id")?;
        let node_type: String = row.get(2).context("Failed to get node_type")?;
        let name: String = row.get(3).context("Failed to get name")?;
        let description: Option<String> = row.get(4).context("Failed to get description")?;
        let notes: Option<String> = row.get(5).context("Failed to get notes")?;
        let details_json: String = row.get(6).context("Failed to get details")?;
        let properties_json: String = row.get(7).context("Failed to get properties")?;
        let embedding_blob: Option<Vec<u8>> = row.get(8).context("Failed to get embedding")?;
        let created_at_str: String = row.get(9).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(10).context("Failed to get modified_at")?;

        let details: NodeDetails = serde_json::from_str(&details_json)
            .map_err(|e| DatabaseError::corrupt_row(&id, "details", e))?;
        if details.node_type().as_str() != node_type {
            return Err(DatabaseError::corrupt_row(
                &id,
                "node_type",
                format!(
                    "column says '{}' but details say '{}'",
                    node_type,
                    details.node_type()
                ),
            )
            .into());
        }

        let properties: PropertyMap = serde_json::from_str(&properties_json)
            .map_err(|e| DatabaseError::corrupt_row(&id, "properties", e))?;

        let embedding = embedding_blob
            .map(|bytes| Self::decode_embedding(&id, &bytes))
            .transpose()?;

        Ok(Node {
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse created_at")?,
            modified_at: Self::parse_timestamp(&modified_at_str)
                .context("Failed to parse modified_at")?,
            id,
            owner_id,
            name,
            description,
            notes,
            details,
            properties,
            embedding,
        })
    }

    /// Convert libsql::Row to Edge
    ///
    /// Expects columns in `EDGE_COLUMNS` order.
    fn row_to_edge(row: &Row) -> Result<Edge> {
        let id: String = row.get(0).context("Failed to get id")?;
        let edge_type: String = row.get(4).context("Failed to get edge_type")?;
        let edge_type: EdgeType = edge_type
            .parse()
            .map_err(|e| DatabaseError::corrupt_row(&id, "edge_type", e))?;

        let strength: Option<i64> = row.get(6).context("Failed to get relationship_strength")?;
        let relationship_strength = strength
            .map(u8::try_from)
            .transpose()
            .map_err(|e| DatabaseError::corrupt_row(&id, "relationship_strength", e))?;

        let last_interaction: Option<String> =
            row.get(8).context("Failed to get last_interaction_date")?;
        let last_interaction_date = last_interaction
            .as_deref()
            .map(Self::parse_timestamp)
            .transpose()
            .context("Failed to parse last_interaction_date")?;

        let added_by_user: i64 = row.get(10).context("Failed to get added_by_user")?;
        let created_at_str: String = row.get(12).context("Failed to get created_at")?;

        Ok(Edge {
            owner_id: row.get(1).context("Failed to get owner_id")?,
            source_id: row.get(2).context("Failed to get source_id")?,
            target_id: row.get(3).context("Failed to get target_id")?,
            edge_type,
            weight: row.get(5).context("Failed to get weight")?,
            relationship_strength,
            relevance_score: row.get(7).context("Failed to get relevance_score")?,
            last_interaction_date,
            notes: row.get(9).context("Failed to get notes")?,
            added_by_user: added_by_user != 0,
            sort_order: row.get(11).context("Failed to get sort_order")?,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse created_at")?,
            id,
        })
    }

    async fn query_nodes(&self, sql: &str, params: Params) -> Result<Vec<Node>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .context("Failed to query nodes")?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read node row")? {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn query_edges(&self, sql: &str, params: Params) -> Result<Vec<Edge>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .context("Failed to query edges")?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read edge row")? {
            edges.push(Self::row_to_edge(&row)?);
        }
        Ok(edges)
    }

    async fn upsert_node(conn: &Connection, node: &Node) -> Result<()> {
        let details =
            serde_json::to_string(&node.details).context("Failed to serialize details")?;
        let properties =
            serde_json::to_string(&node.properties).context("Failed to serialize properties")?;
        let embedding = node
            .embedding
            .as_deref()
            .map_or(Value::Null, |e| Value::Blob(Self::encode_embedding(e)));

        conn.execute(
            &format!(
                "INSERT INTO nodes ({NODE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    node_type = excluded.node_type,
                    name = excluded.name,
                    description = excluded.description,
                    notes = excluded.notes,
                    details = excluded.details,
                    properties = excluded.properties,
                    embedding = excluded.embedding,
                    modified_at = excluded.modified_at"
            ),
            Params::Positional(vec![
                Value::Text(node.id.clone()),
                Value::Text(node.owner_id.clone()),
                Value::Text(node.node_type().as_str().to_string()),
                Value::Text(node.name.clone()),
                Self::opt_text(node.description.as_deref()),
                Self::opt_text(node.notes.as_deref()),
                Value::Text(details),
                Value::Text(properties),
                embedding,
                Value::Text(node.created_at.to_rfc3339()),
                Value::Text(node.modified_at.to_rfc3339()),
            ]),
        )
        .await
        .with_context(|| format!("Failed to save node {}", node.id))?;
        Ok(())
    }

    async fn upsert_edge(conn: &Connection, edge: &Edge) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO edges ({EDGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    source_id = excluded.source_id,
                    target_id = excluded.target_id,
                    edge_type = excluded.edge_type,
                    weight = excluded.weight,
                    relationship_strength = excluded.relationship_strength,
                    relevance_score = excluded.relevance_score,
                    last_interaction_date = excluded.last_interaction_date,
                    notes = excluded.notes,
                    added_by_user = excluded.added_by_user,
                    sort_order = excluded.sort_order"
            ),
            Params::Positional(vec![
                Value::Text(edge.id.clone()),
                Value::Text(edge.owner_id.clone()),
                Value::Text(edge.source_id.clone()),
                Value::Text(edge.target_id.clone()),
                Value::Text(edge.edge_type.as_str().to_string()),
                Value::Integer(edge.weight),
                Self::opt_integer(edge.relationship_strength.map(i64::from)),
                edge.relevance_score.map_or(Value::Null, Value::Real),
                Self::opt_text(
                    edge.last_interaction_date
                        .map(|at| at.to_rfc3339())
                        .as_deref(),
                ),
                Self::opt_text(edge.notes.as_deref()),
                Value::Integer(i64::from(edge.added_by_user)),
                Self::opt_integer(edge.sort_order),
                Value::Text(edge.created_at.to_rfc3339()),
            ]),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to save edge {} ({} -> {})",
                edge.id, edge.source_id, edge.target_id
            )
        })?;
        Ok(())
    }

    /// Returns the number of edges removed with the node
    async fn delete_node_cascade(conn: &Connection, id: &str) -> Result<usize> {
        let removed = conn
            .execute(
                "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
                Params::Positional(vec![Value::Text(id.to_string())]),
            )
            .await
            .with_context(|| format!("Failed to delete edges of node {}", id))?;
        conn.execute(
            "DELETE FROM nodes WHERE id = ?1",
            Params::Positional(vec![Value::Text(id.to_string())]),
        )
        .await
        .with_context(|| format!("Failed to delete node {}", id))?;
        Ok(removed as usize)
    }

    async fn apply_mutation(conn: &Connection, mutation: &Mutation) -> Result<usize> {
        match mutation {
            Mutation::SaveNode(node) => Self::upsert_node(conn, node).await.map(|_| 0),
            Mutation::SaveEdge(edge) => Self::upsert_edge(conn, edge).await.map(|_| 0),
            Mutation::DeleteNode(id) => Self::delete_node_cascade(conn, id).await,
            Mutation::DeleteEdge(id) => {
                conn.execute(
                    "DELETE FROM edges WHERE id = ?1",
                    Params::Positional(vec![Value::Text(id.clone())]),
                )
                .await
                .with_context(|| format!("Failed to delete edge {}", id))?;
                Ok(0)
            }
        }
    }

    /// Run mutations inside one transaction; returns edges removed by cascades
    async fn run_in_transaction(&self, mutations: &[Mutation]) -> Result<usize> {
        let conn = self.connection().await?;

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .context("Failed to begin transaction")?;

        let mut removed_edges = 0;
        for (index, mutation) in mutations.iter().enumerate() {
            match Self::apply_mutation(&conn, mutation).await {
                Ok(removed) => removed_edges += removed,
                Err(e) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(e.context(format!(
                        "Batch mutation {} of {} failed",
                        index + 1,
                        mutations.len()
                    )));
                }
            }
        }

        if let Err(e) = conn.execute("COMMIT", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(anyhow::Error::new(e).context("Failed to commit transaction"));
        }

        Ok(removed_edges)
    }
}

#[async_trait]
impl GraphStore for TursoGraphStore {
    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let nodes = self
            .query_nodes(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1"),
                Params::Positional(vec![Value::Text(id.to_string())]),
            )
            .await?;
        Ok(nodes.into_iter().next())
    }

    async fn list_nodes_by_owner(&self, owner_id: &str, filter: &NodeFilter) -> Result<Vec<Node>> {
        let mut sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE owner_id = ?1");
        let mut values = vec![Value::Text(owner_id.to_string())];

        // Type narrowing happens in SQL; the rest of the predicate runs in Rust
        if let Some(types) = filter.node_types.as_ref().filter(|t| !t.is_empty()) {
            let placeholders: Vec<String> = types
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", i + 2))
                .collect();
            sql.push_str(&format!(" AND node_type IN ({})", placeholders.join(", ")));
            values.extend(
                types
                    .iter()
                    .map(|t| Value::Text(t.as_str().to_string())),
            );
        }
        sql.push_str(" ORDER BY rowid");

        let nodes = self.query_nodes(&sql, Params::Positional(values)).await?;
        Ok(nodes.into_iter().filter(|n| filter.matches(n)).collect())
    }

    async fn save_node(&self, node: Node) -> Result<Node> {
        let conn = self.connection().await?;
        Self::upsert_node(&conn, &node).await?;
        Ok(node)
    }

    async fn delete_node(&self, id: &str) -> Result<DeleteResult> {
        if self.get_node(id).await?.is_none() {
            return Ok(DeleteResult::not_found());
        }
        let removed = self
            .run_in_transaction(&[Mutation::DeleteNode(id.to_string())])
            .await?;
        Ok(DeleteResult::existed(removed))
    }

    async fn get_edge(&self, id: &str) -> Result<Option<Edge>> {
        let edges = self
            .query_edges(
                &format!("SELECT {EDGE_COLUMNS} FROM edges WHERE id = ?1"),
                Params::Positional(vec![Value::Text(id.to_string())]),
            )
            .await?;
        Ok(edges.into_iter().next())
    }

    async fn list_edges_by_owner(&self, owner_id: &str) -> Result<Vec<Edge>> {
        self.query_edges(
            &format!("SELECT {EDGE_COLUMNS} FROM edges WHERE owner_id = ?1 ORDER BY rowid"),
            Params::Positional(vec![Value::Text(owner_id.to_string())]),
        )
        .await
    }

    async fn list_edges_by_source(&self, node_id: &str) -> Result<Vec<Edge>> {
        self.query_edges(
            &format!("SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 ORDER BY rowid"),
            Params::Positional(vec![Value::Text(node_id.to_string())]),
        )
        .await
    }

    async fn list_edges_by_target(&self, node_id: &str) -> Result<Vec<Edge>> {
        self.query_edges(
            &format!("SELECT {EDGE_COLUMNS} FROM edges WHERE target_id = ?1 ORDER BY rowid"),
            Params::Positional(vec![Value::Text(node_id.to_string())]),
        )
        .await
    }

    async fn save_edge(&self, edge: Edge) -> Result<Edge> {
        let conn = self.connection().await?;
        Self::upsert_edge(&conn, &edge).await?;
        Ok(edge)
    }

    async fn delete_edge(&self, id: &str) -> Result<bool> {
        let conn = self.connection().await?;
        let affected = conn
            .execute(
                "DELETE FROM edges WHERE id = ?1",
                Params::Positional(vec![Value::Text(id.to_string())]),
            )
            .await
            .with_context(|| format!("Failed to delete edge {}", id))?;
        Ok(affected > 0)
    }

    async fn apply_batch(&self, batch: MutationBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.run_in_transaction(batch.mutations()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_blob_round_trip() {
        let embedding = vec![0.25_f32, -1.5, 3.0];
        let bytes = TursoGraphStore::encode_embedding(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(
            TursoGraphStore::decode_embedding("n1", &bytes).unwrap(),
            embedding
        );
    }

    #[test]
    fn test_truncated_embedding_blob_is_corrupt() {
        let err = TursoGraphStore::decode_embedding("n1", &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { column: "embedding", .. }));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(TursoGraphStore::parse_timestamp("2025-01-03T10:00:00Z").is_ok());
        assert!(TursoGraphStore::parse_timestamp("2025-01-03T10:00:00.123456+00:00").is_ok());
        assert!(TursoGraphStore::parse_timestamp("2025-01-03 10:00:00").is_ok());
        assert!(TursoGraphStore::parse_timestamp("yesterday").is_err());
    }
}
