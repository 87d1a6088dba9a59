//! Provgraph storage boundary.
//!
//! Adapts the lineage core to the host system's storage-plugin contract:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      HOST SYSTEM                              │
//! │                                                               │
//! │  put_vertex / put_edge          get_lineage(expr, ...)        │
//! │        │                               │                      │
//! ├────────┼───────────────────────────────┼──────────────────────┤
//! │        ▼                               ▼                      │
//! │  ┌──────────────┐  writes   ┌───────────────────┐             │
//! │  │ LineageStorage│─────────►│ RwLock<FactBase>  │◄── readers  │
//! │  └──────────────┘           └───────────────────┘             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The boundary is where the host's loosely-typed conventions live: ids
//! rendered as string expressions, direction names, `bool` ingestion results,
//! and the `None` failure sentinel for queries. Everything below it is the
//! strongly-typed core. Errors crossing the boundary are logged here and
//! collapsed into the host's sentinel forms, never silently swallowed.
//!
//! Concurrency: the core is wrapped in a `parking_lot::RwLock`, so queries
//! run concurrently while ingestion takes the writer lock.


use provgraph_lineage::{Direction, FactBase, LineageError, LineageQuery, VertexId};
use provgraph_model::{Edge, Graph, Vertex};

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

/// Storage configuration, parsed from the `initialize` arguments string as
/// JSON when one is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Pre-allocation hint for the vertex table (0 = no pre-allocation).
    pub vertex_capacity: usize,
    /// Direction used when a boundary query passes an empty direction string.
    pub default_direction: Direction,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: 0,
            default_direction: Direction::Ancestors,
        }
    }
}

// ============================================================================
// Host contract
// ============================================================================

/// The storage-plugin contract the host system consumes.
///
/// Ingestion entry points report success as `bool`; the lineage query entry
/// point reports evaluation failure as `None`. The point/neighborhood
/// lookups (`get_vertex`, `get_edge`, `get_children`, `get_parents`) are part
/// of the contract but not implemented by the reasoning core: they always
/// answer "not found".
pub trait ProvenanceStorage {
    /// Readiness check. Non-empty `arguments` parse as a JSON
    /// [`StorageConfig`]; a malformed argument string fails initialization.
    fn initialize(&mut self, arguments: &str) -> bool;

    /// Release resources. The reasoner holds none.
    fn shutdown(&mut self) -> bool;

    /// Ingest a vertex. Always succeeds.
    fn put_vertex(&self, vertex: Vertex) -> bool;

    /// Ingest an edge. Fails (with a log entry) when an endpoint has not
    /// been ingested yet.
    fn put_edge(&self, edge: Edge) -> bool;

    /// Resolve a lineage query.
    ///
    /// `vertex_expression` and `terminating_expression` are internal ids
    /// rendered as strings (empty terminator = none); `depth == 0` means
    /// unbounded; an empty `direction` uses the configured default. Returns
    /// `None` on any evaluation failure, `Some(empty)` for an unknown query
    /// vertex.
    fn get_lineage(
        &self,
        vertex_expression: &str,
        depth: u32,
        direction: &str,
        terminating_expression: &str,
    ) -> Option<Graph>;

    fn get_vertex(&self, vertex_digest: &str) -> Option<Vertex>;

    fn get_edge(&self, source_digest: &str, destination_digest: &str) -> Option<Edge>;

    fn get_children(&self, parent_digest: &str) -> Option<Graph>;

    fn get_parents(&self, child_digest: &str) -> Option<Graph>;
}

// ============================================================================
// LineageStorage
// ============================================================================

/// The provided [`ProvenanceStorage`] implementation: a [`FactBase`] behind a
/// reader/writer lock, plus boundary parsing and logging.
pub struct LineageStorage {
    base: Arc<RwLock<FactBase>>,
    config: StorageConfig,
}

impl Default for LineageStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LineageStorage {
    pub fn new() -> Self {
        Self::with_config(StorageConfig::default())
    }

    pub fn with_config(config: StorageConfig) -> Self {
        let base = if config.vertex_capacity > 0 {
            FactBase::with_capacity(config.vertex_capacity)
        } else {
            FactBase::new()
        };
        Self {
            base: Arc::new(RwLock::new(base)),
            config,
        }
    }

    /// Shared handle to the underlying fact base, for typed callers that
    /// want direct store access.
    pub fn base(&self) -> Arc<RwLock<FactBase>> {
        Arc::clone(&self.base)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Strongly-typed query entry point (recommended over the string-level
    /// boundary method for in-process callers).
    pub fn resolve_lineage(&self, query: LineageQuery) -> Result<Graph, LineageError> {
        self.base.read().resolve(&query)
    }

    /// Translate the host's loosely-typed lineage parameters into a
    /// [`LineageQuery`].
    fn lineage_query(
        &self,
        vertex_expression: &str,
        depth: u32,
        direction: &str,
        terminating_expression: &str,
    ) -> anyhow::Result<LineageQuery> {
        let root: VertexId = vertex_expression.parse().with_context(|| {
            format!("query vertex expression {vertex_expression:?} is not an internal id")
        })?;

        let direction = if direction.trim().is_empty() {
            self.config.default_direction
        } else {
            direction.parse::<Direction>()?
        };

        let terminator = if terminating_expression.trim().is_empty() {
            None
        } else {
            let id: VertexId = terminating_expression.parse().with_context(|| {
                format!(
                    "terminating expression {terminating_expression:?} is not an internal id"
                )
            })?;
            Some(id)
        };

        Ok(LineageQuery {
            root,
            direction,
            max_depth: (depth > 0).then_some(depth),
            terminator,
        })
    }
}

impl ProvenanceStorage for LineageStorage {
    fn initialize(&mut self, arguments: &str) -> bool {
        let arguments = arguments.trim();
        if arguments.is_empty() {
            return true;
        }
        match serde_json::from_str::<StorageConfig>(arguments) {
            Ok(config) => {
                // Re-seat the store only while it is still empty; a capacity
                // hint must not discard ingested facts.
                if config.vertex_capacity > 0 && self.base.read().vertex_count() == 0 {
                    self.base = Arc::new(RwLock::new(FactBase::with_capacity(
                        config.vertex_capacity,
                    )));
                }
                self.config = config;
                true
            }
            Err(error) => {
                tracing::warn!(%error, arguments, "failed to parse storage configuration");
                false
            }
        }
    }

    fn shutdown(&mut self) -> bool {
        let base = self.base.read();
        tracing::debug!(
            vertices = base.vertex_count(),
            facts = base.fact_count(),
            "shutting down lineage storage"
        );
        true
    }

    fn put_vertex(&self, vertex: Vertex) -> bool {
        let id = self.base.write().register_vertex(vertex);
        tracing::debug!(%id, "registered vertex");
        true
    }

    fn put_edge(&self, edge: Edge) -> bool {
        match self.base.write().register_edge(&edge) {
            Ok(fact_id) => {
                tracing::debug!(fact_id, "recorded parent fact");
                true
            }
            Err(error) => {
                tracing::warn!(%error, "rejected edge");
                false
            }
        }
    }

    fn get_lineage(
        &self,
        vertex_expression: &str,
        depth: u32,
        direction: &str,
        terminating_expression: &str,
    ) -> Option<Graph> {
        let query = match self.lineage_query(
            vertex_expression,
            depth,
            direction,
            terminating_expression,
        ) {
            Ok(query) => query,
            Err(error) => {
                tracing::error!(error = %error, "invalid lineage query");
                return None;
            }
        };

        tracing::debug!(?query, "resolving lineage");
        match self.resolve_lineage(query) {
            Ok(graph) => Some(graph),
            Err(error) => {
                tracing::error!(%error, "lineage resolution failed");
                None
            }
        }
    }

    // Point/neighborhood lookups are not implemented by the reasoning core;
    // the contract is preserved and always answers "not found".

    fn get_vertex(&self, _vertex_digest: &str) -> Option<Vertex> {
        None
    }

    fn get_edge(&self, _source_digest: &str, _destination_digest: &str) -> Option<Edge> {
        None
    }

    fn get_children(&self, _parent_digest: &str) -> Option<Graph> {
        None
    }

    fn get_parents(&self, _child_digest: &str) -> Option<Graph> {
        None
    }
}
