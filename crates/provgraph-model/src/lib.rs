//! Provgraph host graph objects.
//!
//! These are the record types the host system hands across the storage
//! boundary: annotated vertices, directed edges between them, and the
//! `Graph` container that lineage queries materialize their results into.
//!
//! The model layer is deliberately free of algorithmic content. Identity is
//! defined by the annotation map: two vertices with equal annotations are the
//! same record, and the versioned content digest (`digest::vertex_digest_v1`)
//! is the canonical external key derived from it.

pub mod digest;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation map shared by vertices and edges.
///
/// Ordered so digests and serialized forms are canonical.
pub type Annotations = BTreeMap<String, String>;

// ============================================================================
// Vertex
// ============================================================================

/// A provenance vertex: an opaque record identified by its annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub annotations: Annotations,
}

impl Vertex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vertex from `(key, value)` annotation pairs.
    pub fn from_annotations<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            annotations: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a single annotation, replacing any previous value for the key.
    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|v| v.as_str())
    }

    /// Canonical external key for this vertex (see [`digest`]).
    pub fn digest(&self) -> String {
        digest::vertex_digest_v1(&self.annotations)
    }
}

// ============================================================================
// Edge
// ============================================================================

/// A directed provenance edge.
///
/// The source vertex is the *child* and the destination vertex is the
/// *parent*: an edge asserts "destination is a direct parent of source".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: Vertex,
    pub destination: Vertex,
    pub annotations: Annotations,
}

impl Edge {
    pub fn new(source: Vertex, destination: Vertex) -> Self {
        Self {
            source,
            destination,
            annotations: Annotations::new(),
        }
    }

    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|v| v.as_str())
    }
}

// ============================================================================
// Graph
// ============================================================================

/// A graph of vertices and edges.
///
/// Lineage queries return a freshly constructed `Graph`. The resolver only
/// materializes vertices; the `edges` list exists because the host graph type
/// carries one, and stays empty in query results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_vertex(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
    }

    pub fn put_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Digests of all vertices, sorted.
    ///
    /// Vertex order in a result graph is unspecified; comparing digest sets is
    /// the order-insensitive way to compare results.
    pub fn vertex_digests(&self) -> Vec<String> {
        let mut digests: Vec<String> = self.vertices.iter().map(|v| v.digest()).collect();
        digests.sort();
        digests
    }
}
