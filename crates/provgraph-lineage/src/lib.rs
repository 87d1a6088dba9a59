//! Provgraph lineage core: fact accumulation + ancestry closure resolution.
//!
//! Two cooperating pieces:
//!
//! 1. **Fact store** (`FactBase` over `VertexTable` + `FactLog`): the
//!    append-only set of known parent facts plus a bidirectional mapping
//!    between dense internal ids and full vertex records.
//! 2. **Lineage resolver** (`FactBase::resolve`): given a query vertex,
//!    derives the transitive closure of the parent relation as a bitmap of
//!    internal ids, then projects that set back into vertex records.
//!
//! Key representation choices:
//!
//! 1. **Dense u32 ids**: every registered vertex gets the next sequential
//!    `VertexId`, so the record table is a plain `Vec` and closure sets ride
//!    on Roaring bitmaps.
//! 2. **Indexed fact log**: facts are kept in arrival order (duplicates
//!    permitted) with forward (child -> facts) and backward (parent -> facts)
//!    adjacency indexes maintained on append.
//! 3. **Traversal, not rule evaluation**: the ancestor relation is a plain
//!    reachability computation, so resolution is a frontier BFS over the
//!    adjacency indexes with a visited bitmap. Cycles terminate because each
//!    id is expanded at most once.
//!
//! The store grows monotonically: construct, ingest, query. Queries never
//! mutate and always materialize a fresh `Graph`.

use provgraph_model::{Edge, Graph, Vertex};

use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Vertex Ids
// ============================================================================

/// Dense internal vertex id (4 bytes), assigned sequentially at registration.
///
/// Distinct from the external content digest: ids are unique per
/// *registration*, never reused or reassigned, and say nothing about record
/// equality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct VertexId(u32);

impl VertexId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VertexId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(VertexId)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Ingestion-time errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An edge referenced a vertex that was never registered. Nothing is
    /// recorded when this is raised.
    #[error("edge {endpoint} vertex is not registered (digest {digest})")]
    UnknownVertex {
        endpoint: &'static str,
        digest: String,
    },
}

/// Resolution-time errors.
///
/// These indicate internal inconsistency between the fact log and the vertex
/// table; the whole query fails rather than returning a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineageError {
    #[error("vertex id {id} appears in the closure but has no record in the vertex table")]
    MissingVertexRecord { id: VertexId },
}

/// A direction string at the query boundary did not name a known direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized lineage direction {0:?} (expected \"ancestors\", \"descendants\", or \"both\")")]
pub struct DirectionParseError(pub String);

// ============================================================================
// Vertex Table (id <-> record bijection)
// ============================================================================

/// Bidirectional mapping between internal ids and vertex records.
///
/// Forward direction is a dense `Vec` (id == index). Reverse direction keys
/// on the vertex content digest. Registration performs **no deduplication**:
/// registering an identical record twice yields two distinct ids, and the
/// reverse mapping then resolves to the most recent one.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VertexTable {
    records: Vec<Vertex>,
    by_digest: AHashMap<String, VertexId>,
}

impl VertexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered vertices (equals the next id to be assigned).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a vertex, assigning the next sequential id.
    pub fn register(&mut self, vertex: Vertex) -> VertexId {
        let id = VertexId(self.records.len() as u32);
        self.by_digest.insert(vertex.digest(), id);
        self.records.push(vertex);
        id
    }

    /// Look up a record by id.
    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        self.records.get(id.raw() as usize)
    }

    /// Reverse lookup: record -> id (most recent registration wins).
    pub fn id_of(&self, vertex: &Vertex) -> Option<VertexId> {
        self.id_of_digest(&vertex.digest())
    }

    /// Reverse lookup by external content digest.
    pub fn id_of_digest(&self, digest: &str) -> Option<VertexId> {
        self.by_digest.get(digest).copied()
    }

    pub fn contains(&self, id: VertexId) -> bool {
        (id.raw() as usize) < self.records.len()
    }
}

// ============================================================================
// Fact Log (append-only parent facts with adjacency indexes)
// ============================================================================

/// A direct parent-child relationship: `parent` is a direct parent of
/// `child`. Derived from an edge whose source is the child and whose
/// destination is the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentFact {
    pub child: VertexId,
    pub parent: VertexId,
}

/// Append-only ordered fact list.
///
/// Duplicates are permitted (no identity check against existing facts).
/// Adjacency indexes are maintained on append so neighborhood lookups stay
/// O(1) in the number of matching facts.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FactLog {
    facts: Vec<ParentFact>,
    /// Forward index: child -> fact ids.
    forward_index: AHashMap<VertexId, Vec<u32>>,
    /// Backward index: parent -> fact ids.
    backward_index: AHashMap<VertexId, Vec<u32>>,
}

impl FactLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded facts (duplicates counted).
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Append a fact, returning its id (the position in arrival order).
    pub fn append(&mut self, fact: ParentFact) -> u32 {
        let id = self.facts.len() as u32;
        self.forward_index.entry(fact.child).or_default().push(id);
        self.backward_index.entry(fact.parent).or_default().push(id);
        self.facts.push(fact);
        id
    }

    /// Get a fact by its id.
    pub fn get(&self, fact_id: u32) -> Option<&ParentFact> {
        self.facts.get(fact_id as usize)
    }

    /// All direct parents of `child`.
    pub fn parents(&self, child: VertexId) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        if let Some(ids) = self.forward_index.get(&child) {
            for &id in ids {
                if let Some(fact) = self.facts.get(id as usize) {
                    out.insert(fact.parent.raw());
                }
            }
        }
        out
    }

    /// All direct children of `parent`.
    pub fn children(&self, parent: VertexId) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        if let Some(ids) = self.backward_index.get(&parent) {
            for &id in ids {
                if let Some(fact) = self.facts.get(id as usize) {
                    out.insert(fact.child.raw());
                }
            }
        }
        out
    }

    /// Facts in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &ParentFact> {
        self.facts.iter()
    }
}

// ============================================================================
// Lineage Queries
// ============================================================================

/// Traversal direction over the parent relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Follow child -> parent facts (the ancestor closure).
    #[default]
    Ancestors,
    /// Follow parent -> child facts (the descendant closure).
    Descendants,
    /// Union of both closures.
    Both,
}

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "ancestor" | "ancestors" => Ok(Direction::Ancestors),
            "d" | "descendant" | "descendants" => Ok(Direction::Descendants),
            "b" | "both" => Ok(Direction::Both),
            _ => Err(DirectionParseError(s.to_string())),
        }
    }
}

/// A lineage query: root vertex plus traversal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageQuery {
    pub root: VertexId,
    pub direction: Direction,
    /// Hop bound; `None` is unbounded.
    pub max_depth: Option<u32>,
    /// A vertex at which traversal stops: it is reported when reached but
    /// never expanded.
    pub terminator: Option<VertexId>,
}

impl LineageQuery {
    /// Unbounded ancestor query.
    pub fn ancestors_of(root: VertexId) -> Self {
        Self {
            root,
            direction: Direction::Ancestors,
            max_depth: None,
            terminator: None,
        }
    }

    pub fn descendants_of(root: VertexId) -> Self {
        Self {
            direction: Direction::Descendants,
            ..Self::ancestors_of(root)
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_terminator(mut self, terminator: VertexId) -> Self {
        self.terminator = Some(terminator);
        self
    }
}

// ============================================================================
// FactBase: the combined store + resolver
// ============================================================================

/// The single source of truth the resolver consults: vertex table + fact log.
///
/// Lifecycle: construct once, ingest monotonically, query freely. There is no
/// internal locking; callers wanting concurrent readers put the base behind a
/// reader/writer lock (the storage crate does exactly that).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FactBase {
    table: VertexTable,
    log: FactLog,
}

impl FactBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate the vertex table for an expected ingest volume.
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            table: VertexTable {
                records: Vec::with_capacity(vertices),
                by_digest: AHashMap::with_capacity(vertices),
            },
            log: FactLog::new(),
        }
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Register a vertex, assigning the next sequential internal id.
    ///
    /// Always succeeds; no uniqueness check is performed.
    pub fn register_vertex(&mut self, vertex: Vertex) -> VertexId {
        self.table.register(vertex)
    }

    /// Register an edge as a parent fact (source-id, destination-id).
    ///
    /// Both endpoints must already be registered; otherwise this fails with
    /// [`StoreError::UnknownVertex`] and records nothing.
    pub fn register_edge(&mut self, edge: &Edge) -> Result<u32, StoreError> {
        let child = self
            .table
            .id_of(&edge.source)
            .ok_or_else(|| StoreError::UnknownVertex {
                endpoint: "source",
                digest: edge.source.digest(),
            })?;
        let parent =
            self.table
                .id_of(&edge.destination)
                .ok_or_else(|| StoreError::UnknownVertex {
                    endpoint: "destination",
                    digest: edge.destination.digest(),
                })?;
        Ok(self.log.append(ParentFact { child, parent }))
    }

    // ------------------------------------------------------------------
    // Point lookups
    // ------------------------------------------------------------------

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.table.get(id)
    }

    pub fn id_of(&self, vertex: &Vertex) -> Option<VertexId> {
        self.table.id_of(vertex)
    }

    pub fn id_of_digest(&self, digest: &str) -> Option<VertexId> {
        self.table.id_of_digest(digest)
    }

    pub fn vertex_count(&self) -> usize {
        self.table.len()
    }

    pub fn fact_count(&self) -> usize {
        self.log.len()
    }

    pub fn fact(&self, fact_id: u32) -> Option<&ParentFact> {
        self.log.get(fact_id)
    }

    /// Recorded facts in arrival order.
    pub fn facts(&self) -> impl Iterator<Item = &ParentFact> {
        self.log.iter()
    }

    /// Direct parents of `id`.
    pub fn parents(&self, id: VertexId) -> RoaringBitmap {
        self.log.parents(id)
    }

    /// Direct children of `id`.
    pub fn children(&self, id: VertexId) -> RoaringBitmap {
        self.log.children(id)
    }

    // ------------------------------------------------------------------
    // Lineage resolution
    // ------------------------------------------------------------------

    /// Compute the closure id set for a query without materializing records.
    ///
    /// Frontier BFS over the adjacency indexes. The root is marked visited
    /// from the start, so cycles terminate and the root is never reported as
    /// a member of its own lineage.
    pub fn closure(&self, query: &LineageQuery) -> RoaringBitmap {
        let mut visited = RoaringBitmap::new();
        visited.insert(query.root.raw());

        let mut frontier = RoaringBitmap::new();
        frontier.insert(query.root.raw());

        let mut depth: u32 = 0;
        while !frontier.is_empty() {
            if let Some(max) = query.max_depth {
                if depth >= max {
                    break;
                }
            }

            let mut next = RoaringBitmap::new();
            for raw in frontier.iter() {
                let id = VertexId(raw);
                if query.terminator == Some(id) {
                    continue;
                }
                match query.direction {
                    Direction::Ancestors => next |= self.log.parents(id),
                    Direction::Descendants => next |= self.log.children(id),
                    Direction::Both => {
                        next |= self.log.parents(id);
                        next |= self.log.children(id);
                    }
                }
            }

            next -= &visited;
            visited |= &next;
            frontier = next;
            depth += 1;
        }

        visited.remove(query.root.raw());
        visited
    }

    /// Resolve a lineage query into a fresh vertex-only result graph.
    ///
    /// An unknown root is a valid empty result. An id in the closure with no
    /// record in the table means the log and table disagree; the whole query
    /// fails rather than skipping entries.
    pub fn resolve(&self, query: &LineageQuery) -> Result<Graph, LineageError> {
        let mut result = Graph::new();
        if !self.table.contains(query.root) {
            return Ok(result);
        }

        for raw in self.closure(query) {
            let id = VertexId(raw);
            let vertex = self
                .table
                .get(id)
                .ok_or(LineageError::MissingVertexRecord { id })?;
            result.put_vertex(vertex.clone());
        }
        Ok(result)
    }
}
