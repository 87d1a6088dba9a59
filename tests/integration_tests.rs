//! Workspace integration tests: drive the whole stack through the
//! host-facing `ProvenanceStorage` contract, the way the host system does.

use provgraph_lineage::{Direction, LineageQuery, VertexId};
use provgraph_model::{Edge, Vertex};
use provgraph_storage::{LineageStorage, ProvenanceStorage, StorageConfig};

/// A small process-provenance fixture:
///
/// ```text
/// init (0)
///   ▲
///   │
/// shell (1)
///   ▲     ▲
///   │     │
/// build(2) test(3)
///   ▲
///   │
/// compile (4)
/// ```
///
/// Edges point child -> parent (source is the child).
fn process_tree() -> (LineageStorage, Vec<Vertex>) {
    let mut storage = LineageStorage::new();
    assert!(storage.initialize(""));

    let names = ["init", "shell", "build", "test", "compile"];
    let vertices: Vec<Vertex> = names
        .iter()
        .enumerate()
        .map(|(pid, name)| {
            Vertex::from_annotations([
                ("type", "Process".to_string()),
                ("name", name.to_string()),
                ("pid", pid.to_string()),
            ])
        })
        .collect();
    for v in &vertices {
        assert!(storage.put_vertex(v.clone()));
    }

    for (child, parent) in [(1, 0), (2, 1), (3, 1), (4, 2)] {
        let mut edge = Edge::new(vertices[child].clone(), vertices[parent].clone());
        edge.add_annotation("operation", "forked");
        assert!(storage.put_edge(edge));
    }

    (storage, vertices)
}

fn digests(vertices: &[Vertex], indexes: &[usize]) -> Vec<String> {
    let mut out: Vec<String> = indexes.iter().map(|&i| vertices[i].digest()).collect();
    out.sort();
    out
}

#[test]
fn full_ancestry_of_a_leaf_process() {
    let (storage, vertices) = process_tree();

    let result = storage.get_lineage("4", 0, "ancestors", "").unwrap();
    assert_eq!(result.vertex_digests(), digests(&vertices, &[0, 1, 2]));
    assert_eq!(result.edge_count(), 0, "result graphs are vertex-only");
}

#[test]
fn root_process_has_no_ancestors() {
    let (storage, _) = process_tree();
    let result = storage.get_lineage("0", 0, "ancestors", "").unwrap();
    assert!(result.is_empty());
}

#[test]
fn descendant_query_finds_the_whole_subtree() {
    let (storage, vertices) = process_tree();
    let result = storage.get_lineage("1", 0, "descendants", "").unwrap();
    assert_eq!(result.vertex_digests(), digests(&vertices, &[2, 3, 4]));
}

#[test]
fn depth_and_terminator_prune_the_traversal() {
    let (storage, vertices) = process_tree();

    let one_hop = storage.get_lineage("4", 1, "ancestors", "").unwrap();
    assert_eq!(one_hop.vertex_digests(), digests(&vertices, &[2]));

    let stopped = storage.get_lineage("4", 0, "ancestors", "1").unwrap();
    assert_eq!(stopped.vertex_digests(), digests(&vertices, &[1, 2]));
}

#[test]
fn queries_do_not_mutate_the_store() {
    let (storage, _) = process_tree();
    let base = storage.base();

    let before = (base.read().vertex_count(), base.read().fact_count());
    let first = storage.get_lineage("4", 0, "both", "").unwrap();
    let second = storage.get_lineage("4", 0, "both", "").unwrap();
    let after = (base.read().vertex_count(), base.read().fact_count());

    assert_eq!(before, after);
    assert_eq!(first.vertex_digests(), second.vertex_digests());
}

#[test]
fn later_ingest_extends_earlier_lineage_answers() {
    let (storage, vertices) = process_tree();

    let before = storage.get_lineage("3", 0, "descendants", "").unwrap();
    assert!(before.is_empty());

    let spawned = Vertex::from_annotations([("type", "Process"), ("name", "spawned")]);
    assert!(storage.put_vertex(spawned.clone()));
    assert!(storage.put_edge(Edge::new(spawned.clone(), vertices[3].clone())));

    let after = storage.get_lineage("3", 0, "descendants", "").unwrap();
    assert_eq!(after.vertex_digests(), vec![spawned.digest()]);
}

#[test]
fn typed_and_boundary_entry_points_agree() {
    let (storage, _) = process_tree();

    let query = LineageQuery {
        root: VertexId::new(4),
        direction: Direction::Ancestors,
        max_depth: Some(2),
        terminator: None,
    };
    let typed = storage.resolve_lineage(query).unwrap();
    let boundary = storage.get_lineage("4", 2, "ancestors", "").unwrap();
    assert_eq!(typed.vertex_digests(), boundary.vertex_digests());
}

#[test]
fn configuration_round_trips_through_initialize() {
    let config = StorageConfig {
        vertex_capacity: 128,
        default_direction: Direction::Both,
    };
    let arguments = serde_json::to_string(&config).unwrap();

    let mut storage = LineageStorage::new();
    assert!(storage.initialize(&arguments));
    assert_eq!(storage.config().vertex_capacity, 128);
    assert_eq!(storage.config().default_direction, Direction::Both);
}

#[test]
fn malformed_queries_fail_uniformly_while_valid_ones_still_answer() {
    let (storage, vertices) = process_tree();

    assert!(storage.get_lineage("", 0, "ancestors", "").is_none());
    assert!(storage.get_lineage("4", 0, "up", "").is_none());

    let result = storage.get_lineage("4", 0, "", "").unwrap();
    assert_eq!(result.vertex_digests(), digests(&vertices, &[0, 1, 2]));
}
