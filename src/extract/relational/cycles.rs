//! Foreign-key cycle detection
//!
//! Builds a directed graph whose nodes are `table.column` pairs and whose
//! edges are the foreign-key column pairs, enumerates closed walks by
//! depth-first search from every node, and deduplicates them by a
//! rotation-normalized form so the same cycle discovered from different start
//! nodes counts once. Cannot fail: every graph, including the empty one, has
//! a well-defined cycle set.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graphmap::DiGraphMap;

use super::catalog::ForeignKeyEdge;

/// Distinct cycles, each as the chain of foreign-key edges that closes it.
pub(crate) fn find_cycles(edges: &[ForeignKeyEdge]) -> Vec<Vec<ForeignKeyEdge>> {
    // Stable node ids: sorted `table.column` keys.
    let keys: BTreeSet<String> = edges
        .iter()
        .flat_map(|edge| [edge.source(), edge.target()])
        .collect();
    let keys: Vec<String> = keys.into_iter().collect();
    let ids: BTreeMap<&str, u32> = keys
        .iter()
        .enumerate()
        .map(|(index, key)| (key.as_str(), index as u32))
        .collect();

    let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();
    for edge in edges {
        graph.add_edge(ids[edge.source().as_str()], ids[edge.target().as_str()], ());
    }

    let mut seen = BTreeSet::new();
    let mut cycles = Vec::new();
    for start in 0..keys.len() as u32 {
        if !graph.contains_node(start) {
            continue;
        }
        let mut path = Vec::new();
        walk(&graph, start, &mut path, &mut seen, &mut cycles);
    }

    cycles
        .into_iter()
        .map(|cycle| to_edge_chain(&cycle, &keys, edges))
        .collect()
}

/// DFS accumulating the visited-node path; revisiting a node already on the
/// path emits the suffix from its first occurrence as one closed walk.
fn walk(
    graph: &DiGraphMap<u32, ()>,
    node: u32,
    path: &mut Vec<u32>,
    seen: &mut BTreeSet<Vec<u32>>,
    cycles: &mut Vec<Vec<u32>>,
) {
    if let Some(position) = path.iter().position(|&n| n == node) {
        let cycle = normalize(&path[position..]);
        if seen.insert(cycle.clone()) {
            cycles.push(cycle);
        }
        return;
    }
    path.push(node);
    let mut next: Vec<u32> = graph.neighbors(node).collect();
    next.sort_unstable();
    for neighbor in next {
        walk(graph, neighbor, path, seen, cycles);
    }
    path.pop();
}

/// Rotate a closed walk so its smallest node comes first; this is the
/// canonical form cycles are deduplicated by.
fn normalize(cycle: &[u32]) -> Vec<u32> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, &node)| node)
        .map(|(index, _)| index)
        .unwrap_or(0);
    let mut rotated: Vec<u32> = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[pivot..]);
    rotated.extend_from_slice(&cycle[..pivot]);
    rotated
}

/// Translate a node cycle back to the originating foreign-key edge objects by
/// matching table/column pairs. Distinct constraints over the same column
/// pair all join the chain, so exclusion selects among every candidate.
fn to_edge_chain(cycle: &[u32], keys: &[String], edges: &[ForeignKeyEdge]) -> Vec<ForeignKeyEdge> {
    let mut chain = Vec::with_capacity(cycle.len());
    for index in 0..cycle.len() {
        let from = &keys[cycle[index] as usize];
        let to = &keys[cycle[(index + 1) % cycle.len()] as usize];
        for edge in edges
            .iter()
            .filter(|edge| &edge.source() == from && &edge.target() == to)
        {
            chain.push(edge.clone());
        }
    }
    chain
}

/// Constraint names excluded from weak-entity determination: per cycle, the
/// edge whose constraint has the largest column count (the widest composite
/// key is the more likely true identifying relationship). Ties resolve to the
/// lexicographically smallest constraint name.
pub(crate) fn excluded_constraints(edges: &[ForeignKeyEdge]) -> BTreeSet<String> {
    let mut excluded = BTreeSet::new();
    for cycle in find_cycles(edges) {
        let selected = cycle.iter().max_by(|a, b| {
            a.column_count
                .cmp(&b.column_count)
                .then_with(|| b.constraint_name.cmp(&a.constraint_name))
        });
        if let Some(edge) = selected {
            excluded.insert(edge.constraint_name.clone());
        }
    }
    excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(
        foreign: &str,
        fk_column: &str,
        primary: &str,
        pk_column: &str,
        constraint: &str,
    ) -> ForeignKeyEdge {
        ForeignKeyEdge {
            foreign_table: foreign.to_string(),
            constraint_name: constraint.to_string(),
            fk_column: fk_column.to_string(),
            nullable: false,
            ordinal: 1,
            primary_table: primary.to_string(),
            pk_column: pk_column.to_string(),
            column_count: 1,
        }
    }

    #[test]
    fn test_no_edges_no_cycles() {
        assert!(find_cycles(&[]).is_empty());
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let edges = vec![
            edge("Book", "author_id", "Author", "id", "book_author_fkey"),
            edge("Review", "book_id", "Book", "id", "review_book_fkey"),
        ];
        assert!(find_cycles(&edges).is_empty());
    }

    #[test]
    fn test_two_table_cycle_found_once() {
        // Primary keys that are themselves foreign keys chain at the column
        // level: A.id -> B.id -> A.id.
        let edges = vec![
            edge("A", "id", "B", "id", "a_b_fkey"),
            edge("B", "id", "A", "id", "b_a_fkey"),
        ];
        let cycles = find_cycles(&edges);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_cycle_set_invariant_to_edge_order() {
        let forward = vec![
            edge("A", "id", "B", "id", "a_b_fkey"),
            edge("B", "id", "C", "id", "b_c_fkey"),
            edge("C", "id", "A", "id", "c_a_fkey"),
            edge("D", "a_id", "A", "id", "d_a_fkey"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let names = |cycles: Vec<Vec<ForeignKeyEdge>>| -> BTreeSet<Vec<String>> {
            cycles
                .into_iter()
                .map(|cycle| cycle.into_iter().map(|e| e.constraint_name).collect())
                .collect()
        };
        assert_eq!(names(find_cycles(&forward)), names(find_cycles(&reversed)));
        assert_eq!(find_cycles(&forward).len(), 1);
    }

    #[test]
    fn test_exclusion_prefers_widest_constraint() {
        let mut wide = edge("A", "id", "B", "id", "a_b_fkey");
        wide.column_count = 2;
        let mut narrow = edge("B", "id", "A", "id", "b_a_fkey");
        narrow.column_count = 1;
        let excluded = excluded_constraints(&[wide, narrow]);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec!["a_b_fkey"]);
    }

    #[test]
    fn test_exclusion_tie_breaks_lexicographically() {
        let a = edge("A", "id", "B", "id", "zz_fkey");
        let b = edge("B", "id", "A", "id", "aa_fkey");
        let excluded = excluded_constraints(&[a, b]);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec!["aa_fkey"]);
    }

    #[test]
    fn test_parallel_constraints_all_compete_for_exclusion() {
        // Two constraints over the same column pair: the wider one wins even
        // when it is not listed first.
        let narrow = edge("A", "id", "B", "id", "a_b_narrow");
        let mut wide = edge("A", "id", "B", "id", "a_b_wide");
        wide.column_count = 2;
        let back = edge("B", "id", "A", "id", "b_a_fkey");
        let excluded = excluded_constraints(&[narrow, wide, back]);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec!["a_b_wide"]);
    }

    #[test]
    fn test_table_self_reference_is_not_a_column_cycle() {
        // The graph is column-level: manager_id -> id is one edge between two
        // distinct nodes, not a closed walk.
        let edges = vec![edge("Employee", "manager_id", "Employee", "id", "mgr_fkey")];
        assert!(find_cycles(&edges).is_empty());
    }
}
