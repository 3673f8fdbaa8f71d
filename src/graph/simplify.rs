// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Reduce a freshly built graph to a minimal node set.
//!
//! Each iteration runs three passes:
//! 1. split nodes where a neighbour's positions cover only part of their interval,
//! 2. coalesce identical nodes with adjacent intervals and the same neighbours,
//! 3. merge unbranched chains of equal width.
//!
//! Iterations stop once no pass changes the graph, or after a configurable maximum.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::graph::node::KmerNode;
use crate::graph::{KmerPathGraph, NodeId};
use crate::kmer::Kmer;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct SimplificationStats {
    iterations: usize,
    splits: usize,
    coalesced: usize,
    merged: usize,
    /// Whether a fixpoint was reached before the iteration cap.
    converged: bool,
}

/// Simplify the graph in place.
pub fn simplify(graph: &mut KmerPathGraph, max_iterations: usize) -> SimplificationStats {
    let mut stats = SimplificationStats::default();
    while stats.iterations < max_iterations {
        stats.iterations += 1;

        let splits = split_pass(graph);
        check(graph);
        let coalesced = coalesce_pass(graph);
        check(graph);
        let merged = merge_pass(graph);
        check(graph);

        debug!(
            "simplification iteration {}: {} splits, {} coalesced, {} merged, {} nodes",
            stats.iterations,
            splits,
            coalesced,
            merged,
            graph.node_count()
        );
        stats.splits += splits;
        stats.coalesced += coalesced;
        stats.merged += merged;

        if splits + coalesced + merged == 0 {
            stats.converged = true;
            break;
        }
    }
    if !stats.converged {
        warn!(
            "graph simplification stopped after {} iterations without reaching a fixpoint",
            stats.iterations
        );
    }
    stats
}

fn check(graph: &KmerPathGraph) {
    if cfg!(debug_assertions) {
        graph.assert_consistent();
    }
}

/// Smallest start position within the first k-mer interval of the node at which a neighbour's
/// coverage begins or ends.
fn split_position(graph: &KmerPathGraph, id: NodeId) -> Option<i64> {
    let node = &graph[id];
    let (start, end) = (node.first_start(), node.first_end());
    let length = node.length() as i64;

    let from_prev = node.prev().iter().flat_map(|p| {
        let pred = &graph[*p];
        vec![
            (pred.start_position() + 1).max(start),
            (pred.end_position() + 1).min(end) + 1,
        ]
    });
    // successor positions are relative to the last k-mer, shift them back to the first one
    let from_next = node.next().iter().flat_map(|n| {
        let succ = &graph[*n];
        vec![
            succ.first_start().max(start + length) - length,
            succ.first_end().min(end + length) + 1 - length,
        ]
    });

    from_prev
        .chain(from_next)
        .filter(|pos| *pos > start && *pos <= end)
        .min()
}

fn split_pass(graph: &mut KmerPathGraph) -> usize {
    let mut splits = 0;
    let mut pending = graph.node_ids();
    while let Some(id) = pending.pop() {
        if !graph[id].is_valid() {
            continue;
        }
        if let Some(pos) = split_position(graph, id) {
            let head = graph.split_at_start_position(id, pos);
            splits += 1;
            // neighbours see narrower intervals now and may need splitting themselves
            for node in [head, id].iter() {
                pending.extend(graph[*node].prev().iter().chain(graph[*node].next()));
            }
            pending.push(head);
            pending.push(id);
        }
    }
    splits
}

fn neighbour_sets(graph: &KmerPathGraph, id: NodeId, alias: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
    let normalize = |neighbours: &[NodeId]| {
        neighbours
            .iter()
            .map(|n| if *n == alias { id } else { *n })
            .sorted()
            .dedup()
            .collect_vec()
    };
    (normalize(graph[id].prev()), normalize(graph[id].next()))
}

fn coalesce_pass(graph: &mut KmerPathGraph) -> usize {
    let mut groups: BTreeMap<(Vec<Kmer>, Vec<u32>, bool), Vec<NodeId>> = BTreeMap::new();
    for (id, node) in graph.iter() {
        groups
            .entry((node.kmers().to_vec(), node.weights().to_vec(), node.is_reference()))
            .or_default()
            .push(id);
    }

    let mut coalesced = 0;
    for mut ids in groups.into_iter().map(|(_, ids)| ids).filter(|ids| ids.len() > 1) {
        ids.sort_by_key(|id| graph[*id].first_start());
        let mut current = ids[0];
        for &id in &ids[1..] {
            if graph.can_coalesce(id, current)
                && neighbour_sets(graph, id, current) == neighbour_sets(graph, current, id)
            {
                graph.coalesce_adjacent(id, current);
                coalesced += 1;
            }
            current = id;
        }
    }
    coalesced
}

/// The only successor of the node if both form an unbranched chain of equal width.
fn unbranched_successor(graph: &KmerPathGraph, id: NodeId) -> Option<NodeId> {
    let node = &graph[id];
    if node.next().len() != 1 {
        return None;
    }
    let next_id = node.next()[0];
    let next = &graph[next_id];
    if next_id != id
        && next.prev().len() == 1
        && node.width() == next.width()
        && node.is_reference() == next.is_reference()
        && node.start_position() + 1 == next.first_start()
    {
        Some(next_id)
    } else {
        None
    }
}

fn merge_pass(graph: &mut KmerPathGraph) -> usize {
    let mut merged = 0;
    for id in graph.node_ids() {
        if !graph[id].is_valid() {
            continue;
        }
        if let Some(next) = unbranched_successor(graph, id) {
            graph.prepend_node(next, id);
            merged += 1;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{kpn, kpn1};

    fn graph() -> KmerPathGraph {
        KmerPathGraph::new(4).unwrap()
    }

    #[test]
    fn test_merges_unbranched_chain() {
        let mut g = graph();
        let pn = kpn(&mut g, &[0, 1, 2, 3, 4], &[1, 2, 3, 4, 5], 1, 10, true);
        g.split_at_length(pn, 2);
        g.split_at_length(pn, 1);
        assert_eq!(g.node_count(), 3);

        let stats = simplify(&mut g, 10);
        assert!(stats.converged());
        assert_eq!(stats.merged(), 2);
        assert_eq!(stats.splits(), 0);
        assert_eq!(g.node_ids(), vec![pn]);
        assert_eq!(g[pn].kmers(), &[0, 1, 2, 3, 4]);
        assert_eq!(g[pn].weight(), 15);
        assert_eq!(g[pn].first_start(), 1);
        assert_eq!(g[pn].first_end(), 10);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["merged"], 2);
        assert_eq!(json["converged"], true);
    }

    #[test]
    fn test_splits_partially_covered_node() {
        let mut g = graph();
        let p = kpn1(&mut g, &[0], 1, 1, true);
        let b = kpn1(&mut g, &[1], 1, 10, true);
        g.add_edge(p, b);

        let stats = simplify(&mut g, 10);
        assert!(stats.converged());
        assert_eq!(stats.splits(), 2);
        assert_eq!(stats.merged(), 1);
        assert_eq!(stats.iterations(), 2);
        assert_eq!(g.node_count(), 3);

        let intervals = g
            .iter()
            .map(|(_, node)| (node.first_start(), node.first_end(), node.length()))
            .sorted()
            .collect_vec();
        assert_eq!(intervals, vec![(1, 1, 1), (1, 1, 2), (3, 10, 1)]);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_split_merge_and_coalesce() {
        let mut g = graph();
        let p = kpn1(&mut g, &[0], 2, 9, true);
        let a = kpn1(&mut g, &[1, 2], 3, 4, true);
        let b = kpn1(&mut g, &[1, 2], 5, 10, true);
        g.add_edge(p, a);
        g.add_edge(p, b);

        let stats = simplify(&mut g, 10);
        assert!(stats.converged());
        assert_eq!(stats.splits(), 1);
        assert_eq!(stats.merged(), 2);
        assert_eq!(stats.coalesced(), 1);
        assert_eq!(stats.iterations(), 3);

        let nodes = g.iter().collect_vec();
        assert_eq!(nodes.len(), 1);
        let (_, node) = nodes[0];
        assert_eq!(node.kmers(), &[0, 1, 2]);
        assert_eq!(node.first_start(), 2);
        assert_eq!(node.first_end(), 9);
    }

    #[test]
    fn test_identical_nodes_with_different_neighbours_are_kept() {
        let mut g = graph();
        let a = kpn1(&mut g, &[1, 2], 3, 4, true);
        let b = kpn1(&mut g, &[1, 2], 5, 6, true);
        let n = kpn1(&mut g, &[7], 7, 8, false);
        g.add_edge(b, n);

        let stats = simplify(&mut g, 10);
        assert!(stats.converged());
        assert_eq!(stats.coalesced(), 0);
        assert!(g[a].is_valid());
        assert!(g[b].is_valid());
    }

    #[test]
    fn test_iteration_cap() {
        let mut g = graph();
        let p = kpn1(&mut g, &[0], 2, 9, true);
        let a = kpn1(&mut g, &[1, 2], 3, 4, true);
        let b = kpn1(&mut g, &[1, 2], 5, 10, true);
        g.add_edge(p, a);
        g.add_edge(p, b);

        let stats = simplify(&mut g, 1);
        assert!(!stats.converged());
        assert_eq!(stats.iterations(), 1);
        g.assert_consistent();
    }
}
