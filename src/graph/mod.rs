// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Compressed positional de Bruijn graph.
//!
//! Nodes live in an arena and refer to each other by `NodeId`. A node that is merged
//! into another one or invalidated keeps its slot, so handles stay stable for the
//! lifetime of the graph.

pub mod aggregate;
pub mod node;
pub mod simplify;

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::ops::Index;

use anyhow::Result;
use itertools::Itertools;

use crate::evidence::Evidence;
use crate::kmer::{self, Kmer};

pub use self::node::{ImmutableKmerNode, KmerNode, KmerPathNode};

/// Stable handle of a node in a `KmerPathGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, CopyGetters)]
pub struct KmerPathGraph {
    #[getset(get_copy = "pub")]
    k: usize,
    nodes: Vec<KmerPathNode>,
}

impl Index<NodeId> for KmerPathGraph {
    type Output = KmerPathNode;

    fn index(&self, id: NodeId) -> &KmerPathNode {
        &self.nodes[id.0]
    }
}

impl KmerPathGraph {
    pub fn new(k: usize) -> Result<Self> {
        kmer::check_k(k)?;
        Ok(KmerPathGraph {
            k,
            nodes: Vec::new(),
        })
    }

    /// Add a node without edges.
    pub fn add_node(&mut self, node: KmerPathNode) -> NodeId {
        assert!(
            node.next.is_empty() && node.prev.is_empty(),
            "bug: nodes must be added without edges"
        );
        assert!(node.is_valid(), "bug: adding invalidated node");
        self.push(node)
    }

    /// Add a single k-mer node.
    pub fn add_kmer_node<N: KmerNode>(&mut self, node: &N) -> NodeId {
        self.push(KmerPathNode::new(node))
    }

    fn push(&mut self, node: KmerPathNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut KmerPathNode {
        &mut self.nodes[id.0]
    }

    /// All valid nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &KmerPathNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_valid())
            .map(|(i, node)| (NodeId(i), node))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Number of valid nodes.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    pub fn edge_count(&self) -> usize {
        self.iter().map(|(_, node)| node.next().len()).sum()
    }

    pub fn total_weight(&self) -> u64 {
        self.iter().map(|(_, node)| node.weight() as u64).sum()
    }

    fn next_key(&self, id: NodeId) -> (i64, NodeId) {
        (self[id].first_start(), id)
    }

    fn prev_key(&self, id: NodeId) -> (i64, NodeId) {
        (self[id].start_position(), id)
    }

    fn sort_edges(&mut self, id: NodeId) {
        let mut next = mem::take(&mut self.node_mut(id).next);
        next.sort_by_key(|n| self.next_key(*n));
        let mut prev = mem::take(&mut self.node_mut(id).prev);
        prev.sort_by_key(|p| self.prev_key(*p));
        let node = self.node_mut(id);
        node.next = next;
        node.prev = prev;
    }

    /// Restore edge order of the node and its neighbours after its positions or length changed.
    fn touch(&mut self, id: NodeId) {
        let neighbours = self[id]
            .prev
            .iter()
            .chain(self[id].next.iter())
            .cloned()
            .unique()
            .collect_vec();
        self.sort_edges(id);
        for neighbour in neighbours {
            self.sort_edges(neighbour);
        }
    }

    /// Insert an edge `from -> to`, keeping both edge lists sorted. Existing edges are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        assert!(
            self[from].is_valid() && self[to].is_valid(),
            "bug: edge {} -> {} involves an invalidated node",
            from,
            to
        );
        assert!(
            self[from].precedes(&self[to]),
            "bug: edge {} -> {} violates positional adjacency",
            from,
            to
        );
        if self[from].next.contains(&to) {
            return;
        }

        let key = self.next_key(to);
        let i = self[from]
            .next
            .partition_point(|n| self.next_key(*n) < key);
        self.node_mut(from).next.insert(i, to);

        let key = self.prev_key(from);
        let i = self[to].prev.partition_point(|p| self.prev_key(*p) < key);
        self.node_mut(to).prev.insert(i, from);
    }

    fn remove_from(list: &mut Vec<NodeId>, id: NodeId) {
        list.retain(|other| *other != id);
    }

    /// Add each edge between the given predecessors and successors that satisfies positional
    /// adjacency.
    fn connect_admissible(&mut self, from: &[NodeId], to: &[NodeId]) {
        for &a in from {
            for &b in to {
                if self[a].precedes(&self[b]) {
                    self.add_edge(a, b);
                }
            }
        }
    }

    /// Extend the chain by one k-mer at its end.
    pub fn append<N: KmerNode>(&mut self, id: NodeId, node: &N) {
        assert!(self[id].is_valid(), "bug: appending to invalidated node {}", id);
        assert!(
            self[id].continued_by(node),
            "bug: appended k-mer at {}-{} does not continue node {}",
            node.start_position(),
            node.end_position(),
            id
        );
        let pn = self.node_mut(id);
        pn.kmers.push(node.kmer());
        pn.weights.push(node.weight());
        pn.total_weight += node.weight();
        self.touch(id);
    }

    /// Extend the chain by one k-mer at its start.
    pub fn prepend<N: KmerNode>(&mut self, id: NodeId, node: &N) {
        assert!(self[id].is_valid(), "bug: prepending to invalidated node {}", id);
        assert!(
            self[id].preceded_by(node),
            "bug: prepended k-mer at {}-{} does not precede node {}",
            node.start_position(),
            node.end_position(),
            id
        );
        let pn = self.node_mut(id);
        pn.kmers.insert(0, node.kmer());
        pn.weights.insert(0, node.weight());
        pn.total_weight += node.weight();
        pn.start -= 1;
        pn.end -= 1;
        self.touch(id);
    }

    /// Splice the whole chain of `other` in front of the chain of `id`.
    ///
    /// The predecessors of `other` become predecessors of `id`, and `other` is retired.
    pub fn prepend_node(&mut self, id: NodeId, other: NodeId) {
        assert_ne!(id, other, "bug: prepending node {} to itself", id);
        assert!(
            self[id].is_valid() && self[other].is_valid(),
            "bug: prepending with invalidated node"
        );
        assert!(
            self[id].preceded_by(&self[other]),
            "bug: node {} does not directly precede node {}",
            other,
            id
        );

        let absorbed = self[other].clone();
        let prev = absorbed.prev.clone();
        self.invalidate(other);

        let pn = self.node_mut(id);
        let mut kmers = absorbed.kmers;
        kmers.extend_from_slice(&pn.kmers);
        pn.kmers = kmers;
        let mut weights = absorbed.weights;
        weights.extend_from_slice(&pn.weights);
        pn.weights = weights;
        pn.total_weight += absorbed.total_weight;
        pn.start = absorbed.start;
        pn.end = absorbed.end;
        self.touch(id);

        let prev = prev
            .into_iter()
            .map(|p| if p == other { id } else { p })
            .collect_vec();
        self.connect_admissible(&prev, &[id]);
    }

    /// Split the chain after its first `length` k-mers.
    ///
    /// Returns the new node holding the first `length` k-mers and the predecessors of `id`.
    /// `id` keeps the remaining k-mers and its successors, and is connected to the new node.
    pub fn split_at_length(&mut self, id: NodeId, length: usize) -> NodeId {
        assert!(self[id].is_valid(), "bug: splitting invalidated node {}", id);
        assert!(
            length >= 1 && length < self[id].length(),
            "bug: split length {} out of range for node {} of length {}",
            length,
            id,
            self[id].length()
        );

        let pn = self.node_mut(id);
        let kmers: Vec<Kmer> = pn.kmers.drain(..length).collect();
        let weights: Vec<u32> = pn.weights.drain(..length).collect();
        let weight: u32 = weights.iter().sum();
        pn.total_weight -= weight;
        let head = KmerPathNode {
            kmers,
            weights,
            total_weight: weight,
            start: pn.start,
            end: pn.end,
            reference: pn.reference,
            valid: true,
            next: Vec::new(),
            prev: mem::take(&mut pn.prev),
        };
        pn.start += length as i64;
        pn.end += length as i64;

        let prev = head.prev.clone();
        let head_id = self.push(head);
        for p in prev {
            for n in self.node_mut(p).next.iter_mut() {
                if *n == id {
                    *n = head_id;
                }
            }
        }
        self.touch(head_id);
        self.touch(id);
        self.add_edge(head_id, id);

        head_id
    }

    /// Split the position interval so that `id` starts at `position`.
    ///
    /// Returns the new node covering `[start, position - 1]`, `id` keeps `[position, end]`.
    /// Both keep the full chain. Every edge is reassigned to each of the two nodes whose
    /// positions still admit it, so an edge may end up on both.
    pub fn split_at_start_position(&mut self, id: NodeId, position: i64) -> NodeId {
        assert!(self[id].is_valid(), "bug: splitting invalidated node {}", id);
        assert!(
            self[id].first_start() < position && position <= self[id].first_end(),
            "bug: split position {} out of range for node {} at {}-{}",
            position,
            id,
            self[id].first_start(),
            self[id].first_end()
        );

        let pn = self.node_mut(id);
        let prev = mem::take(&mut pn.prev);
        let next = mem::take(&mut pn.next);
        let mut head = pn.clone();
        head.end = position - 1;
        pn.start = position;

        for &p in &prev {
            if p != id {
                Self::remove_from(&mut self.node_mut(p).next, id);
            }
        }
        for &n in &next {
            if n != id {
                Self::remove_from(&mut self.node_mut(n).prev, id);
            }
        }

        let head_id = self.push(head);
        let both = [head_id, id];
        let expand = |neighbours: Vec<NodeId>| -> Vec<NodeId> {
            neighbours
                .into_iter()
                .flat_map(|n| if n == id { both.to_vec() } else { vec![n] })
                .collect()
        };
        let prev = expand(prev);
        let next = expand(next);
        self.connect_admissible(&prev, &both);
        self.connect_admissible(&both, &next);

        head_id
    }

    /// Return true if `other` can be merged into `id`: identical chains, weights and
    /// reference flag, with `other` ending directly before `id` starts.
    pub fn can_coalesce(&self, id: NodeId, other: NodeId) -> bool {
        let (a, b) = (&self[id], &self[other]);
        id != other
            && a.is_valid()
            && b.is_valid()
            && a.length() == b.length()
            && a.reference == b.reference
            && b.end + 1 == a.start
            && a.kmers == b.kmers
            && a.weights == b.weights
    }

    /// Merge `other` into `id`, widening the interval of `id` to cover both.
    pub fn coalesce_adjacent(&mut self, id: NodeId, other: NodeId) {
        assert!(
            self.can_coalesce(id, other),
            "bug: nodes {} and {} cannot be coalesced",
            id,
            other
        );
        let absorbed = self[other].clone();
        self.invalidate(other);

        self.node_mut(id).start = absorbed.start;
        self.touch(id);

        let rename = |neighbours: Vec<NodeId>| -> Vec<NodeId> {
            neighbours
                .into_iter()
                .map(|n| if n == other { id } else { n })
                .collect()
        };
        let prev = rename(absorbed.prev);
        let next = rename(absorbed.next);
        self.connect_admissible(&prev, &[id]);
        self.connect_admissible(&[id], &next);
    }

    /// Permanently retire the node and detach it from all neighbours.
    pub fn invalidate(&mut self, id: NodeId) {
        let pn = self.node_mut(id);
        pn.valid = false;
        let prev = mem::take(&mut pn.prev);
        let next = mem::take(&mut pn.next);
        for p in prev {
            Self::remove_from(&mut self.node_mut(p).next, id);
        }
        for n in next {
            Self::remove_from(&mut self.node_mut(n).prev, id);
        }
    }

    /// Insert the k-mers of the evidence as chains of path nodes.
    ///
    /// Ambiguous k-mers are skipped and break the chain. A change of the anchor flag starts
    /// a new node, connected to the previous one. Returns the created nodes.
    pub fn add_evidence(&mut self, evidence: &Evidence) -> Vec<NodeId> {
        assert_eq!(
            evidence.k(),
            self.k,
            "bug: evidence {} has a different k-mer length than the graph",
            evidence.id()
        );
        let mut created = Vec::new();
        let mut current: Option<NodeId> = None;
        for support in evidence.nodes() {
            let support = match support {
                Some(support) => support,
                None => {
                    current = None;
                    continue;
                }
            };
            match current {
                Some(id) if self[id].continued_by(&support) => self.append(id, &support),
                _ => {
                    let id = self.add_kmer_node(&support);
                    if let Some(prev) = current {
                        self.add_edge(prev, id);
                    }
                    created.push(id);
                    current = Some(id);
                }
            }
        }
        created
    }

    /// Insert the summed support of all evidence as single k-mer nodes, one per k-mer and
    /// start position, leaving edges to `link_kmer_adjacencies`. Returns the created nodes.
    pub fn add_aggregated_evidence<'a, I>(&mut self, evidence: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = &'a Evidence>,
    {
        let k = self.k;
        let support = evidence.into_iter().flat_map(|evidence| {
            assert_eq!(
                evidence.k(),
                k,
                "bug: evidence {} has a different k-mer length than the graph",
                evidence.id()
            );
            evidence.nodes().flatten()
        });
        aggregate::aggregate(support)
            .iter()
            .map(|node| self.add_kmer_node(node))
            .collect()
    }

    /// Connect every pair of nodes where the first k-mer of one is a de Bruijn successor of the
    /// last k-mer of the other at admissible positions. Returns the number of new edges.
    pub fn link_kmer_adjacencies(&mut self) -> usize {
        let mut by_first_kmer: HashMap<Kmer, Vec<NodeId>> = HashMap::new();
        for (id, node) in self.iter() {
            by_first_kmer.entry(node.kmer_at(0)).or_default().push(id);
        }

        let mut edges = Vec::new();
        for (id, node) in self.iter() {
            for successor in kmer::successors(node.kmer(), self.k) {
                for &candidate in by_first_kmer.get(&successor).into_iter().flatten() {
                    if node.precedes(&self[candidate]) && !node.next().contains(&candidate) {
                        edges.push((id, candidate));
                    }
                }
            }
        }

        let count = edges.len();
        for (from, to) in edges {
            self.add_edge(from, to);
        }
        count
    }

    /// Bases spelled by the chain of the node.
    pub fn base_sequence(&self, id: NodeId) -> Vec<u8> {
        let node = &self[id];
        let mut bases = kmer::decode(node.kmer_at(0), self.k);
        bases.extend(node.kmers()[1..].iter().map(|kmer| kmer::last_base(*kmer)));
        bases
    }

    /// Panic if any structural invariant of the graph is violated.
    pub fn assert_consistent(&self) {
        for (id, node) in self.iter() {
            assert!(node.length() >= 1, "bug: empty node {}", id);
            assert!(node.end >= node.start, "bug: node {} with negative width", id);
            assert_eq!(node.kmers.len(), node.weights.len());
            assert_eq!(
                node.weights.iter().sum::<u32>(),
                node.weight(),
                "bug: weight of node {} out of sync",
                id
            );
            for (a, b) in node.next().iter().tuple_windows() {
                assert!(self.next_key(*a) <= self.next_key(*b), "bug: next of {} unsorted", id);
            }
            for (a, b) in node.prev().iter().tuple_windows() {
                assert!(self.prev_key(*a) <= self.prev_key(*b), "bug: prev of {} unsorted", id);
            }
            for &n in node.next() {
                assert!(self[n].is_valid(), "bug: {} links to invalid {}", id, n);
                assert!(self[n].prev().contains(&id), "bug: asymmetric edge {} -> {}", id, n);
                assert!(node.precedes(&self[n]), "bug: inadmissible edge {} -> {}", id, n);
            }
            for &p in node.prev() {
                assert!(self[p].is_valid(), "bug: {} links to invalid {}", id, p);
                assert!(self[p].next().contains(&id), "bug: asymmetric edge {} -> {}", p, id);
            }
        }
    }
}
