// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::graph::NodeId;
use crate::kmer::Kmer;

/// A single k-mer valid over an interval of start positions.
pub trait KmerNode {
    fn kmer(&self) -> Kmer;

    /// First position at which the k-mer may start.
    fn start_position(&self) -> i64;

    /// Last position at which the k-mer may start.
    fn end_position(&self) -> i64;

    fn weight(&self) -> u32;

    fn is_reference(&self) -> bool;

    fn width(&self) -> i64 {
        self.end_position() - self.start_position() + 1
    }
}

#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImmutableKmerNode {
    kmer: Kmer,
    start: i64,
    end: i64,
    weight: u32,
    reference: bool,
}

impl KmerNode for ImmutableKmerNode {
    fn kmer(&self) -> Kmer {
        self.kmer
    }

    fn start_position(&self) -> i64 {
        self.start
    }

    fn end_position(&self) -> i64 {
        self.end
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn is_reference(&self) -> bool {
        self.reference
    }
}

/// A chain of consecutive k-mers sharing one interval width.
///
/// Offset `i` of the chain may start anywhere in `[start + i, end + i]`. Edges are kept
/// by the owning `KmerPathGraph`; `next` is sorted by the first-offset start position of the
/// successors, `prev` by the last-offset start position of the predecessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerPathNode {
    pub(crate) kmers: Vec<Kmer>,
    pub(crate) weights: Vec<u32>,
    pub(crate) total_weight: u32,
    pub(crate) start: i64,
    pub(crate) end: i64,
    pub(crate) reference: bool,
    pub(crate) valid: bool,
    pub(crate) next: Vec<NodeId>,
    pub(crate) prev: Vec<NodeId>,
}

impl KmerPathNode {
    pub fn new<N: KmerNode>(node: &N) -> Self {
        Self::from_kmer(
            node.kmer(),
            node.weight(),
            node.start_position(),
            node.end_position(),
            node.is_reference(),
        )
    }

    pub fn from_kmer(kmer: Kmer, weight: u32, start: i64, end: i64, reference: bool) -> Self {
        assert!(end >= start, "bug: node interval end {} before start {}", end, start);
        KmerPathNode {
            kmers: vec![kmer],
            weights: vec![weight],
            total_weight: weight,
            start,
            end,
            reference,
            valid: true,
            next: Vec::new(),
            prev: Vec::new(),
        }
    }

    /// Number of k-mers in the chain.
    pub fn length(&self) -> usize {
        self.kmers.len()
    }

    pub fn kmer_at(&self, offset: usize) -> Kmer {
        self.kmers[offset]
    }

    pub fn kmers(&self) -> &[Kmer] {
        &self.kmers
    }

    pub fn weight_at(&self, offset: usize) -> u32 {
        self.weights[offset]
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    pub fn start_position_at(&self, offset: usize) -> i64 {
        self.start + offset as i64
    }

    pub fn end_position_at(&self, offset: usize) -> i64 {
        self.end + offset as i64
    }

    /// First start position of the first k-mer.
    pub fn first_start(&self) -> i64 {
        self.start
    }

    /// Last start position of the first k-mer.
    pub fn first_end(&self) -> i64 {
        self.end
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn next(&self) -> &[NodeId] {
        &self.next
    }

    pub fn prev(&self) -> &[NodeId] {
        &self.prev
    }

    fn last_offset(&self) -> usize {
        self.kmers.len() - 1
    }

    /// Return true if `other` may genomically follow this node, i.e. the positions of the
    /// last k-mer shifted by one intersect the positions of the first k-mer of `other`.
    pub fn precedes(&self, other: &KmerPathNode) -> bool {
        self.start_position() + 1 <= other.first_end()
            && other.first_start() <= self.end_position() + 1
    }

    /// Return true if `node` continues the chain exactly one position after its last k-mer.
    pub(crate) fn continued_by<N: KmerNode>(&self, node: &N) -> bool {
        node.start_position() == self.start_position() + 1
            && node.end_position() == self.end_position() + 1
            && node.is_reference() == self.reference
    }

    /// Return true if `node` continues the chain exactly one position before its first k-mer.
    pub(crate) fn preceded_by<N: KmerNode>(&self, node: &N) -> bool {
        node.start_position() + 1 == self.start
            && node.end_position() + 1 == self.end
            && node.is_reference() == self.reference
    }
}

/// A path node viewed as a single k-mer is its last k-mer.
impl KmerNode for KmerPathNode {
    fn kmer(&self) -> Kmer {
        self.kmers[self.last_offset()]
    }

    fn start_position(&self) -> i64 {
        self.start_position_at(self.last_offset())
    }

    fn end_position(&self) -> i64 {
        self.end_position_at(self.last_offset())
    }

    fn weight(&self) -> u32 {
        self.total_weight
    }

    fn is_reference(&self) -> bool {
        self.reference
    }
}
