// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Summation of k-mer support across evidence.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::graph::node::{ImmutableKmerNode, KmerNode};
use crate::kmer::Kmer;

/// Change of support at a start position: summed weight, number of supporting nodes and
/// number of anchored ones.
#[derive(Debug, Default, Clone, Copy)]
struct Delta {
    weight: i64,
    count: i64,
    reference: i64,
}

/// Combine the support of identical k-mers whose start position intervals overlap.
///
/// Every k-mer and start position is covered by at most one of the returned nodes. Its
/// weight is the sum of all support at that position, and it is a reference k-mer if any of
/// that support is anchored. Neighbouring positions with equal weight and reference flag
/// share a node. Nodes are ordered by start position, then k-mer.
pub fn aggregate<N, I>(support: I) -> Vec<ImmutableKmerNode>
where
    N: KmerNode,
    I: IntoIterator<Item = N>,
{
    let mut deltas: BTreeMap<Kmer, BTreeMap<i64, Delta>> = BTreeMap::new();
    for node in support {
        let positions = deltas.entry(node.kmer()).or_default();
        let reference = node.is_reference() as i64;
        let weight = node.weight() as i64;

        let open = positions.entry(node.start_position()).or_default();
        open.weight += weight;
        open.count += 1;
        open.reference += reference;
        let close = positions.entry(node.end_position() + 1).or_default();
        close.weight -= weight;
        close.count -= 1;
        close.reference -= reference;
    }

    let mut aggregated = Vec::new();
    for (kmer, positions) in deltas {
        let mut current = Delta::default();
        let mut pending: Option<ImmutableKmerNode> = None;
        for ((&position, delta), (&next_position, _)) in
            positions.iter().zip(positions.iter().skip(1))
        {
            current.weight += delta.weight;
            current.count += delta.count;
            current.reference += delta.reference;
            if current.count == 0 {
                aggregated.extend(pending.take());
                continue;
            }

            let weight = u32::try_from(current.weight).unwrap_or(u32::MAX);
            let reference = current.reference > 0;
            pending = match pending {
                Some(node)
                    if node.end_position() + 1 == position
                        && node.weight() == weight
                        && node.is_reference() == reference =>
                {
                    Some(ImmutableKmerNode::new(
                        kmer,
                        node.start_position(),
                        next_position - 1,
                        weight,
                        reference,
                    ))
                }
                previous => {
                    aggregated.extend(previous);
                    Some(ImmutableKmerNode::new(
                        kmer,
                        position,
                        next_position - 1,
                        weight,
                        reference,
                    ))
                }
            };
        }
        aggregated.extend(pending);
    }

    aggregated.sort_by_key(|node| (node.start_position(), node.kmer(), node.end_position()));
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support(kmer: Kmer, start: i64, end: i64, weight: u32, reference: bool) -> ImmutableKmerNode {
        ImmutableKmerNode::new(kmer, start, end, weight, reference)
    }

    #[test]
    fn test_identical_support_is_summed() {
        let aggregated = aggregate(vec![
            support(7, 10, 10, 30, true),
            support(7, 10, 10, 20, true),
        ]);
        assert_eq!(aggregated, vec![support(7, 10, 10, 50, true)]);
    }

    #[test]
    fn test_overlapping_support_is_split_at_interval_boundaries() {
        let aggregated = aggregate(vec![
            support(1, 1, 10, 2, false),
            support(1, 5, 20, 3, false),
        ]);
        assert_eq!(
            aggregated,
            vec![
                support(1, 1, 4, 2, false),
                support(1, 5, 10, 5, false),
                support(1, 11, 20, 3, false),
            ]
        );
    }

    #[test]
    fn test_any_anchored_support_makes_reference() {
        let aggregated = aggregate(vec![
            support(1, 1, 10, 1, false),
            support(1, 4, 4, 1, true),
        ]);
        assert_eq!(
            aggregated,
            vec![
                support(1, 1, 3, 1, false),
                support(1, 4, 4, 2, true),
                support(1, 5, 10, 1, false),
            ]
        );
    }

    #[test]
    fn test_distinct_kmers_and_gaps_stay_apart() {
        let aggregated = aggregate(vec![
            support(2, 1, 2, 1, false),
            support(1, 1, 2, 1, false),
            support(1, 5, 6, 1, false),
            // touching intervals with equal support form one node
            support(2, 3, 4, 1, false),
        ]);
        assert_eq!(
            aggregated,
            vec![
                support(1, 1, 2, 1, false),
                support(2, 1, 4, 1, false),
                support(1, 5, 6, 1, false),
            ]
        );
    }
}
