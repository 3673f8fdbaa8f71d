// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;
use rust_htslib::bam::record::Cigar;

use positional_debruijn::evidence::{DiscordantPair, SoftClipEvidence};
use positional_debruijn::variants::{RawVariantRecord, VariantKind};
use positional_debruijn::{
    assemble_regions, AssemblyConfigBuilder, AssemblyRegion, BreakendDirection, Evidence,
    EvidenceSource, FragmentSizeBounds, ImmutableKmerNode, KmerNode, KmerPathGraph,
};

mod common;

use common::{aligned_read, init_logger, read_of_len, SEQ};

#[test]
fn test_path_node_from_chained_support_nodes() {
    let mut graph = KmerPathGraph::new(4).unwrap();
    let id = graph.add_kmer_node(&ImmutableKmerNode::new(0, 1, 1, 1, false));
    for i in 1..4 {
        graph.append(id, &ImmutableKmerNode::new(i, 1 + i as i64, 1 + i as i64, 1 + i as u32, false));
    }
    let node = &graph[id];
    assert_eq!(node.length(), 4);
    assert_eq!(node.weight(), 10);
    assert_eq!(
        (0..4).map(|i| node.start_position_at(i)).collect_vec(),
        vec![1, 2, 3, 4]
    );
}

macro_rules! soft_clip_anchor {
    ($name:ident, $len:expr, $end_clip:expr) => {
        #[test]
        fn $name() {
            let len: usize = $len;
            let end_clip: usize = $end_clip;
            let mut cigar = vec![Cigar::SoftClip(5), Cigar::Match((len - 5 - end_clip) as u32)];
            if end_clip > 0 {
                cigar.push(Cigar::SoftClip(end_clip as u32));
            }
            let read = read_of_len(100, cigar, len);
            let evidence = Evidence::from_soft_clip(
                4,
                &SoftClipEvidence::new(read, BreakendDirection::Forward),
                false,
            )
            .unwrap();
            let anchored = (0..evidence.len())
                .filter(|offset| evidence.is_anchored(*offset))
                .collect_vec();
            assert_eq!(anchored, (5..len - 3 - end_clip).collect_vec());
        }
    };
}

soft_clip_anchor!(test_soft_clip_anchor_20, 20, 0);
soft_clip_anchor!(test_soft_clip_anchor_20_end_clip, 20, 2);
soft_clip_anchor!(test_soft_clip_anchor_50, 50, 0);
soft_clip_anchor!(test_soft_clip_anchor_50_end_clip, 50, 10);

#[test]
fn test_discordant_pair_interval() {
    let pair = DiscordantPair::new(
        read_of_len(1000, vec![Cigar::Match(50)], 50),
        read_of_len(20000, vec![Cigar::Match(50)], 50),
        BreakendDirection::Forward,
        true,
        FragmentSizeBounds::new(100, 500),
    );
    let evidence = Evidence::from_read_pair(4, &pair).unwrap();
    assert_eq!(evidence.start(), 1050);
    assert_eq!(evidence.end(), 1450);
    assert!(evidence.nodes().all(|node| !node.unwrap().is_reference()));
}

#[test]
fn test_assemble_overlapping_soft_clips() {
    init_logger();
    let full = aligned_read(
        "r1",
        100,
        vec![Cigar::Match(15), Cigar::SoftClip(5)],
        SEQ,
    );
    let shifted = aligned_read(
        "r2",
        103,
        vec![Cigar::Match(12), Cigar::SoftClip(5)],
        &SEQ[3..],
    );
    let evidence = [&full, &shifted]
        .iter()
        .flat_map(|read| EvidenceSource::soft_clips(read))
        .collect_vec();
    let config = AssemblyConfigBuilder::default().k(4).build().unwrap();
    let assembled = assemble_regions(
        &config,
        &[AssemblyRegion::new("chr1".to_owned(), evidence)],
    )
    .unwrap();

    let region = &assembled[0];
    assert_eq!(region.accepted(), 2);
    assert!(region.stats().converged());
    let graph = region.graph();
    graph.assert_consistent();
    // the shared sequence collapses into one anchored and one clipped run
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    let (anchored, node) = graph.iter().find(|(_, node)| node.is_reference()).unwrap();
    assert_eq!(graph.base_sequence(anchored), &SEQ[..15]);
    assert_eq!(node.first_start(), 100);
    assert_eq!(node.start_position(), 111);
    assert_eq!(node.weights()[..3], [30, 30, 30]);
    assert!(node.weights()[3..].iter().all(|w| *w == 60));
    let (clipped, node) = graph.iter().find(|(_, node)| !node.is_reference()).unwrap();
    assert_eq!(graph.base_sequence(clipped), &SEQ[12..]);
    assert_eq!(node.weights(), &[60; 5]);
    assert_eq!(node.prev(), &[anchored]);
}

#[test]
fn test_classify_records() {
    let kinds = [
        "chr1\t100\ta\tA\tATTG.\t.\tPASS\tSC=3",
        "chr1\t100\tb\tA\tA[chr5:900[\t.\tPASS\tRP=7;REFPAIR=1",
        "chr1\t100\tc\tA\t<DEL>\t.\tPASS\t.",
    ]
    .iter()
    .map(|line| RawVariantRecord::from_vcf_line(line).unwrap())
    .collect_vec();

    assert!(matches!(
        kinds[0].classify().unwrap(),
        VariantKind::BreakendAssembly { .. }
    ));
    assert_eq!(kinds[0].counts().soft_clips(), Some(3));
    assert!(matches!(
        kinds[1].classify().unwrap(),
        VariantKind::DirectedBreakpoint { .. }
    ));
    assert_eq!(kinds[1].counts().reference_spanning_pairs(), Some(1));
    assert_eq!(kinds[2].classify().unwrap(), VariantKind::Other);
}
