// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembly of independent genomic regions, each into its own graph.

use anyhow::Result;
use rayon::prelude::*;

use crate::config::AssemblyConfig;
use crate::evidence::reads::{AlignedRead, DiscordantPair, SoftClipEvidence};
use crate::evidence::{BreakendDirection, Evidence};
use crate::graph::simplify::{self, SimplificationStats};
use crate::graph::KmerPathGraph;

/// A read supporting a breakend, either through a soft clip or a discordant mate.
#[derive(Debug, Clone)]
pub enum EvidenceSource {
    SoftClip(SoftClipEvidence),
    ReadPair(DiscordantPair),
}

impl EvidenceSource {
    /// Soft clip evidence for each clipped end of the read.
    ///
    /// A clip at the end of the read supports a forward breakend, a clip at the start a
    /// backward one.
    pub fn soft_clips(read: &AlignedRead) -> Vec<EvidenceSource> {
        let mut sources = Vec::new();
        if read.end_soft_clip_len() > 0 {
            sources.push(EvidenceSource::SoftClip(SoftClipEvidence::new(
                read.clone(),
                BreakendDirection::Forward,
            )));
        }
        if read.start_soft_clip_len() > 0 {
            sources.push(EvidenceSource::SoftClip(SoftClipEvidence::new(
                read.clone(),
                BreakendDirection::Backward,
            )));
        }
        sources
    }

    pub fn evidence_id(&self) -> String {
        match self {
            EvidenceSource::SoftClip(clip) => clip.evidence_id(),
            EvidenceSource::ReadPair(pair) => pair.evidence_id(),
        }
    }

    pub fn extract(&self, config: &AssemblyConfig) -> Result<Evidence> {
        match self {
            EvidenceSource::SoftClip(clip) => {
                Evidence::from_soft_clip(config.k(), clip, config.trim_other_soft_clip())
            }
            EvidenceSource::ReadPair(pair) => Evidence::from_read_pair(config.k(), pair),
        }
    }
}

#[derive(new, Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct AssemblyRegion {
    contig: String,
    evidence: Vec<EvidenceSource>,
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct AssembledRegion {
    #[getset(get = "pub")]
    contig: String,
    #[getset(get = "pub")]
    graph: KmerPathGraph,
    /// Number of evidence items inserted into the graph.
    #[getset(get_copy = "pub")]
    accepted: usize,
    /// Number of evidence items skipped because no k-mers could be extracted.
    #[getset(get_copy = "pub")]
    rejected: usize,
    #[getset(get_copy = "pub")]
    stats: SimplificationStats,
}

/// Build and simplify the graph of a single region.
pub fn assemble_region(config: &AssemblyConfig, region: &AssemblyRegion) -> Result<AssembledRegion> {
    let mut graph = KmerPathGraph::new(config.k())?;
    let mut evidence = Vec::with_capacity(region.evidence().len());
    let mut rejected = 0;
    for source in region.evidence() {
        match source.extract(config) {
            Ok(extracted) => evidence.push(extracted),
            Err(e) => {
                debug!("skipping evidence {}: {}", source.evidence_id(), e);
                rejected += 1;
            }
        }
    }
    if rejected > 0 {
        warn!(
            "{}: skipped {} of {} evidence items",
            region.contig(),
            rejected,
            region.evidence().len()
        );
    }
    let accepted = evidence.len();
    graph.add_aggregated_evidence(&evidence);

    let linked = graph.link_kmer_adjacencies();
    debug!(
        "{}: {} nodes, {} k-mer adjacencies linked",
        region.contig(),
        graph.node_count(),
        linked
    );
    let stats = simplify::simplify(&mut graph, config.max_simplify_iterations());
    info!(
        "{}: assembled {} evidence items into {} nodes",
        region.contig(),
        accepted,
        graph.node_count()
    );

    Ok(AssembledRegion {
        contig: region.contig().clone(),
        graph,
        accepted,
        rejected,
        stats,
    })
}

/// Assemble all regions in parallel. Results are in the order of the given regions.
pub fn assemble_regions(
    config: &AssemblyConfig,
    regions: &[AssemblyRegion],
) -> Result<Vec<AssembledRegion>> {
    config.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads())
        .build()?;
    info!(
        "assembling {} regions with {} threads",
        regions.len(),
        config.threads()
    );
    pool.install(|| {
        regions
            .par_iter()
            .map(|region| assemble_region(config, region))
            .collect()
    })
}
