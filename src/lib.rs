// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembly of structural variant breakend evidence into a positional de Bruijn graph.
//!
//! Reads carrying soft clips or discordant mates are turned into runs of k-mers
//! (`evidence`), each k-mer valid over an interval of genomic positions. Support for
//! the same k-mer at overlapping positions is summed across reads, inserted into a
//! compressed graph of path nodes (`graph`), which is then split, coalesced and merged
//! until it holds one node per distinct evidence-supported path.

#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate derive_builder;

pub mod assembly;
pub mod config;
pub mod errors;
pub mod evidence;
pub mod graph;
pub mod kmer;
pub mod utils;
pub mod variants;

pub use crate::assembly::{assemble_regions, AssembledRegion, AssemblyRegion, EvidenceSource};
pub use crate::config::{AssemblyConfig, AssemblyConfigBuilder};
pub use crate::evidence::{BreakendDirection, Evidence, FragmentSizeBounds, KmerSupportNode};
pub use crate::graph::node::{ImmutableKmerNode, KmerNode, KmerPathNode};
pub use crate::graph::{KmerPathGraph, NodeId};
