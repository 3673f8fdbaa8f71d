// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Minimal evidence for incorporating soft clip and read pair evidence into a
//! positional de Bruijn graph.

pub mod reads;

use std::hash::{Hash, Hasher};

use anyhow::Result;
use bv::BitVec;
use strum_macros::{Display, EnumString};

use crate::errors::Error;
use crate::graph::node::KmerNode;
use crate::kmer::{self, Kmer, PackedKmerList};

pub use self::reads::{AlignedRead, DiscordantPair, SoftClipEvidence};

/// Side of the breakpoint on which the anchored sequence lies.
#[derive(
    Display, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize,
)]
pub enum BreakendDirection {
    /// Anchored bases are before the breakpoint, the novel sequence follows.
    #[strum(serialize = "f")]
    Forward,
    /// Anchored bases are after the breakpoint, the novel sequence precedes them.
    #[strum(serialize = "b")]
    Backward,
}

/// Range of fragment sizes of concordantly aligned read pairs of a library.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct FragmentSizeBounds {
    min: i64,
    max: i64,
}

impl FragmentSizeBounds {
    pub fn checked(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidFragmentSizeBounds { min, max }.into());
        }
        Ok(FragmentSizeBounds { min, max })
    }
}

/// The k-mers of one read or read pair, with the interval of positions of the first k-mer.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Evidence {
    #[getset(get = "pub")]
    id: String,
    /// Start position of the first k-mer.
    #[getset(get_copy = "pub")]
    start: i64,
    /// End position of the first k-mer.
    #[getset(get_copy = "pub")]
    end: i64,
    #[getset(get = "pub")]
    kmers: PackedKmerList,
    anchor: Option<BitVec>,
    ambiguous: Option<BitVec>,
}

impl Evidence {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        start: i64,
        end: i64,
        k: usize,
        anchor: Option<BitVec>,
        bases: &[u8],
        qual: &[u8],
        reverse: bool,
        complement: bool,
    ) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidEvidenceInterval { id, start, end }.into());
        }
        let kmers = PackedKmerList::new(&id, k, bases, qual, reverse, complement)?;
        let ambiguous = kmer::ambiguous_kmers(kmers.bases(), k);
        Ok(Evidence {
            id,
            start,
            end,
            kmers,
            anchor,
            ambiguous,
        })
    }

    /// Evidence from the unanchored mate of a discordant read pair.
    ///
    /// The positions of the mate's first k-mer are those that place the fragment within the
    /// concordant fragment size bounds of the library.
    pub fn from_read_pair(k: usize, pair: &DiscordantPair) -> Result<Self> {
        let anchor = pair.anchor();
        let mate = pair.mate();
        mate.check_query_len()?;
        let bounds = FragmentSizeBounds::checked(
            pair.fragment_size().min(),
            pair.fragment_size().max(),
        )?;
        let reverse_comp = !pair.on_expected_strand();
        let mate_len = mate.len() as i64;

        let (start, end) = match pair.direction() {
            //  ----->          anchored
            //  |-------------| max size
            //           <-----
            //  |-----|         min size
            //   <-----
            BreakendDirection::Forward => (
                anchor.unclipped_start() + bounds.min() - mate_len,
                anchor.unclipped_start() + bounds.max() - mate_len,
            ),
            //           <----- anchored
            //  |-------------| max size
            //  ----->
            //          |-----| min size
            //          ----->
            BreakendDirection::Backward => (
                anchor.unclipped_end() - bounds.max() + 1,
                anchor.unclipped_end() - bounds.min() + 1,
            ),
        };

        Evidence::new(
            pair.evidence_id(),
            start,
            end,
            k,
            None,
            mate.seq(),
            mate.qual(),
            reverse_comp,
            reverse_comp,
        )
    }

    /// Evidence from a soft clipped read.
    ///
    /// If `trim_other_soft_clip` is set and the read is clipped on both ends, the clip on the
    /// side not supporting the breakend is removed first. Soft clips next to an indel are
    /// taken as they are.
    pub fn from_soft_clip(
        k: usize,
        evidence: &SoftClipEvidence,
        trim_other_soft_clip: bool,
    ) -> Result<Self> {
        evidence.read().check_query_len()?;
        let mut read = evidence.read().clone();
        let direction = evidence.direction();

        if trim_other_soft_clip && read.start_soft_clip_len() > 0 && read.end_soft_clip_len() > 0
        {
            read = match direction {
                BreakendDirection::Forward => read.without_start_clip(),
                BreakendDirection::Backward => read.without_end_clip(),
            };
        }
        if read.has_indel_adjacent_to_clip() {
            debug!(
                "soft clip of read {} is adjacent to an indel, anchor positions are approximate",
                read.id()
            );
        }

        let start_clip_len = read.start_soft_clip_len();
        let end_clip_len = read.end_soft_clip_len();
        let read_len = read.len();
        if read_len < k {
            return Err(crate::errors::read_shorter_than_kmer(read.id(), read_len, k).into());
        }

        let kmer_count = kmer::window_count(read_len, k);
        let mut anchor = BitVec::new_fill(false, kmer_count as u64);
        let anchor_end = (read_len + 1).saturating_sub(k + end_clip_len);
        for offset in start_clip_len..anchor_end {
            anchor.set(offset as u64, true);
        }

        let start = match direction {
            BreakendDirection::Forward => {
                read.alignment_end() + end_clip_len as i64 - read_len as i64 + 1
            }
            BreakendDirection::Backward => read.alignment_start() - start_clip_len as i64,
        };

        Evidence::new(
            evidence.evidence_id(),
            start,
            start,
            k,
            Some(anchor),
            read.seq(),
            read.qual(),
            false,
            false,
        )
    }

    pub fn k(&self) -> usize {
        *self.kmers.k()
    }

    /// Number of k-mers.
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    pub fn kmer(&self, offset: usize) -> Kmer {
        self.kmers.kmer(offset)
    }

    pub fn weight(&self, offset: usize) -> u32 {
        self.kmers.weight(offset)
    }

    pub fn is_anchored(&self, offset: usize) -> bool {
        self.anchor
            .as_ref()
            .map_or(false, |anchor| anchor.get(offset as u64))
    }

    pub fn is_ambiguous(&self, offset: usize) -> bool {
        self.ambiguous
            .as_ref()
            .map_or(false, |ambiguous| ambiguous.get(offset as u64))
    }

    /// The support of the k-mer at the given offset, `None` if it touches an ambiguous base.
    pub fn node(&self, offset: usize) -> Option<KmerSupportNode<'_>> {
        if self.is_ambiguous(offset) {
            None
        } else {
            Some(KmerSupportNode {
                evidence: self,
                offset,
            })
        }
    }

    /// Support nodes of all offsets, `None` for ambiguous ones.
    pub fn nodes(&self) -> impl Iterator<Item = Option<KmerSupportNode<'_>>> + '_ {
        (0..self.len()).map(move |offset| self.node(offset))
    }
}

impl PartialEq for Evidence {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Evidence {}

impl Hash for Evidence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The contribution of a single k-mer of an evidence.
#[derive(Debug, Clone, Copy, CopyGetters)]
pub struct KmerSupportNode<'a> {
    #[getset(get_copy = "pub")]
    evidence: &'a Evidence,
    #[getset(get_copy = "pub")]
    offset: usize,
}

impl<'a> KmerNode for KmerSupportNode<'a> {
    fn kmer(&self) -> Kmer {
        self.evidence.kmer(self.offset)
    }

    fn start_position(&self) -> i64 {
        self.evidence.start + self.offset as i64
    }

    fn end_position(&self) -> i64 {
        self.evidence.end + self.offset as i64
    }

    fn weight(&self) -> u32 {
        self.evidence.weight(self.offset)
    }

    fn is_reference(&self) -> bool {
        self.evidence.is_anchored(self.offset)
    }
}
