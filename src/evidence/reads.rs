// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use rust_htslib::bam;
use rust_htslib::bam::record::{Cigar, CigarString};

use crate::errors::Error;
use crate::evidence::{BreakendDirection, FragmentSizeBounds};

/// The parts of an aligned read that evidence extraction relies on.
///
/// Positions are 1-based and inclusive.
#[derive(new, Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct AlignedRead {
    #[getset(get = "pub")]
    id: String,
    /// First reference position covered by an aligned base.
    #[getset(get_copy = "pub")]
    pos: i64,
    #[getset(get = "pub")]
    cigar: CigarString,
    #[getset(get = "pub")]
    seq: Vec<u8>,
    #[getset(get = "pub")]
    qual: Vec<u8>,
    #[getset(get_copy = "pub")]
    reverse: bool,
}

fn is_clip(op: &Cigar) -> bool {
    matches!(op, Cigar::SoftClip(_) | Cigar::HardClip(_))
}

impl AlignedRead {
    pub fn from_record(record: &bam::Record) -> Self {
        AlignedRead {
            id: String::from_utf8_lossy(record.qname()).into_owned(),
            pos: record.pos() + 1,
            cigar: record.cigar().take(),
            seq: record.seq().as_bytes(),
            qual: record.qual().to_vec(),
            reverse: record.is_reverse(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn alignment_start(&self) -> i64 {
        self.pos
    }

    /// Last reference position covered by an aligned base.
    pub fn alignment_end(&self) -> i64 {
        let ref_len: i64 = self
            .cigar
            .0
            .iter()
            .map(|op| match op {
                Cigar::Match(l)
                | Cigar::Del(l)
                | Cigar::RefSkip(l)
                | Cigar::Equal(l)
                | Cigar::Diff(l) => *l as i64,
                _ => 0,
            })
            .sum();
        self.pos + ref_len - 1
    }

    fn leading_clips(&self) -> i64 {
        self.cigar
            .0
            .iter()
            .take_while(|op| is_clip(op))
            .map(|op| op.len() as i64)
            .sum()
    }

    fn trailing_clips(&self) -> i64 {
        self.cigar
            .0
            .iter()
            .rev()
            .take_while(|op| is_clip(op))
            .map(|op| op.len() as i64)
            .sum()
    }

    /// Alignment start extended by the leading soft and hard clips.
    pub fn unclipped_start(&self) -> i64 {
        self.alignment_start() - self.leading_clips()
    }

    /// Alignment end extended by the trailing soft and hard clips.
    pub fn unclipped_end(&self) -> i64 {
        self.alignment_end() + self.trailing_clips()
    }

    /// Number of soft clipped bases at the start, hard clips are skipped.
    pub fn start_soft_clip_len(&self) -> usize {
        self.cigar
            .0
            .iter()
            .skip_while(|op| matches!(op, Cigar::HardClip(_)))
            .take_while(|op| matches!(op, Cigar::SoftClip(_)))
            .map(|op| op.len() as usize)
            .sum()
    }

    /// Number of soft clipped bases at the end, hard clips are skipped.
    pub fn end_soft_clip_len(&self) -> usize {
        self.cigar
            .0
            .iter()
            .rev()
            .skip_while(|op| matches!(op, Cigar::HardClip(_)))
            .take_while(|op| matches!(op, Cigar::SoftClip(_)))
            .map(|op| op.len() as usize)
            .sum()
    }

    /// Number of read bases described by the CIGAR string.
    pub fn query_len(&self) -> usize {
        self.cigar
            .0
            .iter()
            .map(|op| match op {
                Cigar::Match(l)
                | Cigar::Ins(l)
                | Cigar::SoftClip(l)
                | Cigar::Equal(l)
                | Cigar::Diff(l) => *l as usize,
                _ => 0,
            })
            .sum()
    }

    /// Fail if the stored bases or qualities do not match the CIGAR string, as for records
    /// without SEQ. Reads without CIGAR operations (unmapped) are accepted as they are.
    pub fn check_query_len(&self) -> Result<()> {
        if !self.cigar.0.is_empty() && self.query_len() != self.seq.len() {
            return Err(Error::CigarLengthMismatch {
                id: self.id.clone(),
                bases: self.seq.len(),
                cigar_len: self.query_len(),
            }
            .into());
        }
        if self.qual.len() != self.seq.len() {
            return Err(Error::QualityLengthMismatch {
                id: self.id.clone(),
                bases: self.seq.len(),
                quals: self.qual.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Return true if an insertion or deletion directly follows the leading or precedes
    /// the trailing soft clip.
    pub fn has_indel_adjacent_to_clip(&self) -> bool {
        let is_indel =
            |op: Option<&Cigar>| matches!(op, Some(Cigar::Ins(_)) | Some(Cigar::Del(_)));
        let leading = self.cigar.0.iter().skip_while(|op| is_clip(op)).next();
        let trailing = self.cigar.0.iter().rev().skip_while(|op| is_clip(op)).next();
        (self.start_soft_clip_len() > 0 && is_indel(leading))
            || (self.end_soft_clip_len() > 0 && is_indel(trailing))
    }

    /// Copy of this read without its leading clip operations and soft clipped bases.
    pub(crate) fn without_start_clip(&self) -> Self {
        let mut ops = self.cigar.0.clone();
        while ops.first().map_or(false, is_clip) {
            ops.remove(0);
        }
        self.with_trimmed_bases(ops, self.start_soft_clip_len(), 0)
    }

    /// Copy of this read without its trailing clip operations and soft clipped bases.
    pub(crate) fn without_end_clip(&self) -> Self {
        let mut ops = self.cigar.0.clone();
        while ops.last().map_or(false, is_clip) {
            ops.pop();
        }
        self.with_trimmed_bases(ops, 0, self.end_soft_clip_len())
    }

    fn with_trimmed_bases(&self, ops: Vec<Cigar>, trim_start: usize, trim_end: usize) -> Self {
        let end = self.seq.len() - trim_end;
        AlignedRead {
            id: self.id.clone(),
            pos: self.pos,
            cigar: CigarString(ops),
            seq: self.seq[trim_start..end].to_owned(),
            qual: self.qual[trim_start..end].to_owned(),
            reverse: self.reverse,
        }
    }
}

/// A read whose soft clip supports a breakend in the given direction.
#[derive(new, Debug, Clone, Getters, CopyGetters)]
pub struct SoftClipEvidence {
    #[getset(get = "pub")]
    read: AlignedRead,
    #[getset(get_copy = "pub")]
    direction: BreakendDirection,
}

impl SoftClipEvidence {
    pub fn evidence_id(&self) -> String {
        format!("{}{}", self.direction, self.read.id())
    }
}

/// A read pair with one mate anchored near the breakend and the other mate mapped
/// elsewhere or not at all.
#[derive(new, Debug, Clone, Getters, CopyGetters)]
pub struct DiscordantPair {
    /// The locally mapped mate.
    #[getset(get = "pub")]
    anchor: AlignedRead,
    /// The mate whose bases are assumed to span the breakend.
    #[getset(get = "pub")]
    mate: AlignedRead,
    #[getset(get_copy = "pub")]
    direction: BreakendDirection,
    /// Whether the mate lies on the strand expected for a concordant pair.
    #[getset(get_copy = "pub")]
    on_expected_strand: bool,
    #[getset(get_copy = "pub")]
    fragment_size: FragmentSizeBounds,
}

impl DiscordantPair {
    /// Derive direction and expected strand from the mate orientations.
    ///
    /// The breakend points away from the anchor in its read direction, and mates of a
    /// concordant pair lie on opposite strands.
    pub fn from_mates(
        anchor: AlignedRead,
        mate: AlignedRead,
        fragment_size: FragmentSizeBounds,
    ) -> Self {
        let direction = if anchor.reverse() {
            BreakendDirection::Backward
        } else {
            BreakendDirection::Forward
        };
        let on_expected_strand = anchor.reverse() != mate.reverse();
        DiscordantPair {
            anchor,
            mate,
            direction,
            on_expected_strand,
            fragment_size,
        }
    }

    pub fn evidence_id(&self) -> String {
        format!("{}{}", self.direction, self.anchor.id())
    }
}
