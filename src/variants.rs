// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Classification of breakpoint records into the variant kinds produced by assembly.

use std::str;

use anyhow::{Context, Result};
use bio_types::genome::{self, AbstractLocus};
use regex::Regex;
use rust_htslib::bcf;

use crate::errors::Error;
use crate::evidence::BreakendDirection;

pub const REFERENCE_SPANNING_READ_PAIR_COUNT: &str = "REFPAIR";
pub const REFERENCE_READ_COUNT: &str = "REF";
pub const UNMAPPED_MATE_READ_COUNT: &str = "OEA";
pub const SOFT_CLIP_READ_COUNT: &str = "SC";
pub const DISCORDANT_READ_PAIR_COUNT: &str = "RP";

/// Optional evidence counts of a record, absent when the INFO field is not set.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct EvidenceCounts {
    reference_spanning_pairs: Option<i32>,
    reference_reads: Option<i32>,
    unmapped_mates: Option<i32>,
    soft_clips: Option<i32>,
    discordant_pairs: Option<i32>,
}

impl EvidenceCounts {
    fn set(&mut self, key: &str, value: i32) {
        match key {
            REFERENCE_SPANNING_READ_PAIR_COUNT => self.reference_spanning_pairs = Some(value),
            REFERENCE_READ_COUNT => self.reference_reads = Some(value),
            UNMAPPED_MATE_READ_COUNT => self.unmapped_mates = Some(value),
            SOFT_CLIP_READ_COUNT => self.soft_clips = Some(value),
            DISCORDANT_READ_PAIR_COUNT => self.discordant_pairs = Some(value),
            _ => (),
        }
    }

    /// Parse the counts from a textual INFO column (`KEY=VALUE;FLAG;...`).
    pub fn from_info(info: &str) -> Self {
        let mut counts = EvidenceCounts::default();
        for field in info.split(';') {
            let mut kv = field.splitn(2, '=');
            if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
                match value.parse() {
                    Ok(value) => counts.set(key, value),
                    Err(_) => trace!("ignoring non-integer INFO field {}", field),
                }
            }
        }
        counts
    }

    pub fn from_bcf(record: &bcf::Record) -> Self {
        let mut counts = EvidenceCounts::default();
        for key in &[
            REFERENCE_SPANNING_READ_PAIR_COUNT,
            REFERENCE_READ_COUNT,
            UNMAPPED_MATE_READ_COUNT,
            SOFT_CLIP_READ_COUNT,
            DISCORDANT_READ_PAIR_COUNT,
        ] {
            if let Ok(Some(values)) = record.info(key.as_bytes()).integer() {
                if let Some(value) = values.first() {
                    counts.set(key, *value);
                }
            }
        }
        counts
    }
}

/// The fields of a breakpoint record needed for classification, parsed once.
#[derive(new, Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct RawVariantRecord {
    #[getset(get = "pub")]
    id: String,
    #[getset(get = "pub")]
    contig: String,
    /// 1-based position.
    #[getset(get_copy = "pub")]
    pos: u64,
    #[getset(get = "pub")]
    ref_allele: Vec<u8>,
    #[getset(get = "pub")]
    alt: Vec<u8>,
    #[getset(get_copy = "pub")]
    counts: EvidenceCounts,
}

impl RawVariantRecord {
    /// Parse a tab separated VCF data line. Only the first ALT allele is considered.
    pub fn from_vcf_line(line: &str) -> Result<Self> {
        let invalid = || Error::InvalidVcfRecord {
            line: line.to_owned(),
        };
        let columns: Vec<&str> = line.trim_end().split('\t').collect();
        if columns.len() < 8 {
            return Err(invalid().into());
        }
        let pos = columns[1].parse().with_context(invalid)?;
        let alt = columns[4].split(',').next().unwrap_or_default();

        Ok(RawVariantRecord {
            id: columns[2].to_owned(),
            contig: columns[0].to_owned(),
            pos,
            ref_allele: columns[3].as_bytes().to_owned(),
            alt: alt.as_bytes().to_owned(),
            counts: EvidenceCounts::from_info(columns[7]),
        })
    }

    pub fn from_bcf(record: &bcf::Record) -> Result<Self> {
        let rid = record.rid().context("record without contig")?;
        let contig = String::from_utf8_lossy(record.header().rid2name(rid)?).into_owned();
        let alleles = record.alleles();
        Ok(RawVariantRecord {
            id: String::from_utf8_lossy(&record.id()).into_owned(),
            contig,
            pos: record.pos() as u64 + 1,
            ref_allele: alleles[0].to_owned(),
            alt: alleles.get(1).map(|alt| alt.to_vec()).unwrap_or_default(),
            counts: EvidenceCounts::from_bcf(record),
        })
    }

    /// Determine the kind of variant the record describes.
    ///
    /// Kinds are tried in order, the first matching one is returned.
    pub fn classify(&self) -> Result<VariantKind> {
        if let Some(kind) = self.breakend_assembly() {
            return Ok(kind);
        }
        if let Some(kind) = self.directed_breakpoint()? {
            return Ok(kind);
        }
        Ok(VariantKind::Other)
    }

    fn local_breakend(&self, direction: BreakendDirection) -> DirectedBreakend {
        DirectedBreakend::new(genome::Locus::new(self.contig.clone(), self.pos), direction)
    }

    fn breakend_assembly(&self) -> Option<VariantKind> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new("^((?P<forward>[ACGTNacgtn]+)\\.|\\.(?P<backward>[ACGTNacgtn]+))$")
                    .unwrap();
        }
        let alt = str::from_utf8(&self.alt).ok()?;
        let caps = RE.captures(alt)?;
        let (direction, sequence) = if let Some(bases) = caps.name("forward") {
            (BreakendDirection::Forward, &bases.as_str()[1..])
        } else {
            let bases = caps.name("backward")?.as_str();
            (BreakendDirection::Backward, &bases[..bases.len() - 1])
        };
        Some(VariantKind::BreakendAssembly {
            breakend: self.local_breakend(direction),
            sequence: sequence.as_bytes().to_owned(),
        })
    }

    fn directed_breakpoint(&self) -> Result<Option<VariantKind>> {
        lazy_static! {
            static ref RE: Regex = Regex::new("^(?P<before>[ACGTNacgtn]*)(?P<bracket1>[\\]\\[])(?P<contig>[^\\]\\[:]+):(?P<pos>[0-9]+)(?P<bracket2>[\\]\\[])(?P<after>[ACGTNacgtn]*)$").unwrap();
        }
        let alt = String::from_utf8_lossy(&self.alt).into_owned();
        if !alt.contains(|c: char| c == '[' || c == ']') {
            return Ok(None);
        }
        let invalid = || Error::InvalidBndAlt { alt: alt.clone() };

        let caps = RE.captures(&alt).ok_or_else(invalid)?;
        let bracket = &caps["bracket1"];
        if bracket != &caps["bracket2"] {
            return Err(invalid().into());
        }
        let (before, after) = (&caps["before"], &caps["after"]);
        let (local_direction, untemplated) = match (before.is_empty(), after.is_empty()) {
            // t[p[ and t]p]: the joined piece follows the local base
            (false, true) => (BreakendDirection::Forward, &before[1..]),
            // ]p]t and [p[t: the joined piece precedes the local base
            (true, false) => (BreakendDirection::Backward, &after[..after.len() - 1]),
            _ => return Err(invalid().into()),
        };
        // [ joins the sequence right of the remote position, ] the sequence left of it
        let remote_direction = if bracket == "[" {
            BreakendDirection::Backward
        } else {
            BreakendDirection::Forward
        };
        let remote_pos = caps["pos"].parse().with_context(invalid)?;

        Ok(Some(VariantKind::DirectedBreakpoint {
            local: self.local_breakend(local_direction),
            remote: DirectedBreakend::new(
                genome::Locus::new(caps["contig"].to_owned(), remote_pos),
                remote_direction,
            ),
            untemplated: untemplated.as_bytes().to_owned(),
        }))
    }
}

#[derive(new, Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct DirectedBreakend {
    #[getset(get = "pub")]
    locus: genome::Locus,
    #[getset(get_copy = "pub")]
    direction: BreakendDirection,
}

impl DirectedBreakend {
    pub fn contig(&self) -> &str {
        self.locus.contig()
    }

    pub fn pos(&self) -> u64 {
        self.locus.pos()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// A single breakend followed (forward) or preceded (backward) by assembled sequence.
    BreakendAssembly {
        breakend: DirectedBreakend,
        sequence: Vec<u8>,
    },
    /// A breakpoint joining two directed breakends, with bases inserted between them.
    DirectedBreakpoint {
        local: DirectedBreakend,
        remote: DirectedBreakend,
        untemplated: Vec<u8>,
    },
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alt: &str) -> RawVariantRecord {
        RawVariantRecord::from_vcf_line(&format!(
            "chr1\t100\tbp1\tA\t{}\t.\tPASS\tSVTYPE=BND;SC=4;RP=2;REF=x\n",
            alt
        ))
        .unwrap()
    }

    fn breakend(contig: &str, pos: u64, direction: BreakendDirection) -> DirectedBreakend {
        DirectedBreakend::new(genome::Locus::new(contig.to_owned(), pos), direction)
    }

    #[test]
    fn test_from_vcf_line() {
        let r = record("A.");
        assert_eq!(r.contig(), "chr1");
        assert_eq!(r.pos(), 100);
        assert_eq!(r.id(), "bp1");
        assert_eq!(r.ref_allele(), b"A");
        assert_eq!(r.counts().soft_clips(), Some(4));
        assert_eq!(r.counts().discordant_pairs(), Some(2));
        assert_eq!(r.counts().reference_reads(), None);
        assert_eq!(r.counts().unmapped_mates(), None);

        assert!(RawVariantRecord::from_vcf_line("chr1\t100\tbp1").is_err());
        assert!(RawVariantRecord::from_vcf_line("chr1\tx\tbp1\tA\tA.\t.\t.\t.").is_err());
    }

    #[test]
    fn test_breakend_assembly() {
        assert_eq!(
            record("ATTG.").classify().unwrap(),
            VariantKind::BreakendAssembly {
                breakend: breakend("chr1", 100, BreakendDirection::Forward),
                sequence: b"TTG".to_vec(),
            }
        );
        assert_eq!(
            record(".CCA").classify().unwrap(),
            VariantKind::BreakendAssembly {
                breakend: breakend("chr1", 100, BreakendDirection::Backward),
                sequence: b"CC".to_vec(),
            }
        );
    }

    #[test]
    fn test_directed_breakpoint() {
        let cases = vec![
            (
                "AT[chr2:500[",
                BreakendDirection::Forward,
                BreakendDirection::Backward,
                "T",
            ),
            ("A]chr2:500]", BreakendDirection::Forward, BreakendDirection::Forward, ""),
            (
                "]chr2:500]GGA",
                BreakendDirection::Backward,
                BreakendDirection::Forward,
                "GG",
            ),
            ("[chr2:500[A", BreakendDirection::Backward, BreakendDirection::Backward, ""),
        ];
        for (alt, local, remote, untemplated) in cases {
            assert_eq!(
                record(alt).classify().unwrap(),
                VariantKind::DirectedBreakpoint {
                    local: breakend("chr1", 100, local),
                    remote: breakend("chr2", 500, remote),
                    untemplated: untemplated.as_bytes().to_vec(),
                }
            );
        }
    }

    #[test]
    fn test_invalid_bnd_alt() {
        for alt in &["A[chr2:500]", "[chr2:500[", "A[chr2:500[A", "A[chr2[", "A[chr2:x["] {
            let err = record(alt).classify().unwrap_err();
            assert_eq!(
                err.downcast_ref::<Error>(),
                Some(&Error::InvalidBndAlt {
                    alt: alt.to_string()
                })
            );
        }
    }

    #[test]
    fn test_other() {
        for alt in &["G", "<DEL>", "ACGT", "."] {
            assert_eq!(record(alt).classify().unwrap(), VariantKind::Other);
        }
    }
}
