// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid k-mer length {k}, must be between 1 and 32")]
    InvalidKmerLength { k: usize },
    #[error("read {id} has {len} bases, which is shorter than the k-mer length {k}")]
    ReadShorterThanKmer { id: String, len: usize, k: usize },
    #[error("read {id} has {bases} bases but {quals} base qualities")]
    QualityLengthMismatch {
        id: String,
        bases: usize,
        quals: usize,
    },
    #[error("read {id} has {bases} bases but its CIGAR string describes {cigar_len}")]
    CigarLengthMismatch {
        id: String,
        bases: usize,
        cigar_len: usize,
    },
    #[error("invalid position interval of evidence {id}: end {end} before start {start}")]
    InvalidEvidenceInterval { id: String, start: i64, end: i64 },
    #[error("invalid fragment size bounds: minimum {min} exceeds maximum {max}")]
    InvalidFragmentSizeBounds { min: i64, max: i64 },
    #[error("invalid number of threads {threads}, must be at least 1")]
    InvalidThreads { threads: usize },
    #[error("invalid BND record: ALT {alt} is not in VCF breakend notation")]
    InvalidBndAlt { alt: String },
    #[error("invalid VCF record {line}, expecting at least 8 tab separated columns")]
    InvalidVcfRecord { line: String },
    #[error("invalid assembly configuration in {}", path.display())]
    InvalidConfig { path: PathBuf },
}

pub(crate) fn read_shorter_than_kmer(id: &str, len: usize, k: usize) -> Error {
    Error::ReadShorterThanKmer {
        id: id.to_owned(),
        len,
        k,
    }
}
