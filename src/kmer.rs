// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Two-bit packing of base windows into integer k-mer keys.

use anyhow::Result;
use bio::alphabets::dna;
use bv::BitVec;

use crate::errors::{self, Error};

/// Largest k that fits two bits per base into a `u64` key.
pub const MAX_K: usize = 32;

/// Integer key of a k-mer, two bits per base with the last base in the lowest bits.
pub type Kmer = u64;

const ENCODED_BASES: &[u8; 4] = b"ACGT";

lazy_static! {
    static ref BASE_TO_CODE: [Option<u8>; 256] = {
        let mut codes = [None; 256];
        for (code, base) in ENCODED_BASES.iter().enumerate() {
            codes[*base as usize] = Some(code as u8);
            codes[base.to_ascii_lowercase() as usize] = Some(code as u8);
        }
        codes
    };
}

/// Check that the given k can be encoded.
pub fn check_k(k: usize) -> Result<()> {
    if k == 0 || k > MAX_K {
        return Err(Error::InvalidKmerLength { k }.into());
    }
    Ok(())
}

/// Return true if the base has no faithful two-bit encoding (N and any other IUPAC symbol).
pub fn is_ambiguous(base: u8) -> bool {
    BASE_TO_CODE[base as usize].is_none()
}

/// Two-bit code of a base. Ambiguous bases are encoded as A and must be masked by the caller.
fn code(base: u8) -> u64 {
    BASE_TO_CODE[base as usize].unwrap_or(0) as u64
}

fn mask(k: usize) -> u64 {
    if k >= MAX_K {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Number of k-mer windows in a sequence of the given length.
pub fn window_count(len: usize, k: usize) -> usize {
    (len + 1).saturating_sub(k)
}

/// Apply reversal and/or complement to every base.
pub fn transform(bases: &[u8], reverse: bool, complement: bool) -> Vec<u8> {
    let map = |b: &u8| if complement { dna::complement(*b) } else { *b };
    if reverse {
        bases.iter().rev().map(map).collect()
    } else {
        bases.iter().map(map).collect()
    }
}

/// Encode all `len(bases) - k + 1` windows of the given bases after applying the transforms.
///
/// Never fails on ambiguous bases: they are encoded as A, use `ambiguous_kmers` to find the
/// affected windows.
pub fn encode(bases: &[u8], k: usize, reverse: bool, complement: bool) -> Vec<Kmer> {
    encode_transformed(&transform(bases, reverse, complement), k)
}

pub(crate) fn encode_transformed(bases: &[u8], k: usize) -> Vec<Kmer> {
    debug_assert!(k > 0 && k <= MAX_K, "bug: invalid k {}", k);
    let mask = mask(k);
    let mut kmers = Vec::with_capacity(window_count(bases.len(), k));
    let mut key = 0u64;
    for (i, base) in bases.iter().enumerate() {
        key = ((key << 2) | code(*base)) & mask;
        if i + 1 >= k {
            kmers.push(key);
        }
    }
    kmers
}

/// Mask of windows touching an ambiguous base, `None` if there is none.
///
/// An ambiguous base at index `i` contaminates every window in
/// `[max(0, i-k+1), min(i, windowCount-1)]`.
pub fn ambiguous_kmers(bases: &[u8], k: usize) -> Option<BitVec> {
    let kmer_count = window_count(bases.len(), k);
    let mut ambiguous: Option<BitVec> = None;
    for (i, base) in bases.iter().enumerate() {
        if is_ambiguous(*base) && kmer_count > 0 {
            let mask =
                ambiguous.get_or_insert_with(|| BitVec::new_fill(false, kmer_count as u64));
            let first = (i + 1).saturating_sub(k);
            let last = i.min(kmer_count - 1);
            for offset in first..=last {
                mask.set(offset as u64, true);
            }
        }
    }
    ambiguous
}

/// Decode a key back into its bases.
pub fn decode(kmer: Kmer, k: usize) -> Vec<u8> {
    (0..k)
        .rev()
        .map(|i| ENCODED_BASES[((kmer >> (2 * i)) & 0b11) as usize])
        .collect()
}

/// The last base of a k-mer.
pub fn last_base(kmer: Kmer) -> u8 {
    ENCODED_BASES[(kmer & 0b11) as usize]
}

/// The four k-mers that overlap the given one by k-1 bases on its right side.
pub fn successors(kmer: Kmer, k: usize) -> impl Iterator<Item = Kmer> {
    let mask = mask(k);
    (0..4u64).map(move |code| ((kmer << 2) | code) & mask)
}

/// Support weight of a window: its minimal base quality, at least 1.
/// Quality 255 marks missing qualities in BAM and counts as 1.
fn window_weight(qual: &[u8]) -> u32 {
    qual.iter()
        .map(|q| if *q == 255 { 1 } else { (*q).max(1) as u32 })
        .min()
        .unwrap_or(1)
}

/// Keys and support weights of all windows of a read.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct PackedKmerList {
    k: usize,
    kmers: Vec<Kmer>,
    weights: Vec<u32>,
    /// The transformed bases the keys were computed from.
    bases: Vec<u8>,
}

impl PackedKmerList {
    pub fn new(
        id: &str,
        k: usize,
        bases: &[u8],
        qual: &[u8],
        reverse: bool,
        complement: bool,
    ) -> Result<Self> {
        check_k(k)?;
        if bases.len() != qual.len() {
            return Err(Error::QualityLengthMismatch {
                id: id.to_owned(),
                bases: bases.len(),
                quals: qual.len(),
            }
            .into());
        }
        if bases.len() < k {
            return Err(errors::read_shorter_than_kmer(id, bases.len(), k).into());
        }

        let bases = transform(bases, reverse, complement);
        let qual: Vec<u8> = if reverse {
            qual.iter().rev().cloned().collect()
        } else {
            qual.to_owned()
        };
        let kmers = encode_transformed(&bases, k);
        let weights = qual.windows(k).map(window_weight).collect();

        Ok(PackedKmerList {
            k,
            kmers,
            weights,
            bases,
        })
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    pub fn kmer(&self, offset: usize) -> Kmer {
        self.kmers[offset]
    }

    pub fn weight(&self, offset: usize) -> u32 {
        self.weights[offset]
    }
}
