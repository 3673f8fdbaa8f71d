// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use positional_debruijn::evidence::AlignedRead;
use rust_htslib::bam::record::{Cigar, CigarString};

pub(crate) const SEQ: &[u8] = b"ACGTTGCATGGACCTAGGCA";

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A forward strand read with constant base quality.
pub(crate) fn aligned_read(id: &str, pos: i64, cigar: Vec<Cigar>, seq: &[u8]) -> AlignedRead {
    AlignedRead::new(
        id.to_owned(),
        pos,
        CigarString(cigar),
        seq.to_owned(),
        vec![30; seq.len()],
        false,
    )
}

/// Read of the given length cycling through `SEQ`.
pub(crate) fn read_of_len(pos: i64, cigar: Vec<Cigar>, len: usize) -> AlignedRead {
    let seq: Vec<u8> = SEQ.iter().cycle().take(len).cloned().collect();
    aligned_read("read", pos, cigar, &seq)
}
