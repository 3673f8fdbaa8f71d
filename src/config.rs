// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::Error;
use crate::kmer;

pub const DEFAULT_K: usize = 25;
pub const DEFAULT_MAX_SIMPLIFY_ITERATIONS: usize = 64;

/// Parameters of breakend assembly.
///
/// Can be built in code via `AssemblyConfigBuilder` or read from YAML, where omitted
/// keys take their default values:
///
/// ```yaml
/// k: 31
/// threads: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, CopyGetters, Serialize, Deserialize)]
#[builder(pattern = "owned")]
#[serde(default, deny_unknown_fields)]
pub struct AssemblyConfig {
    /// K-mer length, at most 32.
    #[builder(default = "DEFAULT_K")]
    #[getset(get_copy = "pub")]
    k: usize,
    /// Remove the soft clip that does not support the breakend from reads clipped on both ends.
    #[builder(default = "true")]
    #[getset(get_copy = "pub")]
    trim_other_soft_clip: bool,
    /// Number of regions assembled in parallel.
    #[builder(default = "1")]
    #[getset(get_copy = "pub")]
    threads: usize,
    #[builder(default = "DEFAULT_MAX_SIMPLIFY_ITERATIONS")]
    #[getset(get_copy = "pub")]
    max_simplify_iterations: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        AssemblyConfig {
            k: DEFAULT_K,
            trim_other_soft_clip: true,
            threads: 1,
            max_simplify_iterations: DEFAULT_MAX_SIMPLIFY_ITERATIONS,
        }
    }
}

impl AssemblyConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let invalid = || Error::InvalidConfig {
            path: path.to_owned(),
        };
        let reader = File::open(path).with_context(invalid)?;
        let config: AssemblyConfig = serde_yaml::from_reader(reader).with_context(invalid)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        kmer::check_k(self.k)?;
        if self.threads == 0 {
            return Err(Error::InvalidThreads {
                threads: self.threads,
            }
            .into());
        }
        Ok(())
    }
}
