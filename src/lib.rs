//! PPCG QC Tools
//!
//! Consolidated QC reporting for paired tumour/normal samples processed by the
//! Sanger whole-genome variant-calling pipeline.
//!
//! This library provides:
//! - Discovery and validation of BAS files, result archives and metadata tables
//! - Tumour/normal pairing from result archive naming conventions
//! - Whole-cohort reconciliation before any extraction work starts
//! - Per-pair metric extraction and the tab-separated QC report
//! - Packaging of the report and genotyping artifacts into one archive

pub mod archive;
pub mod bas;
pub mod bundle;
pub mod cohort;
pub mod config;
pub mod errors;
pub mod locator;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod results;
pub mod summary;

use std::fmt;

pub use config::RunConfig;
pub use errors::{QcError, Result};

/// GRCh37 reference size, used for depth when no genome size is given.
pub const DEFAULT_GENOME_SIZE: u64 = 3_137_454_505;

/// Which side of a tumour/normal pair a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRole {
    Tumour,
    Normal,
}

impl fmt::Display for SampleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleRole::Tumour => write!(f, "tumour"),
            SampleRole::Normal => write!(f, "normal"),
        }
    }
}

/// The (tumour, normal) sample names of one variant-calling unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub tumour: String,
    pub normal: String,
}

impl PairKey {
    pub fn new(tumour: impl Into<String>, normal: impl Into<String>) -> Self {
        Self {
            tumour: tumour.into(),
            normal: normal.into(),
        }
    }

    pub fn sample(&self, role: SampleRole) -> &str {
        match role {
            SampleRole::Tumour => &self.tumour,
            SampleRole::Normal => &self.normal,
        }
    }

    /// Name of the top-level directory inside the pair's result archive.
    pub fn archive_prefix(&self) -> String {
        format!("WGS_{}_vs_{}", self.tumour, self.normal)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_vs_{}", self.tumour, self.normal)
    }
}
