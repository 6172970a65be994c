//! Run configuration shared by the library and the command-line tool.

use crate::errors::{QcError, Result};
use crate::DEFAULT_GENOME_SIZE;
use std::path::PathBuf;

/// Inputs and switches for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub tumour_bas: Vec<PathBuf>,
    pub normal_bas: Vec<PathBuf>,
    pub variant_call_tars: Vec<PathBuf>,
    pub output_tar: PathBuf,
    pub genome_size: u64,
    pub metadata: Vec<PathBuf>,
    pub count_variants: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tumour_bas: Vec::new(),
            normal_bas: Vec::new(),
            variant_call_tars: Vec::new(),
            output_tar: PathBuf::from("ppcg_qc.tar.gz"),
            genome_size: DEFAULT_GENOME_SIZE,
            metadata: Vec::new(),
            count_variants: false,
        }
    }
}

impl RunConfig {
    pub fn new(
        tumour_bas: Vec<PathBuf>,
        normal_bas: Vec<PathBuf>,
        variant_call_tars: Vec<PathBuf>,
        output_tar: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tumour_bas,
            normal_bas,
            variant_call_tars,
            output_tar: output_tar.into(),
            ..Self::default()
        }
    }

    pub fn with_genome_size(mut self, genome_size: u64) -> Self {
        self.genome_size = genome_size;
        self
    }

    pub fn with_metadata(mut self, metadata: Vec<PathBuf>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_count_variants(mut self, count_variants: bool) -> Self {
        self.count_variants = count_variants;
        self
    }

    /// Reject settings that would make every later step meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.genome_size == 0 {
            return Err(QcError::Validation(
                "genome size must be a positive integer".to_string(),
            ));
        }
        if self.tumour_bas.is_empty() || self.normal_bas.is_empty() {
            return Err(QcError::Validation(
                "at least one tumour and one normal BAS input is required".to_string(),
            ));
        }
        if self.variant_call_tars.is_empty() {
            return Err(QcError::Validation(
                "at least one variant call archive input is required".to_string(),
            ));
        }
        Ok(())
    }
}
