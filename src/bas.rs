//! BAS file parsing
//!
//! A BAS file is the per-sample statistics table written next to each BAM by
//! the cgpmap pipeline: tab-separated, one header line, one row per readgroup.

use crate::errors::{QcError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const BAS_SUFFIX: &str = ".bam.bas";

/// Mandatory BAS columns, in file order.
pub const BAS_HEADER: [&str; 29] = [
    "bam_filename",
    "sample",
    "platform",
    "platform_unit",
    "library",
    "readgroup",
    "read_length_r1",
    "read_length_r2",
    "#_mapped_bases",
    "#_mapped_bases_r1",
    "#_mapped_bases_r2",
    "#_divergent_bases",
    "#_divergent_bases_r1",
    "#_divergent_bases_r2",
    "#_total_reads",
    "#_total_reads_r1",
    "#_total_reads_r2",
    "#_mapped_reads",
    "#_mapped_reads_r1",
    "#_mapped_reads_r2",
    "#_mapped_reads_properly_paired",
    "#_gc_bases_r1",
    "#_gc_bases_r2",
    "mean_insert_size",
    "insert_size_sd",
    "median_insert_size",
    "#_duplicate_reads",
    "#_mapped_pairs",
    "#_inter_chr_pairs",
];

/// One readgroup row of a BAS file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadGroupStats {
    pub bam_filename: String,
    pub sample: String,
    pub platform: String,
    pub platform_unit: String,
    pub library: String,
    pub readgroup: String,
    pub read_length_r1: u64,
    pub read_length_r2: u64,
    #[serde(rename = "#_mapped_bases")]
    pub mapped_bases: u64,
    #[serde(rename = "#_mapped_bases_r1")]
    pub mapped_bases_r1: u64,
    #[serde(rename = "#_mapped_bases_r2")]
    pub mapped_bases_r2: u64,
    #[serde(rename = "#_divergent_bases")]
    pub divergent_bases: u64,
    #[serde(rename = "#_divergent_bases_r1")]
    pub divergent_bases_r1: u64,
    #[serde(rename = "#_divergent_bases_r2")]
    pub divergent_bases_r2: u64,
    #[serde(rename = "#_total_reads")]
    pub total_reads: u64,
    #[serde(rename = "#_total_reads_r1")]
    pub total_reads_r1: u64,
    #[serde(rename = "#_total_reads_r2")]
    pub total_reads_r2: u64,
    #[serde(rename = "#_mapped_reads")]
    pub mapped_reads: u64,
    #[serde(rename = "#_mapped_reads_r1")]
    pub mapped_reads_r1: u64,
    #[serde(rename = "#_mapped_reads_r2")]
    pub mapped_reads_r2: u64,
    #[serde(rename = "#_mapped_reads_properly_paired")]
    pub mapped_reads_properly_paired: u64,
    #[serde(rename = "#_gc_bases_r1")]
    pub gc_bases_r1: u64,
    #[serde(rename = "#_gc_bases_r2")]
    pub gc_bases_r2: u64,
    pub mean_insert_size: f64,
    pub insert_size_sd: f64,
    pub median_insert_size: f64,
    #[serde(rename = "#_duplicate_reads")]
    pub duplicate_reads: u64,
    #[serde(rename = "#_mapped_pairs")]
    pub mapped_pairs: u64,
    #[serde(rename = "#_inter_chr_pairs")]
    pub inter_chr_pairs: u64,
}

/// A parsed BAS file: one sample, one or more readgroups.
#[derive(Debug, Clone)]
pub struct BasFile {
    pub path: PathBuf,
    pub sample: String,
    pub read_groups: Vec<ReadGroupStats>,
}

/// True when the file name follows the `<name>.bam.bas` convention.
pub fn is_bas_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.len() > BAS_SUFFIX.len() && n.ends_with(BAS_SUFFIX))
        .unwrap_or(false)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, err: csv::Error) -> QcError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => QcError::Io(io),
        other => QcError::Validation(format!(
            "malformed BAS file {}: {:?}",
            path.display(),
            other
        )),
    }
}

fn check_header(path: &Path, reader: &mut csv::Reader<std::fs::File>) -> Result<()> {
    let headers = reader.headers().map_err(|e| csv_error(path, e))?;
    if !headers.iter().eq(BAS_HEADER.iter().copied()) {
        return Err(QcError::Validation(format!(
            "BAS file {} does not have the expected header",
            path.display()
        )));
    }
    Ok(())
}

fn check_name(path: &Path) -> Result<()> {
    if is_bas_name(path) {
        Ok(())
    } else {
        Err(QcError::Validation(format!(
            "BAS file name must end with {}: {}",
            BAS_SUFFIX,
            path.display()
        )))
    }
}

/// Naming and header check, without reading the readgroup rows.
pub fn validate_bas(path: &Path) -> Result<()> {
    check_name(path)?;
    let mut reader = open_reader(path)?;
    check_header(path, &mut reader)
}

impl BasFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        check_name(path)?;
        let mut reader = open_reader(path)?;
        check_header(path, &mut reader)?;

        let mut read_groups = Vec::new();
        for (i, row) in reader.deserialize::<ReadGroupStats>().enumerate() {
            let row = row.map_err(|e| {
                QcError::Validation(format!(
                    "malformed row {} in BAS file {}: {}",
                    i + 1,
                    path.display(),
                    e
                ))
            })?;
            read_groups.push(row);
        }

        let sample = match read_groups.first() {
            Some(first) => first.sample.clone(),
            None => {
                return Err(QcError::Validation(format!(
                    "BAS file {} has no readgroup rows",
                    path.display()
                )))
            }
        };

        if let Some(other) = read_groups.iter().find(|rg| rg.sample != sample) {
            return Err(QcError::Validation(format!(
                "BAS file {} names more than one sample: {} and {}",
                path.display(),
                sample,
                other.sample
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            sample,
            read_groups,
        })
    }
}

/// Sample identifier recorded inside a BAS file.
pub fn sample_name_from_bas(path: &Path) -> Result<String> {
    Ok(BasFile::from_path(path)?.sample)
}
