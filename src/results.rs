//! Figures read from inside a Sanger variant-call result archive
//!
//! Reads, in one pass over the archive:
//! - contamination/result.json: per-sample and per-readgroup contamination
//! - genotyped/result.json: sex calls and genotype concordance
//! - genotyped/*.tsv: genotyping tables, copied out as artifacts
//! - ascat/<tumour>.samplestatistics.txt: normal contamination in tumour
//! - caveman, pindel, brass and ascat outputs when counting variants

use crate::archive::open_archive;
use crate::errors::{QcError, Result};
use crate::PairKey;
use flate2::read::MultiGzDecoder;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Contamination estimate for one sample.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleContamination {
    pub contamination: f64,
    #[serde(default)]
    pub by_readgroup: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenderCall {
    pub gender: String,
    #[serde(default)]
    pub frac_match_gender: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenotypeConcordance {
    pub frac_matched_genotype: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TumourGenotype {
    pub sample: String,
    #[serde(default)]
    pub gender: Option<GenderCall>,
    #[serde(default)]
    pub genotype: Option<GenotypeConcordance>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalGenotype {
    pub sample: String,
    #[serde(default)]
    pub gender: Option<GenderCall>,
}

/// Content of genotyped/result.json.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenotypeReport {
    #[serde(default)]
    pub tumours: Vec<TumourGenotype>,
    #[serde(default)]
    pub normal: Option<NormalGenotype>,
}

impl GenotypeReport {
    pub fn tumour(&self, sample: &str) -> Option<&TumourGenotype> {
        self.tumours.iter().find(|t| t.sample == sample)
    }
}

/// PASS and total record counts of one VCF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassAll {
    pub pass: u64,
    pub all: u64,
}

impl fmt::Display for PassAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pass, self.all)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantCounts {
    pub snvs: Option<PassAll>,
    pub indels: Option<PassAll>,
    pub svs: Option<PassAll>,
    pub cnvs: Option<u64>,
}

/// Everything found in one result archive. Missing items stay `None`.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFindings {
    pub contamination: HashMap<String, SampleContamination>,
    pub genotype: Option<GenotypeReport>,
    pub normal_contamination: Option<f64>,
    pub variant_counts: Option<VariantCounts>,
    /// Genotyping tables, relative to the artifact directory.
    pub artifacts: Vec<PathBuf>,
}

/// Count records in a bgzip/gzip VCF stream.
pub fn count_vcf_records<R: Read>(reader: R) -> std::io::Result<PassAll> {
    let mut counts = PassAll::default();
    for line in BufReader::new(MultiGzDecoder::new(reader)).lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        counts.all += 1;
        if line.split('\t').nth(6) == Some("PASS") {
            counts.pass += 1;
        }
    }
    Ok(counts)
}

/// Count data lines of a plain-text table.
pub fn count_lines<R: Read>(reader: R) -> std::io::Result<u64> {
    let mut n = 0;
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if !line.trim().is_empty() && !line.starts_with('#') {
            n += 1;
        }
    }
    Ok(n)
}

/// `NormalContamination` value from an ASCAT samplestatistics file.
pub fn parse_normal_contamination(content: &str) -> Option<f64> {
    content.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some("NormalContamination"), Some(value)) => value.parse().ok(),
            _ => None,
        }
    })
}

/// Reader for the archive members that feed the QC report.
pub struct ResultArchiveReader {
    pub count_variants: bool,
}

impl Default for ResultArchiveReader {
    fn default() -> Self {
        Self {
            count_variants: false,
        }
    }
}

impl ResultArchiveReader {
    pub fn new(count_variants: bool) -> Self {
        Self { count_variants }
    }

    /// Read one archive; genotyping tables are unpacked into `artifact_dir`.
    pub fn read(&self, archive: &Path, pair: &PairKey, artifact_dir: &Path) -> Result<ArchiveFindings> {
        let fail = |reason: String| QcError::Extraction {
            pair: pair.to_string(),
            reason,
        };

        let prefix = format!("{}/", pair.archive_prefix());
        let samplestatistics = format!("ascat/{}.samplestatistics.txt", pair.tumour);
        let mut findings = ArchiveFindings::default();
        let mut counts = VariantCounts::default();

        let mut tar = open_archive(archive)?;
        let entries = tar
            .entries()
            .map_err(|e| fail(format!("cannot read {}: {}", archive.display(), e)))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| fail(format!("cannot read {}: {}", archive.display(), e)))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let member = entry
                .path()
                .map_err(|e| fail(format!("bad member name: {}", e)))?
                .to_string_lossy()
                .into_owned();
            let member = member.strip_prefix("./").unwrap_or(&member);
            let Some(relative) = member.strip_prefix(&prefix) else {
                continue;
            };
            let relative = relative.to_string();

            if relative == "contamination/result.json" {
                debug!("reading contamination from {}", member);
                findings.contamination = serde_json::from_reader(&mut entry)
                    .map_err(|e| fail(format!("malformed {}: {}", member, e)))?;
            } else if relative == "genotyped/result.json" {
                debug!("reading genotype concordance from {}", member);
                findings.genotype = Some(
                    serde_json::from_reader(&mut entry)
                        .map_err(|e| fail(format!("malformed {}: {}", member, e)))?,
                );
            } else if let Some(table) = relative
                .strip_prefix("genotyped/")
                .filter(|t| t.ends_with(".tsv"))
            {
                let table = PathBuf::from(table);
                if !table.components().all(|c| matches!(c, Component::Normal(_))) {
                    return Err(fail(format!("unsafe member name {}", member)));
                }
                let target = artifact_dir.join(&table);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack(&target)?;
                debug!("extracted genotyping file {}", target.display());
                if !findings.artifacts.contains(&table) {
                    findings.artifacts.push(table);
                }
            } else if relative == samplestatistics {
                let mut content = String::new();
                entry.read_to_string(&mut content)?;
                findings.normal_contamination = parse_normal_contamination(&content);
            } else if self.count_variants {
                self.count_member(&relative, &mut entry, &mut counts)
                    .map_err(|e| fail(format!("cannot count variants in {}: {}", member, e)))?;
            }
        }

        if self.count_variants {
            findings.variant_counts = Some(counts);
        }
        Ok(findings)
    }

    fn count_member<R: Read>(
        &self,
        relative: &str,
        reader: R,
        counts: &mut VariantCounts,
    ) -> std::io::Result<()> {
        if relative.starts_with("caveman/") && relative.ends_with(".flagged.muts.vcf.gz") {
            counts.snvs = Some(count_vcf_records(reader)?);
        } else if relative.starts_with("pindel/") && relative.ends_with(".flagged.vcf.gz") {
            counts.indels = Some(count_vcf_records(reader)?);
        } else if relative.starts_with("brass/") && relative.ends_with(".annot.vcf.gz") {
            counts.svs = Some(count_vcf_records(reader)?);
        } else if relative.starts_with("ascat/") && relative.ends_with(".copynumber.caveman.csv") {
            counts.cnvs = Some(count_lines(reader)?);
        }
        Ok(())
    }
}
