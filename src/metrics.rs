//! Per-pair metric extraction
//!
//! The pipeline hands each validated pair to a [`MetricsExtractor`] and gets
//! back one report row plus any genotyping artifacts. [`SangerMetricsExtractor`]
//! builds rows from BAS files and the Sanger result archive.

use crate::bas::BasFile;
use crate::errors::Result;
use crate::metadata::{PairMetadata, SampleMetadata};
use crate::results::{ArchiveFindings, PassAll, ResultArchiveReader, SampleContamination};
use crate::summary::{format_list, format_value, SampleSummary, NA};
use crate::{PairKey, SampleRole};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Everything needed to extract metrics for one pair.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionUnit<'a> {
    pub pair: &'a PairKey,
    pub tumour_bas: &'a Path,
    pub normal_bas: &'a Path,
    pub genome_size: u64,
    pub archive: &'a Path,
    pub scratch_dir: &'a Path,
    pub count_variants: bool,
    pub metadata: &'a PairMetadata,
}

impl ExtractionUnit<'_> {
    /// Pair-specific directory inside the shared scratch directory.
    pub fn pair_dir(&self) -> PathBuf {
        self.scratch_dir.join(self.pair.to_string())
    }
}

/// One report row and the files produced alongside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairMetrics {
    pub row: Vec<String>,
    /// Files written below [`ExtractionUnit::pair_dir`], relative to it.
    pub artifacts: Vec<PathBuf>,
}

/// Capability that turns one pair's inputs into a report row.
pub trait MetricsExtractor {
    fn extract(&mut self, unit: &ExtractionUnit<'_>) -> Result<PairMetrics>;

    /// Drop any transient state held for `unit`; called once its row and
    /// artifacts have been consumed.
    fn release(&mut self, unit: &ExtractionUnit<'_>) -> Result<()>;
}

fn text(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NA.to_string(),
    }
}

fn sample_text(meta: Option<&SampleMetadata>, field: fn(&SampleMetadata) -> Option<&str>) -> String {
    text(meta.and_then(field))
}

fn pass_all(counts: Option<PassAll>) -> String {
    counts.map(|c| c.to_string()).unwrap_or_else(|| NA.to_string())
}

/// Columns shared by the tumour and normal blocks.
fn sample_block(
    summary: &SampleSummary,
    meta: Option<&SampleMetadata>,
    contamination: Option<&SampleContamination>,
) -> Vec<String> {
    let mut block = vec![
        summary.sample.clone(),
        sample_text(meta, |m| m.sample_uuid.as_deref()),
        sample_text(meta, |m| m.sequencing_year.as_deref()),
        sample_text(meta, |m| m.sequencer.as_deref()),
    ];
    block.extend(summary.columns());

    let per_rg: Vec<Option<f64>> = summary
        .read_group_ids()
        .into_iter()
        .map(|id| contamination.and_then(|c| c.by_readgroup.get(id).copied()))
        .collect();
    block.push(format_list(per_rg, 3));
    block.push(format_value(contamination.map(|c| c.contamination), 3));
    block
}

struct LoadedPair {
    pair: PairKey,
    tumour: SampleSummary,
    normal: SampleSummary,
    findings: ArchiveFindings,
}

/// Extractor for Sanger cgpwgs results.
///
/// Stateless: BAS summaries and archive findings live only for the duration
/// of one `extract` call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SangerMetricsExtractor;

impl SangerMetricsExtractor {
    pub fn new() -> Self {
        Self
    }

    fn load(unit: &ExtractionUnit<'_>) -> Result<LoadedPair> {
        let tumour = SampleSummary::from_bas(&BasFile::from_path(unit.tumour_bas)?, unit.genome_size);
        let normal = SampleSummary::from_bas(&BasFile::from_path(unit.normal_bas)?, unit.genome_size);
        let findings = ResultArchiveReader::new(unit.count_variants).read(
            unit.archive,
            unit.pair,
            &unit.pair_dir(),
        )?;
        Ok(LoadedPair {
            pair: unit.pair.clone(),
            tumour,
            normal,
            findings,
        })
    }

    fn row(loaded: &LoadedPair, metadata: &PairMetadata, count_variants: bool) -> Vec<String> {
        let findings = &loaded.findings;
        let contamination = |role: SampleRole| findings.contamination.get(loaded.pair.sample(role));

        let mut row = sample_block(
            &loaded.tumour,
            metadata.tumour.as_ref(),
            contamination(SampleRole::Tumour),
        );

        let tumour_call = findings
            .genotype
            .as_ref()
            .and_then(|g| g.tumour(&loaded.pair.tumour));
        let gender = tumour_call.and_then(|t| t.gender.as_ref());
        row.push(text(gender.map(|g| g.gender.as_str())));
        row.push(format_value(gender.and_then(|g| g.frac_match_gender), 3));
        row.push(format_value(
            tumour_call
                .and_then(|t| t.genotype.as_ref())
                .map(|g| g.frac_matched_genotype),
            3,
        ));
        row.push(format_value(findings.normal_contamination, 3));

        row.extend(sample_block(
            &loaded.normal,
            metadata.normal.as_ref(),
            contamination(SampleRole::Normal),
        ));

        row.push(text(metadata.donor_id.as_deref()));
        row.push(text(metadata.donor_uuid.as_deref()));

        if count_variants {
            let counts = findings.variant_counts.clone().unwrap_or_default();
            row.push(pass_all(counts.snvs));
            row.push(pass_all(counts.indels));
            row.push(pass_all(counts.svs));
            row.push(
                counts
                    .cnvs
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| NA.to_string()),
            );
        }
        row
    }
}

impl MetricsExtractor for SangerMetricsExtractor {
    fn extract(&mut self, unit: &ExtractionUnit<'_>) -> Result<PairMetrics> {
        info!("extracting QC metrics for {}", unit.pair);
        let loaded = Self::load(unit)?;
        let row = Self::row(&loaded, unit.metadata, unit.count_variants);
        Ok(PairMetrics {
            row,
            artifacts: loaded.findings.artifacts,
        })
    }

    /// Nothing to free; the pair directory holds only artifacts, which stay
    /// until the bundle is written.
    fn release(&mut self, unit: &ExtractionUnit<'_>) -> Result<()> {
        debug!("done with {}", unit.pair);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use crate::bas::tests::bas_content;
    use crate::reporting::{BASE_HEADER, VARIANT_COUNT_HEADER};
    use std::fs;

    fn column<'a>(row: &'a [String], header: &str) -> &'a str {
        let idx = BASE_HEADER
            .iter()
            .chain(VARIANT_COUNT_HEADER.iter())
            .position(|h| *h == header)
            .unwrap();
        &row[idx]
    }

    #[test]
    fn test_sanger_row_layout() {
        let dir = tempfile::tempdir().unwrap();
        let tumour_bas = dir.path().join("T1.bam.bas");
        let normal_bas = dir.path().join("N1.bam.bas");
        fs::write(&tumour_bas, bas_content("T1", &["1", "2"])).unwrap();
        fs::write(&normal_bas, bas_content("N1", &["3"])).unwrap();

        let archive = dir.path().join("r.tar.gz");
        let genotype = br#"{"tumours": [{"sample": "T1",
                                        "gender": {"gender": "XX", "frac_match_gender": 1.0},
                                        "genotype": {"frac_matched_genotype": 0.995}}]}"#;
        write_archive(
            &archive,
            &["WGS_T1_vs_N1"],
            &[
                (
                    "WGS_T1_vs_N1/contamination/result.json",
                    br#"{"T1": {"contamination": 0.012, "by_readgroup": {"2": 0.02}}}"#.as_slice(),
                ),
                ("WGS_T1_vs_N1/genotyped/result.json", genotype.as_slice()),
            ],
        );

        let pair = PairKey::new("T1", "N1");
        let metadata = PairMetadata {
            donor_id: Some("D1".into()),
            ..PairMetadata::default()
        };
        let scratch = dir.path().join("scratch");
        let unit = ExtractionUnit {
            pair: &pair,
            tumour_bas: &tumour_bas,
            normal_bas: &normal_bas,
            genome_size: 3_000_000_000,
            archive: &archive,
            scratch_dir: &scratch,
            count_variants: true,
            metadata: &metadata,
        };

        let mut extractor = SangerMetricsExtractor::new();
        let metrics = extractor.extract(&unit).unwrap();
        let row = &metrics.row;

        assert_eq!(row.len(), BASE_HEADER.len() + VARIANT_COUNT_HEADER.len());
        assert_eq!(column(row, "Tumour sample name"), "T1");
        assert_eq!(column(row, "Tumour UUID"), "NA");
        assert_eq!(column(row, "Tumour ReadGroup IDs"), "1,2");
        assert_eq!(column(row, "Tumour total depth"), "4.000");
        assert_eq!(column(row, "Tumour contamination per RG"), "NA,0.020");
        assert_eq!(column(row, "Tumour mean contamination"), "0.012");
        assert_eq!(column(row, "Tumour sex"), "XX");
        assert_eq!(column(row, "Tumour fraction of matched genotype with Normal"), "0.995");
        assert_eq!(column(row, "Normal contamination in Tumour"), "NA");
        assert_eq!(column(row, "Normal sample name"), "N1");
        assert_eq!(column(row, "Normal total depth"), "2.000");
        assert_eq!(column(row, "Normal mean contamination"), "NA");
        assert_eq!(column(row, "Donor ID"), "D1");
        assert_eq!(column(row, "Number of SNVs (PASS/All)"), "NA");

        extractor.release(&unit).unwrap();
        assert!(metrics.artifacts.is_empty());
    }

    #[test]
    fn test_artifacts_survive_release() {
        let dir = tempfile::tempdir().unwrap();
        let tumour_bas = dir.path().join("T1.bam.bas");
        let normal_bas = dir.path().join("N1.bam.bas");
        fs::write(&tumour_bas, bas_content("T1", &["1"])).unwrap();
        fs::write(&normal_bas, bas_content("N1", &["2"])).unwrap();
        let archive = dir.path().join("r.tar.gz");
        write_archive(
            &archive,
            &["WGS_T1_vs_N1"],
            &[("WGS_T1_vs_N1/genotyped/g.tsv", b"chr\tpos\n".as_slice())],
        );

        let pair = PairKey::new("T1", "N1");
        let metadata = PairMetadata::default();
        let scratch = dir.path().join("scratch");
        let unit = ExtractionUnit {
            pair: &pair,
            tumour_bas: &tumour_bas,
            normal_bas: &normal_bas,
            genome_size: 3_000_000_000,
            archive: &archive,
            scratch_dir: &scratch,
            count_variants: false,
            metadata: &metadata,
        };

        let mut extractor = SangerMetricsExtractor::new();
        let metrics = extractor.extract(&unit).unwrap();
        extractor.release(&unit).unwrap();

        assert_eq!(metrics.row.len(), BASE_HEADER.len());
        assert_eq!(metrics.artifacts, vec![PathBuf::from("g.tsv")]);
        assert!(unit.pair_dir().join("g.tsv").exists());
    }
}
