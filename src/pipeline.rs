//! One reconciliation pass, from raw input paths to the final bundle.
//!
//! Order of work:
//! 1. output pre-flight (before any input is read)
//! 2. locate BAS files, result archives and metadata
//! 3. pair archives, reconcile the whole cohort
//! 4. extract each pair in archive discovery order, writing the report
//! 5. bundle the report and genotyping artifacts

use crate::archive;
use crate::bundle::{write_bundle, Artifact};
use crate::cohort::{self, ValidatedCohort};
use crate::config::RunConfig;
use crate::errors::{QcError, Result};
use crate::locator;
use crate::metadata::{self, PairMetadata};
use crate::metrics::{ExtractionUnit, MetricsExtractor};
use crate::reporting::{check_output_path, ReportWriter, REPORT_FILE_NAME};
use crate::{PairKey, SampleRole};
use indexmap::IndexMap;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub pairs: usize,
    pub artifacts: usize,
}

/// Locate inputs, pair the archives and validate the whole cohort.
pub fn prepare_cohort(config: &RunConfig) -> Result<ValidatedCohort> {
    let tumour_bas = locator::locate_bas_files(&config.tumour_bas)?;
    let normal_bas = locator::locate_bas_files(&config.normal_bas)?;
    let tars = locator::locate_variant_call_tars(&config.variant_call_tars)?;
    info!(
        "found {} tumour BAS, {} normal BAS and {} result archives",
        tumour_bas.len(),
        normal_bas.len(),
        tars.len()
    );

    let pairs = archive::collect_pairs(&tars)?;
    let tumours = cohort::sample_files(&tumour_bas, SampleRole::Tumour)?;
    let normals = cohort::sample_files(&normal_bas, SampleRole::Normal)?;
    cohort::reconcile(pairs, tumours, normals)
}

/// Metadata for every pair; empty records when no tables were given.
pub fn resolve_metadata(
    config: &RunConfig,
    cohort: &ValidatedCohort,
) -> Result<IndexMap<PairKey, PairMetadata>> {
    if config.metadata.is_empty() {
        return Ok(IndexMap::new());
    }
    let tables = locator::locate_metadata_files(&config.metadata)?;
    let index = metadata::load_metadata(&tables)?;
    info!("loaded metadata for {} samples", index.len());
    index.for_pairs(cohort.pairs.keys())
}

fn bas_path<'a>(cohort: &'a ValidatedCohort, pair: &PairKey, role: SampleRole) -> Result<&'a Path> {
    cohort
        .bas_for(pair, role)
        .map(PathBuf::as_path)
        .ok_or_else(|| QcError::MissingSample {
            role,
            samples: vec![pair.sample(role).to_string()],
        })
}

/// Extract every pair in order, one report line each.
///
/// Any extraction failure aborts the whole pass.
pub fn extract_pairs<W: Write, E: MetricsExtractor + ?Sized>(
    cohort: &ValidatedCohort,
    metadata: &IndexMap<PairKey, PairMetadata>,
    config: &RunConfig,
    scratch_dir: &Path,
    extractor: &mut E,
    report: &mut ReportWriter<W>,
) -> Result<Vec<Artifact>> {
    let no_metadata = PairMetadata::default();
    let mut artifacts = Vec::new();

    for (pair, archive) in &cohort.pairs {
        let unit = ExtractionUnit {
            pair,
            tumour_bas: bas_path(cohort, pair, SampleRole::Tumour)?,
            normal_bas: bas_path(cohort, pair, SampleRole::Normal)?,
            genome_size: config.genome_size,
            archive,
            scratch_dir,
            count_variants: config.count_variants,
            metadata: metadata.get(pair).unwrap_or(&no_metadata),
        };

        let metrics = extractor.extract(&unit)?;
        report.write_row(&metrics.row)?;
        debug!("{} produced {} artifacts", pair, metrics.artifacts.len());
        let pair_dir = unit.pair_dir();
        artifacts.extend(
            metrics
                .artifacts
                .into_iter()
                .map(|name| Artifact::new(pair.clone(), &pair_dir, name)),
        );
        extractor.release(&unit)?;
    }
    Ok(artifacts)
}

/// Run the full pass and write the bundle to `config.output_tar`.
pub fn run<E: MetricsExtractor + ?Sized>(config: &RunConfig, extractor: &mut E) -> Result<RunSummary> {
    config.validate()?;
    let output = locator::absolute_path(&config.output_tar)?;
    check_output_path(&output)?;

    let cohort = prepare_cohort(config)?;
    let metadata = resolve_metadata(config, &cohort)?;

    let scratch = tempfile::Builder::new().prefix("ppcg_qc").tempdir()?;
    debug!("scratch directory {}", scratch.path().display());

    let report_path = scratch.path().join(REPORT_FILE_NAME);
    let mut report = ReportWriter::create(&report_path, config.count_variants)?;
    let artifacts = extract_pairs(
        &cohort,
        &metadata,
        config,
        scratch.path(),
        extractor,
        &mut report,
    )?;
    let pairs = report.rows();
    report.finish()?.flush()?;

    write_bundle(&output, &report_path, &artifacts)?;
    info!("completed {} pairs", pairs);

    Ok(RunSummary {
        output,
        pairs,
        artifacts: artifacts.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PairMetrics;
    use crate::reporting::BASE_HEADER;

    /// Records calls and returns a row of sample names.
    #[derive(Default)]
    struct RecordingExtractor {
        calls: Vec<String>,
        fail_on: Option<String>,
    }

    impl MetricsExtractor for RecordingExtractor {
        fn extract(&mut self, unit: &ExtractionUnit<'_>) -> Result<PairMetrics> {
            self.calls.push(format!("extract {}", unit.pair));
            if self.fail_on.as_deref() == Some(unit.pair.tumour.as_str()) {
                return Err(QcError::Extraction {
                    pair: unit.pair.to_string(),
                    reason: "boom".to_string(),
                });
            }
            let mut row = vec![unit.pair.tumour.clone(); BASE_HEADER.len()];
            row[1] = unit.genome_size.to_string();
            row[2] = unit
                .metadata
                .donor_id
                .clone()
                .unwrap_or_else(|| "none".to_string());
            Ok(PairMetrics {
                row,
                artifacts: vec![PathBuf::from("g.tsv")],
            })
        }

        fn release(&mut self, unit: &ExtractionUnit<'_>) -> Result<()> {
            self.calls.push(format!("release {}", unit.pair));
            Ok(())
        }
    }

    fn cohort(pairs: &[(&str, &str)]) -> ValidatedCohort {
        let mut validated = ValidatedCohort {
            pairs: IndexMap::new(),
            tumour_bas: IndexMap::new(),
            normal_bas: IndexMap::new(),
        };
        for (t, n) in pairs {
            validated
                .pairs
                .insert(PairKey::new(*t, *n), PathBuf::from(format!("/vc/{}.tar.gz", t)));
            validated
                .tumour_bas
                .insert(t.to_string(), PathBuf::from(format!("/bas/{}.bam.bas", t)));
            validated
                .normal_bas
                .insert(n.to_string(), PathBuf::from(format!("/bas/{}.bam.bas", n)));
        }
        validated
    }

    #[test]
    fn test_pairs_extracted_in_order_with_release() {
        let cohort = cohort(&[("T2", "N2"), ("T1", "N1")]);
        let config = RunConfig::default();
        let mut metadata = IndexMap::new();
        metadata.insert(
            PairKey::new("T1", "N1"),
            PairMetadata {
                donor_id: Some("D1".into()),
                ..PairMetadata::default()
            },
        );

        let mut extractor = RecordingExtractor::default();
        let mut report = ReportWriter::new(Vec::new(), false).unwrap();
        let artifacts = extract_pairs(
            &cohort,
            &metadata,
            &config,
            Path::new("/scratch"),
            &mut extractor,
            &mut report,
        )
        .unwrap();

        assert_eq!(
            extractor.calls,
            vec![
                "extract T2_vs_N2",
                "release T2_vs_N2",
                "extract T1_vs_N1",
                "release T1_vs_N1"
            ]
        );
        assert_eq!(artifacts[0].pair, PairKey::new("T2", "N2"));
        assert_eq!(artifacts[1].path, PathBuf::from("/scratch/T1_vs_N1/g.tsv"));
        assert_eq!(artifacts[1].bundle_name(), PathBuf::from("T1_vs_N1/g.tsv"));

        let text = String::from_utf8(report.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("T2\t3137454505\tnone\t"));
        assert!(lines[2].starts_with("T1\t3137454505\tD1\t"));
    }

    #[test]
    fn test_extraction_failure_stops_run() {
        let cohort = cohort(&[("T1", "N1"), ("T2", "N2"), ("T3", "N3")]);
        let mut extractor = RecordingExtractor {
            fail_on: Some("T2".into()),
            ..RecordingExtractor::default()
        };
        let mut report = ReportWriter::new(Vec::new(), false).unwrap();

        let err = extract_pairs(
            &cohort,
            &IndexMap::new(),
            &RunConfig::default(),
            Path::new("/scratch"),
            &mut extractor,
            &mut report,
        )
        .unwrap_err();

        assert!(matches!(err, QcError::Extraction { .. }));
        assert_eq!(extractor.calls.len(), 3);
        assert_eq!(report.rows(), 1);
    }
}
