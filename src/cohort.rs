//! Cohort reconciliation
//!
//! Cross-checks the pairs found in result archives against the samples that
//! have BAS files. The whole batch is validated before any extraction: one
//! missing sample aborts the run.

use crate::bas;
use crate::errors::{QcError, Result};
use crate::{PairKey, SampleRole};
use indexmap::IndexMap;
use log::warn;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub type PairArchives = IndexMap<PairKey, PathBuf>;
pub type SampleFiles = IndexMap<String, PathBuf>;

/// Pairs and per-role BAS lookups that passed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCohort {
    pub pairs: PairArchives,
    pub tumour_bas: SampleFiles,
    pub normal_bas: SampleFiles,
}

impl ValidatedCohort {
    pub fn bas_for(&self, pair: &PairKey, role: SampleRole) -> Option<&PathBuf> {
        let files = match role {
            SampleRole::Tumour => &self.tumour_bas,
            SampleRole::Normal => &self.normal_bas,
        };
        files.get(pair.sample(role))
    }
}

/// Key BAS files by the sample name recorded inside them.
pub fn sample_files(bas_files: &[PathBuf], role: SampleRole) -> Result<SampleFiles> {
    let mut by_sample = SampleFiles::new();
    for path in bas_files {
        let sample = bas::sample_name_from_bas(path)?;
        if let Some(first) = by_sample.get(&sample) {
            return Err(QcError::DuplicateSample {
                kind: format!("{} BAS", role),
                sample,
                first: first.clone(),
                second: path.clone(),
            });
        }
        by_sample.insert(sample, path.clone());
    }
    Ok(by_sample)
}

/// Expected samples with no BAS file, sorted.
pub fn missing_samples<'a>(
    expected: impl IntoIterator<Item = &'a str>,
    present: &SampleFiles,
) -> Vec<String> {
    expected
        .into_iter()
        .filter(|name| !present.contains_key(*name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn check_role(pairs: &PairArchives, present: &SampleFiles, role: SampleRole) -> Result<()> {
    let missing = missing_samples(pairs.keys().map(|p| p.sample(role)), present);
    if !missing.is_empty() {
        return Err(QcError::MissingSample {
            role,
            samples: missing,
        });
    }

    let expected: BTreeSet<&str> = pairs.keys().map(|p| p.sample(role)).collect();
    for sample in present.keys().filter(|s| !expected.contains(s.as_str())) {
        warn!("{} BAS file for {} is not used by any result archive", role, sample);
    }
    Ok(())
}

/// Fail with `MissingSample` if any expected tumour or normal lacks a BAS
/// file; tumours are checked first. Inputs are returned unchanged.
pub fn reconcile(
    pairs: PairArchives,
    tumour_bas: SampleFiles,
    normal_bas: SampleFiles,
) -> Result<ValidatedCohort> {
    check_role(&pairs, &tumour_bas, SampleRole::Tumour)?;
    check_role(&pairs, &normal_bas, SampleRole::Normal)?;
    Ok(ValidatedCohort {
        pairs,
        tumour_bas,
        normal_bas,
    })
}
