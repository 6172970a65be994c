//! Sample metadata tables
//!
//! Optional tab-separated tables describing sequenced samples. Rows are keyed
//! by `sample_id`, which must equal the sample name used in BAS files and
//! result archives. Pairs without metadata get an empty record.

use crate::errors::{QcError, Result};
use crate::PairKey;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One metadata row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleMetadata {
    pub sample_id: String,
    #[serde(default)]
    pub sample_uuid: Option<String>,
    #[serde(default)]
    pub donor_id: Option<String>,
    #[serde(default)]
    pub donor_uuid: Option<String>,
    #[serde(default)]
    pub sequencing_year: Option<String>,
    #[serde(default)]
    pub sequencer: Option<String>,
}

/// Metadata resolved for one tumour/normal pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairMetadata {
    pub tumour: Option<SampleMetadata>,
    pub normal: Option<SampleMetadata>,
    pub donor_id: Option<String>,
    pub donor_uuid: Option<String>,
}

impl PairMetadata {
    pub fn is_empty(&self) -> bool {
        self.tumour.is_none() && self.normal.is_none()
    }
}

/// All metadata rows across every table, keyed by sample.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    rows: IndexMap<String, (SampleMetadata, PathBuf)>,
}

impl MetadataIndex {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, sample: &str) -> Option<&SampleMetadata> {
        self.rows.get(sample).map(|(row, _)| row)
    }

    fn insert(&mut self, row: SampleMetadata, source: &Path) -> Result<()> {
        if let Some((_, first)) = self.rows.get(&row.sample_id) {
            return Err(QcError::DuplicateSample {
                kind: "metadata".to_string(),
                sample: row.sample_id.clone(),
                first: first.clone(),
                second: source.to_path_buf(),
            });
        }
        self.rows
            .insert(row.sample_id.clone(), (row, source.to_path_buf()));
        Ok(())
    }

    /// Join the index against every pair.
    pub fn for_pairs<'a>(
        &self,
        pairs: impl IntoIterator<Item = &'a PairKey>,
    ) -> Result<IndexMap<PairKey, PairMetadata>> {
        let mut resolved = IndexMap::new();
        for pair in pairs {
            resolved.insert(pair.clone(), self.for_pair(pair)?);
        }
        Ok(resolved)
    }

    /// Tumour and normal rows for a pair; donor identity from the tumour row
    /// first, then the normal row.
    pub fn for_pair(&self, pair: &PairKey) -> Result<PairMetadata> {
        let tumour = self.get(&pair.tumour).cloned();
        let normal = self.get(&pair.normal).cloned();

        let donor_of = |row: &Option<SampleMetadata>| row.as_ref().and_then(|r| r.donor_id.clone());
        if let (Some(t), Some(n)) = (donor_of(&tumour), donor_of(&normal)) {
            if t != n {
                return Err(QcError::Validation(format!(
                    "metadata assigns {} to donor {} but {} to donor {}",
                    pair.tumour, t, pair.normal, n
                )));
            }
        }

        if tumour.is_none() && normal.is_none() && !self.is_empty() {
            warn!("no metadata found for {}", pair);
        }

        let pick = |field: fn(&SampleMetadata) -> Option<String>| {
            tumour
                .as_ref()
                .and_then(field)
                .or_else(|| normal.as_ref().and_then(field))
        };
        let donor_id = pick(|r| r.donor_id.clone());
        let donor_uuid = pick(|r| r.donor_uuid.clone());

        Ok(PairMetadata {
            tumour,
            normal,
            donor_id,
            donor_uuid,
        })
    }
}

/// Read one metadata table into the index.
fn load_table(path: &Path, index: &mut MetadataIndex) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| QcError::Validation(format!("cannot read metadata {}: {}", path.display(), e)))?;

    let mut rows = 0usize;
    for (i, row) in reader.deserialize::<SampleMetadata>().enumerate() {
        let row = row.map_err(|e| {
            QcError::Validation(format!(
                "malformed row {} in metadata {}: {}",
                i + 1,
                path.display(),
                e
            ))
        })?;
        if row.sample_id.is_empty() {
            return Err(QcError::Validation(format!(
                "row {} in metadata {} has no sample_id",
                i + 1,
                path.display()
            )));
        }
        index.insert(row, path)?;
        rows += 1;
    }
    debug!("read {} metadata rows from {}", rows, path.display());
    Ok(())
}

/// Build the index from every metadata table; a sample may appear only once.
pub fn load_metadata(paths: &[PathBuf]) -> Result<MetadataIndex> {
    let mut index = MetadataIndex::default();
    for path in paths {
        load_table(path, &mut index)?;
    }
    Ok(index)
}
