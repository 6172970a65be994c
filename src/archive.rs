//! Tumour/normal identity from Sanger variant-call result archives
//!
//! A result package is a gzip-compressed tar whose top-level directory is
//! named `WGS_<tumour>_vs_<normal>`. Sample names are one or more ASCII
//! alphanumeric or `-` characters.

use crate::errors::{QcError, Result};
use crate::PairKey;
use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Open a result archive as a tar stream.
pub fn open_archive(path: &Path) -> Result<tar::Archive<MultiGzDecoder<BufReader<File>>>> {
    let file = File::open(path)?;
    Ok(tar::Archive::new(MultiGzDecoder::new(BufReader::new(file))))
}

fn is_sample_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Parse a member name against the `WGS_<tumour>_vs_<normal>` convention.
///
/// Only the bare directory name matches; files beneath it do not.
pub fn parse_pair_name(member: &str) -> Option<PairKey> {
    let name = member.strip_prefix("./").unwrap_or(member);
    let name = name.strip_suffix('/').unwrap_or(name);
    let rest = name.strip_prefix("WGS_")?;
    let (tumour, normal) = rest.split_once("_vs_")?;

    if is_sample_name(tumour) && is_sample_name(normal) {
        Some(PairKey::new(tumour, normal))
    } else {
        None
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> QcError {
    QcError::InvalidArchive {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Scan member names in archive order and return the first pairing match.
pub fn pair_key_from_archive(path: &Path) -> Result<PairKey> {
    info!("getting file list info from tar file {}", path.display());
    let mut archive = open_archive(path)?;
    let entries = archive
        .entries()
        .map_err(|e| invalid(path, format!("unreadable archive: {}", e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| invalid(path, format!("unreadable archive: {}", e)))?;
        let member = entry
            .path()
            .map_err(|e| invalid(path, format!("bad member name: {}", e)))?;
        if let Some(pair) = parse_pair_name(&member.to_string_lossy()) {
            debug!("{} holds results for {}", path.display(), pair);
            return Ok(pair);
        }
    }

    Err(invalid(path, "no WGS_<tumour>_vs_<normal> member found"))
}

/// Map every archive to its pair, preserving discovery order.
///
/// Two archives for the same pair are rejected rather than one silently
/// replacing the other.
pub fn collect_pairs(archives: &[PathBuf]) -> Result<IndexMap<PairKey, PathBuf>> {
    let mut pairs: IndexMap<PairKey, PathBuf> = IndexMap::new();
    for path in archives {
        let pair = pair_key_from_archive(path)?;
        if let Some(first) = pairs.get(&pair) {
            return Err(QcError::DuplicatePair {
                pair: pair.to_string(),
                first: first.clone(),
                second: path.clone(),
            });
        }
        pairs.insert(pair, path.clone());
    }
    Ok(pairs)
}
