//! Input discovery
//!
//! Resolves user-supplied paths (files or directories) into flat lists of
//! input files. Directories are scanned one level deep; subdirectories are
//! skipped, never descended into.

use crate::bas;
use crate::errors::{QcError, Result};
use indexmap::IndexSet;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const METADATA_SUFFIX: &str = ".tsv";

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.len() > suffix.len() && n.ends_with(suffix))
        .unwrap_or(false)
}

/// Fail with `NotFound` unless the path exists.
pub fn check_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(QcError::NotFound(path.to_path_buf()))
    }
}

/// Absolute form of a path, without resolving symlinks.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Regular files directly inside `dir` whose name satisfies `keep`, sorted.
fn scan_directory(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            continue;
        }
        if keep(&path) {
            found.push(absolute_path(&path)?);
        }
    }
    found.sort();
    Ok(found)
}

/// Expand paths, validating each accepted file with `validate`.
///
/// A file reached more than once, e.g. through its directory and by name,
/// is kept at its first position only.
fn locate(
    inputs: &[PathBuf],
    kind: &str,
    keep: impl Fn(&Path) -> bool,
    validate: impl Fn(&Path) -> Result<()>,
) -> Result<Vec<PathBuf>> {
    let mut located = IndexSet::new();
    for path in inputs {
        check_exists(path)?;
        if path.is_dir() {
            debug!(
                "{} is a directory, taking all {} files in it but none from subdirectories",
                path.display(),
                kind
            );
            for file in scan_directory(path, &keep)? {
                validate(&file)?;
                add(&mut located, file);
            }
        } else {
            validate(path)?;
            add(&mut located, absolute_path(path)?);
        }
    }
    debug!("located {} {} files", located.len(), kind);
    Ok(located.into_iter().collect())
}

fn add(located: &mut IndexSet<PathBuf>, file: PathBuf) {
    if located.contains(&file) {
        debug!("{} given more than once, using it once", file.display());
    } else {
        located.insert(file);
    }
}

/// BAS files from files and directories; each must pass the BAS format check.
pub fn locate_bas_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    locate(inputs, "BAS", bas::is_bas_name, bas::validate_bas)
}

/// Check the `.tar.gz` naming convention shared by inputs and the final bundle.
pub fn validate_archive_name(path: &Path) -> Result<()> {
    if has_suffix(path, ARCHIVE_SUFFIX) {
        Ok(())
    } else {
        Err(QcError::Validation(format!(
            "file name must end with {}: {}",
            ARCHIVE_SUFFIX,
            path.display()
        )))
    }
}

/// Variant-call result archives from files and directories.
pub fn locate_variant_call_tars(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    locate(
        inputs,
        "tar.gz",
        |p| has_suffix(p, ARCHIVE_SUFFIX),
        validate_archive_name,
    )
}

/// Metadata tables; explicitly given files are accepted whatever their name.
pub fn locate_metadata_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    locate(inputs, "tsv", |p| has_suffix(p, METADATA_SUFFIX), |_| Ok(()))
}
