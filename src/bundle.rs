//! Final output archive
//!
//! The report sits at the root of the bundle; each pair's genotyping files
//! go under a directory named after the pair so basenames cannot collide
//! across pairs.

use crate::errors::{QcError, Result};
use crate::PairKey;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// A genotyping file produced while extracting one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub pair: PairKey,
    /// File on disk.
    pub path: PathBuf,
    /// Location below the pair's directory in the bundle.
    pub name: PathBuf,
}

impl Artifact {
    /// An artifact stored at `root/name`.
    pub fn new(pair: PairKey, root: &Path, name: PathBuf) -> Self {
        Self {
            pair,
            path: root.join(&name),
            name,
        }
    }

    /// Location inside the bundle: `<tumour>_vs_<normal>/<name>`.
    pub fn bundle_name(&self) -> PathBuf {
        Path::new(&self.pair.to_string()).join(&self.name)
    }
}

fn build(output: &Path, report: &Path, artifacts: &[Artifact]) -> io::Result<()> {
    let file = File::options().write(true).create_new(true).open(output)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let report_name = report.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "report path has no file name")
    })?;
    builder.append_path_with_name(report, report_name)?;

    let mut seen = HashSet::new();
    for artifact in artifacts {
        let name = artifact.bundle_name();
        if !seen.insert(name.clone()) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("two artifacts map to {}", name.display()),
            ));
        }
        debug!("adding {} as {}", artifact.path.display(), name.display());
        builder.append_path_with_name(&artifact.path, &name)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// Write the gzip-compressed bundle; nothing is left behind on failure.
pub fn write_bundle(output: &Path, report: &Path, artifacts: &[Artifact]) -> Result<()> {
    let existed = output.exists();
    match build(output, report, artifacts) {
        Ok(()) => {
            info!(
                "wrote {} with the report and {} genotyping files",
                output.display(),
                artifacts.len()
            );
            Ok(())
        }
        Err(e) => {
            if !existed && output.exists() {
                if let Err(rm) = fs::remove_file(output) {
                    warn!("could not remove partial output {}: {}", output.display(), rm);
                }
            }
            Err(QcError::Packaging(e))
        }
    }
}
