//! QC report output
//!
//! One tab-separated table: a fixed header, optionally extended with variant
//! counts, then one line per tumour/normal pair.

use crate::errors::{QcError, Result};
use crate::locator::validate_archive_name;
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// File name of the report inside the final bundle.
pub const REPORT_FILE_NAME: &str = "ppcg_sanger_metrics.txt";

pub const BASE_HEADER: [&str; 52] = [
    "Tumour sample name",
    "Tumour UUID",
    "Tumour sequencing year",
    "Tumour sequencer",
    "Tumour ReadGroup IDs",
    "Tumour depth per RG",
    "Tumour total depth",
    "Tumour fraction of mapped reads per RG",
    "Tumour mean fraction of mapped reads",
    "Tumour insert size per RG",
    "Tumour mean Insert size",
    "Tumour insert size sd per RG",
    "Tumour mean insert size sd",
    "Tumour r1 GC content per RG",
    "Tumour mean r1 GC content",
    "Tumour r2 GC content per RG",
    "Tumour mean r2 GC content",
    "Tumour fraction of duplicated reads per RG",
    "Tumour mean fraction of duplicated reads",
    "Tumour fraction of mis-matched pairs per RG",
    "Tumour mean fraction of mis-matched pairs",
    "Tumour contamination per RG",
    "Tumour mean contamination",
    "Tumour sex",
    "Tumour fraction of matched sex with Normal",
    "Tumour fraction of matched genotype with Normal",
    "Normal contamination in Tumour",
    "Normal sample name",
    "Normal UUID",
    "Normal sequencing year",
    "Normal sequencer",
    "Normal ReadGroup IDs",
    "Normal depth per RG",
    "Normal total depth",
    "Normal fraction of mapped reads per RG",
    "Normal mean fraction of mapped reads",
    "Normal insert size per RG",
    "Normal mean Insert size",
    "Normal insert size sd per RG",
    "Normal mean insert size sd",
    "Normal r1 GC content per RG",
    "Normal mean r1 GC content",
    "Normal r2 GC content per RG",
    "Normal mean r2 GC content",
    "Normal fraction of duplicated reads per RG",
    "Normal mean fraction of duplicated reads",
    "Normal fraction of mis-matched pairs per RG",
    "Normal mean fraction of mis-matched pairs",
    "Normal contamination per RG",
    "Normal mean contamination",
    "Donor ID",
    "Donor UUID",
];

pub const VARIANT_COUNT_HEADER: [&str; 4] = [
    "Number of SNVs (PASS/All)",
    "Number of INDELs (PASS/All)",
    "Number of SVs (PASS/All)",
    "Number of CNVs",
];

/// Report columns for this run.
pub fn header(count_variants: bool) -> Vec<&'static str> {
    let mut columns = BASE_HEADER.to_vec();
    if count_variants {
        columns.extend_from_slice(&VARIANT_COUNT_HEADER);
    }
    columns
}

/// Check the final output destination before any input is read.
///
/// The path must carry the `.tar.gz` extension, must not exist, and must
/// accept a placeholder write, which is removed again straight away.
pub fn check_output_path(path: &Path) -> Result<()> {
    validate_archive_name(path)?;
    if path.exists() {
        return Err(QcError::OutputExists(path.to_path_buf()));
    }

    let written = fs::write(path, "place holder\n");
    let removed = if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    };
    placeholder_outcome(path, written, removed)
}

/// A placeholder that could not be removed is reported by path, since it
/// blocks the next run.
fn placeholder_outcome(path: &Path, written: io::Result<()>, removed: io::Result<()>) -> Result<()> {
    if let Err(source) = removed {
        return Err(QcError::PlaceholderLeft {
            path: path.to_path_buf(),
            source,
        });
    }
    match written {
        Ok(()) => {
            debug!("output {} is writable", path.display());
            Ok(())
        }
        Err(source) => Err(QcError::OutputUnwritable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the header on creation, then one line per pair.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: usize,
    rows: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create a fresh report file; an existing file is never overwritten.
    pub fn create(path: &Path, count_variants: bool) -> Result<Self> {
        let file = File::options().write(true).create_new(true).open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                QcError::OutputExists(path.to_path_buf())
            } else {
                QcError::Io(e)
            }
        })?;
        Self::new(BufWriter::new(file), count_variants)
    }
}

fn write_error(err: csv::Error) -> QcError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => QcError::Io(io),
        other => QcError::Validation(format!("cannot write report line: {:?}", other)),
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, count_variants: bool) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        let columns = header(count_variants);
        writer.write_record(&columns).map_err(write_error)?;
        Ok(Self {
            writer,
            columns: columns.len(),
            rows: 0,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append one pair's line; its width must match the header.
    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        if row.len() != self.columns {
            return Err(QcError::Validation(format!(
                "report row has {} fields, header has {}",
                row.len(),
                self.columns
            )));
        }
        if let Some(field) = row.iter().find(|f| f.contains(['\t', '\n', '\r'])) {
            return Err(QcError::Validation(format!(
                "report field contains a tab or line break: {:?}",
                field
            )));
        }
        self.writer.write_record(row).map_err(write_error)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| QcError::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize, value: &str) -> Vec<String> {
        vec![value.to_string(); n]
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(header(false).len(), 52);
        assert_eq!(header(true).len(), 56);
        assert_eq!(header(true)[52], "Number of SNVs (PASS/All)");
    }

    #[test]
    fn test_report_lines_and_fields() {
        for (count_variants, width) in [(false, 52), (true, 56)] {
            let mut writer = ReportWriter::new(Vec::new(), count_variants).unwrap();
            for i in 0..3 {
                writer.write_row(&row(width, &format!("v{}", i))).unwrap();
            }
            assert_eq!(writer.rows(), 3);
            let text = String::from_utf8(writer.finish().unwrap()).unwrap();

            assert!(text.ends_with('\n'));
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.len(), 4);
            assert_eq!(lines[0], header(count_variants).join("\t"));
            assert!(lines.iter().all(|l| l.split('\t').count() == width));
        }
    }

    #[test]
    fn test_fields_with_spaces_not_quoted() {
        let mut writer = ReportWriter::new(Vec::new(), false).unwrap();
        writer.write_row(&row(52, "HiSeq X Ten")).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(!text.contains('"'));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let mut writer = ReportWriter::new(Vec::new(), true).unwrap();
        assert!(matches!(
            writer.write_row(&row(52, "x")),
            Err(QcError::Validation(_))
        ));
        assert!(matches!(
            writer.write_row(&row(56, "a\tb")),
            Err(QcError::Validation(_))
        ));
        assert_eq!(writer.rows(), 0);
    }

    #[test]
    fn test_output_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.tar.gz");
        check_output_path(&out).unwrap();
        assert!(!out.exists());

        fs::write(&out, b"").unwrap();
        assert!(matches!(check_output_path(&out), Err(QcError::OutputExists(_))));

        let unwritable = dir.path().join("missing_dir").join("out.tar.gz");
        assert!(matches!(
            check_output_path(&unwritable),
            Err(QcError::OutputUnwritable { .. })
        ));

        let wrong_name = dir.path().join("out.zip");
        assert!(matches!(check_output_path(&wrong_name), Err(QcError::Validation(_))));
    }

    #[test]
    fn test_stray_placeholder_named_in_error() {
        let path = Path::new("/data/out.tar.gz");
        let denied = || io::Error::new(io::ErrorKind::PermissionDenied, "denied");

        let err = placeholder_outcome(path, Ok(()), Err(denied())).unwrap_err();
        assert!(matches!(err, QcError::PlaceholderLeft { .. }));
        assert!(err.to_string().contains("/data/out.tar.gz"));

        assert!(matches!(
            placeholder_outcome(path, Err(denied()), Ok(())),
            Err(QcError::OutputUnwritable { .. })
        ));
        assert!(placeholder_outcome(path, Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        fs::write(&path, b"old").unwrap();
        assert!(matches!(
            ReportWriter::create(&path, false),
            Err(QcError::OutputExists(_))
        ));
    }
}
