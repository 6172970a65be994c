#![allow(dead_code)]

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ppcg_qc_tools::bas::BAS_HEADER;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// BAS content for `sample`, one row per readgroup, 6 Gbp mapped each.
pub fn bas_content(sample: &str, readgroups: &[&str]) -> String {
    let mut content = BAS_HEADER.join("\t");
    content.push('\n');
    for rg in readgroups {
        let fields = [
            format!("{}.bam", sample),
            sample.to_string(),
            "ILLUMINA".to_string(),
            format!("{}_lane", rg),
            "LIB".to_string(),
            rg.to_string(),
        ];
        let counts = [
            "150", "150", "6000000000", "3000000000", "3000000000", "1000", "500", "500",
            "50000000", "25000000", "25000000", "45000000", "22500000", "22500000", "44000000",
            "1500000000", "1500000000", "420.00", "90.00", "410", "5000000", "22000000", "220000",
        ];
        content.push_str(&fields.join("\t"));
        content.push('\t');
        content.push_str(&counts.join("\t"));
        content.push('\n');
    }
    content
}

pub fn write_bas(dir: &Path, sample: &str, readgroups: &[&str]) -> PathBuf {
    let path = dir.join(format!("{}.bam.bas", sample));
    fs::write(&path, bas_content(sample, readgroups)).unwrap();
    path
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A `.tar.gz` holding a top-level directory `top` and the given files.
pub fn write_result_archive(path: &Path, top: &str, files: &[(&str, Vec<u8>)]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, top, std::io::empty()).unwrap();

    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", top, name), data.as_slice())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Member names and contents of a bundle.
pub fn read_bundle(path: &Path) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(MultiGzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (name, content)
        })
        .collect()
}
