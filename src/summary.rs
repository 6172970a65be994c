//! Per-sample summaries of BAS readgroup statistics
//!
//! Every readgroup gets its own depth, mapping, insert size, GC, duplication
//! and mis-matched pair figures; the sample summary is the total depth plus
//! the arithmetic mean of each other figure across readgroups.

use crate::bas::{BasFile, ReadGroupStats};

pub const NA: &str = "NA";

/// `num / den`, or `None` when the denominator is zero.
pub fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Mean of the defined values; `None` if there are none.
pub fn mean_of(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => NA.to_string(),
    }
}

/// Comma-joined per-readgroup values.
pub fn format_list(values: impl IntoIterator<Item = Option<f64>>, decimals: usize) -> String {
    values
        .into_iter()
        .map(|v| format_value(v, decimals))
        .collect::<Vec<_>>()
        .join(",")
}

/// Figures derived from one BAS row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadGroupMetrics {
    pub id: String,
    pub depth: Option<f64>,
    pub fraction_mapped: Option<f64>,
    pub insert_size: Option<f64>,
    pub insert_size_sd: Option<f64>,
    pub gc_r1: Option<f64>,
    pub gc_r2: Option<f64>,
    pub fraction_duplicated: Option<f64>,
    pub fraction_mismatched_pairs: Option<f64>,
}

impl ReadGroupMetrics {
    pub fn from_stats(rg: &ReadGroupStats, genome_size: u64) -> Self {
        Self {
            id: rg.readgroup.clone(),
            depth: ratio(rg.mapped_bases, genome_size),
            fraction_mapped: ratio(rg.mapped_reads, rg.total_reads),
            insert_size: Some(rg.mean_insert_size),
            insert_size_sd: Some(rg.insert_size_sd),
            gc_r1: ratio(rg.gc_bases_r1, rg.total_reads_r1 * rg.read_length_r1),
            gc_r2: ratio(rg.gc_bases_r2, rg.total_reads_r2 * rg.read_length_r2),
            fraction_duplicated: ratio(rg.duplicate_reads, rg.total_reads),
            fraction_mismatched_pairs: ratio(rg.inter_chr_pairs, rg.mapped_pairs),
        }
    }
}

/// Readgroup figures and their sample-level aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSummary {
    pub sample: String,
    pub read_groups: Vec<ReadGroupMetrics>,
}

impl SampleSummary {
    pub fn from_bas(bas: &BasFile, genome_size: u64) -> Self {
        Self {
            sample: bas.sample.clone(),
            read_groups: bas
                .read_groups
                .iter()
                .map(|rg| ReadGroupMetrics::from_stats(rg, genome_size))
                .collect(),
        }
    }

    pub fn read_group_ids(&self) -> Vec<&str> {
        self.read_groups.iter().map(|rg| rg.id.as_str()).collect()
    }

    pub fn total_depth(&self) -> Option<f64> {
        self.read_groups
            .iter()
            .map(|rg| rg.depth)
            .sum::<Option<f64>>()
    }

    fn values(&self, field: fn(&ReadGroupMetrics) -> Option<f64>) -> Vec<Option<f64>> {
        self.read_groups.iter().map(field).collect()
    }

    /// Readgroup IDs through mean fraction of mis-matched pairs, in report
    /// column order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.read_group_ids().join(","),
            format_list(self.values(|rg| rg.depth), 3),
            format_value(self.total_depth(), 3),
        ];

        let fields: [(fn(&ReadGroupMetrics) -> Option<f64>, usize); 7] = [
            (|rg| rg.fraction_mapped, 3),
            (|rg| rg.insert_size, 2),
            (|rg| rg.insert_size_sd, 2),
            (|rg| rg.gc_r1, 3),
            (|rg| rg.gc_r2, 3),
            (|rg| rg.fraction_duplicated, 3),
            (|rg| rg.fraction_mismatched_pairs, 3),
        ];
        for (field, decimals) in fields {
            let values = self.values(field);
            columns.push(format_list(values.iter().copied(), decimals));
            columns.push(format_value(mean_of(values), decimals));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bas::tests::bas_content;

    fn summary(readgroups: &[&str], genome_size: u64) -> SampleSummary {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("T1.bam.bas");
        std::fs::write(&path, bas_content("T1", readgroups)).unwrap();
        SampleSummary::from_bas(&BasFile::from_path(&path).unwrap(), genome_size)
    }

    #[test]
    fn test_read_group_figures() {
        let s = summary(&["1"], 3_000_000_000);
        let rg = &s.read_groups[0];
        assert_eq!(rg.depth, Some(2.0));
        assert_eq!(rg.fraction_mapped, Some(0.75));
        assert_eq!(rg.gc_r1, Some(0.4));
        assert_eq!(rg.gc_r2, Some(0.5));
        assert_eq!(rg.fraction_duplicated, Some(0.1));
        assert_eq!(rg.fraction_mismatched_pairs, Some(0.01));
    }

    #[test]
    fn test_depth_sums_and_means_average() {
        let s = summary(&["1", "2"], 3_000_000_000);
        assert_eq!(s.total_depth(), Some(4.0));

        let columns = s.columns();
        assert_eq!(columns.len(), 17);
        assert_eq!(columns[0], "1,2");
        assert_eq!(columns[1], "2.000,2.000");
        assert_eq!(columns[2], "4.000");
        assert_eq!(columns[5], "450.50,450.50");
        assert_eq!(columns[6], "450.50");
    }

    #[test]
    fn test_undefined_values_render_na() {
        assert_eq!(ratio(5, 0), None);
        assert_eq!(format_value(None, 3), "NA");
        assert_eq!(format_value(Some(f64::NAN), 3), "NA");
        assert_eq!(mean_of([None, Some(1.0), Some(3.0)]), Some(2.0));
        assert_eq!(mean_of([None, None]), None);
        assert_eq!(format_list([Some(0.5), None], 2), "0.50,NA");
    }
}
