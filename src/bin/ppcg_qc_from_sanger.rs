//! PPCG QC From Sanger
//!
//! Consolidated QC metrics for tumour/normal pairs processed by the Sanger
//! cgpmap/cgpwgs pipelines, bundled into one `.tar.gz`.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ppcg_qc_tools::metrics::SangerMetricsExtractor;
use ppcg_qc_tools::{pipeline, RunConfig};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("ppcg-qc-from-sanger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Consolidated QC report for tumour/normal pairs from Sanger variant calling results")
        .author("Megan Johnson")
        .arg_required_else_help(true)
        .arg(
            Arg::new("tumour_bas")
                .short('t')
                .long("tumour-bas")
                .value_name("FILE")
                .help("Tumour BAS files (.bam.bas) from cgpmap, or folders of them")
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("normal_bas")
                .short('n')
                .long("normal-bas")
                .value_name("FILE")
                .help("Normal BAS files (.bam.bas) from cgpmap, or folders of them")
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("variant_call_tar")
                .short('r')
                .long("variant-call-tar")
                .value_name("FILE")
                .help("cgpwgs result archives (.tar.gz), or folders of them")
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("output_tar")
                .short('o')
                .long("output-tar")
                .value_name("FILE")
                .help("Output archive, requires the .tar.gz extension")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("genome_size")
                .short('g')
                .long("genome-size")
                .value_name("INT")
                .help("Genome size used for depth, defaults to the GRCh37 size")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("3137454505"),
        )
        .arg(
            Arg::new("metadata")
                .short('m')
                .long("metadata")
                .value_name("FILE")
                .help("Sample metadata tables (.tsv), or folders of them")
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("count_variants")
                .short('c')
                .long("count-variants")
                .help("Add SNV, INDEL, SV and CNV counts to the report")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Print more info for debugging")
                .action(ArgAction::SetTrue),
        )
}

fn paths(matches: &ArgMatches, id: &str) -> Vec<PathBuf> {
    matches
        .get_many::<PathBuf>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn parse_config(matches: &ArgMatches) -> Result<RunConfig> {
    let output_tar = matches
        .get_one::<PathBuf>("output_tar")
        .cloned()
        .context("--output-tar is required")?;
    let genome_size = *matches
        .get_one::<u64>("genome_size")
        .context("--genome-size has no value")?;

    Ok(RunConfig::new(
        paths(matches, "tumour_bas"),
        paths(matches, "normal_bas"),
        paths(matches, "variant_call_tar"),
        output_tar,
    )
    .with_genome_size(genome_size)
    .with_metadata(paths(matches, "metadata"))
    .with_count_variants(matches.get_flag("count_variants")))
}

fn main() {
    let matches = cli().get_matches();

    let log_level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_target(false)
        .init();

    let config = match parse_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    log::debug!("run configuration: {:?}", config);

    let mut extractor = SangerMetricsExtractor::new();
    match pipeline::run(&config, &mut extractor) {
        Ok(summary) => {
            println!("✅ QC extraction complete!");
            println!("🧬 Pairs: {}", summary.pairs);
            println!("📄 Genotyping files: {}", summary.artifacts);
            println!("💾 Results saved to: {}", summary.output.display());
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
