use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use log::{error, info};

use coexnet::analysis::{pipeline::*, ssgsea::ScoreVariant, write_results::*};
use coexnet::parsers::{expression_parser::*, partition_parser::*};
use coexnet::utils::params::*;

#[derive(Parser, Debug)]
#[command(name = "coexnet-enrich", about, version, author)]
struct CliArgs {
    #[arg(
        short = 'c',
        long = "partition",
        value_name = "FILE",
        help = "Partition file with a gene column and a community column.",
        required = true
    )]
    partition: PathBuf,

    #[arg(
        short = 'e',
        long = "expression",
        value_name = "FILE",
        help = "Target expression table (CSV or TSV) with genes as rows and samples as columns.",
        required = true
    )]
    expression: PathBuf,

    #[arg(
        short = 's',
        long = "samples",
        value_name = "LIST_OR_FILE",
        help = "Comma-separated target sample ids or a file with one sample id per line. Uses all samples by default."
    )]
    samples: Option<String>,

    #[arg(
        short = 'p',
        long = "prefix",
        value_name = "NAME",
        help = "Prefix for gene set names, usually the condition the partition was built on.",
        default_value = "community"
    )]
    prefix: String,

    #[arg(
        long = "condition",
        value_name = "NAME",
        help = "Name of the target condition, appended to interpretation labels."
    )]
    condition: Option<String>,

    #[arg(
        long = "variant",
        value_enum,
        help = "Enrichment statistic computed from the running sum.",
        default_value_t = ScoreVariant::Cumulative
    )]
    variant: ScoreVariant,

    #[arg(
        short = 'w',
        long = "weight-exponent",
        value_name = "ALPHA",
        help = "Exponent applied to rank weights of gene set members.",
        default_value_t = DEFAULT_WEIGHT_EXPONENT
    )]
    weight_exponent: f64,

    #[arg(
        short = 'm',
        long = "min-set-size",
        value_name = "COUNT",
        help = "Minimum number of gene set members present in the target table.",
        default_value_t = DEFAULT_MIN_SET_SIZE
    )]
    min_set_size: usize,

    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIRECTORY",
        help = "Directory to write results.",
        required = true
    )]
    output_dir: PathBuf,

    #[arg(
        long = "cores",
        value_name = "NUMBER",
        help = "Number of cores to use for the analysis. Uses all available by default.",
        default_value_t = num_cpus::get()
    )]
    num_cores: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli_args: CliArgs = CliArgs::parse();

    info!("Analysis will be performed with {} core(s)", cli_args.num_cores);
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(cli_args.num_cores)
        .build_global() {
        error!("Failed to initialize Rayon global thread pool: {:?}", e);
    };

    let params = EnrichmentParams {
        variant: cli_args.variant,
        weight_exponent: cli_args.weight_exponent,
        min_set_size: cli_args.min_set_size,
    };
    if let Err(e) = params.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let partition = match read_partition(&cli_args.partition) {
        Ok(partition) => partition,
        Err(e) => {
            error!("Error reading partition '{}': {}", cli_args.partition.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let (table, mut diagnostics) = match ExpressionTable::from_csv_file(&cli_args.expression) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Error reading expression table '{}': {}", cli_args.expression.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let table = match &cli_args.samples {
        Some(samples) => {
            let selected = process_id_list_input(samples)
                .and_then(|ids| table.select_samples(&ids));
            match selected {
                Ok(selected) => selected,
                Err(e) => {
                    error!("Error selecting samples: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => table,
    };

    let analysis = match project_partition(
        &partition,
        &cli_args.prefix,
        &table,
        &params,
        cli_args.condition.as_deref(),
    ) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("Enrichment analysis failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    diagnostics.merge(analysis.diagnostics.clone());

    if let Err(e) = write_enrichment_results(&analysis, &cli_args.prefix, &cli_args.output_dir) {
        error!(
            "Failed to write enrichment results to directory '{}': {}",
            cli_args.output_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    diagnostics.log_summary();
    info!("Finished analysis");
    ExitCode::SUCCESS
}
