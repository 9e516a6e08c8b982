use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use log::{error, info};

use coexnet::analysis::{pipeline::*, write_results::*};
use coexnet::parsers::expression_parser::*;
use coexnet::utils::params::*;

#[derive(Parser, Debug)]
#[command(name = "coexnet", about, version, author)]
struct CliArgs {
    #[arg(
        short = 'e',
        long = "expression",
        value_name = "FILE",
        help = "Expression table (CSV or TSV) with genes as rows and samples as columns.",
        required = true
    )]
    expression: PathBuf,

    #[arg(
        short = 's',
        long = "samples",
        value_name = "LIST_OR_FILE",
        help = "Comma-separated sample ids or a file with one sample id per line. Uses all samples by default."
    )]
    samples: Option<String>,

    #[arg(
        short = 'g',
        long = "genes",
        value_name = "LIST_OR_FILE",
        help = "Comma-separated gene ids or a file with one gene id per line to restrict the network to."
    )]
    genes: Option<String>,

    #[arg(
        long = "top-variable",
        value_name = "COUNT",
        help = "Restrict the network to the most variable genes.",
        conflicts_with = "genes"
    )]
    top_variable: Option<usize>,

    #[arg(
        long = "random-supplement",
        value_name = "COUNT",
        help = "Number of randomly drawn genes added to the selected genes, or drawn from all genes when no selection is given.",
        default_value_t = 0
    )]
    random_supplement: usize,

    #[arg(
        short = 't',
        long = "threshold",
        value_name = "CORRELATION",
        help = "Minimum Pearson correlation (exclusive) for an edge.",
        default_value_t = DEFAULT_THRESHOLD
    )]
    threshold: f64,

    #[arg(
        short = 'r',
        long = "resolution",
        value_name = "GAMMA",
        help = "Louvain resolution. Lower values give more, smaller communities.",
        default_value_t = DEFAULT_RESOLUTION
    )]
    resolution: f64,

    #[arg(
        short = 'm',
        long = "min-community-size",
        value_name = "COUNT",
        help = "Communities with this many members or fewer are removed.",
        default_value_t = DEFAULT_MIN_COMMUNITY_SIZE
    )]
    min_community_size: usize,

    #[arg(
        short = 'n',
        long = "top-n",
        value_name = "COUNT",
        help = "Number of top PageRank genes reported per community.",
        default_value_t = DEFAULT_TOP_N
    )]
    top_n: usize,

    #[arg(
        long = "seed",
        value_name = "SEED",
        help = "Seed for Louvain node order and random gene supplement.",
        default_value_t = DEFAULT_SEED
    )]
    seed: u64,

    #[arg(
        short = 'p',
        long = "prefix",
        value_name = "NAME",
        help = "Prefix for gene set names, usually the condition name.",
        default_value = "community"
    )]
    prefix: String,

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

    let params = NetworkParams {
        threshold: cli_args.threshold,
        resolution: cli_args.resolution,
        min_community_size: cli_args.min_community_size,
        seed: cli_args.seed,
        centrality: CentralityParams {
            top_n: cli_args.top_n,
            ..Default::default()
        },
    };
    if let Err(e) = params.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

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

    let genes = match cli_args.genes.as_deref().map(process_id_list_input).transpose() {
        Ok(genes) => genes,
        Err(e) => {
            error!("Error reading gene list: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let selection = GeneSelection {
        genes,
        top_variable: cli_args.top_variable,
        random_supplement: cli_args.random_supplement,
        seed: cli_args.seed,
    };
    let table = match select_network_genes(table, &selection, &mut diagnostics) {
        Ok(table) => table,
        Err(e) => {
            error!("Error selecting genes: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let analysis = match build_network(&table, &params, &cli_args.prefix) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("Network analysis failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    diagnostics.merge(analysis.diagnostics.clone());

    if let Err(e) = write_network_results(&analysis, &cli_args.prefix, &cli_args.output_dir) {
        error!(
            "Failed to write network results to directory '{}': {}",
            cli_args.output_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    diagnostics.log_summary();
    info!("Finished analysis");
    ExitCode::SUCCESS
}
