// Clippy allows
#![allow(clippy::too_many_arguments)]

//! genoview: coverage binning and feature layout for genome browsers
//!
//! Usage: genoview <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use genoview::commands::{
    ConvertCommand, CoverageCommand, IndexCommand, LayoutCommand, SummaryCommand,
};
use genoview::config::{DEFAULT_BINS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FEATURES_PER_TYPE, DEFAULT_MIN_COVERAGE};
use genoview::coverage::Reducer;
use genoview::error::ViewError;
use genoview::level::LevelConfig;
use genoview::reference::default_index_path;
use genoview::viewer::DEFAULT_SEED;

#[derive(Parser)]
#[command(name = "genoview")]
#[command(version)]
#[command(about = "genoview: binned coverage and non-overlapping feature layout for genome browsers", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Shift GFF3/GTF starts by one so that every annotation track uses
    /// 0-based half-open coordinates like BED. By default coordinates are
    /// kept as found in the file.
    #[arg(long, global = true)]
    one_based: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the length index of a FASTA file
    Index {
        /// Reference FASTA file (optionally gzipped)
        #[arg(short, long)]
        reference: PathBuf,

        /// Output index file (default: <dir>/<basename>.tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reference ids to keep
        #[arg(long, num_args = 1..)]
        refid: Vec<String>,
    },

    /// Convert BAM/SAM alignments to a gzipped coverage-BED file
    Convert {
        /// Input BAM or SAM file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: <dir>/<basename>.bed.gz)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimal depth of a retained position
        #[arg(long, default_value_t = DEFAULT_MIN_COVERAGE)]
        min_coverage: u32,

        /// Reference ids to keep
        #[arg(long, num_args = 1..)]
        refid: Vec<String>,
    },

    /// Binned coverage of a window for each alignment track
    Coverage {
        /// Reference FASTA or length index
        #[arg(short, long)]
        reference: PathBuf,

        /// Alignment files (BAM, SAM or coverage-BED)
        #[arg(short, long, num_args = 1.., required = true)]
        alignments: Vec<PathBuf>,

        /// Reference sequence to display
        #[arg(long)]
        refid: String,

        /// Window start (default: 0)
        #[arg(long)]
        start: Option<u64>,

        /// Window end (default: reference length - 1)
        #[arg(long)]
        end: Option<u64>,

        /// Number of bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        /// Bin aggregation: max, sum or mean
        #[arg(long, default_value = "max")]
        reducer: String,

        /// Minimal depth of a retained position
        #[arg(long, default_value_t = DEFAULT_MIN_COVERAGE)]
        min_coverage: u32,
    },

    /// Non-overlapping display levels of the features of a window
    Layout {
        /// Reference FASTA or length index
        #[arg(short, long)]
        reference: PathBuf,

        /// Annotation files (GFF3, GTF or BED, optionally gzipped)
        #[arg(short = 'f', long, num_args = 1.., required = true)]
        annotations: Vec<PathBuf>,

        /// Reference sequence to display
        #[arg(long)]
        refid: String,

        /// Window start (default: 0)
        #[arg(long)]
        start: Option<u64>,

        /// Window end (default: reference length - 1)
        #[arg(long)]
        end: Option<u64>,

        /// Minimal gap between features of a level (default: window / 400)
        #[arg(long)]
        offset: Option<u64>,

        /// Maximal number of levels per strand
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, value_parser = clap::value_parser!(i32).range(1..))]
        max_depth: i32,

        /// Feature types to lay out (default: all)
        #[arg(long, num_args = 1..)]
        types: Vec<String>,

        /// Randomly sample types with more features
        #[arg(long, default_value_t = DEFAULT_MAX_FEATURES_PER_TYPE)]
        max_features_per_type: usize,

        /// Seed of the feature sampling
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Drop features of the positive strand
        #[arg(long)]
        filter_positive: bool,

        /// Drop features of the negative strand
        #[arg(long)]
        filter_negative: bool,

        /// Drop unstranded features
        #[arg(long)]
        filter_unstranded: bool,
    },

    /// Summary tables of the reference and of every track
    Summary {
        /// Reference FASTA or length index
        #[arg(short, long)]
        reference: PathBuf,

        /// Alignment files (BAM, SAM or coverage-BED)
        #[arg(short, long, num_args = 1..)]
        alignments: Vec<PathBuf>,

        /// Annotation files (GFF3, GTF or BED)
        #[arg(short = 'f', long, num_args = 1..)]
        annotations: Vec<PathBuf>,

        /// Reference ids to keep, also the row order of the coverage table
        #[arg(long, num_args = 1..)]
        refid: Vec<String>,

        /// Minimal depth of a retained position
        #[arg(long, default_value_t = DEFAULT_MIN_COVERAGE)]
        min_coverage: u32,

        /// Scale the coverage of each track to a total of 1000
        #[arg(long)]
        norm_depth: bool,

        /// Express coverage per million bases of reference
        #[arg(long)]
        norm_len: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Must be set before any annotation file is parsed
    if cli.one_based {
        genoview::config::set_one_based_normalization(true);
    }

    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: Failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Index {
            reference,
            output,
            refid,
        } => run_index(reference, output, refid),

        Commands::Convert {
            input,
            output,
            min_coverage,
            refid,
        } => run_convert(input, output, min_coverage, refid),

        Commands::Coverage {
            reference,
            alignments,
            refid,
            start,
            end,
            bins,
            reducer,
            min_coverage,
        } => run_coverage(
            reference,
            alignments,
            refid,
            start,
            end,
            bins,
            reducer,
            min_coverage,
        ),

        Commands::Layout {
            reference,
            annotations,
            refid,
            start,
            end,
            offset,
            max_depth,
            types,
            max_features_per_type,
            seed,
            filter_positive,
            filter_negative,
            filter_unstranded,
        } => {
            let level = LevelConfig::default()
                .with_max_depth(max_depth)
                .with_filter_positive(filter_positive)
                .with_filter_negative(filter_negative)
                .with_filter_unstranded(filter_unstranded);
            let cmd = LayoutCommand::new(refid)
                .with_window(start, end)
                .with_offset(offset)
                .with_level(level)
                .with_types(types)
                .with_max_features_per_type(Some(max_features_per_type))
                .with_seed(seed);
            run_layout(cmd, reference, annotations)
        }

        Commands::Summary {
            reference,
            alignments,
            annotations,
            refid,
            min_coverage,
            norm_depth,
            norm_len,
        } => run_summary(
            reference,
            alignments,
            annotations,
            refid,
            min_coverage,
            norm_depth,
            norm_len,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_index(reference: PathBuf, output: Option<PathBuf>, refid: Vec<String>) -> Result<(), ViewError> {
    let output = output.unwrap_or_else(|| default_index_path(&reference));
    let mut file = File::create(&output)?;

    let stats = IndexCommand::new()
        .with_refids(refid)
        .run(&reference, &mut file)?;
    info!("{} in {}", stats, output.display());
    Ok(())
}

fn run_convert(
    input: PathBuf,
    output: Option<PathBuf>,
    min_coverage: u32,
    refid: Vec<String>,
) -> Result<(), ViewError> {
    let stats = ConvertCommand::new()
        .with_min_coverage(min_coverage)
        .with_refids(refid)
        .run(&input, output)?;
    info!("{}", stats);
    Ok(())
}

fn run_coverage(
    reference: PathBuf,
    alignments: Vec<PathBuf>,
    refid: String,
    start: Option<u64>,
    end: Option<u64>,
    bins: usize,
    reducer: String,
    min_coverage: u32,
) -> Result<(), ViewError> {
    let reducer: Reducer = reducer.parse()?;
    let cmd = CoverageCommand::new(refid)
        .with_window(start, end)
        .with_bins(bins)
        .with_reducer(reducer)
        .with_min_coverage(min_coverage);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    cmd.run(&reference, &alignments, &mut handle)?;
    Ok(())
}

fn run_layout(cmd: LayoutCommand, reference: PathBuf, annotations: Vec<PathBuf>) -> Result<(), ViewError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let stats = cmd.run(&reference, &annotations, &mut handle)?;
    info!("Layout: {}", stats);
    Ok(())
}

fn run_summary(
    reference: PathBuf,
    alignments: Vec<PathBuf>,
    annotations: Vec<PathBuf>,
    refid: Vec<String>,
    min_coverage: u32,
    norm_depth: bool,
    norm_len: bool,
) -> Result<(), ViewError> {
    let cmd = SummaryCommand::new()
        .with_min_coverage(min_coverage)
        .with_refids(refid)
        .with_normalization(norm_depth, norm_len);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    cmd.run(&reference, &alignments, &annotations, &mut handle)
}
