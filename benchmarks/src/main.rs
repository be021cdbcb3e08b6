use std::path::PathBuf;

use benchmarks::dataset::{run_file, run_flood, run_zipf};
use benchmarks::memory::capacity_for_mbs;
use clap::{ArgAction, Parser, Subcommand};

const DEFAULT_CAPACITIES: [usize; 4] = [256, 1024, 4096, 16384];
const DEFAULT_EXPONENT: f64 = 1.1;
const DEFAULT_MAX_LINES: usize = 100_000_000;
const DEFAULT_NUM_EVENTS: usize = 1_000_000;
const DEFAULT_NUM_HOT: usize = 100;
const DEFAULT_NUM_KEYS: usize = 100_000;
const DEFAULT_TOP_K: usize = 100;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the estimator over a synthetic zipf stream
    Zipf {
        /// Size of the key space
        #[clap(short, long, value_parser, default_value_t=DEFAULT_NUM_KEYS)]
        num_keys: usize,

        /// Zipf exponent
        #[clap(short, long, value_parser, default_value_t=DEFAULT_EXPONENT)]
        exponent: f64,

        /// Number of events to stream
        #[clap(long, value_parser, default_value_t=DEFAULT_NUM_EVENTS)]
        num_events: usize,

        /// Monitored capacities to try
        #[clap(short, long, value_parser, default_values_t=DEFAULT_CAPACITIES)]
        capacity: Vec<usize>,

        /// Size capacities from memory budgets (in MB) instead of --capacity
        #[clap(short, long, value_parser)]
        memory: Vec<f32>,

        /// Depth of the ranking to score
        #[clap(short, long, value_parser, default_value_t=DEFAULT_TOP_K)]
        top_k: usize,

        /// Control the amount of output
        #[clap(short, long, action = ArgAction::SetTrue)]
        verbose: bool,
    },

    /// Run the estimator over a few hot keys drowned in one-off noise
    Flood {
        /// Number of hot keys
        #[clap(short, long, value_parser, default_value_t=DEFAULT_NUM_HOT)]
        num_hot: usize,

        /// Number of events to stream
        #[clap(long, value_parser, default_value_t=DEFAULT_NUM_EVENTS)]
        num_events: usize,

        /// Monitored capacities to try
        #[clap(short, long, value_parser, default_values_t=DEFAULT_CAPACITIES)]
        capacity: Vec<usize>,

        /// Size capacities from memory budgets (in MB) instead of --capacity
        #[clap(short, long, value_parser)]
        memory: Vec<f32>,

        /// Depth of the ranking to score
        #[clap(short, long, value_parser, default_value_t=DEFAULT_TOP_K)]
        top_k: usize,

        /// Control the amount of output
        #[clap(short, long, action = ArgAction::SetTrue)]
        verbose: bool,
    },

    /// Run the estimator over a gzipped file of keys, one per line
    File {
        /// Path to dataset
        input: PathBuf,

        /// Number of lines to take
        #[clap(long, value_parser, default_value_t=DEFAULT_MAX_LINES)]
        max_lines: usize,

        /// Monitored capacities to try
        #[clap(short, long, value_parser, default_values_t=DEFAULT_CAPACITIES)]
        capacity: Vec<usize>,

        /// Size capacities from memory budgets (in MB) instead of --capacity
        #[clap(short, long, value_parser)]
        memory: Vec<f32>,

        /// Depth of the ranking to score
        #[clap(short, long, value_parser, default_value_t=DEFAULT_TOP_K)]
        top_k: usize,

        /// Control the amount of output
        #[clap(short, long, action = ArgAction::SetTrue)]
        verbose: bool,
    },
}

/// Explicit capacities, unless memory budgets were given for key type `K`.
fn capacities_for<K>(capacities: &[usize], memories: &[f32]) -> Vec<usize> {
    if memories.is_empty() {
        capacities.to_vec()
    } else {
        memories
            .iter()
            .map(|&memory| capacity_for_mbs::<K>(memory))
            .collect()
    }
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Command::Zipf {
            num_keys,
            exponent,
            num_events,
            capacity,
            memory,
            top_k,
            verbose,
        } => {
            run_zipf(
                *num_keys,
                *exponent,
                *num_events,
                &capacities_for::<usize>(capacity, memory),
                *top_k,
                *verbose,
            );
        }
        Command::Flood {
            num_hot,
            num_events,
            capacity,
            memory,
            top_k,
            verbose,
        } => {
            run_flood(
                *num_hot,
                *num_events,
                &capacities_for::<String>(capacity, memory),
                *top_k,
                *verbose,
            );
        }
        Command::File {
            input,
            max_lines,
            capacity,
            memory,
            top_k,
            verbose,
        } => {
            run_file(
                input,
                *max_lines,
                &capacities_for::<String>(capacity, memory),
                *top_k,
                *verbose,
            );
        }
    }
}
