use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;

use rust_transit_csa::{load_timetable, read_queries, Experiment, QueryMode};

/// Benchmark Connection Scan Algorithm queries over a public-transit
/// timetable dataset.
#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    /// Name of the dataset directory under ../Public-Transit-Data/
    name: String,

    /// Unrestricted walking with hub labelling
    #[arg(long)]
    hl: bool,

    /// Compute full-day profiles instead of single earliest arrivals
    #[arg(long)]
    profile: bool,

    /// Compute Pareto sets over arrival time, transfers and walking time
    #[arg(long, conflicts_with = "profile")]
    mc: bool,

    /// Read rank_queries.csv instead of queries.csv
    #[arg(long)]
    ranked: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mode = if args.profile {
        QueryMode::Profile
    } else if args.mc {
        QueryMode::MultiCriteria
    } else {
        QueryMode::EarliestArrival
    };
    let data_dir = PathBuf::from("../Public-Transit-Data").join(&args.name);

    let timetable = match load_timetable(&data_dir, args.hl) {
        Ok(timetable) => timetable,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    timetable.summary();

    let queries = match read_queries(&data_dir, args.ranked) {
        Ok(queries) => queries,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    let experiment = Experiment::new(&timetable, queries, mode, args.hl, &args.name, Path::new("."));
    if let Err(err) = experiment.run() {
        eprintln!("{}", err);
        exit(1);
    }
}
