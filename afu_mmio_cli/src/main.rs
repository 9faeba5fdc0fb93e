mod tester;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use tester::{MapArgs, NewArgs, RunArgs, TestArgs};

/// Cycle-accurate simulator for the AFU MMIO controller
#[derive(Parser, Debug)]
#[command(version, about)]
struct Arguments {
    #[command(subcommand)]
    pub command: Command,

    /// Log dropped writes and reset transitions
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    New(NewArgs),
    Run(RunArgs),
    Test(TestArgs),
    Map(MapArgs),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Arguments::parse();
    init_logging(args.verbose);

    match args.command {
        Command::New(new_args) => tester::new_project(new_args),
        Command::Run(run_args) => tester::run_trace_file(run_args),
        Command::Test(test_args) => tester::run_tests(test_args),
        Command::Map(map_args) => tester::print_map(map_args),
    }
}
