use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Sessions that can be simulated from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionSelection {
    Qualifying,
    Race,
    Weekend,
    /// Single-car test session of `test_session` in the parameter file
    Test,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "GP-SIM",
    about = "A lap-discrete qualifying and race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing
    #[clap(short, long)]
    pub debug: bool,

    /// Print the event feed while the session is simulated
    #[clap(short, long)]
    pub live: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the weekend parameter file
    #[clap(short, long)]
    pub parfile_path: PathBuf,

    /// Set path to a simulation constants file (OPTIONAL: defaults are used if not set)
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Set the seed of the random number generator (OPTIONAL: random if not set)
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Set number of simulation runs (more than one run gives a Monte Carlo summary)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Select the session to simulate
    #[clap(long, value_enum, default_value = "weekend")]
    pub session: SessionSelection,

    /// Set directory for the CSV exports (OPTIONAL: nothing is exported if not set)
    #[clap(short, long)]
    pub output_dir: Option<PathBuf>,
}
