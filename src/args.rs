use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about = "run producer / consumer workloads over a corobus channel bus")]
pub struct ArgsParser {
    /// more logging (-v for debug, -vv for trace). ignored if RUST_LOG is set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// run the workload described by a config file
    Run {
        #[arg(
            long,
            short,
            help = "config filepath (if not provided, the built in example configuration is used)"
        )]
        config: Option<PathBuf>,
    },
    /// parse and validate a config file, then print it
    Check {
        #[arg(long, short, help = "config filepath")]
        config: PathBuf,
    },
}
