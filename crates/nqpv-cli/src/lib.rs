//! nqpv-cli: command-line driver for the verifier. Reads a `.nqpv` module,
//! evaluates its scope, and either writes a report or answers a narrower
//! introspection/persistence question about an already-evaluated module.

pub mod commands;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// NQPV quantum program verifier.
#[derive(Parser)]
#[command(name = "nqpv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output on stdout; the report file is still written.
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a TOML settings file (`eps`, `sdp_precision`, `silent`,
    /// `identical_var_check`, `opt_preserving`), applied before the module's
    /// own `setting` commands run.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and verify a module, writing a report next to the input.
    Verify {
        /// Path to the `.nqpv` module.
        input: PathBuf,
        /// Report path (defaults to the input path with `output.txt` as the
        /// file name, in the same directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate a module and print the bindings of one of its scopes,
    /// without writing a report file.
    Show {
        /// Path to the `.nqpv` module.
        input: PathBuf,
        /// Dotted path into the module identifying a nested scope (root
        /// scope if omitted).
        path: Option<String>,
    },
    /// Evaluate a module and write one of its operator bindings to a
    /// `.npy` file.
    Save {
        /// Path to the `.nqpv` module.
        input: PathBuf,
        /// Dotted path to the operator binding to export.
        var: String,
        /// Destination `.npy` file.
        destination: PathBuf,
    },
}
