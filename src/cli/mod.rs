pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Import, merge and export OpenPGP key rings.
#[derive(Parser, Debug)]
#[command(name = "keyport", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Key ring store directory (overrides [store].path)
    #[arg(long, global = true, env = "KEYPORT_STORE")]
    pub store: Option<PathBuf>,

    /// Path to alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the key rings found in a file without importing them
    Scan {
        /// Armored or binary key file ("-" for stdin)
        file: String,
    },

    /// Import key rings from a file into the store
    Import {
        /// Armored or binary key file ("-" for stdin)
        file: String,
        /// Import only these entries (numbers as shown by scan), e.g. --only 1,3
        #[arg(long, value_delimiter = ',')]
        only: Vec<usize>,
    },

    /// Export stored key rings as ASCII armor
    Export {
        /// Key IDs or fingerprints to export
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,
        /// Export every stored key ring
        #[arg(long)]
        all: bool,
        /// Export secret key rings instead of public ones
        #[arg(long)]
        secret: bool,
        /// Output file ("-" for stdout)
        #[arg(short, long)]
        output: String,
    },

    /// List stored key rings
    List {
        /// List secret key rings
        #[arg(long)]
        secret: bool,
    },

    /// Delete a stored key ring
    Delete {
        /// Key ID or fingerprint
        id: String,
        /// Delete the secret key ring (the public ring is kept)
        #[arg(long)]
        secret: bool,
    },

    /// Send a stored public key ring to a key server
    Upload {
        /// Key ID or fingerprint
        id: String,
        /// Key server URL (hkp://, hkps://, http:// or https://)
        #[arg(long)]
        server: Option<String>,
    },
}
