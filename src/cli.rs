//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

/// gfxtrace - Query a graphics-trace replay server
#[derive(Parser, Debug)]
#[command(name = "gfxtrace")]
#[command(about = "Query a graphics-trace replay server", long_about = None)]
pub struct Cli {
    /// Replay server address (host:port)
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Largest single write to the server, in bytes
    #[arg(long, global = true)]
    pub mtu: Option<usize>,

    /// Protocol version sent in the handshake
    #[arg(long, global = true)]
    pub protocol_version: Option<u32>,

    /// Path to config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the server's type schema
    Schema,
    /// List the features the server supports
    Features,
    /// List replay devices
    Devices,
    /// List loaded captures
    Captures,
    /// List available string tables
    StringTables,
    /// Load a capture file the server can read
    Load {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Upload a local capture file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run the full connect sequence for a capture
    Bootstrap {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Upload the file instead of asking the server to load it
        #[arg(long)]
        upload: bool,
    },
}

impl Cli {
    /// Apply command-line flags on top of file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(address) = &self.address {
            settings.connection.address = address.clone();
        }
        if let Some(mtu) = self.mtu {
            settings.connection.mtu = mtu;
        }
        if let Some(version) = self.protocol_version {
            settings.connection.protocol_version = version;
        }
    }
}
