use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

#[derive(Debug, Parser)]
#[clap(name = "aribsi")]
#[clap(about = "aribsi lists services and events carried in ISDB transport stream captures.", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Enable debug logging.{n}
    /// RUST_LOG takes precedence when set.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List services from the SDT.{n}
    /// Every input file is scanned to the end and the services found
    /// are merged, BS first, then CS, then everything else.
    #[clap(name = "sdt")]
    Sdt {
        /// Input TS files.
        #[clap(short, long = "input", value_name = "FILE", required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// PID carrying the SDT (hex with 0x prefix or decimal).
        #[clap(long, value_parser = maybe_hex::<u16>, default_value = "0x11")]
        pid: u16,

        /// Only list services from SDT actual (table id 0x42).
        #[clap(long)]
        actual_only: bool,

        /// Keep sections whose CRC32 does not match.
        #[clap(long = "no-crc")]
        no_crc: bool,

        /// Output format.
        #[clap(value_enum, short, long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List events from the EIT.{n}
    /// Events are printed in the order their sections appear,
    /// each event once per (service, event id, version).
    #[clap(name = "eit")]
    Eit {
        /// Input TS files.
        #[clap(short, long = "input", value_name = "FILE", required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// PID carrying the EIT (hex with 0x prefix or decimal).{n}
        /// BS/CS broadcasts also carry schedules on 0x26 and 0x27.
        #[clap(long, value_parser = maybe_hex::<u16>, default_value = "0x12")]
        pid: u16,

        /// Only list events of this service ID.
        #[clap(long, value_parser = maybe_hex::<u16>)]
        sid: Option<u16>,

        /// Only list present/following events.
        #[clap(long)]
        present_following: bool,

        /// Keep sections whose CRC32 does not match.
        #[clap(long = "no-crc")]
        no_crc: bool,

        /// Output format.
        #[clap(value_enum, short, long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}
