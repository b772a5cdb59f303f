mod commands;
mod context;
mod sjis;

use clap::Parser;
use env_logger::Env;
use log::debug;

use crate::context::{Cli, Commands};

fn main() {
    let arg = Cli::parse();

    let default_filter = if arg.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    debug!("{:?}", arg);

    let code = match arg.command {
        Commands::Sdt {
            input,
            pid,
            actual_only,
            no_crc,
            format,
        } => commands::cmd_sdt(input, pid, actual_only, no_crc, format),
        Commands::Eit {
            input,
            pid,
            sid,
            present_following,
            no_crc,
            format,
        } => commands::cmd_eit(input, pid, sid, present_following, no_crc, format),
    };

    std::process::exit(code);
}
