// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Replay an event log into the four runtime measurement registers

#![deny(missing_docs)]
#![deny(clippy::all)]

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, io::Read, path::PathBuf, str::FromStr};
use teacup::{
    log::{setup_logging, LogLevelParser},
    tdx::{
        eventlog::{parse_event_log, RtmrIndex},
        rtmr::replay_event_log,
    },
};
use tracing::{error, info, level_filters::LevelFilter};

/// Calculate the rtmr values an event log accounts for.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Arguments {
    /// Event log to replay, as emitted by the TEE agent. Pass `-` to read
    /// from stdin.
    #[clap(name = "event_log", value_parser)]
    event_log: ArgSource,
    /// Log level for the log output.
    /// Valid values are: `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[clap(long, default_value_t = LevelFilter::WARN, value_parser = LogLevelParser)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone)]
enum ArgSource {
    File(PathBuf),
    Stdin,
}

impl FromStr for ArgSource {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(ArgSource::Stdin),
            _ => Ok(ArgSource::File(PathBuf::from(s))),
        }
    }
}

fn main_with_error() -> Result<()> {
    let args = Arguments::parse();
    setup_logging(env!("CARGO_CRATE_NAME"), &args.log_level)?;

    let log = match args.event_log {
        ArgSource::File(path) => fs::read_to_string(path).context("Failed to read event log")?,
        ArgSource::Stdin => {
            let mut log = String::new();
            std::io::stdin()
                .read_to_string(&mut log)
                .context("Failed to read event log from stdin")?;
            log
        }
    };
    let entries = parse_event_log(&log)?;
    info!("Replaying {} events", entries.len());
    let replayed = replay_event_log(&entries);

    println!("{{");
    for index in RtmrIndex::ALL {
        let sep = if index == RtmrIndex::Rtmr3 { "" } else { "," };
        println!("\t\"{index}\": \"{}\"{sep}", hex::encode(replayed.get(index)));
    }
    println!("}}");

    Ok(())
}

fn main() -> Result<()> {
    let ret = main_with_error();
    if let Err(e) = &ret {
        error!(error = %e, "Execution failed");
    }
    ret
}
