// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Tool for checking TDX attestation evidence against its event log

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{fs, io::Read, path::PathBuf, str::FromStr};
use teacup::{
    log::{setup_logging, LogLevelParser},
    quote::Quote,
    reportdata::encode_report_data,
    tdx::{
        eventlog::{parse_event_log, RtmrIndex},
        rtmr::{replay_event_log, RtmrCorrelation},
    },
};
use tracing::{error, info, level_filters::LevelFilter};

/// Parse an attestation quote, replay its event log and report which runtime
/// measurement registers the log accounts for.
#[derive(Parser, Debug)]
#[command(author = "Matter Labs", version, about = "TDX evidence verifier", long_about = None)]
struct Arguments {
    /// Attestation quote, raw or hex encoded. Pass `-` to read from stdin.
    #[clap(name = "quote_file", value_parser)]
    quote: ArgSource,
    /// Event log to replay against the quote, as emitted by the TEE agent.
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Expected report data. Encoded like the quote request, so text shorter
    /// than 64 bytes is zero padded.
    #[arg(long)]
    report_data: Option<String>,
    /// Print the decoded quote and the check results as JSON.
    #[arg(long)]
    json: bool,
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

/// Quotes are shipped raw or as a hex dump. Detect and decode.
fn decode_quote_bytes(raw: Vec<u8>) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(&raw).map(str::trim).unwrap_or_default();
    if !text.is_empty() && text.len() % 2 == 0 && text.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(text).context("Failed to decode hex encoded quote");
    }
    Ok(raw)
}

fn main_with_error() -> Result<()> {
    let args = Arguments::parse();
    setup_logging(env!("CARGO_CRATE_NAME"), &args.log_level)?;

    let raw = match args.quote {
        ArgSource::File(path) => fs::read(path).context("Failed to read quote file")?,
        ArgSource::Stdin => {
            let mut quote = Vec::new();
            std::io::stdin()
                .read_to_end(&mut quote)
                .context("Failed to read quote from stdin")?;
            quote
        }
    };
    let quote_bytes = decode_quote_bytes(raw)?;
    let quote = Quote::parse(&quote_bytes).context("Failed to parse quote")?;

    let reportdata_ok = match &args.report_data {
        Some(report_data) => {
            let expected = encode_report_data(report_data)?;
            Some(quote.get_report_data() == expected)
        }
        None => None,
    };

    let correlation = match &args.event_log {
        Some(event_log) => {
            let log = fs::read_to_string(event_log).context("Failed to read event log")?;
            let entries = parse_event_log(&log)?;
            info!("Replaying {} events", entries.len());
            Some(replay_event_log(&entries).correlate(quote.report.as_td10()))
        }
        None => None,
    };

    if args.json {
        print_json_summary(&quote, reportdata_ok, correlation.as_ref())?;
    } else {
        println!("Quote ({} bytes):", quote_bytes.len());
        println!("{:#}", &quote.report);
        if let Some(matched) = reportdata_ok {
            println!("reportdata: {}", if matched { "ok" } else { "MISMATCH" });
        }
        if let Some(correlation) = &correlation {
            println!("{correlation:#}");
        }
    }

    let verified = reportdata_ok.unwrap_or(true)
        && correlation.map(|c| c.all_match()).unwrap_or(true);
    if !verified {
        bail!("Evidence does not match the quote");
    }
    Ok(())
}

fn print_json_summary(
    quote: &Quote,
    reportdata_ok: Option<bool>,
    correlation: Option<&RtmrCorrelation>,
) -> Result<()> {
    let mut summary = serde_json::Map::new();
    summary.insert("quote".to_string(), serde_json::to_value(quote)?);
    if let Some(matched) = reportdata_ok {
        summary.insert("reportdata_match".to_string(), matched.into());
    }
    if let Some(correlation) = correlation {
        for index in RtmrIndex::ALL {
            summary.insert(
                format!("{index}_match"),
                correlation.matches(index).into(),
            );
        }
    }
    let summary = serde_json::Value::Object(summary);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    let ret = main_with_error();
    if let Err(e) = &ret {
        error!(error = %e, "Execution failed");
    }
    ret
}
