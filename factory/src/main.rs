//! Drone factory simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{eyre, WrapErr};
use itertools::Itertools;

use factory::config::{Config, StartMark};
use factory::{run_all, Pool, RunReport};

/// Trace output format.
#[derive(Debug, Clone, Copy, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Format {
    /// Comma-separated values with a header.
    Csv,
    /// One JSON object per line.
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "jsonl",
        }
    }
}

/// Runs drone factory scenarios.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a YAML file with scenarios; built-in scenarios are run if missing.
    #[clap(long)]
    scenarios: Option<PathBuf>,

    /// Length of every run in time units; overrides the scenario file.
    #[clap(long)]
    horizon: Option<f64>,

    /// When start records are appended: `request` or `acquired`.
    #[clap(long)]
    start_mark: Option<StartMark>,

    /// Directory where the trace of each scenario is written.
    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    /// Trace format: `csv` or `json`.
    #[clap(long, default_value = "csv")]
    format: Format,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl Opt {
    fn config(&self) -> eyre::Result<Config> {
        let mut config = if let Some(path) = &self.scenarios {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open scenario file {}", path.display()))?;
            Config::from_yaml(file).wrap_err("invalid scenario file")?
        } else {
            Config::default()
        };
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(start_mark) = self.start_mark {
            config.start_mark = start_mark;
        }
        Ok(config.verify()?)
    }
}

fn write_trace(report: &RunReport, dir: &Path, format: Format) -> eyre::Result<()> {
    let path = dir.join(format!("{}.{}", report.scenario, format.extension()));
    let writer = BufWriter::new(
        File::create(&path).wrap_err_with(|| format!("unable to create {}", path.display()))?,
    );
    match format {
        Format::Csv => report.trace.write_csv(writer)?,
        Format::Json => report.trace.write_json_lines(writer)?,
    }
    log::info!("Trace written to {}", path.display());
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "{}: {} at {:.3}; {}; dispatched: {}",
        report.scenario,
        report.stop,
        report.time.as_secs_f64(),
        report.trace.summary().iter().format(" "),
        report.level(Pool::Dispatch)
    );
}

/// Log levels of the factory model and of the engine underneath it.
///
/// Every dispatched event is logged by the engine at the trace level, so it is only turned on
/// with the highest verbosity.
fn log_levels(verbose: i32) -> (log::LevelFilter, log::LevelFilter) {
    use log::LevelFilter::{Debug, Info, Trace, Warn};
    match verbose {
        i32::MIN..=0 => (Warn, Warn),
        1 => (Info, Warn),
        2 => (Debug, Info),
        _ => (Trace, Trace),
    }
}

fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let (factory_level, engine_level) = log_levels(opt.verbose);
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {}",
                record.level(),
                record.target().split("::").last().unwrap_or_default(),
                message
            ))
        })
        .level(factory_level)
        .level_for("simcore", engine_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let config = opt.config()?;
    if let Some(dir) = &opt.output_dir {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("unable to create {}", dir.display()))?;
    }
    let mut failed = Vec::new();
    for (scenario, result) in config.scenarios.iter().zip(run_all(&config)?) {
        match result {
            Ok(report) => {
                print_summary(&report);
                if let Some(dir) = &opt.output_dir {
                    write_trace(&report, dir, opt.format)?;
                }
            }
            Err(err) => {
                eprintln!("{}: {}", scenario.name, err);
                failed.push(scenario.name.as_str());
            }
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!("failed scenarios: {}", failed.iter().join(", ")))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_log_levels() {
        assert_eq!(log_levels(0), (LevelFilter::Warn, LevelFilter::Warn));
        assert_eq!(log_levels(1), (LevelFilter::Info, LevelFilter::Warn));
        assert_eq!(log_levels(2), (LevelFilter::Debug, LevelFilter::Info));
        assert_eq!(log_levels(5), (LevelFilter::Trace, LevelFilter::Trace));
    }

    #[test]
    fn test_format_extension() {
        assert_eq!("json".parse::<Format>().unwrap().extension(), "jsonl");
        assert_eq!("csv".parse::<Format>().unwrap().extension(), "csv");
    }
}
