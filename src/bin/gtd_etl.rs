//! Command-line entry point for the GTD ETL pipeline.
//!
//! Usage:
//!   gtd-etl --input gtd.csv --read-cols read_cols.csv \
//!           --denylist exclude_groups.csv \
//!           --out-parquet gtd_clean_dataset.parquet \
//!           --out-csv gtd_clean_dataset.csv \
//!           --top-n 15 [--min-year 1990] [--regional]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use gtd_etl::PipelineConfig;

fn parse_args() -> anyhow::Result<PipelineConfig> {
    let mut input = None;
    let mut read_cols = None;
    let mut denylist = None;
    let mut out_parquet = None;
    let mut out_csv = None;
    let mut top_n: i64 = 15;
    let mut min_year = None;
    let mut regional = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut take_value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--input" => input = Some(PathBuf::from(take_value("--input")?)),
            "--read-cols" => read_cols = Some(PathBuf::from(take_value("--read-cols")?)),
            "--denylist" => denylist = Some(PathBuf::from(take_value("--denylist")?)),
            "--out-parquet" => out_parquet = Some(PathBuf::from(take_value("--out-parquet")?)),
            "--out-csv" => out_csv = Some(PathBuf::from(take_value("--out-csv")?)),
            "--top-n" => {
                top_n = take_value("--top-n")?
                    .parse()
                    .context("--top-n must be an integer")?;
            }
            "--min-year" => {
                min_year = Some(
                    take_value("--min-year")?
                        .parse()
                        .context("--min-year must be an integer")?,
                );
            }
            "--regional" => regional = true,
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(PipelineConfig {
        incidents_path: input.context("--input is required")?,
        read_cols_path: read_cols.context("--read-cols is required")?,
        denylist_path: denylist.context("--denylist is required")?,
        parquet_out: out_parquet.context("--out-parquet is required")?,
        csv_out: out_csv.context("--out-csv is required")?,
        top_n,
        min_year,
        regional,
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let result = parse_args().and_then(|config| {
        gtd_etl::pipeline::run(&config).context("pipeline aborted")?;
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gtd-etl: {err:#}");
            ExitCode::FAILURE
        }
    }
}
