use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Simulate the whole project horizon and appraise the financial scenarios.
    #[clap(name = "simulate")]
    Simulate(SimulateArgs),

    /// Dispatch the first project year and show a single day hour by hour.
    #[clap(name = "dispatch")]
    Dispatch(DispatchArgs),
}

#[derive(Parser)]
pub struct InputArgs {
    /// Project configuration in TOML, the defaults apply when omitted.
    #[clap(long, env = "SOLSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hourly prices CSV with `timestamp,value` columns, in $/MWh.
    #[clap(long, env = "SOLSTORE_PRICES")]
    pub prices: PathBuf,

    /// Hourly solar generation CSV with `timestamp,value` columns, in MWh.
    #[clap(long, env = "SOLSTORE_SOLAR")]
    pub solar: PathBuf,
}

#[derive(Parser)]
pub struct SimulateArgs {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Print JSON instead of the tables.
    #[clap(long)]
    pub json: bool,

    /// Also print the yearly cash flows of every scenario.
    #[clap(long)]
    pub cash_flows: bool,
}

#[derive(Parser)]
pub struct DispatchArgs {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Zero-based day of the year to show.
    #[clap(long, default_value = "0")]
    pub day: usize,

    /// Print JSON instead of the table.
    #[clap(long)]
    pub json: bool,
}
