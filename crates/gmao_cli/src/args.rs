//! Command-line arguments.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fleet maintenance backend.
#[derive(Parser, Debug)]
#[command(name = "gmao", version, about = "Fleet maintenance (GMAO) backend")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the REST API until Ctrl-C
    Serve(ServeArgs),
    /// Open the database, apply migrations and print the schema version
    Migrate(DbArgs),
    /// Create or promote the admin account; the password is read from stdin
    CreateAdmin(CreateAdminArgs),
    /// Print one report as pretty JSON
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address, overrides `server.bind`
    #[arg(long)]
    pub bind: Option<String>,
    /// SQLite file, overrides `database.path`
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Mirror log lines to stderr
    #[arg(long)]
    pub log_stderr: bool,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    #[arg(long)]
    pub db: PathBuf,
}

#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub db: PathBuf,
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    pub name: ReportName,
    #[arg(long)]
    pub db: PathBuf,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub month: Option<u32>,
    #[arg(long)]
    pub parc: Option<i64>,
    #[arg(long)]
    pub typeparc: Option<i64>,
    #[arg(long)]
    pub site: Option<i64>,
    /// Period start for pareto reports
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Period end for pareto reports
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Keep only the first N pareto entries
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportName {
    Rje,
    UnitePhysique,
    EtatMensuel,
    IndispoParc,
    HeuresChassis,
    SpecLub,
    ParetoIndispo,
    ParetoNi,
    MtbfEvolution,
    AnomalieStats,
}
