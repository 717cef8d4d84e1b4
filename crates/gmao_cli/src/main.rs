//! `gmao` executable: server bootstrap and maintenance commands.

mod args;

use anyhow::{anyhow, bail, Context, Result};
use args::{Cli, Command, CreateAdminArgs, DbArgs, ReportArgs, ReportName, ServeArgs};
use clap::Parser;
use gmao_core::db::migrations::{latest_version, schema_version};
use gmao_core::db::open_db;
use gmao_core::repo::anomalie_repo::SqliteAnomalieRepository;
use gmao_core::repo::objectif_repo::SqliteObjectifRepository;
use gmao_core::repo::rbac_repo::SqliteRbacRepository;
use gmao_core::repo::report_repo::SqliteReportRepository;
use gmao_core::service::anomalie_service::AnomalieService;
use gmao_core::service::auth_service::AuthService;
use gmao_core::service::report_service::ReportService;
use gmao_core::{init_logging, Period};
use gmao_server::{build_router, AppState, CliOverrides, ServerConfig};
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use std::io::BufRead;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args),
        Command::Migrate(args) => migrate(&args),
        Command::CreateAdmin(args) => create_admin(&args),
        Command::Report(args) => {
            let conn = open(&args.db)?;
            let report = run_report(&conn, &args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn serve(args: ServeArgs) -> Result<()> {
    let overrides = CliOverrides {
        bind: args.bind,
        db_path: args.db,
    };
    let config = ServerConfig::load(args.config.as_deref(), &overrides)
        .context("failed to load configuration")?;
    let mut logging = config.logging_config();
    logging.duplicate_to_stderr = args.log_stderr;
    init_logging(&logging).context("failed to start logging")?;

    let conn = open(&config.database.path)?;
    if let (Some(email), Some(password)) = (
        config.auth.bootstrap_admin_email.as_deref(),
        config.auth.bootstrap_admin_password.as_deref(),
    ) {
        AuthService::new(SqliteRbacRepository::new(&conn))
            .bootstrap_admin(email, password)
            .context("failed to bootstrap the admin account")?;
    }

    let addr = config.bind_addr()?;
    let router = build_router(
        AppState::new(conn, config.session_ttl()),
        config.request_timeout(),
    );
    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime
        .block_on(gmao_server::serve(addr, router))
        .with_context(|| format!("server on {addr} failed"))?;
    info!("event=app_stop module=cli status=ok");
    Ok(())
}

fn migrate(args: &DbArgs) -> Result<()> {
    let conn = open(&args.db)?;
    let version = schema_version(&conn).context("failed to read the schema version")?;
    println!(
        "{}: schema version {version} (latest {})",
        args.db.display(),
        latest_version()
    );
    Ok(())
}

fn create_admin(args: &CreateAdminArgs) -> Result<()> {
    let mut password = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut password)
        .context("failed to read the password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("expected the admin password on stdin");
    }

    let conn = open(&args.db)?;
    let user = AuthService::new(SqliteRbacRepository::new(&conn))
        .bootstrap_admin(&args.email, password)
        .context("failed to create the admin account")?;
    println!("admin ready: id={} email={}", user.id, user.email);
    Ok(())
}

fn open(path: &std::path::Path) -> Result<Connection> {
    open_db(path).with_context(|| format!("failed to open database `{}`", path.display()))
}

fn run_report(conn: &Connection, args: &ReportArgs) -> Result<Value> {
    let reports = ReportService::new(
        SqliteReportRepository::new(conn),
        SqliteObjectifRepository::new(conn),
    );
    let value = match args.name {
        ReportName::Rje => to_value(reports.rje(need(args.date, "date")?)?)?,
        ReportName::UnitePhysique => to_value(
            reports.unite_physique(need(args.year, "year")?, need(args.month, "month")?)?,
        )?,
        ReportName::EtatMensuel => to_value(
            reports.etat_mensuel(need(args.year, "year")?, need(args.month, "month")?)?,
        )?,
        ReportName::IndispoParc => to_value(reports.indispo_par_parc(
            need(args.parc, "parc")?,
            need(args.year, "year")?,
            need(args.month, "month")?,
        )?)?,
        ReportName::HeuresChassis => to_value(reports.heures_chassis(need(args.date, "date")?)?)?,
        ReportName::SpecLub => {
            to_value(reports.spec_lub(need(args.parc, "parc")?, need(args.year, "year")?)?)?
        }
        ReportName::ParetoIndispo => {
            let period = Period::new(need(args.from, "from")?, need(args.to, "to")?)?;
            to_value(reports.pareto_indispo(need(args.parc, "parc")?, period, args.top)?)?
        }
        ReportName::ParetoNi => {
            let period = Period::new(need(args.from, "from")?, need(args.to, "to")?)?;
            to_value(reports.pareto_ni(need(args.parc, "parc")?, period, args.top)?)?
        }
        ReportName::MtbfEvolution => to_value(
            reports.mtbf_evolution(need(args.typeparc, "typeparc")?, need(args.year, "year")?)?,
        )?,
        ReportName::AnomalieStats => to_value(
            AnomalieService::new(SqliteAnomalieRepository::new(conn)).stats(args.site)?,
        )?,
    };
    Ok(value)
}

fn need<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("--{flag} is required for this report"))
}

fn to_value<T: serde::Serialize>(report: T) -> Result<Value> {
    serde_json::to_value(report).context("failed to serialize the report")
}

#[cfg(test)]
mod tests {
    use super::args::{Cli, Command, ReportName};
    use super::run_report;
    use clap::Parser;
    use gmao_core::db::open_db_in_memory;

    #[test]
    fn report_arguments_parse() {
        let cli = Cli::try_parse_from([
            "gmao",
            "report",
            "pareto-ni",
            "--db",
            "gmao.sqlite3",
            "--parc",
            "3",
            "--from",
            "2024-01-01",
            "--to",
            "2024-03-31",
        ])
        .unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected the report command");
        };
        assert_eq!(args.name, ReportName::ParetoNi);
        assert_eq!(args.parc, Some(3));
        assert_eq!(args.top, None);
    }

    #[test]
    fn serve_flags_are_optional() {
        let cli = Cli::try_parse_from(["gmao", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected the serve command");
        };
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
        assert!(args.config.is_none());
        assert!(!args.log_stderr);
    }

    #[test]
    fn reports_name_their_missing_flag() {
        let conn = open_db_in_memory().unwrap();
        let cli = Cli::try_parse_from(["gmao", "report", "spec-lub", "--db", "x", "--year", "2024"])
            .unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected the report command");
        };
        let err = run_report(&conn, &args).unwrap_err();
        assert!(err.to_string().contains("--parc"));

        let cli = Cli::try_parse_from(["gmao", "report", "rje", "--db", "x", "--date", "2024-03-15"])
            .unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected the report command");
        };
        let report = run_report(&conn, &args).unwrap();
        assert_eq!(report["date"], "2024-03-15");
    }
}
