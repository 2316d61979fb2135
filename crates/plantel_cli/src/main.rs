//! Operator entry point.
//!
//! # Usage
//! - `plantel_cli`: print the core version and a summary of stored periods.
//! - `plantel_cli reconcile <period_uuid> <lapse>`: rebuild Guardian
//!   placements from one Lapse, given by lapse number or stable id.
//!
//! Configuration comes from `PLANTEL_*` environment variables.

use log::error;
use plantel_core::db::open_db;
use plantel_core::{
    core_version, init_logging, CoreConfig, NodeId, NodeRef, PeriodId, PeriodService,
    SqliteGuardianRepository, SqlitePeriodRepository, SqliteTeacherRepository,
};
use rusqlite::Connection;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("plantel_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    let log_dir = config
        .log_dir
        .to_str()
        .ok_or_else(|| format!("log dir is not valid UTF-8: {}", config.log_dir.display()))?;
    init_logging(config.log_level, log_dir)?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let service = period_service(&conn)?;

    match args.as_slice() {
        [] => print_summary(&service),
        [command, period, lapse] if command == "reconcile" => {
            let period_id = period
                .parse::<PeriodId>()
                .map_err(|err| format!("invalid period id `{period}`: {err}"))?;
            let report = service
                .reconcile_guardians(period_id, &parse_node_ref(lapse))
                .map_err(|err| err.to_string())?;
            println!(
                "reconciled updated={} unchanged={} warnings={}",
                report.updated,
                report.unchanged,
                report.warnings.len()
            );
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            Ok(())
        }
        _ => Err("usage: plantel_cli [reconcile <period_uuid> <lapse>]".to_string()),
    }
}

type SqlitePeriodService<'conn> = PeriodService<
    SqlitePeriodRepository<'conn>,
    SqliteGuardianRepository<'conn>,
    SqliteTeacherRepository<'conn>,
>;

fn period_service(conn: &Connection) -> Result<SqlitePeriodService<'_>, String> {
    let periods = SqlitePeriodRepository::try_new(conn).map_err(|err| err.to_string())?;
    let guardians = SqliteGuardianRepository::try_new(conn).map_err(|err| err.to_string())?;
    let teachers = SqliteTeacherRepository::try_new(conn).map_err(|err| err.to_string())?;
    Ok(PeriodService::new(periods, guardians, teachers))
}

fn print_summary(service: &SqlitePeriodService<'_>) -> Result<(), String> {
    println!("plantel_core version={}", core_version());
    let periods = service.list_periods().map_err(|err| err.to_string())?;
    println!("periods={}", periods.len());
    for period in &periods {
        let sections: usize = period
            .lapses
            .iter()
            .flat_map(|lapse| lapse.grades.iter())
            .map(|grade| grade.sections.len())
            .sum();
        let enrolled: usize = period
            .lapses
            .iter()
            .map(|lapse| lapse.enrollments().count())
            .sum();
        println!(
            "{} label={} lapses={} sections={} enrollments={}",
            period.uuid,
            period.label,
            period.lapses.len(),
            sections,
            enrolled
        );
    }
    Ok(())
}

fn parse_node_ref(value: &str) -> NodeRef {
    match value.parse::<NodeId>() {
        Ok(id) => NodeRef::Id(id),
        Err(_) => NodeRef::label(value),
    }
}
