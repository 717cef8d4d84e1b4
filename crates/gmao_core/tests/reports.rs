mod common;

use chrono::NaiveDate;
use common::{date, seed_fleet, Fleet};
use gmao_core::db::open_db_in_memory;
use gmao_core::model::objectif::ObjectifInput;
use gmao_core::model::referential::EnginInput;
use gmao_core::model::saisie::{SaisieHimInput, SaisieHrmInput, SaisieLubrifiantInput};
use gmao_core::model::EntityId;
use gmao_core::report::ParetoMetric;
use gmao_core::repo::objectif_repo::SqliteObjectifRepository;
use gmao_core::repo::referential_repo::SqliteReferentialRepository;
use gmao_core::repo::report_repo::SqliteReportRepository;
use gmao_core::repo::saisie_repo::SqliteSaisieRepository;
use gmao_core::service::objectif_service::ObjectifService;
use gmao_core::service::referential_service::ReferentialService;
use gmao_core::service::report_service::ReportService;
use gmao_core::service::saisie_service::SaisieService;
use gmao_core::{Period, ServiceError};
use rusqlite::Connection;

/// March 2024 activity plus one February entry on `CH-01`:
///
/// | engin | day        | hrm | him (panne, ni)      |
/// |-------|------------|-----|----------------------|
/// | CH-01 | 2024-02-10 | 8   | 1 (moteur, 1)        |
/// | CH-01 | 2024-03-15 | 16  | 4 (moteur, 2) + 20 L |
/// | CH-01 | 2024-03-16 | 20  | 2 (hydraulique, 1)   |
/// | CH-02 | 2024-03-15 | 10  |                      |
/// | TR-01 | 2024-03-15 | 12  |                      |
fn record_activity(conn: &Connection, fleet: &Fleet) {
    let saisies = SaisieService::new(SqliteSaisieRepository::new(conn));
    let day = |engin_id: EntityId, site_id: EntityId, du: NaiveDate, hrm: f64| {
        saisies
            .create_hrm(&SaisieHrmInput {
                du,
                engin_id,
                site_id,
                hrm,
            })
            .unwrap()
            .id
    };
    let stop = |saisiehrm_id: EntityId, panne_id: EntityId, him: f64, ni: i64| {
        saisies
            .create_him(&SaisieHimInput {
                saisiehrm_id,
                panne_id,
                him,
                ni,
                obs: None,
            })
            .unwrap()
            .id
    };

    let feb = day(fleet.engin_a, fleet.site_nord, date(2024, 2, 10), 8.0);
    stop(feb, fleet.panne_moteur, 1.0, 1);
    let mar15 = day(fleet.engin_a, fleet.site_nord, date(2024, 3, 15), 16.0);
    let moteur = stop(mar15, fleet.panne_moteur, 4.0, 2);
    saisies
        .create_lubrifiant(&SaisieLubrifiantInput {
            saisiehim_id: moteur,
            lubrifiant_id: fleet.lub_huile,
            typeconsommationlub_id: None,
            qte: 20.0,
            obs: None,
        })
        .unwrap();
    let mar16 = day(fleet.engin_a, fleet.site_nord, date(2024, 3, 16), 20.0);
    stop(mar16, fleet.panne_hydraulique, 2.0, 1);
    day(fleet.engin_b, fleet.site_nord, date(2024, 3, 15), 10.0);
    day(fleet.engin_truck, fleet.site_sud, date(2024, 3, 15), 12.0);
}

fn reports(
    conn: &Connection,
) -> ReportService<SqliteReportRepository<'_>, SqliteObjectifRepository<'_>> {
    ReportService::new(
        SqliteReportRepository::new(conn),
        SqliteObjectifRepository::new(conn),
    )
}

#[test]
fn rje_reports_day_month_and_year_kpis() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);

    let report = reports(&conn).rje(date(2024, 3, 15)).unwrap();
    assert_eq!(report.rows.len(), 3);
    let row = report
        .rows
        .iter()
        .find(|row| row.engin_id == fleet.engin_a)
        .unwrap();

    assert_eq!(row.day.nho, 24.0);
    assert_eq!(row.day.hrm, 16.0);
    assert_eq!(row.day.him, 4.0);
    assert_eq!(row.day.hrd, 4.0);
    assert_eq!(row.day.disp, Some(83.33));
    assert_eq!(row.day.tdm, Some(66.67));
    assert_eq!(row.day.mtbf, Some(8.0));
    assert_eq!(row.day.mttr, Some(2.0));

    assert_eq!(row.month.nho, 15.0 * 24.0);
    assert_eq!(row.month.hrm, 16.0);

    // 31 + 29 + 15 days of 2024.
    assert_eq!(row.year.nho, 75.0 * 24.0);
    assert_eq!(row.year.hrm, 24.0);
    assert_eq!(row.year.ni, 3);
    assert_eq!(row.year.mtbf, Some(8.0));

    let idle = report
        .rows
        .iter()
        .find(|row| row.engin_id == fleet.engin_b)
        .unwrap();
    assert_eq!(idle.day.mtbf, None);
    assert_eq!(idle.day.disp, Some(100.0));
}

#[test]
fn etat_mensuel_aggregates_active_engins_per_parc() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);
    let mut objectif = ObjectifInput::new(2024, fleet.parc_994);
    objectif.dispo = Some(85.0);
    ObjectifService::new(SqliteObjectifRepository::new(&conn))
        .create(&objectif)
        .unwrap();

    let report = reports(&conn).etat_mensuel(2024, 3).unwrap();
    let loaders = report
        .rows
        .iter()
        .find(|row| row.parc_id == fleet.parc_994)
        .unwrap();
    assert_eq!(loaders.engin_count, 2);
    assert_eq!(loaders.month.nho, 31.0 * 24.0 * 2.0);
    assert_eq!(loaders.month.hrm, 46.0);
    assert_eq!(loaders.month.him, 6.0);
    assert_eq!(loaders.month.ni, 3);
    assert_eq!(loaders.year.hrm, 54.0);
    assert_eq!(loaders.objectif.as_ref().unwrap().dispo, Some(85.0));

    let trucks = report
        .rows
        .iter()
        .find(|row| row.parc_id == fleet.parc_777)
        .unwrap();
    assert_eq!(trucks.engin_count, 1);
    assert!(trucks.objectif.is_none());
}

#[test]
fn inactive_engins_leave_fleet_kpis_but_keep_chassis_hours() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);
    let mut retired = EnginInput::new("CH-02", fleet.parc_994, fleet.site_nord);
    retired.active = false;
    retired.initial_heure_chassis = 1_000.0;
    ReferentialService::new(SqliteReferentialRepository::new(&conn))
        .update_engin(fleet.engin_b, &retired)
        .unwrap();

    let service = reports(&conn);
    let etat = service.etat_mensuel(2024, 3).unwrap();
    let loaders = etat
        .rows
        .iter()
        .find(|row| row.parc_id == fleet.parc_994)
        .unwrap();
    assert_eq!(loaders.engin_count, 1);
    assert_eq!(loaders.month.hrm, 36.0);

    let chassis = service.heures_chassis(date(2024, 3, 31)).unwrap();
    assert_eq!(chassis.rows.len(), 3);
    let ch02 = chassis
        .rows
        .iter()
        .find(|row| row.engin_id == fleet.engin_b)
        .unwrap();
    assert!(!ch02.active);
    assert_eq!(ch02.heure_chassis, 1_010.0);
    let ch01 = chassis
        .rows
        .iter()
        .find(|row| row.engin_id == fleet.engin_a)
        .unwrap();
    assert_eq!(ch01.cumulative_hrm, 44.0);
}

#[test]
fn monthly_reports_agree_once_an_engin_is_retired() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);
    let saisies = SaisieService::new(SqliteSaisieRepository::new(&conn));
    let retired_day = saisies
        .create_hrm(&SaisieHrmInput {
            du: date(2024, 3, 20),
            engin_id: fleet.engin_b,
            site_id: fleet.site_nord,
            hrm: 8.0,
        })
        .unwrap();
    let retired_stop = saisies
        .create_him(&SaisieHimInput {
            saisiehrm_id: retired_day.id,
            panne_id: fleet.panne_moteur,
            him: 1.0,
            ni: 1,
            obs: None,
        })
        .unwrap();
    saisies
        .create_lubrifiant(&SaisieLubrifiantInput {
            saisiehim_id: retired_stop.id,
            lubrifiant_id: fleet.lub_huile,
            typeconsommationlub_id: None,
            qte: 50.0,
            obs: None,
        })
        .unwrap();
    let mut retired = EnginInput::new("CH-02", fleet.parc_994, fleet.site_nord);
    retired.active = false;
    ReferentialService::new(SqliteReferentialRepository::new(&conn))
        .update_engin(fleet.engin_b, &retired)
        .unwrap();

    let service = reports(&conn);
    let etat = service.etat_mensuel(2024, 3).unwrap();
    let loaders = etat
        .rows
        .iter()
        .find(|row| row.parc_id == fleet.parc_994)
        .unwrap();
    assert_eq!(loaders.month.hrm, 36.0);
    assert_eq!(loaders.month.mtbf, Some(12.0));

    let evolution = service
        .mtbf_evolution(fleet.typeparc_chargeuse, 2024)
        .unwrap();
    let march = &evolution.parcs[0].months[2];
    assert_eq!(march.hrm, loaders.month.hrm);
    assert_eq!(march.mtbf, loaders.month.mtbf);

    let spec = service.spec_lub(fleet.parc_994, 2024).unwrap();
    let march = &spec.months[2].totals;
    assert_eq!(march.hrm, 36.0);
    assert_eq!(march.lubricants[0].qte, 20.0);
    assert_eq!(march.lubricants[0].specific, Some(0.5556));
}

#[test]
fn indispo_par_parc_ranks_pannes_by_year_downtime() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);

    let report = reports(&conn)
        .indispo_par_parc(fleet.parc_994, 2024, 3)
        .unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].panne_id, fleet.panne_moteur);
    assert_eq!(report.rows[0].month.him, 4.0);
    assert_eq!(report.rows[0].year.him, 5.0);
    assert_eq!(report.rows[0].year.ni, 3);
    assert_eq!(report.rows[0].month_share, Some(66.67));
    assert_eq!(report.rows[1].month_share, Some(33.33));
    assert_eq!(report.total_month.him, 6.0);
    assert_eq!(report.total_year.him, 7.0);

    let empty = reports(&conn)
        .indispo_par_parc(fleet.parc_777, 2024, 3)
        .unwrap();
    assert!(empty.rows.is_empty());
    assert_eq!(empty.total_month.him, 0.0);
}

#[test]
fn pareto_ranks_by_metric() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);
    let service = reports(&conn);
    let march = Period::month(2024, 3).unwrap();

    let by_him = service.pareto_indispo(fleet.parc_994, march, None).unwrap();
    assert_eq!(by_him.metric, ParetoMetric::Him);
    assert_eq!(by_him.total, 6.0);
    assert_eq!(by_him.entries[0].label, "Moteur");
    assert_eq!(by_him.entries[0].cumulative_percent, 66.67);
    assert_eq!(by_him.entries[1].cumulative_percent, 100.0);

    let top = service.pareto_ni(fleet.parc_994, march, Some(1)).unwrap();
    assert_eq!(top.entries.len(), 1);
    assert_eq!(top.entries[0].value, 2.0);
    assert_eq!(top.entries[0].percent, 66.67);

    assert!(matches!(
        service.pareto(999, march, ParetoMetric::Him, None),
        Err(ServiceError::NotFound { entity: "parc", .. })
    ));
}

#[test]
fn spec_lub_divides_quantities_by_running_hours() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);

    let report = reports(&conn).spec_lub(fleet.parc_994, 2024).unwrap();
    assert_eq!(report.months.len(), 12);
    let march = &report.months[2];
    assert_eq!(march.month, 3);
    assert_eq!(march.totals.hrm, 46.0);
    assert_eq!(march.totals.lubricants.len(), 1);
    assert_eq!(march.totals.lubricants[0].typelubrifiant_id, fleet.typelub_huile);
    assert_eq!(march.totals.lubricants[0].qte, 20.0);
    assert_eq!(march.totals.lubricants[0].specific, Some(0.4348));

    assert!(report.months[0].totals.lubricants.is_empty());
    assert_eq!(report.total.hrm, 54.0);
    assert_eq!(report.total.lubricants[0].specific, Some(0.3704));
}

#[test]
fn mtbf_evolution_covers_every_month() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);

    let report = reports(&conn)
        .mtbf_evolution(fleet.typeparc_chargeuse, 2024)
        .unwrap();
    assert_eq!(report.typeparc_name, "Chargeuse");
    assert_eq!(report.parcs.len(), 1);
    let parc = &report.parcs[0];
    assert_eq!(parc.months.len(), 12);
    assert_eq!(parc.months[0].mtbf, None);
    assert_eq!(parc.months[1].mtbf, Some(8.0));
    assert_eq!(parc.months[2].ni, 3);
    assert_eq!(parc.months[2].mtbf, Some(15.33));
    assert_eq!(parc.year_mtbf, Some(13.5));

    assert!(matches!(
        reports(&conn).mtbf_evolution(999, 2024),
        Err(ServiceError::NotFound { entity: "typeparc", .. })
    ));
}

#[test]
fn unite_physique_splits_hours_by_site() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    record_activity(&conn, &fleet);

    let report = reports(&conn).unite_physique(2024, 3).unwrap();
    assert_eq!(report.parcs.len(), 2);
    let loaders = report
        .parcs
        .iter()
        .find(|parc| parc.parc_id == fleet.parc_994)
        .unwrap();
    assert_eq!(loaders.sites.len(), 1);
    assert_eq!(loaders.sites[0].site_name, "Nord");
    assert_eq!(loaders.total_month.hrm, 46.0);
    assert_eq!(loaders.total_month.him, 6.0);
    assert_eq!(loaders.total_year.hrm, 54.0);
    assert_eq!(loaders.total_year.him, 7.0);
}

#[test]
fn invalid_months_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    seed_fleet(&conn);

    assert!(matches!(
        reports(&conn).etat_mensuel(2024, 13),
        Err(ServiceError::Validation(_))
    ));
}
