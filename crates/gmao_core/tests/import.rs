mod common;

use common::{date, seed_fleet};
use gmao_core::db::open_db_in_memory;
use gmao_core::model::referential::{EnginFilter, EnginInput};
use gmao_core::model::saisie::SaisieHrmFilter;
use gmao_core::repo::referential_repo::SqliteReferentialRepository;
use gmao_core::repo::saisie_repo::SqliteSaisieRepository;
use gmao_core::service::import_service::{ImportKind, ImportService};
use gmao_core::service::referential_service::ReferentialService;
use gmao_core::service::saisie_service::SaisieService;
use gmao_core::ServiceError;
use serde_json::json;

#[test]
fn engins_import_creates_and_updates_by_name() {
    let conn = open_db_in_memory().unwrap();
    seed_fleet(&conn);

    let rows = vec![
        json!({ "Engin": "CH-03", "Parc": "994F", "Site": "Nord", "Heures Châssis": "1250,5" }),
        json!({ "ENGIN": "CH-01", "parc": "994F", "site": "Sud", "Actif": "non" }),
    ];
    let report = ImportService::new(&conn)
        .import(ImportKind::Engins, &rows, false)
        .unwrap();
    assert_eq!(report.rows, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 1);

    let referential = ReferentialService::new(SqliteReferentialRepository::new(&conn));
    let engins = referential.list_engins(&EnginFilter::default()).unwrap();
    assert_eq!(engins.len(), 4);
    let ch03 = engins.iter().find(|engin| engin.name == "CH-03").unwrap();
    assert_eq!(ch03.initial_heure_chassis, 1250.5);
    let ch01 = engins.iter().find(|engin| engin.name == "CH-01").unwrap();
    assert!(!ch01.active);
}

#[test]
fn engin_reimport_keeps_columns_the_row_leaves_out() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let referential = ReferentialService::new(SqliteReferentialRepository::new(&conn));
    let mut retired = EnginInput::new("CH-02", fleet.parc_994, fleet.site_nord);
    retired.active = false;
    retired.initial_heure_chassis = 1_000.0;
    referential.update_engin(fleet.engin_b, &retired).unwrap();

    let rows = vec![json!({ "Engin": "CH-02", "Parc": "994F", "Site": "Sud" })];
    let report = ImportService::new(&conn)
        .import(ImportKind::Engins, &rows, false)
        .unwrap();
    assert_eq!(report.updated, 1);

    let after = referential.get_engin(fleet.engin_b).unwrap();
    assert!(!after.active);
    assert_eq!(after.initial_heure_chassis, 1_000.0);
    assert_eq!(after.site_id, fleet.site_sud);
}

#[test]
fn any_bad_row_rejects_the_whole_import() {
    let conn = open_db_in_memory().unwrap();
    seed_fleet(&conn);

    let rows = vec![
        json!({ "engin": "CH-03", "parc": "994F", "site": "Nord" }),
        json!({ "engin": "CH-04", "parc": "Inconnu", "site": "Nord" }),
        json!({ "engin": "CH-05", "site": "Nord" }),
        json!("not an object"),
    ];
    let err = ImportService::new(&conn)
        .import(ImportKind::Engins, &rows, false)
        .unwrap_err();
    let ServiceError::ImportRejected(errors) = err else {
        panic!("expected a rejected import");
    };
    let failed_rows: Vec<_> = errors.iter().map(|error| error.row).collect();
    assert_eq!(failed_rows, vec![2, 3, 4]);
    assert!(errors[0].message.contains("Inconnu"));
    assert!(errors[1].message.contains("parc"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM engins;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn dry_run_reports_counts_without_writing() {
    let conn = open_db_in_memory().unwrap();
    seed_fleet(&conn);

    let rows = vec![json!({ "panne": "Freinage", "type panne": "Mécanique" })];
    let report = ImportService::new(&conn)
        .import(ImportKind::Pannes, &rows, true)
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.created, 1);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM pannes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn saisie_rows_accept_spreadsheet_dates_and_upsert() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let import = ImportService::new(&conn);

    // 45366 is 2024-03-15 in the 1900 date system.
    let hrm_rows = vec![
        json!({ "Date": 45366, "Engin": "CH-01", "HRM": 16 }),
        json!({ "Date": "16/03/2024", "Engin": "CH-01", "HRM": "20,5", "Site": "Sud" }),
    ];
    let report = import
        .import(ImportKind::Saisiehrm, &hrm_rows, false)
        .unwrap();
    assert_eq!(report.created, 2);

    let again = vec![json!({ "du": "2024-03-15", "engin": "CH-01", "hrm": 18 })];
    let report = import.import(ImportKind::Saisiehrm, &again, false).unwrap();
    assert_eq!(report.updated, 1);

    let saisies = SaisieService::new(SqliteSaisieRepository::new(&conn));
    let entries = saisies
        .list_hrm(&SaisieHrmFilter {
            engin_id: Some(fleet.engin_a),
            ..SaisieHrmFilter::default()
        })
        .unwrap();
    assert_eq!(entries.len(), 2);
    let mar15 = entries
        .iter()
        .find(|entry| entry.du == date(2024, 3, 15))
        .unwrap();
    assert_eq!(mar15.hrm, 18.0);
    assert_eq!(mar15.site_id, fleet.site_nord);
    let mar16 = entries
        .iter()
        .find(|entry| entry.du == date(2024, 3, 16))
        .unwrap();
    assert_eq!(mar16.site_id, fleet.site_sud);

    let him_rows = vec![
        json!({ "date": "2024-03-15", "engin": "CH-01", "panne": "Moteur", "HIM": 4, "NI": 2 }),
        json!({ "date": "2024-03-15", "engin": "CH-01", "panne": "Hydraulique", "him": "1,5" }),
    ];
    let report = import.import(ImportKind::Saisiehim, &him_rows, false).unwrap();
    assert_eq!(report.created, 2);
    let stops = saisies.list_him(mar15.id).unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].ni, 2);
    assert_eq!(stops[1].ni, 1);
}

#[test]
fn saisie_import_enforces_daily_capacity() {
    let conn = open_db_in_memory().unwrap();
    seed_fleet(&conn);
    let import = ImportService::new(&conn);
    import
        .import(
            ImportKind::Saisiehrm,
            &[json!({ "date": "2024-03-15", "engin": "CH-01", "hrm": 20 })],
            false,
        )
        .unwrap();

    let err = import
        .import(
            ImportKind::Saisiehim,
            &[
                json!({ "date": "2024-03-15", "engin": "CH-01", "panne": "Moteur", "him": 3 }),
                json!({ "date": "2024-03-15", "engin": "CH-01", "panne": "Hydraulique", "him": 2 }),
                json!({ "date": "2024-03-17", "engin": "CH-01", "panne": "Moteur", "him": 1 }),
            ],
            false,
        )
        .unwrap_err();
    let ServiceError::ImportRejected(errors) = err else {
        panic!("expected a rejected import");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].row, 2);
    assert_eq!(errors[1].row, 3);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM saisiehim;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn import_kinds_parse_from_path_segments() {
    assert_eq!(ImportKind::parse("engins"), Some(ImportKind::Engins));
    assert_eq!(ImportKind::parse("saisiehim"), Some(ImportKind::Saisiehim));
    assert_eq!(ImportKind::parse("objectifs"), None);
}
