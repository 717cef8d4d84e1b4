mod common;

use common::{date, seed_fleet};
use gmao_core::db::open_db_in_memory;
use gmao_core::model::saisie::{
    SaisieHimInput, SaisieHrmFilter, SaisieHrmInput, SaisieLubrifiantInput,
};
use gmao_core::repo::saisie_repo::SqliteSaisieRepository;
use gmao_core::service::saisie_service::SaisieService;
use gmao_core::ServiceError;

fn hrm_input(engin_id: i64, site_id: i64, hrm: f64) -> SaisieHrmInput {
    SaisieHrmInput {
        du: date(2024, 3, 15),
        engin_id,
        site_id,
        hrm,
    }
}

fn him_input(saisiehrm_id: i64, panne_id: i64, him: f64) -> SaisieHimInput {
    SaisieHimInput {
        saisiehrm_id,
        panne_id,
        him,
        ni: 1,
        obs: None,
    }
}

#[test]
fn him_cannot_push_the_day_past_24_hours() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    let hrm = service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 16.0))
        .unwrap();
    service
        .create_him(&him_input(hrm.id, fleet.panne_moteur, 6.0))
        .unwrap();

    let err = service
        .create_him(&him_input(hrm.id, fleet.panne_hydraulique, 2.5))
        .unwrap_err();
    match err {
        ServiceError::Validation(validation) => assert_eq!(validation.field(), "him"),
        other => panic!("unexpected error: {other}"),
    }

    let filled = service
        .create_him(&him_input(hrm.id, fleet.panne_hydraulique, 2.0))
        .unwrap();
    assert_eq!(filled.him, 2.0);
    assert_eq!(service.list_him(hrm.id).unwrap().len(), 2);
}

#[test]
fn hrm_update_accounts_for_existing_him() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    let hrm = service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 10.0))
        .unwrap();
    service
        .create_him(&him_input(hrm.id, fleet.panne_moteur, 8.0))
        .unwrap();

    let err = service
        .update_hrm(hrm.id, &hrm_input(fleet.engin_a, fleet.site_nord, 17.0))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let updated = service
        .update_hrm(hrm.id, &hrm_input(fleet.engin_a, fleet.site_nord, 16.0))
        .unwrap();
    assert_eq!(updated.hrm, 16.0);
}

#[test]
fn him_update_excludes_its_own_previous_value() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    let hrm = service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 20.0))
        .unwrap();
    let him = service
        .create_him(&him_input(hrm.id, fleet.panne_moteur, 4.0))
        .unwrap();

    let updated = service
        .update_him(him.id, &him_input(hrm.id, fleet.panne_moteur, 3.5))
        .unwrap();
    assert_eq!(updated.him, 3.5);
}

#[test]
fn one_hrm_entry_per_engin_and_day() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 10.0))
        .unwrap();
    let err = service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 12.0))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    let upserted = service
        .upsert_hrm(&hrm_input(fleet.engin_a, fleet.site_sud, 12.0))
        .unwrap();
    assert_eq!(upserted.hrm, 12.0);
    assert_eq!(upserted.site_id, fleet.site_sud);

    let listed = service
        .list_hrm(&SaisieHrmFilter {
            engin_id: Some(fleet.engin_a),
            ..SaisieHrmFilter::default()
        })
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn deleting_hrm_cascades_to_him_and_lubricants() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    let hrm = service
        .create_hrm(&hrm_input(fleet.engin_a, fleet.site_nord, 12.0))
        .unwrap();
    let him = service
        .create_him(&him_input(hrm.id, fleet.panne_moteur, 2.0))
        .unwrap();
    let lub = service
        .create_lubrifiant(&SaisieLubrifiantInput {
            saisiehim_id: him.id,
            lubrifiant_id: fleet.lub_huile,
            typeconsommationlub_id: None,
            qte: 20.0,
            obs: Some("vidange".to_string()),
        })
        .unwrap();
    assert_eq!(service.list_lubrifiant(him.id).unwrap(), vec![lub]);

    service.delete_hrm(hrm.id).unwrap();
    assert!(matches!(
        service.get_him(him.id).unwrap_err(),
        ServiceError::NotFound { .. }
    ));
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM saisielubrifiant;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn him_requires_an_existing_hrm_entry() {
    let conn = open_db_in_memory().unwrap();
    let fleet = seed_fleet(&conn);
    let service = SaisieService::new(SqliteSaisieRepository::new(&conn));

    let err = service
        .create_him(&him_input(999, fleet.panne_moteur, 1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: "saisiehrm",
            id: 999
        }
    ));
}
