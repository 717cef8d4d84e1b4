#![allow(dead_code)]

use chrono::NaiveDate;
use gmao_core::model::referential::{
    EnginInput, LookupKind, LubrifiantInput, NameInput, PanneInput, ParcInput, SiteInput,
};
use gmao_core::model::EntityId;
use gmao_core::repo::referential_repo::SqliteReferentialRepository;
use gmao_core::service::referential_service::ReferentialService;
use rusqlite::Connection;

/// Small fleet: two sites, one loader parc with two engins, one truck parc
/// with one engin, two pannes and two lubricant types.
pub struct Fleet {
    pub site_nord: EntityId,
    pub site_sud: EntityId,
    pub typeparc_chargeuse: EntityId,
    pub typeparc_camion: EntityId,
    pub parc_994: EntityId,
    pub parc_777: EntityId,
    pub engin_a: EntityId,
    pub engin_b: EntityId,
    pub engin_truck: EntityId,
    pub panne_moteur: EntityId,
    pub panne_hydraulique: EntityId,
    pub typelub_huile: EntityId,
    pub typelub_graisse: EntityId,
    pub lub_huile: EntityId,
    pub lub_graisse: EntityId,
}

pub fn seed_fleet(conn: &Connection) -> Fleet {
    let service = ReferentialService::new(SqliteReferentialRepository::new(conn));

    let site_nord = service.create_site(&SiteInput::new("Nord")).unwrap().id;
    let site_sud = service.create_site(&SiteInput::new("Sud")).unwrap().id;
    let typeparc_chargeuse = lookup(&service, LookupKind::TypeParc, "Chargeuse");
    let typeparc_camion = lookup(&service, LookupKind::TypeParc, "Camion");
    let parc_994 = service
        .create_parc(&ParcInput {
            name: "994F".to_string(),
            typeparc_id: typeparc_chargeuse,
        })
        .unwrap()
        .id;
    let parc_777 = service
        .create_parc(&ParcInput {
            name: "777F".to_string(),
            typeparc_id: typeparc_camion,
        })
        .unwrap()
        .id;

    let engin_a = service
        .create_engin(&EnginInput::new("CH-01", parc_994, site_nord))
        .unwrap()
        .id;
    let mut engin_b_input = EnginInput::new("CH-02", parc_994, site_nord);
    engin_b_input.initial_heure_chassis = 1_000.0;
    let engin_b = service.create_engin(&engin_b_input).unwrap().id;
    let engin_truck = service
        .create_engin(&EnginInput::new("TR-01", parc_777, site_sud))
        .unwrap()
        .id;

    let typepanne = lookup(&service, LookupKind::TypePanne, "Mécanique");
    let panne_moteur = service
        .create_panne(&PanneInput {
            name: "Moteur".to_string(),
            typepanne_id: typepanne,
        })
        .unwrap()
        .id;
    let panne_hydraulique = service
        .create_panne(&PanneInput {
            name: "Hydraulique".to_string(),
            typepanne_id: typepanne,
        })
        .unwrap()
        .id;

    let typelub_huile = lookup(&service, LookupKind::TypeLubrifiant, "Huile moteur");
    let typelub_graisse = lookup(&service, LookupKind::TypeLubrifiant, "Graisse");
    let lub_huile = service
        .create_lubrifiant(&LubrifiantInput {
            name: "15W40".to_string(),
            typelubrifiant_id: typelub_huile,
        })
        .unwrap()
        .id;
    let lub_graisse = service
        .create_lubrifiant(&LubrifiantInput {
            name: "EP2".to_string(),
            typelubrifiant_id: typelub_graisse,
        })
        .unwrap()
        .id;

    Fleet {
        site_nord,
        site_sud,
        typeparc_chargeuse,
        typeparc_camion,
        parc_994,
        parc_777,
        engin_a,
        engin_b,
        engin_truck,
        panne_moteur,
        panne_hydraulique,
        typelub_huile,
        typelub_graisse,
        lub_huile,
        lub_graisse,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn lookup(
    service: &ReferentialService<SqliteReferentialRepository<'_>>,
    kind: LookupKind,
    name: &str,
) -> EntityId {
    service.create_lookup(kind, &NameInput::new(name)).unwrap().id
}
