use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use gmao_core::db::open_db_in_memory;
use gmao_core::model::user::{NewUser, RoleInput};
use gmao_core::repo::rbac_repo::SqliteRbacRepository;
use gmao_core::service::auth_service::AuthService;
use gmao_core::rbac::parse_permission;
use gmao_core::Permission;
use gmao_server::{build_router, AppState};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@mine.dz";
const READER_EMAIL: &str = "lecteur@mine.dz";
const PASSWORD: &str = "correct-horse-battery";

fn app() -> Router {
    let conn = open_db_in_memory().unwrap();
    {
        let auth = AuthService::new(SqliteRbacRepository::new(&conn));
        auth.bootstrap_admin(ADMIN_EMAIL, PASSWORD).unwrap();
        let reader = auth
            .register_user(&NewUser {
                email: READER_EMAIL.to_string(),
                name: "Lecteur".to_string(),
                password: PASSWORD.to_string(),
            })
            .unwrap();
        let role = auth
            .create_role(&RoleInput {
                name: "lecteur".to_string(),
                description: None,
            })
            .unwrap();
        let permissions: Vec<Permission> = ["read:site", "read:engin"]
            .into_iter()
            .map(|value| parse_permission(value).unwrap())
            .collect();
        auth.set_role_permissions(role.id, &permissions).unwrap();
        auth.assign_role(reader.id, role.id).unwrap();
    }
    let state = AppState::new(conn, chrono::Duration::hours(1));
    build_router(state, Duration::from_secs(5))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/sites", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/sites",
        Some("00000000-0000-4000-8000-000000000000"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn site_crud_round_trip() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;

    let (status, site) = call(
        &app,
        Method::POST,
        "/api/sites",
        Some(&token),
        Some(json!({ "name": "Nord" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = site["id"].as_i64().unwrap();
    assert_eq!(site["active"], true);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/sites",
        Some(&token),
        Some(json!({ "name": "nord" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, site) = call(
        &app,
        Method::PUT,
        &format!("/api/sites/{id}"),
        Some(&token),
        Some(json!({ "name": "Nord-Est", "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site["name"], "Nord-Est");

    let (status, sites) = call(&app, Method::GET, "/api/sites", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sites.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/sites/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/sites/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn lookup_tables_share_the_collection_routes() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    let (status, entry) = call(
        &app,
        Method::POST,
        "/api/typepannes",
        Some(&token),
        Some(json!({ "name": "Électrique" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = entry["id"].as_i64().unwrap();

    let (status, entry) = call(
        &app,
        Method::GET,
        &format!("/api/typepannes/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["name"], "Électrique");

    let (status, list) = call(&app, Method::GET, "/api/typeparcs", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn permissions_are_checked_per_action() {
    let app = app();
    let token = login(&app, READER_EMAIL).await;

    let (status, _) = call(&app, Method::GET, "/api/sites", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/sites",
        Some(&token),
        Some(json!({ "name": "Sud" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/reports/rje?date=2024-03-15",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, me) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], READER_EMAIL);
    assert_eq!(me["permissions"], json!(["read:site", "read:engin"]));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    let (status, _) = call(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn seed_engin(app: &Router, token: &str) -> (i64, i64) {
    let (_, site) = call(
        app,
        Method::POST,
        "/api/sites",
        Some(token),
        Some(json!({ "name": "Nord" })),
    )
    .await;
    let (_, typeparc) = call(
        app,
        Method::POST,
        "/api/typeparcs",
        Some(token),
        Some(json!({ "name": "Chargeuse" })),
    )
    .await;
    let (_, parc) = call(
        app,
        Method::POST,
        "/api/parcs",
        Some(token),
        Some(json!({ "name": "994F", "typeparc_id": typeparc["id"] })),
    )
    .await;
    let (status, engin) = call(
        app,
        Method::POST,
        "/api/engins",
        Some(token),
        Some(json!({ "name": "CH-01", "parc_id": parc["id"], "site_id": site["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (engin["id"].as_i64().unwrap(), site["id"].as_i64().unwrap())
}

#[tokio::test]
async fn anomaly_transitions_follow_the_lifecycle() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    let (engin_id, site_id) = seed_engin(&app, &token).await;

    let (status, anomalie) = call(
        &app,
        Method::POST,
        "/api/anomalies",
        Some(&token),
        Some(json!({
            "date_detection": "2024-03-15",
            "description": "Fuite vérin de levage",
            "source": "VS",
            "priorite": "ELEVEE",
            "engin_id": engin_id,
            "site_id": site_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(anomalie["numero_backlog"], "BL-2024-0001");
    assert_eq!(anomalie["statut"], "NON_PROGRAMMEE");
    let id = anomalie["id"].as_i64().unwrap();
    let transition = format!("/api/anomalies/{id}/transition");

    let (status, body) = call(
        &app,
        Method::POST,
        &transition,
        Some(&token),
        Some(json!({ "statut": "EXECUTEE", "date_execution": "2024-03-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_transition");

    let (status, body) = call(
        &app,
        Method::POST,
        &transition,
        Some(&token),
        Some(json!({ "statut": "PROGRAMMEE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    let (status, anomalie) = call(
        &app,
        Method::POST,
        &transition,
        Some(&token),
        Some(json!({ "statut": "PROGRAMMEE", "date_programmation": "2024-03-18" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anomalie["date_programmation"], "2024-03-18");

    let (status, stats) = call(
        &app,
        Method::GET,
        "/api/reports/anomalie-stats",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["open_backlog"], 1);
}

#[tokio::test]
async fn daily_capacity_violations_are_validation_errors() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    let (engin_id, site_id) = seed_engin(&app, &token).await;

    let (status, hrm) = call(
        &app,
        Method::POST,
        "/api/saisiehrm",
        Some(&token),
        Some(json!({ "du": "2024-03-15", "engin_id": engin_id, "site_id": site_id, "hrm": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, typepanne) = call(
        &app,
        Method::POST,
        "/api/typepannes",
        Some(&token),
        Some(json!({ "name": "Mécanique" })),
    )
    .await;
    let (_, panne) = call(
        &app,
        Method::POST,
        "/api/pannes",
        Some(&token),
        Some(json!({ "name": "Moteur", "typepanne_id": typepanne["id"] })),
    )
    .await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/saisiehim",
        Some(&token),
        Some(json!({ "saisiehrm_id": hrm["id"], "panne_id": panne["id"], "him": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    let (status, list) = call(
        &app,
        Method::GET,
        &format!("/api/saisiehrm?engin_id={engin_id}&from=2024-03-01&to=2024-03-31"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_import_lists_failing_rows() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    seed_engin(&app, &token).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/import/engins",
        Some(&token),
        Some(json!([
            { "engin": "CH-02", "parc": "994F", "site": "Nord" },
            { "engin": "CH-03", "parc": "Inconnu", "site": "Nord" },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "import_rejected");
    assert_eq!(body["error"]["rows"][0]["row"], 2);

    let (status, report) = call(
        &app,
        Method::POST,
        "/api/import/engins?dry_run=true",
        Some(&token),
        Some(json!([{ "engin": "CH-02", "parc": "994F", "site": "Nord" }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["created"], 1);
    assert_eq!(report["dry_run"], true);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/import/objectifs",
        Some(&token),
        Some(json!([])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_answer_with_empty_fleets() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;
    let (status, report) = call(
        &app,
        Method::GET,
        "/api/reports/rje?date=2024-03-15",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["date"], "2024-03-15");
    assert!(report["rows"].as_array().unwrap().is_empty());

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/reports/etat-mensuel?year=2024&month=13",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/reports/rje",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn admins_manage_roles_and_users() {
    let app = app();
    let token = login(&app, ADMIN_EMAIL).await;

    let (status, role) = call(
        &app,
        Method::POST,
        "/api/roles",
        Some(&token),
        Some(json!({ "name": "planificateur" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = role["id"].as_i64().unwrap();

    let (status, role) = call(
        &app,
        Method::PUT,
        &format!("/api/roles/{role_id}/permissions"),
        Some(&token),
        Some(json!(["read:anomalie", "update:anomalie"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(role["permissions"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/roles/{role_id}/permissions"),
        Some(&token),
        Some(json!(["fly:anomalie"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, user) = call(
        &app,
        Method::POST,
        "/api/users",
        Some(&token),
        Some(json!({ "email": "plan@mine.dz", "name": "Plan", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/users/{user_id}/roles/{role_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, roles) = call(
        &app,
        Method::GET,
        &format!("/api/users/{user_id}/roles"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(roles[0]["name"], "planificateur");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/users/{user_id}/roles/{role_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, user) = call(
        &app,
        Method::PUT,
        &format!("/api/users/{user_id}/active"),
        Some(&token),
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["active"], false);
}
