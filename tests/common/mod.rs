//! Shared helpers for the HTTP integration tests
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{web, App};
use chrono::NaiveDate;
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use serde_json::{json, Value};

use hmis::config::Config;
use hmis::db::Database;
use hmis::AppState;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_PASSWORD: &str = "staff-password";

pub async fn test_state() -> web::Data<AppState> {
    let config = Config::for_tests();
    let db = Database::connect_in_memory().await.expect("in-memory database");
    db.run_migrations().await.expect("migrations");
    db.bootstrap_admin(&config.auth).await.expect("bootstrap admin");
    web::Data::new(AppState::new(db, config))
}

pub async fn spawn_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    let state = test_state().await;
    test::init_service(App::new().app_data(state).configure(hmis::api::configure)).await
}

/// A database file under the temp dir, removed with its WAL files on drop
pub struct TempDatabase {
    path: PathBuf,
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Like `spawn_app`, but on a file database with a pool of several
/// connections, so requests really run side by side
pub async fn spawn_app_on_file() -> (
    impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    TempDatabase,
) {
    let path = std::env::temp_dir().join(format!("hmis-test-{}.db", uuid::Uuid::new_v4()));
    let mut config = Config::for_tests();
    config.database.url = format!("sqlite://{}?mode=rwc", path.display());
    config.database.max_connections = 5;

    let db = Database::connect(&config.database).await.expect("file database");
    db.run_migrations().await.expect("migrations");
    db.bootstrap_admin(&config.auth).await.expect("bootstrap admin");
    let state = web::Data::new(AppState::new(db, config));
    let app = test::init_service(App::new().app_data(state).configure(hmis::api::configure)).await;
    (app, TempDatabase { path })
}

/// Send a request and decode the JSON body (`Null` for empty bodies)
pub async fn send<S, B>(app: &S, req: TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON response body")
    };
    (status, value)
}

pub async fn get<S, B>(app: &S, token: &str, uri: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, TestRequest::get().uri(uri).insert_header(bearer(token))).await
}

pub async fn post<S, B>(app: &S, token: &str, uri: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, TestRequest::post().uri(uri).insert_header(bearer(token)).set_json(body)).await
}

pub async fn put<S, B>(app: &S, token: &str, uri: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, TestRequest::put().uri(uri).insert_header(bearer(token)).set_json(body)).await
}

pub async fn delete<S, B>(app: &S, token: &str, uri: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, TestRequest::delete().uri(uri).insert_header(bearer(token))).await
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub async fn login<S, B>(app: &S, username: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().expect("token in login response").to_string()
}

pub async fn admin_token<S, B>(app: &S) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    login(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

/// A freshly created staff account
pub struct Staff {
    pub id: i64,
    pub username: String,
    pub token: String,
}

pub async fn create_staff<S, B>(app: &S, admin: &str, role: &str) -> Staff
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let username = format!("{}{}", role.replace('_', "."), NEXT_ID.fetch_add(1, Ordering::SeqCst));
    let full_name: String = Name().fake();
    let (status, body) = post(
        app,
        admin,
        "/api/users",
        json!({
            "username": username,
            "password": STAFF_PASSWORD,
            "full_name": full_name,
            "role": role,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "creating {} failed: {}", role, body);
    let id = body["id"].as_i64().expect("user id");
    let token = login(app, &username, STAFF_PASSWORD).await;
    Staff { id, username, token }
}

pub fn patient_body() -> Value {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    let phone: String = PhoneNumber().fake();
    json!({
        "first_name": first,
        "last_name": last,
        "date_of_birth": NaiveDate::from_ymd_opt(1984, 3, 17).expect("valid date"),
        "gender": "female",
        "phone": format!("{:0<5}", phone.chars().take(30).collect::<String>()),
        "blood_group": "O+",
    })
}

pub async fn register_patient<S, B>(app: &S, token: &str) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = post(app, token, "/api/patients", patient_body()).await;
    assert_eq!(status, StatusCode::CREATED, "registering patient failed: {}", body);
    body["id"].as_i64().expect("patient id")
}

/// Department plus one ward of the given type holding `beds` beds.
/// Returns (ward_id, bed ids).
pub async fn ward_with_beds<S, B>(app: &S, admin: &str, ward_type: &str, beds: usize) -> (i64, Vec<i64>)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let n = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    let (status, dept) = post(
        app,
        admin,
        "/api/departments",
        json!({ "name": format!("{} department {}", ward_type, n) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", dept);

    let (status, ward) = post(
        app,
        admin,
        "/api/wards",
        json!({
            "name": format!("{} ward {}", ward_type, n),
            "department_id": dept["id"],
            "ward_type": ward_type,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", ward);
    let ward_id = ward["id"].as_i64().expect("ward id");

    let mut bed_ids = Vec::with_capacity(beds);
    for n in 1..=beds {
        let (status, bed) = post(
            app,
            admin,
            &format!("/api/wards/{}/beds", ward_id),
            json!({ "bed_number": format!("{}-{}", ward_type, n) }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", bed);
        bed_ids.push(bed["id"].as_i64().expect("bed id"));
    }
    (ward_id, bed_ids)
}
