mod common;

use actix_web::http::StatusCode;
use serde_json::json;

use common::*;

#[actix_rt::test]
async fn payments_settle_a_bill() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let accountant = create_staff(&app, &admin, "accountant").await;
    let patient = register_patient(&app, &admin).await;

    let (status, bill) = post(
        &app,
        &accountant.token,
        "/api/bills",
        json!({
            "patient_id": patient,
            "items": [
                { "description": "Consultation", "category": "consultation", "quantity": 1, "unit_price_cents": 5000 },
                { "description": "X-ray wrist", "category": "radiology", "quantity": 2, "unit_price_cents": 2500 },
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", bill);
    assert_eq!(bill["status"], "unpaid");
    assert_eq!(bill["total_cents"], 10_000);
    assert_eq!(bill["balance_cents"], 10_000);
    assert_eq!(bill["items"].as_array().unwrap().len(), 2);
    let id = bill["id"].as_i64().unwrap();

    let (status, partial) = post(
        &app,
        &accountant.token,
        &format!("/api/bills/{}/payments", id),
        json!({ "amount_cents": 4000, "method": "card", "reference": "POS-1182" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", partial);
    assert_eq!(partial["status"], "partially_paid");
    assert_eq!(partial["balance_cents"], 6000);

    let (status, body) = post(
        &app,
        &accountant.token,
        &format!("/api/bills/{}/payments", id),
        json!({ "amount_cents": 6001, "method": "cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, paid) = post(
        &app,
        &accountant.token,
        &format!("/api/bills/{}/payments", id),
        json!({ "amount_cents": 6000, "method": "cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["balance_cents"], 0);
    assert_eq!(paid["payments"].as_array().unwrap().len(), 2);
}

#[actix_rt::test]
async fn adding_items_reopens_balance() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let patient = register_patient(&app, &admin).await;

    let (_, bill) = post(&app, &admin, "/api/bills", json!({ "patient_id": patient })).await;
    let id = bill["id"].as_i64().unwrap();
    assert_eq!(bill["total_cents"], 0);

    let (status, _) = post(&app, &admin, &format!("/api/bills/{}/items", id), json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = post(
        &app,
        &admin,
        &format!("/api/bills/{}/items", id),
        json!([{ "description": "Ward stay, 3 nights", "category": "room", "quantity": 3, "unit_price_cents": 12000 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["total_cents"], 36_000);
    assert_eq!(updated["status"], "unpaid");
}

#[actix_rt::test]
async fn void_is_admin_only_and_refuses_paid_bills() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let clerk = create_staff(&app, &admin, "receptionist").await;
    let patient = register_patient(&app, &clerk.token).await;

    let item = json!({ "description": "Dressing", "category": "procedure", "quantity": 1, "unit_price_cents": 800 });
    let (_, unpaid) = post(&app, &clerk.token, "/api/bills", json!({ "patient_id": patient, "items": [item.clone()] })).await;
    let (_, paid) = post(&app, &clerk.token, "/api/bills", json!({ "patient_id": patient, "items": [item] })).await;
    post(
        &app,
        &clerk.token,
        &format!("/api/bills/{}/payments", paid["id"]),
        json!({ "amount_cents": 300, "method": "cash" }),
    )
    .await;

    let (status, _) = post(&app, &clerk.token, &format!("/api/bills/{}/void", unpaid["id"]), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, voided) = post(&app, &admin, &format!("/api/bills/{}/void", unpaid["id"]), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["status"], "void");

    let (status, _) = post(&app, &admin, &format!("/api/bills/{}/void", paid["id"]), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Void bills take no further payments
    let (status, _) = post(
        &app,
        &clerk.token,
        &format!("/api/bills/{}/payments", unpaid["id"]),
        json!({ "amount_cents": 100, "method": "cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn bill_admission_must_belong_to_patient() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    ward_with_beds(&app, &admin, "general", 1).await;
    let admitted = register_patient(&app, &admin).await;
    let other = register_patient(&app, &admin).await;
    let (_, admission) = post(
        &app,
        &admin,
        "/api/admissions",
        json!({ "patient_id": admitted, "category": "general", "reason": "asthma" }),
    )
    .await;

    let (status, _) = post(
        &app,
        &admin,
        "/api/bills",
        json!({ "patient_id": other, "admission_id": admission["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        &admin,
        "/api/bills",
        json!({ "patient_id": admitted, "admission_id": admission["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_rt::test]
async fn clinical_roles_cannot_see_bills() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let (status, _) = get(&app, &doctor.token, "/api/bills").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
