mod common;

use actix_web::http::StatusCode;
use serde_json::json;

use common::*;

#[actix_rt::test]
async fn lab_test_moves_through_its_lifecycle() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let tech = create_staff(&app, &admin, "lab_technician").await;
    let patient = register_patient(&app, &doctor.token).await;

    let (status, test) = post(
        &app,
        &doctor.token,
        "/api/lab-tests",
        json!({ "patient_id": patient, "test_name": "Complete blood count", "priority": "urgent" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", test);
    assert_eq!(test["status"], "ordered");
    let id = test["id"].as_i64().unwrap();

    // Results cannot skip sample collection
    let (status, _) = post(&app, &tech.token, &format!("/api/lab-tests/{}/result", id), json!({ "result": "WBC 11.2" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, collected) = post(&app, &tech.token, &format!("/api/lab-tests/{}/collect", id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collected["status"], "sample_collected");

    let (status, done) = post(
        &app,
        &tech.token,
        &format!("/api/lab-tests/{}/result", id),
        json!({ "result": "WBC 11.2", "notes": "mild leukocytosis" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", done);
    assert_eq!(done["status"], "completed");
    assert_eq!(done["result"], "WBC 11.2");
    assert_eq!(done["performed_by"], tech.id);
    assert!(done["completed_at"].is_string());

    let (status, _) = post(&app, &doctor.token, &format!("/api/lab-tests/{}/cancel", id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn only_doctors_order_lab_tests() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let nurse = create_staff(&app, &admin, "nurse").await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let patient = register_patient(&app, &nurse.token).await;

    let order = json!({ "patient_id": patient, "test_name": "Lipid panel" });
    let (status, _) = post(&app, &nurse.token, "/api/lab-tests", order.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(&app, &doctor.token, "/api/lab-tests", json!({ "patient_id": 4242, "test_name": "Lipid panel" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn stat_orders_list_first() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let patient = register_patient(&app, &doctor.token).await;

    for (name, priority) in [("Ferritin", "routine"), ("Troponin", "stat"), ("Lactate", "urgent")] {
        post(
            &app,
            &doctor.token,
            "/api/lab-tests",
            json!({ "patient_id": patient, "test_name": name, "priority": priority }),
        )
        .await;
    }

    let (_, tests) = get(&app, &doctor.token, "/api/lab-tests?status=ordered").await;
    let names: Vec<&str> = tests.as_array().unwrap().iter().map(|t| t["test_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Troponin", "Lactate", "Ferritin"]);
}

#[actix_rt::test]
async fn radiology_scan_is_reported_once() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let radiologist = create_staff(&app, &admin, "radiologist").await;
    let patient = register_patient(&app, &doctor.token).await;

    let (status, scan) = post(
        &app,
        &doctor.token,
        "/api/radiology-scans",
        json!({ "patient_id": patient, "modality": "ct", "body_part": "chest", "clinical_notes": "rule out PE" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", scan);
    let id = scan["id"].as_i64().unwrap();

    let report = json!({ "findings": "No filling defect", "impression": "No pulmonary embolism" });
    let (status, _) = post(&app, &doctor.token, &format!("/api/radiology-scans/{}/report", id), report.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, reported) =
        post(&app, &radiologist.token, &format!("/api/radiology-scans/{}/report", id), report.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", reported);
    assert_eq!(reported["status"], "completed");
    assert_eq!(reported["reported_by"], radiologist.id);

    let (status, _) = post(&app, &radiologist.token, &format!("/api/radiology-scans/{}/report", id), report).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&app, &doctor.token, &format!("/api/radiology-scans/{}/cancel", id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn stock_medicine<S, B>(app: &S, token: &str, name: &str, stock: i64) -> i64
where
    S: actix_web::dev::Service<actix_http::Request, Response = actix_web::dev::ServiceResponse<B>, Error = actix_web::Error>,
    B: actix_web::body::MessageBody,
{
    let (status, medicine) = post(
        app,
        token,
        "/api/medicines",
        json!({
            "name": name,
            "form": "tablet",
            "strength": "500 mg",
            "unit_price_cents": 25,
            "stock_quantity": stock,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", medicine);
    medicine["id"].as_i64().unwrap()
}

#[actix_rt::test]
async fn dispensing_decrements_stock() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let pharmacist = create_staff(&app, &admin, "pharmacist").await;
    let patient = register_patient(&app, &doctor.token).await;
    let amoxicillin = stock_medicine(&app, &pharmacist.token, "Amoxicillin", 40).await;

    let (status, prescription) = post(
        &app,
        &doctor.token,
        "/api/prescriptions",
        json!({
            "patient_id": patient,
            "items": [{
                "medicine_id": amoxicillin,
                "dosage": "1 tablet",
                "frequency": "three times daily",
                "duration_days": 7,
                "quantity": 21,
            }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", prescription);
    assert_eq!(prescription["status"], "pending");
    assert_eq!(prescription["items"][0]["medicine_name"], "Amoxicillin");
    let id = prescription["id"].as_i64().unwrap();

    let (status, dispensed) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", id), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", dispensed);
    assert_eq!(dispensed["status"], "dispensed");
    assert_eq!(dispensed["dispensed_by"], pharmacist.id);

    let (_, medicines) = get(&app, &pharmacist.token, "/api/medicines").await;
    assert_eq!(medicines[0]["stock_quantity"], 19);

    let (status, _) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn short_stock_dispenses_nothing() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let pharmacist = create_staff(&app, &admin, "pharmacist").await;
    let patient = register_patient(&app, &doctor.token).await;
    let plenty = stock_medicine(&app, &pharmacist.token, "Paracetamol", 100).await;
    let scarce = stock_medicine(&app, &pharmacist.token, "Warfarin", 2).await;

    let line = |medicine: i64, quantity: i64| {
        json!({
            "medicine_id": medicine,
            "dosage": "1 tablet",
            "frequency": "daily",
            "duration_days": 10,
            "quantity": quantity,
        })
    };
    let (_, prescription) = post(
        &app,
        &doctor.token,
        "/api/prescriptions",
        json!({ "patient_id": patient, "items": [line(plenty, 10), line(scarce, 10)] }),
    )
    .await;
    let id = prescription["id"].as_i64().unwrap();

    let (status, body) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    // The first line's decrement was rolled back with the rest
    let (_, medicines) = get(&app, &pharmacist.token, "/api/medicines").await;
    let stock = |name: &str| {
        medicines
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["name"] == name)
            .map(|m| m["stock_quantity"].as_i64().unwrap())
            .unwrap()
    };
    assert_eq!(stock("Paracetamol"), 100);
    assert_eq!(stock("Warfarin"), 2);

    let (_, still_pending) = get(&app, &pharmacist.token, &format!("/api/prescriptions/{}", id)).await;
    assert_eq!(still_pending["status"], "pending");

    let (status, _) = post(&app, &pharmacist.token, &format!("/api/medicines/{}/restock", scarce), json!({ "quantity": 50 })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_rt::test]
async fn prescription_needs_known_medicines() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let patient = register_patient(&app, &doctor.token).await;

    let (status, _) = post(
        &app,
        &doctor.token,
        "/api/prescriptions",
        json!({ "patient_id": patient, "items": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &app,
        &doctor.token,
        "/api/prescriptions",
        json!({
            "patient_id": patient,
            "items": [{ "medicine_id": 777, "dosage": "1", "frequency": "daily", "duration_days": 1, "quantity": 1 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, prescriptions) = get(&app, &doctor.token, &format!("/api/prescriptions?patient_id={}", patient)).await;
    assert_eq!(prescriptions.as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn history_collects_patient_records() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let patient = register_patient(&app, &doctor.token).await;

    post(&app, &doctor.token, "/api/lab-tests", json!({ "patient_id": patient, "test_name": "HbA1c" })).await;
    post(
        &app,
        &doctor.token,
        "/api/radiology-scans",
        json!({ "patient_id": patient, "modality": "xray", "body_part": "left wrist" }),
    )
    .await;

    let (status, history) = get(&app, &doctor.token, &format!("/api/patients/{}/history", patient)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["patient"]["id"], patient);
    assert_eq!(history["lab_tests"].as_array().unwrap().len(), 1);
    assert_eq!(history["radiology_scans"].as_array().unwrap().len(), 1);
    assert!(history["admissions"].as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn patients_are_found_by_name_and_mrn() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let clerk = create_staff(&app, &admin, "receptionist").await;

    let mut body = patient_body();
    body["first_name"] = json!("Grace");
    body["last_name"] = json!("Hopper");
    let (status, grace) = post(&app, &clerk.token, "/api/patients", body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", grace);
    register_patient(&app, &clerk.token).await;

    let (status, by_name) = get(&app, &clerk.token, "/api/patients?q=hopp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_name.as_array().unwrap().len(), 1);
    assert_eq!(by_name[0]["id"], grace["id"]);

    let (_, by_full_name) = get(&app, &clerk.token, "/api/patients?q=Grace%20Hopper").await;
    assert_eq!(by_full_name[0]["id"], grace["id"]);

    let mrn = grace["mrn"].as_str().unwrap();
    let (_, by_mrn) = get(&app, &clerk.token, &format!("/api/patients?q={}", mrn)).await;
    assert_eq!(by_mrn.as_array().unwrap().len(), 1);
    assert_eq!(by_mrn[0]["mrn"], mrn);

    // Wildcards in the term are matched literally
    let (_, wildcard) = get(&app, &clerk.token, "/api/patients?q=%25").await;
    assert!(wildcard.as_array().unwrap().is_empty());
    let (_, underscore) = get(&app, &clerk.token, "/api/patients?q=_").await;
    assert!(underscore.as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn patient_details_can_be_updated_and_unused_records_deleted() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let nurse = create_staff(&app, &admin, "nurse").await;
    let patient = register_patient(&app, &nurse.token).await;
    let (_, before) = get(&app, &nurse.token, &format!("/api/patients/{}", patient)).await;

    let mut body = patient_body();
    body["last_name"] = json!("Okafor");
    body["address"] = json!("12 Harbour Road");
    let (status, updated) = put(&app, &nurse.token, &format!("/api/patients/{}", patient), body).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["last_name"], "Okafor");
    assert_eq!(updated["address"], "12 Harbour Road");
    assert_eq!(updated["mrn"], before["mrn"]);

    let (status, _) = delete(&app, &nurse.token, &format!("/api/patients/{}", patient)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = delete(&app, &admin, &format!("/api/patients/{}", patient)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &nurse.token, &format!("/api/patients/{}", patient)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn prescriptions_cancel_only_while_pending() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let doctor = create_staff(&app, &admin, "doctor").await;
    let pharmacist = create_staff(&app, &admin, "pharmacist").await;
    let patient = register_patient(&app, &doctor.token).await;
    let medicine = stock_medicine(&app, &pharmacist.token, "Metformin", 60).await;

    let write = || {
        json!({
            "patient_id": patient,
            "items": [{ "medicine_id": medicine, "dosage": "500 mg", "frequency": "twice daily", "duration_days": 30, "quantity": 20 }],
        })
    };
    let (_, first) = post(&app, &doctor.token, "/api/prescriptions", write()).await;
    let (_, second) = post(&app, &doctor.token, "/api/prescriptions", write()).await;

    let (status, cancelled) = post(&app, &doctor.token, &format!("/api/prescriptions/{}/cancel", first["id"]), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (status, _) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", first["id"]), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&app, &pharmacist.token, &format!("/api/prescriptions/{}/dispense", second["id"]), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, &admin, &format!("/api/prescriptions/{}/cancel", second["id"]), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn low_stock_filter_lists_scarce_medicines() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let pharmacist = create_staff(&app, &admin, "pharmacist").await;
    stock_medicine(&app, &pharmacist.token, "Ibuprofen", 400).await;
    let scarce = stock_medicine(&app, &pharmacist.token, "Digoxin", 4).await;
    let borderline = stock_medicine(&app, &pharmacist.token, "Atenolol", 10).await;

    let (status, low) = get(&app, &pharmacist.token, "/api/medicines?low_stock=10").await;
    assert_eq!(status, StatusCode::OK);
    let mut ids: Vec<i64> = low.as_array().unwrap().iter().map(|m| m["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![scarce, borderline]);

    let (_, all) = get(&app, &pharmacist.token, "/api/medicines").await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[actix_rt::test]
async fn restock_cannot_push_stock_past_the_limit() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let pharmacist = create_staff(&app, &admin, "pharmacist").await;
    let medicine = stock_medicine(&app, &pharmacist.token, "Salbutamol", 5).await;
    let uri = format!("/api/medicines/{}/restock", medicine);

    let (status, _) = post(&app, &pharmacist.token, &uri, json!({ "quantity": i64::MAX })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = post(&app, &pharmacist.token, &uri, json!({ "quantity": 1_000_000_000 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // Stock and the medicine list are untouched
    let (status, medicines) = get(&app, &pharmacist.token, "/api/medicines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(medicines[0]["stock_quantity"], 5);

    let (status, restocked) = post(&app, &pharmacist.token, &uri, json!({ "quantity": 999_999_995 })).await;
    assert_eq!(status, StatusCode::OK, "{}", restocked);
    assert_eq!(restocked["stock_quantity"], 1_000_000_000);

    let (status, _) = post(&app, &pharmacist.token, "/api/medicines/4242/restock", json!({ "quantity": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
