use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};

use crate::models::patient::{generate_mrn, Patient, PatientRequest};
use crate::models::Page;

const PATIENT_COLUMNS: &str = "id, mrn, first_name, last_name, date_of_birth, gender, phone, email, address,
    blood_group, emergency_contact_name, emergency_contact_phone, created_at, updated_at";

#[instrument(skip(pool, req), fields(last_name = %req.last_name))]
pub async fn insert(pool: &SqlitePool, req: &PatientRequest) -> Result<Patient, sqlx::Error> {
    let now = Utc::now();
    let mrn = generate_mrn();

    let result = sqlx::query(
        "INSERT INTO patients (
            mrn, first_name, last_name, date_of_birth, gender, phone, email, address,
            blood_group, emergency_contact_name, emergency_contact_phone, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&mrn)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.date_of_birth)
    .bind(req.gender)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .bind(&req.blood_group)
    .bind(&req.emergency_contact_name)
    .bind(&req.emergency_contact_phone)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    info!(patient_id = id, mrn = %mrn, "Patient registered");
    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(&format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM patients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Columns a search term is matched against
const SEARCHED_COLUMNS: [&str; 4] = ["first_name", "last_name", "mrn", "first_name || ' ' || last_name"];

/// `%term%` for a LIKE with `ESCAPE '\'`; wildcards in the term match literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Search by first name, last name, full name or MRN, newest registrations first
pub async fn search(pool: &SqlitePool, q: Option<&str>, page: Page) -> Result<Vec<Patient>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM patients", PATIENT_COLUMNS));
    if let Some(term) = q.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" WHERE ");
        let mut matches = qb.separated(" OR ");
        for column in SEARCHED_COLUMNS {
            matches
                .push(column)
                .push_unseparated(" LIKE ")
                .push_bind_unseparated(pattern.clone())
                .push_unseparated(" ESCAPE '\\'");
        }
    }
    qb.push(" ORDER BY id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    qb.build_query_as::<Patient>().fetch_all(pool).await
}

#[instrument(skip(pool, req))]
pub async fn update(pool: &SqlitePool, id: i64, req: &PatientRequest) -> Result<Option<Patient>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE patients SET
            first_name = ?, last_name = ?, date_of_birth = ?, gender = ?, phone = ?, email = ?,
            address = ?, blood_group = ?, emergency_contact_name = ?, emergency_contact_phone = ?,
            updated_at = ?
         WHERE id = ?",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.date_of_birth)
    .bind(req.gender)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .bind(&req.blood_group)
    .bind(&req.emergency_contact_name)
    .bind(&req.emergency_contact_phone)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find(pool, id).await
}

/// Number of clinical or financial records that reference the patient
pub async fn reference_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM admissions WHERE patient_id = ?1) +
            (SELECT COUNT(*) FROM lab_tests WHERE patient_id = ?1) +
            (SELECT COUNT(*) FROM radiology_scans WHERE patient_id = ?1) +
            (SELECT COUNT(*) FROM prescriptions WHERE patient_id = ?1) +
            (SELECT COUNT(*) FROM appointments WHERE patient_id = ?1) +
            (SELECT COUNT(*) FROM bills WHERE patient_id = ?1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
