use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use crate::models::facility::{
    Bed, BedFilter, Department, DepartmentRequest, Ward, WardFilter, WardRequest, WardSummary, WardType,
};

// ===== Departments =====

pub async fn list_departments(pool: &SqlitePool) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name, description, created_at FROM departments ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find_department(pool: &SqlitePool, id: i64) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name, description, created_at FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_department(pool: &SqlitePool, req: &DepartmentRequest) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO departments (name, description, created_at) VALUES (?, ?, ?)")
        .bind(&req.name)
        .bind(&req.description)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update_department(pool: &SqlitePool, id: i64, req: &DepartmentRequest) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
        .bind(&req.name)
        .bind(&req.description)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn department_has_wards(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wards WHERE department_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn delete_department(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ===== Wards =====

const WARD_SUMMARY_SELECT: &str = "SELECT w.id, w.name, w.department_id, w.ward_type,
        COUNT(b.id) AS total_beds,
        COALESCE(SUM(CASE WHEN b.is_occupied THEN 1 ELSE 0 END), 0) AS occupied_beds
    FROM wards w
    LEFT JOIN beds b ON b.ward_id = w.id";

pub async fn list_wards(pool: &SqlitePool, filter: &WardFilter) -> Result<Vec<WardSummary>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(WARD_SUMMARY_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(department_id) = filter.department_id {
        qb.push(" AND w.department_id = ").push_bind(department_id);
    }
    qb.push(" GROUP BY w.id ORDER BY w.name");
    qb.build_query_as::<WardSummary>().fetch_all(pool).await
}

pub async fn find_ward_summary(pool: &SqlitePool, id: i64) -> Result<Option<WardSummary>, sqlx::Error> {
    sqlx::query_as::<_, WardSummary>(&format!("{} WHERE w.id = ? GROUP BY w.id", WARD_SUMMARY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_ward(pool: &SqlitePool, id: i64) -> Result<Option<Ward>, sqlx::Error> {
    sqlx::query_as::<_, Ward>("SELECT id, name, department_id, ward_type, created_at FROM wards WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_ward(pool: &SqlitePool, req: &WardRequest) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO wards (name, department_id, ward_type, created_at) VALUES (?, ?, ?, ?)")
        .bind(&req.name)
        .bind(req.department_id)
        .bind(req.ward_type)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

// ===== Beds =====

const BED_SELECT: &str = "SELECT b.id, b.ward_id, w.name AS ward_name, w.ward_type, b.bed_number, b.is_occupied
    FROM beds b
    JOIN wards w ON w.id = b.ward_id";

pub async fn list_beds(pool: &SqlitePool, filter: &BedFilter) -> Result<Vec<Bed>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(BED_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(available) = filter.available {
        qb.push(" AND b.is_occupied = ").push_bind(!available);
    }
    if let Some(ward_type) = filter.ward_type {
        qb.push(" AND w.ward_type = ").push_bind(ward_type);
    }
    if let Some(ward_id) = filter.ward_id {
        qb.push(" AND b.ward_id = ").push_bind(ward_id);
    }
    qb.push(" ORDER BY w.name, b.bed_number");
    qb.build_query_as::<Bed>().fetch_all(pool).await
}

pub async fn find_bed<'e, E>(executor: E, id: i64) -> Result<Option<Bed>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Bed>(&format!("{} WHERE b.id = ?", BED_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Lowest-numbered free bed in a ward of one of the given types
pub async fn first_free_bed<'e, E>(
    executor: E,
    ward_types: &[WardType],
    ward_id: Option<i64>,
) -> Result<Option<Bed>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut qb = QueryBuilder::<Sqlite>::new(BED_SELECT);
    qb.push(" WHERE b.is_occupied = 0 AND w.ward_type IN (");
    let mut separated = qb.separated(", ");
    for ward_type in ward_types {
        separated.push_bind(*ward_type);
    }
    separated.push_unseparated(")");
    if let Some(ward_id) = ward_id {
        qb.push(" AND b.ward_id = ").push_bind(ward_id);
    }
    qb.push(" ORDER BY w.id, LENGTH(b.bed_number), b.bed_number LIMIT 1");
    qb.build_query_as::<Bed>().fetch_optional(executor).await
}

pub async fn insert_bed(pool: &SqlitePool, ward_id: i64, bed_number: &str) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO beds (ward_id, bed_number, is_occupied) VALUES (?, ?, 0)")
        .bind(ward_id)
        .bind(bed_number)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Mark a free bed occupied. False when the bed was already taken.
pub async fn claim_bed<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE beds SET is_occupied = 1 WHERE id = ? AND is_occupied = 0")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn release_bed<'e, E>(executor: E, id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE beds SET is_occupied = 0 WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn bed_has_admissions(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admissions WHERE bed_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn delete_bed(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM beds WHERE id = ? AND is_occupied = 0")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
