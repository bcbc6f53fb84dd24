use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::appointment::day_bounds;
use crate::models::dashboard::{BedOccupancy, DashboardStats};

/// Stock level at or below which a medicine counts as low
pub const LOW_STOCK_THRESHOLD: i64 = 10;

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}

pub async fn stats(pool: &SqlitePool) -> Result<DashboardStats, sqlx::Error> {
    let occupancy = sqlx::query_as::<_, BedOccupancy>(
        "SELECT w.ward_type,
                COUNT(b.id) AS total_beds,
                COALESCE(SUM(CASE WHEN b.is_occupied THEN 1 ELSE 0 END), 0) AS occupied_beds
         FROM wards w
         JOIN beds b ON b.ward_id = w.id
         GROUP BY w.ward_type
         ORDER BY w.ward_type",
    )
    .fetch_all(pool)
    .await?;

    let (start, end) = day_bounds(Utc::now().date_naive());
    let (appointments_today,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM appointments WHERE status = 'scheduled' AND scheduled_at >= ? AND scheduled_at < ?",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let (low_stock_medicines,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM medicines WHERE stock_quantity <= ?")
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(pool)
            .await?;

    Ok(DashboardStats {
        patients: count(pool, "SELECT COUNT(*) FROM patients").await?,
        active_admissions: count(pool, "SELECT COUNT(*) FROM admissions WHERE status = 'admitted'").await?,
        total_beds: occupancy.iter().map(|o| o.total_beds).sum(),
        occupied_beds: occupancy.iter().map(|o| o.occupied_beds).sum(),
        occupancy,
        pending_lab_tests: count(
            pool,
            "SELECT COUNT(*) FROM lab_tests WHERE status IN ('ordered', 'sample_collected')",
        )
        .await?,
        pending_radiology_scans: count(pool, "SELECT COUNT(*) FROM radiology_scans WHERE status = 'ordered'").await?,
        pending_prescriptions: count(pool, "SELECT COUNT(*) FROM prescriptions WHERE status = 'pending'").await?,
        appointments_today,
        outstanding_cents: count(
            pool,
            // TOTAL() sums as a float and cannot overflow; the cast saturates
            "SELECT CAST(TOTAL(total_cents - paid_cents) AS INTEGER)
             FROM bills WHERE status IN ('unpaid', 'partially_paid')",
        )
        .await?,
        low_stock_medicines,
    })
}
