use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

use crate::auth::Role;
use crate::models::user::{UpdateUserRequest, UserFilter, UserRecord};

const USER_COLUMNS: &str =
    "id, username, password_hash, full_name, email, role, department_id, is_active, created_at";

#[instrument(skip(executor, password_hash))]
pub async fn insert_user<'e, E>(
    executor: E,
    username: &str,
    password_hash: &str,
    full_name: &str,
    email: Option<&str>,
    role: Role,
    department_id: Option<i64>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, full_name, email, role, department_id, is_active, created_at)
         VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(username)
    .bind(password_hash)
    .bind(full_name)
    .bind(email)
    .bind(role)
    .bind(department_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<UserRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &SqlitePool, filter: &UserFilter) -> Result<Vec<UserRecord>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" ORDER BY full_name");
    qb.build_query_as::<UserRecord>().fetch_all(pool).await
}

/// Active staff with the given role
pub async fn list_active_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<UserRecord>, sqlx::Error> {
    list(
        pool,
        &UserFilter {
            role: Some(role),
            active: Some(true),
        },
    )
    .await
}

/// True if the id belongs to an active account with this role
pub async fn has_active_role<'e, E>(executor: E, id: i64, role: Role) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE id = ? AND role = ? AND is_active = 1")
            .bind(id)
            .bind(role)
            .fetch_optional(executor)
            .await?;
    Ok(found.is_some())
}

#[instrument(skip(pool, update))]
pub async fn update(pool: &SqlitePool, id: i64, update: &UpdateUserRequest) -> Result<Option<UserRecord>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET
            full_name = COALESCE(?, full_name),
            email = COALESCE(?, email),
            role = COALESCE(?, role),
            department_id = COALESCE(?, department_id),
            is_active = COALESCE(?, is_active)
         WHERE id = ?",
    )
    .bind(&update.full_name)
    .bind(&update.email)
    .bind(update.role)
    .bind(update.department_id)
    .bind(update.is_active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_password_hash(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
