//! User accounts and linked provider queries

use crate::StorageError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tether_core::types::{ProviderLink, User, UserId, UserUpdate};

type Result<T> = std::result::Result<T, StorageError>;

/// Get a user by ID, with linked providers
pub async fn get_by_id(pool: &SqlitePool, id: &UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name, username, email, created_at FROM users WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Find the user owning an external identity
///
/// Uses the unique `(provider, identifier)` index on `user_providers`.
pub async fn find_by_provider(
    pool: &SqlitePool,
    provider: &str,
    identifier: &str,
) -> Result<Option<User>> {
    let user_id: Option<String> = sqlx::query_scalar(
        "SELECT user_id FROM user_providers WHERE provider = ? AND identifier = ?",
    )
    .bind(provider)
    .bind(identifier)
    .fetch_optional(pool)
    .await?;

    match user_id {
        Some(user_id) => get_by_id(pool, &UserId::new(user_id)).await,
        None => Ok(None),
    }
}

/// Insert a user and its provider links in one transaction
pub async fn create(pool: &SqlitePool, user: &User) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO users (id, name, username, email, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(user.name.as_deref())
    .bind(user.username.as_deref())
    .bind(user.email.as_deref())
    .bind(user.created_at.timestamp())
    .execute(&mut *tx)
    .await?;

    insert_providers(&mut *tx, &user.id, &user.providers).await?;

    tx.commit().await?;
    Ok(())
}

/// Apply a partial update
///
/// A providers list in the update replaces the stored list wholesale.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if the user does not exist
pub async fn update(pool: &SqlitePool, id: &UserId, update: &UserUpdate) -> Result<()> {
    let mut tx = pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

    if exists.is_none() {
        return Err(StorageError::not_found("User", id.as_str()));
    }

    if let Some(name) = &update.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    if let Some(email) = &update.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(email.as_deref())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    if let Some(providers) = &update.providers {
        sqlx::query("DELETE FROM user_providers WHERE user_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        insert_providers(&mut *tx, id, providers).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Get all users, oldest first
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(
        "SELECT id, name, username, email, created_at FROM users ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in &rows {
        users.push(hydrate(pool, row).await?);
    }

    Ok(users)
}

async fn insert_providers(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    providers: &[ProviderLink],
) -> Result<()> {
    for (position, link) in providers.iter().enumerate() {
        let metadata = serde_json::to_string(&link.metadata)?;

        sqlx::query(
            "INSERT INTO user_providers (user_id, position, provider, identifier, metadata)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id.as_str())
        .bind(i64::try_from(position).unwrap_or(i64::MAX))
        .bind(&link.name)
        .bind(&link.identifier)
        .bind(metadata)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn load_providers(pool: &SqlitePool, user_id: &str) -> Result<Vec<ProviderLink>> {
    let rows = sqlx::query(
        "SELECT provider, identifier, metadata FROM user_providers
         WHERE user_id = ? ORDER BY position",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<ProviderLink> {
            let metadata: BTreeMap<String, String> =
                serde_json::from_str(&row.try_get::<String, _>("metadata")?)?;

            Ok(ProviderLink {
                name: row.try_get("provider")?,
                identifier: row.try_get("identifier")?,
                metadata,
            })
        })
        .collect()
}

async fn hydrate(pool: &SqlitePool, row: &SqliteRow) -> Result<User> {
    let id: String = row.try_get("id")?;
    let created_at: i64 = row.try_get("created_at")?;
    let providers = load_providers(pool, &id).await?;

    Ok(User {
        id: UserId::new(id),
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        providers,
        created_at: DateTime::<Utc>::from_timestamp(created_at, 0).ok_or_else(|| {
            StorageError::SerializationError(format!("invalid timestamp: {created_at}"))
        })?,
    })
}
