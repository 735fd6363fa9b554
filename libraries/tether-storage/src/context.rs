use crate::users;
use async_trait::async_trait;
use tether_core::{error::Result, traits::UserStore, types::*, CoreError};
use sqlx::SqlitePool;

/// `UserStore` backed by `SQLite`
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect, run migrations, and wrap the pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = crate::create_pool(database_url)
            .await
            .map_err(crate::StorageError::from)?;
        crate::run_migrations(&pool)
            .await
            .map_err(|e| CoreError::storage(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(users::get_by_id(&self.pool, id).await?)
    }

    async fn find_by_provider(&self, provider: &str, identifier: &str) -> Result<Option<User>> {
        Ok(users::find_by_provider(&self.pool, provider, identifier).await?)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = User::new(new_user);
        users::create(&self.pool, &user).await?;
        Ok(user)
    }

    async fn update_user(&self, id: &UserId, update: UserUpdate) -> Result<User> {
        users::update(&self.pool, id, &update)
            .await
            .map_err(|e| match e {
                crate::StorageError::NotFound { .. } => CoreError::UserNotFound(id.clone()),
                other => other.into(),
            })?;

        users::get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(users::get_all(&self.pool).await?)
    }
}
