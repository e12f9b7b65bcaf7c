//! # User Repository
//!
//! User profiles and the default [`IdentityResolver`] used to stamp
//! salesman and recorder names onto ledger records.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use glow_core::validation::validate_required;
use glow_core::{AppUser, Role};

use crate::error::DbResult;
use crate::services::IdentityResolver;

const USER_COLUMNS: &str = "uid, email, name, role, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts or replaces a profile keyed by `uid`. `created_at` is kept
    /// from the first insert.
    pub async fn upsert(&self, user: &AppUser) -> DbResult<()> {
        validate_required("uid", &user.uid)?;
        debug!(uid = %user.uid, role = ?user.role, "Upserting user");

        sqlx::query(
            r#"
            INSERT INTO users (uid, email, name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(uid) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                role = excluded.role
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(user.name.trim())
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, uid: &str) -> DbResult<Option<AppUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1");
        let user = sqlx::query_as::<_, AppUser>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self) -> DbResult<Vec<AppUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name COLLATE NOCASE");
        let users = sqlx::query_as::<_, AppUser>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Users holding `role`, e.g. every salesman for the assignment picker.
    pub async fn list_by_role(&self, role: Role) -> DbResult<Vec<AppUser>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY name COLLATE NOCASE");
        let users = sqlx::query_as::<_, AppUser>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

#[async_trait]
impl IdentityResolver for UserRepository {
    async fn resolve_user_name(&self, uid: &str) -> DbResult<Option<String>> {
        Ok(self.get(uid).await?.and_then(|user| user.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn user(uid: &str, name: &str, email: Option<&str>, role: Option<Role>) -> AppUser {
        AppUser {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            name: name.to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_resolve_prefers_name_then_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        users
            .upsert(&user("U1", "Ali", Some("ali@glow.test"), Some(Role::Salesman)))
            .await
            .unwrap();
        users
            .upsert(&user("U2", "", Some("sara@glow.test"), None))
            .await
            .unwrap();
        users.upsert(&user("U3", "", None, None)).await.unwrap();

        assert_eq!(users.resolve_user_name("U1").await.unwrap().as_deref(), Some("Ali"));
        assert_eq!(
            users.resolve_user_name("U2").await.unwrap().as_deref(),
            Some("sara@glow.test")
        );
        assert_eq!(users.resolve_user_name("U3").await.unwrap(), None);
        assert_eq!(users.resolve_user_name("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_updates_role() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        users.upsert(&user("U1", "Ali", None, None)).await.unwrap();
        users
            .upsert(&user("U1", "Ali", None, Some(Role::Salesman)))
            .await
            .unwrap();
        users
            .upsert(&user("U2", "Bano", None, Some(Role::Worker)))
            .await
            .unwrap();

        let salesmen = users.list_by_role(Role::Salesman).await.unwrap();
        assert_eq!(salesmen.len(), 1);
        assert_eq!(salesmen[0].uid, "U1");
        assert_eq!(users.list().await.unwrap().len(), 2);
    }
}
