//! # App Settings
//!
//! The single settings row and a read-through cache in front of it.
//!
//! ```text
//! SettingsCache::get(false) ── cached? ──► return copy
//!        │ no (or force_refresh)
//!        ▼
//! SettingsRepository::load()
//!        ├── Ok(Some(s))  → cache s
//!        ├── Ok(None)     → cache defaults
//!        └── Err(e)       → warn!, cache defaults
//!
//! SettingsCache::update(patch) → load, merge, save, invalidate
//! ```

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use glow_core::{AppSettings, SettingsPatch};

use crate::error::DbResult;
use crate::services::Clock;

/// Reads and writes the `app_settings` row as a JSON payload.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SettingsRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRepository")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        SettingsRepository { pool, clock }
    }

    pub async fn load(&self) -> DbResult<Option<AppSettings>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM app_settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, settings: &AppSettings) -> DbResult<()> {
        let payload = serde_json::to_string(settings)?;
        sqlx::query(
            r#"
            INSERT INTO app_settings (id, payload, updated_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(payload)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Process-wide settings cache. Create one at startup and share it.
#[derive(Debug)]
pub struct SettingsCache {
    repo: SettingsRepository,
    cached: RwLock<Option<AppSettings>>,
}

impl SettingsCache {
    pub fn new(repo: SettingsRepository) -> Self {
        SettingsCache {
            repo,
            cached: RwLock::new(None),
        }
    }

    /// Current settings. Never fails: store problems fall back to defaults.
    pub async fn get(&self, force_refresh: bool) -> AppSettings {
        if !force_refresh {
            if let Some(settings) = self.cached.read().await.as_ref() {
                return settings.clone();
            }
        }

        let settings = match self.repo.load().await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("No stored settings, using defaults");
                AppSettings::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                AppSettings::default()
            }
        };

        *self.cached.write().await = Some(settings.clone());
        settings
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// Merges `patch` into the stored settings and drops the cached copy.
    pub async fn update(&self, patch: SettingsPatch) -> DbResult<AppSettings> {
        let mut settings = self.repo.load().await?.unwrap_or_default();
        settings.apply(patch);
        self.repo.save(&settings).await?;
        self.invalidate().await;
        Ok(settings)
    }
}
