//! Persisted user settings.

use crate::error::DatabaseError;
use crate::types::{AutoDelete, AutoDownload, Settings};
use crate::{Error, Result};

use super::Database;

const AUTO_DELETE_KEY: &str = "auto_delete_seconds";
const AUTO_DOWNLOAD_KEY: &str = "auto_download";

impl Database {
    /// Store initial settings without overwriting values already present
    pub async fn seed_settings(&self, defaults: &Settings) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        for (key, value) in [
            (AUTO_DELETE_KEY, defaults.auto_delete.to_seconds()),
            (AUTO_DOWNLOAD_KEY, defaults.auto_download.to_code()),
        ] {
            sqlx::query("INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?, ?, ?)")
                .bind(key)
                .bind(value)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to seed setting {}: {}",
                        key, e
                    )))
                })?;
        }
        Ok(())
    }

    /// Current automatic soft-deletion policy
    pub async fn auto_delete(&self) -> Result<AutoDelete> {
        Ok(self
            .get_setting(AUTO_DELETE_KEY)
            .await?
            .map(AutoDelete::from_seconds)
            .unwrap_or_default())
    }

    /// Change the automatic soft-deletion policy
    pub async fn set_auto_delete(&self, policy: AutoDelete) -> Result<()> {
        self.set_setting(AUTO_DELETE_KEY, policy.to_seconds()).await
    }

    /// Current automatic download policy
    pub async fn auto_download(&self) -> Result<AutoDownload> {
        Ok(self
            .get_setting(AUTO_DOWNLOAD_KEY)
            .await?
            .map(AutoDownload::from_code)
            .unwrap_or_default())
    }

    /// Change the automatic download policy
    pub async fn set_auto_download(&self, policy: AutoDownload) -> Result<()> {
        self.set_setting(AUTO_DOWNLOAD_KEY, policy.to_code()).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read setting {}: {}",
                    key, e
                )))
            })
    }

    async fn set_setting(&self, key: &str, value: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = ?, updated_at = ?
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write setting {}: {}",
                key, e
            )))
        })?;

        Ok(())
    }
}
