//! Append-only operation log
//!
//! One JSON object per line: `{timestamp, level, userId, action, details}`.
//! Recording never fails the calling request; write errors only produce a
//! `tracing` warning. This log is the operator-facing record of database
//! operations and is separate from the service's diagnostic tracing output.

use crate::error::{AdminError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub user_id: String,
    pub action: String,
    pub details: JsonValue,
}

pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, level: AuditLevel, action: &str, details: JsonValue, user_id: &str) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            level,
            user_id: user_id.to_string(),
            action: action.to_string(),
            details,
        };

        match level {
            AuditLevel::Error => error!(user = %entry.user_id, details = %entry.details, "{}", action),
            AuditLevel::Warning => warn!(user = %entry.user_id, details = %entry.details, "{}", action),
            _ => info!(user = %entry.user_id, details = %entry.details, "{}", action),
        }

        if let Err(e) = self.append(&entry).await {
            warn!("Failed to write audit log {:?}: {}", self.path, e);
        }
    }

    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        // Whole lines only: writers queue here instead of interleaving
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// The last `limit` well-formed entries, newest first
    pub async fn read_recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AdminError::Internal(format!(
                    "Failed to read audit log {:?}: {}",
                    self.path, e
                )))
            }
        };

        let entries: Vec<AuditEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(entries.into_iter().rev().take(limit).collect())
    }

    pub async fn database_created(&self, database: &str, user_id: &str, failure: Option<&AdminError>) {
        match failure {
            None => self.record(
                AuditLevel::Success,
                "DATABASE_CREATED",
                json!({ "database": database }),
                user_id,
            )
            .await,
            Some(e) => self.record(
                AuditLevel::Error,
                "DATABASE_CREATION_FAILED",
                json!({ "database": database, "error": e.to_string() }),
                user_id,
            )
            .await,
        }
    }

    pub async fn database_accessed(&self, database: &str, user_id: &str, failure: Option<&AdminError>) {
        match failure {
            None => self.record(
                AuditLevel::Info,
                "DATABASE_ACCESSED",
                json!({ "database": database }),
                user_id,
            )
            .await,
            Some(e) => self.record(
                AuditLevel::Error,
                "DATABASE_ACCESS_FAILED",
                json!({ "database": database, "error": e.to_string() }),
                user_id,
            )
            .await,
        }
    }

    /// `details` is merged into the success entry (table count, timestamp)
    pub async fn database_migrated(
        &self,
        source: &str,
        target: &str,
        user_id: &str,
        outcome: std::result::Result<JsonValue, &AdminError>,
    ) {
        match outcome {
            Ok(details) => {
                let mut entry = json!({ "source": source, "target": target });
                if let (Some(map), JsonValue::Object(extra)) = (entry.as_object_mut(), details) {
                    map.extend(extra);
                }
                self.record(AuditLevel::Success, "DATABASE_MIGRATED", entry, user_id)
                    .await;
            }
            Err(e) => self.record(
                AuditLevel::Error,
                "DATABASE_MIGRATION_FAILED",
                json!({ "source": source, "target": target, "error": e.to_string() }),
                user_id,
            )
            .await,
        }
    }

    pub async fn database_imported(
        &self,
        source: &str,
        target: &str,
        user_id: &str,
        outcome: std::result::Result<usize, &AdminError>,
    ) {
        match outcome {
            Ok(tables) => self.record(
                AuditLevel::Success,
                "DATABASE_IMPORTED",
                json!({ "source": source, "target": target, "tablesCount": tables }),
                user_id,
            )
            .await,
            Err(e) => self.record(
                AuditLevel::Error,
                "DATABASE_IMPORT_FAILED",
                json!({ "source": source, "target": target, "error": e.to_string() }),
                user_id,
            )
            .await,
        }
    }

    /// `USER_<OP>` on success, `USER_<OP>_FAILED` with the error otherwise
    pub async fn user_operation(
        &self,
        operation: &str,
        details: JsonValue,
        user_id: &str,
        failure: Option<&AdminError>,
    ) {
        let operation = operation.to_uppercase();
        match failure {
            None => {
                let action = format!("USER_{}", operation);
                self.record(AuditLevel::Info, &action, details, user_id).await
            }
            Some(e) => {
                let action = format!("USER_{}_FAILED", operation);
                let mut entry = json!({ "error": e.to_string() });
                if let (Some(map), JsonValue::Object(extra)) = (entry.as_object_mut(), details) {
                    map.extend(extra);
                }
                self.record(AuditLevel::Error, &action, entry, user_id).await
            }
        }
    }
}
