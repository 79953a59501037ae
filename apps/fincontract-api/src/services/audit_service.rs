use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use fincontract_shared::audit::AuditEntry;
use redis::aio::ConnectionManager;
use tracing::info;
use uuid::Uuid;

pub const AUDIT_LOG_KEY: &str = "fincontract_audit_log";
pub const AUDIT_LOG_CAPACITY: usize = 100;

/// Capped, newest-first log of user actions.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Newest first.
    async fn recent(&self) -> Result<Vec<AuditEntry>>;
}

#[derive(Clone)]
pub struct RedisAuditLog {
    conn: ConnectionManager,
}

impl RedisAuditLog {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        info!("Redis audit log connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl AuditLog for RedisAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(AUDIT_LOG_KEY)
            .arg(payload)
            .ignore()
            .cmd("LTRIM")
            .arg(AUDIT_LOG_KEY)
            .arg(0)
            .arg(AUDIT_LOG_CAPACITY as isize - 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("Redis audit append failed")?;
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<AuditEntry>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(AUDIT_LOG_KEY)
            .arg(0)
            .arg(AUDIT_LOG_CAPACITY as isize - 1)
            .query_async(&mut conn)
            .await
            .context("Redis LRANGE failed")?;

        Ok(raw
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping malformed audit entry: {}", e);
                    None
                }
            })
            .collect())
    }
}

/// Used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log lock poisoned"))?;
        entries.push_front(entry.clone());
        entries.truncate(AUDIT_LOG_CAPACITY);
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<AuditEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log lock poisoned"))?;
        Ok(entries.iter().cloned().collect())
    }
}

/// Appends an entry, logging instead of failing.
pub async fn record(log: &dyn AuditLog, user_id: Uuid, action: &str, detail: impl Into<String>) {
    let entry = AuditEntry {
        timestamp: Utc::now(),
        user_id: user_id.to_string(),
        action: action.to_string(),
        detail: detail.into(),
    };
    if let Err(e) = log.append(&entry).await {
        tracing::warn!("Failed to write audit entry '{}' for {}: {:#}", action, user_id, e);
    }
}

/// Entries belonging to `user_id`, newest first.
pub async fn entries_for(log: &dyn AuditLog, user_id: Uuid) -> Result<Vec<AuditEntry>> {
    let user = user_id.to_string();
    Ok(log
        .recent()
        .await?
        .into_iter()
        .filter(|e| e.user_id == user)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_log_keeps_newest_entries() {
        let log = MemoryAuditLog::new();
        let user = Uuid::from_u128(1);
        for i in 0..(AUDIT_LOG_CAPACITY + 25) {
            record(&log, user, "upload", format!("contract {}", i)).await;
        }

        let entries = log.recent().await.unwrap();
        assert_eq!(entries.len(), AUDIT_LOG_CAPACITY);
        assert_eq!(entries[0].detail, format!("contract {}", AUDIT_LOG_CAPACITY + 24));
        assert_eq!(entries.last().unwrap().detail, "contract 25");
    }

    #[tokio::test]
    async fn entries_are_filtered_by_user() {
        let log = MemoryAuditLog::new();
        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);
        record(&log, alice, "redeem", "WELCOME30").await;
        record(&log, bob, "upload", "lease").await;
        record(&log, alice, "checkout", "premium").await;

        let mine = entries_for(&log, alice).await.unwrap();
        let actions: Vec<&str> = mine.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["checkout", "redeem"]);
    }
}
