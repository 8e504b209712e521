//! Audit Log Service
//!
//! Tamper-evident audit logging with hash chain verification. Staff
//! actions on the menu and on orders are recorded for later review.
//! Each entry hashes over its own content plus the previous entry's
//! hash, so editing or removing a row breaks every hash after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::net::IpAddr;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::RequestContext;

/// Hash the first entry links back to (the empty chain)
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Audit log entry for database storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub sequence_number: i64,
    pub api_key_id: Option<Uuid>,
    pub request_user_id: Option<Uuid>,
    pub correlation_id: Option<Uuid>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub changed_fields: Option<Vec<String>>,
    pub client_ip: Option<IpAddr>,
    pub previous_hash: String,
    pub current_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    MenuItemCreated,
    MenuItemDeleted,
    OrderStatusChanged,
    PermissionDenied,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MenuItemCreated => "menu_item.created",
            AuditAction::MenuItemDeleted => "menu_item.deleted",
            AuditAction::OrderStatusChanged => "order.status_changed",
            AuditAction::PermissionDenied => "auth.permission_denied",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder for creating audit log entries
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    action: String,
    resource_type: Option<String>,
    resource_id: Option<Uuid>,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
    changed_fields: Option<Vec<String>>,
}

impl AuditLogBuilder {
    /// Create a new audit log builder
    pub fn new(action: AuditAction) -> Self {
        Self {
            action: action.as_str().to_string(),
            resource_type: None,
            resource_id: None,
            before_state: None,
            after_state: None,
            changed_fields: None,
        }
    }

    /// Create with custom action string
    pub fn custom(action: &str) -> Self {
        Self {
            action: action.to_string(),
            resource_type: None,
            resource_id: None,
            before_state: None,
            after_state: None,
            changed_fields: None,
        }
    }

    /// Set the resource type
    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    /// Set the resource ID
    pub fn resource_id(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Set the before state
    pub fn before_state<T: Serialize>(mut self, state: &T) -> Self {
        self.before_state = serde_json::to_value(state).ok();
        self
    }

    /// Set the after state
    pub fn after_state<T: Serialize>(mut self, state: &T) -> Self {
        self.after_state = serde_json::to_value(state).ok();
        self
    }

    /// Set the changed fields
    pub fn changed_fields(mut self, fields: Vec<String>) -> Self {
        self.changed_fields = Some(fields);
        self
    }
}

/// Audit Log Service
#[derive(Debug, Clone)]
pub struct AuditLogService {
    pool: PgPool,
}

impl AuditLogService {
    /// Create a new AuditLogService
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write an audit log entry, linking it into the hash chain.
    ///
    /// Concurrent appends can collide on the sequence number; the losing
    /// writer re-reads the chain head and tries again.
    pub async fn log(
        &self,
        builder: AuditLogBuilder,
        context: &RequestContext,
    ) -> Result<Uuid, AuditLogError> {
        const MAX_RETRIES: u32 = 3;

        for attempt in 0..MAX_RETRIES {
            match self.try_append(&builder, context).await {
                Ok(id) => {
                    tracing::debug!(
                        audit_id = %id,
                        action = %builder.action,
                        "Audit log entry created"
                    );
                    return Ok(id);
                }
                Err(AuditLogError::Database(sqlx::Error::Database(ref db_err)))
                    if db_err.is_unique_violation() && attempt < MAX_RETRIES - 1 =>
                {
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;
                    tracing::warn!(
                        "Audit chain contention, retrying (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AuditLogError::ChainContention)
    }

    /// Append one entry behind the current chain head (single attempt)
    async fn try_append(
        &self,
        builder: &AuditLogBuilder,
        context: &RequestContext,
    ) -> Result<Uuid, AuditLogError> {
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        let head: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT sequence_number, current_hash
            FROM audit_logs
            ORDER BY sequence_number DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let (sequence_number, previous_hash) = match head {
            Some((seq, hash)) => (seq + 1, hash),
            None => (1, GENESIS_HASH.to_string()),
        };

        let current_hash = chain_hash(
            id,
            sequence_number,
            &builder.action,
            context.request_user_id,
            builder.before_state.as_ref(),
            builder.after_state.as_ref(),
            &previous_hash,
        );

        // The unique index on sequence_number rejects a concurrent append
        // that read the same head
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, sequence_number, api_key_id, request_user_id, correlation_id,
                action, resource_type, resource_id,
                before_state, after_state, changed_fields, client_ip,
                previous_hash, current_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(id)
        .bind(sequence_number)
        .bind(context.api_key_id)
        .bind(context.request_user_id)
        .bind(context.correlation_id)
        .bind(&builder.action)
        .bind(&builder.resource_type)
        .bind(builder.resource_id)
        .bind(&builder.before_state)
        .bind(&builder.after_state)
        .bind(&builder.changed_fields)
        .bind(context.client_ip_string())
        .bind(&previous_hash)
        .bind(&current_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(id)
    }

    /// Verify the integrity of the audit log hash chain
    pub async fn verify_hash_chain(
        &self,
        limit: Option<i64>,
    ) -> Result<ChainVerificationResult, AuditLogError> {
        let limit = limit.unwrap_or(1000);

        let entries: Vec<(Uuid, i64, String, String, String, Option<Uuid>, Option<serde_json::Value>, Option<serde_json::Value>)> = sqlx::query_as(
            r#"
            SELECT id, sequence_number, action, previous_hash, current_hash,
                   request_user_id, before_state, after_state
            FROM audit_logs
            ORDER BY sequence_number ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if entries.is_empty() {
            return Ok(ChainVerificationResult {
                is_valid: true,
                entries_checked: 0,
                first_invalid_entry: None,
                expected_hash: None,
                actual_hash: None,
            });
        }

        let mut previous_hash = GENESIS_HASH.to_string();

        for (id, seq, action, prev_hash, current_hash, req_user_id, before_state, after_state) in
            &entries
        {
            // Verify chain linkage
            if prev_hash != &previous_hash {
                return Ok(ChainVerificationResult {
                    is_valid: false,
                    entries_checked: *seq as u64,
                    first_invalid_entry: Some(*id),
                    expected_hash: Some(previous_hash),
                    actual_hash: Some(prev_hash.clone()),
                });
            }

            // Recalculate hash
            let calculated_hash = chain_hash(
                *id,
                *seq,
                action,
                *req_user_id,
                before_state.as_ref(),
                after_state.as_ref(),
                prev_hash,
            );

            if &calculated_hash != current_hash {
                return Ok(ChainVerificationResult {
                    is_valid: false,
                    entries_checked: *seq as u64,
                    first_invalid_entry: Some(*id),
                    expected_hash: Some(calculated_hash),
                    actual_hash: Some(current_hash.clone()),
                });
            }

            previous_hash = current_hash.clone();
        }

        Ok(ChainVerificationResult {
            is_valid: true,
            entries_checked: entries.len() as u64,
            first_invalid_entry: None,
            expected_hash: None,
            actual_hash: None,
        })
    }

    /// Get recent audit logs
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditLogError> {
        let entries: Vec<AuditLogRow> = sqlx::query_as(
            r#"
            SELECT id, sequence_number, api_key_id, request_user_id, correlation_id,
                   action, resource_type, resource_id,
                   before_state, after_state, changed_fields,
                   client_ip::text, previous_hash, current_hash, created_at
            FROM audit_logs
            ORDER BY sequence_number DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries.into_iter().map(map_audit_entry).collect())
    }

    /// Get audit logs affecting a specific customer
    pub async fn get_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AuditLogError> {
        let entries: Vec<AuditLogRow> = sqlx::query_as(
            r#"
            SELECT id, sequence_number, api_key_id, request_user_id, correlation_id,
                   action, resource_type, resource_id,
                   before_state, after_state, changed_fields,
                   client_ip::text, previous_hash, current_hash, created_at
            FROM audit_logs
            WHERE request_user_id = $1
            ORDER BY sequence_number DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries.into_iter().map(map_audit_entry).collect())
    }
}

type AuditLogRow = (
    Uuid, i64, Option<Uuid>, Option<Uuid>, Option<Uuid>,
    String, Option<String>, Option<Uuid>,
    Option<serde_json::Value>, Option<serde_json::Value>, Option<Vec<String>>,
    Option<String>, String, String, DateTime<Utc>,
);

fn map_audit_entry(row: AuditLogRow) -> AuditLogEntry {
    let (
        id, sequence_number, api_key_id, request_user_id, correlation_id,
        action, resource_type, resource_id,
        before_state, after_state, changed_fields,
        client_ip, previous_hash, current_hash, created_at,
    ) = row;

    AuditLogEntry {
        id,
        sequence_number,
        api_key_id,
        request_user_id,
        correlation_id,
        action,
        resource_type,
        resource_id,
        before_state,
        after_state,
        changed_fields,
        client_ip: client_ip.and_then(|s| s.parse().ok()),
        previous_hash,
        current_hash,
        created_at,
    }
}

/// Result of hash chain verification
#[derive(Debug, Clone, Serialize)]
pub struct ChainVerificationResult {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

/// Hash covering one entry's chained fields.
///
/// Both the writer and the verifier call this, so the two sides cannot
/// drift. Absent fields hash as empty strings; JSON states hash in their
/// compact serialization.
fn chain_hash(
    id: Uuid,
    sequence_number: i64,
    action: &str,
    request_user_id: Option<Uuid>,
    before_state: Option<&serde_json::Value>,
    after_state: Option<&serde_json::Value>,
    previous_hash: &str,
) -> String {
    let input = format!(
        "{}{}{}{}{}{}{}",
        id,
        sequence_number,
        action,
        request_user_id.map(|u| u.to_string()).unwrap_or_default(),
        before_state.map(|v| v.to_string()).unwrap_or_default(),
        after_state.map(|v| v.to_string()).unwrap_or_default(),
        previous_hash
    );
    sha256_hex(&input)
}

/// Calculate SHA-256 hash and return as hex string
fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Audit log errors
#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit chain contention: concurrent appends exhausted retries")]
    ChainContention,
}
