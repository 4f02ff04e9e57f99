//! PostgreSQL implementation of the audit log port.
//!
//! Insert-only table; there is deliberately no update or delete path.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AuditLog, AuditLogEntry};

/// PostgreSQL implementation of the AuditLog port.
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_audit_log (
                booking_id, payment_session_id, action, amount_minor, currency,
                raw_gateway_payload, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.booking_id.as_uuid())
        .bind(entry.payment_session_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.amount.value())
        .bind(entry.currency.as_str())
        .bind(&entry.raw_gateway_payload)
        .bind(entry.recorded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to append audit entry: {}", e),
            )
        })?;

        Ok(())
    }
}
