//! PostgreSQL implementation of PaymentSessionRepository.
//!
//! Two invariants live in the schema rather than application code:
//!
//! - a partial unique index on `booking_id` over non-terminal rows makes the
//!   database the arbiter for one active session per booking
//! - `finalize` is a conditional UPDATE whose `status IN (...)` predicate is
//!   the compare-and-set that lets exactly one concurrent callback win
//!
//! The terminal transition and the booking mirror update share one
//! transaction, so a session never reads `completed` while its booking
//! still reads `pending`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    BookingId, Currency, DomainError, ErrorCode, GatewayTransactionId, MinorUnits,
    PaymentSessionId, Timestamp,
};
use crate::domain::payment::{MacVerification, PaymentSession, PaymentStatus};
use crate::ports::{
    FinalizeOutcome, InsertResult, PaymentSessionRepository, SessionFinalization,
};

/// PostgreSQL implementation of the PaymentSessionRepository port.
pub struct PostgresPaymentSessionRepository {
    pool: PgPool,
}

impl PostgresPaymentSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment session.
#[derive(Debug, sqlx::FromRow)]
struct PaymentSessionRow {
    id: Uuid,
    booking_id: Uuid,
    gateway_transaction_id: String,
    amount_minor: i64,
    currency: String,
    status: String,
    gateway_response_code: Option<String>,
    authorization_code: Option<String>,
    mac_verification: String,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentSessionRow> for PaymentSession {
    type Error = DomainError;

    fn try_from(row: PaymentSessionRow) -> Result<Self, Self::Error> {
        Ok(PaymentSession {
            id: PaymentSessionId::from_uuid(row.id),
            booking_id: BookingId::from_uuid(row.booking_id),
            gateway_transaction_id: GatewayTransactionId::new(row.gateway_transaction_id)
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid gateway_transaction_id: {}", e),
                    )
                })?,
            amount: MinorUnits::new(row.amount_minor),
            currency: Currency::new(&row.currency).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
            })?,
            status: PaymentStatus::parse(&row.status)?,
            gateway_response_code: row.gateway_response_code,
            authorization_code: row.authorization_code,
            mac_verification: MacVerification::parse(&row.mac_verification)?,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            error_message: row.error_message,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SESSION_COLUMNS: &str = r#"
    id, booking_id, gateway_transaction_id, amount_minor, currency, status,
    gateway_response_code, authorization_code, mac_verification,
    completed_at, error_message, created_at, updated_at
"#;

#[async_trait]
impl PaymentSessionRepository for PostgresPaymentSessionRepository {
    async fn insert(&self, session: &PaymentSession) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                id, booking_id, gateway_transaction_id, amount_minor, currency,
                status, mac_verification, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.booking_id.as_uuid())
        .bind(session.gateway_transaction_id.as_str())
        .bind(session.amount.value())
        .bind(session.currency.as_str())
        .bind(session.status.as_str())
        .bind(session.mac_verification.as_str())
        .bind(session.created_at.as_datetime())
        .bind(session.updated_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertResult::Inserted),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("payment_sessions_one_active_per_booking") =>
            {
                Ok(InsertResult::Conflict)
            }
            Err(e) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert payment session: {}", e),
            )),
        }
    }

    async fn find_active_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row: Option<PaymentSessionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM payment_sessions
            WHERE booking_id = $1 AND status IN ('initialized', 'pending')
            "#
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find active session: {}", e),
            )
        })?;

        row.map(PaymentSession::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &GatewayTransactionId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row: Option<PaymentSessionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM payment_sessions
            WHERE gateway_transaction_id = $1
            "#
        ))
        .bind(transaction_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find session: {}", e),
            )
        })?;

        row.map(PaymentSession::try_from).transpose()
    }

    async fn mark_pending(
        &self,
        transaction_id: &GatewayTransactionId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_sessions
            SET status = 'pending', updated_at = $2
            WHERE gateway_transaction_id = $1 AND status = 'initialized'
            "#,
        )
        .bind(transaction_id.as_str())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark session pending: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                "No initialized session for transaction",
            ));
        }

        Ok(())
    }

    async fn finalize(
        &self,
        finalization: &SessionFinalization,
    ) -> Result<FinalizeOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;

        // CAS: only a non-terminal row is updated.
        let booking_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE payment_sessions
            SET status = $2,
                gateway_response_code = $3,
                authorization_code = $4,
                mac_verification = $5,
                completed_at = $6,
                error_message = $7,
                updated_at = now()
            WHERE gateway_transaction_id = $1
              AND status IN ('initialized', 'pending')
            RETURNING booking_id
            "#,
        )
        .bind(finalization.transaction_id.as_str())
        .bind(finalization.status.as_str())
        .bind(&finalization.gateway_response_code)
        .bind(&finalization.authorization_code)
        .bind(finalization.mac_verification.as_str())
        .bind(finalization.completed_at.map(|t| *t.as_datetime()))
        .bind(&finalization.error_message)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to finalize session: {}", e),
            )
        })?;

        let Some((booking_id,)) = booking_id else {
            tx.rollback().await.ok();

            // Distinguish an already-terminal row from a missing one.
            let exists: Option<(i32,)> = sqlx::query_as(
                "SELECT 1 FROM payment_sessions WHERE gateway_transaction_id = $1",
            )
            .bind(finalization.transaction_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to check session: {}", e),
                )
            })?;

            return if exists.is_some() {
                Ok(FinalizeOutcome::AlreadyTerminal)
            } else {
                Err(DomainError::new(
                    ErrorCode::SessionNotFound,
                    "No session for transaction",
                ))
            };
        };

        sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = $2,
                payment_transaction_id = $3,
                payment_completed_at = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .bind(finalization.booking_mirror.payment_status.as_str())
        .bind(&finalization.booking_mirror.gateway_transaction_id)
        .bind(
            finalization
                .booking_mirror
                .payment_completed_at
                .map(|t| *t.as_datetime()),
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mirror payment onto booking: {}", e),
            )
        })?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit finalization: {}", e),
            )
        })?;

        Ok(FinalizeOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> PaymentSessionRow {
        PaymentSessionRow {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            gateway_transaction_id: "PAY-1700000000000-ab12cd34".to_string(),
            amount_minor: 50000,
            currency: "EUR".to_string(),
            status: "pending".to_string(),
            gateway_response_code: None,
            authorization_code: None,
            mac_verification: "unverified".to_string(),
            completed_at: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_session() {
        let session = PaymentSession::try_from(row()).unwrap();
        assert_eq!(session.status, PaymentStatus::Pending);
        assert_eq!(session.amount, MinorUnits::new(50000));
        assert_eq!(session.mac_verification, MacVerification::Unverified);
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "refunded".to_string();
        assert!(PaymentSession::try_from(bad).is_err());
    }

    #[test]
    fn row_with_malformed_currency_is_rejected() {
        let mut bad = row();
        bad.currency = "EURO".to_string();
        assert!(PaymentSession::try_from(bad).is_err());
    }
}
