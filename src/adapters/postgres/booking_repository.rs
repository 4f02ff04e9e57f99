//! PostgreSQL implementation of BookingRepository.
//!
//! The payment core only reads booking existence and writes the denormalized
//! payment columns; everything else about a booking belongs to the wider
//! rental system.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{BookingId, DomainError, ErrorCode};
use crate::ports::BookingRepository;

/// PostgreSQL implementation of the BookingRepository port.
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn exists(&self, booking_id: &BookingId) -> Result<bool, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM bookings WHERE id = $1")
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to check booking: {}", e),
                )
            })?;

        Ok(row.is_some())
    }

    async fn apply_payment_mirror(
        &self,
        booking_id: &BookingId,
        mirror: &BookingPaymentMirror,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = $2,
                payment_transaction_id = $3,
                payment_completed_at = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking_id.as_uuid())
        .bind(mirror.payment_status.as_str())
        .bind(&mirror.gateway_transaction_id)
        .bind(mirror.payment_completed_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update booking payment state: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::BookingNotFound,
                format!("Booking {} not found", booking_id),
            ));
        }

        Ok(())
    }
}
