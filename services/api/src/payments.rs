use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use tutorlink_common::{AppError, PaymentStatus};
use tutorlink_database::{DbPool, Payment};

use crate::config::FeeConfig;

/// Platform fees taken out of a session amount, rounded to the
/// currency's minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFees {
    pub commission_fee: Decimal,
    pub admission_fee: Decimal,
}

pub fn calculate_fees(session_amount: Decimal, config: &FeeConfig) -> SessionFees {
    let round = |amount: Decimal| {
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };
    SessionFees {
        commission_fee: round(session_amount * config.commission_rate),
        admission_fee: round(session_amount * config.admission_rate),
    }
}

/// Bookkeeping ledger for session payments. One payment record per booking,
/// driven entirely by the booking lifecycle: created alongside the booking,
/// completed when the tutor confirms.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: DbPool,
    fees: FeeConfig,
}

impl PaymentService {
    pub fn new(db_pool: DbPool, fees: FeeConfig) -> Self {
        Self { db_pool, fees }
    }

    pub async fn create_payment(
        &self,
        booking_id: Uuid,
        student_id: Uuid,
        tutor_id: Uuid,
        session_amount: Decimal,
        currency: &str,
    ) -> Result<Payment, AppError> {
        let fees = calculate_fees(session_amount, &self.fees);

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                payment_id, booking_id, student_id, tutor_id,
                amount, currency, commission_fee, admission_fee, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(student_id)
        .bind(tutor_id)
        .bind(session_amount)
        .bind(currency)
        .bind(fees.commission_fee)
        .bind(fees.admission_fee)
        .bind(PaymentStatus::Created.as_str())
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(
            "Created payment {} for booking {} - commission: {}, admission: {}",
            payment.payment_id,
            booking_id,
            payment.commission_fee,
            payment.admission_fee
        );

        Ok(payment)
    }

    pub async fn complete_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2, completed_at = $3
            WHERE payment_id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(PaymentStatus::Completed.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        tracing::info!("Completed payment {}", payment.payment_id);
        Ok(payment)
    }

    pub async fn get_payment_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rates() -> FeeConfig {
        FeeConfig {
            commission_rate: Decimal::from_str("0.15").unwrap(),
            admission_rate: Decimal::from_str("0.05").unwrap(),
        }
    }

    #[test]
    fn fees_are_proportional_to_the_session_amount() {
        let fees = calculate_fees(Decimal::from(100), &rates());
        assert_eq!(fees.commission_fee, Decimal::from_str("15.00").unwrap());
        assert_eq!(fees.admission_fee, Decimal::from_str("5.00").unwrap());
    }

    #[test]
    fn fees_round_to_two_decimal_places() {
        let fees = calculate_fees(Decimal::from_str("33.33").unwrap(), &rates());
        assert_eq!(fees.commission_fee, Decimal::from_str("5.00").unwrap());
        assert_eq!(fees.admission_fee, Decimal::from_str("1.67").unwrap());
    }
}
