//! Server-side price validation.
//!
//! The total a client submits is display data, nothing more. The validator
//! recomputes the booking total from the authoritative rate table and rule
//! set, entirely in integer minor units, and rejects requests whose
//! submitted total drifts beyond a fixed tolerance.

use crate::domain::foundation::MinorUnits;
use crate::domain::payment::PaymentError;

use super::quote::{BookingDetails, RateTable};

/// Permitted difference between submitted and computed totals, in minor
/// units. Covers rounding differences in the client's display formatting.
pub const AMOUNT_TOLERANCE_MINOR: i64 = 100;

/// Recomputes booking totals independently of any client-submitted amount.
///
/// Deterministic and side-effect-free: two calls with identical inputs
/// return identical output, so a later audit re-validation reproduces the
/// original number.
#[derive(Debug, Clone, Default)]
pub struct PriceValidator {
    rates: RateTable,
}

impl PriceValidator {
    /// Creates a validator over the given rate table.
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    /// Computes the authoritative total in minor units.
    ///
    /// `base daily rate x days`, plus deposit-waiver and insurance
    /// surcharges per day, plus itemized extras.
    pub fn compute_total(&self, details: &BookingDetails) -> MinorUnits {
        let days = details.rental_days();

        let mut total = details.daily_rate.times(days);
        if details.deposit_waiver {
            total = total.plus(self.rates.deposit_waiver_per_day.times(days));
        }
        total = total.plus(self.rates.insurance_per_day(details.insurance_tier).times(days));
        for extra in &details.extras {
            total = total.plus(extra.line_total());
        }
        total
    }

    /// Validates a client-submitted total against the computed one.
    ///
    /// Returns the *computed* total on success - the session is always
    /// opened with the server's number, never the client's.
    pub fn validate_submitted(
        &self,
        details: &BookingDetails,
        submitted: MinorUnits,
    ) -> Result<MinorUnits, PaymentError> {
        details
            .validate()
            .map_err(|e| PaymentError::input("booking_details", e.to_string()))?;

        let computed = self.compute_total(details);
        if computed.abs_diff(submitted) > AMOUNT_TOLERANCE_MINOR {
            return Err(PaymentError::amount_mismatch(
                computed.value(),
                submitted.value(),
            ));
        }
        Ok(computed)
    }
}
