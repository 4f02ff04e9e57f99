//! Booking details and rate inputs for server-side price computation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MinorUnits, Timestamp, ValidationError};

/// Insurance cover tier chosen for the rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceTier {
    /// Statutory minimum, included in the base rate.
    Basic,
    /// Reduced-excess cover.
    Standard,
    /// Zero-excess cover.
    Premium,
}

/// An itemized extra (child seat, GPS, additional driver, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingExtra {
    /// Catalogue code of the extra.
    pub code: String,
    /// Price per unit in minor units.
    pub unit_amount: MinorUnits,
    /// Number of units booked.
    pub quantity: u32,
}

impl BookingExtra {
    /// Line total for this extra.
    pub fn line_total(&self) -> MinorUnits {
        self.unit_amount.times(self.quantity as i64)
    }
}

/// The pricing-relevant slice of a booking, as submitted by the booking
/// subsystem. Never trusted for the total - only for its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    pub pickup_at: Timestamp,
    pub dropoff_at: Timestamp,
    /// Base daily rate from the authoritative rate table.
    pub daily_rate: MinorUnits,
    pub insurance_tier: InsuranceTier,
    /// Whether the customer bought the deposit waiver.
    pub deposit_waiver: bool,
    pub extras: Vec<BookingExtra>,
}

impl BookingDetails {
    /// Validates the interval and rate inputs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.dropoff_at.is_after(&self.pickup_at) {
            return Err(ValidationError::invalid_format(
                "dropoff_at",
                "drop-off must be after pickup",
            ));
        }
        if self.daily_rate.value() <= 0 {
            return Err(ValidationError::non_positive_amount(
                "daily_rate",
                self.daily_rate.value(),
            ));
        }
        for extra in &self.extras {
            if extra.unit_amount.value() < 0 {
                return Err(ValidationError::non_positive_amount(
                    "extras.unit_amount",
                    extra.unit_amount.value(),
                ));
            }
        }
        Ok(())
    }

    /// Rental length in whole days: ceiling of the pickup/drop-off
    /// difference, never less than one.
    pub fn rental_days(&self) -> i64 {
        let seconds = self
            .dropoff_at
            .duration_since(&self.pickup_at)
            .num_seconds();
        let days = (seconds + 86_399) / 86_400;
        days.max(1)
    }
}

/// Per-day surcharges from the authoritative rate table.
///
/// Kept as data, not code, so re-validation during a later audit uses the
/// same table that priced the booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    /// Per-day surcharge for the deposit waiver.
    pub deposit_waiver_per_day: MinorUnits,
    /// Per-day surcharge for standard insurance cover.
    pub insurance_standard_per_day: MinorUnits,
    /// Per-day surcharge for premium insurance cover.
    pub insurance_premium_per_day: MinorUnits,
}

impl RateTable {
    /// Per-day surcharge for the given insurance tier.
    pub fn insurance_per_day(&self, tier: InsuranceTier) -> MinorUnits {
        match tier {
            InsuranceTier::Basic => MinorUnits::ZERO,
            InsuranceTier::Standard => self.insurance_standard_per_day,
            InsuranceTier::Premium => self.insurance_premium_per_day,
        }
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            deposit_waiver_per_day: MinorUnits::new(1200),
            insurance_standard_per_day: MinorUnits::new(900),
            insurance_premium_per_day: MinorUnits::new(1900),
        }
    }
}
