use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::tank::FuelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_shift", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Evening,
    Night,
}

impl Shift {
    /// 06:00-14:00 morning, 14:00-22:00 evening, otherwise night.
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            6..=13 => Shift::Morning,
            14..=21 => Shift::Evening,
            _ => Shift::Night,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Sale {
    pub id: Uuid,
    /// Stock entry this sale was debited from.
    pub stock_entry_id: Option<Uuid>,
    pub nozzle_id: String,
    pub fuel_type: FuelType,
    pub opening_reading: Decimal,
    pub closing_reading: Decimal,
    pub rate: Decimal,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub payment_mode: Option<String>,
    pub shift: Shift,
    pub customer_id: Option<String>,
    pub created_by: Uuid,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Replaces the meter readings and rate, recomputing quantity and amount.
    pub fn reprice(&mut self, opening_reading: Decimal, closing_reading: Decimal, rate: Decimal) -> Result<(), AppError> {
        let quantity = metered_quantity(opening_reading, closing_reading)?;
        validate_rate(rate)?;
        self.opening_reading = opening_reading;
        self.closing_reading = closing_reading;
        self.rate = rate;
        self.quantity = quantity;
        self.amount = quantity * rate;
        Ok(())
    }

    pub fn created_on_same_day(&self, now: DateTime<Utc>, station: FixedOffset) -> bool {
        self.created_at.with_timezone(&station).date_naive() == now.with_timezone(&station).date_naive()
    }
}

/// Volume dispensed between two meter readings.
pub fn metered_quantity(opening_reading: Decimal, closing_reading: Decimal) -> Result<Decimal, AppError> {
    if opening_reading < Decimal::ZERO || closing_reading < Decimal::ZERO {
        return Err(AppError::validation("Meter readings cannot be negative"));
    }
    let quantity = closing_reading - opening_reading;
    if quantity <= Decimal::ZERO {
        return Err(AppError::validation("Closing reading must be greater than opening reading"));
    }
    Ok(quantity)
}

pub fn validate_rate(rate: Decimal) -> Result<(), AppError> {
    if rate < Decimal::ZERO {
        return Err(AppError::validation("Rate cannot be negative"));
    }
    Ok(())
}
