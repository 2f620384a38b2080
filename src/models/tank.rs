use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fuel_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuelType::Petrol => f.write_str("petrol"),
            FuelType::Diesel => f.write_str("diesel"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Tank {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub name: String,
    pub fuel_type: FuelType,
    pub capacity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tank {
    pub fn new(admin_id: Uuid, name: String, fuel_type: FuelType, capacity: Decimal, now: DateTime<Utc>) -> Result<Self, AppError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Tank name is required"));
        }
        validate_capacity(capacity)?;
        Ok(Tank {
            id: Uuid::new_v4(),
            admin_id,
            name,
            fuel_type,
            capacity,
            created_at: now,
            updated_at: now,
        })
    }
}

pub fn validate_capacity(capacity: Decimal) -> Result<(), AppError> {
    if capacity <= Decimal::ZERO {
        return Err(AppError::validation("Invalid capacity, it must be greater than 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_capacity() {
        let now = Utc::now();
        let admin = Uuid::new_v4();
        assert!(Tank::new(admin, "T1".into(), FuelType::Petrol, Decimal::ZERO, now).is_err());
        assert!(Tank::new(admin, "T1".into(), FuelType::Petrol, Decimal::from(-5), now).is_err());
        assert!(Tank::new(admin, "   ".into(), FuelType::Petrol, Decimal::from(10), now).is_err());

        let tank = Tank::new(admin, " Main ".into(), FuelType::Diesel, Decimal::from(1000), now).unwrap();
        assert_eq!(tank.name, "Main");
        assert_eq!(tank.fuel_type.to_string(), "diesel");
    }
}
