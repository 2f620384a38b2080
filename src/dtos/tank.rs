// src/dtos/tank.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FuelType, Tank};

#[derive(Debug, Deserialize)]
pub struct CreateTankRequest {
    #[serde(alias = "tank_name")]
    pub name: String,
    pub fuel_type: FuelType,
    pub capacity: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTankRequest {
    #[serde(alias = "tank_name")]
    pub name: Option<String>,
    pub capacity: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct TankResponse {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub name: String,
    pub fuel_type: FuelType,
    pub capacity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tank> for TankResponse {
    fn from(tank: Tank) -> Self {
        Self {
            id: tank.id,
            admin_id: tank.admin_id,
            name: tank.name,
            fuel_type: tank.fuel_type,
            capacity: tank.capacity,
            created_at: tank.created_at,
            updated_at: tank.updated_at,
        }
    }
}
