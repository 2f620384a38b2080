// src/dtos/stock.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FuelType, StockEntry};

#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub tank_id: Uuid,
    /// When given, must match the tank's fuel type.
    pub fuel_type: Option<FuelType>,
    pub dip_reading: Decimal,
    pub received_quantity: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStockRequest {
    pub dip_reading: Option<Decimal>,
    /// Added on top of the quantity already received on this entry.
    pub received_quantity: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct StockEntryResponse {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub tank_id: Uuid,
    pub fuel_type: FuelType,
    pub dip_reading: Decimal,
    pub calculated_stock: Decimal,
    pub received_quantity: Decimal,
    pub total_stock: Decimal,
    pub sales: Decimal,
    pub closing_stock: Decimal,
    pub tank_capacity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StockEntry> for StockEntryResponse {
    fn from(entry: StockEntry) -> Self {
        Self {
            id: entry.id,
            admin_id: entry.admin_id,
            tank_id: entry.tank_id,
            fuel_type: entry.fuel_type,
            dip_reading: entry.dip_reading,
            calculated_stock: entry.calculated_stock,
            received_quantity: entry.received_quantity,
            total_stock: entry.total_stock,
            sales: entry.sales,
            closing_stock: entry.closing_stock,
            tank_capacity: entry.tank_capacity,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}
