use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FuelType, Sale, Shift};

// Required fields are optional here so a missing one is reported as a
// validation error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSaleRequest {
    pub nozzle_id: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub opening_reading: Option<Decimal>,
    pub closing_reading: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub payment_mode: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSaleRequest {
    pub nozzle_id: Option<String>,
    pub opening_reading: Option<Decimal>,
    pub closing_reading: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub payment_mode: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: Uuid,
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

impl From<Sale> for SaleResponse {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            stock_entry_id: sale.stock_entry_id,
            nozzle_id: sale.nozzle_id,
            fuel_type: sale.fuel_type,
            opening_reading: sale.opening_reading,
            closing_reading: sale.closing_reading,
            rate: sale.rate,
            quantity: sale.quantity,
            amount: sale.amount,
            payment_mode: sale.payment_mode,
            shift: sale.shift,
            customer_id: sale.customer_id,
            created_by: sale.created_by,
            admin_id: sale.admin_id,
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}
