use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::tank::{FuelType, Tank};

/// One row of a tank's rolling opening/received/sold/closing chain.
///
/// `closing_stock == total_stock - sales` holds after every mutation, and
/// `total_stock` never exceeds the `tank_capacity` snapshotted at creation.
#[derive(Debug, Clone, FromRow)]
pub struct StockEntry {
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
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockEntry {
    /// Opens a new entry for `tank`, carrying the prior entry's closing stock forward.
    pub fn open(
        tank: &Tank,
        prior: Option<&StockEntry>,
        dip_reading: Decimal,
        received_quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        non_negative(dip_reading, "dipReading")?;
        non_negative(received_quantity, "receivedQuantity")?;

        let calculated_stock = prior.map(|p| p.closing_stock).unwrap_or(dip_reading);
        let total_stock = calculated_stock + received_quantity;
        check_capacity(total_stock, tank.capacity)?;

        Ok(StockEntry {
            id: Uuid::new_v4(),
            admin_id: tank.admin_id,
            tank_id: tank.id,
            fuel_type: tank.fuel_type,
            dip_reading,
            calculated_stock,
            received_quantity,
            total_stock,
            sales: Decimal::ZERO,
            closing_stock: total_stock,
            tank_capacity: tank.capacity,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Records `quantity` as sold from this entry.
    pub fn debit(&mut self, quantity: Decimal) -> Result<(), AppError> {
        if self.closing_stock < quantity {
            return Err(AppError::InsufficientStock {
                available: self.closing_stock,
                requested: quantity,
            });
        }
        self.closing_stock -= quantity;
        self.sales += quantity;
        Ok(())
    }

    /// Reverses a previous debit of `quantity`.
    pub fn credit(&mut self, quantity: Decimal) -> Result<(), AppError> {
        if self.sales < quantity {
            return Err(AppError::integrity(format!(
                "rolling back {quantity} from stock entry {} which only records {} sold",
                self.id, self.sales
            )));
        }
        self.closing_stock += quantity;
        self.sales -= quantity;
        Ok(())
    }

    /// Shifts the stock carried into this entry by `delta`, after a sale booked
    /// before this entry opened changed by `-delta`.
    pub fn adjust_carried(&mut self, delta: Decimal) -> Result<(), AppError> {
        if self.closing_stock + delta < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                available: self.closing_stock,
                requested: -delta,
            });
        }
        self.calculated_stock += delta;
        self.total_stock += delta;
        self.closing_stock += delta;
        Ok(())
    }

    /// Manual admin correction. Received quantity accumulates onto the row.
    pub fn restock(&mut self, dip_reading: Option<Decimal>, received: Option<Decimal>) -> Result<(), AppError> {
        if let Some(dip) = dip_reading {
            non_negative(dip, "dipReading")?;
        }
        let received_quantity = match received {
            Some(delta) => {
                non_negative(delta, "receivedQuantity")?;
                self.received_quantity + delta
            }
            None => self.received_quantity,
        };

        let total_stock = self.calculated_stock + received_quantity;
        check_capacity(total_stock, self.tank_capacity)?;

        if let Some(dip) = dip_reading {
            self.dip_reading = dip;
        }
        self.received_quantity = received_quantity;
        self.total_stock = total_stock;
        self.closing_stock = total_stock - self.sales;
        Ok(())
    }

    /// Bumps the row version for a conditional write and returns the version it replaces.
    pub fn stamp(&mut self, now: DateTime<Utc>) -> i64 {
        let previous = self.version;
        self.version += 1;
        self.updated_at = now;
        previous
    }
}

fn non_negative(value: Decimal, field: &str) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn check_capacity(total_stock: Decimal, capacity: Decimal) -> Result<(), AppError> {
    if total_stock > capacity {
        return Err(AppError::CapacityExceeded { total_stock, capacity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank(capacity: i64) -> Tank {
        Tank::new(Uuid::new_v4(), "Main".into(), FuelType::Petrol, Decimal::from(capacity), Utc::now()).unwrap()
    }

    #[test]
    fn opening_uses_dip_reading_without_prior_entry() {
        let entry = StockEntry::open(&tank(1000), None, Decimal::from(800), Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(entry.calculated_stock, Decimal::from(800));
        assert_eq!(entry.total_stock, Decimal::from(800));
        assert_eq!(entry.closing_stock, Decimal::from(800));
        assert_eq!(entry.sales, Decimal::ZERO);
        assert_eq!(entry.tank_capacity, Decimal::from(1000));
    }

    #[test]
    fn opening_carries_prior_closing_stock() {
        let tank = tank(1000);
        let mut prior = StockEntry::open(&tank, None, Decimal::from(800), Decimal::ZERO, Utc::now()).unwrap();
        prior.debit(Decimal::from(300)).unwrap();

        let next = StockEntry::open(&tank, Some(&prior), Decimal::from(490), Decimal::from(200), Utc::now()).unwrap();
        assert_eq!(next.calculated_stock, Decimal::from(500));
        assert_eq!(next.total_stock, Decimal::from(700));
        assert_eq!(next.dip_reading, Decimal::from(490));
    }

    #[test]
    fn capacity_boundary_is_inclusive() {
        let tank = tank(1000);
        assert!(StockEntry::open(&tank, None, Decimal::from(600), Decimal::from(400), Utc::now()).is_ok());
        let err = StockEntry::open(&tank, None, Decimal::from(600), Decimal::from(401), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { .. }));
    }

    #[test]
    fn debit_and_credit_are_inverse() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(800), Decimal::ZERO, Utc::now()).unwrap();
        let quantity = Decimal::new(12_345, 2);
        entry.debit(quantity).unwrap();
        assert_eq!(entry.closing_stock, Decimal::new(67_655, 2));
        assert_eq!(entry.sales, quantity);

        entry.credit(quantity).unwrap();
        assert_eq!(entry.closing_stock, Decimal::from(800));
        assert_eq!(entry.sales, Decimal::ZERO);
    }

    #[test]
    fn debit_beyond_closing_stock_is_rejected_without_mutation() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(100), Decimal::ZERO, Utc::now()).unwrap();
        let err = entry.debit(Decimal::from(101)).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(entry.closing_stock, Decimal::from(100));

        entry.debit(Decimal::from(100)).unwrap();
        assert_eq!(entry.closing_stock, Decimal::ZERO);
    }

    #[test]
    fn credit_more_than_sold_is_an_integrity_violation() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(100), Decimal::ZERO, Utc::now()).unwrap();
        entry.debit(Decimal::from(10)).unwrap();
        assert!(matches!(entry.credit(Decimal::from(11)), Err(AppError::Integrity(_))));
    }

    #[test]
    fn restock_accumulates_received_quantity() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(500), Decimal::from(100), Utc::now()).unwrap();
        entry.debit(Decimal::from(50)).unwrap();

        entry.restock(None, Some(Decimal::from(200))).unwrap();
        assert_eq!(entry.received_quantity, Decimal::from(300));
        assert_eq!(entry.total_stock, Decimal::from(800));
        assert_eq!(entry.closing_stock, Decimal::from(750));

        entry.restock(Some(Decimal::from(742)), None).unwrap();
        assert_eq!(entry.dip_reading, Decimal::from(742));
        assert_eq!(entry.total_stock, Decimal::from(800));
    }

    #[test]
    fn restock_validates_against_capacity_snapshot() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(900), Decimal::ZERO, Utc::now()).unwrap();
        let err = entry.restock(None, Some(Decimal::from(101))).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { .. }));
        assert_eq!(entry.received_quantity, Decimal::ZERO);

        entry.restock(None, Some(Decimal::from(100))).unwrap();
        assert_eq!(entry.total_stock, Decimal::from(1000));
    }

    #[test]
    fn stamp_returns_replaced_version() {
        let mut entry = StockEntry::open(&tank(1000), None, Decimal::from(1), Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(entry.stamp(Utc::now()), 0);
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn carried_stock_correction_moves_closing_but_not_sales() {
        let tank = tank(1000);
        let mut entry = StockEntry::open(&tank, None, Decimal::from(700), Decimal::from(200), Utc::now()).unwrap();
        entry.debit(Decimal::from(300)).unwrap();

        entry.adjust_carried(Decimal::from(-150)).unwrap();
        assert_eq!(entry.calculated_stock, Decimal::from(550));
        assert_eq!(entry.total_stock, Decimal::from(750));
        assert_eq!(entry.closing_stock, Decimal::from(450));
        assert_eq!(entry.sales, Decimal::from(300));

        let err = entry.adjust_carried(Decimal::from(-451)).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(entry.closing_stock, Decimal::from(450));

        entry.adjust_carried(Decimal::from(150)).unwrap();
        assert_eq!(entry.closing_stock, Decimal::from(600));
    }
}
