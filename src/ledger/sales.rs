//! Sale ledger and its reconciliation against the stock chain.
//!
//! A sale debits the stock entry that was current when it was recorded and
//! remembers that entry. Same-day edits and deletes roll the old quantity back
//! onto that same entry before applying the new one. If newer entries were
//! opened from it in the meantime, the net change also reaches the current
//! entry, so stock carried forward is never sold twice.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{Ledger, StockKey};
use crate::dtos::sale::{CreateSaleRequest, UpdateSaleRequest};
use crate::error::AppError;
use crate::models::sale::{metered_quantity, validate_rate};
use crate::models::{scope_for, Principal, Role, Sale, Shift, StockEntry};
use crate::store::{LedgerWrite, SaleScope, SaleWrite};

impl Ledger {
    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id))]
    pub async fn create_sale(&self, actor: &Principal, req: CreateSaleRequest, now: DateTime<Utc>) -> Result<Sale, AppError> {
        let (Some(nozzle_id), Some(fuel_type), Some(opening_reading), Some(closing_reading), Some(rate)) =
            (req.nozzle_id, req.fuel_type, req.opening_reading, req.closing_reading, req.rate)
        else {
            return Err(AppError::validation(
                "Missing required fields: nozzle_id, fuel_type, opening_reading, closing_reading, rate",
            ));
        };
        let nozzle_id = non_empty_nozzle(&nozzle_id)?;
        let quantity = metered_quantity(opening_reading, closing_reading)?;
        validate_rate(rate)?;

        let admin_id = scope_for(actor)?;
        let key = StockKey::new(admin_id, fuel_type);
        let _guard = self.locks.acquire(key).await;

        let draft = Sale {
            id: Uuid::new_v4(),
            stock_entry_id: None,
            nozzle_id,
            fuel_type,
            opening_reading,
            closing_reading,
            rate,
            quantity,
            amount: quantity * rate,
            payment_mode: req.payment_mode,
            shift: Shift::for_hour(now.with_timezone(&self.settings.station_offset).hour()),
            customer_id: req.customer_id,
            created_by: actor.id,
            admin_id,
            created_at: now,
            updated_at: now,
        };

        for attempt in 1..=self.attempts() {
            let mut entry = self.store.current_stock_entry(admin_id, fuel_type).await?.ok_or_else(|| {
                AppError::StockUnavailable(format!("No {fuel_type} stock found, add stock before recording sales"))
            })?;
            let expected = entry.stamp(now);
            entry.debit(quantity)?;

            let sale = Sale { stock_entry_id: Some(entry.id), ..draft.clone() };
            let write = LedgerWrite::new().update(entry.clone(), expected).with_sale(SaleWrite::Insert(sale.clone()));
            if self.apply(write).await? {
                info!(
                    sale_id = %sale.id,
                    entry_id = %entry.id,
                    %quantity,
                    closing_stock = %entry.closing_stock,
                    "Sale recorded"
                );
                return Ok(sale);
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    pub async fn get_sale(&self, actor: &Principal, sale_id: Uuid) -> Result<Sale, AppError> {
        let sale = self.find_sale(sale_id).await?;
        authorize(actor, &sale)?;
        Ok(sale)
    }

    /// Admins see every sale of their station, staff only their own.
    pub async fn list_sales(&self, actor: &Principal) -> Result<Vec<Sale>, AppError> {
        let scope = match actor.role {
            Role::Admin => SaleScope::Admin(actor.id),
            Role::Staff => SaleScope::Creator(actor.id),
        };
        Ok(self.store.list_sales(scope).await?)
    }

    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id))]
    pub async fn update_sale(
        &self,
        actor: &Principal,
        sale_id: Uuid,
        req: UpdateSaleRequest,
        now: DateTime<Utc>,
    ) -> Result<Sale, AppError> {
        let sale = self.editable_sale(actor, sale_id, now).await?;
        let nozzle_id = req.nozzle_id.as_deref().map(non_empty_nozzle).transpose()?;
        let key = StockKey::new(sale.admin_id, sale.fuel_type);
        let _guard = self.locks.acquire(key).await;

        for attempt in 1..=self.attempts() {
            let sale = self.editable_sale(actor, sale_id, now).await?;
            let mut updated = sale.clone();
            updated.reprice(
                req.opening_reading.unwrap_or(sale.opening_reading),
                req.closing_reading.unwrap_or(sale.closing_reading),
                req.rate.unwrap_or(sale.rate),
            )?;
            let rebooked = self.rebook(&sale, updated.quantity, now).await?;

            if let Some(nozzle_id) = &nozzle_id {
                updated.nozzle_id = nozzle_id.clone();
            }
            if let Some(payment_mode) = &req.payment_mode {
                updated.payment_mode = Some(payment_mode.clone());
            }
            if let Some(customer_id) = &req.customer_id {
                updated.customer_id = Some(customer_id.clone());
            }
            updated.stock_entry_id = rebooked.pin;
            updated.updated_at = now;

            let closing_stock = rebooked.closing_stock;
            let write = rebooked.write.with_sale(SaleWrite::Update(updated.clone()));
            if self.apply(write).await? {
                info!(%sale_id, quantity = %updated.quantity, %closing_stock, "Sale updated");
                return Ok(updated);
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_sale(&self, actor: &Principal, sale_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let sale = self.editable_sale(actor, sale_id, now).await?;
        let key = StockKey::new(sale.admin_id, sale.fuel_type);
        let _guard = self.locks.acquire(key).await;

        for attempt in 1..=self.attempts() {
            let sale = self.editable_sale(actor, sale_id, now).await?;
            let rebooked = self.rebook(&sale, Decimal::ZERO, now).await?;

            let closing_stock = rebooked.closing_stock;
            let write = rebooked.write.with_sale(SaleWrite::Delete(sale.id));
            if self.apply(write).await? {
                info!(%sale_id, restored = %sale.quantity, %closing_stock, "Sale deleted");
                return Ok(());
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    async fn find_sale(&self, sale_id: Uuid) -> Result<Sale, AppError> {
        self.store
            .find_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::not_found("Sale not found"))
    }

    async fn editable_sale(&self, actor: &Principal, sale_id: Uuid, now: DateTime<Utc>) -> Result<Sale, AppError> {
        let sale = self.find_sale(sale_id).await?;
        authorize(actor, &sale)?;
        if !sale.created_on_same_day(now, self.settings.station_offset) {
            return Err(AppError::invalid_state("Sale is editable only on the day it was created"));
        }
        Ok(sale)
    }

    /// Moves the quantity booked for `sale` to `quantity`, zero when the sale goes away.
    ///
    /// The entry the sale was debited from is rolled back and debited again.
    /// When newer entries have been opened since, the net change is also
    /// carried into the current entry, which holds the live stock. Sales with
    /// no usable entry are corrected on the current entry alone.
    async fn rebook(&self, sale: &Sale, quantity: Decimal, now: DateTime<Utc>) -> Result<Rebooking, AppError> {
        let mut current = self
            .store
            .current_stock_entry(sale.admin_id, sale.fuel_type)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No {} stock found for this sale", sale.fuel_type)))?;

        let booked_on = match sale.stock_entry_id {
            Some(id) if id == current.id => Booking::Current,
            Some(id) => match self.store.find_stock_entry(sale.admin_id, id).await? {
                Some(entry) => Booking::Older(entry),
                None => {
                    warn!(sale_id = %sale.id, pinned = %id, "Pinned stock entry is gone, correcting the current entry");
                    Booking::Unpinned
                }
            },
            None => Booking::Unpinned,
        };

        let expected = current.stamp(now);
        let delta = quantity - sale.quantity;
        match booked_on {
            Booking::Current => {
                self.roll_back(&mut current, sale)?;
                // Checked against the entry with the old quantity already returned.
                current.debit(quantity)?;
                Ok(Rebooking {
                    pin: Some(current.id),
                    closing_stock: current.closing_stock,
                    write: LedgerWrite::new().update(current, expected),
                })
            }
            Booking::Older(mut older) => {
                let older_expected = older.stamp(now);
                self.roll_back(&mut older, sale)?;
                older.debit(quantity)?;
                current.adjust_carried(-delta)?;
                Ok(Rebooking {
                    pin: Some(older.id),
                    closing_stock: current.closing_stock,
                    write: LedgerWrite::new().update(older, older_expected).update(current, expected),
                })
            }
            Booking::Unpinned => {
                current.adjust_carried(-delta)?;
                Ok(Rebooking {
                    pin: None,
                    closing_stock: current.closing_stock,
                    write: LedgerWrite::new().update(current, expected),
                })
            }
        }
    }

    fn roll_back(&self, entry: &mut StockEntry, sale: &Sale) -> Result<(), AppError> {
        entry.credit(sale.quantity).inspect_err(|e| {
            error!(
                target: "ledger::integrity",
                sale_id = %sale.id,
                entry_id = %entry.id,
                quantity = %sale.quantity,
                recorded_sales = %entry.sales,
                error = %e,
                "Sale cannot be rolled back against its stock entry"
            );
        })
    }
}

enum Booking {
    Current,
    Older(StockEntry),
    Unpinned,
}

/// Stock rows to write for a changed sale.
struct Rebooking {
    write: LedgerWrite,
    /// Entry the sale stays debited from.
    pin: Option<Uuid>,
    /// Live stock once the write lands.
    closing_stock: Decimal,
}

fn non_empty_nozzle(nozzle_id: &str) -> Result<String, AppError> {
    let nozzle_id = nozzle_id.trim();
    if nozzle_id.is_empty() {
        return Err(AppError::validation("nozzle_id cannot be empty"));
    }
    Ok(nozzle_id.to_string())
}

/// Admins act on their station's sales, staff on the sales they recorded.
fn authorize(actor: &Principal, sale: &Sale) -> Result<(), AppError> {
    match actor.role {
        Role::Admin if sale.admin_id == actor.id => Ok(()),
        Role::Staff if sale.created_by == actor.id => Ok(()),
        Role::Staff if actor.admin_owner_id == Some(sale.admin_id) => {
            Err(AppError::forbidden("Staff can only access their own sales"))
        }
        _ => Err(AppError::not_found("Sale not found")),
    }
}
