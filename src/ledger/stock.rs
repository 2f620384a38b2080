use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Ledger, StockKey};
use crate::dtos::stock::{CreateStockRequest, UpdateStockRequest};
use crate::error::AppError;
use crate::models::{require_admin, scope_for, Principal, StockEntry};
use crate::store::LedgerWrite;

impl Ledger {
    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id, tank_id = %req.tank_id))]
    pub async fn create_stock_entry(
        &self,
        actor: &Principal,
        req: CreateStockRequest,
        now: DateTime<Utc>,
    ) -> Result<StockEntry, AppError> {
        let admin_id = require_admin(actor, "create stock")?;
        let tank = self
            .store
            .find_tank(admin_id, req.tank_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tank not found"))?;

        if let Some(fuel_type) = req.fuel_type {
            if fuel_type != tank.fuel_type {
                return Err(AppError::conflict(format!(
                    "Tank {} holds {}, not {}",
                    tank.name, tank.fuel_type, fuel_type
                )));
            }
        }

        let key = StockKey::new(admin_id, tank.fuel_type);
        let _guard = self.locks.acquire(key).await;

        for attempt in 1..=self.attempts() {
            let prior = self.store.latest_tank_entry(admin_id, tank.id).await?;
            let entry = StockEntry::open(
                &tank,
                prior.as_ref(),
                req.dip_reading,
                req.received_quantity.unwrap_or(Decimal::ZERO),
                now,
            )?;

            // Sealing the prior entry makes a sale racing against it retry.
            let mut write = LedgerWrite::new().insert(entry.clone());
            if let Some(mut prior) = prior {
                let expected = prior.stamp(now);
                write = write.update(prior, expected);
            }
            if self.apply(write).await? {
                info!(
                    entry_id = %entry.id,
                    opening = %entry.calculated_stock,
                    total = %entry.total_stock,
                    "Stock entry created"
                );
                return Ok(entry);
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    pub async fn get_stock_entry(&self, actor: &Principal, entry_id: Uuid) -> Result<StockEntry, AppError> {
        let admin_id = scope_for(actor)?;
        self.store
            .find_stock_entry(admin_id, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock not found"))
    }

    pub async fn list_stock_entries(&self, actor: &Principal) -> Result<Vec<StockEntry>, AppError> {
        let admin_id = scope_for(actor)?;
        Ok(self.store.list_stock_entries(admin_id).await?)
    }

    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id))]
    pub async fn update_stock_entry(
        &self,
        actor: &Principal,
        entry_id: Uuid,
        req: UpdateStockRequest,
        now: DateTime<Utc>,
    ) -> Result<StockEntry, AppError> {
        let admin_id = require_admin(actor, "update stock")?;
        let entry = self.owned_entry(admin_id, entry_id).await?;
        let key = StockKey::new(admin_id, entry.fuel_type);
        let _guard = self.locks.acquire(key).await;

        for attempt in 1..=self.attempts() {
            let mut entry = self.owned_entry(admin_id, entry_id).await?;
            let expected = entry.stamp(now);
            entry.restock(req.dip_reading, req.received_quantity)?;

            if self.apply(LedgerWrite::new().update(entry.clone(), expected)).await? {
                info!(
                    received = %entry.received_quantity,
                    total = %entry.total_stock,
                    closing = %entry.closing_stock,
                    "Stock entry updated"
                );
                return Ok(entry);
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    /// Entries with recorded sales stay, since those sales are pinned to them.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_stock_entry(&self, actor: &Principal, entry_id: Uuid) -> Result<(), AppError> {
        let admin_id = require_admin(actor, "delete stock")?;
        let entry = self.owned_entry(admin_id, entry_id).await?;
        let key = StockKey::new(admin_id, entry.fuel_type);
        let _guard = self.locks.acquire(key).await;

        for attempt in 1..=self.attempts() {
            let entry = self.owned_entry(admin_id, entry_id).await?;
            if entry.sales > Decimal::ZERO {
                return Err(AppError::conflict(format!(
                    "Stock entry has {} recorded as sold, delete those sales first",
                    entry.sales
                )));
            }
            if self.store.delete_stock_entry(admin_id, entry_id, entry.version).await? {
                info!("Stock entry deleted");
                return Ok(());
            }
            self.note_stale(key, attempt);
        }
        Err(self.contention(key))
    }

    async fn owned_entry(&self, admin_id: Uuid, entry_id: Uuid) -> Result<StockEntry, AppError> {
        self.store
            .find_stock_entry(admin_id, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock not found"))
    }
}
