//! Tank registry, stock ledger and sale ledger.
//!
//! Every operation that moves stock takes the `(admin, fuel type)` lock
//! from [`KeyedLocks`] first, then reads the stock entries, validates, and hands
//! the stock rows together with their sale change to the store as one
//! [`LedgerWrite`]. The store rejects the write if any row's version moved
//! underneath us (another process), in which case the step is re-read and
//! retried a bounded number of times.

pub mod locks;
mod sales;
mod stock;
mod tanks;

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::FuelType;
use crate::store::{LedgerStore, LedgerWrite, StockWrite, StoreError};
use locks::KeyedLocks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub admin_id: Uuid,
    pub fuel_type: FuelType,
}

impl StockKey {
    pub fn new(admin_id: Uuid, fuel_type: FuelType) -> Self {
        StockKey { admin_id, fuel_type }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Station wall clock, used for shifts and the same-day edit window.
    pub station_offset: FixedOffset,
    /// Extra attempts after a stock write loses an optimistic version check.
    pub write_retries: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            station_offset: Utc.fix(),
            write_retries: 3,
        }
    }
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    locks: KeyedLocks<StockKey>,
    settings: LedgerSettings,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Ledger { store, locks: KeyedLocks::new(), settings }
    }

    fn attempts(&self) -> u32 {
        self.settings.write_retries + 1
    }

    /// Commits a write; `Ok(false)` means a stock row changed since it was read.
    async fn apply(&self, write: LedgerWrite) -> Result<bool, AppError> {
        let entry_ids: Vec<Uuid> = write.stock.iter().map(StockWrite::entry_id).collect();
        let paired = write.sale.is_some() || entry_ids.len() > 1;
        match self.store.commit(write).await {
            Ok(()) => Ok(true),
            Err(StoreError::VersionConflict { .. }) => Ok(false),
            Err(e) => {
                if paired {
                    error!(
                        target: "ledger::integrity",
                        entries = ?entry_ids,
                        error = %e,
                        "Paired ledger write failed, no record was changed"
                    );
                } else {
                    error!(entries = ?entry_ids, error = %e, "Stock write failed");
                }
                Err(e.into())
            }
        }
    }

    fn note_stale(&self, key: StockKey, attempt: u32) {
        warn!(
            admin_id = %key.admin_id,
            fuel_type = %key.fuel_type,
            attempt,
            "Stock entry changed concurrently, re-reading"
        );
    }

    fn contention(&self, key: StockKey) -> AppError {
        AppError::Contention(format!(
            "{} stock is being updated concurrently, please retry",
            key.fuel_type
        ))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{DateTime, TimeZone};

    use crate::models::Principal;
    use crate::store::MemoryStore;

    pub struct Harness {
        pub store: Arc<MemoryStore>,
        pub ledger: Ledger,
        pub admin: Principal,
        pub staff: Principal,
    }

    pub fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), LedgerSettings::default());
        let admin = Principal::admin(Uuid::new_v4());
        let staff = Principal::staff(Uuid::new_v4(), admin.id);
        Harness { store, ledger, admin, staff }
    }

    /// 09:30 UTC, inside the morning shift.
    pub fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 14, 9, 30, 0).unwrap()
    }
}
