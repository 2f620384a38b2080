//! Persistence port for tanks, stock entries and sales.
//!
//! Stock and sale changes made by one reconciliation step travel together in
//! a [`LedgerWrite`], which every adapter applies atomically: each stock row is
//! updated only if its version still matches, and the sale write happens in
//! the same unit of work or not at all.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{FuelType, Sale, StockEntry, Tank};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0} not found")]
    Missing(&'static str),
    #[error("stock entry {entry_id} was modified concurrently")]
    VersionConflict { entry_id: Uuid },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub enum SaleWrite {
    Insert(Sale),
    Update(Sale),
    Delete(Uuid),
}

#[derive(Debug, Clone)]
pub enum StockWrite {
    Insert(StockEntry),
    /// Conditional update; `entry.version` is already bumped past `expected_version`.
    Update { entry: StockEntry, expected_version: i64 },
}

impl StockWrite {
    pub fn entry_id(&self) -> Uuid {
        match self {
            StockWrite::Insert(entry) | StockWrite::Update { entry, .. } => entry.id,
        }
    }
}

/// Stock entry changes, optionally paired with the sale change they account for.
#[derive(Debug, Clone, Default)]
pub struct LedgerWrite {
    pub stock: Vec<StockWrite>,
    pub sale: Option<SaleWrite>,
}

impl LedgerWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, entry: StockEntry) -> Self {
        self.stock.push(StockWrite::Insert(entry));
        self
    }

    pub fn update(mut self, entry: StockEntry, expected_version: i64) -> Self {
        self.stock.push(StockWrite::Update { entry, expected_version });
        self
    }

    pub fn with_sale(mut self, sale: SaleWrite) -> Self {
        self.sale = Some(sale);
        self
    }
}

/// Which sales a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum SaleScope {
    Admin(Uuid),
    Creator(Uuid),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Tanks
    async fn insert_tank(&self, tank: &Tank) -> StoreResult<()>;
    async fn find_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<Tank>>;
    async fn find_tank_by_fuel(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<Tank>>;
    async fn list_tanks(&self, admin_id: Uuid) -> StoreResult<Vec<Tank>>;
    async fn update_tank(&self, tank: &Tank) -> StoreResult<()>;
    async fn delete_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<bool>;

    // Stock entries
    async fn find_stock_entry(&self, admin_id: Uuid, entry_id: Uuid) -> StoreResult<Option<StockEntry>>;
    /// Most recently created entry for the tenant and fuel type.
    async fn current_stock_entry(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<StockEntry>>;
    /// Most recently created entry for one tank.
    async fn latest_tank_entry(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<StockEntry>>;
    async fn list_stock_entries(&self, admin_id: Uuid) -> StoreResult<Vec<StockEntry>>;
    /// Deletes the entry only while it is still at `version`.
    async fn delete_stock_entry(&self, admin_id: Uuid, entry_id: Uuid, version: i64) -> StoreResult<bool>;

    // Sales
    async fn find_sale(&self, sale_id: Uuid) -> StoreResult<Option<Sale>>;
    async fn list_sales(&self, scope: SaleScope) -> StoreResult<Vec<Sale>>;

    /// Applies every stock change and the paired sale change as one unit.
    async fn commit(&self, write: LedgerWrite) -> StoreResult<()>;
}
