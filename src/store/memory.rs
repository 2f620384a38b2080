//! In-process store used for local development without Postgres and in tests.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerWrite, SaleScope, SaleWrite, StockWrite, StoreError, StoreResult};
use crate::models::{FuelType, Sale, StockEntry, Tank};

#[derive(Default)]
struct Tables {
    tanks: Vec<Tank>,
    // Insertion order breaks ties between equal creation times.
    stock: Vec<StockEntry>,
    sales: Vec<Sale>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    /// Overwrites a sale row as-is, bypassing the ledger.
    #[cfg(test)]
    pub(crate) fn put_sale(&self, sale: Sale) {
        let mut tables = self.tables();
        tables.sales.retain(|s| s.id != sale.id);
        tables.sales.push(sale);
    }
}

fn newest<'a, I>(entries: I) -> Option<StockEntry>
where
    I: Iterator<Item = &'a StockEntry>,
{
    entries.max_by_key(|e| e.created_at).cloned()
}

fn newest_first<T: Clone>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.reverse();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_tank(&self, tank: &Tank) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.tanks.iter().any(|t| t.admin_id == tank.admin_id && t.fuel_type == tank.fuel_type) {
            return Err(StoreError::Duplicate(format!("Only one {} tank allowed", tank.fuel_type)));
        }
        tables.tanks.push(tank.clone());
        Ok(())
    }

    async fn find_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<Tank>> {
        Ok(self.tables().tanks.iter().find(|t| t.id == tank_id && t.admin_id == admin_id).cloned())
    }

    async fn find_tank_by_fuel(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<Tank>> {
        Ok(self
            .tables()
            .tanks
            .iter()
            .find(|t| t.admin_id == admin_id && t.fuel_type == fuel_type)
            .cloned())
    }

    async fn list_tanks(&self, admin_id: Uuid) -> StoreResult<Vec<Tank>> {
        let tables = self.tables();
        let owned = tables.tanks.iter().filter(|t| t.admin_id == admin_id).cloned();
        Ok(newest_first(owned, |t| t.created_at))
    }

    async fn update_tank(&self, tank: &Tank) -> StoreResult<()> {
        let mut tables = self.tables();
        let slot = tables
            .tanks
            .iter_mut()
            .find(|t| t.id == tank.id && t.admin_id == tank.admin_id)
            .ok_or(StoreError::Missing("Tank"))?;
        *slot = tank.clone();
        Ok(())
    }

    async fn delete_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables();
        let before = tables.tanks.len();
        tables.tanks.retain(|t| !(t.id == tank_id && t.admin_id == admin_id));
        Ok(tables.tanks.len() != before)
    }

    async fn find_stock_entry(&self, admin_id: Uuid, entry_id: Uuid) -> StoreResult<Option<StockEntry>> {
        Ok(self.tables().stock.iter().find(|e| e.id == entry_id && e.admin_id == admin_id).cloned())
    }

    async fn current_stock_entry(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<StockEntry>> {
        let tables = self.tables();
        Ok(newest(tables.stock.iter().filter(|e| e.admin_id == admin_id && e.fuel_type == fuel_type)))
    }

    async fn latest_tank_entry(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<StockEntry>> {
        let tables = self.tables();
        Ok(newest(tables.stock.iter().filter(|e| e.admin_id == admin_id && e.tank_id == tank_id)))
    }

    async fn list_stock_entries(&self, admin_id: Uuid) -> StoreResult<Vec<StockEntry>> {
        let tables = self.tables();
        let owned = tables.stock.iter().filter(|e| e.admin_id == admin_id).cloned();
        Ok(newest_first(owned, |e| e.created_at))
    }

    async fn delete_stock_entry(&self, admin_id: Uuid, entry_id: Uuid, version: i64) -> StoreResult<bool> {
        let mut tables = self.tables();
        let before = tables.stock.len();
        tables
            .stock
            .retain(|e| !(e.id == entry_id && e.admin_id == admin_id && e.version == version));
        Ok(tables.stock.len() != before)
    }

    async fn find_sale(&self, sale_id: Uuid) -> StoreResult<Option<Sale>> {
        Ok(self.tables().sales.iter().find(|s| s.id == sale_id).cloned())
    }

    async fn list_sales(&self, scope: SaleScope) -> StoreResult<Vec<Sale>> {
        let tables = self.tables();
        let matching = tables.sales.iter().filter(|s| match scope {
            SaleScope::Admin(admin_id) => s.admin_id == admin_id,
            SaleScope::Creator(user_id) => s.created_by == user_id,
        });
        Ok(newest_first(matching.cloned(), |s| s.created_at))
    }

    async fn commit(&self, write: LedgerWrite) -> StoreResult<()> {
        let mut tables = self.tables();
        let LedgerWrite { stock, sale } = write;

        // Validate every change before touching either table.
        let mut slots = Vec::with_capacity(stock.len());
        for change in &stock {
            let slot = match change {
                StockWrite::Insert(entry) => {
                    if tables.stock.iter().any(|e| e.id == entry.id) {
                        return Err(StoreError::Duplicate(format!("Stock entry {} already exists", entry.id)));
                    }
                    None
                }
                StockWrite::Update { entry, expected_version } => {
                    let idx = tables
                        .stock
                        .iter()
                        .position(|e| e.id == entry.id)
                        .ok_or(StoreError::Missing("Stock entry"))?;
                    if tables.stock[idx].version != *expected_version {
                        return Err(StoreError::VersionConflict { entry_id: entry.id });
                    }
                    Some(idx)
                }
            };
            slots.push(slot);
        }
        let sale_idx = match &sale {
            Some(SaleWrite::Update(s)) => Some(
                tables.sales.iter().position(|x| x.id == s.id).ok_or(StoreError::Missing("Sale"))?,
            ),
            Some(SaleWrite::Delete(id)) => Some(
                tables.sales.iter().position(|x| x.id == *id).ok_or(StoreError::Missing("Sale"))?,
            ),
            _ => None,
        };

        for (change, slot) in stock.into_iter().zip(slots) {
            match (change, slot) {
                (StockWrite::Update { entry, .. }, Some(idx)) => tables.stock[idx] = entry,
                (StockWrite::Insert(entry), _) | (StockWrite::Update { entry, .. }, None) => tables.stock.push(entry),
            }
        }
        match (sale, sale_idx) {
            (Some(SaleWrite::Insert(s)), _) => tables.sales.push(s),
            (Some(SaleWrite::Update(s)), Some(idx)) => tables.sales[idx] = s,
            (Some(SaleWrite::Delete(_)), Some(idx)) => {
                tables.sales.remove(idx);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn tank(admin_id: Uuid, fuel_type: FuelType) -> Tank {
        Tank::new(admin_id, "Main".into(), fuel_type, Decimal::from(1000), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn enforces_one_tank_per_fuel_type() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        store.insert_tank(&tank(admin, FuelType::Petrol)).await.unwrap();
        store.insert_tank(&tank(admin, FuelType::Diesel)).await.unwrap();
        let err = store.insert_tank(&tank(admin, FuelType::Petrol)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        // Another tenant may still own a petrol tank.
        store.insert_tank(&tank(Uuid::new_v4(), FuelType::Petrol)).await.unwrap();
    }

    #[tokio::test]
    async fn current_entry_is_most_recently_created() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let tank = tank(admin, FuelType::Petrol);
        let now = Utc::now();

        let older = StockEntry::open(&tank, None, Decimal::from(100), Decimal::ZERO, now - Duration::hours(2)).unwrap();
        let newer = StockEntry::open(&tank, Some(&older), Decimal::ZERO, Decimal::from(50), now).unwrap();
        // Inserted out of order on purpose.
        store.commit(LedgerWrite::new().insert(newer.clone())).await.unwrap();
        store.commit(LedgerWrite::new().insert(older.clone())).await.unwrap();

        let current = store.current_stock_entry(admin, FuelType::Petrol).await.unwrap().unwrap();
        assert_eq!(current.id, newer.id);
        assert!(store.current_stock_entry(admin, FuelType::Diesel).await.unwrap().is_none());

        let listed = store.list_stock_entries(admin).await.unwrap();
        assert_eq!(listed.iter().map(|e| e.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn commit_rejects_stale_version_and_writes_nothing() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let tank = tank(admin, FuelType::Diesel);
        let entry = StockEntry::open(&tank, None, Decimal::from(100), Decimal::ZERO, Utc::now()).unwrap();
        store.commit(LedgerWrite::new().insert(entry.clone())).await.unwrap();

        let mut first = entry.clone();
        let expected = first.stamp(Utc::now());
        first.debit(Decimal::from(10)).unwrap();
        store.commit(LedgerWrite::new().update(first, expected)).await.unwrap();

        let mut stale = entry.clone();
        let expected = stale.stamp(Utc::now());
        stale.debit(Decimal::from(20)).unwrap();
        let err = store.commit(LedgerWrite::new().update(stale, expected)).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let stored = store.find_stock_entry(admin, entry.id).await.unwrap().unwrap();
        assert_eq!(stored.closing_stock, Decimal::from(90));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn commit_with_missing_sale_leaves_stock_untouched() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let tank = tank(admin, FuelType::Petrol);
        let entry = StockEntry::open(&tank, None, Decimal::from(100), Decimal::ZERO, Utc::now()).unwrap();
        store.commit(LedgerWrite::new().insert(entry.clone())).await.unwrap();

        let mut changed = entry.clone();
        let expected = changed.stamp(Utc::now());
        changed.closing_stock = Decimal::from(1);
        let write = LedgerWrite::new().update(changed, expected).with_sale(SaleWrite::Delete(Uuid::new_v4()));
        assert!(matches!(store.commit(write).await, Err(StoreError::Missing("Sale"))));

        let stored = store.find_stock_entry(admin, entry.id).await.unwrap().unwrap();
        assert_eq!(stored.closing_stock, Decimal::from(100));
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn one_stale_row_rejects_the_whole_write() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let tank = tank(admin, FuelType::Petrol);
        let now = Utc::now();
        let prior = StockEntry::open(&tank, None, Decimal::from(100), Decimal::ZERO, now).unwrap();
        store.commit(LedgerWrite::new().insert(prior.clone())).await.unwrap();

        // Someone else moves the prior entry first.
        let mut sold = prior.clone();
        let expected = sold.stamp(now);
        sold.debit(Decimal::from(40)).unwrap();
        store.commit(LedgerWrite::new().update(sold, expected)).await.unwrap();

        let next = StockEntry::open(&tank, Some(&prior), Decimal::ZERO, Decimal::ZERO, now + Duration::hours(1)).unwrap();
        let mut sealed = prior.clone();
        let expected = sealed.stamp(now);
        let write = LedgerWrite::new().insert(next).update(sealed, expected);
        assert!(matches!(store.commit(write).await, Err(StoreError::VersionConflict { .. })));

        let current = store.current_stock_entry(admin, FuelType::Petrol).await.unwrap().unwrap();
        assert_eq!(current.id, prior.id);
        assert_eq!(current.closing_stock, Decimal::from(60));
        assert_eq!(store.list_stock_entries(admin).await.unwrap().len(), 1);
    }
}
