use async_trait::async_trait;
use sqlx::{Error as SqlxError, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use super::{LedgerStore, LedgerWrite, SaleScope, SaleWrite, StockWrite, StoreError, StoreResult};
use crate::models::{FuelType, Sale, StockEntry, Tank};

const TANK_COLUMNS: &str = "id, admin_id, name, fuel_type, capacity, created_at, updated_at";

const STOCK_COLUMNS: &str = "id, admin_id, tank_id, fuel_type, dip_reading, calculated_stock,
    received_quantity, total_stock, sales, closing_stock, tank_capacity, version, created_at, updated_at";

const SALE_COLUMNS: &str = "id, stock_entry_id, nozzle_id, fuel_type, opening_reading, closing_reading,
    rate, quantity, amount, payment_mode, shift, customer_id, created_by, admin_id, created_at, updated_at";

fn map_unique_violation(err: SqlxError, message: String) -> StoreError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Duplicate(message)
        }
        other => other.into(),
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn write_stock(tx: &mut Transaction<'_, Postgres>, change: StockWrite) -> StoreResult<()> {
        match change {
            StockWrite::Insert(entry) => {
                sqlx::query(
                    "INSERT INTO stock_entries (id, admin_id, tank_id, fuel_type, dip_reading, calculated_stock,
                        received_quantity, total_stock, sales, closing_stock, tank_capacity, version, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
                )
                .bind(entry.id)
                .bind(entry.admin_id)
                .bind(entry.tank_id)
                .bind(entry.fuel_type)
                .bind(entry.dip_reading)
                .bind(entry.calculated_stock)
                .bind(entry.received_quantity)
                .bind(entry.total_stock)
                .bind(entry.sales)
                .bind(entry.closing_stock)
                .bind(entry.tank_capacity)
                .bind(entry.version)
                .bind(entry.created_at)
                .bind(entry.updated_at)
                .execute(&mut **tx)
                .await?;
            }
            StockWrite::Update { entry, expected_version } => {
                let updated = sqlx::query(
                    "UPDATE stock_entries SET
                        dip_reading = $3, calculated_stock = $4, received_quantity = $5, total_stock = $6,
                        sales = $7, closing_stock = $8, version = $9, updated_at = $10
                     WHERE id = $1 AND version = $2",
                )
                .bind(entry.id)
                .bind(expected_version)
                .bind(entry.dip_reading)
                .bind(entry.calculated_stock)
                .bind(entry.received_quantity)
                .bind(entry.total_stock)
                .bind(entry.sales)
                .bind(entry.closing_stock)
                .bind(entry.version)
                .bind(entry.updated_at)
                .execute(&mut **tx)
                .await?;

                if updated.rows_affected() == 0 {
                    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stock_entries WHERE id = $1")
                        .bind(entry.id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    return Err(match exists {
                        Some(_) => StoreError::VersionConflict { entry_id: entry.id },
                        None => StoreError::Missing("Stock entry"),
                    });
                }
            }
        }
        Ok(())
    }

    async fn write_sale(tx: &mut Transaction<'_, Postgres>, sale: SaleWrite) -> StoreResult<()> {
        match sale {
            SaleWrite::Insert(s) => {
                sqlx::query(
                    "INSERT INTO sales (id, stock_entry_id, nozzle_id, fuel_type, opening_reading, closing_reading,
                        rate, quantity, amount, payment_mode, shift, customer_id, created_by, admin_id, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
                )
                .bind(s.id)
                .bind(s.stock_entry_id)
                .bind(&s.nozzle_id)
                .bind(s.fuel_type)
                .bind(s.opening_reading)
                .bind(s.closing_reading)
                .bind(s.rate)
                .bind(s.quantity)
                .bind(s.amount)
                .bind(&s.payment_mode)
                .bind(s.shift)
                .bind(&s.customer_id)
                .bind(s.created_by)
                .bind(s.admin_id)
                .bind(s.created_at)
                .bind(s.updated_at)
                .execute(&mut **tx)
                .await?;
            }
            SaleWrite::Update(s) => {
                let result = sqlx::query(
                    "UPDATE sales SET
                        stock_entry_id = $2, nozzle_id = $3, opening_reading = $4, closing_reading = $5,
                        rate = $6, quantity = $7, amount = $8, payment_mode = $9, customer_id = $10, updated_at = $11
                     WHERE id = $1",
                )
                .bind(s.id)
                .bind(s.stock_entry_id)
                .bind(&s.nozzle_id)
                .bind(s.opening_reading)
                .bind(s.closing_reading)
                .bind(s.rate)
                .bind(s.quantity)
                .bind(s.amount)
                .bind(&s.payment_mode)
                .bind(&s.customer_id)
                .bind(s.updated_at)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Missing("Sale"));
                }
            }
            SaleWrite::Delete(id) => {
                let result = sqlx::query("DELETE FROM sales WHERE id = $1")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Missing("Sale"));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_tank(&self, tank: &Tank) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tanks (id, admin_id, name, fuel_type, capacity, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(tank.id)
        .bind(tank.admin_id)
        .bind(&tank.name)
        .bind(tank.fuel_type)
        .bind(tank.capacity)
        .bind(tank.created_at)
        .bind(tank.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Only one {} tank allowed", tank.fuel_type)))?;
        Ok(())
    }

    async fn find_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<Tank>> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks WHERE id = $1 AND admin_id = $2"
        ))
        .bind(tank_id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tank)
    }

    async fn find_tank_by_fuel(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<Tank>> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks WHERE admin_id = $1 AND fuel_type = $2"
        ))
        .bind(admin_id)
        .bind(fuel_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tank)
    }

    async fn list_tanks(&self, admin_id: Uuid) -> StoreResult<Vec<Tank>> {
        let tanks = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks WHERE admin_id = $1 ORDER BY created_at DESC"
        ))
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tanks)
    }

    async fn update_tank(&self, tank: &Tank) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE tanks SET name = $3, capacity = $4, updated_at = $5 WHERE id = $1 AND admin_id = $2",
        )
        .bind(tank.id)
        .bind(tank.admin_id)
        .bind(&tank.name)
        .bind(tank.capacity)
        .bind(tank.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("Tank"));
        }
        Ok(())
    }

    async fn delete_tank(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tanks WHERE id = $1 AND admin_id = $2")
            .bind(tank_id)
            .bind(admin_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_stock_entry(&self, admin_id: Uuid, entry_id: Uuid) -> StoreResult<Option<StockEntry>> {
        let entry = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entries WHERE id = $1 AND admin_id = $2"
        ))
        .bind(entry_id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn current_stock_entry(&self, admin_id: Uuid, fuel_type: FuelType) -> StoreResult<Option<StockEntry>> {
        let entry = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entries
             WHERE admin_id = $1 AND fuel_type = $2
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(admin_id)
        .bind(fuel_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn latest_tank_entry(&self, admin_id: Uuid, tank_id: Uuid) -> StoreResult<Option<StockEntry>> {
        let entry = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entries
             WHERE admin_id = $1 AND tank_id = $2
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(admin_id)
        .bind(tank_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_stock_entries(&self, admin_id: Uuid) -> StoreResult<Vec<StockEntry>> {
        let entries = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entries WHERE admin_id = $1 ORDER BY created_at DESC"
        ))
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn delete_stock_entry(&self, admin_id: Uuid, entry_id: Uuid, version: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM stock_entries WHERE id = $1 AND admin_id = $2 AND version = $3")
            .bind(entry_id)
            .bind(admin_id)
            .bind(version)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_sale(&self, sale_id: Uuid) -> StoreResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    async fn list_sales(&self, scope: SaleScope) -> StoreResult<Vec<Sale>> {
        let (column, id) = match scope {
            SaleScope::Admin(admin_id) => ("admin_id", admin_id),
            SaleScope::Creator(user_id) => ("created_by", user_id),
        };
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE {column} = $1 ORDER BY created_at DESC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    #[instrument(skip(self, write), fields(stock_writes = write.stock.len()))]
    async fn commit(&self, write: LedgerWrite) -> StoreResult<()> {
        let LedgerWrite { stock, sale } = write;
        let mut tx = self.pool.begin().await?;

        // Any error returns before commit; dropping the transaction rolls it back.
        for change in stock {
            Self::write_stock(&mut tx, change).await?;
        }
        if let Some(sale) = sale {
            Self::write_sale(&mut tx, sale).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
