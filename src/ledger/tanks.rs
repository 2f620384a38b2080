use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use super::Ledger;
use crate::dtos::tank::{CreateTankRequest, UpdateTankRequest};
use crate::error::AppError;
use crate::models::{require_admin, scope_for, tank::validate_capacity, Principal, Tank};

impl Ledger {
    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id))]
    pub async fn create_tank(&self, actor: &Principal, req: CreateTankRequest, now: DateTime<Utc>) -> Result<Tank, AppError> {
        let admin_id = require_admin(actor, "create tanks")?;

        if self.store.find_tank_by_fuel(admin_id, req.fuel_type).await?.is_some() {
            return Err(AppError::conflict(format!("Only one {} tank allowed", req.fuel_type)));
        }

        let tank = Tank::new(admin_id, req.name, req.fuel_type, req.capacity, now)?;
        // The unique index still catches a racing duplicate.
        self.store.insert_tank(&tank).await?;

        info!(tank_id = %tank.id, fuel_type = %tank.fuel_type, capacity = %tank.capacity, "Tank created");
        Ok(tank)
    }

    /// Staff read their admin's tanks; only admins change them.
    pub async fn get_tank(&self, actor: &Principal, tank_id: Uuid) -> Result<Tank, AppError> {
        let admin_id = scope_for(actor)?;
        self.store
            .find_tank(admin_id, tank_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tank not found"))
    }

    pub async fn list_tanks(&self, actor: &Principal) -> Result<Vec<Tank>, AppError> {
        let admin_id = scope_for(actor)?;
        Ok(self.store.list_tanks(admin_id).await?)
    }

    /// Capacity may drop below the stock already held; existing entries keep
    /// validating against their own capacity snapshot.
    #[instrument(skip(self, actor, req), fields(actor_id = %actor.id))]
    pub async fn update_tank(
        &self,
        actor: &Principal,
        tank_id: Uuid,
        req: UpdateTankRequest,
        now: DateTime<Utc>,
    ) -> Result<Tank, AppError> {
        let admin_id = require_admin(actor, "update tanks")?;
        let mut tank = self
            .store
            .find_tank(admin_id, tank_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tank not found"))?;

        if let Some(capacity) = req.capacity {
            validate_capacity(capacity)?;
            tank.capacity = capacity;
        }
        if let Some(name) = req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::validation("Tank name cannot be empty"));
            }
            tank.name = name.to_string();
        }
        tank.updated_at = now;

        self.store.update_tank(&tank).await?;
        info!(%tank_id, capacity = %tank.capacity, "Tank updated");
        Ok(tank)
    }

    /// Stock entries referencing the tank are left in place.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_tank(&self, actor: &Principal, tank_id: Uuid) -> Result<(), AppError> {
        let admin_id = require_admin(actor, "delete tanks")?;
        if !self.store.delete_tank(admin_id, tank_id).await? {
            return Err(AppError::not_found("Tank not found"));
        }
        info!(%tank_id, "Tank deleted");
        Ok(())
    }
}
