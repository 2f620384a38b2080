use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

/// Authenticated caller, attached to the request by the auth middleware.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    /// Owning admin, present for staff accounts.
    pub admin_owner_id: Option<Uuid>,
}

impl Principal {
    pub fn admin(id: Uuid) -> Self {
        Principal { id, role: Role::Admin, admin_owner_id: None }
    }

    pub fn staff(id: Uuid, admin_owner_id: Uuid) -> Self {
        Principal { id, role: Role::Staff, admin_owner_id: Some(admin_owner_id) }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Tenant (admin) whose records the principal operates on.
pub fn scope_for(principal: &Principal) -> Result<Uuid, AppError> {
    match principal.role {
        Role::Admin => Ok(principal.id),
        Role::Staff => principal
            .admin_owner_id
            .ok_or_else(|| AppError::forbidden("Staff account is not linked to an admin")),
    }
}

pub fn require_admin(principal: &Principal, action: &str) -> Result<Uuid, AppError> {
    if !principal.is_admin() {
        return Err(AppError::forbidden(format!("Only admin can {action}")));
    }
    Ok(principal.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_is_scoped_to_owning_admin() {
        let admin_id = Uuid::new_v4();
        let staff = Principal::staff(Uuid::new_v4(), admin_id);
        assert_eq!(scope_for(&staff).unwrap(), admin_id);
        assert_eq!(scope_for(&Principal::admin(admin_id)).unwrap(), admin_id);
    }

    #[test]
    fn orphan_staff_and_admin_only_actions_are_forbidden() {
        let orphan = Principal { id: Uuid::new_v4(), role: Role::Staff, admin_owner_id: None };
        assert!(matches!(scope_for(&orphan), Err(AppError::Forbidden(_))));

        let staff = Principal::staff(Uuid::new_v4(), Uuid::new_v4());
        let err = require_admin(&staff, "create tanks").unwrap_err();
        assert_eq!(err.to_string(), "Only admin can create tanks");
    }
}
