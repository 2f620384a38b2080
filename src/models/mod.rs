pub mod principal;
pub mod sale;
pub mod stock;
pub mod tank;

pub use principal::{scope_for, require_admin, Principal, Role};
pub use sale::{Sale, Shift};
pub use stock::StockEntry;
pub use tank::{FuelType, Tank};
