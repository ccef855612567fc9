//! Persistence entities for worksheets, the orders they serve and the
//! physical stock they move.

pub mod arrival_notice;
pub mod delivery_order;
pub mod inventory;
pub mod inventory_check;
pub mod inventory_history;
pub mod location;
pub mod order_inventory;
pub mod order_product;
pub mod order_status;
pub mod order_vas;
pub mod release_good;
pub mod vas_order;
pub mod worksheet;
pub mod worksheet_detail;

pub use delivery_order::DeliveryOrderStatus;
pub use inventory::InventoryStatus;
pub use inventory_history::InventoryTransactionType;
pub use location::LocationStatus;
pub use order_inventory::OrderInventoryStatus;
pub use order_product::OrderProductStatus;
pub use order_status::OrderStatus;
pub use order_vas::OrderVasStatus;
pub use worksheet::{RefOrderKind, WorksheetStatus, WorksheetType};
pub use worksheet_detail::TargetKind;
