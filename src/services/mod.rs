//! Worksheet orchestration services.
//!
//! Everything here borrows a `DatabaseTransaction` owned by the calling
//! command; nothing in this module begins or commits a transaction.

pub mod cycle_count;
pub mod inbound;
pub mod loading;
pub mod order_targets;
pub mod picking;
pub mod reconciliation;
pub mod reference_orders;
pub mod returns;
pub mod stock;
pub mod vas;
pub mod worksheet_queries;
pub mod worksheets;
