//! StateSet Worksheets
//!
//! Orchestrates warehouse operations (unloading, putaway, picking, loading,
//! value-added services, returns and cycle counting) as worksheets bound to
//! customer orders. Every externally invocable operation is a [`commands::Command`]
//! that runs inside a single database transaction; the lifecycle engine in
//! [`services::worksheets`] and its specializations borrow that transaction.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod naming;
pub mod notifications;
pub mod services;

pub use context::OperationContext;
pub use errors::ServiceError;

/// Commonly used types for callers wiring the engine into a transport layer.
pub mod prelude {
    pub use crate::commands::{Collaborators, Command};
    pub use crate::context::OperationContext;
    pub use crate::db::DbPool;
    pub use crate::entities::{
        OrderInventoryStatus, OrderProductStatus, OrderStatus, OrderVasStatus, WorksheetStatus,
        WorksheetType,
    };
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::naming::NameGenerator;
    pub use crate::services::order_targets::{OrderTarget, TargetKind, TargetStatus};
    pub use crate::services::reference_orders::{RefOrder, RefOrderKind, RefOrderLink};
}
