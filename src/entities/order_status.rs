use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of every reference order (arrival notice, release good, VAS
/// order, inventory check). Each kind only visits a subset of these.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "READY_TO_UNLOAD")]
    ReadyToUnload,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "READY_TO_PUTAWAY")]
    ReadyToPutaway,
    #[sea_orm(string_value = "PUTTING_AWAY")]
    PuttingAway,
    #[sea_orm(string_value = "READY_TO_PICK")]
    ReadyToPick,
    #[sea_orm(string_value = "PICKING")]
    Picking,
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "READY_TO_RETURN")]
    ReadyToReturn,
    #[sea_orm(string_value = "RETURNING")]
    Returning,
    #[sea_orm(string_value = "INSPECTING")]
    Inspecting,
    #[sea_orm(string_value = "PENDING_REVIEW")]
    PendingReview,
    #[sea_orm(string_value = "DONE")]
    Done,
}
