use super::inventory::InventoryStatus;
use super::worksheet::RefOrderKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why an inventory record changed.
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
pub enum InventoryTransactionType {
    #[sea_orm(string_value = "UNLOADING")]
    Unloading,
    #[sea_orm(string_value = "UNDO_UNLOADING")]
    UndoUnloading,
    #[sea_orm(string_value = "PUTAWAY")]
    Putaway,
    #[sea_orm(string_value = "PICKING")]
    Picking,
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "UNDO_LOADING")]
    UndoLoading,
    #[sea_orm(string_value = "RETURN")]
    Return,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
    #[sea_orm(string_value = "TERMINATED")]
    Terminated,
}

/// Append-only ledger of inventory movements.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    pub inventory_id: Uuid,
    pub seq: i32,
    pub pallet_id: String,
    pub transaction_type: InventoryTransactionType,
    pub ref_order_kind: Option<RefOrderKind>,
    pub ref_order_id: Option<Uuid>,
    pub qty_delta: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub weight_delta: Decimal,
    /// Quantity on the pallet after the change.
    pub qty: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub weight: Decimal,
    pub location_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: InventoryStatus,
    pub creator_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
