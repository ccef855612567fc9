use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

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
pub enum InventoryStatus {
    #[sea_orm(string_value = "STORED")]
    Stored,
    #[sea_orm(string_value = "OCCUPIED")]
    Occupied,
    #[sea_orm(string_value = "PARTIALLY_UNLOADED")]
    PartiallyUnloaded,
    #[sea_orm(string_value = "UNLOADED")]
    Unloaded,
    #[sea_orm(string_value = "TERMINATED")]
    Terminated,
}

/// One pallet of physical stock.
///
/// `locked_qty` / `locked_weight` hold the portion claimed by in-flight
/// order targets and return to zero when the claim is released.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    pub pallet_id: String,
    pub batch_id: String,
    pub product_id: Uuid,
    pub packing_type: String,
    pub qty: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub weight: Decimal,
    pub locked_qty: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub locked_weight: Decimal,
    pub location_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: InventoryStatus,
    /// Sequence of the latest history record.
    pub last_seq: i32,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
