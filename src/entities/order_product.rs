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
pub enum OrderProductStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "READY_TO_UNLOAD")]
    ReadyToUnload,
    #[sea_orm(string_value = "UNLOADING")]
    Unloading,
    #[sea_orm(string_value = "UNLOADED")]
    Unloaded,
    #[sea_orm(string_value = "TERMINATED")]
    Terminated,
}

/// Product line of an arrival notice; the unit of unloading work.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub arrival_notice_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: String,
    pub packing_type: String,
    pub pack_qty: i32,
    pub actual_pack_qty: i32,
    pub pallet_qty: Option<i32>,
    pub actual_pallet_qty: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub weight: Decimal,
    pub status: OrderProductStatus,
    pub remark: Option<String>,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
