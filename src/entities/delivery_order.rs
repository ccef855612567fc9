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
pub enum DeliveryOrderStatus {
    #[sea_orm(string_value = "READY_TO_DISPATCH")]
    ReadyToDispatch,
    #[sea_orm(string_value = "DELIVERING")]
    Delivering,
    #[sea_orm(string_value = "DONE")]
    Done,
}

/// Delivery grouping the pallets loaded onto one vehicle.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub release_good_id: Uuid,
    pub status: DeliveryOrderStatus,
    pub own_collection: bool,
    pub truck_no: Option<String>,
    pub delivery_date: Option<Date>,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
