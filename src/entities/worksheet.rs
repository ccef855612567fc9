use super::worksheet_detail::TargetKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operation a worksheet batches.
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
pub enum WorksheetType {
    #[sea_orm(string_value = "UNLOADING")]
    Unloading,
    #[sea_orm(string_value = "PUTAWAY")]
    Putaway,
    #[sea_orm(string_value = "PICKING")]
    Picking,
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "VAS")]
    Vas,
    #[sea_orm(string_value = "CYCLE_COUNT")]
    CycleCount,
    #[sea_orm(string_value = "RETURN")]
    Return,
}

impl WorksheetType {
    /// Kind of order target the details of this worksheet type point at.
    pub fn target_kind(&self) -> TargetKind {
        match self {
            WorksheetType::Unloading => TargetKind::Product,
            WorksheetType::Vas => TargetKind::Vas,
            _ => TargetKind::Inventory,
        }
    }
}

/// Status shared by worksheets and their details.
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
pub enum WorksheetStatus {
    #[sea_orm(string_value = "DEACTIVATED")]
    Deactivated,
    #[sea_orm(string_value = "EXECUTING")]
    Executing,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "NOT_TALLY")]
    NotTally,
    #[sea_orm(string_value = "ADJUSTED")]
    Adjusted,
}

/// Which of the four reference-order tables `ref_order_id` points into.
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
pub enum RefOrderKind {
    #[sea_orm(string_value = "ARRIVAL_NOTICE")]
    ArrivalNotice,
    #[sea_orm(string_value = "RELEASE_GOOD")]
    ReleaseGood,
    #[sea_orm(string_value = "VAS_ORDER")]
    VasOrder,
    #[sea_orm(string_value = "INVENTORY_CHECK")]
    InventoryCheck,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worksheets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    /// Business partner (customer) the work is done for.
    pub bizplace_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub worksheet_type: WorksheetType,
    pub status: WorksheetStatus,
    pub ref_order_kind: RefOrderKind,
    pub ref_order_id: Uuid,
    pub buffer_location_id: Option<Uuid>,
    pub started_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::worksheet_detail::Entity")]
    WorksheetDetails,
}

impl Related<super::worksheet_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorksheetDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
