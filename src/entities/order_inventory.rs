use super::worksheet::RefOrderKind;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
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
pub enum OrderInventoryStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PENDING_SPLIT")]
    PendingSplit,
    #[sea_orm(string_value = "READY_TO_PICK")]
    ReadyToPick,
    #[sea_orm(string_value = "PICKING")]
    Picking,
    #[sea_orm(string_value = "PICKED")]
    Picked,
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "LOADED")]
    Loaded,
    #[sea_orm(string_value = "PUTTING_AWAY")]
    PuttingAway,
    #[sea_orm(string_value = "STORED")]
    Stored,
    #[sea_orm(string_value = "RETURNING")]
    Returning,
    #[sea_orm(string_value = "INSPECTING")]
    Inspecting,
    #[sea_orm(string_value = "INSPECTED")]
    Inspected,
    #[sea_orm(string_value = "NOT_TALLY")]
    NotTally,
    #[sea_orm(string_value = "TERMINATED")]
    Terminated,
}

/// Claim against physical inventory: a release, a putaway, a return or a
/// cycle-count line depending on the reference order it belongs to.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_inventories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub ref_order_kind: RefOrderKind,
    pub ref_order_id: Uuid,
    /// Physical stock this claim is bound to, once bound.
    pub inventory_id: Option<Uuid>,
    pub delivery_order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<String>,
    pub packing_type: Option<String>,
    pub release_qty: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub release_weight: Decimal,
    pub inspected_qty: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub inspected_weight: Option<Decimal>,
    pub inspected_location_id: Option<Uuid>,
    pub cross_docking: bool,
    pub status: OrderInventoryStatus,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Copy of this claim under a new identity, carrying `release_qty` and
    /// `release_weight` instead of the original amounts.
    pub fn duplicate(
        &self,
        name: String,
        release_qty: i32,
        release_weight: Decimal,
        status: OrderInventoryStatus,
        actor: Uuid,
    ) -> ActiveModel {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name),
            ref_order_kind: Set(self.ref_order_kind),
            ref_order_id: Set(self.ref_order_id),
            inventory_id: Set(self.inventory_id),
            delivery_order_id: Set(None),
            product_id: Set(self.product_id),
            batch_id: Set(self.batch_id.clone()),
            packing_type: Set(self.packing_type.clone()),
            release_qty: Set(release_qty),
            release_weight: Set(release_weight),
            inspected_qty: Set(None),
            inspected_weight: Set(None),
            inspected_location_id: Set(None),
            cross_docking: Set(self.cross_docking),
            status: Set(status),
            creator_id: Set(actor),
            updater_id: Set(actor),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
