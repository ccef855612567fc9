use super::worksheet::{WorksheetStatus, WorksheetType};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Which of the three order-target tables `target_id` points into.
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
pub enum TargetKind {
    #[sea_orm(string_value = "PRODUCT")]
    Product,
    #[sea_orm(string_value = "INVENTORY")]
    Inventory,
    #[sea_orm(string_value = "VAS")]
    Vas,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worksheet_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub domain_id: Uuid,
    pub bizplace_id: Uuid,
    pub worksheet_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub worksheet_type: WorksheetType,
    pub status: WorksheetStatus,
    pub description: Option<String>,
    pub remark: Option<String>,
    pub issue: Option<String>,
    pub target_kind: TargetKind,
    pub target_id: Uuid,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// New detail in the same worksheet pointing at another target.
    pub fn duplicate(
        &self,
        name: String,
        target_id: Uuid,
        status: WorksheetStatus,
        actor: Uuid,
    ) -> ActiveModel {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.domain_id),
            bizplace_id: Set(self.bizplace_id),
            worksheet_id: Set(self.worksheet_id),
            name: Set(name),
            worksheet_type: Set(self.worksheet_type),
            status: Set(status),
            description: Set(self.description.clone()),
            remark: Set(self.remark.clone()),
            issue: Set(None),
            target_kind: Set(self.target_kind),
            target_id: Set(target_id),
            from_location_id: Set(self.from_location_id),
            to_location_id: Set(self.to_location_id),
            creator_id: Set(actor),
            updater_id: Set(actor),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::worksheet::Entity",
        from = "Column::WorksheetId",
        to = "super::worksheet::Column::Id"
    )]
    Worksheet,
}

impl Related<super::worksheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Worksheet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
