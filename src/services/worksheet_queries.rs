//! Read-only worksheet queries. These run on the pool directly; they never
//! need a unit of work.

use crate::entities::{
    arrival_notice, inventory_check, release_good, vas_order, worksheet, worksheet_detail,
    RefOrderKind, WorksheetStatus, WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::worksheets::WorksheetBundle;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorksheetFilter {
    pub worksheet_type: Option<WorksheetType>,
    pub status: Option<WorksheetStatus>,
    pub bizplace_id: Option<Uuid>,
    /// Name of the reference order, whichever kind it is.
    pub ref_order_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListWorksheetsQuery {
    pub domain_id: Uuid,
    pub filter: WorksheetFilter,
    #[validate(range(min = 1))]
    pub page: u64,
    #[validate(range(min = 1, max = 500))]
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorksheetPage {
    pub items: Vec<worksheet::Model>,
    pub total: u64,
}

#[async_trait]
impl Query for ListWorksheetsQuery {
    type Result = WorksheetPage;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let mut condition = Condition::all().add(worksheet::Column::DomainId.eq(self.domain_id));
        if let Some(worksheet_type) = self.filter.worksheet_type {
            condition = condition.add(worksheet::Column::WorksheetType.eq(worksheet_type));
        }
        if let Some(status) = self.filter.status {
            condition = condition.add(worksheet::Column::Status.eq(status));
        }
        if let Some(bizplace_id) = self.filter.bizplace_id {
            condition = condition.add(worksheet::Column::BizplaceId.eq(bizplace_id));
        }
        if let Some(name) = &self.filter.ref_order_name {
            let ids = ref_order_ids_by_name(db_pool, self.domain_id, name).await?;
            if ids.is_empty() {
                return Ok(WorksheetPage { items: Vec::new(), total: 0 });
            }
            let mut any = Condition::any();
            for (kind, id) in ids {
                any = any.add(
                    Condition::all()
                        .add(worksheet::Column::RefOrderKind.eq(kind))
                        .add(worksheet::Column::RefOrderId.eq(id)),
                );
            }
            condition = condition.add(any);
        }

        let paginator = worksheet::Entity::find()
            .filter(condition)
            .order_by_desc(worksheet::Column::CreatedAt)
            .paginate(db_pool, self.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(self.page - 1).await?;

        Ok(WorksheetPage { items, total })
    }
}

async fn ref_order_ids_by_name(
    db: &DatabaseConnection,
    domain_id: Uuid,
    name: &str,
) -> Result<Vec<(RefOrderKind, Uuid)>, ServiceError> {
    let mut ids = Vec::new();

    let arrivals: Vec<Uuid> = arrival_notice::Entity::find()
        .select_only()
        .column(arrival_notice::Column::Id)
        .filter(arrival_notice::Column::DomainId.eq(domain_id))
        .filter(arrival_notice::Column::Name.eq(name))
        .into_tuple()
        .all(db)
        .await?;
    ids.extend(arrivals.into_iter().map(|id| (RefOrderKind::ArrivalNotice, id)));

    let releases: Vec<Uuid> = release_good::Entity::find()
        .select_only()
        .column(release_good::Column::Id)
        .filter(release_good::Column::DomainId.eq(domain_id))
        .filter(release_good::Column::Name.eq(name))
        .into_tuple()
        .all(db)
        .await?;
    ids.extend(releases.into_iter().map(|id| (RefOrderKind::ReleaseGood, id)));

    let vas_orders: Vec<Uuid> = vas_order::Entity::find()
        .select_only()
        .column(vas_order::Column::Id)
        .filter(vas_order::Column::DomainId.eq(domain_id))
        .filter(vas_order::Column::Name.eq(name))
        .into_tuple()
        .all(db)
        .await?;
    ids.extend(vas_orders.into_iter().map(|id| (RefOrderKind::VasOrder, id)));

    let checks: Vec<Uuid> = inventory_check::Entity::find()
        .select_only()
        .column(inventory_check::Column::Id)
        .filter(inventory_check::Column::DomainId.eq(domain_id))
        .filter(inventory_check::Column::Name.eq(name))
        .into_tuple()
        .all(db)
        .await?;
    ids.extend(checks.into_iter().map(|id| (RefOrderKind::InventoryCheck, id)));

    Ok(ids)
}

/// A worksheet by name, with all of its details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWorksheetQuery {
    pub domain_id: Uuid,
    pub name: String,
}

#[async_trait]
impl Query for GetWorksheetQuery {
    type Result = WorksheetBundle;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let worksheet = worksheet::Entity::find()
            .filter(worksheet::Column::DomainId.eq(self.domain_id))
            .filter(worksheet::Column::Name.eq(self.name.as_str()))
            .one(db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "There's no results matched with condition worksheet name: {}",
                    self.name
                ))
            })?;

        let details = worksheet_detail::Entity::find()
            .filter(worksheet_detail::Column::WorksheetId.eq(worksheet.id))
            .order_by_asc(worksheet_detail::Column::CreatedAt)
            .order_by_asc(worksheet_detail::Column::Name)
            .all(db_pool)
            .await?;

        Ok(WorksheetBundle { worksheet, details })
    }
}
