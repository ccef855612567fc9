//! Typed access to the order a worksheet serves.

use crate::entities::{arrival_notice, inventory_check, release_good, vas_order, OrderStatus};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

pub use crate::entities::RefOrderKind;

/// Pointer to a reference order: which table, which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefOrderLink {
    pub kind: RefOrderKind,
    pub id: Uuid,
}

impl RefOrderLink {
    pub fn new(kind: RefOrderKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// A loaded reference order. Exactly one variant, so exactly one link.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOrder {
    ArrivalNotice(arrival_notice::Model),
    ReleaseGood(release_good::Model),
    VasOrder(vas_order::Model),
    InventoryCheck(inventory_check::Model),
}

impl RefOrder {
    pub fn kind(&self) -> RefOrderKind {
        match self {
            RefOrder::ArrivalNotice(_) => RefOrderKind::ArrivalNotice,
            RefOrder::ReleaseGood(_) => RefOrderKind::ReleaseGood,
            RefOrder::VasOrder(_) => RefOrderKind::VasOrder,
            RefOrder::InventoryCheck(_) => RefOrderKind::InventoryCheck,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RefOrder::ArrivalNotice(m) => m.id,
            RefOrder::ReleaseGood(m) => m.id,
            RefOrder::VasOrder(m) => m.id,
            RefOrder::InventoryCheck(m) => m.id,
        }
    }

    pub fn link(&self) -> RefOrderLink {
        RefOrderLink::new(self.kind(), self.id())
    }

    pub fn name(&self) -> &str {
        match self {
            RefOrder::ArrivalNotice(m) => &m.name,
            RefOrder::ReleaseGood(m) => &m.name,
            RefOrder::VasOrder(m) => &m.name,
            RefOrder::InventoryCheck(m) => &m.name,
        }
    }

    pub fn domain_id(&self) -> Uuid {
        match self {
            RefOrder::ArrivalNotice(m) => m.domain_id,
            RefOrder::ReleaseGood(m) => m.domain_id,
            RefOrder::VasOrder(m) => m.domain_id,
            RefOrder::InventoryCheck(m) => m.domain_id,
        }
    }

    pub fn bizplace_id(&self) -> Uuid {
        match self {
            RefOrder::ArrivalNotice(m) => m.bizplace_id,
            RefOrder::ReleaseGood(m) => m.bizplace_id,
            RefOrder::VasOrder(m) => m.bizplace_id,
            RefOrder::InventoryCheck(m) => m.bizplace_id,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            RefOrder::ArrivalNotice(m) => m.status,
            RefOrder::ReleaseGood(m) => m.status,
            RefOrder::VasOrder(m) => m.status,
            RefOrder::InventoryCheck(m) => m.status,
        }
    }

    pub fn into_arrival_notice(self) -> Result<arrival_notice::Model, ServiceError> {
        match self {
            RefOrder::ArrivalNotice(m) => Ok(m),
            other => Err(unexpected_kind(RefOrderKind::ArrivalNotice, &other)),
        }
    }

    pub fn into_release_good(self) -> Result<release_good::Model, ServiceError> {
        match self {
            RefOrder::ReleaseGood(m) => Ok(m),
            other => Err(unexpected_kind(RefOrderKind::ReleaseGood, &other)),
        }
    }

    pub fn into_inventory_check(self) -> Result<inventory_check::Model, ServiceError> {
        match self {
            RefOrder::InventoryCheck(m) => Ok(m),
            other => Err(unexpected_kind(RefOrderKind::InventoryCheck, &other)),
        }
    }
}

fn unexpected_kind(expected: RefOrderKind, actual: &RefOrder) -> ServiceError {
    ServiceError::precondition(format!(
        "Expected reference order value is {} but got {}",
        expected,
        actual.kind()
    ))
}

/// Lookup and status updates of reference orders inside a unit of work.
pub struct ReferenceOrderGateway<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> ReferenceOrderGateway<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Resolves a link, failing with `NotFound` when the row is gone.
    pub async fn find(&self, link: RefOrderLink) -> Result<RefOrder, ServiceError> {
        let found = match link.kind {
            RefOrderKind::ArrivalNotice => arrival_notice::Entity::find_by_id(link.id)
                .one(self.txn)
                .await?
                .map(RefOrder::ArrivalNotice),
            RefOrderKind::ReleaseGood => release_good::Entity::find_by_id(link.id)
                .one(self.txn)
                .await?
                .map(RefOrder::ReleaseGood),
            RefOrderKind::VasOrder => vas_order::Entity::find_by_id(link.id)
                .one(self.txn)
                .await?
                .map(RefOrder::VasOrder),
            RefOrderKind::InventoryCheck => inventory_check::Entity::find_by_id(link.id)
                .one(self.txn)
                .await?
                .map(RefOrder::InventoryCheck),
        };

        found.ok_or_else(|| {
            ServiceError::not_found(format!("Failed to find {} ({})", link.kind, link.id))
        })
    }

    /// Finds a reference order of `kind` by name, optionally requiring a status.
    pub async fn find_by_name(
        &self,
        domain_id: Uuid,
        kind: RefOrderKind,
        name: &str,
        status: Option<OrderStatus>,
    ) -> Result<RefOrder, ServiceError> {
        let found = match kind {
            RefOrderKind::ArrivalNotice => {
                let mut query = arrival_notice::Entity::find()
                    .filter(arrival_notice::Column::DomainId.eq(domain_id))
                    .filter(arrival_notice::Column::Name.eq(name));
                if let Some(status) = status {
                    query = query.filter(arrival_notice::Column::Status.eq(status));
                }
                query.one(self.txn).await?.map(RefOrder::ArrivalNotice)
            }
            RefOrderKind::ReleaseGood => {
                let mut query = release_good::Entity::find()
                    .filter(release_good::Column::DomainId.eq(domain_id))
                    .filter(release_good::Column::Name.eq(name));
                if let Some(status) = status {
                    query = query.filter(release_good::Column::Status.eq(status));
                }
                query.one(self.txn).await?.map(RefOrder::ReleaseGood)
            }
            RefOrderKind::VasOrder => {
                let mut query = vas_order::Entity::find()
                    .filter(vas_order::Column::DomainId.eq(domain_id))
                    .filter(vas_order::Column::Name.eq(name));
                if let Some(status) = status {
                    query = query.filter(vas_order::Column::Status.eq(status));
                }
                query.one(self.txn).await?.map(RefOrder::VasOrder)
            }
            RefOrderKind::InventoryCheck => {
                let mut query = inventory_check::Entity::find()
                    .filter(inventory_check::Column::DomainId.eq(domain_id))
                    .filter(inventory_check::Column::Name.eq(name));
                if let Some(status) = status {
                    query = query.filter(inventory_check::Column::Status.eq(status));
                }
                query.one(self.txn).await?.map(RefOrder::InventoryCheck)
            }
        };

        found.ok_or_else(|| match status {
            Some(status) => ServiceError::not_found(format!(
                "There's no results matched with condition {} name: {}, status: {}",
                kind, name, status
            )),
            None => ServiceError::not_found(format!(
                "There's no results matched with condition {} name: {}",
                kind, name
            )),
        })
    }

    /// Applies `status` to the reference order and returns the saved record.
    #[instrument(skip(self, ref_order), fields(ref_order = %ref_order.name()))]
    pub async fn update_status(
        &self,
        ref_order: RefOrder,
        status: OrderStatus,
        updater_id: Uuid,
    ) -> Result<RefOrder, ServiceError> {
        if ref_order.id().is_nil() {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }
        if updater_id.is_nil() {
            return Err(ServiceError::precondition("Cannot update without updater"));
        }
        debug!(from = %ref_order.status(), to = %status, "Updating reference order status");

        let now = Utc::now();
        let updated = match ref_order {
            RefOrder::ArrivalNotice(model) => {
                let mut active: arrival_notice::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                RefOrder::ArrivalNotice(active.update(self.txn).await?)
            }
            RefOrder::ReleaseGood(model) => {
                let mut active: release_good::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                RefOrder::ReleaseGood(active.update(self.txn).await?)
            }
            RefOrder::VasOrder(model) => {
                let mut active: vas_order::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                RefOrder::VasOrder(active.update(self.txn).await?)
            }
            RefOrder::InventoryCheck(model) => {
                let mut active: inventory_check::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                RefOrder::InventoryCheck(active.update(self.txn).await?)
            }
        };

        Ok(updated)
    }
}
