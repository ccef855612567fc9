//! Typed access to the fulfillment unit a worksheet detail points at.

use crate::entities::{
    order_inventory, order_product, order_vas, worksheet_detail, OrderInventoryStatus,
    OrderProductStatus, OrderVasStatus, RefOrderKind,
};
use crate::errors::ServiceError;
use crate::services::reference_orders::RefOrderLink;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

pub use crate::entities::TargetKind;

/// A loaded order target. The variant is the link; there is no way to hold
/// two populated target links at once.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Product(order_product::Model),
    Inventory(order_inventory::Model),
    Vas(order_vas::Model),
}

impl OrderTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            OrderTarget::Product(_) => TargetKind::Product,
            OrderTarget::Inventory(_) => TargetKind::Inventory,
            OrderTarget::Vas(_) => TargetKind::Vas,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            OrderTarget::Product(m) => m.id,
            OrderTarget::Inventory(m) => m.id,
            OrderTarget::Vas(m) => m.id,
        }
    }

    /// The order this target was requested on. Product lines always hang off
    /// an arrival notice.
    pub fn ref_order(&self) -> RefOrderLink {
        match self {
            OrderTarget::Product(m) => RefOrderLink::new(RefOrderKind::ArrivalNotice, m.arrival_notice_id),
            OrderTarget::Inventory(m) => RefOrderLink::new(m.ref_order_kind, m.ref_order_id),
            OrderTarget::Vas(m) => RefOrderLink::new(m.ref_order_kind, m.ref_order_id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OrderTarget::Product(m) => &m.name,
            OrderTarget::Inventory(m) => &m.name,
            OrderTarget::Vas(m) => &m.name,
        }
    }

    pub fn status(&self) -> TargetStatus {
        match self {
            OrderTarget::Product(m) => TargetStatus::Product(m.status),
            OrderTarget::Inventory(m) => TargetStatus::Inventory(m.status),
            OrderTarget::Vas(m) => TargetStatus::Vas(m.status),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.status() == TargetStatus::terminated(self.kind())
    }

    pub fn as_inventory(&self) -> Option<&order_inventory::Model> {
        match self {
            OrderTarget::Inventory(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_inventory(self) -> Result<order_inventory::Model, ServiceError> {
        match self {
            OrderTarget::Inventory(m) => Ok(m),
            other => Err(ServiceError::precondition(format!(
                "Expected target value is {} but got {}",
                TargetKind::Inventory,
                other.kind()
            ))),
        }
    }

    pub fn into_product(self) -> Result<order_product::Model, ServiceError> {
        match self {
            OrderTarget::Product(m) => Ok(m),
            other => Err(ServiceError::precondition(format!(
                "Expected target value is {} but got {}",
                TargetKind::Product,
                other.kind()
            ))),
        }
    }
}

/// A status value tagged with the target kind it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    Product(OrderProductStatus),
    Inventory(OrderInventoryStatus),
    Vas(OrderVasStatus),
}

impl TargetStatus {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetStatus::Product(_) => TargetKind::Product,
            TargetStatus::Inventory(_) => TargetKind::Inventory,
            TargetStatus::Vas(_) => TargetKind::Vas,
        }
    }

    /// Terminal status for targets of `kind`.
    pub fn terminated(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Product => TargetStatus::Product(OrderProductStatus::Terminated),
            TargetKind::Inventory => TargetStatus::Inventory(OrderInventoryStatus::Terminated),
            TargetKind::Vas => TargetStatus::Vas(OrderVasStatus::Terminated),
        }
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Product(s) => std::fmt::Display::fmt(s, f),
            TargetStatus::Inventory(s) => std::fmt::Display::fmt(s, f),
            TargetStatus::Vas(s) => std::fmt::Display::fmt(s, f),
        }
    }
}

pub struct OrderTargetGateway<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> OrderTargetGateway<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find(&self, kind: TargetKind, id: Uuid) -> Result<OrderTarget, ServiceError> {
        let found = match kind {
            TargetKind::Product => order_product::Entity::find_by_id(id)
                .one(self.txn)
                .await?
                .map(OrderTarget::Product),
            TargetKind::Inventory => order_inventory::Entity::find_by_id(id)
                .one(self.txn)
                .await?
                .map(OrderTarget::Inventory),
            TargetKind::Vas => order_vas::Entity::find_by_id(id)
                .one(self.txn)
                .await?
                .map(OrderTarget::Vas),
        };

        found.ok_or_else(|| ServiceError::not_found(format!("Failed to find {} target ({})", kind, id)))
    }

    pub async fn find_inventory_target(
        &self,
        id: Uuid,
    ) -> Result<order_inventory::Model, ServiceError> {
        self.find(TargetKind::Inventory, id).await?.into_inventory()
    }

    /// Loads the target of every detail, returned in detail order.
    pub async fn find_for_details(
        &self,
        details: &[worksheet_detail::Model],
    ) -> Result<Vec<OrderTarget>, ServiceError> {
        let mut by_kind: HashMap<TargetKind, Vec<Uuid>> = HashMap::new();
        for detail in details {
            by_kind.entry(detail.target_kind).or_default().push(detail.target_id);
        }

        let mut loaded: HashMap<Uuid, OrderTarget> = HashMap::new();
        for (kind, ids) in by_kind {
            match kind {
                TargetKind::Product => {
                    for m in order_product::Entity::find()
                        .filter(order_product::Column::Id.is_in(ids))
                        .all(self.txn)
                        .await?
                    {
                        loaded.insert(m.id, OrderTarget::Product(m));
                    }
                }
                TargetKind::Inventory => {
                    for m in order_inventory::Entity::find()
                        .filter(order_inventory::Column::Id.is_in(ids))
                        .all(self.txn)
                        .await?
                    {
                        loaded.insert(m.id, OrderTarget::Inventory(m));
                    }
                }
                TargetKind::Vas => {
                    for m in order_vas::Entity::find()
                        .filter(order_vas::Column::Id.is_in(ids))
                        .all(self.txn)
                        .await?
                    {
                        loaded.insert(m.id, OrderTarget::Vas(m));
                    }
                }
            }
        }

        details
            .iter()
            .map(|detail| {
                loaded.get(&detail.target_id).cloned().ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "Failed to find target of worksheet detail {}",
                        detail.name
                    ))
                })
            })
            .collect()
    }

    /// Writes `status` to `target`.
    ///
    /// Re-terminating a terminated target is a no-op so completion never
    /// double-terminates; any other change to a terminated target fails.
    #[instrument(skip(self, target), fields(target = %target.name()))]
    pub async fn update_status(
        &self,
        target: OrderTarget,
        status: TargetStatus,
        updater_id: Uuid,
    ) -> Result<OrderTarget, ServiceError> {
        if target.id().is_nil() {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }
        if updater_id.is_nil() {
            return Err(ServiceError::precondition("Cannot update without updater"));
        }
        if target.kind() != status.kind() {
            return Err(ServiceError::precondition(format!(
                "Expected target value is {} but got {}",
                status.kind(),
                target.kind()
            )));
        }
        if target.is_terminated() {
            if status == TargetStatus::terminated(target.kind()) {
                return Ok(target);
            }
            return Err(ServiceError::precondition(format!(
                "Target {} is already TERMINATED",
                target.name()
            )));
        }
        debug!(from = %target.status(), to = %status, "Updating order target status");

        let now = Utc::now();
        let updated = match (target, status) {
            (OrderTarget::Product(model), TargetStatus::Product(status)) => {
                let mut active: order_product::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                OrderTarget::Product(active.update(self.txn).await?)
            }
            (OrderTarget::Inventory(model), TargetStatus::Inventory(status)) => {
                let mut active: order_inventory::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                OrderTarget::Inventory(active.update(self.txn).await?)
            }
            (OrderTarget::Vas(model), TargetStatus::Vas(status)) => {
                let mut active: order_vas::ActiveModel = model.into();
                active.status = Set(status);
                active.updater_id = Set(updater_id);
                active.updated_at = Set(now);
                OrderTarget::Vas(active.update(self.txn).await?)
            }
            (target, status) => {
                return Err(ServiceError::InternalError(format!(
                    "{} target can't take {} status",
                    target.kind(),
                    status.kind()
                )))
            }
        };

        Ok(updated)
    }

    pub async fn update_statuses(
        &self,
        targets: Vec<OrderTarget>,
        status: TargetStatus,
        updater_id: Uuid,
    ) -> Result<Vec<OrderTarget>, ServiceError> {
        let mut updated = Vec::with_capacity(targets.len());
        for target in targets {
            updated.push(self.update_status(target, status, updater_id).await?);
        }
        Ok(updated)
    }

    /// Terminates every target, each with the terminal status of its own kind.
    pub async fn terminate_all(
        &self,
        targets: Vec<OrderTarget>,
        updater_id: Uuid,
    ) -> Result<Vec<OrderTarget>, ServiceError> {
        let mut updated = Vec::with_capacity(targets.len());
        for target in targets {
            let status = TargetStatus::terminated(target.kind());
            updated.push(self.update_status(target, status, updater_id).await?);
        }
        Ok(updated)
    }
}
