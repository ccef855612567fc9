//! Inventory history ledger and location occupancy.

use crate::entities::{
    inventory, inventory_history, location, InventoryStatus, InventoryTransactionType,
    LocationStatus,
};
use crate::errors::ServiceError;
use crate::services::reference_orders::RefOrderLink;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use tracing::{debug, instrument};
use uuid::Uuid;

pub async fn find_inventory(
    txn: &DatabaseTransaction,
    inventory_id: Option<Uuid>,
) -> Result<inventory::Model, ServiceError> {
    let id = inventory_id
        .ok_or_else(|| ServiceError::precondition("Target doesn't have inventory"))?;
    inventory::Entity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Failed to find inventory ({})", id)))
}

/// Quantity on the pallet that no open cycle count has claimed.
pub fn available_qty(inv: &inventory::Model) -> i32 {
    (inv.qty - inv.locked_qty).max(0)
}

/// Fails unless `qty` can come off the pallet without touching locked stock.
pub fn ensure_available(inv: &inventory::Model, qty: i32) -> Result<(), ServiceError> {
    let available = available_qty(inv);
    if available < qty {
        return Err(ServiceError::capacity(format!(
            "Pallet {} has {} available but {} was requested",
            inv.pallet_id, available, qty
        )));
    }
    Ok(())
}

/// A pallet held by a cycle count can't change location or quantity.
pub fn ensure_unlocked(inv: &inventory::Model) -> Result<(), ServiceError> {
    if inv.locked_qty > 0 {
        return Err(ServiceError::capacity(format!(
            "Pallet {} is locked by a cycle count",
            inv.pallet_id
        )));
    }
    Ok(())
}

/// Appends inventory history records.
pub struct InventoryLedger<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> InventoryLedger<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Records a change of `inventory`, which must already hold its
    /// post-change values. The sequence number continues from the row's
    /// persisted `last_seq`.
    #[instrument(skip(self, inventory), fields(pallet_id = %inventory.pallet_id))]
    pub async fn record(
        &self,
        inventory: &inventory::Model,
        ref_order: Option<RefOrderLink>,
        transaction_type: InventoryTransactionType,
        qty_delta: i32,
        weight_delta: Decimal,
        actor: Uuid,
    ) -> Result<inventory_history::Model, ServiceError> {
        let last_seq = inventory::Entity::find_by_id(inventory.id)
            .one(self.txn)
            .await?
            .map(|current| current.last_seq)
            .unwrap_or(inventory.last_seq);
        let seq = last_seq + 1;

        inventory::Entity::update_many()
            .col_expr(inventory::Column::LastSeq, Expr::value(seq))
            .filter(inventory::Column::Id.eq(inventory.id))
            .exec(self.txn)
            .await?;

        let history = inventory_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(inventory.domain_id),
            bizplace_id: Set(inventory.bizplace_id),
            inventory_id: Set(inventory.id),
            seq: Set(seq),
            pallet_id: Set(inventory.pallet_id.clone()),
            transaction_type: Set(transaction_type),
            ref_order_kind: Set(ref_order.map(|link| link.kind)),
            ref_order_id: Set(ref_order.map(|link| link.id)),
            qty_delta: Set(qty_delta),
            weight_delta: Set(weight_delta),
            qty: Set(inventory.qty),
            weight: Set(inventory.weight),
            location_id: Set(inventory.location_id),
            warehouse_id: Set(inventory.warehouse_id),
            status: Set(inventory.status),
            creator_id: Set(actor),
            created_at: Set(Utc::now()),
        }
        .insert(self.txn)
        .await?;

        debug!(seq, %transaction_type, qty_delta, %weight_delta, "Inventory history recorded");
        Ok(history)
    }
}

/// Keeps `location.status` in line with the STORED inventory it holds.
pub struct LocationOccupancy<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> LocationOccupancy<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<location::Model, ServiceError> {
        location::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Failed to find location ({})", id)))
    }

    pub async fn find_by_name(
        &self,
        domain_id: Uuid,
        name: &str,
    ) -> Result<location::Model, ServiceError> {
        location::Entity::find()
            .filter(location::Column::DomainId.eq(domain_id))
            .filter(location::Column::Name.eq(name))
            .one(self.txn)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("Failed to find location by name {}", name))
            })
    }

    /// Number of STORED inventories at `location_id`, leaving out `excluding`.
    pub async fn stored_count(
        &self,
        location_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<u64, ServiceError> {
        let mut query = inventory::Entity::find()
            .filter(inventory::Column::LocationId.eq(location_id))
            .filter(inventory::Column::Status.eq(InventoryStatus::Stored));
        if let Some(id) = excluding {
            query = query.filter(inventory::Column::Id.ne(id));
        }
        Ok(query.count(self.txn).await?)
    }

    /// Sets location statuses ahead of moving `moving_id` from `from` to `to`.
    ///
    /// Counts are taken before the inventory row is written, so the moving
    /// record is excluded from both sides.
    #[instrument(skip(self))]
    pub async fn prepare_move(
        &self,
        from: Option<Uuid>,
        to: Uuid,
        moving_id: Uuid,
        actor: Uuid,
    ) -> Result<(), ServiceError> {
        if from == Some(to) {
            return Ok(());
        }

        if let Some(from) = from {
            if self.stored_count(from, Some(moving_id)).await? == 0 {
                self.set_status(from, LocationStatus::Empty, actor).await?;
            }
        }

        self.set_status(to, LocationStatus::Stored, actor).await?;
        Ok(())
    }

    /// Re-derives the status of `location_id` from the inventory it holds.
    pub async fn refresh(
        &self,
        location_id: Uuid,
        actor: Uuid,
    ) -> Result<location::Model, ServiceError> {
        let status = if self.stored_count(location_id, None).await? > 0 {
            LocationStatus::Stored
        } else {
            LocationStatus::Empty
        };
        self.set_status(location_id, status, actor).await
    }

    async fn set_status(
        &self,
        location_id: Uuid,
        status: LocationStatus,
        actor: Uuid,
    ) -> Result<location::Model, ServiceError> {
        let current = self.find_by_id(location_id).await?;
        if current.status == status {
            return Ok(current);
        }
        debug!(location = %current.name, from = %current.status, to = %status, "Location status changed");

        let mut active: location::ActiveModel = current.into();
        active.status = Set(status);
        active.updater_id = Set(actor);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.txn).await?)
    }
}
