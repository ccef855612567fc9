//! Picking, including cross-dock picking straight from inbound pallets.

use crate::context::OperationContext;
use crate::entities::{
    inventory, order_inventory, worksheet_detail, InventoryStatus, InventoryTransactionType,
    OrderInventoryStatus, OrderStatus, WorksheetStatus, WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::order_targets::{OrderTarget, TargetStatus};
use crate::services::reconciliation::{merge_into, split_pick, Share};
use crate::services::reference_orders::RefOrderLink;
use crate::services::stock::{ensure_available, find_inventory, InventoryLedger, LocationOccupancy};
use crate::services::vas::VasWorksheetController;
use crate::services::worksheets::{
    check_worksheet_validity, DetailPatch, Expectation, WorksheetBundle, WorksheetController,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PickResult {
    pub detail: worksheet_detail::Model,
    pub target: order_inventory::Model,
    pub inventory: inventory::Model,
}

/// What a cross-dock contribution did to the picking worksheet.
#[derive(Debug, Clone)]
pub enum CrossDockOutcome {
    /// The pallet was bound to the current target, with the rest of the
    /// request carried by a new target and detail when there is any.
    Bound {
        picked: PickResult,
        remainder: Option<(order_inventory::Model, worksheet_detail::Model)>,
    },
    /// The contribution was folded into an already picked target.
    Merged {
        original: order_inventory::Model,
        inventory: inventory::Model,
        /// The current target, unless it was fully absorbed and deleted.
        current: Option<order_inventory::Model>,
    },
}

pub struct PickingWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> PickingWorksheetController<'a> {
    pub fn new(base: WorksheetController<'a>) -> Self {
        Self { base }
    }

    #[instrument(skip(self, ctx, changed))]
    pub async fn activate(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Picking)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(
                targets,
                TargetStatus::Inventory(OrderInventoryStatus::Picking),
                updater,
            )
            .await?;

        let ref_order = self.base.extract_ref_order(&worksheet).await?;
        let link = ref_order.link();
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::Picking, updater)
            .await?;

        VasWorksheetController::new(WorksheetController::new(self.base.txn(), self.base.names()))
            .activate_pending_for(ctx, link)
            .await?;

        let pending_split = order_inventory::Entity::delete_many()
            .filter(order_inventory::Column::RefOrderKind.eq(link.kind))
            .filter(order_inventory::Column::RefOrderId.eq(link.id))
            .filter(order_inventory::Column::Status.eq(OrderInventoryStatus::PendingSplit))
            .exec(self.base.txn())
            .await?;
        if pending_split.rows_affected > 0 {
            debug!(deleted = pending_split.rows_affected, "Dropped pending split targets");
        }

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    /// Picks a bound pallet for one detail.
    #[instrument(skip(self, ctx))]
    pub async fn execute_picking(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
        location_name: &str,
        release_qty: i32,
    ) -> Result<PickResult, ServiceError> {
        let (detail, target) = self.executing_detail(ctx, detail_name).await?;
        let inv = find_inventory(self.base.txn(), target.inventory_id).await?;
        if inv.pallet_id != pallet_id {
            return Err(ServiceError::precondition(format!(
                "Expected pallet value is {} but got {}",
                inv.pallet_id, pallet_id
            )));
        }

        let location = LocationOccupancy::new(self.base.txn())
            .find_by_name(ctx.domain_id, location_name)
            .await?;
        if inv.location_id != Some(location.id) {
            return Err(ServiceError::precondition(format!(
                "Pallet {} is not at location {}",
                inv.pallet_id, location.name
            )));
        }
        if release_qty != target.release_qty {
            return Err(ServiceError::precondition(format!(
                "Expected release qty value is {} but got {}",
                target.release_qty, release_qty
            )));
        }
        if inv.qty < release_qty {
            return Err(ServiceError::capacity("Release qty is bigger than what pallet has"));
        }
        ensure_available(&inv, release_qty)?;

        let share = Share::new(target.release_qty, target.release_weight);
        self.finish_pick(ctx, detail, target, inv, share).await
    }

    /// Picks from an inbound pallet for a cross-docking release.
    #[instrument(skip(self, ctx))]
    pub async fn cross_dock_picking(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
        release_qty: i32,
    ) -> Result<CrossDockOutcome, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();
        let (detail, target) = self.executing_detail(ctx, detail_name).await?;
        if !target.cross_docking {
            return Err(ServiceError::precondition(format!(
                "{} is not a cross docking target",
                target.name
            )));
        }

        let inv = inventory::Entity::find()
            .filter(inventory::Column::DomainId.eq(ctx.domain_id))
            .filter(inventory::Column::PalletId.eq(pallet_id))
            .filter(inventory::Column::Status.is_in([
                InventoryStatus::Stored,
                InventoryStatus::PartiallyUnloaded,
                InventoryStatus::Unloaded,
            ]))
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Failed to find inventory by passed pallet ID"))?;

        if target.batch_id.as_deref() != Some(inv.batch_id.as_str())
            || target.product_id != Some(inv.product_id)
            || target.packing_type.as_deref() != Some(inv.packing_type.as_str())
        {
            return Err(ServiceError::precondition("Pallet doesn't have same condition"));
        }

        let requested = Share::new(target.release_qty, target.release_weight);
        let split = split_pick(requested, Share::new(inv.qty, inv.weight), release_qty)?;
        ensure_available(&inv, split.claimed.qty)?;

        if let Some(original) = self.find_picked_original(&target, inv.id).await? {
            let (absorbed, left) =
                merge_into(Share::new(original.release_qty, original.release_weight), requested, split.claimed)?;

            let mut active: order_inventory::ActiveModel = original.into();
            active.release_qty = Set(absorbed.qty);
            active.release_weight = Set(absorbed.weight);
            active.updater_id = Set(updater);
            active.updated_at = Set(Utc::now());
            let original = active.update(txn).await?;

            let current = if left.is_empty() {
                detail.delete(txn).await?;
                target.delete(txn).await?;
                None
            } else {
                let mut active: order_inventory::ActiveModel = target.into();
                active.release_qty = Set(left.qty);
                active.release_weight = Set(left.weight);
                active.updater_id = Set(updater);
                active.updated_at = Set(Utc::now());
                Some(active.update(txn).await?)
            };

            let link = RefOrderLink::new(original.ref_order_kind, original.ref_order_id);
            let inventory = self.deduct_picked_stock(ctx, inv, split.claimed, link).await?;

            info!(original = %original.name, absorbed = absorbed.qty, "Cross dock pick merged");
            return Ok(CrossDockOutcome::Merged { original, inventory, current });
        }

        let remainder = if split.has_remainder() {
            let mut active = target.duplicate(
                self.base.names().order_inventory(),
                split.remainder.qty,
                split.remainder.weight,
                OrderInventoryStatus::Picking,
                updater,
            );
            active.inventory_id = Set(None);
            let remainder_target = active.insert(txn).await?;
            let remainder_detail = detail
                .duplicate(
                    self.base.names().worksheet_detail(WorksheetType::Picking),
                    remainder_target.id,
                    WorksheetStatus::Executing,
                    updater,
                )
                .insert(txn)
                .await?;
            Some((remainder_target, remainder_detail))
        } else {
            None
        };

        let mut active: order_inventory::ActiveModel = target.into();
        active.inventory_id = Set(Some(inv.id));
        active.release_qty = Set(split.claimed.qty);
        active.release_weight = Set(split.claimed.weight);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let target = active.update(txn).await?;

        let picked = self.finish_pick(ctx, detail, target, inv, split.claimed).await?;
        Ok(CrossDockOutcome::Bound { picked, remainder })
    }

    /// An already picked target of the same release and pallet whose detail
    /// is done.
    async fn find_picked_original(
        &self,
        target: &order_inventory::Model,
        inventory_id: Uuid,
    ) -> Result<Option<order_inventory::Model>, ServiceError> {
        let txn = self.base.txn();
        let candidates = order_inventory::Entity::find()
            .filter(order_inventory::Column::RefOrderKind.eq(target.ref_order_kind))
            .filter(order_inventory::Column::RefOrderId.eq(target.ref_order_id))
            .filter(order_inventory::Column::InventoryId.eq(inventory_id))
            .filter(order_inventory::Column::BatchId.eq(target.batch_id.clone()))
            .filter(order_inventory::Column::ProductId.eq(target.product_id))
            .filter(order_inventory::Column::PackingType.eq(target.packing_type.clone()))
            .filter(order_inventory::Column::Status.eq(OrderInventoryStatus::Picked))
            .filter(order_inventory::Column::Id.ne(target.id))
            .order_by_asc(order_inventory::Column::CreatedAt)
            .all(txn)
            .await?;

        for candidate in candidates {
            let done = worksheet_detail::Entity::find()
                .filter(worksheet_detail::Column::TargetId.eq(candidate.id))
                .filter(worksheet_detail::Column::WorksheetType.eq(WorksheetType::Picking))
                .filter(worksheet_detail::Column::Status.eq(WorksheetStatus::Done))
                .one(txn)
                .await?;
            if done.is_some() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn executing_detail(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
    ) -> Result<(worksheet_detail::Model, order_inventory::Model), ServiceError> {
        let detail = self.base.find_detail_by_name(ctx, detail_name).await?;
        if detail.worksheet_type != WorksheetType::Picking {
            return Err(ServiceError::precondition(format!(
                "Expected type value is {} but got {}",
                WorksheetType::Picking,
                detail.worksheet_type
            )));
        }
        if detail.status != WorksheetStatus::Executing {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                WorksheetStatus::Executing,
                detail.status
            )));
        }

        let target = self.base.order_targets().find_inventory_target(detail.target_id).await?;
        if target.status != OrderInventoryStatus::Picking {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                OrderInventoryStatus::Picking,
                target.status
            )));
        }
        Ok((detail, target))
    }

    async fn finish_pick(
        &self,
        ctx: &OperationContext,
        detail: worksheet_detail::Model,
        target: order_inventory::Model,
        inv: inventory::Model,
        share: Share,
    ) -> Result<PickResult, ServiceError> {
        let updater = ctx.updater()?;
        let link = RefOrderLink::new(target.ref_order_kind, target.ref_order_id);
        let inventory = self.deduct_picked_stock(ctx, inv, share, link).await?;

        let target = self
            .base
            .order_targets()
            .update_status(
                OrderTarget::Inventory(target),
                TargetStatus::Inventory(OrderInventoryStatus::Picked),
                updater,
            )
            .await?
            .into_inventory()?;
        let detail = self.base.set_detail_status(ctx, detail, WorksheetStatus::Done).await?;

        info!(detail = %detail.name, pallet_id = %inventory.pallet_id, qty = share.qty, "Pallet picked");
        Ok(PickResult { detail, target, inventory })
    }

    /// Takes `share` off the unlocked part of the pallet. An emptied pallet is
    /// terminated and its location re-derived.
    pub async fn deduct_picked_stock(
        &self,
        ctx: &OperationContext,
        inv: inventory::Model,
        share: Share,
        ref_order: RefOrderLink,
    ) -> Result<inventory::Model, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();

        if inv.qty < share.qty {
            return Err(ServiceError::capacity("Release qty is bigger than what pallet has"));
        }
        ensure_available(&inv, share.qty)?;
        let qty = inv.qty - share.qty;
        let weight = if qty == 0 { Decimal::ZERO } else { (inv.weight - share.weight).max(Decimal::ZERO) };
        let location_id = inv.location_id;

        let mut active: inventory::ActiveModel = inv.into();
        active.qty = Set(qty);
        active.weight = Set(weight);
        if qty == 0 {
            active.status = Set(InventoryStatus::Terminated);
        }
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let inventory = active.update(txn).await?;

        if qty == 0 {
            if let Some(location_id) = location_id {
                LocationOccupancy::new(txn).refresh(location_id, updater).await?;
            }
        }

        InventoryLedger::new(txn)
            .record(
                &inventory,
                Some(ref_order),
                InventoryTransactionType::Picking,
                -share.qty,
                -share.weight,
                updater,
            )
            .await?;

        Ok(inventory)
    }

    /// Closes the worksheet once every pallet is picked; the picked targets
    /// stay as they are for loading.
    #[instrument(skip(self, ctx))]
    pub async fn complete(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(&worksheet, &[Expectation::worksheet_type(WorksheetType::Picking)])?;

        let bundle = self.base.close_worksheet(ctx, worksheet).await?;
        let ref_order = self.base.extract_ref_order(&bundle.worksheet).await?;
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::Loading, updater)
            .await?;
        Ok(bundle)
    }
}
