//! Unloading arriving pallets and putting them away.

use crate::context::OperationContext;
use crate::entities::{
    inventory, inventory_history, order_inventory, order_product, release_good, worksheet,
    worksheet_detail, InventoryStatus, InventoryTransactionType, OrderInventoryStatus,
    OrderProductStatus, OrderStatus, RefOrderKind, WorksheetStatus, WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::order_targets::{OrderTarget, TargetStatus};
use crate::services::picking::PickingWorksheetController;
use crate::services::reconciliation::Share;
use crate::services::reference_orders::RefOrderLink;
use crate::services::stock::{ensure_unlocked, find_inventory, InventoryLedger, LocationOccupancy};
use crate::services::vas::VasWorksheetController;
use crate::services::worksheets::{
    check_worksheet_validity, DetailExtras, DetailPatch, Expectation, WorksheetBundle,
    WorksheetController, WorksheetExtras,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Planned pallet count override for one product line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletQtyPatch {
    pub order_product_name: String,
    pub pallet_qty: i32,
}

#[derive(Debug, Clone)]
pub struct PalletMovement {
    pub detail: worksheet_detail::Model,
    pub inventory: inventory::Model,
}

pub struct InboundWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> InboundWorksheetController<'a> {
    pub fn new(base: WorksheetController<'a>) -> Self {
        Self { base }
    }

    fn sibling(&self) -> WorksheetController<'a> {
        WorksheetController::new(self.base.txn(), self.base.names())
    }

    #[instrument(skip(self, ctx, pallet_patches, changed))]
    pub async fn activate_unloading(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
        pallet_patches: &[PalletQtyPatch],
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Unloading)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        for target in self.base.order_targets().find_for_details(&details).await? {
            let product = target.into_product()?;
            let patch = pallet_patches.iter().find(|p| p.order_product_name == product.name);
            let mut active: order_product::ActiveModel = product.into();
            if let Some(patch) = patch {
                active.pallet_qty = Set(Some(patch.pallet_qty));
            }
            active.status = Set(OrderProductStatus::Unloading);
            active.updater_id = Set(updater);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
        }

        let arrival_notice = self.base.extract_ref_order(&worksheet).await?;
        let link = arrival_notice.link();
        let arrival_notice = self
            .base
            .reference_orders()
            .update_status(arrival_notice, OrderStatus::Processing, updater)
            .await?
            .into_arrival_notice()?;

        VasWorksheetController::new(self.sibling())
            .activate_pending_for(ctx, link)
            .await?;

        if arrival_notice.cross_docking {
            self.activate_cross_dock_picking(ctx, arrival_notice.id).await?;
        }

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    async fn activate_cross_dock_picking(
        &self,
        ctx: &OperationContext,
        arrival_notice_id: Uuid,
    ) -> Result<(), ServiceError> {
        let release = release_good::Entity::find()
            .filter(release_good::Column::DomainId.eq(ctx.domain_id))
            .filter(release_good::Column::ArrivalNoticeId.eq(arrival_notice_id))
            .one(self.base.txn())
            .await?;
        let Some(release) = release else {
            return Ok(());
        };

        let picking = self
            .base
            .find_optional_worksheet_by_ref_order(
                ctx,
                RefOrderLink::new(RefOrderKind::ReleaseGood, release.id),
                WorksheetType::Picking,
            )
            .await?;
        if let Some(picking) = picking.filter(|ws| ws.status == WorksheetStatus::Deactivated) {
            debug!(worksheet = %picking.name, "Activating cross dock picking");
            PickingWorksheetController::new(self.sibling())
                .activate(ctx, &picking.name, &[])
                .await?;
        }
        Ok(())
    }

    /// Receives one pallet for a product line into the worksheet's buffer
    /// location.
    #[instrument(skip(self, ctx))]
    pub async fn unload(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
        qty: i32,
        weight: Decimal,
    ) -> Result<PalletMovement, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();
        if qty <= 0 || weight.is_sign_negative() {
            return Err(ServiceError::InvalidInput(format!(
                "Unloaded QTY must be positive, got {}",
                qty
            )));
        }

        let (worksheet, detail, product) = self.unloading_detail(ctx, detail_name).await?;
        let link = RefOrderLink::new(worksheet.ref_order_kind, worksheet.ref_order_id);

        let in_use = inventory::Entity::find()
            .filter(inventory::Column::DomainId.eq(ctx.domain_id))
            .filter(inventory::Column::PalletId.eq(pallet_id))
            .filter(inventory::Column::Status.ne(InventoryStatus::Terminated))
            .count(txn)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::DuplicateState(format!("Pallet ID {} is already in use", pallet_id)));
        }

        let buffer = match worksheet.buffer_location_id {
            Some(id) => Some(LocationOccupancy::new(txn).find_by_id(id).await?),
            None => None,
        };
        let share = Share::new(qty, weight);
        let now = Utc::now();
        let inventory = inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(ctx.domain_id),
            bizplace_id: Set(product.bizplace_id),
            pallet_id: Set(pallet_id.to_string()),
            batch_id: Set(product.batch_id.clone()),
            product_id: Set(product.product_id),
            packing_type: Set(product.packing_type.clone()),
            qty: Set(share.qty),
            weight: Set(share.weight),
            locked_qty: Set(0),
            locked_weight: Set(Decimal::ZERO),
            location_id: Set(buffer.as_ref().map(|l| l.id)),
            warehouse_id: Set(buffer.as_ref().map(|l| l.warehouse_id)),
            status: Set(InventoryStatus::Occupied),
            last_seq: Set(0),
            creator_id: Set(updater),
            updater_id: Set(updater),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let actual_pack_qty = product.actual_pack_qty + qty;
        let actual_pallet_qty = product.actual_pallet_qty + 1;
        let mut active: order_product::ActiveModel = product.into();
        active.actual_pack_qty = Set(actual_pack_qty);
        active.actual_pallet_qty = Set(actual_pallet_qty);
        active.updater_id = Set(updater);
        active.updated_at = Set(now);
        active.update(txn).await?;

        InventoryLedger::new(txn)
            .record(&inventory, Some(link), InventoryTransactionType::Unloading, share.qty, share.weight, updater)
            .await?;

        info!(detail = %detail.name, %pallet_id, qty, "Pallet unloaded");
        Ok(PalletMovement { detail, inventory })
    }

    /// Reverses one unloaded pallet.
    #[instrument(skip(self, ctx))]
    pub async fn undo_unloading(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
    ) -> Result<worksheet_detail::Model, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();
        let (worksheet, detail, product) = self.unloading_detail(ctx, detail_name).await?;

        let inv = inventory::Entity::find()
            .filter(inventory::Column::DomainId.eq(ctx.domain_id))
            .filter(inventory::Column::PalletId.eq(pallet_id))
            .filter(inventory::Column::Status.eq(InventoryStatus::Occupied))
            .filter(inventory::Column::ProductId.eq(product.product_id))
            .filter(inventory::Column::BatchId.eq(product.batch_id.as_str()))
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Failed to find inventory by passed pallet ID"))?;

        InventoryLedger::new(txn)
            .record(
                &inv,
                Some(RefOrderLink::new(worksheet.ref_order_kind, worksheet.ref_order_id)),
                InventoryTransactionType::UndoUnloading,
                -inv.qty,
                -inv.weight,
                updater,
            )
            .await?;

        let actual_pack_qty = (product.actual_pack_qty - inv.qty).max(0);
        let actual_pallet_qty = (product.actual_pallet_qty - 1).max(0);
        inv.delete(txn).await?;

        let mut active: order_product::ActiveModel = product.into();
        active.actual_pack_qty = Set(actual_pack_qty);
        active.actual_pallet_qty = Set(actual_pallet_qty);
        active.status = Set(OrderProductStatus::Unloading);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;

        let detail = self.base.set_detail_status(ctx, detail, WorksheetStatus::Executing).await?;
        info!(detail = %detail.name, %pallet_id, "Unloading undone");
        Ok(detail)
    }

    async fn unloading_detail(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
    ) -> Result<(worksheet::Model, worksheet_detail::Model, order_product::Model), ServiceError> {
        let detail = self.base.find_detail_by_name(ctx, detail_name).await?;
        if detail.worksheet_type != WorksheetType::Unloading {
            return Err(ServiceError::precondition(format!(
                "Expected type value is {} but got {}",
                WorksheetType::Unloading,
                detail.worksheet_type
            )));
        }
        let worksheet = self.base.find_worksheet_by_id(ctx, detail.worksheet_id).await?;
        check_worksheet_validity(&worksheet, &[Expectation::status(WorksheetStatus::Executing)])?;

        let product = self
            .base
            .order_targets()
            .find(detail.target_kind, detail.target_id)
            .await?
            .into_product()?;
        if product.status != OrderProductStatus::Unloading {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                OrderProductStatus::Unloading,
                product.status
            )));
        }
        Ok((worksheet, detail, product))
    }

    /// Completes unloading. Pallets received for the arrival notice become
    /// UNLOADED and the notice waits for putaway.
    #[instrument(skip(self, ctx))]
    pub async fn complete_unloading(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(&worksheet, &[Expectation::worksheet_type(WorksheetType::Unloading)])?;
        let link = RefOrderLink::new(worksheet.ref_order_kind, worksheet.ref_order_id);

        let bundle = self
            .base
            .complete_worksheet(ctx, worksheet, Some(OrderStatus::ReadyToPutaway))
            .await?;

        for inv in self.unloaded_inventories(link, InventoryStatus::Occupied).await? {
            let mut active: inventory::ActiveModel = inv.into();
            active.status = Set(InventoryStatus::Unloaded);
            active.updater_id = Set(updater);
            active.updated_at = Set(Utc::now());
            active.update(self.base.txn()).await?;
        }
        Ok(bundle)
    }

    /// Inventories received under `link` that are currently `status`.
    async fn unloaded_inventories(
        &self,
        link: RefOrderLink,
        status: InventoryStatus,
    ) -> Result<Vec<inventory::Model>, ServiceError> {
        let txn = self.base.txn();
        let histories = inventory_history::Entity::find()
            .filter(inventory_history::Column::RefOrderKind.eq(link.kind))
            .filter(inventory_history::Column::RefOrderId.eq(link.id))
            .filter(inventory_history::Column::TransactionType.eq(InventoryTransactionType::Unloading))
            .all(txn)
            .await?;
        let ids: Vec<Uuid> = histories.into_iter().map(|h| h.inventory_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(inventory::Entity::find()
            .filter(inventory::Column::Id.is_in(ids))
            .filter(inventory::Column::Status.eq(status))
            .order_by_asc(inventory::Column::PalletId)
            .all(txn)
            .await?)
    }

    /// Creates one putaway target per unloaded pallet of the arrival notice
    /// and generates the putaway worksheet.
    #[instrument(skip(self, ctx))]
    pub async fn generate_putaway(
        &self,
        ctx: &OperationContext,
        arrival_notice_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let creator = ctx.creator()?;
        let txn = self.base.txn();
        let arrival_notice = self
            .base
            .reference_orders()
            .find_by_name(
                ctx.domain_id,
                RefOrderKind::ArrivalNotice,
                arrival_notice_no,
                Some(OrderStatus::ReadyToPutaway),
            )
            .await?;
        let link = arrival_notice.link();
        let unloading = self
            .base
            .find_worksheet_by_ref_order(ctx, link, WorksheetType::Unloading)
            .await?;

        let inventories = self.unloaded_inventories(link, InventoryStatus::Unloaded).await?;
        if inventories.is_empty() {
            return Err(ServiceError::not_found("Failed to find inventories"));
        }

        let now = Utc::now();
        let mut targets = Vec::with_capacity(inventories.len());
        for inv in inventories {
            let target = order_inventory::ActiveModel {
                id: Set(Uuid::new_v4()),
                domain_id: Set(ctx.domain_id),
                bizplace_id: Set(inv.bizplace_id),
                name: Set(self.base.names().order_inventory()),
                ref_order_kind: Set(link.kind),
                ref_order_id: Set(link.id),
                inventory_id: Set(Some(inv.id)),
                delivery_order_id: Set(None),
                product_id: Set(Some(inv.product_id)),
                batch_id: Set(Some(inv.batch_id.clone())),
                packing_type: Set(Some(inv.packing_type.clone())),
                release_qty: Set(inv.qty),
                release_weight: Set(inv.weight),
                inspected_qty: Set(None),
                inspected_weight: Set(None),
                inspected_location_id: Set(None),
                cross_docking: Set(false),
                status: Set(OrderInventoryStatus::Pending),
                creator_id: Set(creator),
                updater_id: Set(creator),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
            targets.push(OrderTarget::Inventory(target));
        }

        self.base
            .generate_worksheet(
                ctx,
                WorksheetType::Putaway,
                link,
                targets,
                OrderStatus::ReadyToPutaway,
                TargetStatus::Inventory(OrderInventoryStatus::Pending),
                WorksheetExtras { id: None, buffer_location_id: unloading.buffer_location_id },
                &DetailExtras { from_location_id: unloading.buffer_location_id, ..Default::default() },
            )
            .await
    }

    #[instrument(skip(self, ctx, changed))]
    pub async fn activate_putaway(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Putaway)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(
                targets,
                TargetStatus::Inventory(OrderInventoryStatus::PuttingAway),
                updater,
            )
            .await?;

        let ref_order = self.base.extract_ref_order(&worksheet).await?;
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::PuttingAway, updater)
            .await?;

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    /// Stores one pallet at `location_name`.
    #[instrument(skip(self, ctx))]
    pub async fn putaway(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
        location_name: &str,
    ) -> Result<PalletMovement, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();

        let detail = self.base.find_detail_by_name(ctx, detail_name).await?;
        if detail.worksheet_type != WorksheetType::Putaway {
            return Err(ServiceError::precondition(format!(
                "Expected type value is {} but got {}",
                WorksheetType::Putaway,
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
        let target = self
            .base
            .order_targets()
            .find(detail.target_kind, detail.target_id)
            .await?
            .into_inventory()?;
        if target.status != OrderInventoryStatus::PuttingAway {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                OrderInventoryStatus::PuttingAway,
                target.status
            )));
        }
        let inv = find_inventory(txn, target.inventory_id).await?;
        if inv.pallet_id != pallet_id {
            return Err(ServiceError::precondition(format!(
                "Expected pallet value is {} but got {}",
                inv.pallet_id, pallet_id
            )));
        }
        ensure_unlocked(&inv)?;

        let occupancy = LocationOccupancy::new(txn);
        let location = occupancy.find_by_name(ctx.domain_id, location_name).await?;
        occupancy
            .prepare_move(inv.location_id, location.id, inv.id, updater)
            .await?;

        let mut active: inventory::ActiveModel = inv.into();
        active.location_id = Set(Some(location.id));
        active.warehouse_id = Set(Some(location.warehouse_id));
        active.status = Set(InventoryStatus::Stored);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let inventory = active.update(txn).await?;

        InventoryLedger::new(txn)
            .record(
                &inventory,
                Some(RefOrderLink::new(target.ref_order_kind, target.ref_order_id)),
                InventoryTransactionType::Putaway,
                0,
                Decimal::ZERO,
                updater,
            )
            .await?;

        self.base
            .order_targets()
            .update_status(
                OrderTarget::Inventory(target),
                TargetStatus::Inventory(OrderInventoryStatus::Stored),
                updater,
            )
            .await?;

        let mut active: worksheet_detail::ActiveModel = detail.into();
        active.to_location_id = Set(Some(location.id));
        active.status = Set(WorksheetStatus::Done);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let detail = active.update(txn).await?;

        info!(detail = %detail.name, %pallet_id, location = %location.name, "Pallet put away");
        Ok(PalletMovement { detail, inventory })
    }

    pub async fn complete_putaway(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(&worksheet, &[Expectation::worksheet_type(WorksheetType::Putaway)])?;
        self.base
            .complete_worksheet(ctx, worksheet, Some(OrderStatus::Done))
            .await
    }
}
