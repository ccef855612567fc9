//! Returning released pallets to stock.

use crate::context::OperationContext;
use crate::entities::{
    inventory, worksheet_detail, InventoryStatus, InventoryTransactionType, OrderInventoryStatus,
    OrderStatus, WorksheetStatus, WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::inbound::PalletMovement;
use crate::services::order_targets::{OrderTarget, TargetStatus};
use crate::services::reconciliation::Share;
use crate::services::reference_orders::RefOrderLink;
use crate::services::stock::{ensure_unlocked, find_inventory, InventoryLedger, LocationOccupancy};
use crate::services::worksheets::{
    check_worksheet_validity, DetailPatch, Expectation, WorksheetBundle, WorksheetController,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, instrument};

pub struct ReturnWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> ReturnWorksheetController<'a> {
    pub fn new(base: WorksheetController<'a>) -> Self {
        Self { base }
    }

    #[instrument(skip(self, ctx, changed))]
    pub async fn activate_return(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Return)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(
                targets,
                TargetStatus::Inventory(OrderInventoryStatus::Returning),
                updater,
            )
            .await?;

        let ref_order = self.base.extract_ref_order(&worksheet).await?;
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::Returning, updater)
            .await?;

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    /// Puts the released amount of one target back on its pallet and stores
    /// the pallet at `location_name`.
    #[instrument(skip(self, ctx))]
    pub async fn returning(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        pallet_id: &str,
        location_name: &str,
    ) -> Result<PalletMovement, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();

        let detail = self.base.find_detail_by_name(ctx, detail_name).await?;
        if detail.worksheet_type != WorksheetType::Return {
            return Err(ServiceError::precondition(format!(
                "Expected type value is {} but got {}",
                WorksheetType::Return,
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
        if target.status != OrderInventoryStatus::Returning {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                OrderInventoryStatus::Returning,
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

        let returned = Share::new(target.release_qty, target.release_weight);
        let restored = Share::new(inv.qty, inv.weight) + returned;
        let mut active: inventory::ActiveModel = inv.into();
        active.qty = Set(restored.qty);
        active.weight = Set(restored.weight);
        active.location_id = Set(Some(location.id));
        active.warehouse_id = Set(Some(location.warehouse_id));
        active.status = Set(InventoryStatus::Stored);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let inventory = active.update(txn).await?;
        occupancy.refresh(location.id, updater).await?;

        InventoryLedger::new(txn)
            .record(
                &inventory,
                Some(RefOrderLink::new(target.ref_order_kind, target.ref_order_id)),
                InventoryTransactionType::Return,
                returned.qty,
                returned.weight,
                updater,
            )
            .await?;

        self.base
            .order_targets()
            .update_status(
                OrderTarget::Inventory(target),
                TargetStatus::Inventory(OrderInventoryStatus::Terminated),
                updater,
            )
            .await?;

        let mut active: worksheet_detail::ActiveModel = detail.into();
        active.to_location_id = Set(Some(location.id));
        active.status = Set(WorksheetStatus::Done);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        let detail = active.update(txn).await?;

        info!(detail = %detail.name, %pallet_id, qty = returned.qty, "Pallet returned");
        Ok(PalletMovement { detail, inventory })
    }

    pub async fn complete_return(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(&worksheet, &[Expectation::worksheet_type(WorksheetType::Return)])?;
        self.base
            .complete_worksheet(ctx, worksheet, Some(OrderStatus::Done))
            .await
    }
}
