//! Cycle counting: lock stored stock, inspect it, review the mismatches and
//! adjust inventory to what was found.

use crate::context::OperationContext;
use crate::entities::{
    inventory, inventory_check, order_inventory, worksheet, worksheet_detail, InventoryStatus,
    InventoryTransactionType, OrderInventoryStatus, OrderStatus, RefOrderKind, WorksheetStatus,
    WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::order_targets::{OrderTarget, TargetStatus};
use crate::services::reconciliation::Share;
use crate::services::reference_orders::RefOrderLink;
use crate::services::stock::{find_inventory, InventoryLedger, LocationOccupancy};
use crate::services::worksheets::{
    check_worksheet_validity, DetailExtras, Expectation, WorksheetBundle, WorksheetController,
    WorksheetExtras,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Result of recording one inspection.
#[derive(Debug, Clone)]
pub struct InspectionResult {
    pub detail: worksheet_detail::Model,
    pub target: order_inventory::Model,
    pub tally: bool,
}

/// Result of completing a cycle-count worksheet.
#[derive(Debug, Clone)]
pub struct CycleCountCompletion {
    pub bundle: WorksheetBundle,
    pub inventory_check: inventory_check::Model,
    /// Details left NOT_TALLY for review.
    pub not_tally: Vec<worksheet_detail::Model>,
}

/// One inventory written by an adjustment.
#[derive(Debug, Clone)]
pub struct InventoryAdjustment {
    pub detail: worksheet_detail::Model,
    pub inventory: inventory::Model,
    pub qty_delta: i32,
    pub weight_delta: Decimal,
}

#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    pub inventory_check: inventory_check::Model,
    pub adjustments: Vec<InventoryAdjustment>,
}

pub struct CycleCountWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> CycleCountWorksheetController<'a> {
    pub fn new(base: WorksheetController<'a>) -> Self {
        Self { base }
    }

    /// Creates an inventory check for a business partner, locks every
    /// unclaimed STORED pallet it owns and generates the worksheet.
    #[instrument(skip(self, ctx))]
    pub async fn generate(
        &self,
        ctx: &OperationContext,
        bizplace_id: Uuid,
        execution_date: NaiveDate,
    ) -> Result<WorksheetBundle, ServiceError> {
        let txn = self.base.txn();
        let creator = ctx.creator()?;

        let unfinished = worksheet::Entity::find()
            .filter(worksheet::Column::DomainId.eq(ctx.domain_id))
            .filter(worksheet::Column::WorksheetType.eq(WorksheetType::CycleCount))
            .filter(worksheet::Column::Status.is_in([
                WorksheetStatus::Deactivated,
                WorksheetStatus::Executing,
            ]))
            .count(txn)
            .await?;
        if unfinished > 0 {
            warn!("Rejected cycle count generation, unfinished worksheet exists");
            return Err(ServiceError::DuplicateState(
                "Unfinished cycle count worksheet exists".to_string(),
            ));
        }

        let inventories = inventory::Entity::find()
            .filter(inventory::Column::DomainId.eq(ctx.domain_id))
            .filter(inventory::Column::BizplaceId.eq(bizplace_id))
            .filter(inventory::Column::Status.eq(InventoryStatus::Stored))
            .filter(inventory::Column::LockedQty.eq(0))
            .order_by_asc(inventory::Column::PalletId)
            .all(txn)
            .await?;
        if inventories.is_empty() {
            return Err(ServiceError::not_found("Failed to find inventories"));
        }

        let now = Utc::now();
        let inventory_check = inventory_check::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(ctx.domain_id),
            bizplace_id: Set(bizplace_id),
            name: Set(self.base.names().inventory_check()),
            status: Set(OrderStatus::Pending),
            execution_date: Set(execution_date),
            creator_id: Set(creator),
            updater_id: Set(creator),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;
        let link = RefOrderLink::new(RefOrderKind::InventoryCheck, inventory_check.id);

        let mut targets = Vec::with_capacity(inventories.len());
        for inv in &inventories {
            self.lock(inv, creator).await?;

            let target = order_inventory::ActiveModel {
                id: Set(Uuid::new_v4()),
                domain_id: Set(ctx.domain_id),
                bizplace_id: Set(bizplace_id),
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

        let bundle = self
            .base
            .generate_worksheet(
                ctx,
                WorksheetType::CycleCount,
                link,
                targets,
                OrderStatus::Pending,
                TargetStatus::Inventory(OrderInventoryStatus::Pending),
                WorksheetExtras::default(),
                &DetailExtras::default(),
            )
            .await?;

        info!(inventory_check = %inventory_check.name, pallets = inventories.len(), "Cycle count generated");
        Ok(bundle)
    }

    /// Claims the whole pallet, but only if nobody claimed it first.
    async fn lock(&self, inv: &inventory::Model, actor: Uuid) -> Result<(), ServiceError> {
        let result = inventory::Entity::update_many()
            .col_expr(inventory::Column::LockedQty, Expr::col(inventory::Column::Qty).into())
            .col_expr(inventory::Column::LockedWeight, Expr::col(inventory::Column::Weight).into())
            .col_expr(inventory::Column::UpdaterId, Expr::value(actor))
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::Id.eq(inv.id))
            .filter(inventory::Column::LockedQty.eq(0))
            .filter(inventory::Column::Status.eq(InventoryStatus::Stored))
            .exec(self.base.txn())
            .await?;

        if result.rows_affected != 1 {
            return Err(ServiceError::capacity(format!(
                "Pallet {} is already claimed",
                inv.pallet_id
            )));
        }
        Ok(())
    }

    async fn release_locks(&self, inventory_ids: Vec<Uuid>, actor: Uuid) -> Result<(), ServiceError> {
        if inventory_ids.is_empty() {
            return Ok(());
        }
        inventory::Entity::update_many()
            .col_expr(inventory::Column::LockedQty, Expr::value(0))
            .col_expr(inventory::Column::LockedWeight, Expr::value(Decimal::ZERO))
            .col_expr(inventory::Column::UpdaterId, Expr::value(actor))
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::Id.is_in(inventory_ids))
            .exec(self.base.txn())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, ctx))]
    pub async fn activate(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::CycleCount)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(
                targets,
                TargetStatus::Inventory(OrderInventoryStatus::Inspecting),
                updater,
            )
            .await?;

        let ref_order = self.base.extract_ref_order(&worksheet).await?;
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::Inspecting, updater)
            .await?;

        self.base.activate_worksheet(ctx, worksheet, details, &[]).await
    }

    /// Records what an operator found for one detail.
    #[instrument(skip(self, ctx))]
    pub async fn record_inspection(
        &self,
        ctx: &OperationContext,
        detail_name: &str,
        inspected_qty: i32,
        inspected_weight: Decimal,
        location_name: &str,
    ) -> Result<InspectionResult, ServiceError> {
        let updater = ctx.updater()?;
        if inspected_qty < 0 || inspected_weight.is_sign_negative() {
            return Err(ServiceError::InvalidInput(
                "Inspected QTY and weight can't be negative".to_string(),
            ));
        }

        let detail = self.base.find_detail_by_name(ctx, detail_name).await?;
        if detail.worksheet_type != WorksheetType::CycleCount {
            return Err(ServiceError::precondition(format!(
                "Expected type value is {} but got {}",
                WorksheetType::CycleCount,
                detail.worksheet_type
            )));
        }
        if !matches!(detail.status, WorksheetStatus::Executing | WorksheetStatus::NotTally) {
            return Err(ServiceError::precondition(format!(
                "Expected status value is EXECUTING or NOT_TALLY but got {}",
                detail.status
            )));
        }

        let worksheet = self.base.find_worksheet_by_id(ctx, detail.worksheet_id).await?;
        let inventory_check = self.base.extract_ref_order(&worksheet).await?.into_inventory_check()?;
        if inventory_check.status != OrderStatus::Inspecting {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                OrderStatus::Inspecting,
                inventory_check.status
            )));
        }

        let target = self.base.order_targets().find_inventory_target(detail.target_id).await?;
        let inv = find_inventory(self.base.txn(), target.inventory_id).await?;
        let location = LocationOccupancy::new(self.base.txn())
            .find_by_name(ctx.domain_id, location_name)
            .await?;

        let found = Share::new(inspected_qty, inspected_weight);
        let tally = found.qty == inv.qty
            && found.weight.round_dp(2) == inv.weight.round_dp(2)
            && inv.location_id == Some(location.id);

        let now = Utc::now();
        let mut active: order_inventory::ActiveModel = target.into();
        active.inspected_qty = Set(Some(found.qty));
        active.inspected_weight = Set(Some(found.weight));
        active.inspected_location_id = Set(Some(location.id));
        active.status = Set(if tally {
            OrderInventoryStatus::Inspected
        } else {
            OrderInventoryStatus::NotTally
        });
        active.updater_id = Set(updater);
        active.updated_at = Set(now);
        let target = active.update(self.base.txn()).await?;

        let detail_status = if tally { WorksheetStatus::Executing } else { WorksheetStatus::NotTally };
        let detail = self.base.set_detail_status(ctx, detail, detail_status).await?;

        info!(detail = %detail.name, tally, "Inspection recorded");
        Ok(InspectionResult { detail, target, tally })
    }

    /// Completes the worksheet. Tallying lines are finalized and unlocked;
    /// when anything failed to tally the inventory check goes to review.
    #[instrument(skip(self, ctx))]
    pub async fn complete(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<CycleCountCompletion, ServiceError> {
        let updater = ctx.updater()?;
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(
            &worksheet,
            &[
                Expectation::worksheet_type(WorksheetType::CycleCount),
                Expectation::status(WorksheetStatus::Executing),
            ],
        )?;

        let details = self.base.find_details(worksheet.id).await?;
        let targets = self.base.order_targets().find_for_details(&details).await?;

        let mut tally = Vec::new();
        let mut not_tally = Vec::new();
        for (detail, target) in details.into_iter().zip(targets) {
            let target = target.into_inventory()?;
            match target.status {
                OrderInventoryStatus::Inspected => tally.push((detail, target)),
                OrderInventoryStatus::NotTally => not_tally.push((detail, target)),
                other => {
                    return Err(ServiceError::precondition(format!(
                        "Expected status value is INSPECTED or NOT_TALLY but got {}",
                        other
                    )))
                }
            }
        }

        let tally_inventories = tally.iter().filter_map(|(_, t)| t.inventory_id).collect();
        self.release_locks(tally_inventories, updater).await?;

        let tally_details: Vec<_> = tally.into_iter().map(|(d, _)| d).collect();
        let ref_status = if not_tally.is_empty() {
            OrderStatus::Done
        } else {
            OrderStatus::PendingReview
        };
        let bundle = self
            .base
            .finalize_worksheet(ctx, worksheet, tally_details, Some(ref_status))
            .await?;

        let mut review = Vec::with_capacity(not_tally.len());
        for (detail, target) in not_tally {
            self.base
                .order_targets()
                .update_status(
                    OrderTarget::Inventory(target),
                    TargetStatus::Inventory(OrderInventoryStatus::Inspecting),
                    updater,
                )
                .await?;
            review.push(detail);
        }

        let inventory_check = self
            .base
            .extract_ref_order(&bundle.worksheet)
            .await?
            .into_inventory_check()?;

        info!(status = %inventory_check.status, not_tally = review.len(), "Cycle count completed");
        Ok(CycleCountCompletion { bundle, inventory_check, not_tally: review })
    }

    /// Applies inspected values of reviewed NOT_TALLY details to inventory.
    #[instrument(skip(self, ctx, detail_names), fields(details = detail_names.len()))]
    pub async fn adjust(
        &self,
        ctx: &OperationContext,
        inventory_check_no: &str,
        detail_names: &[String],
    ) -> Result<AdjustmentOutcome, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();

        let ref_order = self
            .base
            .reference_orders()
            .find_by_name(
                ctx.domain_id,
                RefOrderKind::InventoryCheck,
                inventory_check_no,
                Some(OrderStatus::PendingReview),
            )
            .await?;
        let worksheet = self
            .base
            .find_worksheet_by_ref_order(ctx, ref_order.link(), WorksheetType::CycleCount)
            .await?;

        let wanted: HashSet<&str> = detail_names.iter().map(String::as_str).collect();
        let details = worksheet_detail::Entity::find()
            .filter(worksheet_detail::Column::WorksheetId.eq(worksheet.id))
            .filter(worksheet_detail::Column::Name.is_in(wanted.iter().copied()))
            .filter(worksheet_detail::Column::Status.eq(WorksheetStatus::NotTally))
            .order_by_asc(worksheet_detail::Column::Name)
            .all(txn)
            .await?;
        if details.len() != wanted.len() {
            return Err(ServiceError::not_found("Can't find some of worksheet details"));
        }

        let ledger = InventoryLedger::new(txn);
        let occupancy = LocationOccupancy::new(txn);
        let link = ref_order.link();
        let mut adjustments = Vec::with_capacity(details.len());

        for detail in details {
            let target = self.base.order_targets().find_inventory_target(detail.target_id).await?;
            let inspected_qty = target.inspected_qty.ok_or_else(|| {
                ServiceError::precondition(format!("{} has not been inspected", detail.name))
            })?;
            let inspected_weight = target.inspected_weight.unwrap_or(Decimal::ZERO);
            let inv = find_inventory(txn, target.inventory_id).await?;
            let prior = Share::new(inv.qty, inv.weight);
            let previous_location = inv.location_id;
            let next_location = match target.inspected_location_id {
                Some(id) => Some(occupancy.find_by_id(id).await?),
                None => None,
            };

            let (adjusted, qty_delta, weight_delta) = if inspected_qty == 0 {
                let mut active: inventory::ActiveModel = inv.into();
                active.qty = Set(0);
                active.weight = Set(Decimal::ZERO);
                active.locked_qty = Set(0);
                active.locked_weight = Set(Decimal::ZERO);
                if let Some(location) = &next_location {
                    active.location_id = Set(Some(location.id));
                    active.warehouse_id = Set(Some(location.warehouse_id));
                }
                active.status = Set(InventoryStatus::Terminated);
                active.updater_id = Set(updater);
                active.updated_at = Set(Utc::now());
                let adjusted = active.update(txn).await?;

                for location_id in [previous_location, adjusted.location_id].into_iter().flatten() {
                    occupancy.refresh(location_id, updater).await?;
                }

                let history = ledger
                    .record(
                        &adjusted,
                        Some(link),
                        InventoryTransactionType::Terminated,
                        -prior.qty,
                        -prior.weight,
                        updater,
                    )
                    .await?;
                (adjusted, history.qty_delta, history.weight_delta)
            } else {
                let found = Share::new(inspected_qty, inspected_weight);
                if let Some(location) = &next_location {
                    occupancy
                        .prepare_move(previous_location, location.id, inv.id, updater)
                        .await?;
                }

                let mut active: inventory::ActiveModel = inv.into();
                active.qty = Set(found.qty);
                active.weight = Set(found.weight);
                active.locked_qty = Set(0);
                active.locked_weight = Set(Decimal::ZERO);
                if let Some(location) = &next_location {
                    active.location_id = Set(Some(location.id));
                    active.warehouse_id = Set(Some(location.warehouse_id));
                }
                active.updater_id = Set(updater);
                active.updated_at = Set(Utc::now());
                let adjusted = active.update(txn).await?;

                let delta = found - prior;
                ledger
                    .record(
                        &adjusted,
                        Some(link),
                        InventoryTransactionType::Adjustment,
                        delta.qty,
                        delta.weight,
                        updater,
                    )
                    .await?;
                (adjusted, delta.qty, delta.weight)
            };

            self.base
                .order_targets()
                .update_status(
                    OrderTarget::Inventory(target),
                    TargetStatus::Inventory(OrderInventoryStatus::Terminated),
                    updater,
                )
                .await?;
            let detail = self.base.set_detail_status(ctx, detail, WorksheetStatus::Adjusted).await?;

            adjustments.push(InventoryAdjustment { detail, inventory: adjusted, qty_delta, weight_delta });
        }

        let remaining = worksheet_detail::Entity::find()
            .filter(worksheet_detail::Column::WorksheetId.eq(worksheet.id))
            .filter(worksheet_detail::Column::Status.eq(WorksheetStatus::NotTally))
            .count(txn)
            .await?;

        let ref_order = if remaining == 0 {
            self.base
                .reference_orders()
                .update_status(ref_order, OrderStatus::Done, updater)
                .await?
        } else {
            ref_order
        };
        let inventory_check = ref_order.into_inventory_check()?;

        info!(
            inventory_check = %inventory_check.name,
            adjusted = adjustments.len(),
            remaining,
            "Cycle count adjusted"
        );
        Ok(AdjustmentOutcome { inventory_check, adjustments })
    }
}
