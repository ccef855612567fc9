//! Loading picked pallets onto delivery orders, and taking them back off.

use crate::context::OperationContext;
use crate::entities::{
    delivery_order, order_inventory, worksheet_detail, DeliveryOrderStatus,
    InventoryTransactionType, OrderInventoryStatus, OrderStatus, RefOrderKind, WorksheetStatus,
    WorksheetType,
};
use crate::errors::ServiceError;
use crate::services::order_targets::TargetStatus;
use crate::services::reconciliation::{split_loaded, Share};
use crate::services::reference_orders::RefOrderLink;
use crate::services::stock::{find_inventory, InventoryLedger};
use crate::services::worksheets::{
    check_worksheet_validity, DetailPatch, Expectation, WorksheetBundle, WorksheetController,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadItem {
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(range(min = 1))]
    pub loaded_qty: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub own_collection: bool,
    pub truck_no: Option<String>,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct LoadingOutcome {
    pub delivery_order: delivery_order::Model,
    pub loaded: Vec<order_inventory::Model>,
    /// Targets and details created for the quantity left behind.
    pub remainders: Vec<(order_inventory::Model, worksheet_detail::Model)>,
}

#[derive(Debug, Clone)]
pub struct UndoLoadingOutcome {
    pub delivery_order_id: Uuid,
    pub reverted: Vec<order_inventory::Model>,
    pub delivery_order_deleted: bool,
}

pub struct LoadingWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> LoadingWorksheetController<'a> {
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
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Loading)
            .await?;
        let details = self.base.find_details(worksheet.id).await?;

        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(
                targets,
                TargetStatus::Inventory(OrderInventoryStatus::Loading),
                updater,
            )
            .await?;

        let ref_order = self.base.extract_ref_order(&worksheet).await?;
        self.base
            .reference_orders()
            .update_status(ref_order, OrderStatus::Loading, updater)
            .await?;

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    /// Loads the reported quantities onto a new delivery order. A detail
    /// loaded short leaves a LOADING target and EXECUTING detail behind for
    /// the rest.
    #[instrument(skip(self, ctx, items, delivery), fields(items = items.len()))]
    pub async fn load(
        &self,
        ctx: &OperationContext,
        release_good_no: &str,
        items: &[LoadItem],
        delivery: &DeliveryInfo,
    ) -> Result<LoadingOutcome, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();
        if items.is_empty() {
            return Err(ServiceError::InvalidInput("Nothing to load".to_string()));
        }

        let release_good = self
            .base
            .reference_orders()
            .find_by_name(
                ctx.domain_id,
                RefOrderKind::ReleaseGood,
                release_good_no,
                Some(OrderStatus::Loading),
            )
            .await?;
        let link = release_good.link();
        let worksheet = self
            .base
            .find_worksheet_by_ref_order(ctx, link, WorksheetType::Loading)
            .await?;
        check_worksheet_validity(&worksheet, &[Expectation::status(WorksheetStatus::Executing)])?;

        let now = Utc::now();
        let delivery_order = delivery_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(ctx.domain_id),
            bizplace_id: Set(release_good.bizplace_id()),
            name: Set(self.base.names().delivery_order()),
            release_good_id: Set(link.id),
            status: Set(DeliveryOrderStatus::ReadyToDispatch),
            own_collection: Set(delivery.own_collection),
            truck_no: Set(delivery.truck_no.clone()),
            delivery_date: Set(delivery.delivery_date),
            creator_id: Set(updater),
            updater_id: Set(updater),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let ledger = InventoryLedger::new(txn);
        let mut loaded = Vec::with_capacity(items.len());
        let mut remainders = Vec::new();

        for item in items {
            let detail = self.base.find_detail_by_name(ctx, &item.detail_name).await?;
            if detail.worksheet_id != worksheet.id {
                return Err(ServiceError::precondition(format!(
                    "Detail {} doesn't belong to worksheet {}",
                    detail.name, worksheet.name
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
            if target.status != OrderInventoryStatus::Loading {
                return Err(ServiceError::precondition(format!(
                    "Expected status value is {} but got {}",
                    OrderInventoryStatus::Loading,
                    target.status
                )));
            }

            let split = split_loaded(Share::new(target.release_qty, target.release_weight), item.loaded_qty)?;
            if split.has_remainder() {
                let remainder_target = target
                    .duplicate(
                        self.base.names().order_inventory(),
                        split.remainder.qty,
                        split.remainder.weight,
                        OrderInventoryStatus::Loading,
                        updater,
                    )
                    .insert(txn)
                    .await?;
                let remainder_detail = detail
                    .duplicate(
                        self.base.names().worksheet_detail(WorksheetType::Loading),
                        remainder_target.id,
                        WorksheetStatus::Executing,
                        updater,
                    )
                    .insert(txn)
                    .await?;
                debug!(target = %remainder_target.name, qty = split.remainder.qty, "Loading remainder created");
                remainders.push((remainder_target, remainder_detail));
            }

            let inventory_id = target.inventory_id;
            let mut active: order_inventory::ActiveModel = target.into();
            active.release_qty = Set(split.claimed.qty);
            active.release_weight = Set(split.claimed.weight);
            active.status = Set(OrderInventoryStatus::Loaded);
            active.delivery_order_id = Set(Some(delivery_order.id));
            active.updater_id = Set(updater);
            active.updated_at = Set(Utc::now());
            let target = active.update(txn).await?;

            self.base.set_detail_status(ctx, detail, WorksheetStatus::Done).await?;

            if inventory_id.is_some() {
                let inv = find_inventory(txn, inventory_id).await?;
                ledger
                    .record(&inv, Some(link), InventoryTransactionType::Loading, 0, Decimal::ZERO, updater)
                    .await?;
            }
            loaded.push(target);
        }

        info!(
            delivery_order = %delivery_order.name,
            loaded = loaded.len(),
            remainders = remainders.len(),
            "Loading recorded"
        );
        Ok(LoadingOutcome { delivery_order, loaded, remainders })
    }

    /// Takes the given pallets back off a delivery order.
    #[instrument(skip(self, ctx, pallet_ids), fields(pallets = pallet_ids.len()))]
    pub async fn undo_loading(
        &self,
        ctx: &OperationContext,
        delivery_order_id: Uuid,
        pallet_ids: &[String],
    ) -> Result<UndoLoadingOutcome, ServiceError> {
        let updater = ctx.updater()?;
        let txn = self.base.txn();

        let delivery_order = delivery_order::Entity::find_by_id(delivery_order_id)
            .filter(delivery_order::Column::DomainId.eq(ctx.domain_id))
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("Failed to find delivery order ({})", delivery_order_id))
            })?;

        let wanted: HashSet<&str> = pallet_ids.iter().map(String::as_str).collect();
        let loaded = order_inventory::Entity::find()
            .filter(order_inventory::Column::DeliveryOrderId.eq(delivery_order.id))
            .filter(order_inventory::Column::Status.eq(OrderInventoryStatus::Loaded))
            .order_by_asc(order_inventory::Column::CreatedAt)
            .all(txn)
            .await?;

        let mut matched = Vec::new();
        for target in loaded {
            let inv = find_inventory(txn, target.inventory_id).await?;
            if wanted.contains(inv.pallet_id.as_str()) {
                matched.push((target, inv));
            }
        }
        if matched.is_empty() {
            return Err(ServiceError::not_found("Failed to find loaded pallets"));
        }

        let ledger = InventoryLedger::new(txn);
        let mut reverted = Vec::with_capacity(matched.len());
        for (target, inv) in matched {
            let link = RefOrderLink::new(target.ref_order_kind, target.ref_order_id);
            let detail = worksheet_detail::Entity::find()
                .filter(worksheet_detail::Column::TargetId.eq(target.id))
                .filter(worksheet_detail::Column::WorksheetType.eq(WorksheetType::Loading))
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::not_found(format!("Failed to find worksheet detail of {}", target.name))
                })?;

            let candidate = order_inventory::Entity::find()
                .filter(order_inventory::Column::RefOrderKind.eq(target.ref_order_kind))
                .filter(order_inventory::Column::RefOrderId.eq(target.ref_order_id))
                .filter(order_inventory::Column::InventoryId.eq(target.inventory_id))
                .filter(order_inventory::Column::Status.eq(OrderInventoryStatus::Loading))
                .filter(order_inventory::Column::Id.ne(target.id))
                .one(txn)
                .await?;

            let target = match candidate {
                Some(candidate) => {
                    let merged = Share::new(candidate.release_qty, candidate.release_weight)
                        + Share::new(target.release_qty, target.release_weight);
                    let mut active: order_inventory::ActiveModel = candidate.into();
                    active.release_qty = Set(merged.qty);
                    active.release_weight = Set(merged.weight);
                    active.updater_id = Set(updater);
                    active.updated_at = Set(Utc::now());
                    let candidate = active.update(txn).await?;
                    debug!(into = %candidate.name, from = %target.name, "Merged reverted pallet");

                    let mut active: order_inventory::ActiveModel = target.into();
                    active.status = Set(OrderInventoryStatus::Terminated);
                    active.delivery_order_id = Set(None);
                    active.updater_id = Set(updater);
                    active.updated_at = Set(Utc::now());
                    let terminated = active.update(txn).await?;

                    if detail.status == WorksheetStatus::Done {
                        detail.delete(txn).await?;
                    }
                    terminated
                }
                None => {
                    let mut active: order_inventory::ActiveModel = target.into();
                    active.status = Set(OrderInventoryStatus::Loading);
                    active.delivery_order_id = Set(None);
                    active.updater_id = Set(updater);
                    active.updated_at = Set(Utc::now());
                    let target = active.update(txn).await?;

                    self.base.set_detail_status(ctx, detail, WorksheetStatus::Executing).await?;
                    target
                }
            };

            ledger
                .record(&inv, Some(link), InventoryTransactionType::UndoLoading, 0, Decimal::ZERO, updater)
                .await?;
            reverted.push(target);
        }

        let remaining = order_inventory::Entity::find()
            .filter(order_inventory::Column::DeliveryOrderId.eq(delivery_order.id))
            .count(txn)
            .await?;
        let delivery_order_deleted = remaining == 0;
        if delivery_order_deleted {
            delivery_order.delete(txn).await?;
        }

        info!(%delivery_order_id, reverted = reverted.len(), delivery_order_deleted, "Loading undone");
        Ok(UndoLoadingOutcome { delivery_order_id, reverted, delivery_order_deleted })
    }

    /// Completes the worksheet once every detail is loaded and finishes the
    /// release order.
    #[instrument(skip(self, ctx))]
    pub async fn complete(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(
            &worksheet,
            &[
                Expectation::worksheet_type(WorksheetType::Loading),
                Expectation::status(WorksheetStatus::Executing),
            ],
        )?;

        let details = self.base.find_details(worksheet.id).await?;
        if let Some(open) = details.iter().find(|d| d.status != WorksheetStatus::Done) {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                WorksheetStatus::Done,
                open.status
            )));
        }

        self.base
            .complete_worksheet(ctx, worksheet, Some(OrderStatus::Done))
            .await
    }
}
