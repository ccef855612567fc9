use crate::{
    commands::{
        validate_context, worksheet_activated, worksheet_completed, worksheet_generated,
        Collaborators, Command,
    },
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::OrderStatus,
    errors::ServiceError,
    events::Event,
    notifications::NotificationMessage,
    services::{
        cycle_count::{
            AdjustmentOutcome, CycleCountCompletion, CycleCountWorksheetController,
            InspectionResult,
        },
        worksheets::{WorksheetBundle, WorksheetController},
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateCycleCountCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    pub bizplace_id: Uuid,
    pub execution_date: NaiveDate,
}

#[async_trait::async_trait]
impl Command for GenerateCycleCountCommand {
    type Result = WorksheetBundle;

    #[instrument(skip(self, db_pool, collaborators), fields(bizplace_id = %self.bizplace_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let bundle = unit_of_work(db_pool.as_ref(), "generate_cycle_count", move |txn| {
            Box::pin(async move {
                CycleCountWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .generate(&cmd.context, cmd.bizplace_id, cmd.execution_date)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_generated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivateCycleCountCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for ActivateCycleCountCommand {
    type Result = WorksheetBundle;

    #[instrument(skip(self, db_pool, collaborators), fields(worksheet = %self.worksheet_no))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let bundle = unit_of_work(db_pool.as_ref(), "activate_cycle_count", move |txn| {
            Box::pin(async move {
                CycleCountWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordInspectionCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(range(min = 0))]
    pub inspected_qty: i32,
    pub inspected_weight: Decimal,
    #[validate(length(min = 1))]
    pub location_name: String,
}

#[async_trait::async_trait]
impl Command for RecordInspectionCommand {
    type Result = InspectionResult;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let result = unit_of_work(db_pool.as_ref(), "record_inspection", move |txn| {
            Box::pin(async move {
                CycleCountWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .record_inspection(
                        &cmd.context,
                        &cmd.detail_name,
                        cmd.inspected_qty,
                        cmd.inspected_weight,
                        &cmd.location_name,
                    )
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(Event::InspectionRecorded {
            worksheet_detail: result.detail.name.clone(),
            tally: result.tally,
        });
        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteCycleCountCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompleteCycleCountCommand {
    type Result = CycleCountCompletion;

    #[instrument(skip(self, db_pool, collaborators), fields(worksheet = %self.worksheet_no))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let completion = unit_of_work(db_pool.as_ref(), "complete_cycle_count", move |txn| {
            Box::pin(async move {
                CycleCountWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        let status = completion.inventory_check.status;
        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&completion.bundle, Some(status)));

        if status == OrderStatus::PendingReview {
            let message = NotificationMessage::new(
                "Cycle count pending review",
                format!(
                    "{} has {} inventories that didn't tally",
                    completion.inventory_check.name,
                    completion.not_tally.len()
                ),
                format!("inventory_check_detail/{}", completion.inventory_check.name),
            );
            collaborators
                .notifier
                .notify_office_admins(self.context.domain_id, message)
                .await;
        }

        info!(inventory_check = %completion.inventory_check.name, %status, "Cycle count completed");
        Ok(completion)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustInventoryCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub inventory_check_no: String,
    #[validate(length(min = 1, message = "At least one worksheet detail is required"))]
    pub detail_names: Vec<String>,
}

#[async_trait::async_trait]
impl Command for AdjustInventoryCommand {
    type Result = AdjustmentOutcome;

    #[instrument(skip(self, db_pool, collaborators), fields(inventory_check = %self.inventory_check_no))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let outcome = unit_of_work(db_pool.as_ref(), "adjust_inventory", move |txn| {
            Box::pin(async move {
                CycleCountWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .adjust(&cmd.context, &cmd.inventory_check_no, &cmd.detail_names)
                    .await
            })
        })
        .await?;

        for adjustment in &outcome.adjustments {
            collaborators.event_sender.send_or_log(Event::InventoryAdjusted {
                inventory_id: adjustment.inventory.id,
                qty_delta: adjustment.qty_delta,
                weight_delta: adjustment.weight_delta,
            });
        }

        let message = NotificationMessage::new(
            "Inventory adjusted",
            format!(
                "{} inventories of {} were adjusted",
                outcome.adjustments.len(),
                outcome.inventory_check.name
            ),
            format!("inventory_check_detail/{}", outcome.inventory_check.name),
        );
        collaborators
            .notifier
            .notify_office_admins(self.context.domain_id, message)
            .await;

        Ok(outcome)
    }
}
