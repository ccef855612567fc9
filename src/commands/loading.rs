use crate::{
    commands::{validate_context, worksheet_activated, worksheet_completed, Collaborators, Command},
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::OrderStatus,
    errors::ServiceError,
    events::Event,
    services::{
        loading::{DeliveryInfo, LoadItem, LoadingOutcome, LoadingWorksheetController, UndoLoadingOutcome},
        worksheets::{DetailPatch, WorksheetBundle, WorksheetController},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivateLoadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivateLoadingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_loading", move |txn| {
            Box::pin(async move {
                LoadingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate(&cmd.context, &cmd.worksheet_no, &cmd.changed_details)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub release_good_no: String,
    #[validate]
    pub items: Vec<LoadItem>,
    #[serde(default)]
    pub delivery: DeliveryInfo,
}

#[async_trait::async_trait]
impl Command for LoadCommand {
    type Result = LoadingOutcome;

    #[instrument(skip(self, db_pool, collaborators), fields(release_good = %self.release_good_no))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let outcome = unit_of_work(db_pool.as_ref(), "load", move |txn| {
            Box::pin(async move {
                LoadingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .load(&cmd.context, &cmd.release_good_no, &cmd.items, &cmd.delivery)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(Event::LoadingRecorded {
            release_good: self.release_good_no.clone(),
            delivery_order_id: outcome.delivery_order.id,
            loaded_targets: outcome.loaded.len(),
        });
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UndoLoadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    pub delivery_order_id: Uuid,
    #[validate(length(min = 1, message = "At least one pallet is required"))]
    pub pallet_ids: Vec<String>,
}

#[async_trait::async_trait]
impl Command for UndoLoadingCommand {
    type Result = UndoLoadingOutcome;

    #[instrument(skip(self, db_pool, collaborators), fields(delivery_order_id = %self.delivery_order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let outcome = unit_of_work(db_pool.as_ref(), "undo_loading", move |txn| {
            Box::pin(async move {
                LoadingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .undo_loading(&cmd.context, cmd.delivery_order_id, &cmd.pallet_ids)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(Event::LoadingUndone {
            delivery_order_id: outcome.delivery_order_id,
            reverted_targets: outcome.reverted.len(),
            delivery_order_deleted: outcome.delivery_order_deleted,
        });
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteLoadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompleteLoadingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_loading", move |txn| {
            Box::pin(async move {
                LoadingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&bundle, Some(OrderStatus::Done)));
        Ok(bundle)
    }
}
