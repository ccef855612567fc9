use crate::{
    commands::{
        validate_context, worksheet_activated, worksheet_completed, worksheet_generated,
        Collaborators, Command,
    },
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::{worksheet_detail, OrderStatus},
    errors::ServiceError,
    services::{
        inbound::{InboundWorksheetController, PalletMovement, PalletQtyPatch},
        worksheets::{DetailPatch, WorksheetBundle, WorksheetController},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivateUnloadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub pallet_patches: Vec<PalletQtyPatch>,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivateUnloadingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_unloading", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate_unloading(
                        &cmd.context,
                        &cmd.worksheet_no,
                        &cmd.pallet_patches,
                        &cmd.changed_details,
                    )
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UnloadPalletCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(length(min = 1))]
    pub pallet_id: String,
    #[validate(range(min = 1))]
    pub qty: i32,
    pub weight: Decimal,
}

#[async_trait::async_trait]
impl Command for UnloadPalletCommand {
    type Result = PalletMovement;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        unit_of_work(db_pool.as_ref(), "unload_pallet", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .unload(&cmd.context, &cmd.detail_name, &cmd.pallet_id, cmd.qty, cmd.weight)
                    .await
            })
        })
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UndoUnloadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(length(min = 1))]
    pub pallet_id: String,
}

#[async_trait::async_trait]
impl Command for UndoUnloadingCommand {
    type Result = worksheet_detail::Model;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        unit_of_work(db_pool.as_ref(), "undo_unloading", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .undo_unloading(&cmd.context, &cmd.detail_name, &cmd.pallet_id)
                    .await
            })
        })
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteUnloadingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompleteUnloadingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_unloading", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete_unloading(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&bundle, Some(OrderStatus::ReadyToPutaway)));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeneratePutawayCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub arrival_notice_no: String,
}

#[async_trait::async_trait]
impl Command for GeneratePutawayCommand {
    type Result = WorksheetBundle;

    #[instrument(skip(self, db_pool, collaborators), fields(arrival_notice = %self.arrival_notice_no))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let bundle = unit_of_work(db_pool.as_ref(), "generate_putaway", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .generate_putaway(&cmd.context, &cmd.arrival_notice_no)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_generated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivatePutawayCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivatePutawayCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_putaway", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate_putaway(&cmd.context, &cmd.worksheet_no, &cmd.changed_details)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PutawayCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(length(min = 1))]
    pub pallet_id: String,
    #[validate(length(min = 1))]
    pub location_name: String,
}

#[async_trait::async_trait]
impl Command for PutawayCommand {
    type Result = PalletMovement;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        unit_of_work(db_pool.as_ref(), "putaway", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .putaway(&cmd.context, &cmd.detail_name, &cmd.pallet_id, &cmd.location_name)
                    .await
            })
        })
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompletePutawayCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompletePutawayCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_putaway", move |txn| {
            Box::pin(async move {
                InboundWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete_putaway(&cmd.context, &cmd.worksheet_no)
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
