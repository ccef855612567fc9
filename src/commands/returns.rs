use crate::{
    commands::{validate_context, worksheet_activated, worksheet_completed, Collaborators, Command},
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::OrderStatus,
    errors::ServiceError,
    notifications::NotificationMessage,
    services::{
        inbound::PalletMovement,
        returns::ReturnWorksheetController,
        worksheets::{DetailPatch, WorksheetBundle, WorksheetController},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivateReturnCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivateReturnCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_return", move |txn| {
            Box::pin(async move {
                ReturnWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate_return(&cmd.context, &cmd.worksheet_no, &cmd.changed_details)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReturnPalletCommand {
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
impl Command for ReturnPalletCommand {
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
        unit_of_work(db_pool.as_ref(), "return_pallet", move |txn| {
            Box::pin(async move {
                ReturnWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .returning(&cmd.context, &cmd.detail_name, &cmd.pallet_id, &cmd.location_name)
                    .await
            })
        })
        .await
    }
}

/// Completes a return worksheet and tells the customer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteReturnCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompleteReturnCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_return", move |txn| {
            Box::pin(async move {
                ReturnWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete_return(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&bundle, Some(OrderStatus::Done)));

        let message = NotificationMessage::new(
            "Return completed",
            format!("Return worksheet {} is done", bundle.worksheet.name),
            format!("return_worksheet_detail/{}", bundle.worksheet.name),
        );
        collaborators
            .notifier
            .notify_customer(self.context.domain_id, bundle.worksheet.bizplace_id, message)
            .await;

        Ok(bundle)
    }
}
