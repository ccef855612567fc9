use crate::{
    commands::{validate_context, worksheet_activated, worksheet_completed, Collaborators, Command},
    context::OperationContext,
    db::{unit_of_work, DbPool},
    errors::ServiceError,
    services::{
        vas::VasWorksheetController,
        worksheets::{DetailPatch, WorksheetBundle, WorksheetController},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivateVasCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivateVasCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_vas", move |txn| {
            Box::pin(async move {
                VasWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
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
pub struct CompleteVasCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompleteVasCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_vas", move |txn| {
            Box::pin(async move {
                VasWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_completed(&bundle, None));
        Ok(bundle)
    }
}
