use crate::{
    commands::{validate_context, worksheet_completed, worksheet_generated, Collaborators, Command},
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::{OrderStatus, WorksheetType},
    errors::ServiceError,
    services::{
        order_targets::TargetStatus,
        reference_orders::RefOrderLink,
        worksheets::{DetailExtras, WorksheetBundle, WorksheetController, WorksheetExtras},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Generates a worksheet of any type over already existing order targets.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateWorksheetCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    pub worksheet_type: WorksheetType,
    pub ref_order: RefOrderLink,
    #[validate(length(min = 1, message = "At least one target is required"))]
    pub target_ids: Vec<Uuid>,
    pub ref_order_status: OrderStatus,
    pub target_status: TargetStatus,
    pub buffer_location_id: Option<Uuid>,
    pub description: Option<String>,
}

#[async_trait::async_trait]
impl Command for GenerateWorksheetCommand {
    type Result = WorksheetBundle;

    #[instrument(skip(self, db_pool, collaborators), fields(worksheet_type = %self.worksheet_type))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        if self.target_status.kind() != self.worksheet_type.target_kind() {
            return Err(ServiceError::InvalidInput(format!(
                "{} worksheets take {} targets",
                self.worksheet_type,
                self.worksheet_type.target_kind()
            )));
        }

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let bundle = unit_of_work(db_pool.as_ref(), "generate_worksheet", move |txn| {
            Box::pin(async move {
                let controller = WorksheetController::new(txn, names.as_ref());
                let kind = cmd.worksheet_type.target_kind();
                let mut targets = Vec::with_capacity(cmd.target_ids.len());
                for id in &cmd.target_ids {
                    targets.push(controller.order_targets().find(kind, *id).await?);
                }

                controller
                    .generate_worksheet(
                        &cmd.context,
                        cmd.worksheet_type,
                        cmd.ref_order,
                        targets,
                        cmd.ref_order_status,
                        cmd.target_status,
                        WorksheetExtras { id: None, buffer_location_id: cmd.buffer_location_id },
                        &DetailExtras { description: cmd.description.clone(), ..Default::default() },
                    )
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_generated(&bundle));
        info!(worksheet = %bundle.worksheet.name, "Worksheet generated");
        Ok(bundle)
    }
}

/// Completes an executing worksheet through the generic lifecycle, optionally
/// moving its reference order to a final status.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteWorksheetCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    pub ref_order_status: Option<OrderStatus>,
}

#[async_trait::async_trait]
impl Command for CompleteWorksheetCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_worksheet", move |txn| {
            Box::pin(async move {
                let controller = WorksheetController::new(txn, names.as_ref());
                let worksheet = controller.find_worksheet_by_no(&cmd.context, &cmd.worksheet_no).await?;
                controller
                    .complete_worksheet(&cmd.context, worksheet, cmd.ref_order_status)
                    .await
            })
        })
        .await?;

        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&bundle, self.ref_order_status));
        Ok(bundle)
    }
}
