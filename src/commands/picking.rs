use crate::{
    commands::{validate_context, worksheet_activated, worksheet_completed, Collaborators, Command},
    context::OperationContext,
    db::{unit_of_work, DbPool},
    entities::OrderStatus,
    errors::ServiceError,
    events::Event,
    services::{
        picking::{CrossDockOutcome, PickResult, PickingWorksheetController},
        worksheets::{DetailPatch, WorksheetBundle, WorksheetController},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivatePickingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
    #[serde(default)]
    pub changed_details: Vec<DetailPatch>,
}

#[async_trait::async_trait]
impl Command for ActivatePickingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "activate_picking", move |txn| {
            Box::pin(async move {
                PickingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .activate(&cmd.context, &cmd.worksheet_no, &cmd.changed_details)
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(worksheet_activated(&bundle));
        Ok(bundle)
    }
}

/// Picks a bound pallet from its storage location.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PickPalletCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(length(min = 1))]
    pub pallet_id: String,
    #[validate(length(min = 1))]
    pub location_name: String,
    #[validate(range(min = 1))]
    pub release_qty: i32,
}

#[async_trait::async_trait]
impl Command for PickPalletCommand {
    type Result = PickResult;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let picked = unit_of_work(db_pool.as_ref(), "pick_pallet", move |txn| {
            Box::pin(async move {
                PickingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .execute_picking(
                        &cmd.context,
                        &cmd.detail_name,
                        &cmd.pallet_id,
                        &cmd.location_name,
                        cmd.release_qty,
                    )
                    .await
            })
        })
        .await?;

        collaborators.event_sender.send_or_log(Event::PalletPicked {
            worksheet_detail: picked.detail.name.clone(),
            inventory_id: picked.inventory.id,
            release_qty: picked.target.release_qty,
        });
        Ok(picked)
    }
}

/// Picks from an inbound pallet for a cross-docking release.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrossDockPickCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub detail_name: String,
    #[validate(length(min = 1))]
    pub pallet_id: String,
    #[validate(range(min = 1))]
    pub release_qty: i32,
}

#[async_trait::async_trait]
impl Command for CrossDockPickCommand {
    type Result = CrossDockOutcome;

    #[instrument(skip(self, db_pool, collaborators), fields(detail = %self.detail_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let cmd = self.clone();
        let names = collaborators.names.clone();
        let outcome = unit_of_work(db_pool.as_ref(), "cross_dock_pick", move |txn| {
            Box::pin(async move {
                PickingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .cross_dock_picking(&cmd.context, &cmd.detail_name, &cmd.pallet_id, cmd.release_qty)
                    .await
            })
        })
        .await?;

        let inventory_id = match &outcome {
            CrossDockOutcome::Bound { picked, .. } => picked.inventory.id,
            CrossDockOutcome::Merged { inventory, .. } => inventory.id,
        };
        collaborators.event_sender.send_or_log(Event::PalletPicked {
            worksheet_detail: self.detail_name.clone(),
            inventory_id,
            release_qty: self.release_qty,
        });
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompletePickingCommand {
    #[validate(custom = "validate_context")]
    pub context: OperationContext,
    #[validate(length(min = 1))]
    pub worksheet_no: String,
}

#[async_trait::async_trait]
impl Command for CompletePickingCommand {
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
        let bundle = unit_of_work(db_pool.as_ref(), "complete_picking", move |txn| {
            Box::pin(async move {
                PickingWorksheetController::new(WorksheetController::new(txn, names.as_ref()))
                    .complete(&cmd.context, &cmd.worksheet_no)
                    .await
            })
        })
        .await?;

        collaborators
            .event_sender
            .send_or_log(worksheet_completed(&bundle, Some(OrderStatus::Loading)));
        Ok(bundle)
    }
}
