//! Value-added-service worksheets.

use crate::context::OperationContext;
use crate::entities::{worksheet, OrderStatus, OrderVasStatus, RefOrderKind, WorksheetStatus, WorksheetType};
use crate::errors::ServiceError;
use crate::services::order_targets::TargetStatus;
use crate::services::reference_orders::RefOrderLink;
use crate::services::worksheets::{
    check_worksheet_validity, DetailPatch, Expectation, WorksheetBundle, WorksheetController,
};
use tracing::{debug, instrument};

pub struct VasWorksheetController<'a> {
    base: WorksheetController<'a>,
}

impl<'a> VasWorksheetController<'a> {
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
        let worksheet = self
            .base
            .find_activatable_worksheet(ctx, worksheet_no, WorksheetType::Vas)
            .await?;
        self.activate_worksheet(ctx, worksheet, changed).await
    }

    /// Activates the VAS worksheet riding along with `ref_order`, if there is
    /// one still waiting.
    pub async fn activate_pending_for(
        &self,
        ctx: &OperationContext,
        ref_order: RefOrderLink,
    ) -> Result<Option<WorksheetBundle>, ServiceError> {
        let worksheet = self
            .base
            .find_optional_worksheet_by_ref_order(ctx, ref_order, WorksheetType::Vas)
            .await?;

        match worksheet {
            Some(worksheet) if worksheet.status == WorksheetStatus::Deactivated => {
                debug!(worksheet = %worksheet.name, "Activating accompanying VAS worksheet");
                Ok(Some(self.activate_worksheet(ctx, worksheet, &[]).await?))
            }
            _ => Ok(None),
        }
    }

    async fn activate_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet: worksheet::Model,
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let details = self.base.find_details(worksheet.id).await?;
        let targets = self.base.order_targets().find_for_details(&details).await?;
        self.base
            .order_targets()
            .update_statuses(targets, TargetStatus::Vas(OrderVasStatus::Processing), updater)
            .await?;

        self.base.activate_worksheet(ctx, worksheet, details, changed).await
    }

    pub async fn complete(
        &self,
        ctx: &OperationContext,
        worksheet_no: &str,
    ) -> Result<WorksheetBundle, ServiceError> {
        let worksheet = self.base.find_worksheet_by_no(ctx, worksheet_no).await?;
        check_worksheet_validity(&worksheet, &[Expectation::worksheet_type(WorksheetType::Vas)])?;

        // A VAS order is finished by its own worksheet; VAS riding along
        // another order leaves that order's status alone.
        let ref_order_status = match worksheet.ref_order_kind {
            RefOrderKind::VasOrder => Some(OrderStatus::Done),
            _ => None,
        };
        self.base.complete_worksheet(ctx, worksheet, ref_order_status).await
    }
}
