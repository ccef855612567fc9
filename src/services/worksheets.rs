//! The worksheet lifecycle engine.
//!
//! [`WorksheetController`] owns no transaction; it borrows the unit of work
//! opened by the calling command and performs every read and write on it.
//! Specializations (cycle count, picking, loading, ...) wrap a controller and
//! reuse its lifecycle operations.

use crate::context::OperationContext;
use crate::entities::{worksheet, worksheet_detail, OrderStatus, WorksheetStatus, WorksheetType};
use crate::errors::ServiceError;
use crate::naming::NameGenerator;
use crate::services::order_targets::{OrderTarget, OrderTargetGateway, TargetStatus};
use crate::services::reference_orders::{RefOrder, RefOrderLink, ReferenceOrderGateway};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A worksheet together with its details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksheetBundle {
    pub worksheet: worksheet::Model,
    pub details: Vec<worksheet_detail::Model>,
}

/// Optional values for a new worksheet.
#[derive(Debug, Clone, Default)]
pub struct WorksheetExtras {
    /// Must stay empty: identities are always assigned here.
    pub id: Option<Uuid>,
    pub buffer_location_id: Option<Uuid>,
}

/// Optional values copied into every new detail.
#[derive(Debug, Clone, Default)]
pub struct DetailExtras {
    pub description: Option<String>,
    pub remark: Option<String>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
}

/// Operator-supplied changes to one detail, matched by detail name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailPatch {
    pub name: String,
    pub description: Option<String>,
    pub remark: Option<String>,
    pub issue: Option<String>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorksheetField {
    Type,
    Status,
    Name,
    Bizplace,
}

impl fmt::Display for WorksheetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorksheetField::Type => "type",
            WorksheetField::Status => "status",
            WorksheetField::Name => "name",
            WorksheetField::Bizplace => "bizplace",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Type(WorksheetType),
    Status(WorksheetStatus),
    Name(String),
    Bizplace(Uuid),
}

impl FieldValue {
    pub fn of(worksheet: &worksheet::Model, field: WorksheetField) -> Self {
        match field {
            WorksheetField::Type => FieldValue::Type(worksheet.worksheet_type),
            WorksheetField::Status => FieldValue::Status(worksheet.status),
            WorksheetField::Name => FieldValue::Name(worksheet.name.clone()),
            WorksheetField::Bizplace => FieldValue::Bizplace(worksheet.bizplace_id),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Type(t) => fmt::Display::fmt(t, f),
            FieldValue::Status(s) => fmt::Display::fmt(s, f),
            FieldValue::Name(n) => f.write_str(n),
            FieldValue::Bizplace(id) => fmt::Display::fmt(id, f),
        }
    }
}

type Predicate = Box<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// One expected worksheet field: either a literal or a predicate.
pub struct Expectation {
    field: WorksheetField,
    expected: String,
    predicate: Predicate,
}

impl Expectation {
    pub fn equals(field: WorksheetField, value: FieldValue) -> Self {
        Self {
            field,
            expected: value.to_string(),
            predicate: Box::new(move |actual| actual == &value),
        }
    }

    pub fn status(status: WorksheetStatus) -> Self {
        Self::equals(WorksheetField::Status, FieldValue::Status(status))
    }

    pub fn worksheet_type(worksheet_type: WorksheetType) -> Self {
        Self::equals(WorksheetField::Type, FieldValue::Type(worksheet_type))
    }

    pub fn status_in(statuses: &[WorksheetStatus]) -> Self {
        let allowed = statuses.to_vec();
        let expected = allowed
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Self::satisfies(WorksheetField::Status, expected, move |actual| {
            matches!(actual, FieldValue::Status(s) if allowed.contains(s))
        })
    }

    pub fn satisfies<F>(field: WorksheetField, expected: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        Self { field, expected: expected.into(), predicate: Box::new(predicate) }
    }

    fn check(&self, worksheet: &worksheet::Model) -> Result<(), ServiceError> {
        let actual = FieldValue::of(worksheet, self.field);
        if (self.predicate)(&actual) {
            return Ok(());
        }
        Err(ServiceError::precondition(format!(
            "Expected {} value is {} but got {}",
            self.field, self.expected, actual
        )))
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("field", &self.field)
            .field("expected", &self.expected)
            .finish()
    }
}

/// Fails on the first expectation the worksheet does not meet.
pub fn check_worksheet_validity(
    worksheet: &worksheet::Model,
    expectations: &[Expectation],
) -> Result<(), ServiceError> {
    for expectation in expectations {
        if let Err(err) = expectation.check(worksheet) {
            warn!(worksheet = %worksheet.name, error = %err, "Worksheet precondition rejected");
            return Err(err);
        }
    }
    Ok(())
}

pub struct WorksheetController<'a> {
    txn: &'a DatabaseTransaction,
    names: &'a dyn NameGenerator,
}

impl<'a> WorksheetController<'a> {
    pub fn new(txn: &'a DatabaseTransaction, names: &'a dyn NameGenerator) -> Self {
        Self { txn, names }
    }

    pub fn txn(&self) -> &'a DatabaseTransaction {
        self.txn
    }

    pub fn names(&self) -> &'a dyn NameGenerator {
        self.names
    }

    pub fn reference_orders(&self) -> ReferenceOrderGateway<'a> {
        ReferenceOrderGateway::new(self.txn)
    }

    pub fn order_targets(&self) -> OrderTargetGateway<'a> {
        OrderTargetGateway::new(self.txn)
    }

    /// Creates a DEACTIVATED worksheet for `ref_order` under a fresh name.
    #[instrument(skip(self, ref_order, extras), fields(ref_order = %ref_order.name()))]
    pub async fn create_worksheet(
        &self,
        ctx: &OperationContext,
        bizplace_id: Uuid,
        ref_order: &RefOrder,
        worksheet_type: WorksheetType,
        extras: WorksheetExtras,
    ) -> Result<worksheet::Model, ServiceError> {
        if extras.id.is_some() {
            return Err(ServiceError::precondition("Target has ID already"));
        }
        let creator = ctx.creator()?;
        let updater = ctx.updater()?;
        if ref_order.id().is_nil() {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }

        let now = Utc::now();
        let link = ref_order.link();
        let worksheet = worksheet::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(ctx.domain_id),
            bizplace_id: Set(bizplace_id),
            name: Set(self.names.worksheet(worksheet_type)),
            worksheet_type: Set(worksheet_type),
            status: Set(WorksheetStatus::Deactivated),
            ref_order_kind: Set(link.kind),
            ref_order_id: Set(link.id),
            buffer_location_id: Set(extras.buffer_location_id),
            started_at: Set(None),
            ended_at: Set(None),
            creator_id: Set(creator),
            updater_id: Set(updater),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        info!(worksheet = %worksheet.name, %worksheet_type, "Worksheet created");
        Ok(worksheet)
    }

    /// Creates one DEACTIVATED detail per target.
    pub async fn create_worksheet_details(
        &self,
        ctx: &OperationContext,
        worksheet: &worksheet::Model,
        worksheet_type: WorksheetType,
        targets: &[OrderTarget],
        extras: &DetailExtras,
    ) -> Result<Vec<worksheet_detail::Model>, ServiceError> {
        let creator = ctx.creator()?;
        let updater = ctx.updater()?;
        if worksheet.id.is_nil() {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }

        let bizplace_id = if worksheet.bizplace_id.is_nil() {
            self.find_worksheet_by_id(ctx, worksheet.id).await?.bizplace_id
        } else {
            worksheet.bizplace_id
        };

        let expected_kind = worksheet_type.target_kind();
        let now = Utc::now();
        let mut details = Vec::with_capacity(targets.len());
        for target in targets {
            if target.id().is_nil() {
                return Err(ServiceError::precondition("Target doesn't have ID"));
            }
            if target.kind() != expected_kind {
                return Err(ServiceError::precondition(format!(
                    "Expected target value is {} but got {}",
                    expected_kind,
                    target.kind()
                )));
            }

            let detail = worksheet_detail::ActiveModel {
                id: Set(Uuid::new_v4()),
                domain_id: Set(ctx.domain_id),
                bizplace_id: Set(bizplace_id),
                worksheet_id: Set(worksheet.id),
                name: Set(self.names.worksheet_detail(worksheet_type)),
                worksheet_type: Set(worksheet_type),
                status: Set(WorksheetStatus::Deactivated),
                description: Set(extras.description.clone()),
                remark: Set(extras.remark.clone()),
                issue: Set(None),
                target_kind: Set(target.kind()),
                target_id: Set(target.id()),
                from_location_id: Set(extras.from_location_id),
                to_location_id: Set(extras.to_location_id),
                creator_id: Set(creator),
                updater_id: Set(updater),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(self.txn)
            .await?;
            details.push(detail);
        }

        Ok(details)
    }

    /// Creates the worksheet and its details, stamps the targets with
    /// `target_status` and moves the reference order to `ref_order_status`.
    #[instrument(skip(self, ctx, targets, extras, detail_extras), fields(targets = targets.len()))]
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet_type: WorksheetType,
        ref_order: RefOrderLink,
        targets: Vec<OrderTarget>,
        ref_order_status: OrderStatus,
        target_status: TargetStatus,
        extras: WorksheetExtras,
        detail_extras: &DetailExtras,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let ref_order = self.reference_orders().find(ref_order).await?;
        if ref_order.domain_id() != ctx.domain_id {
            return Err(ServiceError::not_found(format!(
                "Failed to find {} {}",
                ref_order.kind(),
                ref_order.name()
            )));
        }

        let link = ref_order.link();
        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            if !seen.insert(target.id()) {
                return Err(ServiceError::precondition(format!(
                    "Target {} is listed more than once",
                    target.name()
                )));
            }
            if target.ref_order() != link {
                return Err(ServiceError::precondition(format!(
                    "Target {} doesn't belong to {} {}",
                    target.name(),
                    ref_order.kind(),
                    ref_order.name()
                )));
            }
        }

        let worksheet = self
            .create_worksheet(ctx, ref_order.bizplace_id(), &ref_order, worksheet_type, extras)
            .await?;
        let targets = self
            .order_targets()
            .update_statuses(targets, target_status, updater)
            .await?;
        let details = self
            .create_worksheet_details(ctx, &worksheet, worksheet_type, &targets, detail_extras)
            .await?;
        self.reference_orders()
            .update_status(ref_order, ref_order_status, updater)
            .await?;

        info!(worksheet = %worksheet.name, details = details.len(), "Worksheet generated");
        Ok(WorksheetBundle { worksheet, details })
    }

    /// Moves the worksheet and its details to EXECUTING, applying any
    /// operator changes to the details on the way.
    #[instrument(skip(self, ctx, worksheet, details, changed), fields(worksheet = %worksheet.name))]
    pub async fn activate_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet: worksheet::Model,
        details: Vec<worksheet_detail::Model>,
        changed: &[DetailPatch],
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        if worksheet.id.is_nil() || details.iter().any(|d| d.id.is_nil()) {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }

        let now = Utc::now();
        let mut active: worksheet::ActiveModel = worksheet.into();
        active.status = Set(WorksheetStatus::Executing);
        active.started_at = Set(Some(now));
        active.updater_id = Set(updater);
        active.updated_at = Set(now);
        let worksheet = active.update(self.txn).await?;

        let details = self
            .renew_worksheet_details(ctx, details, changed, WorksheetStatus::Executing)
            .await?;

        info!(details = details.len(), "Worksheet activated");
        Ok(WorksheetBundle { worksheet, details })
    }

    /// Sets `status` on every detail, merging in the patch whose name
    /// matches the detail.
    pub async fn renew_worksheet_details(
        &self,
        ctx: &OperationContext,
        details: Vec<worksheet_detail::Model>,
        changed: &[DetailPatch],
        status: WorksheetStatus,
    ) -> Result<Vec<worksheet_detail::Model>, ServiceError> {
        let updater = ctx.updater()?;
        let now = Utc::now();
        let mut renewed = Vec::with_capacity(details.len());

        for detail in details {
            let patch = changed.iter().find(|p| p.name == detail.name);
            let mut active: worksheet_detail::ActiveModel = detail.into();
            if let Some(patch) = patch {
                if let Some(description) = &patch.description {
                    active.description = Set(Some(description.clone()));
                }
                if let Some(remark) = &patch.remark {
                    active.remark = Set(Some(remark.clone()));
                }
                if let Some(issue) = &patch.issue {
                    active.issue = Set(Some(issue.clone()));
                }
                if patch.from_location_id.is_some() {
                    active.from_location_id = Set(patch.from_location_id);
                }
                if patch.to_location_id.is_some() {
                    active.to_location_id = Set(patch.to_location_id);
                }
            }
            active.status = Set(status);
            active.updater_id = Set(updater);
            active.updated_at = Set(now);
            renewed.push(active.update(self.txn).await?);
        }

        Ok(renewed)
    }

    /// Completes an EXECUTING worksheet: everything below it is finalized and
    /// the reference order optionally moves to `ref_order_status`.
    #[instrument(skip(self, ctx, worksheet), fields(worksheet = %worksheet.name))]
    pub async fn complete_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet: worksheet::Model,
        ref_order_status: Option<OrderStatus>,
    ) -> Result<WorksheetBundle, ServiceError> {
        check_worksheet_validity(&worksheet, &[Expectation::status(WorksheetStatus::Executing)])?;
        let details = self.find_details(worksheet.id).await?;
        self.finalize_worksheet(ctx, worksheet, details, ref_order_status).await
    }

    /// Sets the worksheet and the given details DONE, terminates their
    /// targets and applies `ref_order_status` when supplied.
    pub async fn finalize_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet: worksheet::Model,
        details: Vec<worksheet_detail::Model>,
        ref_order_status: Option<OrderStatus>,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        let now = Utc::now();

        let mut active: worksheet::ActiveModel = worksheet.into();
        active.status = Set(WorksheetStatus::Done);
        active.ended_at = Set(Some(now));
        active.updater_id = Set(updater);
        active.updated_at = Set(now);
        let worksheet = active.update(self.txn).await?;

        let mut done = Vec::with_capacity(details.len());
        for detail in details {
            done.push(self.set_detail_status(ctx, detail, WorksheetStatus::Done).await?);
        }

        let targets = self.order_targets().find_for_details(&done).await?;
        self.order_targets().terminate_all(targets, updater).await?;

        if let Some(status) = ref_order_status {
            let ref_order = self.extract_ref_order(&worksheet).await?;
            self.reference_orders().update_status(ref_order, status, updater).await?;
        }

        info!(worksheet = %worksheet.name, details = done.len(), "Worksheet completed");
        Ok(WorksheetBundle { worksheet, details: done })
    }

    /// Marks an EXECUTING worksheet DONE once every detail is DONE, leaving
    /// the targets where they are for the next worksheet to pick up.
    pub async fn close_worksheet(
        &self,
        ctx: &OperationContext,
        worksheet: worksheet::Model,
    ) -> Result<WorksheetBundle, ServiceError> {
        let updater = ctx.updater()?;
        check_worksheet_validity(&worksheet, &[Expectation::status(WorksheetStatus::Executing)])?;

        let details = self.find_details(worksheet.id).await?;
        if let Some(open) = details.iter().find(|d| d.status != WorksheetStatus::Done) {
            return Err(ServiceError::precondition(format!(
                "Expected status value is {} but got {}",
                WorksheetStatus::Done,
                open.status
            )));
        }

        let now = Utc::now();
        let mut active: worksheet::ActiveModel = worksheet.into();
        active.status = Set(WorksheetStatus::Done);
        active.ended_at = Set(Some(now));
        active.updater_id = Set(updater);
        active.updated_at = Set(now);
        let worksheet = active.update(self.txn).await?;

        info!(worksheet = %worksheet.name, "Worksheet closed");
        Ok(WorksheetBundle { worksheet, details })
    }

    /// Fetches a worksheet by name and requires it to be a DEACTIVATED
    /// worksheet of `worksheet_type`.
    pub async fn find_activatable_worksheet(
        &self,
        ctx: &OperationContext,
        name: &str,
        worksheet_type: WorksheetType,
    ) -> Result<worksheet::Model, ServiceError> {
        let worksheet = self.find_worksheet_by_no(ctx, name).await?;
        check_worksheet_validity(
            &worksheet,
            &[
                Expectation::worksheet_type(worksheet_type),
                Expectation::status(WorksheetStatus::Deactivated),
            ],
        )?;
        Ok(worksheet)
    }

    pub async fn find_worksheet_by_id(
        &self,
        ctx: &OperationContext,
        id: Uuid,
    ) -> Result<worksheet::Model, ServiceError> {
        worksheet::Entity::find_by_id(id)
            .filter(worksheet::Column::DomainId.eq(ctx.domain_id))
            .one(self.txn)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Failed to find worksheet ({})", id)))
    }

    pub async fn find_worksheet_by_no(
        &self,
        ctx: &OperationContext,
        name: &str,
    ) -> Result<worksheet::Model, ServiceError> {
        worksheet::Entity::find()
            .filter(worksheet::Column::DomainId.eq(ctx.domain_id))
            .filter(worksheet::Column::Name.eq(name))
            .one(self.txn)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "There's no results matched with condition worksheet name: {}",
                    name
                ))
            })
    }

    pub async fn find_worksheet_by_ref_order(
        &self,
        ctx: &OperationContext,
        ref_order: RefOrderLink,
        worksheet_type: WorksheetType,
    ) -> Result<worksheet::Model, ServiceError> {
        self.find_optional_worksheet_by_ref_order(ctx, ref_order, worksheet_type)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "There's no results matched with condition {}: {}, type: {}",
                    ref_order.kind, ref_order.id, worksheet_type
                ))
            })
    }

    pub async fn find_optional_worksheet_by_ref_order(
        &self,
        ctx: &OperationContext,
        ref_order: RefOrderLink,
        worksheet_type: WorksheetType,
    ) -> Result<Option<worksheet::Model>, ServiceError> {
        Ok(worksheet::Entity::find()
            .filter(worksheet::Column::DomainId.eq(ctx.domain_id))
            .filter(worksheet::Column::RefOrderKind.eq(ref_order.kind))
            .filter(worksheet::Column::RefOrderId.eq(ref_order.id))
            .filter(worksheet::Column::WorksheetType.eq(worksheet_type))
            .order_by_desc(worksheet::Column::CreatedAt)
            .one(self.txn)
            .await?)
    }

    pub async fn find_details(
        &self,
        worksheet_id: Uuid,
    ) -> Result<Vec<worksheet_detail::Model>, ServiceError> {
        Ok(worksheet_detail::Entity::find()
            .filter(worksheet_detail::Column::WorksheetId.eq(worksheet_id))
            .order_by_asc(worksheet_detail::Column::CreatedAt)
            .order_by_asc(worksheet_detail::Column::Name)
            .all(self.txn)
            .await?)
    }

    pub async fn find_detail_by_name(
        &self,
        ctx: &OperationContext,
        name: &str,
    ) -> Result<worksheet_detail::Model, ServiceError> {
        worksheet_detail::Entity::find()
            .filter(worksheet_detail::Column::DomainId.eq(ctx.domain_id))
            .filter(worksheet_detail::Column::Name.eq(name))
            .one(self.txn)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("Failed to find worksheet detail {}", name))
            })
    }

    /// Resolves the reference order the worksheet is linked to.
    pub async fn extract_ref_order(
        &self,
        worksheet: &worksheet::Model,
    ) -> Result<RefOrder, ServiceError> {
        self.reference_orders()
            .find(RefOrderLink::new(worksheet.ref_order_kind, worksheet.ref_order_id))
            .await
    }

    pub async fn set_detail_status(
        &self,
        ctx: &OperationContext,
        detail: worksheet_detail::Model,
        status: WorksheetStatus,
    ) -> Result<worksheet_detail::Model, ServiceError> {
        let updater = ctx.updater()?;
        if detail.id.is_nil() {
            return Err(ServiceError::precondition("Target doesn't have ID"));
        }
        let mut active: worksheet_detail::ActiveModel = detail.into();
        active.status = Set(status);
        active.updater_id = Set(updater);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.txn).await?)
    }
}
