use crate::{
    context::OperationContext,
    db::DbPool,
    entities::OrderStatus,
    errors::ServiceError,
    events::{Event, EventSender},
    naming::{DatedNameGenerator, NameGenerator},
    notifications::{InMemoryRecipientDirectory, Notifier, RecipientDirectory},
    services::worksheets::WorksheetBundle,
};
use async_trait::async_trait;
use std::sync::Arc;
use validator::ValidationError;

pub mod cycle_count;
pub mod inbound;
pub mod loading;
pub mod picking;
pub mod returns;
pub mod vas;
pub mod worksheets;

/// Command trait for implementing the Command Pattern
///
/// Each command is one externally invocable operation. It validates its own
/// input, runs everything it writes inside a single unit of work and only
/// publishes events and notifications after that unit of work committed.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool the unit of work is opened on
    /// * `collaborators` - Name generation, event publishing and notifications
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        collaborators: Arc<Collaborators>,
    ) -> Result<Self::Result, ServiceError>;
}

/// External collaborators a command needs besides the database.
#[derive(Clone)]
pub struct Collaborators {
    pub event_sender: EventSender,
    pub names: Arc<dyn NameGenerator>,
    pub notifier: Notifier,
}

impl Collaborators {
    pub fn new(event_sender: EventSender, names: Arc<dyn NameGenerator>, notifier: Notifier) -> Self {
        Self { event_sender, names, notifier }
    }

    /// Dated names and an empty recipient directory; notifications go out
    /// as events on `event_sender`.
    pub fn with_defaults(event_sender: EventSender) -> Self {
        let directory: Arc<dyn RecipientDirectory> = Arc::new(InMemoryRecipientDirectory::new());
        let notifier = Notifier::new(directory, Arc::new(event_sender.clone()));
        Self::new(event_sender, Arc::new(DatedNameGenerator), notifier)
    }
}

pub(crate) fn validate_context(context: &OperationContext) -> Result<(), ValidationError> {
    if context.domain_id.is_nil() {
        return Err(ValidationError::new("missing_domain"));
    }
    if context.user_id.is_nil() {
        return Err(ValidationError::new("missing_user"));
    }
    Ok(())
}

pub(crate) fn worksheet_activated(bundle: &WorksheetBundle) -> Event {
    Event::WorksheetActivated {
        worksheet_id: bundle.worksheet.id,
        name: bundle.worksheet.name.clone(),
    }
}

pub(crate) fn worksheet_completed(bundle: &WorksheetBundle, ref_order_status: Option<OrderStatus>) -> Event {
    Event::WorksheetCompleted {
        worksheet_id: bundle.worksheet.id,
        name: bundle.worksheet.name.clone(),
        ref_order_status: ref_order_status.map(|s| s.to_string()),
    }
}

pub(crate) fn worksheet_generated(bundle: &WorksheetBundle) -> Event {
    Event::WorksheetGenerated {
        worksheet_id: bundle.worksheet.id,
        name: bundle.worksheet.name.clone(),
        worksheet_type: bundle.worksheet.worksheet_type.to_string(),
        detail_count: bundle.details.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn context_needs_domain_and_user() {
        assert!(validate_context(&OperationContext::new(Uuid::new_v4(), Uuid::new_v4())).is_ok());
        assert!(validate_context(&OperationContext::new(Uuid::nil(), Uuid::new_v4())).is_err());
        assert!(validate_context(&OperationContext::new(Uuid::new_v4(), Uuid::nil())).is_err());
    }

    #[tokio::test]
    async fn default_collaborators_use_dated_names_and_an_empty_directory() {
        let (sender, mut rx) = crate::events::channel(4);
        let collaborators = Collaborators::with_defaults(sender);

        let name = collaborators.names.worksheet(crate::entities::WorksheetType::Return);
        assert!(name.starts_with("RTN-"));

        // Nobody is registered in the default directory, so nothing goes out.
        collaborators
            .notifier
            .notify_office_admins(
                Uuid::new_v4(),
                crate::notifications::NotificationMessage::new("Cycle count", "review", "/cc"),
            )
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn commands_accept_transport_payloads_without_optional_lists() {
        let domain = Uuid::new_v4();
        let user = Uuid::new_v4();
        let payload = serde_json::json!({
            "context": { "domain_id": domain, "user_id": user },
            "worksheet_no": "ULD-0001",
        });

        let cmd: inbound::ActivateUnloadingCommand = serde_json::from_value(payload).unwrap();
        assert_eq!(cmd.context.domain_id, domain);
        assert_eq!(cmd.worksheet_no, "ULD-0001");
        assert!(cmd.pallet_patches.is_empty());
        assert!(cmd.changed_details.is_empty());
    }
}
