//! Recipient lookup and fire-and-forget delivery of operator notifications.

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Role name selecting office administrators within a domain.
pub const OFFICE_ADMIN_ROLE: &str = "Office Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub message: String,
    pub url: String,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            url: url.into(),
        }
    }
}

/// Transport for notifications. Must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, receivers: &[Uuid], message: &NotificationMessage) -> Result<(), ServiceError>;
}

impl NotificationSink for EventSender {
    fn notify(&self, receivers: &[Uuid], message: &NotificationMessage) -> Result<(), ServiceError> {
        self.send_or_log(Event::NotificationRequested {
            receivers: receivers.to_vec(),
            title: message.title.clone(),
            message: message.message.clone(),
            url: message.url.clone(),
        });
        Ok(())
    }
}

/// Selects notification recipients by tenant role or business partner.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn users_with_role(&self, domain_id: Uuid, role: &str) -> Result<Vec<Uuid>, ServiceError>;
    async fn partner_users(&self, domain_id: Uuid, bizplace_id: Uuid) -> Result<Vec<Uuid>, ServiceError>;
}

/// Directory kept in memory, populated by the embedding application.
#[derive(Debug, Default)]
pub struct InMemoryRecipientDirectory {
    roles: DashMap<(Uuid, String), Vec<Uuid>>,
    partners: DashMap<(Uuid, Uuid), Vec<Uuid>>,
}

impl InMemoryRecipientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_role(&self, domain_id: Uuid, role: &str, user_id: Uuid) {
        self.roles
            .entry((domain_id, role.to_string()))
            .or_default()
            .push(user_id);
    }

    pub fn assign_partner(&self, domain_id: Uuid, bizplace_id: Uuid, user_id: Uuid) {
        self.partners
            .entry((domain_id, bizplace_id))
            .or_default()
            .push(user_id);
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryRecipientDirectory {
    async fn users_with_role(&self, domain_id: Uuid, role: &str) -> Result<Vec<Uuid>, ServiceError> {
        Ok(self
            .roles
            .get(&(domain_id, role.to_string()))
            .map(|users| users.value().clone())
            .unwrap_or_default())
    }

    async fn partner_users(&self, domain_id: Uuid, bizplace_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        Ok(self
            .partners
            .get(&(domain_id, bizplace_id))
            .map(|users| users.value().clone())
            .unwrap_or_default())
    }
}

/// Resolves recipients and hands messages to the sink.
///
/// Called after a unit of work commits. Failures are logged and swallowed;
/// a notification never affects the outcome of an operation.
#[derive(Clone)]
pub struct Notifier {
    directory: Arc<dyn RecipientDirectory>,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(directory: Arc<dyn RecipientDirectory>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { directory, sink }
    }

    #[instrument(skip(self, message), fields(title = %message.title))]
    pub async fn notify_office_admins(&self, domain_id: Uuid, message: NotificationMessage) {
        match self.directory.users_with_role(domain_id, OFFICE_ADMIN_ROLE).await {
            Ok(users) => self.deliver(&users, &message),
            Err(e) => warn!("Failed to resolve office admins: {}", e),
        }
    }

    #[instrument(skip(self, message), fields(title = %message.title))]
    pub async fn notify_customer(&self, domain_id: Uuid, bizplace_id: Uuid, message: NotificationMessage) {
        match self.directory.partner_users(domain_id, bizplace_id).await {
            Ok(users) => self.deliver(&users, &message),
            Err(e) => warn!("Failed to resolve customer users: {}", e),
        }
    }

    fn deliver(&self, users: &[Uuid], message: &NotificationMessage) {
        if users.is_empty() {
            return;
        }
        if let Err(e) = self.sink.notify(users, message) {
            warn!("Failed to send notification: {}", e);
        }
    }
}
