use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant and actor for a single operation.
///
/// Passed explicitly into every command and service call; nothing in the
/// engine looks up the "current" domain or user on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    pub domain_id: Uuid,
    pub user_id: Uuid,
}

impl OperationContext {
    pub fn new(domain_id: Uuid, user_id: Uuid) -> Self {
        Self { domain_id, user_id }
    }

    /// The user recorded as creator of new records.
    pub fn creator(&self) -> Result<Uuid, ServiceError> {
        if self.user_id.is_nil() {
            return Err(ServiceError::precondition("Cannot create without creator"));
        }
        Ok(self.user_id)
    }

    /// The user recorded as updater of modified records.
    pub fn updater(&self) -> Result<Uuid, ServiceError> {
        if self.user_id.is_nil() {
            return Err(ServiceError::precondition("Cannot update without updater"));
        }
        Ok(self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn nil_actor_is_rejected_for_create_and_update() {
        let ctx = OperationContext::new(Uuid::new_v4(), Uuid::nil());

        assert_matches!(
            ctx.creator(),
            Err(ServiceError::PreconditionViolation(msg)) if msg == "Cannot create without creator"
        );
        assert_matches!(
            ctx.updater(),
            Err(ServiceError::PreconditionViolation(msg)) if msg == "Cannot update without updater"
        );
    }

    #[test]
    fn present_actor_is_returned() {
        let user = Uuid::new_v4();
        let ctx = OperationContext::new(Uuid::new_v4(), user);
        assert_eq!(ctx.creator().unwrap(), user);
        assert_eq!(ctx.updater().unwrap(), user);
    }
}
