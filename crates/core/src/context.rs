//! Request context passed explicitly into every collaborator call.

use serde::{Deserialize, Serialize};

use crate::id::{TenantId, UserId};

/// Session context for a single editing surface.
///
/// Tenant and acting user are never read from ambient state; callers carry this
/// value into catalog lookups and gateway writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContext {
    tenant_id: TenantId,
    user_id: UserId,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self { tenant_id, user_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
