use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use invoiceforge_core::TenantId;

/// Envelope for an event, containing tenant + stream metadata.
///
/// This is the unit appended to a per-aggregate audit stream.
///
/// - **Multi-tenancy** is enforced here via `tenant_id`.
/// - **Append-only**: `sequence_number` increases monotonically per stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<Id, E> {
    event_id: Uuid,
    tenant_id: TenantId,

    aggregate_id: Id,
    aggregate_type: String,
    event_type: String,

    /// Monotonically increasing position in the aggregate stream.
    sequence_number: u64,
    recorded_at: DateTime<Utc>,

    payload: E,
}

impl<Id, E> EventEnvelope<Id, E>
where
    E: crate::Event,
{
    /// Wrap `payload` as the next entry in a stream currently at `current_version`.
    pub fn next(
        tenant_id: TenantId,
        aggregate_id: Id,
        aggregate_type: impl Into<String>,
        current_version: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: payload.event_type().to_string(),
            sequence_number: current_version + 1,
            recorded_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<Id: Copy, E> EventEnvelope<Id, E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> Id {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
