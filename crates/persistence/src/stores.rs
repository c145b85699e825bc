//! Store traits
//!
//! All reads and writes are keyed by identifiers (lead id, business id,
//! call id, telephony call id). No query language leaks through here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fixline_core::{Business, CallContext, CallOutcome, Lead, LeadStatus, ServiceCategory};

use crate::PersistenceError;

/// Lead storage
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create(&self, lead: &Lead) -> Result<(), PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, PersistenceError>;

    /// Overwrite the stored status for a lead. Idempotent: writing the
    /// current status again is a no-op, not an error.
    async fn update_status(&self, id: Uuid, status: LeadStatus) -> Result<(), PersistenceError>;
}

/// Business storage (read-only to this pipeline)
#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Business>, PersistenceError>;

    /// All active businesses offering the category.
    async fn find_by_category(
        &self,
        category: ServiceCategory,
    ) -> Result<Vec<Business>, PersistenceError>;
}

/// The durable record of one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: Uuid,
    pub lead_id: Uuid,
    pub telephony_call_id: Option<String>,
    pub outcome: CallOutcome,
    pub attempt: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Call record storage
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Upsert keyed by call id: saving the same call twice leaves one record.
    async fn save(&self, record: &CallRecord) -> Result<(), PersistenceError>;

    async fn get(&self, call_id: Uuid) -> Result<Option<CallRecord>, PersistenceError>;

    async fn count(&self) -> Result<usize, PersistenceError>;
}

/// Pending call contexts, keyed by the telephony call identifier.
///
/// The orchestrator registers a context at call initiation; the session
/// bridge looks it up when the media stream's `start` event arrives.
#[async_trait]
pub trait CallContextStore: Send + Sync {
    async fn register(
        &self,
        telephony_call_id: &str,
        context: CallContext,
    ) -> Result<(), PersistenceError>;

    async fn get(&self, telephony_call_id: &str)
        -> Result<Option<CallContext>, PersistenceError>;

    async fn remove(&self, telephony_call_id: &str) -> Result<(), PersistenceError>;
}
