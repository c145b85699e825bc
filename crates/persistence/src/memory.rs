//! In-memory store backends
//!
//! Default backends with no persistence across restarts. Each is a
//! `parking_lot::RwLock<HashMap>` keyed the same way the external store is.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use fixline_core::{Business, CallContext, Lead, LeadStatus, ServiceCategory};

use crate::stores::{BusinessStore, CallContextStore, CallRecord, CallRecordStore, LeadStore};
use crate::PersistenceError;

/// In-memory lead store
#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<Uuid, Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create(&self, lead: &Lead) -> Result<(), PersistenceError> {
        self.leads.write().insert(lead.id, lead.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, PersistenceError> {
        Ok(self.leads.read().get(&id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: LeadStatus) -> Result<(), PersistenceError> {
        let mut leads = self.leads.write();
        let lead = leads
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::NotFound(format!("lead {}", id)))?;
        lead.status = status;
        lead.updated_at = chrono::Utc::now();
        Ok(())
    }
}

/// In-memory business store
#[derive(Default)]
pub struct InMemoryBusinessStore {
    businesses: RwLock<HashMap<Uuid, Business>>,
}

impl InMemoryBusinessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store; the business-management surface owns these records.
    pub fn insert(&self, business: Business) {
        self.businesses.write().insert(business.id, business);
    }
}

#[async_trait]
impl BusinessStore for InMemoryBusinessStore {
    async fn get(&self, id: Uuid) -> Result<Option<Business>, PersistenceError> {
        Ok(self.businesses.read().get(&id).cloned())
    }

    async fn find_by_category(
        &self,
        category: ServiceCategory,
    ) -> Result<Vec<Business>, PersistenceError> {
        let mut found: Vec<Business> = self
            .businesses
            .read()
            .values()
            .filter(|b| b.active && b.offers_category(category))
            .cloned()
            .collect();
        // HashMap iteration order is not deterministic; callers rely on
        // equal input producing equal output.
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

/// In-memory call record store
#[derive(Default)]
pub struct InMemoryCallRecordStore {
    records: RwLock<HashMap<Uuid, CallRecord>>,
}

impl InMemoryCallRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallRecordStore {
    async fn save(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.write();
        if records.insert(record.call_id, record.clone()).is_some() {
            tracing::debug!(call_id = %record.call_id, "Call record overwritten in place");
        }
        Ok(())
    }

    async fn get(&self, call_id: Uuid) -> Result<Option<CallRecord>, PersistenceError> {
        Ok(self.records.read().get(&call_id).cloned())
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.read().len())
    }
}

/// In-memory pending-call context store
#[derive(Default)]
pub struct InMemoryCallContextStore {
    contexts: RwLock<HashMap<String, CallContext>>,
}

impl InMemoryCallContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallContextStore for InMemoryCallContextStore {
    async fn register(
        &self,
        telephony_call_id: &str,
        context: CallContext,
    ) -> Result<(), PersistenceError> {
        self.contexts
            .write()
            .insert(telephony_call_id.to_string(), context);
        Ok(())
    }

    async fn get(
        &self,
        telephony_call_id: &str,
    ) -> Result<Option<CallContext>, PersistenceError> {
        Ok(self.contexts.read().get(telephony_call_id).cloned())
    }

    async fn remove(&self, telephony_call_id: &str) -> Result<(), PersistenceError> {
        self.contexts.write().remove(telephony_call_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fixline_core::{
        BudgetRange, CallOutcome, CallType, ClassifiedLead, GeoPoint, InterestLevel, NextAction,
        OutcomeStatus, PricingTier, Sentiment, Urgency,
    };

    fn sample_lead() -> Lead {
        Lead::new(
            "water heater leaking",
            ClassifiedLead {
                category: ServiceCategory::Plumbing,
                urgency: Urgency::Emergency,
                budget: Some(BudgetRange { min: 0.0, max: Some(500.0) }),
                location_zip: Some("46032".into()),
                location: None,
                requirements: vec!["water heater".into()],
                sentiment: Sentiment::Negative,
                quality_score: 8.0,
            },
        )
    }

    fn sample_record(call_id: Uuid) -> CallRecord {
        CallRecord {
            call_id,
            lead_id: Uuid::new_v4(),
            telephony_call_id: Some("CA123".into()),
            outcome: CallOutcome {
                call_id,
                status: OutcomeStatus::GoalAchieved,
                summary: "scheduled".into(),
                transcript: vec![],
                interest_level: InterestLevel::High,
                appointment_time: None,
                quote_amount: Some(450.0),
                next_action: NextAction::ScheduleAppointment,
                completed_at: Utc::now(),
            },
            attempt: 1,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lead_store_roundtrip() {
        let store = InMemoryLeadStore::new();
        let lead = sample_lead();
        store.create(&lead).await.unwrap();

        let fetched = store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, lead.id);

        store.update_status(lead.id, LeadStatus::Classified).await.unwrap();
        let fetched = store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, LeadStatus::Classified);
    }

    #[tokio::test]
    async fn test_lead_store_update_missing_errors() {
        let store = InMemoryLeadStore::new();
        let result = store.update_status(Uuid::new_v4(), LeadStatus::Closed).await;
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_call_record_save_is_idempotent() {
        let store = InMemoryCallRecordStore::new();
        let call_id = Uuid::new_v4();
        let record = sample_record(call_id);

        store.save(&record).await.unwrap();
        store.save(&record).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let fetched = store.get(call_id).await.unwrap().unwrap();
        assert_eq!(fetched.outcome.status, OutcomeStatus::GoalAchieved);
    }

    #[tokio::test]
    async fn test_business_store_filters_inactive() {
        let store = InMemoryBusinessStore::new();
        let mut active = Business {
            id: Uuid::new_v4(),
            name: "Active Plumbing".into(),
            phone: "+13175550100".into(),
            categories: vec![ServiceCategory::Plumbing],
            location: GeoPoint::new(39.97, -86.12),
            location_zip: "46032".into(),
            pricing_tier: PricingTier::Standard,
            rating: 4.5,
            active: true,
            offers_emergency_service: false,
            licensed: true,
            insured: true,
            avg_response_minutes: None,
        };
        store.insert(active.clone());

        active.id = Uuid::new_v4();
        active.name = "Dormant Plumbing".into();
        active.active = false;
        store.insert(active);

        let found = store.find_by_category(ServiceCategory::Plumbing).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Active Plumbing");
    }

    #[tokio::test]
    async fn test_context_store_register_get_remove() {
        let store = InMemoryCallContextStore::new();
        let context = CallContext {
            call_id: Uuid::new_v4(),
            call_type: CallType::QualifyLead,
            objective: "qualify".into(),
            lead_id: Uuid::new_v4(),
            lead_description: "leak".into(),
            category: ServiceCategory::Plumbing,
            urgency: Urgency::High,
            budget: None,
            location_zip: None,
            callee_name: "Ajax Plumbing".into(),
            target_phone: "+13175550100".into(),
        };

        store.register("CA42", context.clone()).await.unwrap();
        assert!(store.get("CA42").await.unwrap().is_some());
        store.remove("CA42").await.unwrap();
        assert!(store.get("CA42").await.unwrap().is_none());
    }
}
