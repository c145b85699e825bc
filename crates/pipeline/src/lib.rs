//! Lead Orchestrator
//!
//! Sequences the intake pipeline: classify → quality gate → match →
//! per-business notifications, and builds the call context when a call is
//! requested. The only component with an end-to-end view of one lead's
//! lifecycle, and the sole writer of lead status before a call.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use fixline_agent::{generate_response, BusinessNotification};
use fixline_classifier::{ClassifierError, LeadClassifier};
use fixline_core::{CallContext, CallType, Lead, LeadStatus, Match, TextGenerator};
use fixline_matcher::BusinessMatcher;
use fixline_persistence::{BusinessStore, CallContextStore, LeadStore};

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Classification(#[from] ClassifierError),

    #[error("Matching failed: {0}")]
    Matching(String),

    #[error("Notification generation failed: {0}")]
    Notification(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<fixline_matcher::MatchError> for PipelineError {
    fn from(err: fixline_matcher::MatchError) -> Self {
        PipelineError::Matching(err.to_string())
    }
}

impl From<fixline_persistence::PersistenceError> for PipelineError {
    fn from(err: fixline_persistence::PersistenceError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

/// Outcome of one pass through the intake pipeline
#[derive(Debug)]
pub struct ProcessedLead {
    pub lead: Lead,
    /// Empty for low-quality leads and when nothing qualifies
    pub matches: Vec<Match>,
    /// One notification per match, same order
    pub notifications: Vec<(Uuid, BusinessNotification)>,
}

/// A call request against a processed lead
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub lead_id: Uuid,
    /// Business to call; `None` means the consumer is being called back
    pub business_id: Option<Uuid>,
    pub call_type: CallType,
    /// Telephony call identifier the media stream will carry
    pub telephony_call_id: String,
    /// Required when no business is named
    pub target_phone: Option<String>,
}

/// The lead intake and call-request orchestrator
pub struct LeadPipeline {
    classifier: LeadClassifier,
    matcher: BusinessMatcher,
    llm: Arc<dyn TextGenerator>,
    leads: Arc<dyn LeadStore>,
    businesses: Arc<dyn BusinessStore>,
    contexts: Arc<dyn CallContextStore>,
    quality_threshold: f64,
}

impl LeadPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: LeadClassifier,
        matcher: BusinessMatcher,
        llm: Arc<dyn TextGenerator>,
        leads: Arc<dyn LeadStore>,
        businesses: Arc<dyn BusinessStore>,
        contexts: Arc<dyn CallContextStore>,
        quality_threshold: f64,
    ) -> Self {
        Self {
            classifier,
            matcher,
            llm,
            leads,
            businesses,
            contexts,
            quality_threshold,
        }
    }

    /// Run one description through intake: classify, gate, match, notify.
    pub async fn process(&self, text: &str) -> Result<ProcessedLead, PipelineError> {
        let classification = self.classifier.classify(text).await?;
        let mut lead = Lead::new(text, classification);
        self.leads.create(&lead).await?;

        if lead.classification.quality_score < self.quality_threshold {
            self.transition(&mut lead, LeadStatus::LowQuality).await?;
            tracing::info!(
                lead_id = %lead.id,
                score = lead.classification.quality_score,
                threshold = self.quality_threshold,
                "Lead below quality threshold, not matching"
            );
            return Ok(ProcessedLead {
                lead,
                matches: Vec::new(),
                notifications: Vec::new(),
            });
        }

        self.transition(&mut lead, LeadStatus::Classified).await?;

        let matches = self.matcher.find_matches(&lead).await?;
        if matches.is_empty() {
            tracing::info!(lead_id = %lead.id, "No businesses qualified");
            return Ok(ProcessedLead {
                lead,
                matches,
                notifications: Vec::new(),
            });
        }

        self.transition(&mut lead, LeadStatus::Matched).await?;

        let mut notifications = Vec::with_capacity(matches.len());
        for m in &matches {
            let business = self
                .businesses
                .get(m.business_id)
                .await?
                .ok_or_else(|| PipelineError::NotFound(format!("business {}", m.business_id)))?;
            let notification = generate_response(&self.llm, &lead, &business)
                .await
                .map_err(|e| PipelineError::Notification(e.to_string()))?;
            notifications.push((m.business_id, notification));
        }

        tracing::info!(
            lead_id = %lead.id,
            matches = matches.len(),
            "Lead matched and notifications generated"
        );

        Ok(ProcessedLead {
            lead,
            matches,
            notifications,
        })
    }

    /// Build and register the context for an autonomous call, and mark the
    /// lead contacted. The session bridge fetches the context by the
    /// telephony call id when the media stream opens.
    pub async fn request_call(&self, request: CallRequest) -> Result<CallContext, PipelineError> {
        let mut lead = self
            .leads
            .get(request.lead_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("lead {}", request.lead_id)))?;

        let (callee_name, target_phone) = match request.business_id {
            Some(business_id) => {
                let business = self
                    .businesses
                    .get(business_id)
                    .await?
                    .ok_or_else(|| PipelineError::NotFound(format!("business {}", business_id)))?;
                (business.name, business.phone)
            }
            None => {
                let phone = request.target_phone.clone().ok_or_else(|| {
                    PipelineError::InvalidState(
                        "consumer call requires a target phone".to_string(),
                    )
                })?;
                ("the consumer".to_string(), phone)
            }
        };

        let context = CallContext {
            call_id: Uuid::new_v4(),
            call_type: request.call_type,
            objective: objective_for(request.call_type),
            lead_id: lead.id,
            lead_description: lead.description.clone(),
            category: lead.classification.category,
            urgency: lead.classification.urgency,
            budget: lead.classification.budget,
            location_zip: lead.classification.location_zip.clone(),
            callee_name,
            target_phone,
        };

        self.contexts
            .register(&request.telephony_call_id, context.clone())
            .await?;

        if lead.status == LeadStatus::Matched {
            self.transition(&mut lead, LeadStatus::Contacted).await?;
        } else if lead.status != LeadStatus::Contacted {
            return Err(PipelineError::InvalidState(format!(
                "lead {} is {}, expected matched or contacted",
                lead.id,
                lead.status.as_str()
            )));
        }

        tracing::info!(
            lead_id = %lead.id,
            call_id = %context.call_id,
            telephony_call_id = %request.telephony_call_id,
            call_type = context.call_type.as_str(),
            "Call context registered"
        );

        Ok(context)
    }

    async fn transition(
        &self,
        lead: &mut Lead,
        target: LeadStatus,
    ) -> Result<(), PipelineError> {
        lead.transition(target)
            .map_err(|e| PipelineError::InvalidState(e.to_string()))?;
        self.leads.update_status(lead.id, target).await?;
        Ok(())
    }
}

fn objective_for(call_type: CallType) -> String {
    match call_type {
        CallType::QualifyLead => {
            "Confirm the consumer's problem, timing, and budget so a provider can quote it"
        }
        CallType::ConfirmAppointment => "Confirm the scheduled appointment still works",
        CallType::FollowUp => "Check whether the work was completed satisfactorily",
        CallType::ConsumerCallback => "Return the consumer's callback request",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fixline_config::{ClassifierConfig, MatcherConfig};
    use fixline_core::{
        Business, GenerateRequest, GeoPoint, PricingTier, ServiceCategory,
    };
    use fixline_persistence::{
        InMemoryBusinessStore, InMemoryCallContextStore, InMemoryLeadStore, PersistenceError,
    };
    use parking_lot::Mutex;

    const CLASSIFICATION_GOOD: &str = r#"{
        "category": "plumbing",
        "urgency": "emergency",
        "budget_min": 0,
        "budget_max": 500,
        "location_zip": "46032",
        "requirements": ["water heater leaking", "need someone ASAP"],
        "sentiment": "negative"
    }"#;

    const CLASSIFICATION_VAGUE: &str = r#"{
        "category": "other",
        "urgency": "low",
        "requirements": [],
        "sentiment": "neutral"
    }"#;

    const NOTIFICATION: &str = r#"{
        "subject": "URGENT: plumbing lead in 46032",
        "message": "Leaking water heater in 46032, budget $500 max.",
        "call_to_action": "Respond now to claim this lead."
    }"#;

    /// Routes canned responses by which system prompt is asking.
    struct RoutingGenerator {
        classification: String,
    }

    #[async_trait]
    impl TextGenerator for RoutingGenerator {
        async fn generate(&self, request: GenerateRequest) -> fixline_core::Result<String> {
            let system = request.system.unwrap_or_default();
            if system.contains("extract structured data") {
                Ok(self.classification.clone())
            } else {
                Ok(NOTIFICATION.to_string())
            }
        }

        fn model_name(&self) -> &str {
            "routing-mock"
        }
    }

    /// Counts category queries so tests can assert the matcher never ran.
    struct CountingBusinessStore {
        inner: InMemoryBusinessStore,
        category_queries: Mutex<usize>,
    }

    impl CountingBusinessStore {
        fn new() -> Self {
            Self {
                inner: InMemoryBusinessStore::new(),
                category_queries: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BusinessStore for CountingBusinessStore {
        async fn get(&self, id: Uuid) -> Result<Option<Business>, PersistenceError> {
            self.inner.get(id).await
        }

        async fn find_by_category(
            &self,
            category: ServiceCategory,
        ) -> Result<Vec<Business>, PersistenceError> {
            *self.category_queries.lock() += 1;
            self.inner.find_by_category(category).await
        }
    }

    fn seeded_business() -> Business {
        Business {
            id: Uuid::new_v4(),
            name: "Ajax Plumbing".into(),
            phone: "+13175550100".into(),
            categories: vec![ServiceCategory::Plumbing],
            location: GeoPoint::new(39.97, -86.12),
            location_zip: "46032".into(),
            pricing_tier: PricingTier::Standard,
            rating: 4.6,
            active: true,
            offers_emergency_service: true,
            licensed: true,
            insured: true,
            avg_response_minutes: Some(30),
        }
    }

    struct Fixture {
        pipeline: LeadPipeline,
        leads: Arc<InMemoryLeadStore>,
        businesses: Arc<CountingBusinessStore>,
        contexts: Arc<InMemoryCallContextStore>,
        business: Business,
    }

    fn fixture(classification: &str) -> Fixture {
        let llm: Arc<dyn TextGenerator> = Arc::new(RoutingGenerator {
            classification: classification.to_string(),
        });
        let leads = Arc::new(InMemoryLeadStore::new());
        let businesses = Arc::new(CountingBusinessStore::new());
        let contexts = Arc::new(InMemoryCallContextStore::new());

        let business = seeded_business();
        businesses.inner.insert(business.clone());

        let pipeline = LeadPipeline::new(
            LeadClassifier::new(llm.clone(), ClassifierConfig::default()),
            BusinessMatcher::new(businesses.clone(), MatcherConfig::default()),
            llm,
            leads.clone(),
            businesses.clone(),
            contexts.clone(),
            5.0,
        );

        Fixture {
            pipeline,
            leads,
            businesses,
            contexts,
            business,
        }
    }

    #[tokio::test]
    async fn test_good_lead_flows_to_matched() {
        let f = fixture(CLASSIFICATION_GOOD);
        let result = f.pipeline.process("water heater leaking in 46032").await.unwrap();

        assert_eq!(result.lead.status, LeadStatus::Matched);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.notifications.len(), 1);
        assert!(result.notifications[0].1.subject.to_lowercase().contains("urgent"));

        let stored = f.leads.get(result.lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::Matched);
    }

    #[tokio::test]
    async fn test_low_quality_short_circuits_matcher() {
        let f = fixture(CLASSIFICATION_VAGUE);
        let result = f.pipeline.process("need help with stuff").await.unwrap();

        assert_eq!(result.lead.status, LeadStatus::LowQuality);
        assert!(result.matches.is_empty());
        assert!(result.notifications.is_empty());
        // the matcher was never consulted
        assert_eq!(*f.businesses.category_queries.lock(), 0);

        let stored = f.leads.get(result.lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::LowQuality);
    }

    #[tokio::test]
    async fn test_request_call_registers_context_and_contacts_lead() {
        let f = fixture(CLASSIFICATION_GOOD);
        let processed = f.pipeline.process("water heater leaking").await.unwrap();

        let context = f
            .pipeline
            .request_call(CallRequest {
                lead_id: processed.lead.id,
                business_id: Some(f.business.id),
                call_type: CallType::QualifyLead,
                telephony_call_id: "CA100".into(),
                target_phone: None,
            })
            .await
            .unwrap();

        assert_eq!(context.callee_name, "Ajax Plumbing");
        assert_eq!(context.target_phone, "+13175550100");
        assert_eq!(context.lead_id, processed.lead.id);

        let registered = f.contexts.get("CA100").await.unwrap().unwrap();
        assert_eq!(registered.call_id, context.call_id);

        let stored = f.leads.get(processed.lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::Contacted);
    }

    #[tokio::test]
    async fn test_request_call_on_unmatched_lead_fails() {
        let f = fixture(CLASSIFICATION_VAGUE);
        let processed = f.pipeline.process("need help with stuff").await.unwrap();

        let result = f
            .pipeline
            .request_call(CallRequest {
                lead_id: processed.lead.id,
                business_id: Some(f.business.id),
                call_type: CallType::QualifyLead,
                telephony_call_id: "CA101".into(),
                target_phone: None,
            })
            .await;

        assert!(matches!(result, Err(PipelineError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_consumer_callback_requires_phone() {
        let f = fixture(CLASSIFICATION_GOOD);
        let processed = f.pipeline.process("water heater leaking").await.unwrap();

        let result = f
            .pipeline
            .request_call(CallRequest {
                lead_id: processed.lead.id,
                business_id: None,
                call_type: CallType::ConsumerCallback,
                telephony_call_id: "CA102".into(),
                target_phone: None,
            })
            .await;

        assert!(matches!(result, Err(PipelineError::InvalidState(_))));
    }
}
