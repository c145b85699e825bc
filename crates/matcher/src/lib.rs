//! Business Matcher
//!
//! Ranks registered businesses against a classified lead. Category is a
//! binary gate; confidence combines proximity, rating, and an emergency
//! boost. Results are ordered by descending confidence with distance as
//! tiebreak and are deterministic for equal input.

use std::sync::Arc;
use thiserror::Error;

use fixline_config::MatcherConfig;
use fixline_core::{Business, Lead, Match, Urgency};
use fixline_persistence::BusinessStore;

/// Matcher errors
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Store error: {0}")]
    Store(String),
}

impl From<fixline_persistence::PersistenceError> for MatchError {
    fn from(err: fixline_persistence::PersistenceError) -> Self {
        MatchError::Store(err.to_string())
    }
}

/// Business matcher over a business store
pub struct BusinessMatcher {
    store: Arc<dyn BusinessStore>,
    config: MatcherConfig,
}

impl BusinessMatcher {
    pub fn new(store: Arc<dyn BusinessStore>, config: MatcherConfig) -> Self {
        Self { store, config }
    }

    /// Find matches for a lead, best first.
    ///
    /// Returns an empty vec (not an error) when no business qualifies.
    pub async fn find_matches(&self, lead: &Lead) -> Result<Vec<Match>, MatchError> {
        let category = lead.classification.category;
        let candidates = self.store.find_by_category(category).await?;

        let mut matches: Vec<Match> = candidates
            .iter()
            .map(|b| self.score(lead, b))
            .collect();

        matches.sort_by(|a, b| {
            b.confidence.cmp(&a.confidence).then_with(|| {
                let da = a.distance_miles.unwrap_or(f64::MAX);
                let db = b.distance_miles.unwrap_or(f64::MAX);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        tracing::debug!(
            lead_id = %lead.id,
            category = %category,
            candidates = candidates.len(),
            matches = matches.len(),
            "Matching complete"
        );

        Ok(matches)
    }

    fn score(&self, lead: &Lead, business: &Business) -> Match {
        let cfg = &self.config;
        let mut confidence = cfg.category_base;
        let mut reasons = vec![format!(
            "offers {} service",
            lead.classification.category
        )];

        // Proximity: full weight at zero distance, tapering to zero at the
        // configured radius.
        let distance = lead
            .classification
            .location
            .map(|point| point.distance_miles(&business.location));
        if let Some(d) = distance {
            if d <= cfg.max_radius_miles {
                let proximity =
                    (cfg.proximity_weight as f64 * (1.0 - d / cfg.max_radius_miles)).round() as u32;
                confidence += proximity;
                reasons.push(format!("within {:.0} miles", d.ceil().max(1.0)));
            }
        } else if let Some(lead_zip) = &lead.classification.location_zip {
            // No coordinates: same postal code is the only proximity signal.
            if *lead_zip == business.location_zip {
                confidence += cfg.proximity_weight;
                reasons.push(format!("serves postal code {}", business.location_zip));
            }
        }

        // Rating contribution, rating in [0, 5].
        let rating_points = (business.rating.clamp(0.0, 5.0) * cfg.rating_weight as f64).round() as u32;
        confidence += rating_points;
        if business.rating >= 4.0 {
            reasons.push(format!("rated {:.1} stars", business.rating));
        }

        if lead.classification.urgency == Urgency::Emergency && business.offers_emergency_service {
            confidence += cfg.emergency_boost;
            reasons.push("offers emergency service".to_string());
        }

        if business.licensed && business.insured {
            reasons.push("licensed and insured".to_string());
        }

        Match {
            lead_id: lead.id,
            business_id: business.id,
            business_name: business.name.clone(),
            confidence: confidence.min(100),
            distance_miles: distance,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixline_core::{
        ClassifiedLead, GeoPoint, LeadStatus, PricingTier, Sentiment, ServiceCategory,
    };
    use fixline_persistence::InMemoryBusinessStore;
    use uuid::Uuid;

    fn business(
        name: &str,
        category: ServiceCategory,
        location: GeoPoint,
        rating: f64,
        emergency: bool,
    ) -> Business {
        Business {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: "+13175550100".into(),
            categories: vec![category],
            location,
            location_zip: "46032".into(),
            pricing_tier: PricingTier::Standard,
            rating,
            active: true,
            offers_emergency_service: emergency,
            licensed: true,
            insured: true,
            avg_response_minutes: Some(60),
        }
    }

    fn lead(category: ServiceCategory, urgency: Urgency, location: Option<GeoPoint>) -> Lead {
        let mut lead = Lead::new(
            "test lead",
            ClassifiedLead {
                category,
                urgency,
                budget: None,
                location_zip: Some("46032".into()),
                location,
                requirements: vec!["fix it".into()],
                sentiment: Sentiment::Neutral,
                quality_score: 8.0,
            },
        );
        lead.status = LeadStatus::Classified;
        lead
    }

    fn matcher(store: Arc<InMemoryBusinessStore>) -> BusinessMatcher {
        BusinessMatcher::new(store, MatcherConfig::default())
    }

    #[tokio::test]
    async fn test_category_gate() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let here = GeoPoint::new(39.97, -86.12);
        store.insert(business("Ajax Plumbing", ServiceCategory::Plumbing, here, 4.5, false));
        store.insert(business("Watt Electric", ServiceCategory::Electrical, here, 5.0, true));

        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Plumbing, Urgency::Medium, Some(here)))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].business_name, "Ajax Plumbing");
    }

    #[tokio::test]
    async fn test_empty_when_none_qualify() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Roofing, Urgency::Low, None))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_closer_business_ranks_higher() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let lead_loc = GeoPoint::new(39.97, -86.12);
        let near = GeoPoint::new(39.98, -86.12);
        let far = GeoPoint::new(39.70, -86.40);
        store.insert(business("Near Plumbing", ServiceCategory::Plumbing, near, 4.0, false));
        store.insert(business("Far Plumbing", ServiceCategory::Plumbing, far, 4.0, false));

        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Plumbing, Urgency::Medium, Some(lead_loc)))
            .await
            .unwrap();

        assert_eq!(matches[0].business_name, "Near Plumbing");
        assert!(matches[0].confidence > matches[1].confidence);
    }

    #[tokio::test]
    async fn test_emergency_boost_applies() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let here = GeoPoint::new(39.97, -86.12);
        store.insert(business("Day Plumbing", ServiceCategory::Plumbing, here, 4.5, false));
        store.insert(business("AllNight Plumbing", ServiceCategory::Plumbing, here, 4.5, true));

        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Plumbing, Urgency::Emergency, Some(here)))
            .await
            .unwrap();

        assert_eq!(matches[0].business_name, "AllNight Plumbing");
        assert!(matches[0]
            .reasons
            .iter()
            .any(|r| r == "offers emergency service"));
        assert!(!matches[1]
            .reasons
            .iter()
            .any(|r| r == "offers emergency service"));
    }

    #[tokio::test]
    async fn test_distance_breaks_confidence_ties() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let lead_loc = GeoPoint::new(39.97, -86.12);
        // Both beyond the proximity radius, identical rating: tie on
        // confidence, distance decides.
        let far = GeoPoint::new(38.50, -86.12);
        let farther = GeoPoint::new(38.00, -86.12);
        store.insert(business("Far", ServiceCategory::Plumbing, far, 4.0, false));
        store.insert(business("Farther", ServiceCategory::Plumbing, farther, 4.0, false));

        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Plumbing, Urgency::Medium, Some(lead_loc)))
            .await
            .unwrap();

        assert_eq!(matches[0].confidence, matches[1].confidence);
        assert_eq!(matches[0].business_name, "Far");
    }

    #[tokio::test]
    async fn test_zip_fallback_without_coordinates() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let here = GeoPoint::new(39.97, -86.12);
        store.insert(business("Same Zip", ServiceCategory::Plumbing, here, 4.0, false));

        let m = matcher(store);
        let matches = m
            .find_matches(&lead(ServiceCategory::Plumbing, Urgency::Medium, None))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert!(matches[0]
            .reasons
            .iter()
            .any(|r| r.contains("postal code")));
        assert!(matches[0].distance_miles.is_none());
    }

    #[tokio::test]
    async fn test_deterministic_for_equal_input() {
        let store = Arc::new(InMemoryBusinessStore::new());
        let here = GeoPoint::new(39.97, -86.12);
        for i in 0..5 {
            store.insert(business(
                &format!("Biz {}", i),
                ServiceCategory::Plumbing,
                here,
                4.0,
                false,
            ));
        }

        let m = matcher(store);
        let l = lead(ServiceCategory::Plumbing, Urgency::Medium, Some(here));
        let first = m.find_matches(&l).await.unwrap();
        let second = m.find_matches(&l).await.unwrap();

        let ids1: Vec<_> = first.iter().map(|x| x.business_id).collect();
        let ids2: Vec<_> = second.iter().map(|x| x.business_id).collect();
        assert_eq!(ids1, ids2);
    }
}
