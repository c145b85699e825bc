//! Lead types: classification result, lifecycle, and the closed vocabularies
//! the classifier is allowed to emit.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Service categories a lead can be classified into.
///
/// This is a closed set: anything the classifier cannot place lands in
/// `Other`, it never invents a new category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Plumbing,
    Hvac,
    Electrical,
    Roofing,
    Landscaping,
    Cleaning,
    PestControl,
    ApplianceRepair,
    Carpentry,
    Other,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Hvac => "hvac",
            Self::Electrical => "electrical",
            Self::Roofing => "roofing",
            Self::Landscaping => "landscaping",
            Self::Cleaning => "cleaning",
            Self::PestControl => "pest_control",
            Self::ApplianceRepair => "appliance_repair",
            Self::Carpentry => "carpentry",
            Self::Other => "other",
        }
    }

    /// Parse a category emitted by the model, mapping unknowns to `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "plumbing" => Self::Plumbing,
            "hvac" | "heating" | "cooling" => Self::Hvac,
            "electrical" => Self::Electrical,
            "roofing" => Self::Roofing,
            "landscaping" => Self::Landscaping,
            "cleaning" => Self::Cleaning,
            "pest_control" | "pest control" => Self::PestControl,
            "appliance_repair" | "appliance repair" | "appliance" => Self::ApplianceRepair,
            "carpentry" => Self::Carpentry,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lead urgency.
///
/// The closed set is emergency/high/medium/low; the classifier maps looser
/// model output ("urgent", "asap") onto it rather than extending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Emergency,
    High,
    #[default]
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "emergency" | "critical" => Self::Emergency,
            "high" | "urgent" | "asap" => Self::High,
            "medium" | "normal" => Self::Medium,
            "low" | "flexible" | "whenever" => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency)
    }
}

/// Sentiment of the consumer's description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Budget range extracted from the problem description.
///
/// `max` is nullable: "at least $200" has a floor but no ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BudgetRange {
    pub min: f64,
    pub max: Option<f64>,
}

/// Structured classification of a free-text problem description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedLead {
    pub category: ServiceCategory,
    pub urgency: Urgency,
    /// Budget range, when the text names figures
    pub budget: Option<BudgetRange>,
    /// Postal code, when the text names one
    pub location_zip: Option<String>,
    /// Coordinates, when resolvable
    pub location: Option<crate::business::GeoPoint>,
    /// Key requirement phrases extracted from the text
    pub requirements: Vec<String>,
    pub sentiment: Sentiment,
    /// Quality score in [0, 10]: completeness and specificity of the lead
    pub quality_score: f64,
}

/// Lead lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    Pending,
    Classified,
    Matched,
    LowQuality,
    Contacted,
    Converted,
    Closed,
}

/// Static transition map, one lookup per status write.
static STATUS_TRANSITIONS: Lazy<HashMap<LeadStatus, &'static [LeadStatus]>> = Lazy::new(|| {
    use LeadStatus::*;
    let mut map = HashMap::new();
    map.insert(Pending, &[Classified, LowQuality] as &[_]);
    map.insert(Classified, &[Matched, LowQuality, Closed] as &[_]);
    map.insert(Matched, &[Contacted, Closed] as &[_]);
    map.insert(LowQuality, &[] as &[_]);
    map.insert(Contacted, &[Converted, Closed] as &[_]);
    map.insert(Converted, &[] as &[_]);
    map.insert(Closed, &[] as &[_]);
    map
});

impl LeadStatus {
    /// Check if a transition to `target` is allowed
    pub fn can_transition_to(&self, target: LeadStatus) -> bool {
        STATUS_TRANSITIONS
            .get(self)
            .map(|t| t.contains(&target))
            .unwrap_or(false)
    }

    /// Terminal statuses accept no further writes
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LowQuality | Self::Converted | Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Classified => "classified",
            Self::Matched => "matched",
            Self::LowQuality => "low_quality",
            Self::Contacted => "contacted",
            Self::Converted => "converted",
            Self::Closed => "closed",
        }
    }
}

/// A consumer lead: the raw text plus everything derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    /// The consumer's own words, kept verbatim
    pub description: String,
    pub classification: ClassifiedLead,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(description: impl Into<String>, classification: ClassifiedLead) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            classification,
            status: LeadStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new status, rejecting moves the lifecycle forbids.
    pub fn transition(&mut self, target: LeadStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(crate::Error::InvalidTransition(format!(
                "{} -> {}",
                self.status.as_str(),
                target.as_str()
            )));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lenient_parse() {
        assert_eq!(ServiceCategory::parse_lenient("Plumbing"), ServiceCategory::Plumbing);
        assert_eq!(ServiceCategory::parse_lenient("pest control"), ServiceCategory::PestControl);
        assert_eq!(ServiceCategory::parse_lenient("gutters"), ServiceCategory::Other);
    }

    #[test]
    fn test_urgency_lenient_parse() {
        assert_eq!(Urgency::parse_lenient("emergency"), Urgency::Emergency);
        assert_eq!(Urgency::parse_lenient("urgent"), Urgency::High);
        assert_eq!(Urgency::parse_lenient("flexible"), Urgency::Low);
        assert_eq!(Urgency::parse_lenient("???"), Urgency::Medium);
    }

    #[test]
    fn test_status_transitions() {
        assert!(LeadStatus::Pending.can_transition_to(LeadStatus::Classified));
        assert!(LeadStatus::Pending.can_transition_to(LeadStatus::LowQuality));
        assert!(LeadStatus::Classified.can_transition_to(LeadStatus::Matched));
        assert!(LeadStatus::Matched.can_transition_to(LeadStatus::Contacted));
        assert!(!LeadStatus::LowQuality.can_transition_to(LeadStatus::Matched));
        assert!(!LeadStatus::Pending.can_transition_to(LeadStatus::Contacted));
        assert!(LeadStatus::LowQuality.is_terminal());
    }

    #[test]
    fn test_lead_transition_rejects_invalid() {
        let classification = ClassifiedLead {
            category: ServiceCategory::Plumbing,
            urgency: Urgency::Medium,
            budget: None,
            location_zip: None,
            location: None,
            requirements: vec![],
            sentiment: Sentiment::Neutral,
            quality_score: 5.0,
        };
        let mut lead = Lead::new("leaky faucet", classification);
        assert!(lead.transition(LeadStatus::Contacted).is_err());
        assert!(lead.transition(LeadStatus::Classified).is_ok());
        assert_eq!(lead.status, LeadStatus::Classified);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&LeadStatus::LowQuality).unwrap();
        assert_eq!(json, "\"low_quality\"");
    }
}
