//! Quality scoring
//!
//! The score reflects completeness and specificity of the extracted lead:
//! a concrete category, a location, budget figures, and named requirements
//! each contribute. Computed from structure rather than taken from the
//! model, so equal extractions always score equally.

use fixline_core::{ClassifiedLead, ServiceCategory, Urgency};

/// Contribution caps per component. The total is clamped to [0, 10].
const CATEGORY_POINTS: f64 = 2.0;
const URGENCY_EMERGENCY_POINTS: f64 = 1.0;
const URGENCY_HIGH_POINTS: f64 = 0.5;
const LOCATION_POINTS: f64 = 2.0;
const BUDGET_POINTS: f64 = 2.0;
const REQUIREMENT_POINTS: f64 = 1.0;
const REQUIREMENTS_CAP: f64 = 3.0;

/// Score a classified lead in [0, 10].
pub fn quality_score(lead: &ClassifiedLead) -> f64 {
    let mut score = 0.0;

    if lead.category != ServiceCategory::Other {
        score += CATEGORY_POINTS;
    }

    score += match lead.urgency {
        Urgency::Emergency => URGENCY_EMERGENCY_POINTS,
        Urgency::High => URGENCY_HIGH_POINTS,
        _ => 0.0,
    };

    if lead.location_zip.is_some() || lead.location.is_some() {
        score += LOCATION_POINTS;
    }

    if lead.budget.is_some() {
        score += BUDGET_POINTS;
    }

    score += (lead.requirements.len() as f64 * REQUIREMENT_POINTS).min(REQUIREMENTS_CAP);

    score.clamp(0.0, 10.0)
}
