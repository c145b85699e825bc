//! Match results produced by the business matcher

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scored pairing of a lead with a candidate business.
///
/// Ephemeral: computed on demand, ordered by descending confidence with
/// distance as tiebreak, deterministic for equal input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub lead_id: Uuid,
    pub business_id: Uuid,
    pub business_name: String,
    /// Confidence in [0, 100]
    pub confidence: u32,
    /// Straight-line distance in miles, when the lead has a location
    pub distance_miles: Option<f64>,
    /// Human-readable reasons, strongest first
    pub reasons: Vec<String>,
}
