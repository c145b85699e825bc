//! Business records and geography

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lead::ServiceCategory;

/// A geographic point (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to another point, in miles.
    pub fn distance_miles(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_MILES: f64 = 3958.8;
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_MILES * c
    }
}

/// Pricing tier a business advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    Budget,
    #[default]
    Standard,
    Premium,
}

/// A registered service business.
///
/// Read-only to this pipeline; the business-management surface owns writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub categories: Vec<ServiceCategory>,
    pub location: GeoPoint,
    pub location_zip: String,
    pub pricing_tier: PricingTier,
    /// Average rating in [0, 5]
    pub rating: f64,
    /// Accepting new leads right now
    pub active: bool,
    pub offers_emergency_service: bool,
    pub licensed: bool,
    pub insured: bool,
    /// Historical average first-response time
    pub avg_response_minutes: Option<u32>,
}

impl Business {
    pub fn offers_category(&self, category: ServiceCategory) -> bool {
        self.categories.contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = GeoPoint::new(39.97, -86.12);
        assert!(p.distance_miles(&p) < 1e-9);
    }

    #[test]
    fn test_distance_indianapolis_to_carmel() {
        // Downtown Indianapolis to Carmel is roughly 15 miles
        let indy = GeoPoint::new(39.7684, -86.1581);
        let carmel = GeoPoint::new(39.9784, -86.1180);
        let d = indy.distance_miles(&carmel);
        assert!(d > 12.0 && d < 18.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_offers_category() {
        let b = Business {
            id: Uuid::new_v4(),
            name: "Ajax Plumbing".into(),
            phone: "+13175550100".into(),
            categories: vec![ServiceCategory::Plumbing, ServiceCategory::Hvac],
            location: GeoPoint::new(39.97, -86.12),
            location_zip: "46032".into(),
            pricing_tier: PricingTier::Standard,
            rating: 4.6,
            active: true,
            offers_emergency_service: true,
            licensed: true,
            insured: true,
            avg_response_minutes: Some(45),
        };
        assert!(b.offers_category(ServiceCategory::Plumbing));
        assert!(!b.offers_category(ServiceCategory::Roofing));
    }
}
