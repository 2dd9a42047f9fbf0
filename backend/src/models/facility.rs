//! Models for physical guild facilities and their administration payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// A named physical resource members can check into.
pub struct Facility {
    pub id: String,
    /// Unique human-facing name (case-sensitive).
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Maximum number of concurrent occupants. `None` means unlimited.
    pub capacity: Option<i32>,
    /// Inactive facilities reject new authenticated sessions. Cannot be
    /// cleared while sessions are open.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    pub fn new(
        name: String,
        description: Option<String>,
        location: Option<String>,
        capacity: Option<i32>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            location,
            capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when `occupancy` leaves no room for another occupant.
    pub fn is_full(&self, occupancy: i64) -> bool {
        match self.capacity {
            Some(capacity) => occupancy >= capacity as i64,
            None => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Payload for creating a new facility.
pub struct CreateFacilityRequest {
    #[validate(custom(function = "crate::validation::rules::validate_facility_name"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Payload for partially updating an existing facility.
pub struct UpdateFacilityRequest {
    #[validate(custom(function = "crate::validation::rules::validate_facility_name"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
/// Query parameters for listing facilities.
pub struct FacilityListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
/// Compact facility representation embedded in access responses.
pub struct FacilitySummary {
    pub id: String,
    pub name: String,
}

impl From<&Facility> for FacilitySummary {
    fn from(facility: &Facility) -> Self {
        FacilitySummary {
            id: facility.id.clone(),
            name: facility.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Facility returned by the API with its live occupancy embedded.
pub struct FacilityResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub current_occupancy: i64,
    pub occupancy_updated_at: Option<DateTime<Utc>>,
}

impl FacilityResponse {
    pub fn from_parts(
        facility: Facility,
        current_occupancy: i64,
        occupancy_updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        FacilityResponse {
            id: facility.id,
            name: facility.name,
            description: facility.description,
            location: facility.location,
            capacity: facility.capacity,
            is_active: facility.is_active,
            current_occupancy,
            occupancy_updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn is_full_respects_capacity() {
        let mut facility = Facility::new("Lab".into(), None, None, Some(2), Utc::now());
        assert!(!facility.is_full(0));
        assert!(!facility.is_full(1));
        assert!(facility.is_full(2));
        assert!(facility.is_full(3));

        facility.capacity = None;
        assert!(!facility.is_full(1_000_000));
    }

    #[test]
    fn create_request_rejects_out_of_range_capacity() {
        let request = CreateFacilityRequest {
            name: "Makerspace".into(),
            description: None,
            location: None,
            capacity: Some(0),
        };
        assert!(request.validate().is_err());

        let request = CreateFacilityRequest {
            name: "Makerspace".into(),
            description: None,
            location: None,
            capacity: Some(25),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn new_facility_defaults_to_active() {
        let facility = Facility::new("Studio".into(), None, None, None, Utc::now());
        assert!(facility.is_active);
    }
}
