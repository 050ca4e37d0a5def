//! Session record and the structured answers collected per step.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::state::ConversationState;
use crate::providers::{ProviderKind, ProviderResult};

/// Answer to the trip step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripQuery {
    pub origin_city: String,
    pub destination_city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub adult_count: u32,
}

impl TripQuery {
    /// Number of nights between start and end.
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Answer to the accommodation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccommodationQuery {
    pub text: String,
    /// First number found in the text, read as a nightly budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
}

impl AccommodationQuery {
    /// Fill the stay dates from the trip.
    pub fn with_stay(mut self, trip: &TripQuery) -> Self {
        self.check_in = Some(trip.start_date);
        self.check_out = Some(trip.end_date);
        self
    }
}

/// Answer to the food step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodPreferences {
    pub text: String,
    pub tags: BTreeSet<String>,
}

/// A points-of-interest category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Museums,
    Theater,
    Outdoors,
    Architecture,
    Shopping,
    Nightlife,
    Other(String),
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Museums => write!(f, "музеи"),
            Self::Theater => write!(f, "театры"),
            Self::Outdoors => write!(f, "природа"),
            Self::Architecture => write!(f, "архитектура"),
            Self::Shopping => write!(f, "шопинг"),
            Self::Nightlife => write!(f, "ночная жизнь"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// One user's conversation progress and collected answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub state: ConversationState,
    /// Trip line exactly as the user typed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_query: Option<TripQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation_query: Option<AccommodationQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_preferences: Option<FoodPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_categories: Option<BTreeSet<PlaceCategory>>,
    pub provider_results: BTreeMap<ProviderKind, ProviderResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Fresh session in the initial step.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            state: ConversationState::default(),
            trip_text: None,
            trip_query: None,
            accommodation_query: None,
            food_preferences: None,
            place_categories: None,
            provider_results: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Discard every answer and result, keep the identity.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.user_id));
    }

    /// Whether no step has stored anything yet.
    pub fn is_blank(&self) -> bool {
        self.trip_text.is_none()
            && self.trip_query.is_none()
            && self.accommodation_query.is_none()
            && self.food_preferences.is_none()
            && self.place_categories.is_none()
            && self.provider_results.is_empty()
    }

    /// Record a provider outcome, replacing any earlier one for that kind.
    pub fn record_result(&mut self, kind: ProviderKind, result: ProviderResult) {
        self.provider_results.insert(kind, result);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderFailure;
    use crate::providers::ResultPayload;

    fn trip() -> TripQuery {
        TripQuery {
            origin_city: "Moscow".into(),
            destination_city: "Kazan".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            adult_count: 2,
        }
    }

    #[test]
    fn new_session_is_blank() {
        let s = Session::new("42");
        assert_eq!(s.user_id, "42");
        assert_eq!(s.state, ConversationState::AwaitingTrip);
        assert!(s.is_blank());
    }

    #[test]
    fn reset_keeps_identity_and_clears_data() {
        let mut s = Session::new("42");
        s.state = ConversationState::AwaitingFood;
        s.trip_text = Some("x".into());
        s.trip_query = Some(trip());
        s.record_result(ProviderKind::Rail, Err(ProviderFailure::NotConfigured).into());

        s.reset();
        assert_eq!(s.user_id, "42");
        assert_eq!(s.state, ConversationState::AwaitingTrip);
        assert!(s.is_blank());
    }

    #[test]
    fn record_result_overwrites_same_kind() {
        let mut s = Session::new("1");
        s.record_result(ProviderKind::Flights, Err(ProviderFailure::Timeout(5)).into());
        s.record_result(
            ProviderKind::Flights,
            Ok(ResultPayload::new("stub", vec!["SU 100".into()])).into(),
        );
        assert_eq!(s.provider_results.len(), 1);
        assert!(s.provider_results[&ProviderKind::Flights].is_found());
    }

    #[test]
    fn trip_nights_and_stay_dates() {
        let t = trip();
        assert_eq!(t.nights(), 4);

        let acc = AccommodationQuery {
            text: "hotel".into(),
            budget: None,
            check_in: None,
            check_out: None,
        }
        .with_stay(&t);
        assert_eq!(acc.check_in, Some(t.start_date));
        assert_eq!(acc.check_out, Some(t.end_date));
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut s = Session::new("7");
        s.trip_query = Some(trip());
        s.place_categories = Some(
            [PlaceCategory::Museums, PlaceCategory::Other("zoo".into())]
                .into_iter()
                .collect(),
        );
        let json = serde_json::to_string(&s).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trip_query, s.trip_query);
        assert_eq!(parsed.place_categories, s.place_categories);
    }
}
