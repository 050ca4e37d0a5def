//! Search providers for each travel-planning category.
//!
//! Every provider exposes one capability: search given a query, return a
//! payload or fail. The dispatcher bounds each call with a timeout and turns
//! every outcome into a [`ProviderResult`] that is recorded on the session.

pub mod aviasales;
pub mod cities;
pub mod dispatcher;
pub mod pending;
pub mod yandex_rasp;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderFailure;
use crate::session::{AccommodationQuery, FoodPreferences, PlaceCategory, TripQuery};

pub use aviasales::AviasalesProvider;
pub use dispatcher::ProviderDispatcher;
pub use pending::PendingSearches;
pub use yandex_rasp::YandexRaspProvider;

/// The categories a trip is searched in, in summary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Flights,
    Rail,
    Lodging,
    Food,
    Places,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Flights,
        ProviderKind::Rail,
        ProviderKind::Lodging,
        ProviderKind::Food,
        ProviderKind::Places,
    ];

    /// Human-readable heading used in the summary.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Flights => "✈️ Авиабилеты",
            Self::Rail => "🚆 Поезда",
            Self::Lodging => "🏨 Жильё",
            Self::Food => "🍽 Еда",
            Self::Places => "🏛 Места",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Flights => "flights",
            Self::Rail => "rail",
            Self::Lodging => "lodging",
            Self::Food => "food",
            Self::Places => "places",
        };
        write!(f, "{s}")
    }
}

/// What a provider is asked to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchQuery {
    /// Getting there: flights and rail.
    Transport { trip: TripQuery },
    Lodging {
        trip: TripQuery,
        preferences: AccommodationQuery,
    },
    Food {
        city: String,
        preferences: FoodPreferences,
    },
    Places {
        city: String,
        categories: BTreeSet<PlaceCategory>,
    },
}

/// A successful search: a few display lines, already short enough for chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Which backend produced the payload, e.g. "aviasales".
    pub source: String,
    pub items: Vec<String>,
}

impl ResultPayload {
    pub fn new(source: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            source: source.into(),
            items,
        }
    }
}

/// Recorded outcome of one provider search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderResult {
    Found { payload: ResultPayload },
    Failed { failure: ProviderFailure },
}

impl ProviderResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

impl From<Result<ResultPayload, ProviderFailure>> for ProviderResult {
    fn from(outcome: Result<ResultPayload, ProviderFailure>) -> Self {
        match outcome {
            Ok(payload) => Self::Found { payload },
            Err(failure) => Self::Failed { failure },
        }
    }
}

impl From<ProviderFailure> for ProviderResult {
    fn from(failure: ProviderFailure) -> Self {
        Self::Failed { failure }
    }
}

/// A search backend for one category.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short backend name used in logs and payloads.
    fn name(&self) -> &str;

    async fn search(&self, query: &SearchQuery) -> Result<ResultPayload, ProviderFailure>;
}

/// ISO-8601 timestamp as "DD.MM.YYYY HH:MM" in its own offset; anything
/// unparseable is returned unchanged.
pub(crate) fn format_datetime(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|_| iso.to_string())
}
