//! Effects produced by the transition function and the replies they lead to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::prompts::SUMMARY_BUTTON_LABEL;
use crate::providers::{ProviderKind, SearchQuery};
use crate::session::{AccommodationQuery, FoodPreferences, PlaceCategory, TripQuery};

/// Callback id carried by the summary button.
pub const SUMMARY_CALLBACK: &str = "summary";

/// Side effects the engine applies after a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Abort searches and wipe all collected data.
    ResetSession,
    /// Abort searches and wipe collected data without leaving the terminal state.
    Terminate,
    RecordTrip { raw: String, query: TripQuery },
    RecordAccommodation(AccommodationQuery),
    RecordFood(FoodPreferences),
    RecordPlaces(BTreeSet<PlaceCategory>),
    /// Start a background search.
    Dispatch { kind: ProviderKind, query: SearchQuery },
    Reply(String),
    /// Reply with the summary button attached.
    OfferSummary(String),
    /// Wait for outstanding searches and reply with the summary.
    ComposeSummary,
}

/// An inline button under a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAction {
    pub label: String,
    pub callback_id: String,
}

impl InlineAction {
    pub fn summary() -> Self {
        Self {
            label: SUMMARY_BUTTON_LABEL.to_string(),
            callback_id: SUMMARY_CALLBACK.to_string(),
        }
    }
}

/// A message sent back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<InlineAction>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: InlineAction) -> Self {
        self.actions.push(action);
        self
    }
}
