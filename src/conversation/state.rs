//! Conversation state machine: tracks which step a user is on.

use serde::{Deserialize, Serialize};

/// The steps of the trip-planning conversation.
///
/// Progresses linearly: AwaitingTrip → AwaitingAccommodation → AwaitingFood →
/// AwaitingPlaces → AwaitingSummaryRequest → Terminated. Restart returns to
/// AwaitingTrip from anywhere; cancel jumps to Terminated from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    AwaitingTrip,
    AwaitingAccommodation,
    AwaitingFood,
    AwaitingPlaces,
    AwaitingSummaryRequest,
    Terminated,
}

impl ConversationState {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Staying put is always valid (parse failures and ignored input).
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        if *self == target || target == AwaitingTrip {
            return true;
        }
        if target == Terminated {
            return true;
        }
        self.next() == Some(target)
    }

    /// Whether the conversation is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Whether this step expects a free-text answer.
    pub fn expects_text(&self) -> bool {
        matches!(
            self,
            Self::AwaitingTrip | Self::AwaitingAccommodation | Self::AwaitingFood | Self::AwaitingPlaces
        )
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<ConversationState> {
        use ConversationState::*;
        match self {
            AwaitingTrip => Some(AwaitingAccommodation),
            AwaitingAccommodation => Some(AwaitingFood),
            AwaitingFood => Some(AwaitingPlaces),
            AwaitingPlaces => Some(AwaitingSummaryRequest),
            AwaitingSummaryRequest => Some(Terminated),
            Terminated => None,
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingTrip => "awaiting_trip",
            Self::AwaitingAccommodation => "awaiting_accommodation",
            Self::AwaitingFood => "awaiting_food",
            Self::AwaitingPlaces => "awaiting_places",
            Self::AwaitingSummaryRequest => "awaiting_summary_request",
            Self::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConversationState; 6] = [
        ConversationState::AwaitingTrip,
        ConversationState::AwaitingAccommodation,
        ConversationState::AwaitingFood,
        ConversationState::AwaitingPlaces,
        ConversationState::AwaitingSummaryRequest,
        ConversationState::Terminated,
    ];

    #[test]
    fn forward_transitions_are_valid() {
        for pair in ALL.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn skipping_and_going_backward_is_invalid() {
        use ConversationState::*;
        assert!(!AwaitingTrip.can_transition_to(AwaitingFood));
        assert!(!AwaitingAccommodation.can_transition_to(AwaitingSummaryRequest));
        assert!(!AwaitingPlaces.can_transition_to(AwaitingFood));
        assert!(!Terminated.can_transition_to(AwaitingSummaryRequest));
    }

    #[test]
    fn restart_and_cancel_reachable_from_everywhere() {
        for state in ALL {
            assert!(state.can_transition_to(ConversationState::AwaitingTrip));
            assert!(state.can_transition_to(ConversationState::Terminated));
        }
    }

    #[test]
    fn next_walks_all_steps() {
        let mut current = ConversationState::default();
        assert_eq!(current, ConversationState::AwaitingTrip);
        for expected in &ALL[1..] {
            current = current.next().unwrap();
            assert_eq!(current, *expected);
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn only_question_steps_expect_text() {
        use ConversationState::*;
        assert!(AwaitingTrip.expects_text());
        assert!(AwaitingPlaces.expects_text());
        assert!(!AwaitingSummaryRequest.expects_text());
        assert!(!Terminated.expects_text());
    }

    #[test]
    fn display_matches_serde() {
        for state in ALL {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{display}\""), json, "mismatch for {state:?}");
        }
    }
}
