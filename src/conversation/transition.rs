//! Pure transition function: `(session, input) -> (next state, effects)`.
//!
//! Nothing here performs I/O. The engine applies the effects afterwards, so
//! every rule of the conversation can be tested against a plain `Session`.

use tracing::debug;

use super::effect::{Effect, SUMMARY_CALLBACK};
use super::event::Input;
use super::parser::{self, ParsedInput, Step};
use super::prompts;
use super::state::ConversationState;
use crate::providers::{ProviderKind, SearchQuery};
use crate::session::Session;

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(new_state: ConversationState) -> Self {
        Self {
            new_state,
            effects: vec![],
        }
    }

    /// Stay put and do nothing.
    pub fn ignored(state: ConversationState) -> Self {
        Self::new(state)
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn is_ignored(&self, from: ConversationState) -> bool {
        self.new_state == from && self.effects.is_empty()
    }
}

/// Compute the next state and the effects of `input` on `session`.
pub fn transition(session: &Session, input: &Input) -> TransitionResult {
    use ConversationState::*;

    let state = session.state;
    match (state, input) {
        (_, Input::Start) => TransitionResult::new(AwaitingTrip)
            .with_effect(Effect::ResetSession)
            .with_effect(Effect::Reply(prompts::welcome())),

        (_, Input::Help) => {
            TransitionResult::new(state).with_effect(Effect::Reply(prompts::HELP.to_string()))
        }

        (_, Input::Cancel) if state.is_terminal() => TransitionResult::new(Terminated)
            .with_effect(Effect::Reply(prompts::ALREADY_CANCELLED.to_string())),

        (_, Input::Cancel) => TransitionResult::new(Terminated)
            .with_effect(Effect::Terminate)
            .with_effect(Effect::Reply(prompts::CANCELLED.to_string())),

        (AwaitingSummaryRequest, Input::Button(id)) if id == SUMMARY_CALLBACK => {
            TransitionResult::new(Terminated).with_effect(Effect::ComposeSummary)
        }

        (_, Input::Text(raw)) if state.expects_text() => answer(session, raw),

        (_, Input::Text(_) | Input::Button(_)) => {
            debug!(
                user_id = %session.user_id,
                state = %state,
                input = input.kind(),
                "Ignoring unexpected input"
            );
            TransitionResult::ignored(state)
        }
    }
}

fn step_for(state: ConversationState) -> Option<Step> {
    match state {
        ConversationState::AwaitingTrip => Some(Step::Trip),
        ConversationState::AwaitingAccommodation => Some(Step::Accommodation),
        ConversationState::AwaitingFood => Some(Step::Food),
        ConversationState::AwaitingPlaces => Some(Step::Places),
        ConversationState::AwaitingSummaryRequest | ConversationState::Terminated => None,
    }
}

/// Handle a text answer to the current question.
fn answer(session: &Session, raw: &str) -> TransitionResult {
    let state = session.state;
    let Some(step) = step_for(state) else {
        return TransitionResult::ignored(state);
    };

    let parsed = match parser::parse(step, raw) {
        Ok(parsed) => parsed,
        Err(failure) => {
            debug!(user_id = %session.user_id, state = %state, error = %failure, "Answer rejected");
            return TransitionResult::new(state).with_effect(Effect::Reply(prompts::retry(&failure)));
        }
    };

    // Only a successful trip answer can lead to these steps.
    let trip = session.trip_query.as_ref();
    let next = state.next().unwrap_or(state);

    let result = match parsed {
        ParsedInput::Trip(query) => {
            let search = SearchQuery::Transport {
                trip: query.clone(),
            };
            TransitionResult::new(next).with_effects([
                Effect::RecordTrip {
                    raw: raw.trim().to_string(),
                    query,
                },
                Effect::Dispatch {
                    kind: ProviderKind::Flights,
                    query: search.clone(),
                },
                Effect::Dispatch {
                    kind: ProviderKind::Rail,
                    query: search,
                },
            ])
        }

        ParsedInput::Accommodation(preferences) => {
            let preferences = match trip {
                Some(trip) => preferences.with_stay(trip),
                None => preferences,
            };
            let dispatch = trip.map(|trip| Effect::Dispatch {
                kind: ProviderKind::Lodging,
                query: SearchQuery::Lodging {
                    trip: trip.clone(),
                    preferences: preferences.clone(),
                },
            });
            TransitionResult::new(next)
                .with_effect(Effect::RecordAccommodation(preferences))
                .with_effects(dispatch)
        }

        ParsedInput::Food(preferences) => {
            let dispatch = trip.map(|trip| Effect::Dispatch {
                kind: ProviderKind::Food,
                query: SearchQuery::Food {
                    city: trip.destination_city.clone(),
                    preferences: preferences.clone(),
                },
            });
            TransitionResult::new(next)
                .with_effect(Effect::RecordFood(preferences))
                .with_effects(dispatch)
        }

        ParsedInput::Places(categories) => {
            let dispatch = trip.map(|trip| Effect::Dispatch {
                kind: ProviderKind::Places,
                query: SearchQuery::Places {
                    city: trip.destination_city.clone(),
                    categories: categories.clone(),
                },
            });
            return TransitionResult::new(next)
                .with_effect(Effect::RecordPlaces(categories))
                .with_effects(dispatch)
                .with_effect(Effect::OfferSummary(
                    prompts::step_prompt(next).to_string(),
                ));
        }
    };

    result.with_effect(Effect::Reply(prompts::step_prompt(next).to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;
    use crate::error::ParseFailure;
    use crate::session::{PlaceCategory, TripQuery};

    const TRIP: &str = "Moscow, Saint Petersburg, 2025-07-01 - 2025-07-05, 2";

    const ALL_STATES: [ConversationState; 6] = [
        ConversationState::AwaitingTrip,
        ConversationState::AwaitingAccommodation,
        ConversationState::AwaitingFood,
        ConversationState::AwaitingPlaces,
        ConversationState::AwaitingSummaryRequest,
        ConversationState::Terminated,
    ];

    fn trip() -> TripQuery {
        TripQuery {
            origin_city: "Moscow".into(),
            destination_city: "Saint Petersburg".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            adult_count: 2,
        }
    }

    fn session_in(state: ConversationState) -> Session {
        let mut session = Session::new("u1");
        session.state = state;
        if state != ConversationState::AwaitingTrip {
            session.trip_text = Some(TRIP.into());
            session.trip_query = Some(trip());
        }
        session
    }

    fn dispatched(result: &TransitionResult) -> Vec<ProviderKind> {
        result
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Dispatch { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn valid_trip_advances_and_dispatches_transport() {
        let session = session_in(ConversationState::AwaitingTrip);
        let result = transition(&session, &Input::Text(TRIP.into()));

        assert_eq!(result.new_state, ConversationState::AwaitingAccommodation);
        assert_eq!(
            result.effects[0],
            Effect::RecordTrip {
                raw: TRIP.into(),
                query: trip()
            }
        );
        assert_eq!(
            dispatched(&result),
            vec![ProviderKind::Flights, ProviderKind::Rail]
        );
        assert!(matches!(result.effects.last(), Some(Effect::Reply(_))));
    }

    #[test]
    fn start_after_end_stays_put_with_error_reply() {
        let session = session_in(ConversationState::AwaitingTrip);
        let result = transition(
            &session,
            &Input::Text("Moscow, Saint Petersburg, 2025-07-10 - 2025-07-05, 2".into()),
        );

        assert_eq!(result.new_state, ConversationState::AwaitingTrip);
        assert_eq!(result.effects.len(), 1);
        let Effect::Reply(text) = &result.effects[0] else {
            panic!("expected a reply, got {:?}", result.effects[0]);
        };
        assert!(text.starts_with("Неверный диапазон дат"));
    }

    #[test]
    fn each_step_records_its_answer_and_dispatches_once() {
        let cases = [
            (ConversationState::AwaitingAccommodation, "отель до 5000", ProviderKind::Lodging),
            (ConversationState::AwaitingFood, "грузинская", ProviderKind::Food),
            (ConversationState::AwaitingPlaces, "музеи, парки", ProviderKind::Places),
        ];
        for (state, text, kind) in cases {
            let result = transition(&session_in(state), &Input::Text(text.into()));
            assert_eq!(Some(result.new_state), state.next(), "from {state}");
            assert_eq!(dispatched(&result), vec![kind], "from {state}");
        }
    }

    #[test]
    fn accommodation_takes_stay_dates_from_trip() {
        let result = transition(
            &session_in(ConversationState::AwaitingAccommodation),
            &Input::Text("апартаменты, 7000".into()),
        );
        let Effect::RecordAccommodation(acc) = &result.effects[0] else {
            panic!("expected accommodation record");
        };
        assert_eq!(acc.budget, Some(7000));
        assert_eq!(acc.check_in, Some(trip().start_date));
        assert_eq!(acc.check_out, Some(trip().end_date));
    }

    #[test]
    fn places_offer_the_summary_button() {
        let result = transition(
            &session_in(ConversationState::AwaitingPlaces),
            &Input::Text(String::new()),
        );
        assert_eq!(result.new_state, ConversationState::AwaitingSummaryRequest);
        assert_eq!(result.effects[0], Effect::RecordPlaces(BTreeSet::new()));
        assert!(matches!(result.effects.last(), Some(Effect::OfferSummary(_))));
        assert!(
            !result
                .effects
                .iter()
                .any(|e| matches!(e, Effect::Reply(_)))
        );
    }

    #[test]
    fn places_are_normalized_in_the_record() {
        let result = transition(
            &session_in(ConversationState::AwaitingPlaces),
            &Input::Text("Museums, музеи".into()),
        );
        assert_eq!(
            result.effects[0],
            Effect::RecordPlaces([PlaceCategory::Museums].into_iter().collect())
        );
    }

    #[test]
    fn summary_button_composes_and_terminates() {
        let result = transition(
            &session_in(ConversationState::AwaitingSummaryRequest),
            &Input::Button(SUMMARY_CALLBACK.into()),
        );
        assert_eq!(result.new_state, ConversationState::Terminated);
        assert_eq!(result.effects, vec![Effect::ComposeSummary]);
    }

    #[test]
    fn summary_button_is_ignored_before_the_last_step() {
        for state in &ALL_STATES[..4] {
            let session = session_in(*state);
            let result = transition(&session, &Input::Button(SUMMARY_CALLBACK.into()));
            assert!(result.is_ignored(*state), "button changed {state}");
        }
    }

    #[test]
    fn unknown_button_and_stray_text_are_ignored() {
        let session = session_in(ConversationState::AwaitingSummaryRequest);
        assert!(transition(&session, &Input::Button("other".into())).is_ignored(session.state));
        assert!(transition(&session, &Input::Text("hello".into())).is_ignored(session.state));

        let session = session_in(ConversationState::Terminated);
        assert!(transition(&session, &Input::Text("hello".into())).is_ignored(session.state));
    }

    #[test]
    fn cancel_terminates_from_every_live_state() {
        for state in &ALL_STATES[..5] {
            let result = transition(&session_in(*state), &Input::Cancel);
            assert_eq!(result.new_state, ConversationState::Terminated);
            assert_eq!(result.effects[0], Effect::Terminate);
        }
    }

    #[test]
    fn second_cancel_changes_nothing() {
        let result = transition(&session_in(ConversationState::Terminated), &Input::Cancel);
        assert_eq!(result.new_state, ConversationState::Terminated);
        assert!(!result.effects.contains(&Effect::Terminate));
        assert!(result.effects.iter().all(|e| matches!(e, Effect::Reply(_))));
    }

    #[test]
    fn start_resets_from_every_state() {
        for state in ALL_STATES {
            let result = transition(&session_in(state), &Input::Start);
            assert_eq!(result.new_state, ConversationState::AwaitingTrip);
            assert_eq!(result.effects[0], Effect::ResetSession);
        }
    }

    #[test]
    fn help_never_moves() {
        for state in ALL_STATES {
            let result = transition(&session_in(state), &Input::Help);
            assert_eq!(result.new_state, state);
            assert_eq!(result.effects, vec![Effect::Reply(prompts::HELP.into())]);
        }
    }

    #[test]
    fn every_transition_is_allowed_by_the_state_graph() {
        let inputs = [
            Input::Start,
            Input::Help,
            Input::Cancel,
            Input::Text(TRIP.into()),
            Input::Text("что-то".into()),
            Input::Button(SUMMARY_CALLBACK.into()),
        ];
        for state in ALL_STATES {
            for input in &inputs {
                let result = transition(&session_in(state), input);
                assert!(
                    state.can_transition_to(result.new_state),
                    "{state} -> {} on {input:?}",
                    result.new_state
                );
            }
        }
    }

    proptest! {
        #[test]
        fn wrong_field_count_keeps_awaiting_trip(fields in prop::collection::vec("[a-z0-9 -]{0,10}", 1..8)) {
            prop_assume!(fields.len() != 4);
            let line = fields.join(",");
            let session = session_in(ConversationState::AwaitingTrip);
            let result = transition(&session, &Input::Text(line));
            prop_assert_eq!(result.new_state, ConversationState::AwaitingTrip);
            let expected = Effect::Reply(prompts::retry(&ParseFailure::FieldCountMismatch {
                found: fields.len(),
            }));
            prop_assert_eq!(result.effects, vec![expected]);
        }

        #[test]
        fn valid_trip_always_advances(
            offset in 0i64..400,
            length in 0i64..60,
            guests in 1u32..50,
        ) {
            let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let start = base + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(length);
            let line = format!("Kazan, Sochi, {start} - {end}, {guests}");
            let result = transition(&session_in(ConversationState::AwaitingTrip), &Input::Text(line));
            prop_assert_eq!(result.new_state, ConversationState::AwaitingAccommodation);
        }
    }
}
