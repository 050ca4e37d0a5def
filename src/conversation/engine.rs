//! Conversation engine: resolves the session, runs the transition and
//! applies its effects.

use std::sync::Arc;

use tracing::{debug, info};

use super::effect::{Effect, InlineAction, Reply};
use super::event::{Event, Input};
use super::prompts;
use super::transition::transition;
use crate::providers::ProviderDispatcher;
use crate::session::{SessionEntry, SessionStore};
use crate::summary;

/// Drives conversations for every user against a shared store.
#[derive(Clone)]
pub struct ConversationEngine {
    store: Arc<SessionStore>,
    dispatcher: Arc<ProviderDispatcher>,
}

impl ConversationEngine {
    pub fn new(store: Arc<SessionStore>, dispatcher: Arc<ProviderDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one event and return the replies for the user.
    ///
    /// Events for the same user are serialized on that user's session lock;
    /// events for different users run independently.
    pub async fn handle(&self, event: Event) -> Vec<Reply> {
        let Event { user_id, input } = event;

        if input == Input::Help {
            return vec![Reply::text(prompts::HELP)];
        }

        // The handle is resolved exactly once and held until the event is
        // done; eviction never removes a session with an outstanding handle.
        let (handle, input) = if input == Input::Cancel {
            match self.store.get(&user_id).await {
                Some(handle) => (handle, input),
                None => {
                    debug!(user_id = %user_id, "Cancel without a session, nothing to do");
                    return vec![];
                }
            }
        } else {
            match self.store.resolve(&user_id).await {
                (handle, true) if input != Input::Start => {
                    info!(user_id = %user_id, input = input.kind(), "No session, starting over");
                    (handle, Input::Start)
                }
                (handle, _) => (handle, input),
            }
        };

        let mut guard = handle.lock().await;
        let SessionEntry { session, searches } = &mut *guard;

        let harvested = searches.harvest(session);
        if harvested > 0 {
            debug!(user_id = %user_id, harvested, "Recorded finished searches");
        }

        let from = session.state;
        let result = transition(session, &input);
        debug_assert!(from.can_transition_to(result.new_state));

        let mut replies = Vec::new();
        for effect in result.effects {
            match effect {
                Effect::ResetSession | Effect::Terminate => {
                    let aborted = searches.abort_all();
                    session.reset();
                    if aborted > 0 {
                        debug!(user_id = %user_id, aborted, "Aborted pending searches");
                    }
                }
                Effect::RecordTrip { raw, query } => {
                    session.trip_text = Some(raw);
                    session.trip_query = Some(query);
                }
                Effect::RecordAccommodation(query) => session.accommodation_query = Some(query),
                Effect::RecordFood(preferences) => session.food_preferences = Some(preferences),
                Effect::RecordPlaces(categories) => session.place_categories = Some(categories),
                Effect::Dispatch { kind, query } => {
                    debug!(user_id = %user_id, provider = %kind, "Dispatching search");
                    searches.spawn(kind, Arc::clone(&self.dispatcher), query);
                }
                Effect::Reply(text) => replies.push(Reply::text(text)),
                Effect::OfferSummary(text) => {
                    replies.push(Reply::text(text).with_action(InlineAction::summary()))
                }
                Effect::ComposeSummary => {
                    searches.join_all(session).await;
                    replies.push(Reply::text(summary::compose(session)));
                }
            }
        }

        session.state = result.new_state;
        session.touch();

        if from != result.new_state {
            info!(
                user_id = %user_id,
                from = %from,
                to = %result.new_state,
                "Conversation state changed"
            );
        }

        replies
    }
}
