//! In-flight searches owned by one session.
//!
//! Searches run as background tasks so a step can advance immediately. The
//! session collects finished results on every event and joins whatever is
//! still running when the summary is requested. Dropping or aborting the set
//! cancels the tasks, so a result can never land in a session that was reset
//! after the search started.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use super::{ProviderDispatcher, ProviderKind, ProviderResult, SearchQuery};
use crate::error::ProviderFailure;
use crate::session::Session;

#[derive(Default)]
pub struct PendingSearches {
    tasks: HashMap<ProviderKind, JoinHandle<ProviderResult>>,
}

impl PendingSearches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a search in the background. An older search for the same kind
    /// is aborted, so only the latest answer is ever recorded.
    pub fn spawn(
        &mut self,
        kind: ProviderKind,
        dispatcher: Arc<ProviderDispatcher>,
        query: SearchQuery,
    ) {
        let handle = tokio::spawn(async move { dispatcher.search(kind, &query).await });
        if let Some(previous) = self.tasks.insert(kind, handle) {
            previous.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every in-flight search. Returns how many were cancelled.
    pub fn abort_all(&mut self) -> usize {
        let count = self.tasks.len();
        for (kind, handle) in self.tasks.drain() {
            debug!(kind = %kind, "Aborting pending search");
            handle.abort();
        }
        count
    }

    /// Move finished searches into the session without waiting on the rest.
    pub fn harvest(&mut self, session: &mut Session) -> usize {
        let finished: Vec<ProviderKind> = self
            .tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(kind, _)| *kind)
            .collect();

        let mut recorded = 0;
        for kind in finished {
            let Some(mut handle) = self.tasks.remove(&kind) else {
                continue;
            };
            match (&mut handle).now_or_never() {
                Some(joined) => {
                    session.record_result(kind, classify(joined));
                    recorded += 1;
                }
                // Out of coop budget; try again on the next event.
                None => {
                    self.tasks.insert(kind, handle);
                }
            }
        }
        recorded
    }

    /// Wait for every outstanding search and record its outcome.
    ///
    /// Each search is already bounded by the dispatcher timeout.
    pub async fn join_all(&mut self, session: &mut Session) {
        let (kinds, handles): (Vec<_>, Vec<_>) = self.tasks.drain().unzip();
        let joined = futures::future::join_all(handles).await;
        for (kind, outcome) in kinds.into_iter().zip(joined) {
            session.record_result(kind, classify(outcome));
        }
    }
}

impl Drop for PendingSearches {
    fn drop(&mut self) {
        self.abort_all();
    }
}

fn classify(joined: Result<ProviderResult, JoinError>) -> ProviderResult {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => {
            ProviderFailure::Transport("search was cancelled".to_string()).into()
        }
        Err(e) => ProviderFailure::Transport(format!("search task failed: {e}")).into(),
    }
}
