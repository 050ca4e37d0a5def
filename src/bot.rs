//! Bot runner: feeds channel messages into the conversation engine.
//!
//! Each active user gets a lane, a task draining that user's queue in
//! order, so one user's slow summary never holds up anyone else. A lane
//! closes after sitting idle and is recreated on the next message.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::SendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::{Channel, IncomingMessage};
use crate::conversation::ConversationEngine;
use crate::error;

const DEFAULT_LANE_IDLE: Duration = Duration::from_secs(300);

struct Lane {
    tx: UnboundedSender<IncomingMessage>,
    task: JoinHandle<()>,
}

/// Reads a channel's message stream until it ends.
pub struct BotRunner {
    engine: ConversationEngine,
    channel: Arc<dyn Channel>,
    lane_idle: Duration,
}

impl BotRunner {
    pub fn new(engine: ConversationEngine, channel: Arc<dyn Channel>) -> Self {
        Self {
            engine,
            channel,
            lane_idle: DEFAULT_LANE_IDLE,
        }
    }

    /// How long a lane waits for another message before closing.
    pub fn with_lane_idle(mut self, idle: Duration) -> Self {
        self.lane_idle = idle;
        self
    }

    /// Run until the channel's stream ends, then let every lane finish.
    pub async fn run(self) -> error::Result<()> {
        let mut stream = self.channel.start().await?;
        info!(channel = self.channel.name(), "Bot started");

        let mut lanes: HashMap<String, Lane> = HashMap::new();

        while let Some(msg) = stream.next().await {
            lanes.retain(|_, lane| !lane.task.is_finished());

            let user_id = msg.user_id.clone();
            let (msg, previous) = match lanes.remove(&user_id) {
                Some(lane) => match lane.tx.send(msg) {
                    Ok(()) => {
                        lanes.insert(user_id, lane);
                        continue;
                    }
                    // The lane closed while idling; the new one waits for it.
                    Err(SendError(msg)) => (msg, Some(lane.task)),
                },
                None => (msg, None),
            };

            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(msg);
            debug!(user_id = %user_id, "Opening lane");
            let task = tokio::spawn(run_lane(
                self.engine.clone(),
                Arc::clone(&self.channel),
                rx,
                self.lane_idle,
                previous,
            ));
            lanes.insert(user_id, Lane { tx, task });
        }

        info!(channel = self.channel.name(), "Message stream ended, draining lanes");
        for (_, Lane { tx, task }) in lanes {
            drop(tx);
            if let Err(e) = task.await {
                warn!("Lane task failed: {e}");
            }
        }

        self.channel.shutdown().await?;
        Ok(())
    }
}

async fn run_lane(
    engine: ConversationEngine,
    channel: Arc<dyn Channel>,
    mut rx: UnboundedReceiver<IncomingMessage>,
    idle: Duration,
    previous: Option<JoinHandle<()>>,
) {
    // Keep per-user order across a lane being replaced.
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(msg)) => process(&engine, channel.as_ref(), msg).await,
            Ok(None) => break,
            Err(_) => {
                rx.close();
                while let Some(msg) = rx.recv().await {
                    process(&engine, channel.as_ref(), msg).await;
                }
                break;
            }
        }
    }
}

async fn process(engine: &ConversationEngine, channel: &dyn Channel, msg: IncomingMessage) {
    let event = msg.to_event();
    debug!(
        user_id = %event.user_id,
        channel = %msg.channel,
        input = event.input.kind(),
        "Handling message"
    );

    for reply in engine.handle(event).await {
        if let Err(e) = channel.respond(&msg, reply.into()).await {
            warn!(user_id = %msg.user_id, "Failed to send reply: {e}");
        }
    }
}
