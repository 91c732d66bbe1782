//! Channels receiving SAY messages.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;
use turn_primitives::Message;

use crate::error::ActionResult;

/// Destination of SAY commands, typically the host's reply transport.
#[async_trait]
pub trait OutputChannel: Send + Sync {
    /// Delivers `message` to the user.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Output`](crate::ActionError::Output) when the
    /// message cannot be delivered; the rest of the plan is abandoned.
    async fn send(&self, message: Message) -> ActionResult<()>;
}

/// Channel that logs messages to tracing.
#[derive(Debug, Default)]
pub struct TracingChannel;

#[async_trait]
impl OutputChannel for TracingChannel {
    async fn send(&self, message: Message) -> ActionResult<()> {
        let citations = message
            .context()
            .map_or(0, |context| context.citations.len());
        info!(text = %message.text(), citations, "assistant said");
        Ok(())
    }
}

/// Channel used during testing to capture messages.
#[derive(Debug, Default)]
pub struct CollectingChannel {
    messages: Mutex<Vec<Message>>,
}

impl CollectingChannel {
    /// Creates a new collecting channel.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the collected messages, leaving the channel empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<Message> {
        let mut lock = self.messages.lock().expect("collecting channel poisoned");
        lock.drain(..).collect()
    }
}

#[async_trait]
impl OutputChannel for CollectingChannel {
    async fn send(&self, message: Message) -> ActionResult<()> {
        self.messages
            .lock()
            .expect("collecting channel poisoned")
            .push(message);
        Ok(())
    }
}
