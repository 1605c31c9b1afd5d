//! Speech output shared by the agent, the dispatcher and the reminder checker.

use std::sync::Arc;

use nexus_voice::Speaker;
use tokio::sync::mpsc;

use crate::events::AgentEvent;

/// A [`Speaker`] that also reports every line as [`AgentEvent::Spoke`].
///
/// Speech failures are logged and swallowed: a broken speaker must not stop
/// the assistant from acting.
#[derive(Clone)]
pub struct Narrator {
    speaker: Arc<dyn Speaker>,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl Narrator {
    #[must_use]
    pub fn new(speaker: Arc<dyn Speaker>) -> Self {
        Self {
            speaker,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            // A closed channel means the front end is gone; keep working.
            let _ = events.send(event);
        }
    }

    pub async fn say(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        tracing::info!(text, "Assistant");
        self.emit(AgentEvent::Spoke(text.to_string()));
        if let Err(e) = self.speaker.speak(text).await {
            tracing::warn!("Speech output failed: {e}");
        }
    }
}
