//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{GuessEvent, RevealEvent, RoundEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Round creation and ending
    Round,
    /// Accepted guesses
    Guess,
    /// Reveal requests, fulfillments and cancellations
    Reveal,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Round(RoundEvent),
    Guess(GuessEvent),
    Reveal(RevealEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Round(_) => Topic::Round,
            Event::Guess(_) => Topic::Guess,
            Event::Reveal(_) => Topic::Reveal,
        }
    }
}

impl From<RoundEvent> for Event {
    fn from(event: RoundEvent) -> Self {
        Event::Round(event)
    }
}

impl From<GuessEvent> for Event {
    fn from(event: GuessEvent) -> Self {
        Event::Guess(event)
    }
}

impl From<RevealEvent> for Event {
    fn from(event: RevealEvent) -> Self {
        Event::Reveal(event)
    }
}

struct Channels {
    round: broadcast::Sender<Event>,
    guess: broadcast::Sender<Event>,
    reveal: broadcast::Sender<Event>,
}

impl Channels {
    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Round => &self.round,
            Topic::Guess => &self.guess,
            Topic::Reveal => &self.reveal,
        }
    }
}

/// Topic-based event bus
///
/// Delivery is best-effort: events published while nobody listens are
/// dropped, and slow subscribers observe `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                round: broadcast::channel(capacity).0,
                guess: broadcast::channel(capacity).0,
                reveal: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();

        if self.channels.sender(topic).send(event).is_err() {
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
