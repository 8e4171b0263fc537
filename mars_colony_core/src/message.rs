use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Coordination messages exchanged between explorers and carriers.
///
/// Messages are immutable values; senders copy them into recipient
/// inboxes and keep no reference of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// An explorer requests pickup at its current coordinates.
    Come { source: EntityId, x: f64, y: f64 },
    /// A carrier tells the requester to hold position until it arrives.
    Wait { source: EntityId },
}

impl Message {
    pub fn source(&self) -> EntityId {
        match self {
            Message::Come { source, .. } | Message::Wait { source } => *source,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Come { .. } => MessageKind::Come,
            Message::Wait { .. } => MessageKind::Wait,
        }
    }
}

/// Message type tag, used for typed inbox lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Come,
    Wait,
}

/// Per-agent FIFO of pending messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inbox {
    messages: VecDeque<Message>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. A `Come` from a source that already has a
    /// pending `Come` here overwrites it in place, so a requester
    /// re-broadcasting every tick holds at most one slot per inbox,
    /// keeps its queue age, and the latest coordinates win.
    pub fn push(&mut self, message: Message) {
        if message.kind() == MessageKind::Come {
            if let Some(pending) = self
                .messages
                .iter_mut()
                .find(|m| m.kind() == MessageKind::Come && m.source() == message.source())
            {
                *pending = message;
                return;
            }
        }
        self.messages.push_back(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drops every pending message sent by `source`.
    pub fn clear_from(&mut self, source: EntityId) {
        self.messages.retain(|m| m.source() != source);
    }

    /// The oldest pending message of the given kind, if any.
    pub fn first_of(&self, kind: MessageKind) -> Option<Message> {
        self.messages.iter().copied().find(|m| m.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_fifo_order() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Wait { source: 1 });
        inbox.push(Message::Come {
            source: 2,
            x: 5.0,
            y: 6.0,
        });
        assert_eq!(inbox.len(), 2);
        assert_eq!(
            inbox.first_of(MessageKind::Wait),
            Some(Message::Wait { source: 1 })
        );
    }

    #[test]
    fn come_from_same_source_coalesces() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Come {
            source: 3,
            x: 1.0,
            y: 1.0,
        });
        inbox.push(Message::Come {
            source: 3,
            x: 9.0,
            y: 9.0,
        });
        assert_eq!(inbox.len(), 1);
        assert_eq!(
            inbox.first_of(MessageKind::Come),
            Some(Message::Come {
                source: 3,
                x: 9.0,
                y: 9.0,
            })
        );
    }

    #[test]
    fn come_from_different_sources_accumulates() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Come {
            source: 1,
            x: 0.0,
            y: 0.0,
        });
        inbox.push(Message::Come {
            source: 2,
            x: 0.0,
            y: 0.0,
        });
        assert_eq!(inbox.len(), 2);
        // Oldest request first.
        assert_eq!(inbox.first_of(MessageKind::Come).map(|m| m.source()), Some(1));
    }

    #[test]
    fn coalesced_come_keeps_queue_age() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Come {
            source: 1,
            x: 0.0,
            y: 0.0,
        });
        inbox.push(Message::Come {
            source: 2,
            x: 0.0,
            y: 0.0,
        });
        // A re-broadcast from source 1 refreshes its coordinates but
        // keeps its place at the head of the queue.
        inbox.push(Message::Come {
            source: 1,
            x: 5.0,
            y: 5.0,
        });
        assert_eq!(inbox.len(), 2);
        assert_eq!(
            inbox.first_of(MessageKind::Come),
            Some(Message::Come {
                source: 1,
                x: 5.0,
                y: 5.0,
            })
        );
    }

    #[test]
    fn wait_does_not_coalesce() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Wait { source: 4 });
        inbox.push(Message::Wait { source: 4 });
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn clear_from_is_selective() {
        let mut inbox = Inbox::new();
        inbox.push(Message::Come {
            source: 1,
            x: 0.0,
            y: 0.0,
        });
        inbox.push(Message::Wait { source: 2 });
        inbox.clear_from(1);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox.first_of(MessageKind::Come), None);
        inbox.clear();
        assert!(inbox.is_empty());
    }
}
