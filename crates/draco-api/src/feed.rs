//! In-process fan-out of newly sent messages.
//!
//! Every successful `POST /messages` publishes the stored [`Message`] here.
//! Consumers subscribe to a single direct conversation with
//! [`MessageFeed::watch_thread`]; dropping the returned watch unsubscribes.
//! A lagged watch reports the gap once so the consumer can refetch the
//! canonical thread from the store.

use draco_core::message::Message;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast hub for sent messages. Cheap to clone.
#[derive(Clone)]
pub struct MessageFeed {
  tx: broadcast::Sender<Message>,
}

impl MessageFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Publish a stored message. Having no subscribers is not an error.
  pub fn publish(&self, message: &Message) {
    let _ = self.tx.send(message.clone());
  }

  /// Watch the direct conversation between `a` and `b`, both directions.
  pub fn watch_thread(&self, a: Uuid, b: Uuid) -> ThreadWatch {
    ThreadWatch { rx: self.tx.subscribe(), a, b }
  }

  #[cfg(test)]
  fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

impl Default for MessageFeed {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

/// An event observed on a [`ThreadWatch`].
#[derive(Debug, Clone)]
pub enum ThreadEvent {
  /// A message belonging to the watched pair.
  Message(Message),
  /// The watch fell behind and `skipped` events were dropped. The thread
  /// should be refetched from the store.
  Lagged(u64),
}

/// A subscription scoped to one direct conversation.
pub struct ThreadWatch {
  rx: broadcast::Receiver<Message>,
  a:  Uuid,
  b:  Uuid,
}

impl ThreadWatch {
  /// Wait for the next event for this pair. Returns `None` once the feed
  /// itself has been dropped.
  pub async fn next(&mut self) -> Option<ThreadEvent> {
    loop {
      match self.rx.recv().await {
        Ok(message) if message.in_thread(self.a, self.b) => {
          return Some(ThreadEvent::Message(message));
        }
        Ok(_) => continue,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          return Some(ThreadEvent::Lagged(skipped));
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use draco_core::message::{MessageKind, MessageScope};

  use super::*;

  fn direct(sender: Uuid, recipient: Uuid, content: &str) -> Message {
    Message {
      message_id: Uuid::new_v4(),
      sender,
      scope: MessageScope::Direct(recipient),
      content: content.into(),
      kind: MessageKind::Text,
      created_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn watch_only_yields_its_pair() {
    let feed = MessageFeed::default();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut watch = feed.watch_thread(a, b);

    feed.publish(&direct(c, a, "other pair"));
    feed.publish(&direct(b, a, "for us"));

    match watch.next().await {
      Some(ThreadEvent::Message(m)) => assert_eq!(m.content, "for us"),
      other => panic!("unexpected event: {other:?}"),
    }
  }

  #[tokio::test]
  async fn publish_before_subscribe_is_not_delivered() {
    let feed = MessageFeed::default();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    feed.publish(&direct(a, b, "early"));
    let mut watch = feed.watch_thread(a, b);
    feed.publish(&direct(a, b, "late"));

    match watch.next().await {
      Some(ThreadEvent::Message(m)) => assert_eq!(m.content, "late"),
      other => panic!("unexpected event: {other:?}"),
    }
  }

  #[tokio::test]
  async fn lag_is_reported_once_as_a_refetch_signal() {
    let feed = MessageFeed::new(1);
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut watch = feed.watch_thread(a, b);

    feed.publish(&direct(a, b, "one"));
    feed.publish(&direct(a, b, "two"));
    feed.publish(&direct(a, b, "three"));

    assert!(matches!(watch.next().await, Some(ThreadEvent::Lagged(_))));
    match watch.next().await {
      Some(ThreadEvent::Message(m)) => assert_eq!(m.content, "three"),
      other => panic!("unexpected event: {other:?}"),
    }
  }

  #[tokio::test]
  async fn dropping_the_watch_unsubscribes() {
    let feed = MessageFeed::default();
    let watch = feed.watch_thread(Uuid::new_v4(), Uuid::new_v4());
    assert_eq!(feed.subscriber_count(), 1);
    drop(watch);
    assert_eq!(feed.subscriber_count(), 0);
  }
}
