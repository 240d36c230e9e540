//! Messages — direct or case-scoped, immutable once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Where a message is addressed. Exactly one of the two scopes applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageScope {
  /// A direct message to another officer.
  Direct(Uuid),
  /// A message attached to a case's discussion.
  Case(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
  #[default]
  Text,
  System,
}

/// A persisted message. No field is ever updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub message_id: Uuid,
  pub sender:     Uuid,
  pub scope:      MessageScope,
  pub content:    String,
  pub kind:       MessageKind,
  pub created_at: DateTime<Utc>,
}

impl Message {
  /// Whether this message belongs to the direct conversation between `a`
  /// and `b`, in either direction.
  pub fn in_thread(&self, a: Uuid, b: Uuid) -> bool {
    match self.scope {
      MessageScope::Direct(recipient) => {
        (self.sender == a && recipient == b) || (self.sender == b && recipient == a)
      }
      MessageScope::Case(_) => false,
    }
  }
}

/// Input to [`crate::store::CaseStore::send_message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender:  Uuid,
  pub scope:   MessageScope,
  pub content: String,
  pub kind:    MessageKind,
}

impl NewMessage {
  pub fn direct(sender: Uuid, recipient: Uuid, content: impl Into<String>) -> Self {
    Self {
      sender,
      scope: MessageScope::Direct(recipient),
      content: content.into(),
      kind: MessageKind::default(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.content.trim().is_empty() {
      return Err(Error::EmptyMessageContent);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn in_thread_covers_both_directions_and_excludes_others() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let msg = |sender, recipient| Message {
      message_id: Uuid::new_v4(),
      sender,
      scope: MessageScope::Direct(recipient),
      content: "oi".into(),
      kind: MessageKind::Text,
      created_at: Utc::now(),
    };

    assert!(msg(a, b).in_thread(a, b));
    assert!(msg(b, a).in_thread(a, b));
    assert!(!msg(a, c).in_thread(a, b));
    assert!(!msg(c, b).in_thread(a, b));
  }

  #[test]
  fn case_scoped_messages_are_not_in_any_thread() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let msg = Message {
      message_id: Uuid::new_v4(),
      sender: a,
      scope: MessageScope::Case(Uuid::new_v4()),
      content: "briefing".into(),
      kind: MessageKind::Text,
      created_at: Utc::now(),
    };
    assert!(!msg.in_thread(a, b));
  }
}
