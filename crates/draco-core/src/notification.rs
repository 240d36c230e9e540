//! Per-user notification feed items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  #[default]
  Info,
  Success,
  Warning,
  Error,
}

/// A feed item owned by one user. The only mutation ever applied is marking
/// it read; everything else is creation or deletion by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub owner:           Uuid,
  pub title:           String,
  pub body:            Option<String>,
  pub kind:            NotificationKind,
  pub read:            bool,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::CaseStore::notify`].
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub owner: Uuid,
  pub title: String,
  pub body:  Option<String>,
  pub kind:  NotificationKind,
}

impl NewNotification {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::EmptyNotificationTitle);
    }
    Ok(())
  }
}
