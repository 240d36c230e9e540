//! Profile — the identity record behind every officer in the unit.
//!
//! A profile is created together with its account at sign-up and carries the
//! role used by every access decision. The role never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The rank of an officer. Delegates see every case; agents only their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Agent,
  Delegate,
}

impl Role {
  pub fn is_delegate(self) -> bool { matches!(self, Self::Delegate) }
}

/// An officer of the unit. `active` gates sign-in and roster visibility;
/// deactivated profiles keep their history but lose access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub profile_id:   Uuid,
  pub badge_number: String,
  pub full_name:    String,
  pub role:         Role,
  pub unit:         Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub active:       bool,
  pub created_at:   DateTime<Utc>,
}

/// Input for profile creation. The id and timestamp are set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
  pub badge_number: String,
  pub full_name:    String,
  pub role:         Role,
  pub unit:         Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
}
