//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enums are stored as their
//! lowercase serde tags, `suspects` as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use draco_core::{
  account::Account,
  case::{Case, CaseStatus, InquiryNumber, Priority},
  evidence::{CustodyAction, CustodyEvent, Evidence, EvidenceFile, EvidenceKind},
  message::{Message, MessageKind, MessageScope},
  notification::{Notification, NotificationKind},
  profile::{Profile, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Agent => "agent",
    Role::Delegate => "delegate",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "agent" => Ok(Role::Agent),
    "delegate" => Ok(Role::Delegate),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

pub fn encode_status(s: CaseStatus) -> &'static str {
  match s {
    CaseStatus::Active => "active",
    CaseStatus::Investigation => "investigation",
    CaseStatus::Suspended => "suspended",
    CaseStatus::Closed => "closed",
  }
}

pub fn decode_status(s: &str) -> Result<CaseStatus> {
  match s {
    "active" => Ok(CaseStatus::Active),
    "investigation" => Ok(CaseStatus::Investigation),
    "suspended" => Ok(CaseStatus::Suspended),
    "closed" => Ok(CaseStatus::Closed),
    other => Err(Error::Decode(format!("unknown case status: {other:?}"))),
  }
}

pub fn encode_priority(p: Priority) -> &'static str {
  match p {
    Priority::Low => "low",
    Priority::Medium => "medium",
    Priority::High => "high",
    Priority::Urgent => "urgent",
  }
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  match s {
    "low" => Ok(Priority::Low),
    "medium" => Ok(Priority::Medium),
    "high" => Ok(Priority::High),
    "urgent" => Ok(Priority::Urgent),
    other => Err(Error::Decode(format!("unknown priority: {other:?}"))),
  }
}

pub fn encode_evidence_kind(k: EvidenceKind) -> &'static str {
  match k {
    EvidenceKind::Document => "document",
    EvidenceKind::Photo => "photo",
    EvidenceKind::Video => "video",
    EvidenceKind::Audio => "audio",
    EvidenceKind::Digital => "digital",
    EvidenceKind::PhysicalObject => "physical_object",
    EvidenceKind::Other => "other",
  }
}

pub fn decode_evidence_kind(s: &str) -> Result<EvidenceKind> {
  match s {
    "document" => Ok(EvidenceKind::Document),
    "photo" => Ok(EvidenceKind::Photo),
    "video" => Ok(EvidenceKind::Video),
    "audio" => Ok(EvidenceKind::Audio),
    "digital" => Ok(EvidenceKind::Digital),
    "physical_object" => Ok(EvidenceKind::PhysicalObject),
    "other" => Ok(EvidenceKind::Other),
    other => Err(Error::Decode(format!("unknown evidence kind: {other:?}"))),
  }
}

pub fn encode_custody_action(a: CustodyAction) -> &'static str {
  match a {
    CustodyAction::Upload => "upload",
    CustodyAction::Transfer => "transfer",
    CustodyAction::Analysis => "analysis",
    CustodyAction::Storage => "storage",
    CustodyAction::Return => "return",
  }
}

pub fn decode_custody_action(s: &str) -> Result<CustodyAction> {
  match s {
    "upload" => Ok(CustodyAction::Upload),
    "transfer" => Ok(CustodyAction::Transfer),
    "analysis" => Ok(CustodyAction::Analysis),
    "storage" => Ok(CustodyAction::Storage),
    "return" => Ok(CustodyAction::Return),
    other => Err(Error::Decode(format!("unknown custody action: {other:?}"))),
  }
}

pub fn encode_message_kind(k: MessageKind) -> &'static str {
  match k {
    MessageKind::Text => "text",
    MessageKind::System => "system",
  }
}

pub fn decode_message_kind(s: &str) -> Result<MessageKind> {
  match s {
    "text" => Ok(MessageKind::Text),
    "system" => Ok(MessageKind::System),
    other => Err(Error::Decode(format!("unknown message kind: {other:?}"))),
  }
}

pub fn encode_notification_kind(k: NotificationKind) -> &'static str {
  match k {
    NotificationKind::Info => "info",
    NotificationKind::Success => "success",
    NotificationKind::Warning => "warning",
    NotificationKind::Error => "error",
  }
}

pub fn decode_notification_kind(s: &str) -> Result<NotificationKind> {
  match s {
    "info" => Ok(NotificationKind::Info),
    "success" => Ok(NotificationKind::Success),
    "warning" => Ok(NotificationKind::Warning),
    "error" => Ok(NotificationKind::Error),
    other => Err(Error::Decode(format!("unknown notification kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:   String,
  pub badge_number: String,
  pub full_name:    String,
  pub role:         String,
  pub unit:         Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub active:       bool,
  pub created_at:   String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      profile_id:   decode_uuid(&self.profile_id)?,
      badge_number: self.badge_number,
      full_name:    self.full_name,
      role:         decode_role(&self.role)?,
      unit:         self.unit,
      phone:        self.phone,
      email:        self.email,
      active:       self.active,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub profile_id:    String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      profile_id:    decode_uuid(&self.profile_id)?,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub case_id:              String,
  pub inquiry_number:       String,
  pub title:                String,
  pub description:          Option<String>,
  pub location:             Option<String>,
  pub status:               String,
  pub priority:             String,
  pub responsible_agent:    String,
  pub supervising_delegate: Option<String>,
  pub suspects:             String,
  pub opened_at:            String,
  pub closed_at:            Option<String>,
}

impl RawCase {
  pub fn into_case(self) -> Result<Case> {
    Ok(Case {
      case_id:              decode_uuid(&self.case_id)?,
      inquiry_number:       InquiryNumber::parse(&self.inquiry_number).map_err(Error::Core)?,
      title:                self.title,
      description:          self.description,
      location:             self.location,
      status:               decode_status(&self.status)?,
      priority:             decode_priority(&self.priority)?,
      responsible_agent:    decode_uuid(&self.responsible_agent)?,
      supervising_delegate: self
        .supervising_delegate
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      suspects:             serde_json::from_str(&self.suspects)?,
      opened_at:            decode_dt(&self.opened_at)?,
      closed_at:            self.closed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from an `evidence` row. The custody trail is
/// attached separately by the store.
pub struct RawEvidence {
  pub evidence_id:  String,
  pub case_id:      String,
  pub kind:         String,
  pub description:  String,
  pub file_url:     Option<String>,
  pub file_name:    Option<String>,
  pub file_hash:    Option<String>,
  pub collected_by: String,
  pub collected_at: String,
}

impl RawEvidence {
  pub fn into_evidence(self, custody_trail: Vec<CustodyEvent>) -> Result<Evidence> {
    let file = match (self.file_url, self.file_name, self.file_hash) {
      (Some(url), Some(name), Some(content_hash)) => {
        Some(EvidenceFile { url, name, content_hash })
      }
      (None, None, None) => None,
      _ => return Err(Error::Decode("partial evidence file columns".into())),
    };

    Ok(Evidence {
      evidence_id:  decode_uuid(&self.evidence_id)?,
      case_id:      decode_uuid(&self.case_id)?,
      kind:         decode_evidence_kind(&self.kind)?,
      description:  self.description,
      file,
      collected_by: decode_uuid(&self.collected_by)?,
      collected_at: decode_dt(&self.collected_at)?,
      custody_trail,
    })
  }
}

/// Raw strings read directly from a `custody_events` row.
pub struct RawCustodyEvent {
  pub event_id:    String,
  pub evidence_id: String,
  pub action:      String,
  pub actor:       String,
  pub recorded_at: String,
  pub note:        Option<String>,
}

impl RawCustodyEvent {
  pub fn into_event(self) -> Result<CustodyEvent> {
    Ok(CustodyEvent {
      event_id:    decode_uuid(&self.event_id)?,
      evidence_id: decode_uuid(&self.evidence_id)?,
      action:      decode_custody_action(&self.action)?,
      actor:       decode_uuid(&self.actor)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      note:        self.note,
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub message_id: String,
  pub sender:     String,
  pub recipient:  Option<String>,
  pub case_id:    Option<String>,
  pub content:    String,
  pub kind:       String,
  pub created_at: String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    let scope = match (self.recipient.as_deref(), self.case_id.as_deref()) {
      (Some(r), None) => MessageScope::Direct(decode_uuid(r)?),
      (None, Some(c)) => MessageScope::Case(decode_uuid(c)?),
      _ => return Err(Error::Decode("message must have exactly one scope".into())),
    };

    Ok(Message {
      message_id: decode_uuid(&self.message_id)?,
      sender:     decode_uuid(&self.sender)?,
      scope,
      content:    self.content,
      kind:       decode_message_kind(&self.kind)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub owner:           String,
  pub title:           String,
  pub body:            Option<String>,
  pub kind:            String,
  pub is_read:         bool,
  pub created_at:      String,
}

impl RawNotification {
  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      owner:           decode_uuid(&self.owner)?,
      title:           self.title,
      body:            self.body,
      kind:            decode_notification_kind(&self.kind)?,
      read:            self.is_read,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
