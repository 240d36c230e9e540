//! Evidence and its chain of custody.
//!
//! An evidence item belongs to exactly one case. Its custody trail is the
//! legal record of everything that happened to it: an ordered, append-only
//! sequence starting with the upload event recorded at creation. Entries are
//! never updated, removed, or reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kinds and actions ───────────────────────────────────────────────────────

/// What kind of item the evidence is. Physical objects enter the system as
/// photographs of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
  Document,
  Photo,
  Video,
  Audio,
  Digital,
  PhysicalObject,
  Other,
}

/// An action taken on an evidence item, recorded in the custody trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustodyAction {
  Upload,
  Transfer,
  Analysis,
  Storage,
  Return,
}

// ─── Custody trail ───────────────────────────────────────────────────────────

/// One entry in the chain of custody. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyEvent {
  pub event_id:    Uuid,
  pub evidence_id: Uuid,
  pub action:      CustodyAction,
  pub actor:       Uuid,
  pub recorded_at: DateTime<Utc>,
  pub note:        Option<String>,
}

/// Note attached to the custody entry created alongside the evidence itself.
pub const INITIAL_UPLOAD_NOTE: &str = "initial upload";

// ─── Evidence ────────────────────────────────────────────────────────────────

/// A stored file attached to an evidence item. The hash is the SHA-256 of the
/// uploaded bytes, taken before the blob leaves the server's hands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceFile {
  pub url:          String,
  pub name:         String,
  pub content_hash: String,
}

/// An evidence item with its custody trail assembled in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
  pub evidence_id:   Uuid,
  pub case_id:       Uuid,
  pub kind:          EvidenceKind,
  pub description:   String,
  pub file:          Option<EvidenceFile>,
  pub collected_by:  Uuid,
  pub collected_at:  DateTime<Utc>,
  pub custody_trail: Vec<CustodyEvent>,
}

/// Input to evidence creation. The store writes the evidence row and the
/// initial `Upload` custody event in one transaction.
#[derive(Debug, Clone)]
pub struct NewEvidence {
  pub case_id:      Uuid,
  pub kind:         EvidenceKind,
  pub description:  String,
  pub file:         Option<EvidenceFile>,
  pub collected_by: Uuid,
}

impl NewEvidence {
  pub fn validate(&self) -> Result<()> {
    if self.description.trim().is_empty() {
      return Err(Error::EmptyEvidenceDescription);
    }
    Ok(())
  }
}
