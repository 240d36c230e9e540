//! Case types — the unit of investigation work.
//!
//! A case is identified to humans by its inquiry number and to the system by
//! a UUID. Status and priority are finite enums; transitions are deliberately
//! unconstrained (any value may be set at any time), which mirrors the legal
//! reality that a suspended inquiry can be reopened or closed directly.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
  Active,
  Investigation,
  Suspended,
  Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
  Urgent,
}

// ─── Inquiry number ──────────────────────────────────────────────────────────

/// Human-readable unique case identifier: `INQ-<4-digit-year>-<6-digit-suffix>`.
///
/// The suffix is derived from a fresh UUID rather than a timestamp, so
/// concurrent creations do not trivially collide; the store additionally
/// enforces a UNIQUE constraint and retries generation on conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InquiryNumber(String);

impl InquiryNumber {
  /// Generate a fresh inquiry number for the current year.
  pub fn generate() -> Self {
    Self::from_parts(Utc::now().year(), suffix_from_uuid(Uuid::new_v4()))
  }

  /// Build from an explicit year and suffix. The suffix is truncated into the
  /// six-digit range.
  pub fn from_parts(year: i32, suffix: u32) -> Self {
    Self(format!("INQ-{year:04}-{:06}", suffix % 1_000_000))
  }

  /// Validate the `INQ-YYYY-NNNNNN` shape of a stored string.
  pub fn parse(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedInquiryNumber(s.to_owned());

    let mut parts = s.splitn(3, '-');
    let tag = parts.next().ok_or_else(malformed)?;
    let year = parts.next().ok_or_else(malformed)?;
    let suffix = parts.next().ok_or_else(malformed)?;

    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if tag != "INQ" || year.len() != 4 || suffix.len() != 6 || !digits(year) || !digits(suffix) {
      return Err(malformed());
    }
    Ok(Self(s.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for InquiryNumber {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

fn suffix_from_uuid(id: Uuid) -> u32 {
  let bytes = id.as_bytes();
  u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ─── Case ────────────────────────────────────────────────────────────────────

/// A unit of investigation work. `suspects` is an opaque structured list kept
/// as raw JSON; the core never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
  pub case_id:              Uuid,
  pub inquiry_number:       InquiryNumber,
  pub title:                String,
  pub description:          Option<String>,
  pub location:             Option<String>,
  pub status:               CaseStatus,
  pub priority:             Priority,
  pub responsible_agent:    Uuid,
  pub supervising_delegate: Option<Uuid>,
  pub suspects:             serde_json::Value,
  pub opened_at:            DateTime<Utc>,
  pub closed_at:            Option<DateTime<Utc>>,
}

/// Input to case creation. The creator always becomes `responsible_agent`;
/// id, inquiry number, status and timestamps are set by the store.
#[derive(Debug, Clone)]
pub struct NewCase {
  pub title:                String,
  pub description:          Option<String>,
  pub location:             Option<String>,
  pub priority:             Priority,
  pub responsible_agent:    Uuid,
  pub supervising_delegate: Option<Uuid>,
  pub suspects:             serde_json::Value,
}

impl NewCase {
  pub fn new(title: impl Into<String>, priority: Priority, responsible_agent: Uuid) -> Self {
    Self {
      title: title.into(),
      description: None,
      location: None,
      priority,
      responsible_agent,
      supervising_delegate: None,
      suspects: serde_json::Value::Array(Vec::new()),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::EmptyCaseTitle);
    }
    Ok(())
  }
}

// ─── Dashboard counters ──────────────────────────────────────────────────────

/// Case counters scoped by the caller's visibility.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CaseStats {
  pub total:         u64,
  pub active:        u64,
  pub urgent:        u64,
  pub investigation: u64,
}

// ─── Filtering ───────────────────────────────────────────────────────────────

/// In-memory case filter. Absent axes impose no restriction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseFilter {
  /// Case-insensitive substring match over title and inquiry number.
  pub search:   Option<String>,
  pub status:   Option<CaseStatus>,
  pub priority: Option<Priority>,
  /// Exact match on `responsible_agent`.
  pub agent:    Option<Uuid>,
}

impl CaseFilter {
  pub fn matches(&self, case: &Case) -> bool {
    if let Some(needle) = &self.search {
      let needle = needle.to_lowercase();
      let in_title = case.title.to_lowercase().contains(&needle);
      let in_number = case.inquiry_number.as_str().to_lowercase().contains(&needle);
      if !in_title && !in_number {
        return false;
      }
    }
    if let Some(status) = self.status
      && case.status != status
    {
      return false;
    }
    if let Some(priority) = self.priority
      && case.priority != priority
    {
      return false;
    }
    if let Some(agent) = self.agent
      && case.responsible_agent != agent
    {
      return false;
    }
    true
  }
}

/// Pure filter over an already-fetched case list.
pub fn filter_cases(mut cases: Vec<Case>, filter: &CaseFilter) -> Vec<Case> {
  cases.retain(|c| filter.matches(c));
  cases
}

#[cfg(test)]
mod tests {
  use super::*;

  fn case(title: &str, status: CaseStatus, priority: Priority, agent: Uuid) -> Case {
    Case {
      case_id: Uuid::new_v4(),
      inquiry_number: InquiryNumber::generate(),
      title: title.to_owned(),
      description: None,
      location: None,
      status,
      priority,
      responsible_agent: agent,
      supervising_delegate: None,
      suspects: serde_json::Value::Array(Vec::new()),
      opened_at: Utc::now(),
      closed_at: None,
    }
  }

  #[test]
  fn inquiry_number_shape() {
    let n = InquiryNumber::generate();
    InquiryNumber::parse(n.as_str()).unwrap();
    assert!(n.as_str().starts_with("INQ-"));
    assert_eq!(n.as_str().len(), "INQ-0000-000000".len());
  }

  #[test]
  fn inquiry_numbers_distinct_across_generations() {
    let numbers: std::collections::HashSet<String> =
      (0..64).map(|_| InquiryNumber::generate().as_str().to_owned()).collect();
    // UUID-derived suffixes make collisions over 64 draws vanishingly rare.
    assert!(numbers.len() > 60);
  }

  #[test]
  fn parse_rejects_malformed_numbers() {
    for bad in ["", "INQ-24-000001", "INQ-2024-1", "CASE-2024-000001", "INQ-2024-00000a"] {
      assert!(InquiryNumber::parse(bad).is_err(), "accepted {bad:?}");
    }
  }

  #[test]
  fn empty_title_fails_validation() {
    let input = NewCase::new("   ", Priority::Medium, Uuid::new_v4());
    assert!(matches!(input.validate(), Err(Error::EmptyCaseTitle)));
  }

  #[test]
  fn search_matches_title_and_inquiry_number_case_insensitively() {
    let agent = Uuid::new_v4();
    let c = case("Operação X", CaseStatus::Active, Priority::Urgent, agent);
    let number_fragment = c.inquiry_number.as_str()[4..8].to_owned();

    let by_title = CaseFilter { search: Some("operação".into()), ..Default::default() };
    assert!(by_title.matches(&c));

    let by_number = CaseFilter { search: Some(number_fragment), ..Default::default() };
    assert!(by_number.matches(&c));

    let miss = CaseFilter { search: Some("lavagem".into()), ..Default::default() };
    assert!(!miss.matches(&c));
  }

  #[test]
  fn absent_axes_do_not_restrict() {
    let agent = Uuid::new_v4();
    let cases = vec![
      case("a", CaseStatus::Active, Priority::Low, agent),
      case("b", CaseStatus::Closed, Priority::Urgent, Uuid::new_v4()),
    ];
    assert_eq!(filter_cases(cases, &CaseFilter::default()).len(), 2);
  }

  #[test]
  fn exact_filters_combine() {
    let agent = Uuid::new_v4();
    let cases = vec![
      case("a", CaseStatus::Active, Priority::Urgent, agent),
      case("b", CaseStatus::Active, Priority::Low, agent),
      case("c", CaseStatus::Closed, Priority::Urgent, agent),
    ];
    let filter = CaseFilter {
      status: Some(CaseStatus::Active),
      priority: Some(Priority::Urgent),
      agent: Some(agent),
      ..Default::default()
    };
    let hits = filter_cases(cases, &filter);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "a");
  }
}
