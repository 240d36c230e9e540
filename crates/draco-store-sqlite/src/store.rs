//! [`SqliteStore`] — the SQLite implementation of [`CaseStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use draco_core::{
  account::{Account, NewAccount, Session},
  case::{Case, CaseStats, CaseStatus, InquiryNumber, NewCase, Priority},
  evidence::{
    CustodyAction, CustodyEvent, Evidence, INITIAL_UPLOAD_NOTE, NewEvidence,
  },
  message::{Message, MessageScope, NewMessage},
  notification::{NewNotification, Notification},
  profile::Profile,
  store::CaseStore,
};

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawCase, RawCustodyEvent, RawEvidence, RawMessage,
    RawNotification, RawProfile, encode_custody_action, encode_dt,
    encode_evidence_kind, encode_message_kind, encode_notification_kind,
    encode_priority, encode_role, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A DRACO case store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a fully-built [`Case`] into the `cases` table.
  async fn insert_case(&self, case: &Case) -> Result<()> {
    let case_id_str    = encode_uuid(case.case_id);
    let inquiry_str    = case.inquiry_number.as_str().to_owned();
    let title          = case.title.clone();
    let description    = case.description.clone();
    let location       = case.location.clone();
    let status_str     = encode_status(case.status).to_owned();
    let priority_str   = encode_priority(case.priority).to_owned();
    let agent_str      = encode_uuid(case.responsible_agent);
    let delegate_str   = case.supervising_delegate.map(encode_uuid);
    let suspects_str   = serde_json::to_string(&case.suspects)?;
    let opened_at_str  = encode_dt(case.opened_at);
    let closed_at_str  = case.closed_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cases (
             case_id, inquiry_number, title, description, location,
             status, priority, responsible_agent, supervising_delegate,
             suspects, opened_at, closed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            case_id_str,
            inquiry_str,
            title,
            description,
            location,
            status_str,
            priority_str,
            agent_str,
            delegate_str,
            suspects_str,
            opened_at_str,
            closed_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Re-read a case after an update, mapping a missing row to `CaseNotFound`.
  async fn case_or_not_found(&self, id: Uuid) -> Result<Case> {
    self.get_case(id).await?.ok_or(Error::CaseNotFound(id))
  }

  async fn case_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM cases WHERE case_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn evidence_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM evidence WHERE evidence_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────

fn read_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    profile_id:   row.get(0)?,
    badge_number: row.get(1)?,
    full_name:    row.get(2)?,
    role:         row.get(3)?,
    unit:         row.get(4)?,
    phone:        row.get(5)?,
    email:        row.get(6)?,
    active:       row.get(7)?,
    created_at:   row.get(8)?,
  })
}

const PROFILE_COLS: &str =
  "profile_id, badge_number, full_name, role, unit, phone, email, active, created_at";

fn read_case_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCase> {
  Ok(RawCase {
    case_id:              row.get(0)?,
    inquiry_number:       row.get(1)?,
    title:                row.get(2)?,
    description:          row.get(3)?,
    location:             row.get(4)?,
    status:               row.get(5)?,
    priority:             row.get(6)?,
    responsible_agent:    row.get(7)?,
    supervising_delegate: row.get(8)?,
    suspects:             row.get(9)?,
    opened_at:            row.get(10)?,
    closed_at:            row.get(11)?,
  })
}

const CASE_COLS: &str = "case_id, inquiry_number, title, description, location, \
   status, priority, responsible_agent, supervising_delegate, suspects, \
   opened_at, closed_at";

fn read_evidence_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvidence> {
  Ok(RawEvidence {
    evidence_id:  row.get(0)?,
    case_id:      row.get(1)?,
    kind:         row.get(2)?,
    description:  row.get(3)?,
    file_url:     row.get(4)?,
    file_name:    row.get(5)?,
    file_hash:    row.get(6)?,
    collected_by: row.get(7)?,
    collected_at: row.get(8)?,
  })
}

const EVIDENCE_COLS: &str = "evidence_id, case_id, kind, description, file_url, \
   file_name, file_hash, collected_by, collected_at";

fn read_custody_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCustodyEvent> {
  Ok(RawCustodyEvent {
    event_id:    row.get(0)?,
    evidence_id: row.get(1)?,
    action:      row.get(2)?,
    actor:       row.get(3)?,
    recorded_at: row.get(4)?,
    note:        row.get(5)?,
  })
}

const CUSTODY_COLS: &str = "event_id, evidence_id, action, actor, recorded_at, note";

fn read_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    message_id: row.get(0)?,
    sender:     row.get(1)?,
    recipient:  row.get(2)?,
    case_id:    row.get(3)?,
    content:    row.get(4)?,
    kind:       row.get(5)?,
    created_at: row.get(6)?,
  })
}

const MESSAGE_COLS: &str = "message_id, sender, recipient, case_id, content, kind, created_at";

fn read_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNotification> {
  Ok(RawNotification {
    notification_id: row.get(0)?,
    owner:           row.get(1)?,
    title:           row.get(2)?,
    body:            row.get(3)?,
    kind:            row.get(4)?,
    is_read:         row.get(5)?,
    created_at:      row.get(6)?,
  })
}

const NOTIFICATION_COLS: &str =
  "notification_id, owner, title, body, kind, is_read, created_at";

/// Whether `err` is a UNIQUE-constraint violation mentioning `column`
/// (e.g. `"cases.inquiry_number"`).
fn is_unique_violation(err: &tokio_rusqlite::Error, column: &str) -> bool {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, Some(msg))) => {
      e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column)
    }
    _ => false,
  }
}

/// Normalise an optional free-text field: trim, map empty to `None`.
fn clean_opt(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  // ── Accounts & sessions ───────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<(Account, Profile)> {
    let now = Utc::now();
    let profile = Profile {
      profile_id:   Uuid::new_v4(),
      badge_number: input.profile.badge_number,
      full_name:    input.profile.full_name,
      role:         input.profile.role,
      unit:         input.profile.unit,
      phone:        input.profile.phone,
      email:        input.profile.email,
      active:       true,
      created_at:   now,
    };
    let account = Account {
      profile_id:    profile.profile_id,
      email:         input.email,
      password_hash: input.password_hash,
      created_at:    now,
    };

    let id_str        = encode_uuid(profile.profile_id);
    let badge         = profile.badge_number.clone();
    let full_name     = profile.full_name.clone();
    let role_str      = encode_role(profile.role).to_owned();
    let unit          = profile.unit.clone();
    let phone         = profile.phone.clone();
    let profile_email = profile.email.clone();
    let at_str        = encode_dt(now);
    let email         = account.email.clone();
    let password_hash = account.password_hash.clone();

    // Profile and account land in one transaction: the original created the
    // profile via a store-side trigger at sign-up, made explicit here.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO profiles (
             profile_id, badge_number, full_name, role, unit, phone, email,
             active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
          rusqlite::params![
            id_str, badge, full_name, role_str, unit, phone, profile_email, at_str
          ],
        )?;
        tx.execute(
          "INSERT INTO accounts (profile_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email, password_hash, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await;

    match outcome {
      Ok(()) => Ok((account, profile)),
      Err(e) if is_unique_violation(&e, "accounts.email") => {
        Err(Error::DuplicateEmail(account.email))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT profile_id, email, password_hash, created_at
               FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawAccount {
                  profile_id:    row.get(0)?,
                  email:         row.get(1)?,
                  password_hash: row.get(2)?,
                  created_at:    row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn insert_session(&self, session: Session) -> Result<()> {
    let token_hash = session.token_hash;
    let id_str     = encode_uuid(session.profile_id);
    let at_str     = encode_dt(session.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, profile_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![token_hash, id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_profile(&self, token_hash: &str) -> Result<Option<Profile>> {
    let token_hash = token_hash.to_owned();
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT p.profile_id, p.badge_number, p.full_name, p.role,
                      p.unit, p.phone, p.email, p.active, p.created_at
               FROM profiles p
               JOIN sessions s ON s.profile_id = p.profile_id
               WHERE s.token_hash = ?1",
              rusqlite::params![token_hash],
              read_profile_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let token_hash = token_hash.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLS} FROM profiles WHERE profile_id = ?1"),
              rusqlite::params![id_str],
              read_profile_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_active_profiles(&self) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLS} FROM profiles WHERE active = 1 ORDER BY full_name"
        ))?;
        let rows = stmt
          .query_map([], read_profile_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Cases ─────────────────────────────────────────────────────────────────

  async fn create_case(&self, input: NewCase) -> Result<Case> {
    input.validate().map_err(Error::Core)?;

    // The UNIQUE constraint on inquiry_number backs up the UUID-derived
    // suffix; on the rare collision we draw a fresh number.
    for _ in 0..3 {
      let case = Case {
        case_id:              Uuid::new_v4(),
        inquiry_number:       InquiryNumber::generate(),
        title:                input.title.trim().to_owned(),
        description:          clean_opt(input.description.clone()),
        location:             clean_opt(input.location.clone()),
        status:               CaseStatus::Active,
        priority:             input.priority,
        responsible_agent:    input.responsible_agent,
        supervising_delegate: input.supervising_delegate,
        suspects:             input.suspects.clone(),
        opened_at:            Utc::now(),
        closed_at:            None,
      };

      match self.insert_case(&case).await {
        Ok(()) => return Ok(case),
        Err(Error::Database(e)) if is_unique_violation(&e, "cases.inquiry_number") => {
          continue;
        }
        Err(e) => return Err(e),
      }
    }

    Err(Error::InquiryNumberExhausted)
  }

  async fn get_case(&self, id: Uuid) -> Result<Option<Case>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CASE_COLS} FROM cases WHERE case_id = ?1"),
              rusqlite::params![id_str],
              read_case_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }

  async fn list_cases(&self, principal: &Profile) -> Result<Vec<Case>> {
    let agent_str = (!principal.role.is_delegate()).then(|| encode_uuid(principal.profile_id));

    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(agent) = agent_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CASE_COLS} FROM cases
             WHERE responsible_agent = ?1
             ORDER BY opened_at DESC, rowid DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![agent], read_case_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn
            .prepare(&format!("SELECT {CASE_COLS} FROM cases ORDER BY opened_at DESC, rowid DESC"))?;
          stmt
            .query_map([], read_case_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }

  async fn set_case_status(&self, id: Uuid, status: CaseStatus) -> Result<Case> {
    let id_str     = encode_uuid(id);
    let status_str = encode_status(status).to_owned();
    let now_str    = encode_dt(Utc::now());

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases
           SET status = ?1,
               closed_at = CASE
                 WHEN ?1 = 'closed' THEN COALESCE(closed_at, ?2)
                 ELSE NULL
               END
           WHERE case_id = ?3",
          rusqlite::params![status_str, now_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::CaseNotFound(id));
    }
    self.case_or_not_found(id).await
  }

  async fn set_case_priority(&self, id: Uuid, priority: Priority) -> Result<Case> {
    let id_str       = encode_uuid(id);
    let priority_str = encode_priority(priority).to_owned();

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases SET priority = ?1 WHERE case_id = ?2",
          rusqlite::params![priority_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::CaseNotFound(id));
    }
    self.case_or_not_found(id).await
  }

  async fn assign_supervisor(&self, id: Uuid, delegate: Option<Uuid>) -> Result<Case> {
    let id_str       = encode_uuid(id);
    let delegate_str = delegate.map(encode_uuid);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases SET supervising_delegate = ?1 WHERE case_id = ?2",
          rusqlite::params![delegate_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::CaseNotFound(id));
    }
    self.case_or_not_found(id).await
  }

  async fn case_stats(&self, principal: &Profile) -> Result<CaseStats> {
    let agent_str = (!principal.role.is_delegate()).then(|| encode_uuid(principal.profile_id));

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String)> {
          Ok((row.get(0)?, row.get(1)?))
        };
        let rows = if let Some(agent) = agent_str {
          let mut stmt = conn
            .prepare("SELECT status, priority FROM cases WHERE responsible_agent = ?1")?;
          stmt
            .query_map(rusqlite::params![agent], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare("SELECT status, priority FROM cases")?;
          stmt
            .query_map([], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    let mut stats = CaseStats { total: rows.len() as u64, ..Default::default() };
    for (status, priority) in &rows {
      match status.as_str() {
        "active" => stats.active += 1,
        "investigation" => stats.investigation += 1,
        _ => {}
      }
      if priority == "urgent" {
        stats.urgent += 1;
      }
    }
    Ok(stats)
  }

  // ── Evidence ──────────────────────────────────────────────────────────────

  async fn add_evidence(&self, input: NewEvidence) -> Result<Evidence> {
    input.validate().map_err(Error::Core)?;

    if !self.case_exists(input.case_id).await? {
      return Err(Error::CaseNotFound(input.case_id));
    }

    let now = Utc::now();
    let initial = CustodyEvent {
      event_id:    Uuid::new_v4(),
      evidence_id: Uuid::new_v4(),
      action:      CustodyAction::Upload,
      actor:       input.collected_by,
      recorded_at: now,
      note:        Some(INITIAL_UPLOAD_NOTE.to_owned()),
    };
    let evidence = Evidence {
      evidence_id:   initial.evidence_id,
      case_id:       input.case_id,
      kind:          input.kind,
      description:   input.description.trim().to_owned(),
      file:          input.file,
      collected_by:  input.collected_by,
      collected_at:  now,
      custody_trail: vec![initial.clone()],
    };

    let evidence_id_str = encode_uuid(evidence.evidence_id);
    let case_id_str     = encode_uuid(evidence.case_id);
    let kind_str        = encode_evidence_kind(evidence.kind).to_owned();
    let description     = evidence.description.clone();
    let file_url        = evidence.file.as_ref().map(|f| f.url.clone());
    let file_name       = evidence.file.as_ref().map(|f| f.name.clone());
    let file_hash       = evidence.file.as_ref().map(|f| f.content_hash.clone());
    let collected_str   = encode_uuid(evidence.collected_by);
    let at_str          = encode_dt(now);
    let event_id_str    = encode_uuid(initial.event_id);
    let action_str      = encode_custody_action(initial.action).to_owned();
    let note            = initial.note.clone();

    // Evidence row and the opening custody event commit together; a failure
    // leaves neither behind.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO evidence (
             evidence_id, case_id, kind, description,
             file_url, file_name, file_hash, collected_by, collected_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            evidence_id_str,
            case_id_str,
            kind_str,
            description,
            file_url,
            file_name,
            file_hash,
            collected_str,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO custody_events (
             event_id, evidence_id, action, actor, recorded_at, note
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![event_id_str, evidence_id_str, action_str, collected_str, at_str, note],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(evidence)
  }

  async fn get_evidence(&self, id: Uuid) -> Result<Option<Evidence>> {
    let id_str = encode_uuid(id);

    let raw: Option<(RawEvidence, Vec<RawCustodyEvent>)> = self
      .conn
      .call(move |conn| {
        let evidence = conn
          .query_row(
            &format!("SELECT {EVIDENCE_COLS} FROM evidence WHERE evidence_id = ?1"),
            rusqlite::params![id_str],
            read_evidence_row,
          )
          .optional()?;

        let Some(evidence) = evidence else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {CUSTODY_COLS} FROM custody_events
           WHERE evidence_id = ?1 ORDER BY seq"
        ))?;
        let trail = stmt
          .query_map(rusqlite::params![id_str], read_custody_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((evidence, trail)))
      })
      .await?;

    let Some((raw_evidence, raw_trail)) = raw else {
      return Ok(None);
    };
    let trail = raw_trail
      .into_iter()
      .map(RawCustodyEvent::into_event)
      .collect::<Result<Vec<_>>>()?;
    Ok(Some(raw_evidence.into_evidence(trail)?))
  }

  async fn list_evidence(&self, case_id: Uuid) -> Result<Vec<Evidence>> {
    let case_id_str = encode_uuid(case_id);

    let (raw_items, raw_events): (Vec<RawEvidence>, Vec<RawCustodyEvent>) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVIDENCE_COLS} FROM evidence
           WHERE case_id = ?1 ORDER BY collected_at DESC, rowid DESC"
        ))?;
        let items = stmt
          .query_map(rusqlite::params![case_id_str], read_evidence_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT c.event_id, c.evidence_id, c.action, c.actor, c.recorded_at, c.note
           FROM custody_events c
           JOIN evidence e ON e.evidence_id = c.evidence_id
           WHERE e.case_id = ?1 ORDER BY c.seq",
        )?;
        let events = stmt
          .query_map(rusqlite::params![case_id_str], read_custody_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((items, events))
      })
      .await?;

    let mut trails: HashMap<String, Vec<CustodyEvent>> = HashMap::new();
    for raw in raw_events {
      let key = raw.evidence_id.clone();
      trails.entry(key).or_default().push(raw.into_event()?);
    }

    raw_items
      .into_iter()
      .map(|raw| {
        let trail = trails.remove(&raw.evidence_id).unwrap_or_default();
        raw.into_evidence(trail)
      })
      .collect()
  }

  async fn append_custody_event(
    &self,
    evidence_id: Uuid,
    action:      CustodyAction,
    actor:       Uuid,
    note:        Option<String>,
  ) -> Result<CustodyEvent> {
    if !self.evidence_exists(evidence_id).await? {
      return Err(Error::EvidenceNotFound(evidence_id));
    }

    let event = CustodyEvent {
      event_id: Uuid::new_v4(),
      evidence_id,
      action,
      actor,
      recorded_at: Utc::now(),
      note: clean_opt(note),
    };

    let event_id_str    = encode_uuid(event.event_id);
    let evidence_id_str = encode_uuid(evidence_id);
    let action_str      = encode_custody_action(action).to_owned();
    let actor_str       = encode_uuid(actor);
    let at_str          = encode_dt(event.recorded_at);
    let note            = event.note.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO custody_events (
             event_id, evidence_id, action, actor, recorded_at, note
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![event_id_str, evidence_id_str, action_str, actor_str, at_str, note],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn send_message(&self, input: NewMessage) -> Result<Message> {
    input.validate().map_err(Error::Core)?;

    let message = Message {
      message_id: Uuid::new_v4(),
      sender:     input.sender,
      scope:      input.scope,
      content:    input.content.trim().to_owned(),
      kind:       input.kind,
      created_at: Utc::now(),
    };

    let message_id_str = encode_uuid(message.message_id);
    let sender_str     = encode_uuid(message.sender);
    let (recipient_str, case_id_str) = match message.scope {
      MessageScope::Direct(recipient) => (Some(encode_uuid(recipient)), None),
      MessageScope::Case(case_id) => (None, Some(encode_uuid(case_id))),
    };
    let content  = message.content.clone();
    let kind_str = encode_message_kind(message.kind).to_owned();
    let at_str   = encode_dt(message.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             message_id, sender, recipient, case_id, content, kind, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            message_id_str, sender_str, recipient_str, case_id_str, content, kind_str, at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn fetch_thread(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLS} FROM messages
           WHERE (sender = ?1 AND recipient = ?2)
              OR (sender = ?2 AND recipient = ?1)
           ORDER BY created_at ASC, seq ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![a_str, b_str], read_message_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn list_case_messages(&self, case_id: Uuid) -> Result<Vec<Message>> {
    let case_id_str = encode_uuid(case_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLS} FROM messages
           WHERE case_id = ?1 ORDER BY created_at ASC, seq ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![case_id_str], read_message_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn notify(&self, input: NewNotification) -> Result<Notification> {
    input.validate().map_err(Error::Core)?;

    let notification = Notification {
      notification_id: Uuid::new_v4(),
      owner:           input.owner,
      title:           input.title.trim().to_owned(),
      body:            clean_opt(input.body),
      kind:            input.kind,
      read:            false,
      created_at:      Utc::now(),
    };

    let id_str    = encode_uuid(notification.notification_id);
    let owner_str = encode_uuid(notification.owner);
    let title     = notification.title.clone();
    let body      = notification.body.clone();
    let kind_str  = encode_notification_kind(notification.kind).to_owned();
    let at_str    = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, owner, title, body, kind, is_read, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![id_str, owner_str, title, body, kind_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn list_notifications(&self, owner: Uuid) -> Result<Vec<Notification>> {
    let owner_str = encode_uuid(owner);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLS} FROM notifications
           WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], read_notification_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn unread_count(&self, owner: Uuid) -> Result<u64> {
    let owner_str = encode_uuid(owner);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications WHERE owner = ?1 AND is_read = 0",
          rusqlite::params![owner_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn mark_read(&self, owner: Uuid, id: Uuid) -> Result<()> {
    let owner_str = encode_uuid(owner);
    let id_str    = encode_uuid(id);
    // Idempotent: already-read, unknown, and foreign ids fall through silently.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET is_read = 1
           WHERE notification_id = ?1 AND owner = ?2",
          rusqlite::params![id_str, owner_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_notification(&self, owner: Uuid, id: Uuid) -> Result<()> {
    let owner_str = encode_uuid(owner);
    let id_str    = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM notifications WHERE notification_id = ?1 AND owner = ?2",
          rusqlite::params![id_str, owner_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
