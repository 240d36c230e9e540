//! The `CaseStore` trait — the storage abstraction behind the whole service.
//!
//! Implemented by storage backends (e.g. `draco-store-sqlite`). The API layer
//! depends on this abstraction, not on any concrete backend.
//!
//! Two invariants every implementation must uphold:
//!
//! - **Custody trails are append-only.** No operation ever removes or
//!   reorders custody events; reads return them in exact insertion order.
//! - **Case visibility.** [`CaseStore::list_cases`] and
//!   [`CaseStore::case_stats`] return everything for a delegate and only the
//!   principal's own cases for an agent. This is the single access-control
//!   rule in the system and must be enforced wherever cases are read.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, NewAccount, Session},
  case::{Case, CaseStats, CaseStatus, NewCase, Priority},
  evidence::{CustodyAction, CustodyEvent, Evidence, NewEvidence},
  message::{Message, NewMessage},
  notification::{NewNotification, Notification},
  profile::Profile,
};

/// Abstraction over a DRACO storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts & sessions ───────────────────────────────────────────────

  /// Create an account and its profile in one transaction.
  ///
  /// Fails if the email is already registered.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<(Account, Profile), Self::Error>> + Send + '_;

  /// Look up an account by email. Returns `None` if not registered.
  fn account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Persist a session row. The token itself is never stored, only its hash.
  fn insert_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a presented token hash to the signed-in profile.
  fn session_profile<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Delete a session. Deleting an unknown token hash is a no-op.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Retrieve a profile by id. Returns `None` if not found.
  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// All active profiles — the chat roster.
  fn list_active_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  // ── Cases ─────────────────────────────────────────────────────────────

  /// Create a case: status starts `Active`, the inquiry number is generated
  /// and retried on the rare suffix collision.
  fn create_case(
    &self,
    input: NewCase,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  fn get_case(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Case>, Self::Error>> + Send + '_;

  /// Cases visible to `principal`, newest first. See the trait docs for the
  /// visibility rule.
  fn list_cases<'a>(
    &'a self,
    principal: &'a Profile,
  ) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + 'a;

  /// Set the status. Any-to-any transitions are the contract; entering
  /// `Closed` records `closed_at`, leaving it clears it.
  fn set_case_status(
    &self,
    id: Uuid,
    status: CaseStatus,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  fn set_case_priority(
    &self,
    id: Uuid,
    priority: Priority,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  /// Assign or clear the supervising delegate.
  fn assign_supervisor(
    &self,
    id: Uuid,
    delegate: Option<Uuid>,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  /// Dashboard counters, scoped by the same visibility rule as
  /// [`CaseStore::list_cases`].
  fn case_stats<'a>(
    &'a self,
    principal: &'a Profile,
  ) -> impl Future<Output = Result<CaseStats, Self::Error>> + Send + 'a;

  // ── Evidence ──────────────────────────────────────────────────────────

  /// Add an evidence item to a case. Writes the evidence row and the
  /// initial `Upload` custody event in one transaction; nothing persists if
  /// validation fails.
  fn add_evidence(
    &self,
    input: NewEvidence,
  ) -> impl Future<Output = Result<Evidence, Self::Error>> + Send + '_;

  fn get_evidence(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Evidence>, Self::Error>> + Send + '_;

  fn list_evidence(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Evidence>, Self::Error>> + Send + '_;

  /// Append a custody event to an evidence item's trail.
  fn append_custody_event(
    &self,
    evidence_id: Uuid,
    action: CustodyAction,
    actor: Uuid,
    note: Option<String>,
  ) -> impl Future<Output = Result<CustodyEvent, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  fn send_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// The direct conversation between `a` and `b`, both directions, ordered
  /// ascending by creation time.
  fn fetch_thread(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Case-scoped messages, ordered ascending by creation time.
  fn list_case_messages(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn notify(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// The owner's feed, newest first.
  fn list_notifications(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn unread_count(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Mark one of the owner's notifications read. Already-read, unknown, and
  /// foreign ids are a no-op.
  fn mark_read(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete one of the owner's notifications. Unknown and foreign ids are a
  /// no-op.
  fn remove_notification(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
