//! Storage seams consumed by the session manager.
//!
//! Implement these traits for your datastore. Each method must be atomic
//! with respect to the others on the same record; the manager never holds
//! any lock of its own across calls.
//!
//! # Example
//!
//! ```rust,ignore
//! impl SessionStore for PgSessions {
//!     async fn link_pending(&self, id: &SessionId, device_id: DeviceId, now: OffsetDateTime, expires_at: OffsetDateTime)
//!         -> Result<Option<Session>, BoxError>
//!     {
//!         // UPDATE sessions SET linked = true, link_code = NULL, device_id = $2, ...
//!         //   WHERE id = $1 AND linked = false RETURNING *
//!         self.db.link(id, device_id, now, expires_at).await
//!     }
//!     // ...
//! }
//! ```

use std::future::Future;

use time::OffsetDateTime;

use crate::error::BoxError;
use crate::model::{Ban, BanScope, Session, User};
use crate::types::{AccessToken, DeviceId, ExternalId, LinkCode, SessionId, UserId};

/// Durable user records keyed by external identity and by internal id.
pub trait IdentityDirectory: Send + Sync + 'static {
    fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> impl Future<Output = Result<Option<User>, BoxError>> + Send;

    fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<User>, BoxError>> + Send;

    /// Insert `user` unless a record with the same external id exists.
    ///
    /// Returns whichever record is stored afterwards, so concurrent first
    /// logins of one identity converge on a single user.
    fn insert_if_absent(
        &self,
        user: User,
    ) -> impl Future<Output = Result<User, BoxError>> + Send;
}

/// Active bans, maintained by an external administrative process.
pub trait BanRegistry: Send + Sync + 'static {
    /// Return a ban of `scope` on `user_id` that is active at `now`, if any.
    fn find_active_ban(
        &self,
        user_id: &UserId,
        scope: BanScope,
        now: OffsetDateTime,
    ) -> impl Future<Output = Result<Option<Ban>, BoxError>> + Send;
}

/// Result of [`SessionStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another pending session already holds this link code.
    LinkCodeTaken,
}

/// Durable session records.
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a new session. Link codes must be unique among unexpired pending
    /// sessions; an expired pending session does not hold its code.
    fn insert(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<InsertOutcome, BoxError>> + Send;

    /// Look up a session (pending or linked) by access token.
    fn find_by_access_token(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Look up a pending session by link code.
    fn find_pending_by_link_code(
        &self,
        code: &LinkCode,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Compare-and-set: link session `id` only if it is *still pending*, and
    /// release its link code.
    ///
    /// Returns the linked session, or `None` if the session is gone or was
    /// already linked. Two concurrent calls for one session never both succeed.
    fn link_pending(
        &self,
        id: &SessionId,
        device_id: DeviceId,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Overwrite an existing session record (last writer wins).
    ///
    /// Returns `false` if the session no longer exists; nothing is written then.
    fn update(&self, session: &Session) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Delete by access token. Returns `false` if nothing matched.
    fn delete_by_access_token(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;
}
