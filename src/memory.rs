//! In-memory store backends.
//!
//! Single-process only. Every method takes its mutex for the whole
//! synchronous critical section and never across an `.await`, so each call
//! is atomic. Clones share the same underlying tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::error::BoxError;
use crate::model::{Ban, BanScope, Session, User};
use crate::store::{BanRegistry, IdentityDirectory, InsertOutcome, SessionStore};
use crate::types::{AccessToken, DeviceId, ExternalId, LinkCode, SessionId, UserId};

// ── Identity directory ─────────────────────────────────────────────

#[derive(Default)]
struct UserTable {
    by_id: HashMap<UserId, User>,
    by_external: HashMap<ExternalId, UserId>,
}

#[derive(Clone, Default)]
pub struct MemoryIdentityDirectory {
    inner: Arc<Mutex<UserTable>>,
}

impl MemoryIdentityDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a user record (administrative; never called by the manager).
    pub fn remove(&self, user_id: &UserId) -> Option<User> {
        let mut table = self.inner.lock();
        let user = table.by_id.remove(user_id)?;
        table.by_external.remove(&user.external_id);
        Some(user)
    }
}

impl IdentityDirectory for MemoryIdentityDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, BoxError> {
        let table = self.inner.lock();
        Ok(table
            .by_external
            .get(external_id)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<User>, BoxError> {
        Ok(self.inner.lock().by_id.get(user_id).cloned())
    }

    async fn insert_if_absent(&self, user: User) -> Result<User, BoxError> {
        let mut table = self.inner.lock();
        if let Some(existing) = table
            .by_external
            .get(&user.external_id)
            .and_then(|id| table.by_id.get(id))
        {
            return Ok(existing.clone());
        }
        table.by_external.insert(user.external_id.clone(), user.id);
        table.by_id.insert(user.id, user.clone());
        Ok(user)
    }
}

// ── Ban registry ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryBanRegistry {
    inner: Arc<Mutex<Vec<Ban>>>,
}

impl MemoryBanRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ban (administrative).
    pub fn ban(&self, ban: Ban) {
        self.inner.lock().push(ban);
    }

    /// Lift every ban on `user_id` (administrative).
    pub fn lift(&self, user_id: &UserId) {
        self.inner.lock().retain(|b| &b.user_id != user_id);
    }
}

impl BanRegistry for MemoryBanRegistry {
    async fn find_active_ban(
        &self,
        user_id: &UserId,
        scope: BanScope,
        now: OffsetDateTime,
    ) -> Result<Option<Ban>, BoxError> {
        Ok(self
            .inner
            .lock()
            .iter()
            .find(|b| &b.user_id == user_id && b.scope == scope && b.is_active(now))
            .cloned())
    }
}

// ── Session store ──────────────────────────────────────────────────

#[derive(Default)]
struct SessionTable {
    by_id: HashMap<SessionId, Session>,
    by_access_token: HashMap<AccessToken, SessionId>,
    pending_by_code: HashMap<LinkCode, SessionId>,
}

impl SessionTable {
    fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.by_id.remove(id)?;
        self.by_access_token.remove(&session.tokens().access_token);
        if let Some(code) = session.link_code() {
            self.pending_by_code.remove(code);
        }
        Some(session)
    }

    /// Drop pending sessions that can no longer be redeemed.
    fn evict_expired_pending(&mut self, now: OffsetDateTime) {
        let expired: Vec<SessionId> = self
            .pending_by_code
            .values()
            .filter(|&id| self.by_id.get(id).is_none_or(|s| s.is_expired(now)))
            .copied()
            .collect();
        for id in expired {
            self.remove(&id);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<SessionTable>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.inner.lock().by_id.get(id).cloned()
    }

    /// Number of stored sessions, pending and linked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: Session) -> Result<InsertOutcome, BoxError> {
        let mut table = self.inner.lock();
        table.evict_expired_pending(session.created_at);
        if let Some(code) = session.link_code() {
            if table.pending_by_code.contains_key(code) {
                return Ok(InsertOutcome::LinkCodeTaken);
            }
            table.pending_by_code.insert(code.clone(), session.id);
        }
        table
            .by_access_token
            .insert(session.tokens().access_token.clone(), session.id);
        table.by_id.insert(session.id, session);
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_access_token(&self, token: &AccessToken) -> Result<Option<Session>, BoxError> {
        let table = self.inner.lock();
        Ok(table
            .by_access_token
            .get(token)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_pending_by_link_code(
        &self,
        code: &LinkCode,
    ) -> Result<Option<Session>, BoxError> {
        let table = self.inner.lock();
        Ok(table
            .pending_by_code
            .get(code)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn link_pending(
        &self,
        id: &SessionId,
        device_id: DeviceId,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<Option<Session>, BoxError> {
        let mut table = self.inner.lock();
        let Some(session) = table.by_id.get_mut(id) else {
            return Ok(None);
        };
        let code = session.link_code().cloned();
        if !session.link(device_id, now, expires_at) {
            return Ok(None);
        }
        let linked = session.clone();
        if let Some(code) = code {
            table.pending_by_code.remove(&code);
        }
        Ok(Some(linked))
    }

    async fn update(&self, session: &Session) -> Result<bool, BoxError> {
        let mut table = self.inner.lock();
        if table.remove(&session.id).is_none() {
            return Ok(false);
        }
        table
            .by_access_token
            .insert(session.tokens().access_token.clone(), session.id);
        if let Some(code) = session.link_code() {
            table.pending_by_code.insert(code.clone(), session.id);
        }
        table.by_id.insert(session.id, session.clone());
        Ok(true)
    }

    async fn delete_by_access_token(&self, token: &AccessToken) -> Result<bool, BoxError> {
        let mut table = self.inner.lock();
        let Some(id) = table.by_access_token.get(token).copied() else {
            return Ok(false);
        };
        Ok(table.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;

    use super::*;
    use crate::model::{ProviderCredentials, TokenPair};
    use crate::secret;

    fn user(external: &str) -> User {
        User {
            id: UserId::generate(),
            external_id: external.to_string().into(),
            username: external.into(),
            alias: external.into(),
            avatar: String::new(),
            accent_color: 0,
            provider: ProviderCredentials {
                access_token: "p".to_string().into(),
                token_type: "Bearer".into(),
                refresh_token: None,
            },
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn pending(code: &str) -> Session {
        let now = OffsetDateTime::now_utc();
        Session::pending(
            UserId::generate(),
            code.parse().unwrap(),
            TokenPair {
                access_token: secret::generate_access_token(),
                refresh_token: secret::generate_refresh_token(),
            },
            now,
            now + Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_first_record() {
        let dir = MemoryIdentityDirectory::new();
        let first = dir.insert_if_absent(user("ext-7")).await.unwrap();
        let second = dir.insert_if_absent(user("ext-7")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(dir.len(), 1);
        let found = dir
            .find_by_external_id(&"ext-7".to_string().into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn ban_lookup_filters_expired_bans() {
        let bans = MemoryBanRegistry::new();
        let now = OffsetDateTime::now_utc();
        let id = UserId::generate();
        bans.ban(Ban {
            user_id: id,
            scope: BanScope::Account,
            reason: "old".into(),
            expires_at: Some(now - Duration::days(1)),
        });
        assert!(bans.find_active_ban(&id, BanScope::Account, now).await.unwrap().is_none());

        bans.ban(Ban {
            user_id: id,
            scope: BanScope::Account,
            reason: "new".into(),
            expires_at: None,
        });
        let ban = bans.find_active_ban(&id, BanScope::Account, now).await.unwrap().unwrap();
        assert_eq!(ban.reason, "new");

        bans.lift(&id);
        assert!(bans.find_active_ban(&id, BanScope::Account, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_pending_code_is_reported() {
        let store = MemorySessionStore::new();
        assert_eq!(store.insert(pending("111111")).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(pending("111111")).await.unwrap(),
            InsertOutcome::LinkCodeTaken
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn linked_code_can_be_reused_by_new_pending_session() {
        let store = MemorySessionStore::new();
        let now = OffsetDateTime::now_utc();
        let session = pending("222222");
        let id = session.id;
        store.insert(session).await.unwrap();
        store
            .link_pending(&id, "dev".to_string().into(), now, now + Duration::days(30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.insert(pending("222222")).await.unwrap(), InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn link_pending_succeeds_once() {
        let store = MemorySessionStore::new();
        let session = pending("333333");
        let id = session.id;
        store.insert(session).await.unwrap();

        let code: LinkCode = "333333".parse().unwrap();
        let now = OffsetDateTime::now_utc();
        let linked = store
            .link_pending(&id, "dev-A".to_string().into(), now, now + Duration::days(30))
            .await
            .unwrap();
        assert!(linked.is_some());
        assert!(store.find_pending_by_link_code(&code).await.unwrap().is_none());

        let again = store
            .link_pending(&id, "dev-B".to_string().into(), now, now + Duration::days(30))
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(store.get(&id).unwrap().linked().unwrap().device_id.0, "dev-A");
    }

    #[tokio::test]
    async fn concurrent_link_pending_has_single_winner() {
        let store = Arc::new(MemorySessionStore::new());
        let session = pending("444444");
        let id = session.id;
        store.insert(session).await.unwrap();
        let now = OffsetDateTime::now_utc();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .link_pending(&id, format!("dev-{i}").into(), now, now + Duration::days(30))
                    .await
                    .unwrap()
                    .is_some()
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn delete_removes_every_index() {
        let store = MemorySessionStore::new();
        let session = pending("555555");
        let token = session.tokens().access_token.clone();
        store.insert(session).await.unwrap();

        assert!(store.delete_by_access_token(&token).await.unwrap());
        assert!(!store.delete_by_access_token(&token).await.unwrap());
        assert!(store.find_by_access_token(&token).await.unwrap().is_none());
        assert!(
            store
                .find_pending_by_link_code(&"555555".parse().unwrap())
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_session_reports_absence() {
        let store = MemorySessionStore::new();
        assert!(!store.update(&pending("666666")).await.unwrap());
        assert!(store.is_empty());

        let session = pending("666666");
        store.insert(session.clone()).await.unwrap();
        assert!(store.update(&session).await.unwrap());
    }

    #[tokio::test]
    async fn expired_pending_session_releases_its_code() {
        let store = MemorySessionStore::new();
        let mut stale = pending("777777");
        stale.expires_at = stale.created_at - Duration::seconds(1);
        let stale_id = stale.id;
        let stale_token = stale.tokens().access_token.clone();
        store.insert(stale).await.unwrap();

        let fresh = pending("777777");
        let fresh_id = fresh.id;
        assert_eq!(store.insert(fresh).await.unwrap(), InsertOutcome::Inserted);

        assert!(store.get(&stale_id).is_none());
        assert!(store.find_by_access_token(&stale_token).await.unwrap().is_none());
        let holder = store
            .find_pending_by_link_code(&"777777".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holder.id, fresh_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_prunes_unrelated_expired_pending_sessions() {
        let store = MemorySessionStore::new();
        let mut stale = pending("888888");
        stale.expires_at = stale.created_at - Duration::seconds(1);
        store.insert(stale).await.unwrap();

        store.insert(pending("999999")).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
