//! Session store: the single owner of authentication state.
//!
//! The in-memory session is the source of truth. Every mutation is mirrored to
//! durable storage on a best-effort basis: a failed write is logged and the
//! in-memory change stands.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;

use super::storage::Storage;
use crate::models::LoginResponse;

pub const TOKEN_KEY: &str = "stage0_runbook_token";
pub const SUBJECT_KEY: &str = "stage0_runbook_subject";
pub const ROLES_KEY: &str = "stage0_runbook_roles";
pub const EXPIRES_AT_KEY: &str = "stage0_runbook_expires_at";

const ALL_KEYS: [&str; 4] = [TOKEN_KEY, SUBJECT_KEY, ROLES_KEY, EXPIRES_AT_KEY];

/// Client-held proof of authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token. `None` means nobody is logged in.
    pub token: Option<String>,
    pub subject: Option<String>,
    pub roles: Vec<String>,
    /// Instant at or after which the session is invalid.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn from_login(login: &LoginResponse) -> Self {
        Self {
            token: non_empty(&login.access_token),
            subject: non_empty(&login.subject),
            roles: login.roles.clone(),
            expires_at: parse_expiry(&login.expires_at),
        }
    }

    /// Whether the expiry has been reached at `now`. Sessions without an
    /// expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Shared session state with durable persistence.
///
/// Two logical states exist: unauthenticated (no token) and authenticated.
/// The only way in is [`SessionStore::set_session`]; the ways out are
/// [`SessionStore::clear_session`], lazy expiry inside
/// [`SessionStore::is_authenticated`], and the API client clearing the store
/// after a 401.
pub struct SessionStore {
    state: Mutex<Session>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Re-hydrate the session from storage.
    ///
    /// Unreadable entries are treated as absent.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.as_deref().and_then(non_empty),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read session field");
                None
            }
        };

        let roles = read(ROLES_KEY).map_or_else(Vec::new, |raw| {
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring malformed stored roles");
                Vec::new()
            })
        });

        let session = Session {
            token: read(TOKEN_KEY),
            subject: read(SUBJECT_KEY),
            roles,
            expires_at: read(EXPIRES_AT_KEY).as_deref().and_then(parse_expiry),
        };
        tracing::debug!(
            authenticated = session.token.is_some(),
            "session loaded from storage"
        );

        Self {
            state: Mutex::new(session),
            storage,
        }
    }

    /// Replace the whole session with the result of a login.
    pub fn set_session(&self, login: &LoginResponse) {
        let mut state = self.state.lock();
        *state = Session::from_login(login);

        let roles = serde_json::to_string(&login.roles).unwrap_or_else(|_| "[]".to_string());
        self.persist(TOKEN_KEY, &login.access_token);
        self.persist(SUBJECT_KEY, &login.subject);
        self.persist(ROLES_KEY, &roles);
        self.persist(EXPIRES_AT_KEY, &login.expires_at);

        tracing::info!(subject = %login.subject, "session established");
    }

    /// Drop the session and every stored field. Safe to call when logged out.
    pub fn clear_session(&self) {
        let mut state = self.state.lock();
        self.clear_locked(&mut state);
    }

    /// Whether a non-expired token is held, using the current time.
    ///
    /// Not pure: an expired session is cleared as a side effect.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    /// [`Self::is_authenticated`] with an explicit clock.
    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if state.token.is_none() {
            return false;
        }
        if state.is_expired_at(now) {
            tracing::info!("session expired");
            self.clear_locked(&mut state);
            return false;
        }
        true
    }

    /// Pure expiry check; never mutates the store.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state.lock().is_expired_at(now)
    }

    /// Clear the session if it has expired at `now`. Returns whether it did.
    pub fn reap_expired_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if !state.is_expired_at(now) {
            return false;
        }
        self.clear_locked(&mut state);
        true
    }

    /// Whether the current session carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.state.lock().roles.iter().any(|r| r == role)
    }

    /// The bearer token, if any. Does not check expiry.
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.lock().clone()
    }

    fn clear_locked(&self, state: &mut Session) {
        let had_token = state.token.is_some();
        *state = Session::default();
        for key in ALL_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "failed to remove session field");
            }
        }
        if had_token {
            tracing::info!("session cleared");
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key, error = %e, "failed to persist session field");
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 expiry.
///
/// Accepts RFC 3339, offsets without a colon, times without seconds and bare
/// dates. A value without offset is taken as UTC; a bare date is midnight UTC.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    let naive = raw.strip_suffix(['Z', 'z']).unwrap_or(raw);
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(ts.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }

    tracing::warn!(expires_at = raw, "ignoring unparseable session expiry");
    None
}
