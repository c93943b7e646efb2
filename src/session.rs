//! Session and identity handling.
//!
//! The bearer token is an opaque three part token; only its payload is read
//! to personalize the desk. Nothing here verifies signatures, the backend
//! remains the only authority on who may do what.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
#[cfg(test)]
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::DeskError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    #[serde(default, alias = "userRole", alias = "ROLE")]
    pub role: Option<String>,
    #[serde(
        default,
        alias = "employeeId",
        alias = "EMPLOYEE_ID",
        alias = "emp_id",
        deserialize_with = "string_or_number"
    )]
    pub employee_id: Option<String>,
    #[serde(default, alias = "userName", alias = "username", alias = "name")]
    pub user_name: Option<String>,
    #[serde(default, alias = "dept", alias = "DEPARTMENT")]
    pub department: Option<String>,
}

impl Claims {
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// The user object kept next to the token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_name: String,
    pub role: String,
    pub employee_id: String,
    pub department: String,
}

impl From<&Claims> for UserProfile {
    fn from(claims: &Claims) -> Self {
        UserProfile {
            user_name: claims.user_name.clone().unwrap_or_default(),
            role: claims.role.clone().unwrap_or_default(),
            employee_id: claims.employee_id.clone().unwrap_or_default(),
            department: claims.department.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserProfile,
}

/// NumericDate may carry fractional seconds; they are dropped.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads the payload of a `header.payload.signature` token.
pub fn decode_token(token: &str) -> Result<Claims, DeskError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DeskError::Token(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    let payload = segments[1].trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(bytes) => bytes,
        Err(_) => STANDARD_NO_PAD.decode(payload)?,
    };
    serde_json::from_slice(&bytes).map_err(|e| DeskError::Token(format!("payload: {e}")))
}

pub fn now_epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, DeskError>;
    fn save(&self, session: &StoredSession) -> Result<(), DeskError>;
    fn clear(&self) -> Result<(), DeskError>;
}

/// Keeps the session as a small JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, DeskError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Ignoring unreadable session file {:?}: {e}", self.path);
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), DeskError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), DeskError> {
        match fs::remove_file(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, DeskError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), DeskError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), DeskError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Active {
    token: String,
    claims: Claims,
    user: UserProfile,
}

/// Process wide session handle. Cloning shares the same state.
#[derive(Clone)]
pub struct Session {
    active: Arc<RwLock<Option<Active>>>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            store,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    /// Loads a persisted session. Malformed or expired tokens are dropped.
    pub fn restore(&self) -> Result<bool, DeskError> {
        let Some(stored) = self.store.load()? else {
            return Ok(false);
        };
        match decode_token(&stored.token) {
            Ok(claims) if !claims.is_expired(now_epoch_seconds()) => {
                info!("Restored session for {}", stored.user.user_name);
                self.set(Some(Active {
                    token: stored.token,
                    claims,
                    user: stored.user,
                }));
                Ok(true)
            }
            Ok(_) => {
                info!("Stored session expired, clearing it");
                self.store.clear()?;
                Ok(false)
            }
            Err(e) => {
                warn!("Stored token unreadable ({e}), clearing it");
                self.store.clear()?;
                Ok(false)
            }
        }
    }

    /// Starts a session with a freshly issued token. The user object falls
    /// back to what the token payload carries.
    pub fn login(&self, token: String, user: Option<UserProfile>) -> Result<UserProfile, DeskError> {
        let claims = decode_token(&token)?;
        if claims.is_expired(now_epoch_seconds()) {
            return Err(DeskError::SessionExpired);
        }
        let mut user = user.unwrap_or_else(|| UserProfile::from(&claims));
        fill_missing(&mut user, &claims);

        self.store.save(&StoredSession {
            token: token.clone(),
            user: user.clone(),
        })?;
        info!(user = %user.user_name, role = %user.role, "Logged in");
        self.set(Some(Active {
            token,
            claims,
            user: user.clone(),
        }));
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), DeskError> {
        debug!("Clearing session");
        self.set(None);
        self.store.clear()
    }

    pub fn bearer(&self) -> Option<String> {
        self.read(|active| active.token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read(|active| active.user.clone())
    }

    pub fn claims(&self) -> Option<Claims> {
        self.read(|active| active.claims.clone())
    }

    pub fn is_active(&self) -> bool {
        self.read(|_| ()).is_some()
    }

    /// Returns `true` while the session is usable, clears it once `exp`
    /// has passed.
    pub fn check_expiry(&self, now: i64) -> bool {
        match self.read(|active| active.claims.is_expired(now)) {
            None => false,
            Some(false) => true,
            Some(true) => {
                info!("Session expired");
                if let Err(e) = self.logout() {
                    warn!("Failed to clear expired session: {e}");
                }
                false
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Active) -> T) -> Option<T> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    fn set(&self, value: Option<Active>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

fn fill_missing(user: &mut UserProfile, claims: &Claims) {
    let from_claims = UserProfile::from(claims);
    for (field, fallback) in [
        (&mut user.user_name, from_claims.user_name),
        (&mut user.role, from_claims.role),
        (&mut user.employee_id, from_claims.employee_id),
        (&mut user.department, from_claims.department),
    ] {
        if field.is_empty() {
            *field = fallback;
        }
    }
}

#[cfg(test)]
pub(crate) fn make_token(payload: &Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn future() -> i64 {
        now_epoch_seconds() + 3600
    }

    #[test]
    fn decodes_payload_without_verifying() {
        let token = make_token(&json!({
            "exp": 1_900_000_000,
            "role": "store",
            "employee_id": "S01234",
            "user_name": "Asha",
        }));
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("store"));
        assert_eq!(claims.employee_id.as_deref(), Some("S01234"));
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn numeric_employee_id_and_camel_case_are_accepted() {
        let token = make_token(&json!({"employeeId": 7632, "userName": "Ravi"}));
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.employee_id.as_deref(), Some("7632"));
        assert_eq!(claims.user_name.as_deref(), Some("Ravi"));
        assert!(!claims.is_expired(i64::MAX));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(decode_token("abc"), Err(DeskError::Token(_))));
        assert!(decode_token("a.!!!.c").is_err());
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("hello"));
        assert!(matches!(decode_token(&not_json), Err(DeskError::Token(_))));
    }

    #[test]
    fn fractional_expiry_is_truncated() {
        let token = make_token(&json!({"exp": 1_700_000_000.9, "role": "repair"}));
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.role.as_deref(), Some("repair"));

        let token = make_token(&json!({"exp": "1700000000"}));
        assert_eq!(decode_token(&token).unwrap().exp, Some(1_700_000_000));

        let token = make_token(&json!({"exp": null}));
        assert_eq!(decode_token(&token).unwrap().exp, None);
    }

    #[test]
    fn expiry_is_inclusive() {
        let claims = Claims {
            exp: Some(100),
            ..Claims::default()
        };
        assert!(claims.is_expired(100));
        assert!(!claims.is_expired(99));
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let store = Arc::new(MemorySessionStore::default());
        let session = Session::new(store.clone());
        let token = make_token(&json!({"exp": future(), "role": "admin", "user_name": "Meera"}));

        let user = session.login(token.clone(), None).unwrap();
        assert_eq!(user.role, "admin");
        assert_eq!(session.bearer(), Some(token.clone()));
        assert_eq!(store.load().unwrap().map(|s| s.token), Some(token));

        session.logout().unwrap();
        assert!(!session.is_active());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn login_with_expired_token_fails() {
        let session = Session::in_memory();
        let token = make_token(&json!({"exp": 10}));
        assert!(matches!(
            session.login(token, None),
            Err(DeskError::SessionExpired)
        ));
        assert!(!session.is_active());
    }

    #[test]
    fn restore_drops_expired_sessions() {
        let store = Arc::new(MemorySessionStore::default());
        store
            .save(&StoredSession {
                token: make_token(&json!({"exp": 10})),
                user: UserProfile::default(),
            })
            .unwrap();
        let session = Session::new(store.clone());
        assert!(!session.restore().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn check_expiry_clears_session() {
        let session = Session::in_memory();
        let exp = future();
        session
            .login(make_token(&json!({"exp": exp})), None)
            .unwrap();
        assert!(session.check_expiry(exp - 1));
        assert!(!session.check_expiry(exp));
        assert!(session.bearer().is_none());
    }

    #[test]
    fn explicit_user_is_completed_from_claims() {
        let session = Session::in_memory();
        let token = make_token(&json!({"exp": future(), "role": "repair", "employee_id": "S555"}));
        let user = session
            .login(
                token,
                Some(UserProfile {
                    user_name: "Kiran".into(),
                    ..UserProfile::default()
                }),
            )
            .unwrap();
        assert_eq!(user.user_name, "Kiran");
        assert_eq!(user.role, "repair");
        assert_eq!(user.employee_id, "S555");
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));
        assert!(store.load().unwrap().is_none());

        let stored = StoredSession {
            token: "a.b.c".into(),
            user: UserProfile {
                user_name: "Asha".into(),
                ..UserProfile::default()
            },
        };
        store.save(&stored).unwrap();
        assert_eq!(store.load().unwrap(), Some(stored));
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
