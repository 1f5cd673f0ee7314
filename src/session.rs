use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;

pub const SESSION_COOKIE: &str = "studyhive_session";

type HmacSha256 = Hmac<Sha256>;

pub const CREATE_ADMIN_SESSIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS admin_sessions (
        id UUID PRIMARY KEY,
        data JSONB NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Payload persisted for each browser session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub admin_logged_in: bool,
    pub admin_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn admin(display_name: String, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            admin_logged_in: true,
            admin_username: Some(display_name),
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, data: SessionData) -> Result<Uuid, sqlx::Error>;
    /// Returns `None` for unknown and for expired sessions.
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionData>, sqlx::Error>;
    async fn delete(&self, session_id: Uuid) -> Result<bool, sqlx::Error>;
}

/// Process-local store, for development and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, SessionData>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, data: SessionData) -> Result<Uuid, sqlx::Error> {
        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, data);
        Ok(session_id)
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<SessionData>, sqlx::Error> {
        let Some(entry) = self.sessions.get(&session_id) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.sessions.remove(&session_id);
            return Ok(None);
        }
        Ok(Some(entry.clone()))
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.sessions.remove(&session_id).is_some())
    }
}

/// Sessions persisted in `admin_sessions` with a read-through cache.
pub struct PostgresSessionStore {
    pool: PgPool,
    cache: DashMap<Uuid, SessionData>,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: DashMap::new(),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_ADMIN_SESSIONS_TABLE)
            .execute(&self.pool)
            .await?;
        info!("admin_sessions table is ready");
        Ok(())
    }
}

fn session_payload(data: &SessionData) -> Value {
    serde_json::json!({
        "admin_logged_in": data.admin_logged_in,
        "admin_username": data.admin_username,
    })
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, data: SessionData) -> Result<Uuid, sqlx::Error> {
        let session_id = Uuid::new_v4();

        if let Err(error) = sqlx::query(
            r#"
            INSERT INTO admin_sessions (id, data, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session_id)
        .bind(session_payload(&data))
        .bind(data.expires_at)
        .bind(data.created_at)
        .execute(&self.pool)
        .await
        {
            error!(%session_id, error = ?error, "Failed to persist session");
            return Err(error);
        }

        self.cache.insert(session_id, data);
        info!(%session_id, "Persisted session and cached value");
        Ok(session_id)
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<SessionData>, sqlx::Error> {
        if let Some(cached) = self.cache.get(&session_id) {
            if !cached.is_expired() {
                debug!(%session_id, "Session cache hit");
                return Ok(Some(cached.clone()));
            }

            drop(cached);
            debug!(%session_id, "Cached session expired, evicting");
            self.cache.remove(&session_id);
        }

        let record = sqlx::query(
            r#"
            SELECT data, expires_at, created_at
            FROM admin_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            error!(%session_id, error = ?error, "Failed to load session from Postgres");
            error
        })?;

        let Some(record) = record else {
            return Ok(None);
        };

        let data: Value = record.try_get("data")?;
        let expires_at: DateTime<Utc> = record.try_get("expires_at")?;
        let created_at: DateTime<Utc> = record.try_get("created_at")?;

        let session = SessionData {
            admin_logged_in: data
                .get("admin_logged_in")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            admin_username: data
                .get("admin_username")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            created_at,
            expires_at,
        };

        if session.is_expired() {
            warn!(%session_id, "Session expired in storage, removing");
            if let Err(error) = self.delete(session_id).await {
                error!(%session_id, error = ?error, "Failed to purge expired session");
            }
            return Ok(None);
        }

        self.cache.insert(session_id, session.clone());
        Ok(Some(session))
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, sqlx::Error> {
        let removed = self.cache.remove(&session_id).is_some();

        let result = sqlx::query("DELETE FROM admin_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                error!(%session_id, error = ?error, "Failed to delete session");
                error
            })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(%session_id, "Deleted session from cache and Postgres");
        } else if removed {
            warn!(%session_id, "Session missing from Postgres but removed from cache");
        }
        Ok(deleted || removed)
    }
}

fn mac_for(secret: &str, session_id: Uuid) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(session_id.as_bytes());
    mac
}

/// Cookie value for a session: `<uuid>.<hex hmac>`.
pub fn sign_session_id(secret: &str, session_id: Uuid) -> String {
    let signature = hex::encode(mac_for(secret, session_id).finalize().into_bytes());
    format!("{}.{}", session_id, signature)
}

/// Returns the session id when the cookie value carries a valid signature.
pub fn verify_session_cookie(secret: &str, value: &str) -> Option<Uuid> {
    let (id, signature) = value.split_once('.')?;
    let session_id = Uuid::parse_str(id).ok()?;
    let signature = hex::decode(signature).ok()?;

    mac_for(secret, session_id)
        .verify_slice(&signature)
        .ok()
        .map(|_| session_id)
}

pub fn session_id_from_headers(config: &Config, headers: &HeaderMap) -> Option<Uuid> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    let session_id = verify_session_cookie(&config.secret_key, cookie.value());
    if session_id.is_none() {
        warn!("Rejected session cookie with an invalid signature");
    }
    session_id
}

pub fn session_cookie(config: &Config, session_id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sign_session_id(&config.secret_key, session_id)))
        .path("/")
        .http_only(true)
        .secure(config.session_cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

pub fn expired_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(config.session_cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::http::{header, HeaderValue};

    #[test]
    fn signed_cookie_round_trips() {
        let id = Uuid::new_v4();
        let value = sign_session_id("secret", id);
        assert_eq!(verify_session_cookie("secret", &value), Some(id));
    }

    #[test]
    fn rejects_tampered_or_foreign_cookies() {
        let id = Uuid::new_v4();
        let value = sign_session_id("secret", id);

        assert_eq!(verify_session_cookie("other-secret", &value), None);

        let forged = format!("{}.{}", Uuid::new_v4(), value.split_once('.').unwrap().1);
        assert_eq!(verify_session_cookie("secret", &forged), None);

        assert_eq!(verify_session_cookie("secret", &id.to_string()), None);
        assert_eq!(verify_session_cookie("secret", "garbage.zz"), None);
    }

    #[test]
    fn reads_session_id_from_cookie_header() {
        let config = test_config();
        let id = Uuid::new_v4();
        let cookie = session_cookie(&config, id);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", cookie.name(), cookie.value())).unwrap(),
        );

        assert_eq!(session_id_from_headers(&config, &headers), Some(id));
    }

    #[test]
    fn session_cookie_flags() {
        let config = test_config();
        let rendered = session_cookie(&config, Uuid::new_v4()).to_string();
        assert!(rendered.starts_with("studyhive_session="));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));

        let expired = expired_session_cookie(&config).to_string();
        assert!(expired.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn memory_store_expires_and_deletes_sessions() {
        let store = MemorySessionStore::new();

        let live = store.create(SessionData::admin("Admin".into(), 1)).await.unwrap();
        assert!(store.load(live).await.unwrap().is_some());

        let mut stale = SessionData::admin("Admin".into(), 1);
        stale.expires_at = Utc::now() - Duration::minutes(1);
        let stale_id = store.create(stale).await.unwrap();
        assert!(store.load(stale_id).await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        assert!(store.delete(live).await.unwrap());
        assert!(!store.delete(live).await.unwrap());
        assert!(store.is_empty());
    }
}
