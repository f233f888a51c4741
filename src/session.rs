// ABOUTME: Session management with signed HttpOnly cookies and an in-memory session store
// ABOUTME: Resolves every request to an anonymous or authenticated Identity

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::entities::user;
use crate::error::{AppError, Result};
use crate::AppState;

pub const SESSION_COOKIE_NAME: &str = "blog_session";
const FLASH_COOKIE_NAME: &str = "blog_flash";
const SESSION_MAX_AGE: i64 = 24 * 60 * 60; // 24 hours
const FLASH_MAX_AGE: i64 = 60;

/// Primary key of the single administrator account.
pub const ADMIN_USER_ID: i32 = 1;

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn create_session(&self, user_id: i32) -> String {
        self.cleanup_expired_sessions(SESSION_MAX_AGE);

        let session_id = Uuid::new_v4().to_string();
        let session_data = SessionData {
            user_id,
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.clone(), session_data);
        }

        session_id
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let cutoff = chrono::Utc::now().timestamp() - SESSION_MAX_AGE;
        let sessions = self.sessions.read().ok()?;
        sessions
            .get(session_id)
            .filter(|session| session.created_at > cutoff)
            .cloned()
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    pub fn cleanup_expired_sessions(&self, max_age_seconds: i64) {
        let cutoff = chrono::Utc::now().timestamp() - max_age_seconds;

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| session.created_at > cutoff);
        }
    }

    #[cfg(test)]
    fn backdate(&self, session_id: &str, seconds: i64) {
        if let Ok(mut sessions) = self.sessions.write() {
            if let Some(session) = sessions.get_mut(session_id) {
                session.created_at -= seconds;
            }
        }
    }
}

pub fn create_session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE))
        .path("/")
        .build()
}

pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

/// Queues a one-shot message for the next rendered page.
pub fn set_flash(jar: SignedCookieJar, message: &str) -> SignedCookieJar {
    let cookie = Cookie::build((FLASH_COOKIE_NAME, urlencoding::encode(message).into_owned()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(FLASH_MAX_AGE))
        .path("/")
        .build();
    jar.add(cookie)
}

pub fn take_flash(jar: SignedCookieJar) -> (SignedCookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE_NAME) else {
        return (jar, None);
    };

    let message = urlencoding::decode(cookie.value())
        .map(|decoded| decoded.into_owned())
        .ok();
    let expired = Cookie::build((FLASH_COOKIE_NAME, ""))
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build();

    (jar.add(expired), message)
}

/// Who is making the current request.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(user::Model),
}

impl Identity {
    pub fn user(&self) -> Option<&user::Model> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        self.user().map(|user| user.id)
    }

    pub fn is_admin(&self) -> bool {
        self.user_id() == Some(ADMIN_USER_ID)
    }

    /// For handlers behind a login or admin guard, which never see an anonymous identity.
    pub fn require_user_id(&self) -> Result<i32> {
        self.user_id()
            .ok_or_else(|| AppError::Forbidden("anonymous request reached a guarded handler".into()))
    }
}

/// Attaches an [`Identity`] to every request. A session pointing at a deleted
/// user fails with not-found and is dropped from the store.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let identity = match jar.get(SESSION_COOKIE_NAME) {
        Some(cookie) => match state.sessions.get_session(cookie.value()) {
            Some(session) => match state.storage.find_user(session.user_id).await? {
                Some(user) => Identity::User(user),
                None => {
                    state.sessions.remove_session(cookie.value());
                    return Err(AppError::NotFound(format!(
                        "user {} referenced by session",
                        session.user_id
                    )));
                }
            },
            None => Identity::Anonymous,
        },
        None => Identity::Anonymous,
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
