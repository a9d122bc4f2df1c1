use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    /// Identity provider that created the session (`email`, `google`, ...).
    pub provider: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            provider: None,
            full_name: None,
            avatar_url: None,
            email_confirmed_at: None,
            last_sign_in_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Provider name for display; password sign-ins report `email`.
    pub fn provider_or_email(&self) -> &str {
        self.provider.as_deref().unwrap_or("email")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl AuthEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated => "USER_UPDATED",
        }
    }
}

/// Notification pushed to session subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Profile data attached to a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    pub full_name: String,
    pub avatar_url: String,
    pub role: String,
}

impl SignUpMetadata {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            avatar_url: String::new(),
            role: "user".to_string(),
        }
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = avatar_url.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
    pub redirect_to: String,
    pub query_params: Vec<(String, String)>,
}

impl OAuthRequest {
    /// Google sign-in asking for offline access and forcing the consent screen.
    pub fn google(redirect_to: impl Into<String>) -> Self {
        Self {
            provider: OAuthProvider::Google,
            redirect_to: redirect_to.into(),
            query_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("No authenticated user")]
    NotAuthenticated,

    #[error("auth backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("auth backend unreachable: {0}")]
    Transport(String),

    #[error("No code verifier is pending for this sign-in")]
    MissingCodeVerifier,
}

impl SessionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Backend { status, .. } => Some(*status),
            SessionError::InvalidCredentials => Some(400),
            SessionError::NotAuthenticated => Some(401),
            SessionError::Transport(_) | SessionError::MissingCodeVerifier => None,
        }
    }
}
