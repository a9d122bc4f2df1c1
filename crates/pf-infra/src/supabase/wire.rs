//! GoTrue response bodies.

use chrono::{DateTime, Utc};
use pf_core::auth::{AuthUser, Session};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoTrueUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        let mut auth_user = AuthUser::new(user.id);
        auth_user.email = user.email;
        auth_user.provider = user.app_metadata.provider;
        auth_user.full_name = user.user_metadata.full_name;
        auth_user.avatar_url = user.user_metadata.avatar_url;
        auth_user.email_confirmed_at = user.email_confirmed_at;
        auth_user.last_sign_in_at = user.last_sign_in_at;
        auth_user
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: GoTrueUser,
}

impl TokenResponse {
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// `/signup` answers with a session when auto-confirm is on and with the
/// bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(TokenResponse),
    User(GoTrueUser),
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = r#"{
        "id": "3f1c2a9e-0000-4000-8000-000000000001",
        "email": "ada@example.com",
        "app_metadata": {"provider": "google", "providers": ["google"]},
        "user_metadata": {"full_name": "Ada Lovelace", "avatar_url": null},
        "email_confirmed_at": "2024-03-01T10:00:00.123456Z",
        "last_sign_in_at": null
    }"#;

    #[test]
    fn user_maps_metadata_into_auth_user() {
        let user: GoTrueUser = serde_json::from_str(USER).unwrap();
        let auth_user = AuthUser::from(user);
        assert_eq!(auth_user.provider.as_deref(), Some("google"));
        assert_eq!(auth_user.full_name.as_deref(), Some("Ada Lovelace"));
        assert!(auth_user.avatar_url.is_none());
        assert!(auth_user.email_confirmed_at.is_some());
    }

    #[test]
    fn expiry_is_derived_from_expires_in_when_absent() {
        let raw = format!(
            r#"{{"access_token":"at","token_type":"bearer","expires_in":3600,"refresh_token":"rt","user":{USER}}}"#
        );
        let token: TokenResponse = serde_json::from_str(&raw).unwrap();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let session = token.into_session(now);
        assert_eq!(session.expires_at, Some(1_700_003_600));
        assert_eq!(session.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn sign_up_without_session_is_a_bare_user() {
        let response: SignUpResponse = serde_json::from_str(USER).unwrap();
        assert!(matches!(response, SignUpResponse::User(_)));
    }
}
