//! Classification of OAuth provider errors into user-facing messages.

use serde::{Deserialize, Serialize};

use crate::auth::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorKind {
    /// The user cancelled on the consent screen.
    AccessDenied,
    InvalidRequest,
    RedirectUriMismatch,
    Forbidden,
    Other,
}

impl OAuthErrorKind {
    /// Checks are ordered: the error code first, then the description.
    pub fn classify(code: &str, description: Option<&str>) -> Self {
        let description = description.unwrap_or_default();
        if code == "access_denied" {
            OAuthErrorKind::AccessDenied
        } else if code == "invalid_request" {
            OAuthErrorKind::InvalidRequest
        } else if description.contains("redirect_uri_mismatch") {
            OAuthErrorKind::RedirectUriMismatch
        } else if description.contains("403") || description.contains("Forbidden") {
            OAuthErrorKind::Forbidden
        } else {
            OAuthErrorKind::Other
        }
    }
}

/// An `error` / `error_description` pair returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: OAuthErrorKind,
    pub code: String,
    pub description: Option<String>,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, description: Option<String>) -> Self {
        let code = code.into();
        let kind = OAuthErrorKind::classify(&code, description.as_deref());
        Self {
            kind,
            code,
            description,
        }
    }

    fn detail(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.code)
    }

    /// Message with remediation steps. `app_origin` is quoted in the
    /// permission-denied instructions.
    pub fn message(&self, app_origin: &str) -> String {
        match self.kind {
            OAuthErrorKind::AccessDenied => "Google sign-in was cancelled by the user.".to_string(),
            OAuthErrorKind::InvalidRequest => format!(
                "The OAuth request was invalid.\n\n\
                 Possible causes:\n\
                 1. Google Cloud Console misconfiguration\n\
                 2. Wrong redirect URI\n\
                 3. Client ID configuration problem\n\n\
                 Details: {}",
                self.detail()
            ),
            OAuthErrorKind::RedirectUriMismatch => format!(
                "Redirect URI mismatch.\n\n\
                 Check the following in Google Cloud Console:\n\
                 1. Select the OAuth 2.0 client ID\n\
                 2. Add the Supabase callback URL to \"Authorized redirect URIs\"\n\
                 3. Make sure the URI format is exact\n\n\
                 Details: {}",
                self.detail()
            ),
            OAuthErrorKind::Forbidden => format!(
                "Google OAuth permission error (403).\n\n\
                 How to fix:\n\
                 1. Google Cloud Console -> APIs & Services -> Credentials\n\
                 2. Select the OAuth 2.0 client ID\n\
                 3. Add \"{app_origin}\" to \"Authorized JavaScript origins\"\n\
                 4. Check the app status on the \"OAuth consent screen\"\n\
                 5. Save and wait 5-10 minutes\n\
                 6. Clear the browser cache and try again\n\n\
                 Details: {}",
                self.detail()
            ),
            OAuthErrorKind::Other => format!("Google authentication error: {}", self.detail()),
        }
    }
}

/// Message for a failure while starting the Google sign-in.
pub fn describe_oauth_start_error(err: &SessionError, app_origin: &str) -> String {
    let text = err.to_string();
    if matches!(err, SessionError::InvalidCredentials) {
        "Google sign-in credentials are invalid. Please try again.".to_string()
    } else if text.contains("redirect_uri_mismatch") {
        "Redirect URI mismatch.\n\
         Check the following in Google Cloud Console:\n\
         1. Add the Supabase callback URL to Authorized redirect URIs\n\
         2. Make sure the URL format is exact"
            .to_string()
    } else if text.contains("Invalid request") || err.status() == Some(400) {
        format!(
            "Google OAuth is misconfigured.\n\
             Check the following in Google Cloud Console:\n\
             1. Add \"{app_origin}\" to Authorized JavaScript origins\n\
             2. Verify the Authorized redirect URIs\n\
             3. Verify the OAuth consent screen"
        )
    } else if text.contains("403") || err.status() == Some(403) {
        format!(
            "Google sign-in permission error (403).\n\
             Check the Google Cloud Console configuration:\n\
             1. Authorized JavaScript origins: \"{app_origin}\"\n\
             2. Publishing status of the OAuth consent screen\n\
             3. Project settings and enabled APIs"
        )
    } else {
        text
    }
}
