use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::auth::{AuthStateChange, OAuthRequest, Session, SessionError, SignUpMetadata};

/// Single owner of the signed-in session.
///
/// Only implementations of this port mutate the session; everything else
/// reads it through `get_session` or follows `subscribe`.
#[async_trait]
pub trait SessionHolderPort: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, SessionError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError>;

    /// Returns `None` when the account still needs email confirmation.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, SessionError>;

    /// Returns the provider URL the browser has to follow.
    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<String, SessionError>;

    /// Trades the authorization code from the redirect for a session, using
    /// the PKCE verifier kept from the matching `sign_in_with_oauth`.
    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, SessionError>;

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, SessionError>;

    async fn sign_out(&self) -> Result<(), SessionError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SessionError>;

    async fn update_password(&self, password: &str) -> Result<(), SessionError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}
