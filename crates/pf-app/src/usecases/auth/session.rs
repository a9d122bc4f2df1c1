//! Sign-in, sign-up and session lifecycle use case.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pf_core::auth::{
    describe_oauth_start_error, AuthEvent, AuthUser, OAuthRequest, SessionError, SignUpMetadata,
};
use pf_core::config::AuthConfig;
use pf_core::ports::SessionHolderPort;

#[derive(Debug, thiserror::Error)]
pub enum AuthSessionError {
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Starting the Google sign-in failed; `message` carries remediation steps.
    #[error("{message}")]
    OAuthStart {
        message: String,
        #[source]
        source: SessionError,
    },
    #[error("{0}")]
    InvalidInput(&'static str),
}

/// Thin layer over the session holder. Holds no session state of its own.
pub struct AuthSession {
    holder: Arc<dyn SessionHolderPort>,
    config: AuthConfig,
}

impl AuthSession {
    pub fn new(holder: Arc<dyn SessionHolderPort>, config: AuthConfig) -> Self {
        Self { holder, config }
    }

    /// Re-reads the session holder on every call.
    pub async fn current_user(&self) -> Result<Option<AuthUser>, AuthSessionError> {
        let session = self.holder.get_session().await?;
        Ok(session.map(|s| s.user))
    }

    #[tracing::instrument(name = "usecase.auth_session.sign_in", skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthSessionError> {
        require(email, "Email is required")?;
        require(password, "Password is required")?;
        let session = self.holder.sign_in_with_password(email, password).await?;
        info!(user = %session.user.id, "sign in successful");
        Ok(session.user)
    }

    /// Returns `None` when the account waits for email confirmation.
    #[tracing::instrument(name = "usecase.auth_session.sign_up", skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<Option<AuthUser>, AuthSessionError> {
        require(email, "Email is required")?;
        require(password, "Password is required")?;
        let mut metadata = SignUpMetadata::new(full_name);
        if let Some(avatar_url) = avatar_url {
            metadata = metadata.with_avatar_url(avatar_url);
        }
        let session = self.holder.sign_up(email, password, &metadata).await?;
        info!(confirmed = session.is_some(), "sign up successful");
        Ok(session.map(|s| s.user))
    }

    /// Returns the provider URL the browser must follow.
    #[tracing::instrument(name = "usecase.auth_session.sign_in_with_google", skip(self))]
    pub async fn sign_in_with_google(&self) -> Result<String, AuthSessionError> {
        let request = OAuthRequest::google(self.config.callback_url());
        info!(origin = %self.config.app_origin, "initiating google sign in");
        self.holder
            .sign_in_with_oauth(&request)
            .await
            .map_err(|source| {
                warn!(error = %source, "google sign in could not start");
                AuthSessionError::OAuthStart {
                    message: describe_oauth_start_error(&source, &self.config.app_origin),
                    source,
                }
            })
    }

    #[tracing::instrument(name = "usecase.auth_session.sign_out", skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthSessionError> {
        self.holder.sign_out().await?;
        info!("sign out successful");
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthSessionError> {
        require(email, "Email is required")?;
        let redirect_to = format!(
            "{}/reset-password",
            self.config.app_origin.trim_end_matches('/')
        );
        self.holder
            .reset_password_for_email(email, &redirect_to)
            .await?;
        Ok(())
    }

    pub async fn update_password(&self, password: &str) -> Result<(), AuthSessionError> {
        require(password, "Password is required")?;
        self.holder.update_password(password).await?;
        Ok(())
    }

    /// Forwards auth state changes to the log until the holder goes away.
    pub fn spawn_watch(&self) -> JoinHandle<()> {
        let mut receiver = self.holder.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        let user = change.user().and_then(|u| u.email.clone());
                        match change.event {
                            AuthEvent::SignedIn => {
                                let provider = change
                                    .user()
                                    .map(|u| u.provider_or_email().to_string());
                                info!(event = change.event.as_str(), ?user, ?provider, "auth state changed")
                            }
                            _ => info!(event = change.event.as_str(), ?user, "auth state changed"),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth watcher lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn require(value: &str, message: &'static str) -> Result<(), AuthSessionError> {
    if value.trim().is_empty() {
        return Err(AuthSessionError::InvalidInput(message));
    }
    Ok(())
}
