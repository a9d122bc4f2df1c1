use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use pf_core::auth::{
    AuthEvent, AuthStateChange, AuthUser, OAuthRequest, Session, SessionError, SignUpMetadata,
};
use pf_core::ports::SessionHolderPort;
use pf_core::UserId;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::pkce::{challenge_for, PkcePair};

const EVENT_CAPACITY: usize = 32;
const SESSION_TTL_SECS: i64 = 3600;

struct Account {
    password: String,
    user: AuthUser,
}

struct PendingCode {
    user: AuthUser,
    challenge: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// Users of every session started here, by access token.
    issued: HashMap<String, AuthUser>,
    /// Codes handed out by the simulated OAuth provider.
    codes: HashMap<String, PendingCode>,
    pkce_verifier: Option<String>,
    session: Option<Session>,
    password_resets: Vec<String>,
}

/// Offline session holder used when no hosted backend is configured.
///
/// The simulated Google provider redirects straight back to the callback URL
/// with an authorization code, which `exchange_code_for_session` accepts
/// against the PKCE verifier kept from the same sign-in.
pub struct InMemorySessionHolder {
    state: Mutex<State>,
    events: broadcast::Sender<AuthStateChange>,
    require_confirmation: bool,
}

impl Default for InMemorySessionHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionHolder {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
            require_confirmation: false,
        }
    }

    /// Sign-ups return no session until the (simulated) email is confirmed.
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    pub fn with_account(self, email: &str, password: &str, full_name: &str) -> Self {
        {
            let mut state = self.lock();
            let mut user = AuthUser::new(Uuid::new_v4().to_string()).with_email(email);
            user.full_name = Some(full_name.to_string());
            user.email_confirmed_at = Some(Utc::now());
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user,
                },
            );
        }
        self
    }

    /// Emails that asked for a password reset, oldest first.
    pub fn password_resets(&self) -> Vec<String> {
        self.lock().password_resets.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_session(
        &self,
        mut user: AuthUser,
        access_token: String,
        refresh_token: String,
    ) -> Session {
        let now = Utc::now();
        user.last_sign_in_at = Some(now);
        let session = Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(now.timestamp() + SESSION_TTL_SECS),
            user,
        };
        {
            let mut state = self.lock();
            state
                .issued
                .insert(session.access_token.clone(), session.user.clone());
            state.session = Some(session.clone());
        }
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        session
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        // No subscribers is fine.
        let _ = self.events.send(AuthStateChange { event, session });
        debug!(event = event.as_str(), "auth state change emitted");
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl SessionHolderPort for InMemorySessionHolder {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.lock().session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        let user = {
            let state = self.lock();
            match state.accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(SessionError::InvalidCredentials),
            }
        };
        info!(user_id = %user.id, "password sign-in");
        Ok(self.start_session(user.with_provider("email"), new_token(), new_token()))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, SessionError> {
        let user = {
            let mut state = self.lock();
            if state.accounts.contains_key(email) {
                return Err(SessionError::Backend {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            let mut user = AuthUser::new(Uuid::new_v4().to_string())
                .with_email(email)
                .with_provider("email");
            user.full_name = Some(metadata.full_name.clone());
            if !metadata.avatar_url.is_empty() {
                user.avatar_url = Some(metadata.avatar_url.clone());
            }
            if !self.require_confirmation {
                user.email_confirmed_at = Some(Utc::now());
            }
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        info!(user_id = %user.id, confirmation = self.require_confirmation, "account created");
        if self.require_confirmation {
            return Ok(None);
        }
        Ok(Some(self.start_session(user, new_token(), new_token())))
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<String, SessionError> {
        let mut redirect = Url::parse(&request.redirect_to)
            .map_err(|err| SessionError::Transport(format!("invalid redirect url: {err}")))?;
        let mut user = AuthUser::new(Uuid::new_v4().to_string())
            .with_email("google.user@example.com")
            .with_provider(request.provider.as_str());
        user.full_name = Some("Google User".to_string());

        let pkce = PkcePair::generate();
        let code = new_token();
        {
            let mut state = self.lock();
            state.codes.insert(
                code.clone(),
                PendingCode {
                    user,
                    challenge: pkce.challenge,
                },
            );
            state.pkce_verifier = Some(pkce.verifier);
        }
        redirect.query_pairs_mut().append_pair("code", &code);
        debug!(provider = request.provider.as_str(), "simulated provider issued a code");
        Ok(redirect.into())
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, SessionError> {
        let user = {
            let mut state = self.lock();
            let verifier = state
                .pkce_verifier
                .take()
                .ok_or(SessionError::MissingCodeVerifier)?;
            let pending = state
                .codes
                .remove(auth_code)
                .ok_or_else(|| SessionError::Backend {
                    status: 404,
                    message: "invalid flow state, no valid flow state found".to_string(),
                })?;
            if challenge_for(&verifier) != pending.challenge {
                return Err(SessionError::Backend {
                    status: 403,
                    message: "code challenge does not match previously saved code verifier"
                        .to_string(),
                });
            }
            pending.user
        };
        info!(user_id = %user.id, "authorization code exchanged");
        Ok(self.start_session(user, new_token(), new_token()))
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, SessionError> {
        let user = self
            .lock()
            .issued
            .get(access_token)
            .cloned()
            .ok_or_else(|| SessionError::Backend {
                status: 401,
                message: "invalid JWT: unable to parse or verify signature".to_string(),
            })?;
        let refresh_token = refresh_token.map(str::to_string).unwrap_or_else(new_token);
        Ok(self.start_session(user, access_token.to_string(), refresh_token))
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let previous = self.lock().session.take();
        if let Some(session) = previous {
            info!(user_id = %session.user.id, "signed out");
        }
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SessionError> {
        debug!(redirect_to, "password reset requested");
        self.lock().password_resets.push(email.to_string());
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), SessionError> {
        let session = {
            let mut state = self.lock();
            let session = state
                .session
                .clone()
                .ok_or(SessionError::NotAuthenticated)?;
            let user_id: &UserId = &session.user.id;
            if let Some(account) = state
                .accounts
                .values_mut()
                .find(|account| &account.user.id == user_id)
            {
                account.password = password.to_string();
            }
            session
        };
        self.emit(AuthEvent::UserUpdated, Some(session));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::auth::CallbackParams;

    #[tokio::test]
    async fn password_sign_in_checks_credentials() {
        let holder = InMemorySessionHolder::new().with_account("ada@example.com", "hunter22", "Ada");

        let err = holder
            .sign_in_with_password("ada@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::InvalidCredentials);

        let session = holder
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.user.full_name.as_deref(), Some("Ada"));
        assert_eq!(holder.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn sign_up_emits_signed_in_unless_confirmation_is_required() {
        let holder = InMemorySessionHolder::new();
        let mut events = holder.subscribe();
        let session = holder
            .sign_up("new@example.com", "pw123456", &SignUpMetadata::new("New User"))
            .await
            .unwrap();
        assert!(session.is_some());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedIn);

        let confirming = InMemorySessionHolder::new().requiring_confirmation();
        let session = confirming
            .sign_up("new@example.com", "pw123456", &SignUpMetadata::new("New User"))
            .await
            .unwrap();
        assert!(session.is_none());
        assert!(confirming.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let holder = InMemorySessionHolder::new().with_account("ada@example.com", "pw", "Ada");
        let err = holder
            .sign_up("ada@example.com", "pw", &SignUpMetadata::new("Ada"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn oauth_redirect_carries_a_code_accepted_once() {
        let holder = InMemorySessionHolder::new();
        let url = holder
            .sign_in_with_oauth(&OAuthRequest::google("http://localhost:4028/auth/callback"))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:4028/auth/callback?code="));

        let params = CallbackParams::parse(&url).unwrap();
        let code = params.query_param("code").unwrap().to_string();
        let mut events = holder.subscribe();

        let session = holder.exchange_code_for_session(&code).await.unwrap();
        assert_eq!(session.user.provider.as_deref(), Some("google"));
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedIn);
        assert_eq!(holder.get_session().await.unwrap(), Some(session));

        let replay = holder.exchange_code_for_session(&code).await.unwrap_err();
        assert_eq!(replay, SessionError::MissingCodeVerifier);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let holder = InMemorySessionHolder::new();
        holder
            .sign_in_with_oauth(&OAuthRequest::google("http://localhost:4028/auth/callback"))
            .await
            .unwrap();

        let err = holder.exchange_code_for_session("abc123").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(holder.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_session_accepts_only_issued_tokens() {
        let holder = InMemorySessionHolder::new().with_account("ada@example.com", "pw", "Ada");
        let session = holder
            .sign_in_with_password("ada@example.com", "pw")
            .await
            .unwrap();
        holder.sign_out().await.unwrap();

        let restored = holder
            .set_session(&session.access_token, session.refresh_token.as_deref())
            .await
            .unwrap();
        assert_eq!(restored.user.id, session.user.id);

        let bogus = holder.set_session("bogus", None).await.unwrap_err();
        assert_eq!(bogus.status(), Some(401));
    }

    #[tokio::test]
    async fn update_password_requires_a_session() {
        let holder = InMemorySessionHolder::new().with_account("ada@example.com", "old", "Ada");
        assert_eq!(
            holder.update_password("new").await.unwrap_err(),
            SessionError::NotAuthenticated
        );

        holder
            .sign_in_with_password("ada@example.com", "old")
            .await
            .unwrap();
        holder.update_password("new").await.unwrap();
        holder.sign_out().await.unwrap();

        assert!(holder.sign_in_with_password("ada@example.com", "new").await.is_ok());
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_notifies() {
        let holder = InMemorySessionHolder::new().with_account("ada@example.com", "pw", "Ada");
        holder
            .sign_in_with_password("ada@example.com", "pw")
            .await
            .unwrap();
        let mut events = holder.subscribe();

        holder.sign_out().await.unwrap();

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedOut);
        assert!(change.session.is_none());
        assert!(holder.get_session().await.unwrap().is_none());
    }
}
