use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use pf_core::auth::{
    AuthEvent, AuthStateChange, OAuthRequest, Session, SessionError, SignUpMetadata,
};
use pf_core::ports::SessionHolderPort;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::client::{ErrorBody, SupabaseClient};
use crate::pkce::{PkcePair, CHALLENGE_METHOD};
use super::wire::{GoTrueUser, SignUpResponse, TokenResponse};

const EVENT_CAPACITY: usize = 32;
/// Refresh a little before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Session holder backed by the hosted GoTrue API.
///
/// The session lives in process memory only; this is the single place that
/// writes it.
pub struct SupabaseSessionHolder {
    client: SupabaseClient,
    session: Mutex<Option<Session>>,
    /// Verifier of the last authorize URL handed out, consumed by the code
    /// exchange.
    pkce_verifier: Mutex<Option<String>>,
    events: broadcast::Sender<AuthStateChange>,
}

fn transport(err: reqwest::Error) -> SessionError {
    SessionError::Transport(err.to_string())
}

fn invalid_url(err: url::ParseError) -> SessionError {
    SessionError::Transport(format!("invalid backend url: {err}"))
}

async fn session_error(response: Response) -> SessionError {
    let (status, body) = ErrorBody::read(response).await;
    if status == 400 && (body.has_code("invalid_grant") || body.has_code("invalid_credentials")) {
        return SessionError::InvalidCredentials;
    }
    SessionError::Backend {
        status,
        message: body.into_message(status),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    if !response.status().is_success() {
        return Err(session_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| SessionError::Transport(format!("invalid response body: {err}")))
}

async fn expect_success(response: Response) -> Result<(), SessionError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(session_error(response).await)
    }
}

impl SupabaseSessionHolder {
    pub fn new(client: SupabaseClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            session: Mutex::new(None),
            pkce_verifier: Mutex::new(None),
            events,
        }
    }

    fn current(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, session: Option<Session>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.events.send(AuthStateChange { event, session });
        debug!(event = event.as_str(), "auth state change emitted");
    }

    fn begin(&self, session: Session, event: AuthEvent) -> Session {
        self.store(Some(session.clone()));
        self.emit(event, Some(session.clone()));
        session
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, SessionError> {
        let mut url = self.client.url("/auth/v1/token").map_err(invalid_url)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self
            .client
            .request(Method::POST, url, None)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = decode(response).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GoTrueUser, SessionError> {
        let url = self.client.url("/auth/v1/user").map_err(invalid_url)?;
        let response = self
            .client
            .request(Method::GET, url, Some(access_token))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError> {
        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        info!(user_id = %session.user.id, "session refreshed");
        Ok(self.begin(session, AuthEvent::TokenRefreshed))
    }
}

fn is_expired(session: &Session, now_secs: i64) -> bool {
    session
        .expires_at
        .is_some_and(|expires_at| expires_at <= now_secs + EXPIRY_MARGIN_SECS)
}

#[async_trait]
impl SessionHolderPort for SupabaseSessionHolder {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !is_expired(&session, Utc::now().timestamp()) {
            return Ok(Some(session));
        }
        match session.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(refresh_token).await.map(Some),
            None => {
                warn!(user_id = %session.user.id, "session expired without refresh token");
                self.store(None);
                self.emit(AuthEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    #[tracing::instrument(name = "infra.supabase.sign_in_with_password", skip_all)]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        info!(user_id = %session.user.id, "password sign-in");
        Ok(self.begin(session, AuthEvent::SignedIn))
    }

    #[tracing::instrument(name = "infra.supabase.sign_up", skip_all)]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, SessionError> {
        let url = self.client.url("/auth/v1/signup").map_err(invalid_url)?;
        let response = self
            .client
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(transport)?;
        match decode::<SignUpResponse>(response).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                info!(user_id = %session.user.id, "account created and signed in");
                Ok(Some(self.begin(session, AuthEvent::SignedIn)))
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "account created, confirmation pending");
                Ok(None)
            }
        }
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<String, SessionError> {
        let mut url = self.client.url("/auth/v1/authorize").map_err(invalid_url)?;
        let pkce = PkcePair::generate();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("provider", request.provider.as_str())
                .append_pair("redirect_to", &request.redirect_to);
            for (key, value) in &request.query_params {
                query.append_pair(key, value);
            }
            query
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", CHALLENGE_METHOD);
        }
        *self
            .pkce_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pkce.verifier);
        debug!(provider = request.provider.as_str(), "oauth authorize url built");
        Ok(url.into())
    }

    #[tracing::instrument(name = "infra.supabase.exchange_code_for_session", skip_all)]
    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, SessionError> {
        let verifier = self
            .pkce_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SessionError::MissingCodeVerifier)?;
        let session = self
            .token_grant(
                "pkce",
                json!({ "auth_code": auth_code, "code_verifier": verifier }),
            )
            .await?;
        info!(user_id = %session.user.id, "authorization code exchanged");
        Ok(self.begin(session, AuthEvent::SignedIn))
    }

    #[tracing::instrument(name = "infra.supabase.set_session", skip_all)]
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, SessionError> {
        let user = self.fetch_user(access_token).await?;
        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: None,
            user: user.into(),
        };
        info!(user_id = %session.user.id, "session set from redirect tokens");
        Ok(self.begin(session, AuthEvent::SignedIn))
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let previous = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(session) = previous else {
            self.emit(AuthEvent::SignedOut, None);
            return Ok(());
        };
        self.emit(AuthEvent::SignedOut, None);

        let url = self.client.url("/auth/v1/logout").map_err(invalid_url)?;
        let response = self
            .client
            .request(Method::POST, url, Some(&session.access_token))
            .send()
            .await
            .map_err(transport)?;
        match expect_success(response).await {
            // The token is already gone on the server side.
            Err(SessionError::Backend { status, .. }) if matches!(status, 401 | 403 | 404) => {
                Ok(())
            }
            other => other,
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SessionError> {
        let mut url = self.client.url("/auth/v1/recover").map_err(invalid_url)?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        let response = self
            .client
            .request(Method::POST, url, None)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(transport)?;
        expect_success(response).await
    }

    async fn update_password(&self, password: &str) -> Result<(), SessionError> {
        let mut session = self.current().ok_or(SessionError::NotAuthenticated)?;
        let url = self.client.url("/auth/v1/user").map_err(invalid_url)?;
        let response = self
            .client
            .request(Method::PUT, url, Some(&session.access_token))
            .json(&json!({ "password": password }))
            .send()
            .await
            .map_err(transport)?;
        let user: GoTrueUser = decode(response).await?;
        session.user = user.into();
        self.begin(session, AuthEvent::UserUpdated);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use pf_core::config::SupabaseConfig;

    const USER: &str = r#"{"id":"user-1","email":"ada@example.com","app_metadata":{"provider":"email"},"user_metadata":{"full_name":"Ada"}}"#;

    fn token_body(expires_in: i64) -> String {
        format!(
            r#"{{"access_token":"at-1","token_type":"bearer","expires_in":{expires_in},"refresh_token":"rt-1","user":{USER}}}"#
        )
    }

    fn holder(server: &ServerGuard) -> SupabaseSessionHolder {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: server.url(),
            anon_key: "anon-key".into(),
        })
        .unwrap();
        SupabaseSessionHolder::new(client)
    }

    fn path(prefix: &str) -> Matcher {
        Matcher::Regex(format!(r"^{prefix}(\?.*)?$"))
    }

    #[tokio::test]
    async fn password_sign_in_sends_project_headers_and_stores_session() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .match_header("apikey", "anon-key")
            .match_header("x-client-info", "printforge-ai@1.0.0")
            .match_body(Matcher::PartialJson(
                json!({ "email": "ada@example.com", "password": "secret" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(3600))
            .create_async()
            .await;

        let holder = holder(&server);
        let mut events = holder.subscribe();
        let session = holder
            .sign_in_with_password("ada@example.com", "secret")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.access_token, "at-1");
        assert_eq!(session.user.full_name.as_deref(), Some("Ada"));
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedIn);
        assert_eq!(holder.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn invalid_grant_maps_to_invalid_credentials() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let err = holder(&server)
            .sign_in_with_password("ada@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::InvalidCredentials);
    }

    #[tokio::test]
    async fn set_session_validates_the_token_against_the_user_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer redirect-at")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER)
            .create_async()
            .await;

        let session = holder(&server)
            .set_session("redirect-at", Some("redirect-rt"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.user.id.as_str(), "user-1");
        assert_eq!(session.refresh_token.as_deref(), Some("redirect-rt"));
    }

    #[tokio::test]
    async fn rejected_token_surfaces_backend_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/v1/user")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":401,"msg":"invalid JWT: unable to parse or verify signature"}"#)
            .create_async()
            .await;

        let err = holder(&server).set_session("bogus", None).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Backend {
                status: 401,
                message: "invalid JWT: unable to parse or verify signature".into(),
            }
        );
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_on_read() {
        let mut server = Server::new_async().await;
        let _sign_in = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(0))
            .create_async()
            .await;
        let refresh = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .match_body(Matcher::PartialJson(json!({ "refresh_token": "rt-1" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(3600))
            .create_async()
            .await;

        let holder = holder(&server);
        holder
            .sign_in_with_password("ada@example.com", "secret")
            .await
            .unwrap();
        let mut events = holder.subscribe();

        let session = holder.get_session().await.unwrap().unwrap();

        refresh.assert_async().await;
        assert!(session.expires_at.unwrap() > Utc::now().timestamp());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn sign_up_without_auto_confirm_returns_no_session() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/signup")
            .match_body(Matcher::PartialJson(json!({
                "email": "new@example.com",
                "data": { "full_name": "New User", "role": "user" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER)
            .create_async()
            .await;

        let holder = holder(&server);
        let session = holder
            .sign_up("new@example.com", "pw123456", &SignUpMetadata::new("New User"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(session.is_none());
        assert!(holder.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_url_carries_provider_redirect_and_params() {
        let server = Server::new_async().await;
        let url = holder(&server)
            .sign_in_with_oauth(&OAuthRequest::google("http://localhost:4028/auth/callback"))
            .await
            .unwrap();

        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&(
            "redirect_to".into(),
            "http://localhost:4028/auth/callback".into()
        )));
        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("prompt".into(), "consent".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "s256".into())));
    }

    #[tokio::test]
    async fn authorization_code_is_exchanged_with_the_pkce_verifier() {
        let mut server = Server::new_async().await;
        let holder = holder(&server);
        let url = holder
            .sign_in_with_oauth(&OAuthRequest::google("http://localhost:4028/auth/callback"))
            .await
            .unwrap();
        let challenge = url::Url::parse(&url)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "code_challenge")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let verifier = holder.pkce_verifier.lock().unwrap().clone().unwrap();
        assert_eq!(crate::pkce::challenge_for(&verifier), challenge);

        let exchange = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::UrlEncoded("grant_type".into(), "pkce".into()))
            .match_header("apikey", "anon-key")
            .match_body(Matcher::PartialJson(
                json!({ "auth_code": "abc123", "code_verifier": verifier }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(3600))
            .create_async()
            .await;
        let mut events = holder.subscribe();

        let session = holder.exchange_code_for_session("abc123").await.unwrap();

        exchange.assert_async().await;
        assert_eq!(session.user.id.as_str(), "user-1");
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedIn);
        assert_eq!(holder.get_session().await.unwrap(), Some(session));
        assert_eq!(
            holder.exchange_code_for_session("abc123").await.unwrap_err(),
            SessionError::MissingCodeVerifier
        );
    }

    #[tokio::test]
    async fn code_exchange_without_a_pending_sign_in_is_refused() {
        let server = Server::new_async().await;
        let err = holder(&server)
            .exchange_code_for_session("abc123")
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::MissingCodeVerifier);
    }

    #[tokio::test]
    async fn sign_out_tolerates_an_already_revoked_token() {
        let mut server = Server::new_async().await;
        let _sign_in = server
            .mock("POST", path("/auth/v1/token"))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(3600))
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/auth/v1/logout")
            .match_header("authorization", "Bearer at-1")
            .with_status(404)
            .create_async()
            .await;

        let holder = holder(&server);
        holder
            .sign_in_with_password("ada@example.com", "secret")
            .await
            .unwrap();
        holder.sign_out().await.unwrap();

        logout.assert_async().await;
        assert!(holder.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_password_requires_a_session() {
        let server = Server::new_async().await;
        let err = holder(&server).update_password("new").await.unwrap_err();
        assert_eq!(err, SessionError::NotAuthenticated);
    }
}
