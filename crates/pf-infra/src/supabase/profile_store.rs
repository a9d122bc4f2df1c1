use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pf_core::auth::{ProfileError, ProfileUpdate, UserProfile};
use pf_core::ports::{ProfileStorePort, SessionHolderPort};
use pf_core::UserId;
use reqwest::{Method, Response};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::client::{ErrorBody, SupabaseClient};

/// PostgREST answers 406 with this code when a single-object request
/// matched no row.
const NO_ROWS: &str = "PGRST116";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// `user_profiles` table access on behalf of the signed-in user.
pub struct SupabaseProfileStore {
    client: SupabaseClient,
    session: Arc<dyn SessionHolderPort>,
}

impl SupabaseProfileStore {
    pub fn new(client: SupabaseClient, session: Arc<dyn SessionHolderPort>) -> Self {
        Self { client, session }
    }

    async fn access_token(&self) -> Result<String, ProfileError> {
        self.session
            .get_session()
            .await?
            .map(|session| session.access_token)
            .ok_or(ProfileError::NotAuthenticated)
    }

    fn row_url(&self, user_id: &UserId) -> Result<Url, ProfileError> {
        let mut url = self
            .client
            .url("/rest/v1/user_profiles")
            .map_err(|err| ProfileError::Transport(format!("invalid backend url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "*");
        Ok(url)
    }

    async fn single_row(
        &self,
        user_id: &UserId,
        response: Response,
    ) -> Result<UserProfile, ProfileError> {
        if response.status().is_success() {
            return response
                .json::<UserProfile>()
                .await
                .map_err(|err| ProfileError::Transport(format!("invalid response body: {err}")));
        }
        let (status, body) = ErrorBody::read(response).await;
        if status == 406 && body.has_code(NO_ROWS) {
            return Err(ProfileError::NotFound(user_id.clone()));
        }
        Err(ProfileError::Backend {
            status,
            message: body.into_message(status),
        })
    }
}

fn transport(err: reqwest::Error) -> ProfileError {
    ProfileError::Transport(err.to_string())
}

#[async_trait]
impl ProfileStorePort for SupabaseProfileStore {
    #[tracing::instrument(name = "infra.supabase.get_profile", skip(self))]
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, ProfileError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .request(Method::GET, self.row_url(user_id)?, Some(&token))
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await
            .map_err(transport)?;
        self.single_row(user_id, response).await
    }

    #[tracing::instrument(name = "infra.supabase.update_profile", skip(self, update))]
    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        let token = self.access_token().await?;
        let mut body = serde_json::to_value(update)
            .map_err(|err| ProfileError::Transport(format!("unencodable update: {err}")))?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }
        debug!(fields = %body, "patching profile");

        let response = self
            .client
            .request(Method::PATCH, self.row_url(user_id)?, Some(&token))
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        self.single_row(user_id, response).await
    }
}
