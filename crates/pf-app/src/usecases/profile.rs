//! Profile use cases for the signed-in user.

use std::sync::Arc;

use tracing::info;

use pf_core::auth::{ProfileError, ProfileUpdate, UserProfile};
use pf_core::ids::UserId;
use pf_core::ports::{ProfileStorePort, SessionHolderPort};

async fn current_user_id(holder: &dyn SessionHolderPort) -> Result<UserId, ProfileError> {
    holder
        .get_session()
        .await?
        .map(|session| session.user.id)
        .ok_or(ProfileError::NotAuthenticated)
}

pub struct GetProfile {
    holder: Arc<dyn SessionHolderPort>,
    store: Arc<dyn ProfileStorePort>,
}

impl GetProfile {
    pub fn new(holder: Arc<dyn SessionHolderPort>, store: Arc<dyn ProfileStorePort>) -> Self {
        Self { holder, store }
    }

    #[tracing::instrument(name = "usecase.get_profile.execute", skip(self))]
    pub async fn execute(&self) -> Result<UserProfile, ProfileError> {
        let user_id = current_user_id(self.holder.as_ref()).await?;
        self.store.get_profile(&user_id).await
    }
}

pub struct UpdateProfile {
    holder: Arc<dyn SessionHolderPort>,
    store: Arc<dyn ProfileStorePort>,
}

impl UpdateProfile {
    pub fn new(holder: Arc<dyn SessionHolderPort>, store: Arc<dyn ProfileStorePort>) -> Self {
        Self { holder, store }
    }

    /// An empty update only re-reads the profile.
    #[tracing::instrument(name = "usecase.update_profile.execute", skip(self, update))]
    pub async fn execute(&self, update: &ProfileUpdate) -> Result<UserProfile, ProfileError> {
        let user_id = current_user_id(self.holder.as_ref()).await?;
        if update.is_empty() {
            return self.store.get_profile(&user_id).await;
        }
        let profile = self.store.update_profile(&user_id, update).await?;
        info!(user_id = %user_id, "profile updated");
        Ok(profile)
    }
}
