use async_trait::async_trait;

use crate::auth::{ProfileError, ProfileUpdate, UserProfile};
use crate::ids::UserId;

#[async_trait]
pub trait ProfileStorePort: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, ProfileError>;

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProfileError>;
}
