use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use pf_core::auth::{ProfileError, ProfileUpdate, UserProfile};
use pf_core::ports::ProfileStorePort;
use pf_core::UserId;

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStorePort for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, ProfileError> {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(user_id.clone()))
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        let mut profiles = self.profiles.lock().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| ProfileError::NotFound(user_id.clone()))?;
        update.apply_to(profile, Utc::now());
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: UserId::from(id),
            email: Some("ada@example.com".into()),
            full_name: Some("Ada".into()),
            avatar_url: None,
            role: "user".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = store.get_profile(&UserId::from("ghost")).await.unwrap_err();
        assert_eq!(err, ProfileError::NotFound(UserId::from("ghost")));
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let store = InMemoryProfileStore::new();
        store.insert(profile("u1"));

        let updated = store
            .update_profile(
                &UserId::from("u1"),
                &ProfileUpdate {
                    full_name: None,
                    avatar_url: Some("https://cdn.example.com/ada.png".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Ada"));
        assert!(updated.avatar_url.is_some());
        assert!(updated.updated_at.is_some());
        assert_eq!(store.get_profile(&UserId::from("u1")).await.unwrap(), updated);
    }
}
