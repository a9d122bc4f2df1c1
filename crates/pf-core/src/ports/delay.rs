use std::time::Duration;

use async_trait::async_trait;

/// Awaitable pause, used where a flow must wait inline.
#[async_trait]
pub trait DelayPort: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
